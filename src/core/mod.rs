pub mod app;
pub mod bundle;
pub(crate) mod cache;
pub mod helpers;
pub mod layout;
pub mod messages;

#[cfg(feature = "devel")]
pub mod reload;
