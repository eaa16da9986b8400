use handlebars::{
  Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext, RenderError, RenderErrorReason,
  Renderable, ScopedJson,
};
use serde_json::Value;

use crate::core::messages::Messages;

pub const MESSAGE_HELPER: &str = "messageHelper";
pub const EQUALS_HELPER: &str = "equals";
pub const JSONIFY_HELPER: &str = "jsonify";

/// Adapts a plain `(key, data) -> String` function into a Handlebars helper.
///
/// `{{name "key"}}` passes the root context as `data`,
/// `{{name "key" value}}` passes `value`. The output is escaped like any
/// other `{{ }}` expression.
pub struct KeyDataHelper<F> {
  name: String,
  func: F,
}

impl<F> KeyDataHelper<F>
where
  F: Fn(&str, &Value) -> String + Send + Sync,
{
  pub fn new(name: impl Into<String>, func: F) -> Self {
    Self {
      name: name.into(),
      func,
    }
  }
}

impl<F> HelperDef for KeyDataHelper<F>
where
  F: Fn(&str, &Value) -> String + Send + Sync,
{
  fn call_inner<'reg: 'rc, 'rc>(
    &self,
    h: &Helper<'rc>,
    _: &'reg Handlebars<'reg>,
    ctx: &'rc Context,
    _: &mut RenderContext<'reg, 'rc>,
  ) -> Result<ScopedJson<'rc>, RenderError> {
    let key = h.param(0).ok_or_else(|| {
      RenderErrorReason::Other(format!(
        "You must call the '{}' helper with at least a message key.",
        self.name
      ))
    })?;
    let key = match key.value() {
      Value::String(s) => s.clone(),
      other => other.to_string(),
    };
    let data = match h.param(1) {
      Some(param) => param.value(),
      None => ctx.data(),
    };
    Ok(ScopedJson::Derived(Value::String((self.func)(&key, data))))
  }
}

/// The `messageHelper` helper, bound to one set of messages.
pub fn message_helper(messages: Messages) -> impl HelperDef + Send + Sync + 'static {
  KeyDataHelper::new(MESSAGE_HELPER, move |key: &str, data: &Value| messages.resolve(key, data))
}

/// `{{#equals a b}}same{{else}}different{{/equals}}`
pub struct EqualsHelper;

impl HelperDef for EqualsHelper {
  fn call<'reg: 'rc, 'rc>(
    &self,
    h: &Helper<'rc>,
    r: &'reg Handlebars<'reg>,
    ctx: &'rc Context,
    rc: &mut RenderContext<'reg, 'rc>,
    out: &mut dyn Output,
  ) -> HelperResult {
    let (Some(left), Some(right)) = (h.param(0), h.param(1)) else {
      return Err(RenderErrorReason::Other("You must call the 'equals' helper with two arguments.".to_string()).into());
    };
    let branch = if left.value() == right.value() {
      h.template()
    } else {
      h.inverse()
    };
    match branch {
      Some(template) => template.render(r, ctx, rc, out),
      None => Ok(()),
    }
  }
}

/// `{{{jsonify value}}}` renders `value` as pretty-printed JSON.
pub struct JsonifyHelper;

impl HelperDef for JsonifyHelper {
  fn call_inner<'reg: 'rc, 'rc>(
    &self,
    h: &Helper<'rc>,
    _: &'reg Handlebars<'reg>,
    _: &'rc Context,
    _: &mut RenderContext<'reg, 'rc>,
  ) -> Result<ScopedJson<'rc>, RenderError> {
    let value = h
      .param(0)
      .ok_or_else(|| RenderErrorReason::ParamNotFoundForIndex(JSONIFY_HELPER, 0))?;
    let json = serde_json::to_string_pretty(value.value()).map_err(|e| RenderErrorReason::Other(e.to_string()))?;
    Ok(ScopedJson::Derived(Value::String(json)))
  }
}

/// Registers the helpers every renderer carries.
pub(crate) fn register_builtin(registry: &mut Handlebars<'static>, messages: &Messages) {
  registry.register_helper(MESSAGE_HELPER, Box::new(message_helper(messages.clone())));
  registry.register_helper(EQUALS_HELPER, Box::new(EqualsHelper));
  registry.register_helper(JSONIFY_HELPER, Box::new(JsonifyHelper));
}
