//! Interpolation of `%token` placeholders into i18n message strings.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{LivebarsError, Result};

/// Message key to message template, e.g. `"greeting" => "Hello, %name!"`.
#[derive(Debug, Clone, Default)]
pub struct Messages(Arc<HashMap<String, String>>);

impl Messages {
  pub fn new<I, K, V>(entries: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    Self(Arc::new(
      entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
    ))
  }

  /// Loads a JSON object of message keys and templates.
  ///
  /// Nested objects are flattened into dotted keys, so
  /// `{ "errors": { "required": "..." } }` is looked up as `errors.required`.
  pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&raw)
      .map_err(|e| LivebarsError::Config(format!("invalid message file {:?}: {}", path, e)))?;
    Self::from_json_value(&value).map_err(|e| match e {
      LivebarsError::Config(msg) => LivebarsError::Config(format!("invalid message file {:?}: {}", path, msg)),
      other => other,
    })
  }

  /// Builds messages from a (possibly nested) JSON object of strings.
  pub fn from_json_value(value: &Value) -> Result<Self> {
    let Value::Object(fields) = value else {
      return Err(LivebarsError::Config("messages must be a JSON object".to_string()));
    };
    let mut entries = HashMap::new();
    flatten_into(&mut entries, "", fields)?;
    Ok(Self(Arc::new(entries)))
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.0.get(key).map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Resolves `key` against these messages. See [`resolve_message`].
  pub fn resolve(&self, key: &str, data: &Value) -> String {
    resolve_message(self, key, data)
  }
}

/// Looks up a message template and interpolates `data` into it.
///
/// A missing key is not an error: the result is a placeholder naming the key.
/// An empty template counts as missing.
pub fn resolve_message(messages: &Messages, key: &str, data: &Value) -> String {
  match messages.get(key).filter(|template| !template.is_empty()) {
    Some(template) => string_template(template, data),
    None => format!("[Message string for key {} not found]", key),
  }
}

/// Replaces every `%key` in `template` with the matching top-level field of
/// `data`. The longest matching key wins and substituted text is not
/// scanned again. Unknown tokens are left untouched.
pub fn string_template(template: &str, data: &Value) -> String {
  let Some(fields) = data.as_object() else {
    return template.to_string();
  };

  let mut keys: Vec<&str> = fields.keys().map(String::as_str).filter(|k| !k.is_empty()).collect();
  keys.sort_by(|a, b| b.len().cmp(&a.len()));

  let mut output = String::with_capacity(template.len());
  let mut rest = template;
  while let Some(index) = rest.find('%') {
    output.push_str(&rest[..index]);
    let after = &rest[index + 1..];
    match keys.iter().find(|key| after.starts_with(**key)) {
      Some(key) => {
        push_value(&mut output, &fields[*key]);
        rest = &after[key.len()..];
      }
      None => {
        output.push('%');
        rest = after;
      }
    }
  }
  output.push_str(rest);
  output
}

fn flatten_into(entries: &mut HashMap<String, String>, prefix: &str, fields: &Map<String, Value>) -> Result<()> {
  for (name, value) in fields {
    let key = if prefix.is_empty() {
      name.clone()
    } else {
      format!("{}.{}", prefix, name)
    };
    match value {
      Value::String(template) => {
        entries.insert(key, template.clone());
      }
      Value::Object(nested) => flatten_into(entries, &key, nested)?,
      other => {
        return Err(LivebarsError::Config(format!(
          "message '{}' must be a string or an object, got {}",
          key, other
        )));
      }
    }
  }
  Ok(())
}

fn push_value(output: &mut String, value: &Value) {
  match value {
    Value::String(s) => output.push_str(s),
    other => output.push_str(&other.to_string()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn messages() -> Messages {
    Messages::new([
      ("greeting", "Hello, %name!"),
      ("status", "%user has %count new messages (%percent% of quota)"),
      ("plain", "Nothing to see here."),
    ])
  }

  #[test]
  fn test_resolves_known_key() {
    let result = resolve_message(&messages(), "greeting", &json!({ "name": "World" }));
    assert_eq!(result, "Hello, World!");
  }

  #[test]
  fn test_missing_key_names_the_key() {
    let result = resolve_message(&messages(), "farewell", &json!({ "name": "World" }));
    assert!(result.contains("farewell"));
    assert_eq!(result, "[Message string for key farewell not found]");
  }

  #[test]
  fn test_every_occurrence_replaced() {
    let result = string_template("%a-%a-%b", &json!({ "a": "x", "b": 2 }));
    assert_eq!(result, "x-x-2");
  }

  #[test]
  fn test_longest_key_wins() {
    let result = string_template("%username / %user", &json!({ "user": "u", "username": "bob" }));
    assert_eq!(result, "bob / u");
  }

  #[test]
  fn test_unknown_tokens_and_literal_percent_survive() {
    let result = resolve_message(
      &messages(),
      "status",
      &json!({ "user": "Ann", "count": 3, "percent": 40 }),
    );
    assert_eq!(result, "Ann has 3 new messages (40% of quota)");

    let untouched = string_template("100% %missing", &json!({ "name": "x" }));
    assert_eq!(untouched, "100% %missing");
  }

  #[test]
  fn test_substituted_text_is_not_rescanned() {
    let result = string_template("%a", &json!({ "a": "%b", "b": "nope" }));
    assert_eq!(result, "%b");
  }

  #[test]
  fn test_non_object_data_leaves_template_alone() {
    assert_eq!(string_template("Hello, %name!", &json!("World")), "Hello, %name!");
    assert_eq!(string_template("Hello, %name!", &Value::Null), "Hello, %name!");
  }

  #[test]
  fn test_non_string_values_render_as_json() {
    let result = string_template("%flag %list %none", &json!({ "flag": true, "list": [1, 2], "none": null }));
    assert_eq!(result, "true [1,2] null");
  }

  #[test]
  fn test_messages_from_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("messages.json");
    std::fs::write(&path, r#"{ "greeting": "Hi, %name." }"#).unwrap();

    let loaded = Messages::from_json_file(&path).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded.resolve("greeting", &json!({ "name": "Sam" })), "Hi, Sam.");

    std::fs::write(&path, "[1, 2, 3]").unwrap();
    assert!(matches!(Messages::from_json_file(&path), Err(LivebarsError::Config(_))));

    std::fs::write(&path, r#"{ "count": 3 }"#).unwrap();
    assert!(matches!(Messages::from_json_file(&path), Err(LivebarsError::Config(_))));
  }

  #[test]
  fn test_nested_messages_use_dotted_keys() {
    let messages = Messages::from_json_value(&json!({
      "greeting": "Hi, %name.",
      "errors": { "required": "%field is required", "deep": { "er": "deeper" } }
    }))
    .unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(
      messages.resolve("errors.required", &json!({ "field": "Email" })),
      "Email is required"
    );
    assert_eq!(messages.resolve("errors.deep.er", &json!({})), "deeper");
    assert_eq!(
      messages.resolve("errors", &json!({})),
      "[Message string for key errors not found]"
    );
  }

  #[test]
  fn test_empty_template_counts_as_missing() {
    let messages = Messages::new([("blank", "")]);
    assert_eq!(
      resolve_message(&messages, "blank", &json!({})),
      "[Message string for key blank not found]"
    );
  }
}
