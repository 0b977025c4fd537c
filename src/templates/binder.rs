use minijinja::{AutoEscape, Environment, ErrorKind, UndefinedBehavior, Value};
use serde_json::{Map, Value as JsonValue};

use crate::core::TemplateError;

/// Name under which the serialized `items` array is exposed to templates.
pub const ITEMS_JSON_VAR: &str = "items_json";

/// Interpolates request data into stored template markup.
///
/// Undefined variables render as empty strings. Output is never auto-escaped:
/// stored templates are trusted HTML, and the serialized items have to reach
/// `<script>` blocks untouched.
pub struct TemplateBinder {
    env: Environment<'static>,
}

impl Default for TemplateBinder {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateBinder {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Lenient);
        env.set_auto_escape_callback(|_| AutoEscape::None);

        // handlebars-style helper for templates written as `{{ json(value) }}`
        env.add_function("json", to_json);
        env.add_filter("json", to_json);

        TemplateBinder { env }
    }

    pub fn bind(
        &self,
        template: &str,
        data: &Map<String, JsonValue>,
    ) -> Result<String, TemplateError> {
        let context = self.context(data)?;
        Ok(self.env.render_str(template, &context)?)
    }

    /// Top-level keys of `data` plus the synthesized items variable.
    pub fn context(
        &self,
        data: &Map<String, JsonValue>,
    ) -> Result<Map<String, JsonValue>, TemplateError> {
        let items = data
            .get("items")
            .cloned()
            .unwrap_or_else(|| JsonValue::Array(Vec::new()));
        let items_json = serde_json::to_string(&items)
            .map_err(|e| TemplateError::Render(format!("cannot serialize items: {}", e)))?;

        let mut context = data.clone();
        context.insert(ITEMS_JSON_VAR.to_string(), JsonValue::String(items_json));
        Ok(context)
    }
}

fn to_json(value: Value) -> Result<Value, minijinja::Error> {
    serde_json::to_string(&value)
        .map(Value::from)
        .map_err(|e| {
            minijinja::Error::new(
                ErrorKind::InvalidOperation,
                format!("cannot serialize value to JSON: {}", e),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: JsonValue) -> Map<String, JsonValue> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn substitutes_top_level_keys() {
        let binder = TemplateBinder::new();
        let out = binder
            .bind("<h1>{{ name }}</h1><p>{{ account.id }}</p>", &data(json!({
                "name": "Acme",
                "account": {"id": 42}
            })))
            .unwrap();
        assert_eq!(out, "<h1>Acme</h1><p>42</p>");
    }

    #[test]
    fn items_json_is_exact_encoding_of_items() {
        let binder = TemplateBinder::new();
        let payload = data(json!({
            "items": [{"label": "A", "value": 1}, {"label": "B", "value": 2.5}]
        }));
        let out = binder.bind("{{ items_json }}", &payload).unwrap();
        assert_eq!(out, serde_json::to_string(&payload["items"]).unwrap());
        assert_eq!(out, r#"[{"label":"A","value":1},{"label":"B","value":2.5}]"#);
    }

    #[test]
    fn items_json_defaults_to_empty_array() {
        let binder = TemplateBinder::new();
        let out = binder.bind("<script>const d = {{ items_json }};</script>", &Map::new()).unwrap();
        assert_eq!(out, "<script>const d = [];</script>");
    }

    #[test]
    fn synthesized_items_json_wins_over_caller_key() {
        let binder = TemplateBinder::new();
        let out = binder
            .bind("{{ items_json }}", &data(json!({"items_json": "spoofed", "items": [1]})))
            .unwrap();
        assert_eq!(out, "[1]");
    }

    #[test]
    fn markup_is_not_escaped() {
        let binder = TemplateBinder::new();
        let payload = data(json!({"items": ["<b>"], "html": "<i>x</i>"}));
        let out = binder.bind("{{ items_json }}|{{ html }}", &payload).unwrap();
        assert_eq!(out, r#"["<b>"]|<i>x</i>"#);
    }

    #[test]
    fn undefined_variables_render_empty() {
        let binder = TemplateBinder::new();
        let out = binder
            .bind("[{{ missing }}]{% for row in nothing %}x{% endfor %}", &Map::new())
            .unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn json_helper_serializes_any_value() {
        let binder = TemplateBinder::new();
        let out = binder
            .bind("{{ json(totals) }} {{ totals | json }}", &data(json!({"totals": {"sum": 3}})))
            .unwrap();
        assert_eq!(out, r#"{"sum":3} {"sum":3}"#);
    }

    #[test]
    fn malformed_template_is_a_syntax_error() {
        let binder = TemplateBinder::new();
        let err = binder.bind("{% for x in %}", &Map::new()).unwrap_err();
        assert!(matches!(err, TemplateError::Syntax(_)));
    }

    #[test]
    fn attribute_of_undefined_is_a_render_error() {
        let binder = TemplateBinder::new();
        let err = binder.bind("{{ missing.field }}", &Map::new()).unwrap_err();
        assert!(matches!(err, TemplateError::Render(_)));
    }
}
