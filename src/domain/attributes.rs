//! Typed view of the JSON blobs stored in text columns
//! (product specifications, custom data, movement snapshots).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single attribute value. Anything JSON can hold that isn't one of these
/// (objects, null) is dropped when a blob is parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<AttributeValue>),
}

impl AttributeValue {
    pub fn as_text(&self) -> String {
        match self {
            AttributeValue::Bool(b) => b.to_string(),
            AttributeValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            AttributeValue::Text(s) => s.clone(),
            AttributeValue::List(items) => items
                .iter()
                .map(|v| v.as_text())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            AttributeValue::Text(s) => s.trim().is_empty(),
            AttributeValue::List(items) => items.is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Text(s)
    }
}

impl From<f64> for AttributeValue {
    fn from(n: f64) -> Self {
        AttributeValue::Number(n)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}

pub type Attributes = BTreeMap<String, AttributeValue>;

/// Parse a stored blob. Malformed text or a non-object reads as an empty map.
pub fn parse_attributes(raw: &str) -> Attributes {
    let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(raw) else {
        if !raw.trim().is_empty() {
            tracing::warn!("Ignoring malformed attribute blob");
        }
        return Attributes::new();
    };

    map.into_iter()
        .filter_map(|(k, v)| {
            serde_json::from_value::<AttributeValue>(v)
                .ok()
                .map(|v| (k, v))
        })
        .collect()
}

pub fn to_json_text(attrs: &Attributes) -> String {
    serde_json::to_string(attrs).unwrap_or_else(|_| "{}".to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Number,
    Select,
    Boolean,
}

/// Describes one category-specific or product-type custom field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    #[serde(alias = "tipo")]
    pub kind: FieldKind,
    #[serde(default, alias = "etiqueta")]
    pub label: Option<String>,
    #[serde(default, alias = "requerido")]
    pub required: bool,
    #[serde(default, alias = "opciones")]
    pub options: Vec<String>,
}

pub type FieldDefinitions = BTreeMap<String, FieldDefinition>;

/// Parse stored field definitions, dropping entries that don't describe a field
pub fn parse_definitions(raw: &str) -> FieldDefinitions {
    let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(raw) else {
        return FieldDefinitions::new();
    };

    map.into_iter()
        .filter_map(|(k, v)| {
            serde_json::from_value::<FieldDefinition>(v)
                .ok()
                .map(|d| (k, d))
        })
        .collect()
}

pub fn definitions_to_json_text(defs: &FieldDefinitions) -> String {
    serde_json::to_string(defs).unwrap_or_else(|_| "{}".to_string())
}

/// Keep only the keys that have a definition
pub fn retain_defined(data: Attributes, definitions: &FieldDefinitions) -> Attributes {
    data.into_iter()
        .filter(|(k, _)| definitions.contains_key(k))
        .collect()
}

/// Check `data` against `definitions`; returns one message per problem
pub fn validate_against(definitions: &FieldDefinitions, data: &Attributes) -> Vec<String> {
    let mut problems = Vec::new();

    for (name, def) in definitions {
        let label = def.label.as_deref().unwrap_or(name);
        let value = data.get(name).filter(|v| !v.is_blank());

        let Some(value) = value else {
            if def.required {
                problems.push(format!("Field '{}' is required", label));
            }
            continue;
        };

        match def.kind {
            FieldKind::Number => {
                let numeric = match value {
                    AttributeValue::Number(_) => true,
                    AttributeValue::Text(s) => s.trim().parse::<f64>().is_ok(),
                    _ => false,
                };
                if !numeric {
                    problems.push(format!("Field '{}' must be a number", label));
                }
            }
            FieldKind::Boolean => {
                if !matches!(value, AttributeValue::Bool(_)) {
                    problems.push(format!("Field '{}' must be true or false", label));
                }
            }
            FieldKind::Select => {
                let text = value.as_text();
                if !def.options.is_empty() && !def.options.iter().any(|o| *o == text) {
                    problems.push(format!(
                        "Field '{}' must be one of: {}",
                        label,
                        def.options.join(", ")
                    ));
                }
            }
            FieldKind::Text => {}
        }
    }

    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_values() {
        let attrs = parse_attributes(r#"{"ram": 16, "ssd": true, "os": "Linux", "ports": ["usb", "hdmi"], "x": null}"#);
        assert_eq!(attrs.get("ram"), Some(&AttributeValue::Number(16.0)));
        assert_eq!(attrs.get("ssd"), Some(&AttributeValue::Bool(true)));
        assert_eq!(attrs.get("os"), Some(&AttributeValue::from("Linux")));
        assert_eq!(attrs["ports"].as_text(), "usb, hdmi");
        assert!(!attrs.contains_key("x"));
    }

    #[test]
    fn malformed_blob_is_empty() {
        assert!(parse_attributes("not json").is_empty());
        assert!(parse_attributes("[1,2]").is_empty());
        assert!(parse_attributes("").is_empty());
    }

    #[test]
    fn definitions_accept_spanish_keys() {
        let defs = parse_definitions(
            r#"{"ram": {"tipo": "number", "requerido": true}, "color": {"kind": "select", "options": ["black", "white"]}, "bad": 3}"#,
        );
        assert_eq!(defs.len(), 2);
        assert_eq!(defs["ram"].kind, FieldKind::Number);
        assert!(defs["ram"].required);
        assert_eq!(defs["color"].options, vec!["black", "white"]);
    }

    #[test]
    fn validation_reports_each_problem() {
        let defs = parse_definitions(
            r#"{"ram": {"kind": "number", "required": true, "label": "RAM"},
                "color": {"kind": "select", "options": ["black"]},
                "wifi": {"kind": "boolean"}}"#,
        );

        let mut data = Attributes::new();
        data.insert("color".into(), "pink".into());
        data.insert("wifi".into(), "yes".into());

        let problems = validate_against(&defs, &data);
        assert_eq!(problems.len(), 3);
        assert!(problems.iter().any(|p| p.contains("'RAM' is required")));

        data.insert("ram".into(), "16".into());
        data.insert("color".into(), "black".into());
        data.insert("wifi".into(), true.into());
        assert!(validate_against(&defs, &data).is_empty());
    }

    #[test]
    fn retain_defined_drops_unknown_keys() {
        let defs = parse_definitions(r#"{"ram": {"kind": "number"}}"#);
        let mut data = Attributes::new();
        data.insert("ram".into(), 8.0.into());
        data.insert("junk".into(), "x".into());
        let kept = retain_defined(data, &defs);
        assert_eq!(kept.len(), 1);
        assert_eq!(to_json_text(&kept), r#"{"ram":8.0}"#);
    }
}
