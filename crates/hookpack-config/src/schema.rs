//! The configuration schema.
//!
//! The schema is a JSON Schema document compiled once, on first use, and is
//! read-only afterwards. Every subschema carries a `description` naming the
//! accepted values; violation messages are built from it.

use jsonschema::error::ValidationErrorKind;
use jsonschema::{ValidationError, Validator};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};

use crate::error::SchemaViolation;
use crate::options::Mode;

/// Path prefix of every violation in a single configuration.
pub const ROOT: &str = "configuration";

/// Custom `format` for rule tests: the string must compile with [`regex`].
pub const PATTERN_FORMAT: &str = "rule-pattern";

/// Schema document of one build target.
pub static OPTIONS_SCHEMA: Lazy<Value> = Lazy::new(options_schema);

static VALIDATOR: Lazy<Validator> = Lazy::new(|| {
    tracing::debug!("compiling configuration schema");
    jsonschema::options()
        .should_validate_formats(true)
        .with_format(PATTERN_FORMAT, |value: &str| Regex::new(value).is_ok())
        .build(&OPTIONS_SCHEMA)
        .expect("configuration schema is a valid JSON Schema document")
});

fn non_empty_string() -> Value {
    json!({ "type": "string", "pattern": "\\S", "description": "a non-empty string" })
}

fn strings() -> Value {
    json!({
        "anyOf": [
            non_empty_string(),
            { "type": "array", "minItems": 1, "items": non_empty_string(), "description": "a non-empty array of non-empty strings" }
        ],
        "description": "a non-empty string or a non-empty array of non-empty strings"
    })
}

fn non_negative_integer() -> Value {
    json!({ "type": "integer", "minimum": 0, "description": "a non-negative integer" })
}

fn boolean() -> Value {
    json!({ "type": "boolean", "description": "a boolean" })
}

fn object(properties: Value, required: &[&str], description: &str) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
        "description": description
    })
}

fn options_schema() -> Value {
    let entry_descriptor = object(
        json!({ "import": strings(), "filename": non_empty_string() }),
        &["import"],
        "an entry descriptor",
    );
    let entry_item = json!({
        "anyOf": [non_empty_string(), strings(), entry_descriptor],
        "description": "a non-empty string, a non-empty array of non-empty strings or an entry descriptor"
    });

    let rule = object(
        json!({
            "test": { "type": "string", "format": PATTERN_FORMAT, "description": "a pattern string" },
            "use": strings()
        }),
        &["test"],
        "a module rule",
    );

    let modes = Mode::ALL
        .iter()
        .map(|mode| format!("\"{mode}\""))
        .collect::<Vec<_>>()
        .join(", ");

    object(
        json!({
            "name": non_empty_string(),
            "entry": {
                "anyOf": [
                    non_empty_string(),
                    { "type": "array", "minItems": 1, "items": non_empty_string() },
                    { "type": "object", "additionalProperties": entry_item }
                ],
                "description": "a non-empty string, a non-empty array of non-empty strings or an object of entries"
            },
            "context": non_empty_string(),
            "output": object(
                json!({ "filename": non_empty_string(), "path": non_empty_string() }),
                &[],
                "an object",
            ),
            "module": object(
                json!({
                    "rules": { "type": "array", "items": rule, "description": "an array of module rules" }
                }),
                &[],
                "an object",
            ),
            "mode": { "enum": Mode::ALL, "description": format!("one of {modes}") },
            "devtool": {
                "anyOf": [non_empty_string(), { "const": false }],
                "description": "a non-empty string or false"
            },
            "watch": boolean(),
            "watchOptions": object(
                json!({
                    "aggregateTimeout": non_negative_integer(),
                    "poll": {
                        "anyOf": [boolean(), non_negative_integer()],
                        "description": "a boolean or a non-negative integer"
                    },
                    "ignored": strings()
                }),
                &[],
                "an object",
            ),
            "plugins": { "type": "array", "description": "an array" },
            "dependencies": {
                "type": "array",
                "items": non_empty_string(),
                "description": "an array of non-empty strings"
            }
        }),
        &[],
        "an object",
    )
}

/// Check `config` against the schema, with violation paths rooted at `root`.
///
/// Violations are ordered the way the offending fields appear in `config`.
pub fn check(config: &Value, root: &str) -> Vec<SchemaViolation> {
    let mut found: Vec<(Vec<usize>, SchemaViolation)> = VALIDATOR
        .iter_errors(config)
        .flat_map(|error| violations_of(config, &error, root))
        .collect();
    found.sort_by(|a, b| a.0.cmp(&b.0));
    found.into_iter().map(|(_, violation)| violation).collect()
}

/// Whether `config` satisfies the schema.
pub fn accepts(config: &Value) -> bool {
    VALIDATOR.is_valid(config)
}

fn violations_of(
    config: &Value,
    error: &ValidationError<'_>,
    root: &str,
) -> Vec<(Vec<usize>, SchemaViolation)> {
    let pointer = error.instance_path().to_string();
    let location = Location::resolve(config, root, &pointer);

    match error.kind() {
        ValidationErrorKind::AdditionalProperties { unexpected } => unexpected
            .iter()
            .map(|key| location.child(key, "unknown property"))
            .collect(),
        ValidationErrorKind::Required { property } => {
            let key = property.as_str().unwrap_or_default();
            vec![location.child(key, "missing required property")]
        }
        ValidationErrorKind::Format { format } if format.as_str() == PATTERN_FORMAT => {
            let message = match config.pointer(&pointer).and_then(Value::as_str).map(Regex::new) {
                Some(Err(err)) => format!("invalid pattern: {err}"),
                _ => "invalid pattern".to_string(),
            };
            vec![location.here(message)]
        }
        _ => {
            let message = match expected(&error.schema_path().to_string()) {
                Some(description) => format!("expected {description}"),
                None => error.to_string(),
            };
            vec![location.here(message)]
        }
    }
}

/// Description of the subschema owning the failed keyword.
fn expected(schema_path: &str) -> Option<&'static str> {
    let owner = schema_path.rsplit_once('/').map_or("", |(owner, _)| owner);
    OPTIONS_SCHEMA.pointer(owner)?.get("description")?.as_str()
}

/// A position in the configuration, as a dotted path and a sort key.
struct Location<'a> {
    value: Option<&'a Value>,
    path: String,
    order: Vec<usize>,
}

impl<'a> Location<'a> {
    /// Walk a JSON pointer through `config`.
    fn resolve(config: &'a Value, root: &str, pointer: &str) -> Self {
        let mut location = Location {
            value: Some(config),
            path: root.to_string(),
            order: Vec::new(),
        };
        for segment in pointer.split('/').skip(1) {
            let segment = segment.replace("~1", "/").replace("~0", "~");
            location = location.step(&segment);
        }
        location
    }

    fn step(self, segment: &str) -> Self {
        match self.value {
            Some(Value::Array(items)) => {
                let index = segment.parse::<usize>().unwrap_or(usize::MAX);
                let mut order = self.order;
                order.push(index);
                Location {
                    value: items.get(index),
                    path: format!("{}[{segment}]", self.path),
                    order,
                }
            }
            Some(Value::Object(map)) => {
                let mut order = self.order;
                order.push(key_position(map, segment));
                Location {
                    value: map.get(segment),
                    path: format!("{}.{segment}", self.path),
                    order,
                }
            }
            _ => Location {
                value: None,
                path: format!("{}.{segment}", self.path),
                order: self.order,
            },
        }
    }

    fn here(&self, message: impl Into<String>) -> (Vec<usize>, SchemaViolation) {
        (self.order.clone(), SchemaViolation::new(&self.path, message))
    }

    fn child(&self, key: &str, message: &str) -> (Vec<usize>, SchemaViolation) {
        let mut order = self.order.clone();
        order.push(
            self.value
                .and_then(Value::as_object)
                .map_or(usize::MAX, |map| key_position(map, key)),
        );
        (order, SchemaViolation::new(format!("{}.{key}", self.path), message))
    }
}

fn key_position(map: &serde_json::Map<String, Value>, key: &str) -> usize {
    map.keys().position(|k| k == key).unwrap_or(usize::MAX)
}
