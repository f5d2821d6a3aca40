//! Tests for configuration validation.

use hookpack_config::{
    ConfigError, ConfigNormalizer, ConfigValidator, PluginDeclaration, SchemaValidator,
};
use serde_json::json;

#[test]
fn invalid_configuration_lists_every_field_path() {
    let result = ConfigNormalizer::new().with_cwd("/project").normalize(&json!({
        "entry": "",
        "output": { "filename": 7 },
        "watch": "yes"
    }));

    match result.unwrap_err() {
        ConfigError::SchemaValidation { violations } => {
            let paths: Vec<&str> = violations.iter().map(|v| v.path.as_str()).collect();
            assert_eq!(
                paths,
                vec![
                    "configuration.entry",
                    "configuration.output.filename",
                    "configuration.watch"
                ]
            );
        }
        other => panic!("expected SchemaValidation error, got {other:?}"),
    }
}

#[test]
fn multi_target_violations_are_prefixed() {
    let result = ConfigNormalizer::new()
        .with_cwd("/project")
        .normalize_many(&[json!({ "name": "a" }), json!({ "dependencies": "a" })]);

    let err = result.unwrap_err();
    assert_eq!(err.violations().len(), 1);
    assert_eq!(err.violations()[0].path, "configuration[1].dependencies");
    assert_eq!(err.violations()[0].message, "expected an array of non-empty strings");
}

#[test]
fn array_root_is_not_a_single_target() {
    let err = SchemaValidator.validate(&json!([{ "entry": "./a.js" }])).unwrap_err();
    assert_eq!(err.violations()[0].path, "configuration");
}

#[test]
fn invalid_rule_pattern_is_a_schema_violation() {
    let err = SchemaValidator
        .validate(&json!({ "module": { "rules": [{ "test": "[a-", "use": "x" }] } }))
        .unwrap_err();
    let violation = &err.violations()[0];
    assert_eq!(violation.path, "configuration.module.rules[0].test");
    assert!(violation.message.starts_with("invalid pattern"));
}

#[test]
fn plugin_declarations_are_not_rejected_by_the_schema() {
    let options = ConfigNormalizer::new()
        .with_cwd("/project")
        .normalize(&json!({ "plugins": ["banner", { "name": "define", "options": { "x": 1 } }, 12] }))
        .expect("plugins accept any declaration");

    assert_eq!(options.plugins.len(), 3);
    assert!(matches!(options.plugins[0], PluginDeclaration::Named { .. }));
    assert!(matches!(options.plugins[1], PluginDeclaration::Named { .. }));
    assert!(matches!(options.plugins[2], PluginDeclaration::Unrecognized(_)));
}

#[test]
fn schema_document_is_exposed() {
    let schema = &*hookpack_config::schema::OPTIONS_SCHEMA;
    assert_eq!(schema["type"], "object");
    assert_eq!(schema["additionalProperties"], false);
    assert_eq!(
        schema["properties"]["mode"]["enum"],
        json!(["development", "production", "none"])
    );
}
