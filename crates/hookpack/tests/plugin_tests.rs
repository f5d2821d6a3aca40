//! Plugin application order and declaration errors.

mod helpers;

use helpers::EventLog;
use hookpack::{
    Compiler, CompilerPlugin, Error, Plugin, PluginRegistry, RawOptions, create_compiler,
};
use serde_json::json;

struct Recording {
    name: &'static str,
    log: EventLog,
}

impl CompilerPlugin for Recording {
    fn name(&self) -> &str {
        self.name
    }

    fn apply(&self, _compiler: &Compiler) -> hookpack::Result<()> {
        self.log.push(self.name);
        Ok(())
    }
}

#[test]
fn declared_plugins_apply_before_in_code_plugins() {
    let log = EventLog::new();
    for name in ["order-declared-a", "order-declared-b"] {
        let l = log.clone();
        PluginRegistry::global().register(name, move |options| {
            let l = l.clone();
            let suffix = options
                .get("suffix")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            Ok(Plugin::function(move |_| {
                l.push(format!("{name}{suffix}"));
                Ok(())
            }))
        });
    }

    let l = log.clone();
    let raw = RawOptions::new(json!({
        "plugins": [
            "order-declared-a",
            { "name": "order-declared-b", "options": { "suffix": "!" } }
        ]
    }))
    .plugin(Plugin::function(move |_| {
        l.push("function");
        Ok(())
    }))
    .plugin(Plugin::object(Recording {
        name: "object",
        log: log.clone(),
    }));

    create_compiler(raw).unwrap();

    assert_eq!(
        log.events(),
        vec!["order-declared-a", "order-declared-b!", "function", "object"]
    );
}

#[test]
fn construction_hooks_fire_after_plugins() {
    let log = EventLog::new();
    let l = log.clone();
    let raw = RawOptions::new(json!({})).plugin(Plugin::function(move |compiler| {
        l.push("apply");
        for (hook, event) in [
            (&compiler.hooks.environment, "environment"),
            (&compiler.hooks.after_environment, "afterEnvironment"),
            (&compiler.hooks.initialize, "initialize"),
        ] {
            let l = l.clone();
            hook.tap("log", move |_| l.push(event));
        }
        Ok(())
    }));

    create_compiler(raw).unwrap();

    assert_eq!(
        log.events(),
        vec!["apply", "environment", "afterEnvironment", "initialize"]
    );
}

#[test]
fn unknown_plugin_name_is_invalid() {
    let err = create_compiler(RawOptions::new(json!({
        "plugins": ["entry", "definitely-not-registered"]
    })))
    .unwrap_err();

    assert!(matches!(
        err,
        Error::InvalidPlugin { index: 1, ref reason } if reason.contains("definitely-not-registered")
    ));
    assert!(err.is_construction_error());
}

#[test]
fn unrecognized_declaration_is_invalid() {
    let err = create_compiler(RawOptions::new(json!({ "plugins": [42] }))).unwrap_err();
    assert!(matches!(err, Error::InvalidPlugin { index: 0, ref reason } if reason.contains("a number")));

    let err = create_compiler(RawOptions::new(json!({ "plugins": [{ "options": {} }] }))).unwrap_err();
    assert!(matches!(err, Error::InvalidPlugin { index: 0, .. }));
}

#[test]
fn invalid_declaration_applies_no_plugin() {
    let log = EventLog::new();
    let l = log.clone();
    PluginRegistry::global().register("untouched-declared", move |_| {
        let l = l.clone();
        Ok(Plugin::function(move |_| {
            l.push("declared");
            Ok(())
        }))
    });

    let l = log.clone();
    let raw = RawOptions::new(json!({ "plugins": ["untouched-declared", null] })).plugin(
        Plugin::function(move |_| {
            l.push("function");
            Ok(())
        }),
    );

    assert!(create_compiler(raw).is_err());
    assert!(log.events().is_empty());
}

#[test]
fn failing_plugin_aborts_construction() {
    let raw = RawOptions::new(json!({}))
        .plugin(Plugin::function(|_| Err(Error::plugin("strict", "refusing to apply"))));

    let err = create_compiler(raw).unwrap_err();
    assert_eq!(err.to_string(), "Plugin 'strict' failed: refusing to apply");
}
