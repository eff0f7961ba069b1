//! End-to-end stylesheet scenarios: load a stylesheet document, apply it to
//! input, check the result.

use serde_json::{json, Value};
use stencil_engine::{ConfigError, Engine, Stylesheet};

fn transform(stylesheet: Value, input: Value) -> Value {
    Stylesheet::new(&stylesheet).unwrap().apply(&input).unwrap()
}

#[test]
fn test_constant_literal() {
    let out = transform(json!({"$type": "literal", "value": "@"}), json!({}));
    assert_eq!(out, json!("@"));
}

#[test]
fn test_brace_escaping_template() {
    let out = transform(
        json!({
            "$type": "stringtemplate",
            "content": "a substitution token looks like this: {$lb}texpr{$rb}"
        }),
        json!({}),
    );
    assert_eq!(out, json!("a substitution token looks like this: {texpr}"));
}

#[test]
fn test_contact_template() {
    let out = transform(
        json!({
            "$type": "stringtemplate",
            "content": "Contact {/contact/name} via <{/contact/email}>"
        }),
        json!({"contact": {"name": "Bob", "email": "bob@gmail.com"}}),
    );
    assert_eq!(out, json!("Contact Bob via <bob@gmail.com>"));
}

#[test]
fn test_json_restructure() {
    let out = transform(
        json!({
            "$type": "json",
            "content": {
                "contacts": [{"{/contact/name}": "{/contact/name} <{/contact/email}>"}]
            }
        }),
        json!({"contact": {"name": "Bob", "email": "bob@gmail.com"}}),
    );
    assert_eq!(out, json!({"contacts": [{"Bob": "Bob <bob@gmail.com>"}]}));
}

#[test]
fn test_type_predicates() {
    let stylesheet = json!({"$type": "apply", "transform": "istype", "args": ["object"]});
    assert_eq!(transform(stylesheet.clone(), json!({"a": 1})), json!(true));
    assert_eq!(transform(stylesheet, json!([1, 2])), json!(false));
}

#[test]
fn test_choose_against_context_answers() {
    let stylesheet = json!({
        "$type": "choose",
        "cases": [
            {"test": "isarray", "transform": "$context:/answers/0"},
            {"test": "isstring", "transform": "$context:/answers/1"},
            {"test": "isinteger", "transform": "$context:/answers/2"},
            {"test": "isobject", "transform": "$context:/answers/3"}
        ],
        "default": "$in:"
    });
    let context = json!({"answers": ["c0", "c1", "c2", "c3"]});
    let context = context.as_object().unwrap();

    let sheet = Stylesheet::with_overrides(&stylesheet, Some(context), None).unwrap();
    assert_eq!(sheet.apply(&json!({})).unwrap(), json!("c3"));
    assert_eq!(sheet.apply(&json!([1])).unwrap(), json!("c0"));
    assert_eq!(sheet.apply(&json!("s")).unwrap(), json!("c1"));
    assert_eq!(sheet.apply(&json!(7)).unwrap(), json!("c2"));
    assert_eq!(sheet.apply(&json!(4.1)).unwrap(), json!(4.1));
}

#[test]
fn test_stylesheet_named_transforms() {
    let out = transform(
        json!({
            "$type": "stringtemplate",
            "content": "{greet} world",
            "transforms": {"greet": {"$type": "literal", "value": "hello"}}
        }),
        json!({}),
    );
    assert_eq!(out, json!("hello world"));
}

#[test]
fn test_stylesheet_prefixes() {
    let out = transform(
        json!({
            "$type": "stringtemplate",
            "content": "{curation:/contact/name}",
            "prefixes": {"curation": "/curation"}
        }),
        json!({"curation": {"contact": {"name": "bob"}}}),
    );
    assert_eq!(out, json!("bob"));
}

#[test]
fn test_stylesheet_context_cannot_clobber_protected_keys() {
    let out = transform(
        json!({
            "$type": "extract",
            "select": "$context:/$secure",
            "context": {"$secure": false, "flag": "on"}
        }),
        json!({}),
    );
    // The protected default survives the stylesheet's attempt to override it.
    assert_eq!(out, json!(true));

    let out = transform(
        json!({
            "$type": "extract",
            "select": "$context:/flag",
            "context": {"$secure": false, "flag": "on"}
        }),
        json!({}),
    );
    assert_eq!(out, json!("on"));
}

#[test]
fn test_named_transform_cycle_fails_compilation() {
    let err = Stylesheet::new(&json!({
        "$type": "apply",
        "transform": "a",
        "transforms": {"a": "b", "b": "a"}
    }))
    .unwrap_err();
    assert!(matches!(err, ConfigError::Cycle(_)));
}

#[test]
fn test_non_object_stylesheet_is_rejected() {
    let err = Stylesheet::new(&json!(["not", "a", "stylesheet"])).unwrap_err();
    assert!(matches!(err, ConfigError::NotAnObject { .. }));
}

#[test]
fn test_standard_module_validates() {
    Engine::standard().resolve_all_transforms().unwrap();
}

#[test]
fn test_foreach_report() {
    let out = transform(
        json!({
            "$type": "apply",
            "transform": "delimit('; ')",
            "input": {
                "$type": "foreach",
                "propmap": {"$type": "stringtemplate", "content": "{/0}={/1}"}
            }
        }),
        json!({"a": 1, "b": 2}),
    );
    assert_eq!(out, json!("a=1; b=2"));
}

#[test]
fn test_nested_stylesheet_composition() {
    // A named transform used from a template, selecting through a prefix.
    let stylesheet = json!({
        "$type": "json",
        "prefixes": {"who": "/curation/contact"},
        "transforms": {
            "fullname": {
                "$type": "stringtemplate",
                "content": "{who:/first} {who:/last}"
            }
        },
        "content": {
            "label": "{fullname}",
            "emails": {"$val": "who:/emails"}
        }
    });
    let input = json!({
        "curation": {
            "contact": {
                "first": "Ada",
                "last": "Byron",
                "emails": ["ada@example.org"]
            }
        }
    });
    assert_eq!(
        transform(stylesheet, input),
        json!({"label": "Ada Byron", "emails": ["ada@example.org"]})
    );
}
