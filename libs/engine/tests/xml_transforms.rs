//! Element-builder transforms and XML rendering through the engine.

use serde_json::{json, Value};
use stencil_engine::{Engine, Stylesheet};

fn apply(engine: &Engine, config: Value, input: Value) -> Value {
    let transform = engine.make_transform(&config, Some("test")).unwrap();
    transform.apply(&input, engine.context(), &[]).unwrap()
}

#[test]
fn test_attribute_literal() {
    let engine = Engine::standard();
    let at = apply(
        &engine,
        json!({"$type": "attribute", "name": "role", "value": "report"}),
        json!({"foo": "bar"}),
    );
    assert_eq!(at, json!({"name": "role", "value": "report"}));
}

#[test]
fn test_attribute_template_value() {
    let engine = Engine::standard();
    let at = apply(
        &engine,
        json!({"$type": "attribute", "name": "role", "value": "{/foo}"}),
        json!({"foo": "bar"}),
    );
    assert_eq!(at, json!({"name": "role", "value": "bar"}));
}

#[test]
fn test_attribute_val_directive() {
    let engine = Engine::standard();
    let at = apply(
        &engine,
        json!({"$type": "attribute", "name": "role", "value": {"$val": "/foo"}}),
        json!({"foo": "bar"}),
    );
    assert_eq!(at, json!({"name": "role", "value": "bar"}));

    let at = apply(
        &engine,
        json!({
            "$type": "attribute",
            "name": "role",
            "value": {"$val": {"$type": "extract", "select": "/foo"}}
        }),
        json!({"foo": "bar"}),
    );
    assert_eq!(at, json!({"name": "role", "value": "bar"}));
}

#[test]
fn test_attribute_anonymous_transform_value() {
    let engine = Engine::standard();
    let at = apply(
        &engine,
        json!({
            "$type": "attribute",
            "name": "role",
            "value": {"$type": "extract", "select": "/foo"}
        }),
        json!({"foo": "bar"}),
    );
    assert_eq!(at, json!({"name": "role", "value": "bar"}));
}

#[test]
fn test_attribute_templated_name() {
    let engine = Engine::standard();
    let at = apply(
        &engine,
        json!({"$type": "attribute", "name": "{/foo}", "value": "{/foo}"}),
        json!({"foo": "bar"}),
    );
    assert_eq!(at, json!({"name": "bar", "value": "bar"}));
}

#[test]
fn test_attribute_function_form() {
    let engine = Engine::standard();
    let at = apply(
        &engine,
        json!({"$type": "apply", "transform": "xml.attribute('role', /foo)"}),
        json!({"foo": "bar"}),
    );
    assert_eq!(at, json!({"name": "role", "value": "bar"}));
}

#[test]
fn test_element_content() {
    let engine = Engine::standard();
    let el = apply(
        &engine,
        json!({
            "$type": "elementContent",
            "children": ["metals"],
            "attrs": [
                {"$type": "attribute", "name": "role", "value": "report"},
                "xml.attribute('xmlns', '')"
            ]
        }),
        json!({"foo": "bar"}),
    );
    assert_eq!(el["children"], json!(["metals"]));
    assert_eq!(el["attrs"][0]["name"], json!("role"));
    assert_eq!(el["attrs"][1]["name"], json!("xmlns"));
}

#[test]
fn test_element_content_nested_elements() {
    let engine = Engine::standard();
    let el = apply(
        &engine,
        json!({
            "$type": "elementContent",
            "children": [
                {
                    "$type": "textElement",
                    "name": "subject",
                    "value": "metals",
                    "hints": {"xml.value_pad": 1}
                },
                {"$val": "xml.textElement('subject', /foo)"}
            ]
        }),
        json!({"foo": "bar"}),
    );
    let children = el["children"].as_array().unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0]["name"], json!("subject"));
    assert_eq!(children[1]["name"], json!("subject"));
    assert_eq!(children[1]["content"]["children"][0], json!("bar"));
}

#[test]
fn test_element_and_render() {
    let engine = Engine::standard();
    let el = apply(
        &engine,
        json!({
            "$type": "element",
            "name": "subject",
            "content": {
                "children": ["metals"],
                "attrs": [
                    {"$type": "attribute", "name": "role", "value": "report"},
                    {"$type": "attribute", "name": "xmlns", "value": ""}
                ]
            },
            "hints": {"xml.value_pad": 1}
        }),
        json!({"foo": "bar"}),
    );
    assert_eq!(el["name"], json!("subject"));
    assert_eq!(el["content"]["children"], json!(["metals"]));
    assert_eq!(el["content"]["attrs"][0]["name"], json!("role"));

    let rendered = apply(&engine, json!({"$type": "xmlPrint"}), el);
    assert_eq!(
        rendered,
        json!("<subject role=\"report\" xmlns=\"\"> metals </subject>")
    );
}

#[test]
fn test_text_element() {
    let engine = Engine::standard();
    let el = apply(
        &engine,
        json!({
            "$type": "textElement",
            "name": "subject",
            "value": "metals",
            "hints": {"xml.value_pad": 1}
        }),
        json!({}),
    );
    assert_eq!(el["name"], json!("subject"));
    assert_eq!(el["content"]["children"], json!(["metals"]));

    let rendered = apply(&engine, json!({"$type": "xmlPrint"}), el);
    assert_eq!(rendered, json!("<subject> metals </subject>"));
}

#[test]
fn test_xml_print_value_pad_and_style() {
    let engine = Engine::standard();
    let element = json!({
        "name": "subject",
        "content": {"children": ["metals"]},
        "hints": {"xml.value_pad": 2}
    });

    let pretty = apply(
        &engine,
        json!({"$type": "xmlPrint", "hints": {"xml.indent": 4}}),
        element.clone(),
    );
    assert_eq!(pretty, json!("    <subject>  metals  </subject>"));

    let compact = apply(
        &engine,
        json!({"$type": "xmlPrint", "hints": {"xml.style": "compact"}}),
        element,
    );
    assert_eq!(compact, json!("<subject>metals</subject>"));
}

#[test]
fn test_xml_pipeline_stylesheet() {
    let stylesheet = json!({
        "$type": "apply",
        "transform": "xml.print",
        "input": {
            "$type": "textElement",
            "name": "subject",
            "value": {"$val": "/topic"},
            "hints": {"xml.value_pad": 1}
        }
    });
    let sheet = Stylesheet::new(&stylesheet).unwrap();
    let out = sheet.render(&json!({"topic": "metals"}), false).unwrap();
    assert_eq!(out, "<subject> metals </subject>");
}

#[test]
fn test_xml_nested_document_stylesheet() {
    let stylesheet = json!({
        "$type": "apply",
        "transform": "xml.print",
        "input": {
            "$type": "element",
            "name": "catalog",
            "content": {
                "attrs": [{"$type": "attribute", "name": "edition", "value": "{/edition}"}],
                "children": [
                    {"$val": "xml.textElement('title', /title)"},
                    {"$val": "xml.textElement('title', /subtitle)"}
                ]
            }
        },
        "context": {"xml.value_pad": 1}
    });
    let sheet = Stylesheet::new(&stylesheet).unwrap();
    let out = sheet
        .render(
            &json!({"edition": "2e", "title": "Metals", "subtitle": "Alloys"}),
            false,
        )
        .unwrap();
    assert_eq!(
        out,
        "<catalog edition=\"2e\">\n  <title> Metals </title>\n  <title> Alloys </title>\n</catalog>"
    );
}
