//! The standard module: built-in transform kinds, the standard named
//! transforms, and the default context, installed into every root engine
//! before any user stylesheet loads.

use serde_json::{json, Value};

use crate::engine::Engine;
use crate::kinds;

pub(crate) fn install(engine: &Engine) {
    register_kinds(engine);

    let module = module_definitions();
    let module = module
        .as_object()
        .expect("standard module definitions are an object");
    engine
        .load_definitions(module)
        .expect("standard module definitions are valid");

    // Context defaults install directly so protected `$` entries land too.
    if let Some(context) = module.get("context").and_then(Value::as_object) {
        for (key, value) in context {
            engine.context().install(key, value.clone());
        }
    }
}

fn register_kinds(engine: &Engine) {
    engine.register_kind("identity", kinds::compile_identity);
    engine.register_kind("literal", kinds::compile_literal);
    engine.register_kind("extract", kinds::compile_extract);
    engine.register_kind("stringtemplate", kinds::template::compile);
    engine.register_kind("json", kinds::json::compile);
    engine.register_kind("map", kinds::collection::compile_map);
    engine.register_kind("foreach", kinds::collection::compile_foreach);
    engine.register_kind("apply", kinds::control::compile_apply);
    engine.register_kind("choose", kinds::control::compile_choose);
    engine.register_kind("native", kinds::function::compile_native);
    engine.register_kind("function", kinds::function::compile_function);
    engine.register_kind("callable", kinds::function::compile_callable);
    engine.register_kind("attribute", kinds::xml::compile_attribute);
    engine.register_kind("elementContent", kinds::xml::compile_element_content);
    engine.register_kind("element", kinds::xml::compile_element);
    engine.register_kind("textElement", kinds::xml::compile_text_element);
    engine.register_kind("xmlPrint", kinds::xml::compile_print);
}

/// The module stylesheet: named transforms and context defaults available to
/// every stylesheet.
fn module_definitions() -> Value {
    json!({
        "transforms": {
            "$lb": { "$type": "literal", "value": "{" },
            "$rb": { "$type": "literal", "value": "}" },

            "identity":   { "$type": "native", "impl": "$identity" },
            "tostr":      { "$type": "native", "impl": "$tostr" },
            "tobool":     { "$type": "native", "impl": "$tobool" },
            "delimit":    { "$type": "native", "impl": "$delimit" },
            "wrap":       { "$type": "native", "impl": "$wrap" },
            "indent":     { "$type": "native", "impl": "$indent" },
            "fill":       { "$type": "native", "impl": "$fill" },
            "prop_names": { "$type": "native", "impl": "$prop_names" },
            "metaprop":   { "$type": "native", "impl": "$metaprop" },
            "isdefined":  { "$type": "native", "impl": "$isdefined" },
            "istype":     { "$type": "native", "impl": "$istype" },

            "isobject":  { "$type": "native", "impl": "$istype", "args": ["object"] },
            "isarray":   { "$type": "native", "impl": "$istype", "args": ["array"] },
            "isstring":  { "$type": "native", "impl": "$istype", "args": ["string"] },
            "isnumber":  { "$type": "native", "impl": "$istype", "args": ["number"] },
            "isinteger": { "$type": "native", "impl": "$istype", "args": ["integer"] },
            "isboolean": { "$type": "native", "impl": "$istype", "args": ["boolean"] },
            "isnull":    { "$type": "native", "impl": "$istype", "args": ["null"] },

            "extract": {
                "$type": "callable",
                "transform_tmpl": { "$type": "extract", "select": { "$val": "/0" } },
                "conf_args_index": [0]
            },
            "map": {
                "$type": "callable",
                "transform_tmpl": { "$type": "map", "itemmap": { "$val": "/0" } },
                "conf_args_index": [0]
            },

            "xml.attribute": {
                "$type": "callable",
                "transform_tmpl": {
                    "$type": "attribute",
                    "name": { "$val": "/0" },
                    "value": { "$val": "/1" }
                },
                "conf_args_index": [0, 1]
            },
            "xml.textElement": {
                "$type": "callable",
                "transform_tmpl": {
                    "$type": "textElement",
                    "name": { "$val": "/0" },
                    "value": { "$val": "/1" }
                },
                "conf_args_index": [0, 1]
            },
            "xml.element": {
                "$type": "callable",
                "transform_tmpl": {
                    "$type": "element",
                    "name": { "$val": "/0" },
                    "content": { "$val": "/1" }
                },
                "conf_args_index": [0, 1]
            },
            "xml.print": { "$type": "xmlPrint" }
        },
        "context": {
            "$secure": true,

            // Paragraph filling.
            "std.fill.width": 75,
            "std.fill.indent": 4,

            // JSON output encoding.
            "json.indent": null,
            "json.item_separator": ", ",
            "json.dict_separator": ": ",

            // XML rendering.
            "xml.style": "pretty",
            "xml.indent": 0,
            "xml.indent_step": 2,
            "xml.max_line_length": 75,
            "xml.min_line_length": 30,
            "xml.text_packing": "pretty",
            "xml.value_pad": 0,
            "xml.xmlns": "",
            "xml.prefer_prefix": false
        }
    })
}
