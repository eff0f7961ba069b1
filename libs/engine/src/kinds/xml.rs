//! Element-builder transform kinds for XML output.
//!
//! `attribute`, `elementContent`, `element`, and `textElement` assemble the
//! JSON element trees the renderer consumes; `xmlPrint` formats such a tree
//! into the final XML string using the `xml.*` context keys.

use serde_json::{Map, Value};
use stencil_xml::RenderContext;

use super::{
    extract_transform, json_transform, resolve_meta_directive, template_transform, value_to_string,
    Op, Operand,
};
use crate::engine::Engine;
use crate::error::{json_type_name, ApplyError, ConfigError};
use crate::pointer::looks_like_pointer;
use crate::scope::Context;
use crate::transform::Transform;

/// Classify an attribute/element part (a name or a value): a plain string, a
/// string template, a `$val` directive, or an anonymous transform.
fn compile_part(
    config: &Value,
    engine: &Engine,
    name: &str,
) -> Result<Operand, ConfigError> {
    match config {
        Value::String(s) if s.contains('{') && s.contains('}') => Ok(Operand::Transform(
            template_transform(engine, Some(name.to_string()), s)?,
        )),
        Value::Object(obj) => {
            if let Some(dval) = obj.get("$val") {
                return Ok(Operand::Transform(resolve_meta_directive(
                    dval, engine, name,
                )?));
            }
            if obj.contains_key("$type") {
                return Ok(Operand::Transform(
                    engine.make_transform(config, Some(name))?,
                ));
            }
            Ok(Operand::Const(config.clone()))
        }
        other => Ok(Operand::Const(other.clone())),
    }
}

fn required_part(
    config: &Map<String, Value>,
    param: &'static str,
    engine: &Engine,
    name: &str,
) -> Result<Operand, ConfigError> {
    let value = config.get(param).ok_or(ConfigError::MissingParam {
        name: name.to_string(),
        param,
    })?;
    compile_part(value, engine, &format!("{name} {param}"))
}

fn string_param(config: &Map<String, Value>, param: &str) -> Option<String> {
    config.get(param).and_then(Value::as_str).map(str::to_string)
}

// --- attribute -------------------------------------------------------------

pub(crate) fn compile_attribute(
    config: &Map<String, Value>,
    engine: &Engine,
    name: &str,
) -> Result<Op, ConfigError> {
    Ok(Op::XmlAttribute {
        name: required_part(config, "name", engine, name)?,
        value: required_part(config, "value", engine, name)?,
        prefix: string_param(config, "prefix"),
        namespace: string_param(config, "namespace"),
    })
}

pub(crate) fn apply_attribute(
    name: &Operand,
    value: &Operand,
    prefix: Option<&str>,
    namespace: Option<&str>,
    input: &Value,
    context: &Context,
) -> Result<Value, ApplyError> {
    let mut out = Map::new();
    let name = value_to_string(&name.resolve(input, context)?);
    out.insert("name".to_string(), Value::String(name));
    out.insert("value".to_string(), value.resolve(input, context)?);
    if let Some(p) = prefix {
        out.insert("prefix".to_string(), Value::String(p.to_string()));
    }
    if let Some(ns) = namespace {
        out.insert("namespace".to_string(), Value::String(ns.to_string()));
    }
    Ok(Value::Object(out))
}

// --- elementContent --------------------------------------------------------

/// Classify one entry of an `attrs` or `children` list. Objects are `$val`
/// directives or JSON templates; strings are templates for children, and
/// pointers or transform references for attributes.
fn compile_content_item(
    item: &Value,
    engine: &Engine,
    name: &str,
    as_child: bool,
) -> Result<Transform, ConfigError> {
    match item {
        Value::Object(obj) => match obj.get("$val") {
            Some(dval) => resolve_meta_directive(dval, engine, name),
            None => json_transform(engine, Some(name.to_string()), item),
        },
        Value::String(s) if as_child => template_transform(engine, Some(name.to_string()), s),
        Value::String(s) if looks_like_pointer(s) => {
            Ok(extract_transform(engine, Some(name.to_string()), s))
        }
        Value::String(s) => engine.resolve_transform(s),
        other => Ok(Transform::internal(
            engine,
            Some(name.to_string()),
            "literal",
            Op::Literal(other.clone()),
        )),
    }
}

fn compile_content_list(
    config: &Map<String, Value>,
    param: &'static str,
    engine: &Engine,
    name: &str,
    as_child: bool,
) -> Result<Option<Vec<Transform>>, ConfigError> {
    let items: Vec<Value> = match config.get(param) {
        None => return Ok(None),
        Some(Value::Array(items)) => items.clone(),
        Some(text @ Value::String(_)) if as_child => vec![text.clone()],
        Some(other) => {
            return Err(ConfigError::WrongParamType {
                name: name.to_string(),
                param,
                need: if as_child { "array or string" } else { "array" },
                got: json_type_name(other),
            })
        }
    };
    let mut out = Vec::with_capacity(items.len());
    for item in &items {
        out.push(compile_content_item(
            item,
            engine,
            &format!("{name} {param}"),
            as_child,
        )?);
    }
    Ok(Some(out))
}

pub(crate) fn compile_element_content(
    config: &Map<String, Value>,
    engine: &Engine,
    name: &str,
) -> Result<Op, ConfigError> {
    Ok(Op::XmlElementContent {
        attrs: compile_content_list(config, "attrs", engine, name, false)?,
        children: compile_content_list(config, "children", engine, name, true)?,
    })
}

pub(crate) fn apply_element_content(
    attrs: Option<&[Transform]>,
    children: Option<&[Transform]>,
    input: &Value,
    context: &Context,
) -> Result<Value, ApplyError> {
    let mut out = Map::new();
    if let Some(attrs) = attrs {
        let mut evaluated = Vec::with_capacity(attrs.len());
        for attr in attrs {
            evaluated.push(attr.apply(input, context, &[])?);
        }
        out.insert("attrs".to_string(), Value::Array(evaluated));
    }
    if let Some(children) = children {
        let mut evaluated = Vec::with_capacity(children.len());
        for child in children {
            evaluated.push(child.apply(input, context, &[])?);
        }
        out.insert("children".to_string(), Value::Array(evaluated));
    }
    Ok(Value::Object(out))
}

// --- element / textElement -------------------------------------------------

pub(crate) fn compile_element(
    config: &Map<String, Value>,
    engine: &Engine,
    name: &str,
) -> Result<Op, ConfigError> {
    let content = match config.get("content") {
        None => None,
        Some(Value::Object(obj)) => {
            let t = if let Some(dval) = obj.get("$val") {
                resolve_meta_directive(dval, engine, &format!("{name} content"))?
            } else if obj.contains_key("$type") {
                engine.make_transform(&config["content"], Some(&format!("{name} content")))?
            } else {
                let op = compile_element_content(obj, engine, name)?;
                Transform::internal(
                    engine,
                    Some(format!("{name} content")),
                    "elementContent",
                    op,
                )
            };
            Some(t)
        }
        Some(Value::String(reference)) => Some(resolve_meta_directive(
            &Value::String(reference.clone()),
            engine,
            &format!("{name} content"),
        )?),
        Some(other) => {
            return Err(ConfigError::WrongParamType {
                name: name.to_string(),
                param: "content",
                need: "object or string",
                got: json_type_name(other),
            })
        }
    };

    Ok(Op::XmlElement {
        name: required_part(config, "name", engine, name)?,
        content,
        hints: config.get("hints").cloned(),
        prefix: string_param(config, "prefix"),
        namespace: string_param(config, "namespace"),
    })
}

pub(crate) fn apply_element(
    name: &Operand,
    content: Option<&Transform>,
    hints: Option<&Value>,
    prefix: Option<&str>,
    namespace: Option<&str>,
    input: &Value,
    context: &Context,
) -> Result<Value, ApplyError> {
    let mut out = Map::new();
    let name = value_to_string(&name.resolve(input, context)?);
    out.insert("name".to_string(), Value::String(name));
    let content = match content {
        Some(t) => t.apply(input, context, &[])?,
        None => Value::Object(Map::new()),
    };
    out.insert("content".to_string(), content);
    if let Some(hints) = hints {
        out.insert("hints".to_string(), hints.clone());
    }
    if let Some(p) = prefix {
        out.insert("prefix".to_string(), Value::String(p.to_string()));
    }
    if let Some(ns) = namespace {
        out.insert("namespace".to_string(), Value::String(ns.to_string()));
    }
    Ok(Value::Object(out))
}

pub(crate) fn compile_text_element(
    config: &Map<String, Value>,
    engine: &Engine,
    name: &str,
) -> Result<Op, ConfigError> {
    Ok(Op::XmlTextElement {
        name: required_part(config, "name", engine, name)?,
        value: required_part(config, "value", engine, name)?,
        hints: config.get("hints").cloned(),
    })
}

pub(crate) fn apply_text_element(
    name: &Operand,
    value: &Operand,
    hints: Option<&Value>,
    input: &Value,
    context: &Context,
) -> Result<Value, ApplyError> {
    let mut out = Map::new();
    let name = value_to_string(&name.resolve(input, context)?);
    out.insert("name".to_string(), Value::String(name));

    let mut content = Map::new();
    content.insert(
        "children".to_string(),
        Value::Array(vec![value.resolve(input, context)?]),
    );
    out.insert("content".to_string(), Value::Object(content));

    if let Some(hints) = hints {
        out.insert("hints".to_string(), hints.clone());
    }
    Ok(Value::Object(out))
}

// --- xmlPrint --------------------------------------------------------------

pub(crate) fn compile_print(
    config: &Map<String, Value>,
    _engine: &Engine,
    name: &str,
) -> Result<Op, ConfigError> {
    let hints = match config.get("hints") {
        None => None,
        Some(Value::Object(obj)) => Some(obj.clone()),
        Some(other) => {
            return Err(ConfigError::WrongParamType {
                name: name.to_string(),
                param: "hints",
                need: "object",
                got: json_type_name(other),
            })
        }
    };
    Ok(Op::XmlPrint { hints })
}

/// Assemble the render settings visible at this point: context `xml.*` keys
/// first, then any configured hints over them.
fn render_context(context: &Context, hints: Option<&Map<String, Value>>) -> RenderContext {
    let mut render = RenderContext::default();
    for key in context.keys() {
        if key.starts_with("xml.") {
            if let Some(value) = context.get(&key) {
                render.apply_hint(&key, &value);
            }
        }
    }
    if let Some(hints) = hints {
        render = render.with_hints(hints);
    }
    render
}

pub(crate) fn apply_print(
    hints: Option<&Map<String, Value>>,
    input: &Value,
    context: &Context,
) -> Result<Value, ApplyError> {
    let render = render_context(context, hints);
    let out = match input {
        Value::Object(_) => stencil_xml::render_element(input, &render)?,
        Value::Array(elements) => {
            let mut prefixes = stencil_xml::PrefixMap::new();
            let mut parts = Vec::with_capacity(elements.len());
            for element in elements {
                parts.push(stencil_xml::format_element(element, &render, &mut prefixes)?);
            }
            parts.join("\n")
        }
        other => {
            return Err(ApplyError::WrongInputType {
                name: "xml.print".to_string(),
                need: "object or array",
                got: json_type_name(other),
            })
        }
    };
    Ok(Value::String(out))
}
