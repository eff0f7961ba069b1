//! The built-in transform kinds.
//!
//! A compiled transform holds an [`Op`]: one arm per kind, carrying the
//! kind's compiled parameters. A single dispatching `apply` replaces dynamic
//! dispatch over a class hierarchy; the engine's kind registry maps kind
//! names to the compile functions defined across this module tree.

pub(crate) mod collection;
pub(crate) mod control;
pub(crate) mod function;
pub(crate) mod json;
pub(crate) mod template;
pub(crate) mod xml;

use serde_json::{Map, Value};

use crate::engine::Engine;
use crate::error::{display_name, json_type_name, ApplyError, ConfigError};
use crate::pointer::looks_like_pointer;
use crate::scope::Context;
use crate::transform::Transform;

/// Compile function for one transform kind: `(config, engine, name) → Op`.
/// The engine passed in is the transform's own (possibly child) engine.
pub(crate) type KindFn = fn(&Map<String, Value>, &Engine, &str) -> Result<Op, ConfigError>;

/// The compiled form of each transform kind.
pub(crate) enum Op {
    Identity,
    Literal(Value),
    Extract {
        select: String,
    },
    StringTemplate(Vec<template::Segment>),
    Json(json::Skeleton),
    Map {
        itemmap: Transform,
        strict: bool,
    },
    Foreach {
        propmap: Transform,
        strict: bool,
    },
    Apply {
        transform: Transform,
        input: Option<Transform>,
        args: Vec<Value>,
    },
    Choose {
        cases: Vec<control::Case>,
        default: Transform,
    },
    Native {
        key: String,
        func: crate::native::NativeFn,
        args: Vec<Value>,
    },
    Function {
        wrapped: Transform,
        args: Vec<Operand>,
    },
    Callable(function::CallableSpec),
    XmlAttribute {
        name: Operand,
        value: Operand,
        prefix: Option<String>,
        namespace: Option<String>,
    },
    XmlElementContent {
        attrs: Option<Vec<Transform>>,
        children: Option<Vec<Transform>>,
    },
    XmlElement {
        name: Operand,
        content: Option<Transform>,
        hints: Option<Value>,
        prefix: Option<String>,
        namespace: Option<String>,
    },
    XmlTextElement {
        name: Operand,
        value: Operand,
        hints: Option<Value>,
    },
    XmlPrint {
        hints: Option<Map<String, Value>>,
    },
}

impl Op {
    pub(crate) fn apply(
        &self,
        transform: &Transform,
        input: &Value,
        context: &Context,
        args: &[Value],
    ) -> Result<Value, ApplyError> {
        match self {
            Op::Identity => Ok(input.clone()),
            Op::Literal(value) => Ok(value.clone()),
            Op::Extract { select } => transform.engine().extract(input, context, select),
            Op::StringTemplate(segments) => template::apply(segments, input, context),
            Op::Json(skeleton) => json::materialize(skeleton, input, context),
            Op::Map { itemmap, strict } => {
                collection::apply_map(transform, itemmap, *strict, input, context)
            }
            Op::Foreach { propmap, strict } => {
                collection::apply_foreach(transform, propmap, *strict, input, context)
            }
            Op::Apply {
                transform: target,
                input: selector,
                args: bound,
            } => control::apply_apply(target, selector.as_ref(), bound, input, context, args),
            Op::Choose { cases, default } => {
                control::apply_choose(cases, default, input, context)
            }
            Op::Native {
                func, args: bound, ..
            } => {
                let mut use_args = bound.clone();
                use_args.extend_from_slice(args);
                func(transform.engine(), input, context, &use_args)
            }
            Op::Function {
                wrapped,
                args: operands,
            } => function::apply_function(wrapped, operands, input, context, args),
            Op::Callable(_) => Err(ApplyError::CallableDirect(transform.display_name())),
            Op::XmlAttribute {
                name,
                value,
                prefix,
                namespace,
            } => xml::apply_attribute(name, value, prefix.as_deref(), namespace.as_deref(), input, context),
            Op::XmlElementContent { attrs, children } => {
                xml::apply_element_content(attrs.as_deref(), children.as_deref(), input, context)
            }
            Op::XmlElement {
                name,
                content,
                hints,
                prefix,
                namespace,
            } => xml::apply_element(
                name,
                content.as_ref(),
                hints.as_ref(),
                prefix.as_deref(),
                namespace.as_deref(),
                input,
                context,
            ),
            Op::XmlTextElement { name, value, hints } => {
                xml::apply_text_element(name, value, hints.as_ref(), input, context)
            }
            Op::XmlPrint { hints } => xml::apply_print(hints.as_ref(), input, context),
        }
    }
}

/// A compile-time classified piece of a transform configuration: either a
/// constant value or a sub-transform evaluated against the current input.
pub(crate) enum Operand {
    Const(Value),
    Transform(Transform),
}

impl Operand {
    pub(crate) fn resolve(&self, input: &Value, context: &Context) -> Result<Value, ApplyError> {
        match self {
            Operand::Const(v) => Ok(v.clone()),
            Operand::Transform(t) => t.apply(input, context, &[]),
        }
    }
}

/// Render a value the way templates and joins do: strings verbatim,
/// everything else JSON-encoded.
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Build an internal `extract` transform for a pointer string.
pub(crate) fn extract_transform(engine: &Engine, name: Option<String>, select: &str) -> Transform {
    Transform::internal(
        engine,
        name,
        "extract",
        Op::Extract {
            select: select.to_string(),
        },
    )
}

/// Build an internal `json` transform for a template value.
pub(crate) fn json_transform(
    engine: &Engine,
    name: Option<String>,
    content: &Value,
) -> Result<Transform, ConfigError> {
    let display = display_name(name.as_deref());
    let skeleton = json::build_skeleton(content, engine, &display)?;
    Ok(Transform::internal(engine, name, "json", Op::Json(skeleton)))
}

/// Build an internal `stringtemplate` transform for a template string.
pub(crate) fn template_transform(
    engine: &Engine,
    name: Option<String>,
    content: &str,
) -> Result<Transform, ConfigError> {
    let display = display_name(name.as_deref());
    let segments = template::parse_template(content, engine, &display)?;
    Ok(Transform::internal(
        engine,
        name,
        "stringtemplate",
        Op::StringTemplate(segments),
    ))
}

/// Resolve the value of a `$val`/`$ins`/`$upd` directive (or an `itemmap`,
/// `test`, `default`, ... parameter) into a transform.
///
/// Objects carrying `$type` compile as anonymous transforms; strings are
/// function invocations, data pointers, or named-transform references; any
/// other value becomes a `json` template of itself.
pub(crate) fn resolve_meta_directive(
    dval: &Value,
    engine: &Engine,
    name: &str,
) -> Result<Transform, ConfigError> {
    match dval {
        Value::Object(obj) if obj.contains_key("$type") => {
            engine.make_transform(dval, Some(&format!("{name}(anon)")))
        }
        Value::String(s) => {
            if s.contains('(') || s.contains(')') {
                return engine.resolve_transform(s);
            }
            if looks_like_pointer(s) {
                return Ok(extract_transform(
                    engine,
                    Some(format!("{name}(select)")),
                    s,
                ));
            }
            engine.resolve_transform(s)
        }
        other => json_transform(engine, Some(format!("{name}(json)")), other),
    }
}

/// Resolve the common `input` pre-selector parameter. `null` and the empty
/// string mean "pass the input through unchanged".
pub(crate) fn resolve_input(
    config: &Value,
    engine: &Engine,
    name: &str,
) -> Result<Option<Transform>, ConfigError> {
    match config {
        Value::Null => Ok(None),
        Value::Object(obj) => match obj.get("$val") {
            Some(inner) => resolve_input(inner, engine, name),
            None => Ok(Some(engine.make_transform(config, Some(&format!("{name}(input)")))?)),
        },
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) if s.contains('(') || s.contains(')') => {
            Ok(Some(engine.resolve_transform(s)?))
        }
        Value::String(s) if looks_like_pointer(s) => Ok(Some(extract_transform(
            engine,
            Some(format!("{name}(input)")),
            s,
        ))),
        Value::String(s) => Ok(Some(engine.resolve_transform(s)?)),
        other => Err(ConfigError::WrongParamType {
            name: name.to_string(),
            param: "input",
            need: "object or string",
            got: json_type_name(other),
        }),
    }
}

// --- basic kinds -----------------------------------------------------------

pub(crate) fn compile_identity(
    _config: &Map<String, Value>,
    _engine: &Engine,
    _name: &str,
) -> Result<Op, ConfigError> {
    Ok(Op::Identity)
}

pub(crate) fn compile_literal(
    config: &Map<String, Value>,
    _engine: &Engine,
    _name: &str,
) -> Result<Op, ConfigError> {
    let value = config
        .get("value")
        .cloned()
        .unwrap_or_else(|| Value::String(String::new()));
    Ok(Op::Literal(value))
}

pub(crate) fn compile_extract(
    config: &Map<String, Value>,
    _engine: &Engine,
    name: &str,
) -> Result<Op, ConfigError> {
    let select = match config.get("select") {
        None => {
            return Err(ConfigError::MissingParam {
                name: name.to_string(),
                param: "select",
            })
        }
        Some(Value::String(s)) => s.clone(),
        // Callable materialization hands the pointer through a restricted
        // `$val` wrapper.
        Some(Value::Object(obj)) => match obj.get("$val") {
            Some(Value::String(dp)) if looks_like_pointer(dp) => dp.clone(),
            _ => {
                return Err(ConfigError::WrongParamType {
                    name: name.to_string(),
                    param: "select",
                    need: "data pointer",
                    got: "object",
                })
            }
        },
        Some(other) => {
            return Err(ConfigError::WrongParamType {
                name: name.to_string(),
                param: "select",
                need: "string",
                got: json_type_name(other),
            })
        }
    };
    Ok(Op::Extract { select })
}
