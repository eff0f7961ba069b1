//! The `map` and `foreach` kinds: apply an item transform across an array or
//! across the properties of an object.

use serde_json::{json, Map, Value};

use super::{json_transform, resolve_meta_directive, Op};
use crate::engine::Engine;
use crate::error::{json_type_name, ApplyError, ConfigError};
use crate::scope::Context;
use crate::transform::Transform;

pub(crate) fn compile_map(
    config: &Map<String, Value>,
    engine: &Engine,
    name: &str,
) -> Result<Op, ConfigError> {
    let itemmap = config.get("itemmap").ok_or(ConfigError::MissingParam {
        name: name.to_string(),
        param: "itemmap",
    })?;
    Ok(Op::Map {
        itemmap: resolve_item_transform(itemmap, engine, name)?,
        strict: strict_flag(config),
    })
}

pub(crate) fn compile_foreach(
    config: &Map<String, Value>,
    engine: &Engine,
    name: &str,
) -> Result<Op, ConfigError> {
    let propmap = config.get("propmap").ok_or(ConfigError::MissingParam {
        name: name.to_string(),
        param: "propmap",
    })?;
    Ok(Op::Foreach {
        propmap: resolve_item_transform(propmap, engine, name)?,
        strict: strict_flag(config),
    })
}

fn strict_flag(config: &Map<String, Value>) -> bool {
    config
        .get("strict")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// An item transform is a reference, an anonymous configuration, or a
/// `$val`/`$ins`/`$upd` directive. The directives ride on the `json` kind:
/// `$ins` makes each item expand to the flattened directive result, `$upd`
/// merges the directive result over the rest of the item template.
fn resolve_item_transform(
    config: &Value,
    engine: &Engine,
    name: &str,
) -> Result<Transform, ConfigError> {
    if let Value::Object(obj) = config {
        if let Some(dval) = obj.get("$val") {
            return resolve_meta_directive(dval, engine, name);
        }
        if !obj.contains_key("$type") && obj.contains_key("$ins") {
            return json_transform(
                engine,
                Some(format!("{name}($ins)")),
                &json!([config.clone()]),
            );
        }
        if !obj.contains_key("$type") && obj.contains_key("$upd") {
            return json_transform(engine, Some(format!("{name}($upd)")), config);
        }
    }
    resolve_meta_directive(config, engine, name)
}

pub(crate) fn apply_map(
    transform: &Transform,
    itemmap: &Transform,
    strict: bool,
    input: &Value,
    context: &Context,
) -> Result<Value, ApplyError> {
    let items: Vec<Value> = match input {
        Value::Array(items) => items.clone(),
        other if strict => {
            return Err(ApplyError::WrongInputType {
                name: transform.display_name(),
                need: "array",
                got: json_type_name(other),
            })
        }
        other => vec![other.clone()],
    };
    let mut out = Vec::with_capacity(items.len());
    for item in &items {
        out.push(itemmap.apply(item, context, &[])?);
    }
    Ok(Value::Array(out))
}

pub(crate) fn apply_foreach(
    transform: &Transform,
    propmap: &Transform,
    strict: bool,
    input: &Value,
    context: &Context,
) -> Result<Value, ApplyError> {
    let items: Vec<Value> = match input {
        Value::Object(props) => props.iter().map(|(k, v)| json!([k, v])).collect(),
        other if strict => {
            return Err(ApplyError::WrongInputType {
                name: transform.display_name(),
                need: "object",
                got: json_type_name(other),
            })
        }
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    };
    let mut out = Vec::with_capacity(items.len());
    for item in &items {
        out.push(propmap.apply(item, context, &[])?);
    }
    Ok(Value::Array(out))
}
