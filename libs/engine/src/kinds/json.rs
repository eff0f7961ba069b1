//! The `json` kind: a deep-cloned template with embedded substitution
//! directives, compiled once into an immutable skeleton.
//!
//! Directives: `{...}` tokens inside strings (including property names),
//! `$val` (replace the object with a transform result), `$type` (anonymous
//! transform), `$ins` (splice into the enclosing array), and `$upd` (merge
//! over the enclosing object).

use serde_json::{Map, Value};

use super::{resolve_meta_directive, template_transform, value_to_string, Op};
use crate::engine::Engine;
use crate::error::{ApplyError, ConfigError};
use crate::scope::Context;
use crate::transform::Transform;

pub(crate) enum Skeleton {
    Const(Value),
    Transform(Transform),
    Array(Vec<ArrayItem>),
    Object(ObjectSkeleton),
}

pub(crate) enum ArrayItem {
    Plain(Skeleton),
    /// An item that carried `$ins`: an array result is spliced into the
    /// enclosing array, anything else takes the slot as-is.
    Splice(Transform),
}

pub(crate) struct ObjectSkeleton {
    entries: Vec<(String, Skeleton)>,
    /// The `$upd` directive, if present; merged over the object after the
    /// entries are materialized.
    upd: Option<Transform>,
    /// Compiled templates for property names containing `{...}` tokens,
    /// keyed by the original name.
    key_templates: Vec<(String, Transform)>,
}

pub(crate) fn compile(
    config: &Map<String, Value>,
    engine: &Engine,
    name: &str,
) -> Result<Op, ConfigError> {
    let content = config.get("content").ok_or(ConfigError::MissingParam {
        name: name.to_string(),
        param: "content",
    })?;
    Ok(Op::Json(build_skeleton(content, engine, name)?))
}

pub(crate) fn build_skeleton(
    content: &Value,
    engine: &Engine,
    name: &str,
) -> Result<Skeleton, ConfigError> {
    build_skeleton_with(content, engine, name, true)
}

/// Skeleton for a callable's configuration template: `$val` still
/// substitutes, but `$type` stays literal so the produced value can itself be
/// a transform configuration.
pub(crate) fn build_template_skeleton(
    content: &Value,
    engine: &Engine,
    name: &str,
) -> Result<Skeleton, ConfigError> {
    build_skeleton_with(content, engine, name, false)
}

fn build_skeleton_with(
    content: &Value,
    engine: &Engine,
    name: &str,
    anon_types: bool,
) -> Result<Skeleton, ConfigError> {
    match content {
        Value::Object(obj) => {
            if let Some(dval) = obj.get("$val") {
                let t = resolve_meta_directive(dval, engine, &format!("{name}:$val"))?;
                return Ok(Skeleton::Transform(t));
            }
            if anon_types && obj.contains_key("$type") {
                let t = engine.make_transform(content, Some(&format!("{name}:(anon)")))?;
                return Ok(Skeleton::Transform(t));
            }

            let mut entries = Vec::new();
            let mut upd = None;
            let mut key_templates = Vec::new();
            for (key, value) in obj {
                if key == "$upd" {
                    upd = Some(resolve_meta_directive(value, engine, &format!("{name}:$upd"))?);
                    continue;
                }
                let skeleton = if key == "$ins" {
                    Skeleton::Transform(resolve_meta_directive(
                        value,
                        engine,
                        &format!("{name}:$ins"),
                    )?)
                } else {
                    build_skeleton_with(value, engine, name, anon_types)?
                };
                if key.contains('{') && key.contains('}') {
                    key_templates.push((
                        key.clone(),
                        template_transform(engine, Some(format!("{name}:(key)")), key)?,
                    ));
                }
                entries.push((key.clone(), skeleton));
            }
            Ok(Skeleton::Object(ObjectSkeleton {
                entries,
                upd,
                key_templates,
            }))
        }
        Value::String(s) if s.contains('{') && s.contains('}') => Ok(Skeleton::Transform(
            template_transform(engine, Some(name.to_string()), s)?,
        )),
        Value::Array(items) => {
            let mut out = Vec::new();
            for item in items {
                if let Value::Object(obj) = item {
                    if !obj.contains_key("$val") && obj.contains_key("$ins") {
                        out.push(ArrayItem::Splice(resolve_meta_directive(
                            &obj["$ins"],
                            engine,
                            &format!("{name}:$ins"),
                        )?));
                        continue;
                    }
                }
                out.push(ArrayItem::Plain(build_skeleton_with(
                    item, engine, name, anon_types,
                )?));
            }
            Ok(Skeleton::Array(out))
        }
        other => Ok(Skeleton::Const(other.clone())),
    }
}

pub(crate) fn materialize(
    skeleton: &Skeleton,
    input: &Value,
    context: &Context,
) -> Result<Value, ApplyError> {
    match skeleton {
        Skeleton::Const(value) => Ok(value.clone()),
        Skeleton::Transform(t) => t.apply(input, context, &[]),
        Skeleton::Object(obj) => {
            let mut out = Map::new();
            for (key, skeleton) in &obj.entries {
                out.insert(key.clone(), materialize(skeleton, input, context)?);
            }

            // Re-evaluate templated property names. The entry moves to the
            // end of the object under its produced name.
            for (key, template) in &obj.key_templates {
                if let Some(value) = out.shift_remove(key) {
                    let new_key = value_to_string(&template.apply(input, context, &[])?);
                    out.insert(new_key, value);
                }
            }

            if let Some(upd) = &obj.upd {
                // Merged keys override in place; new keys append in the
                // merge source's order. Non-object results are ignored.
                if let Value::Object(merge) = upd.apply(input, context, &[])? {
                    for (key, value) in merge {
                        match out.get_mut(&key) {
                            Some(slot) => *slot = value,
                            None => {
                                out.insert(key, value);
                            }
                        }
                    }
                }
            }
            Ok(Value::Object(out))
        }
        Skeleton::Array(items) => {
            let mut out = Vec::new();
            for item in items {
                match item {
                    ArrayItem::Plain(skeleton) => {
                        out.push(materialize(skeleton, input, context)?)
                    }
                    ArrayItem::Splice(t) => match t.apply(input, context, &[])? {
                        Value::Array(values) => out.extend(values),
                        scalar => out.push(scalar),
                    },
                }
            }
            Ok(Value::Array(out))
        }
    }
}
