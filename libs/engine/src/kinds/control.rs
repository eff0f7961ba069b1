//! The `apply` and `choose` kinds: re-selecting input for another transform,
//! and bounded first-match branching.

use serde_json::{Map, Value};

use super::{resolve_input, resolve_meta_directive, Op};
use crate::engine::Engine;
use crate::error::{json_type_name, ApplyError, ConfigError};
use crate::native::coerce_bool;
use crate::scope::Context;
use crate::transform::Transform;

pub(crate) fn compile_apply(
    config: &Map<String, Value>,
    engine: &Engine,
    name: &str,
) -> Result<Op, ConfigError> {
    let transform = match config.get("transform") {
        None => {
            return Err(ConfigError::MissingParam {
                name: name.to_string(),
                param: "transform",
            })
        }
        Some(cfg @ Value::Object(_)) => engine.make_transform(cfg, Some(&format!("{name}(anon)")))?,
        Some(Value::String(reference)) => engine.resolve_transform(reference)?,
        Some(other) => {
            return Err(ConfigError::WrongParamType {
                name: name.to_string(),
                param: "transform",
                need: "object or string",
                got: json_type_name(other),
            })
        }
    };

    // The input selector resolves against the applied transform's engine, so
    // transforms declared alongside it are visible to the selection.
    let input = match config.get("input") {
        Some(cfg) => resolve_input(cfg, transform.engine(), name)?,
        None => None,
    };

    let args = match config.get("args") {
        None => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => {
            return Err(ConfigError::WrongParamType {
                name: name.to_string(),
                param: "args",
                need: "array",
                got: json_type_name(other),
            })
        }
    };

    Ok(Op::Apply {
        transform,
        input,
        args,
    })
}

pub(crate) fn apply_apply(
    target: &Transform,
    selector: Option<&Transform>,
    bound_args: &[Value],
    input: &Value,
    context: &Context,
    args: &[Value],
) -> Result<Value, ApplyError> {
    let selected;
    let input = match selector {
        Some(t) => {
            selected = t.apply(input, context, &[])?;
            &selected
        }
        None => input,
    };
    let mut use_args = bound_args.to_vec();
    use_args.extend_from_slice(args);
    target.apply(input, context, &use_args)
}

pub(crate) struct Case {
    pub test: Transform,
    pub transform: Option<Transform>,
}

pub(crate) fn compile_choose(
    config: &Map<String, Value>,
    engine: &Engine,
    name: &str,
) -> Result<Op, ConfigError> {
    let cases_cfg = match config.get("cases") {
        None => {
            return Err(ConfigError::MissingParam {
                name: name.to_string(),
                param: "cases",
            })
        }
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(ConfigError::WrongParamType {
                name: name.to_string(),
                param: "cases",
                need: "array",
                got: json_type_name(other),
            })
        }
    };

    let mut cases = Vec::with_capacity(cases_cfg.len());
    for case in cases_cfg {
        let Some(obj) = case.as_object() else {
            return Err(ConfigError::WrongParamType {
                name: name.to_string(),
                param: "cases",
                need: "object",
                got: json_type_name(case),
            });
        };
        let test = obj.get("test").ok_or(ConfigError::MissingParam {
            name: format!("{name} case"),
            param: "test",
        })?;
        let test = resolve_meta_directive(test, engine, &format!("{name} case test"))?;
        let transform = obj
            .get("transform")
            .filter(|v| !v.is_null())
            .map(|t| resolve_meta_directive(t, engine, &format!("{name} case transform")))
            .transpose()?;
        cases.push(Case { test, transform });
    }

    let default = config.get("default").ok_or(ConfigError::MissingParam {
        name: name.to_string(),
        param: "default",
    })?;
    let default = resolve_meta_directive(default, engine, &format!("{name} default"))?;

    Ok(Op::Choose { cases, default })
}

pub(crate) fn apply_choose(
    cases: &[Case],
    default: &Transform,
    input: &Value,
    context: &Context,
) -> Result<Value, ApplyError> {
    for case in cases {
        let outcome = case.test.apply(input, context, &[])?;
        if coerce_bool(&outcome) {
            return match &case.transform {
                Some(t) => t.apply(input, context, &[]),
                None => Ok(input.clone()),
            };
        }
    }
    default.apply(input, context, &[])
}
