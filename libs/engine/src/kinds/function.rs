//! The `native`, `function`, and `callable` kinds.
//!
//! `native` binds a stylesheet name to an entry of the curated host-function
//! table. `function` wraps another transform so it can be invoked in call
//! syntax, resolving raw argument strings at compile time. `callable` is a
//! template for building a concrete transform out of a numbered argument
//! list; it is only usable through a `function` wrapper.

use serde_json::{json, Map, Value};
use std::collections::HashSet;

use super::{
    extract_transform, json_transform, template_transform, Op, Operand,
};
use crate::engine::Engine;
use crate::error::{json_type_name, ApplyError, ConfigError};
use crate::native;
use crate::parse;
use crate::scope::Context;
use crate::transform::Transform;

// --- native ----------------------------------------------------------------

pub(crate) fn compile_native(
    config: &Map<String, Value>,
    engine: &Engine,
    name: &str,
) -> Result<Op, ConfigError> {
    let impl_name = match config.get("impl") {
        None => {
            return Err(ConfigError::MissingParam {
                name: name.to_string(),
                param: "impl",
            })
        }
        Some(Value::String(s)) => s,
        Some(other) => {
            return Err(ConfigError::WrongParamType {
                name: name.to_string(),
                param: "impl",
                need: "string",
                got: json_type_name(other),
            })
        }
    };

    // A leading `$` references the built-in table; anything else is looked up
    // under the configured contributed-function namespace.
    let key = match impl_name.strip_prefix('$') {
        Some(bare) => bare.to_string(),
        None => {
            let pkg = engine
                .system_value("$sys.contrib_pkg")
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_else(|| "contrib".to_string());
            format!("{pkg}.{impl_name}")
        }
    };
    let func = native::builtin(&key).ok_or_else(|| ConfigError::UnknownName(key.clone()))?;

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

    Ok(Op::Native { key, func, args })
}

// --- function --------------------------------------------------------------

/// Compile a function-form reference such as `delimit(' and ')` into a
/// `function` transform.
pub(crate) fn from_invocation(
    engine: &Engine,
    invocation: &str,
) -> Result<Transform, ConfigError> {
    let (fname, raw_args) = parse::parse_function(invocation)?;
    let wrapped = engine.resolve_transform(&fname)?;
    let name = format!("{fname}()");
    let raw_args = raw_args.into_iter().map(Value::String).collect();
    let op = build_function_op(wrapped, raw_args, engine, &name)?;
    Ok(Transform::internal(engine, Some(name), "function", op))
}

pub(crate) fn compile_function(
    config: &Map<String, Value>,
    engine: &Engine,
    name: &str,
) -> Result<Op, ConfigError> {
    let raw_args = match config.get("args") {
        None => {
            return Err(ConfigError::MissingParam {
                name: name.to_string(),
                param: "args",
            })
        }
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
    let wrapped = match config.get("transform") {
        None => {
            return Err(ConfigError::MissingParam {
                name: name.to_string(),
                param: "transform",
            })
        }
        Some(Value::String(reference)) => engine.resolve_transform(reference)?,
        Some(cfg @ Value::Object(_)) => engine.make_transform(cfg, Some(&format!("{name}(anon)")))?,
        Some(other) => {
            return Err(ConfigError::WrongParamType {
                name: name.to_string(),
                param: "transform",
                need: "string or object",
                got: json_type_name(other),
            })
        }
    };
    build_function_op(wrapped, raw_args, engine, name)
}

fn build_function_op(
    wrapped: Transform,
    raw_args: Vec<Value>,
    engine: &Engine,
    name: &str,
) -> Result<Op, ConfigError> {
    let (wrapped, raw_args) = if let Op::Callable(spec) = wrapped.op() {
        let spec = spec.clone();
        let pass_args = select_pass_args(&spec, &raw_args, &wrapped)?;
        let materialized = materialize_callable(&spec, &raw_args, engine, &wrapped)?;
        (materialized, pass_args)
    } else {
        (wrapped, raw_args)
    };

    let mut args = Vec::with_capacity(raw_args.len());
    for raw in &raw_args {
        args.push(classify_arg(raw, engine, name)?);
    }
    Ok(Op::Function { wrapped, args })
}

/// Classify one raw argument. JSON scalars are held as values (strings with
/// `{` become templates, arrays and objects become `json` templates);
/// anything else is a transform reference, a data pointer, or a named
/// transform.
fn classify_arg(raw: &Value, engine: &Engine, name: &str) -> Result<Operand, ConfigError> {
    let Value::String(raw) = raw else {
        return Ok(Operand::Const(raw.clone()));
    };

    // Single-quoted arguments are string literals.
    let mut as_json = raw.clone();
    if as_json.len() >= 2 && as_json.starts_with('\'') && as_json.ends_with('\'') {
        as_json = format!("\"{}\"", &as_json[1..as_json.len() - 1]);
    }

    match serde_json::from_str::<Value>(&as_json) {
        Ok(Value::String(text)) if text.contains('{') => Ok(Operand::Transform(
            template_transform(engine, Some(format!("{name}:(arg)")), &text)?,
        )),
        Ok(value @ (Value::Array(_) | Value::Object(_))) => Ok(Operand::Transform(
            json_transform(engine, Some(format!("{name}:(arg)")), &value)?,
        )),
        Ok(value) => Ok(Operand::Const(value)),
        Err(_) => {
            if raw.contains('(') || raw.contains(')') {
                Ok(Operand::Transform(engine.resolve_transform(raw)?))
            } else if raw.starts_with('/') || raw.contains(':') {
                Ok(Operand::Transform(extract_transform(
                    engine,
                    Some(format!("{name}:(select)")),
                    raw,
                )))
            } else {
                Ok(Operand::Transform(engine.resolve_transform(raw)?))
            }
        }
    }
}

pub(crate) fn apply_function(
    wrapped: &Transform,
    operands: &[Operand],
    input: &Value,
    context: &Context,
    args: &[Value],
) -> Result<Value, ApplyError> {
    let mut use_args = Vec::with_capacity(operands.len() + args.len());
    for operand in operands {
        use_args.push(operand.resolve(input, context)?);
    }
    use_args.extend_from_slice(args);
    wrapped.apply(input, context, &use_args)
}

// --- callable --------------------------------------------------------------

#[derive(Clone)]
pub(crate) struct CallableSpec {
    /// Configuration template for the underlying transform; `$val` pointers
    /// into the numbered configuration-argument array fill it in.
    pub tmpl: Value,
    pub conf_idx: Vec<usize>,
    pub pass_idx: Vec<usize>,
}

pub(crate) fn compile_callable(
    config: &Map<String, Value>,
    _engine: &Engine,
    name: &str,
) -> Result<Op, ConfigError> {
    let tmpl = match config.get("transform_tmpl") {
        None => {
            return Err(ConfigError::MissingParam {
                name: name.to_string(),
                param: "transform_tmpl",
            })
        }
        Some(tmpl @ Value::Object(_)) => tmpl.clone(),
        Some(other) => {
            return Err(ConfigError::WrongParamType {
                name: name.to_string(),
                param: "transform_tmpl",
                need: "object",
                got: json_type_name(other),
            })
        }
    };
    let conf_idx = index_list(config, "conf_args_index", true, name)?;
    let pass_idx = index_list(config, "pass_args_index", false, name)?;
    Ok(Op::Callable(CallableSpec {
        tmpl,
        conf_idx,
        pass_idx,
    }))
}

fn index_list(
    config: &Map<String, Value>,
    param: &'static str,
    required: bool,
    name: &str,
) -> Result<Vec<usize>, ConfigError> {
    let items = match config.get(param) {
        None if required => {
            return Err(ConfigError::MissingParam {
                name: name.to_string(),
                param,
            })
        }
        None => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(ConfigError::WrongParamType {
                name: name.to_string(),
                param,
                need: "array",
                got: json_type_name(other),
            })
        }
    };
    items
        .iter()
        .map(|v| {
            v.as_u64().map(|n| n as usize).ok_or_else(|| {
                ConfigError::WrongParamType {
                    name: name.to_string(),
                    param,
                    need: "integer",
                    got: json_type_name(v),
                }
            })
        })
        .collect()
}

/// Pick the arguments that flow through to apply time: the configured
/// `pass_args_index` picks, then any argument not claimed by either index
/// list, in order.
fn select_pass_args(
    spec: &CallableSpec,
    raw_args: &[Value],
    wrapped: &Transform,
) -> Result<Vec<Value>, ConfigError> {
    let mut out = Vec::new();
    for &idx in &spec.pass_idx {
        let arg = raw_args.get(idx).ok_or_else(|| ConfigError::InsufficientArgs {
            name: wrapped.display_name(),
        })?;
        out.push(arg.clone());
    }
    let used: HashSet<usize> = spec
        .pass_idx
        .iter()
        .chain(spec.conf_idx.iter())
        .copied()
        .collect();
    for (idx, arg) in raw_args.iter().enumerate() {
        if !used.contains(&idx) {
            out.push(arg.clone());
        }
    }
    Ok(out)
}

/// Build the concrete transform a callable stands for: extract the
/// configuration arguments, evaluate the template against them, and compile
/// the produced configuration.
fn materialize_callable(
    spec: &CallableSpec,
    raw_args: &[Value],
    engine: &Engine,
    wrapped: &Transform,
) -> Result<Transform, ConfigError> {
    let mut conf_args = Vec::with_capacity(spec.conf_idx.len());
    for &idx in &spec.conf_idx {
        let arg = raw_args.get(idx).ok_or_else(|| ConfigError::InsufficientArgs {
            name: wrapped.display_name(),
        })?;
        conf_args.push(prepare_conf_arg(arg));
    }

    let name = format!("{}:(args)", wrapped.display_name());
    let skeleton = super::json::build_template_skeleton(&spec.tmpl, engine, &name)?;
    let template = Transform::internal(engine, Some(name), "json", Op::Json(skeleton));
    let config = template
        .apply(&Value::Array(conf_args), engine.context(), &[])
        .map_err(|_| ConfigError::InsufficientArgs {
            name: wrapped.display_name(),
        })?;
    engine.make_transform(&config, None)
}

/// A quoted configuration argument is a literal string; anything else is a
/// reference carried through the template inside a `$val` wrapper.
fn prepare_conf_arg(arg: &Value) -> Value {
    let Value::String(s) = arg else {
        return arg.clone();
    };
    let quoted = s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"'))
            || (s.starts_with('\'') && s.ends_with('\'')));
    if quoted {
        Value::String(s[1..s.len() - 1].to_string())
    } else {
        json!({ "$val": s })
    }
}
