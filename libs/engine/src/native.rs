//! The curated table of host-implemented functions exposed to stylesheets
//! through the `native` kind.
//!
//! Every function takes `(engine, input, context, args)`. Functions that
//! accept a data argument fall back to the input when it is absent.

use serde_json::Value;

use crate::engine::Engine;
use crate::error::ApplyError;
use crate::kinds::value_to_string;
use crate::scope::Context;

pub(crate) type NativeFn =
    fn(&Engine, &Value, &Context, &[Value]) -> Result<Value, ApplyError>;

/// Look up a registry key. Keys without a dot are the built-in table;
/// dotted keys belong to contributed namespaces, of which none are compiled
/// into this build.
pub(crate) fn builtin(key: &str) -> Option<NativeFn> {
    Some(match key {
        "identity" => identity,
        "tostr" => tostr,
        "tobool" => tobool,
        "delimit" => delimit,
        "wrap" => wrap,
        "indent" => indent,
        "fill" => fill,
        "prop_names" => prop_names,
        "metaprop" => metaprop,
        "isdefined" => isdefined,
        "istype" => istype,
        _ => return None,
    })
}

/// The truth coercion used by `choose` tests and `tobool`: empty collections,
/// zero, null, and the empty string are false; everything else is true.
pub(crate) fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn data_arg<'a>(input: &'a Value, args: &'a [Value], index: usize) -> &'a Value {
    args.get(index).unwrap_or(input)
}

fn text_arg<'a>(
    input: &'a Value,
    args: &'a [Value],
    index: usize,
    name: &str,
) -> Result<&'a str, ApplyError> {
    let data = data_arg(input, args, index);
    data.as_str().ok_or_else(|| ApplyError::WrongInputType {
        name: name.to_string(),
        need: "string",
        got: crate::error::json_type_name(data),
    })
}

fn identity(
    _engine: &Engine,
    input: &Value,
    _context: &Context,
    _args: &[Value],
) -> Result<Value, ApplyError> {
    Ok(input.clone())
}

fn tostr(
    _engine: &Engine,
    input: &Value,
    _context: &Context,
    args: &[Value],
) -> Result<Value, ApplyError> {
    Ok(Value::String(value_to_string(data_arg(input, args, 0))))
}

fn tobool(
    _engine: &Engine,
    input: &Value,
    _context: &Context,
    args: &[Value],
) -> Result<Value, ApplyError> {
    Ok(Value::Bool(coerce_bool(data_arg(input, args, 0))))
}

/// Join the input array with a delimiter; non-string items are JSON-encoded.
/// Scalars and objects are treated as single-item arrays.
fn delimit(
    _engine: &Engine,
    input: &Value,
    _context: &Context,
    args: &[Value],
) -> Result<Value, ApplyError> {
    let delim = args
        .first()
        .and_then(Value::as_str)
        .unwrap_or(", ");
    let items: Vec<String> = match input {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().map(value_to_string).collect(),
        other => vec![value_to_string(other)],
    };
    Ok(Value::String(items.join(delim)))
}

fn width_arg(args: &[Value], index: usize, default: usize) -> usize {
    args.get(index)
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .unwrap_or(default)
}

/// Break a paragraph into an array of lines at word boundaries.
fn wrap(
    _engine: &Engine,
    input: &Value,
    _context: &Context,
    args: &[Value],
) -> Result<Value, ApplyError> {
    let width = width_arg(args, 0, 75);
    let text = text_arg(input, args, 1, "wrap")?;
    let lines: Vec<Value> = stencil_xml::wrap_text(text, width)
        .into_iter()
        .map(Value::String)
        .collect();
    Ok(Value::Array(lines))
}

/// Prepend a number of spaces to the input text.
fn indent(
    _engine: &Engine,
    input: &Value,
    _context: &Context,
    args: &[Value],
) -> Result<Value, ApplyError> {
    let length = width_arg(args, 0, 4);
    let text = text_arg(input, args, 1, "indent")?;
    Ok(Value::String(format!("{}{}", " ".repeat(length), text)))
}

/// Wrap a paragraph and indent every line, producing one string. Width and
/// indentation come from the `std.fill.*` context keys.
fn fill(
    _engine: &Engine,
    input: &Value,
    context: &Context,
    args: &[Value],
) -> Result<Value, ApplyError> {
    let width = context
        .get("std.fill.width")
        .and_then(|v| v.as_u64())
        .unwrap_or(75) as usize;
    let indent = context
        .get("std.fill.indent")
        .and_then(|v| v.as_u64())
        .unwrap_or(4) as usize;
    let text = text_arg(input, args, 0, "fill")?;
    let margin = " ".repeat(indent);
    let filled = stencil_xml::wrap_text(text, width)
        .into_iter()
        .map(|line| format!("{margin}{line}"))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(Value::String(filled))
}

/// The property names of the input object, in order; anything else yields an
/// empty array.
fn prop_names(
    _engine: &Engine,
    input: &Value,
    _context: &Context,
    _args: &[Value],
) -> Result<Value, ApplyError> {
    let names = match input {
        Value::Object(props) => props
            .keys()
            .map(|k| Value::String(k.clone()))
            .collect(),
        _ => Vec::new(),
    };
    Ok(Value::Array(names))
}

/// Prepend `$` to the argument (or input), producing a meta-property name
/// without invoking its special meaning.
fn metaprop(
    _engine: &Engine,
    input: &Value,
    _context: &Context,
    args: &[Value],
) -> Result<Value, ApplyError> {
    let base = value_to_string(data_arg(input, args, 0));
    Ok(Value::String(format!("${base}")))
}

/// Whether the data a selection points at exists. Without a selection, the
/// input itself is the subject and the answer is always true.
fn isdefined(
    engine: &Engine,
    input: &Value,
    context: &Context,
    args: &[Value],
) -> Result<Value, ApplyError> {
    let Some(select) = args.first().and_then(Value::as_str) else {
        return Ok(Value::Bool(true));
    };
    match engine.extract(input, context, select) {
        Ok(_) => Ok(Value::Bool(true)),
        Err(ApplyError::Extraction { .. }) => Ok(Value::Bool(false)),
        Err(other) => Err(other),
    }
}

/// Whether selected data is of a given JSON type: one of `object`, `array`,
/// `string`, `number`, `integer`, `boolean`, or `null`. A selection that
/// points at nothing, or an unknown type name, yields false.
fn istype(
    engine: &Engine,
    input: &Value,
    context: &Context,
    args: &[Value],
) -> Result<Value, ApplyError> {
    let type_name = args.first().and_then(Value::as_str).ok_or_else(|| {
        ApplyError::Native {
            name: "istype".to_string(),
            message: "requires a JSON type name argument".to_string(),
        }
    })?;

    let selected;
    let subject = match args.get(1).and_then(Value::as_str) {
        Some(select) => match engine.extract(input, context, select) {
            Ok(value) => {
                selected = value;
                &selected
            }
            Err(ApplyError::Extraction { .. }) => return Ok(Value::Bool(false)),
            Err(other) => return Err(other),
        },
        None => input,
    };

    let matched = match type_name {
        "object" => subject.is_object(),
        "array" => subject.is_array(),
        "string" => subject.is_string(),
        "number" => subject.is_number(),
        "integer" => matches!(subject, Value::Number(n) if n.is_i64() || n.is_u64()),
        "boolean" => subject.is_boolean(),
        "null" => subject.is_null(),
        _ => false,
    };
    Ok(Value::Bool(matched))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_bool() {
        assert!(!coerce_bool(&json!(null)));
        assert!(!coerce_bool(&json!(false)));
        assert!(!coerce_bool(&json!(0)));
        assert!(!coerce_bool(&json!(0.0)));
        assert!(!coerce_bool(&json!("")));
        assert!(!coerce_bool(&json!([])));
        assert!(!coerce_bool(&json!({})));

        assert!(coerce_bool(&json!(true)));
        assert!(coerce_bool(&json!(1)));
        assert!(coerce_bool(&json!(-0.5)));
        assert!(coerce_bool(&json!("x")));
        assert!(coerce_bool(&json!([0])));
        assert!(coerce_bool(&json!({"a": null})));
    }

    #[test]
    fn test_builtin_table() {
        assert!(builtin("identity").is_some());
        assert!(builtin("istype").is_some());
        assert!(builtin("no_such_function").is_none());
        assert!(builtin("contrib.extra").is_none());
    }
}
