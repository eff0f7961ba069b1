//! The `stringtemplate` kind: literal text with balanced `{...}` substitution
//! tokens. Token text is a data pointer, a function invocation, or a named
//! transform; results are stringified and concatenated.

use serde_json::{Map, Value};

use super::{extract_transform, value_to_string, Op};
use crate::engine::Engine;
use crate::error::{json_type_name, ApplyError, ConfigError};
use crate::parse;
use crate::pointer::looks_like_pointer;
use crate::scope::Context;
use crate::transform::Transform;

pub(crate) enum Segment {
    Literal(String),
    Sub(Transform),
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
    let Value::String(content) = content else {
        return Err(ConfigError::WrongParamType {
            name: name.to_string(),
            param: "content",
            need: "string",
            got: json_type_name(content),
        });
    };
    Ok(Op::StringTemplate(parse_template(content, engine, name)?))
}

/// Scan template text left to right. Balanced `{...}` regions become
/// substitution tokens; everything else, including an unterminated `{`, is
/// literal text.
pub(crate) fn parse_template(
    content: &str,
    engine: &Engine,
    name: &str,
) -> Result<Vec<Segment>, ConfigError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = content;

    while !rest.is_empty() {
        let Some(pos) = rest.find('{') else {
            literal.push_str(rest);
            break;
        };
        literal.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match parse::chomp_enclosure(rest) {
            Ok((token, after)) => {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                let inner = &token[1..token.len() - 1];
                segments.push(compile_token(inner, engine, name)?);
                rest = after;
            }
            Err(_) => {
                // No closing brace; treat the brace as ordinary text.
                literal.push('{');
                rest = &rest[1..];
            }
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

fn compile_token(inner: &str, engine: &Engine, name: &str) -> Result<Segment, ConfigError> {
    let transform = if looks_like_pointer(inner) {
        extract_transform(engine, Some(format!("{name}:(select)")), inner)
    } else {
        engine.resolve_transform(inner)?
    };
    Ok(Segment::Sub(transform))
}

pub(crate) fn apply(
    segments: &[Segment],
    input: &Value,
    context: &Context,
) -> Result<Value, ApplyError> {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Sub(transform) => {
                let value = transform.apply(input, context, &[])?;
                out.push_str(&value_to_string(&value));
            }
        }
    }
    Ok(Value::String(out))
}
