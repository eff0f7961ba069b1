//! Errors raised while compiling stylesheets and applying transforms.
//!
//! The split mirrors the two phases of the engine: [`ConfigError`] covers a
//! bad stylesheet detected while building the transform tree, and
//! [`ApplyError`] covers failures against a particular input document.

use serde_json::Value;
use thiserror::Error;

/// A problem in the stylesheet configuration itself.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name}: missing parameter: {param}")]
    MissingParam { name: String, param: &'static str },

    #[error("{name}: invalid type for {param} parameter: need {need}, got {got}")]
    WrongParamType {
        name: String,
        param: &'static str,
        need: &'static str,
        got: &'static str,
    },

    #[error("syntax error in string template: {0}")]
    TemplateSyntax(String),

    #[error("syntax error in function invocation: {0}")]
    FunctionSyntax(String),

    #[error("{name}: unrecognized transform kind: {kind}")]
    UnknownKind { name: String, kind: String },

    #[error("named transform could not be found: {0}")]
    UnknownName(String),

    #[error("transform is disabled: {0}")]
    Disabled(String),

    #[error("circular transform reference: {0}")]
    Cycle(String),

    #[error("prefix '{prefix}' expands to an invalid data pointer: {expansion}")]
    BadPrefix { prefix: String, expansion: String },

    #[error("'{node}' node in stylesheet is not an object")]
    NotAnObject { node: &'static str },

    #[error("context key is protected: {0}")]
    ProtectedKey(String),

    #[error("{name}: insufficient arguments for callable transform")]
    InsufficientArgs { name: String },
}

/// A failure while applying a compiled transform to input data.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("{name}: wrong input data type: need {need}, got {got}")]
    WrongInputType {
        name: String,
        need: &'static str,
        got: &'static str,
    },

    /// The pointer was valid but selected nothing. Carries the document the
    /// selection ran against so callers can include it in diagnostics.
    #[error("problem extracting data with '{select}' (resolved to '{pointer}')")]
    Extraction {
        select: String,
        pointer: String,
        input: Value,
    },

    #[error("problem using data pointer '{select}': {reason}")]
    Pointer { select: String, reason: String },

    #[error("{name}: {message}")]
    Native { name: String, message: String },

    #[error("attempt to apply callable transform directly (without a function wrapper): {0}")]
    CallableDirect(String),

    #[error(transparent)]
    Render(#[from] stencil_xml::RenderError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Name to report for a transform in an error message.
pub(crate) fn display_name(name: Option<&str>) -> String {
    name.unwrap_or("(anon)").to_string()
}

/// The JSON type name of a value, as used in error messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
