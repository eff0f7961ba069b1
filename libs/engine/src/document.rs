//! Loading a stylesheet document and driving whole-document transformations.

use serde::Serialize;
use serde_json::{Map, Value};
use std::io;
use tracing::debug;

use crate::engine::Engine;
use crate::error::{ApplyError, ConfigError};
use crate::transform::Transform;

/// A loaded stylesheet: a standard engine wrapped with the document's
/// declarations plus the eagerly compiled root transform.
#[derive(Debug)]
pub struct Stylesheet {
    engine: Engine,
    root: Transform,
}

impl Stylesheet {
    /// Load a stylesheet document over a standard engine.
    pub fn new(document: &Value) -> Result<Self, ConfigError> {
        Self::with_overrides(document, None, None)
    }

    /// Load a stylesheet with application-supplied context and system
    /// overrides (e.g. from command-line parameters). Context overrides go
    /// through the protected-key filter.
    pub fn with_overrides(
        document: &Value,
        context: Option<&Map<String, Value>>,
        system: Option<&Map<String, Value>>,
    ) -> Result<Self, ConfigError> {
        let base = Engine::standard();
        if let Some(values) = context {
            base.context().update(values);
        }
        if let Some(values) = system {
            for (key, value) in values {
                base.set_system(key, value.clone());
            }
        }

        let Some(doc) = document.as_object() else {
            return Err(ConfigError::NotAnObject { node: "stylesheet" });
        };
        let engine = base.wrap(doc)?;
        // The wrap above already absorbed the document's scope declarations,
        // so the root compiles without wrapping again.
        let root = engine.make_transform_full(document, None, None, true)?;
        debug!("stylesheet compiled");
        Ok(Self { engine, root })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Apply the root transform to an input document.
    pub fn apply(&self, input: &Value) -> Result<Value, ApplyError> {
        self.root.apply(input, self.engine.context(), &[])
    }

    /// Apply and render the result: string results pass through as text
    /// unless `force_json` is set, anything else is JSON-encoded honoring the
    /// `json.*` context keys.
    pub fn render(&self, input: &Value, force_json: bool) -> Result<String, ApplyError> {
        match self.apply(input)? {
            Value::String(text) if !force_json => Ok(text),
            other => Ok(self.encode_json(&other)),
        }
    }

    /// Apply and write the rendered result to a stream, ending with a
    /// newline.
    pub fn write(
        &self,
        out: &mut dyn io::Write,
        input: &Value,
        force_json: bool,
    ) -> Result<(), ApplyError> {
        let rendered = self.render(input, force_json)?;
        let outcome = if rendered.ends_with('\n') {
            out.write_all(rendered.as_bytes())
        } else {
            out.write_all(rendered.as_bytes())
                .and_then(|()| out.write_all(b"\n"))
        };
        outcome.map_err(|err| ApplyError::Native {
            name: "write".to_string(),
            message: err.to_string(),
        })
    }

    fn encode_json(&self, value: &Value) -> String {
        let context = self.engine.context();
        let indent = context
            .get("json.indent")
            .and_then(|v| v.as_i64())
            .map(|width| " ".repeat(width.max(0) as usize));
        let item = context
            .get("json.item_separator")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| ", ".to_string());
        let key = context
            .get("json.dict_separator")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| ": ".to_string());
        serialize_with(value, JsonFormatter::new(item, key, indent))
    }
}

fn serialize_with<F: serde_json::ser::Formatter>(value: &Value, formatter: F) -> String {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    if value.serialize(&mut ser).is_err() {
        return value.to_string();
    }
    String::from_utf8(buf).unwrap_or_else(|_| value.to_string())
}

/// JSON output with configurable item and key separators, optionally laid
/// out with an indent string. The separators apply either way; the indent
/// adds the newline-and-margin layout between them.
struct JsonFormatter {
    item: String,
    key: String,
    indent: Option<String>,
    depth: usize,
    has_value: bool,
}

impl JsonFormatter {
    fn new(item: String, key: String, indent: Option<String>) -> Self {
        Self {
            item,
            key,
            indent,
            depth: 0,
            has_value: false,
        }
    }

    fn newline<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let Some(indent) = &self.indent else {
            return Ok(());
        };
        writer.write_all(b"\n")?;
        for _ in 0..self.depth {
            writer.write_all(indent.as_bytes())?;
        }
        Ok(())
    }

    fn begin_container<W>(&mut self, writer: &mut W, open: &[u8]) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.depth += 1;
        self.has_value = false;
        writer.write_all(open)
    }

    fn end_container<W>(&mut self, writer: &mut W, close: &[u8]) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.depth -= 1;
        if self.has_value {
            self.newline(writer)?;
        }
        writer.write_all(close)
    }

    fn begin_entry<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if !first {
            writer.write_all(self.item.as_bytes())?;
        }
        self.newline(writer)
    }
}

impl serde_json::ser::Formatter for JsonFormatter {
    fn begin_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.begin_container(writer, b"[")
    }

    fn end_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.end_container(writer, b"]")
    }

    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.begin_entry(writer, first)
    }

    fn end_array_value<W>(&mut self, _writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.has_value = true;
        Ok(())
    }

    fn begin_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.begin_container(writer, b"{")
    }

    fn end_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.end_container(writer, b"}")
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.begin_entry(writer, first)
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(self.key.as_bytes())
    }

    fn end_object_value<W>(&mut self, _writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.has_value = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_string_raw_and_forced() {
        let sheet = Stylesheet::new(&json!({"$type": "literal", "value": "plain text"})).unwrap();
        assert_eq!(sheet.render(&json!({}), false).unwrap(), "plain text");
        assert_eq!(sheet.render(&json!({}), true).unwrap(), "\"plain text\"");
    }

    #[test]
    fn test_render_json_with_default_separators() {
        let sheet = Stylesheet::new(&json!({
            "$type": "json",
            "content": {"a": 1, "b": [2, 3]}
        }))
        .unwrap();
        let out = sheet.render(&json!({}), false).unwrap();
        assert_eq!(out, "{\"a\": 1, \"b\": [2, 3]}");
    }

    #[test]
    fn test_render_json_pretty() {
        let sheet = Stylesheet::new(&json!({
            "$type": "json",
            "content": {"a": 1},
            "context": {"json.indent": 4}
        }))
        .unwrap();
        let out = sheet.render(&json!({}), false).unwrap();
        assert_eq!(out, "{\n    \"a\": 1\n}");
    }

    #[test]
    fn test_render_json_indent_keeps_custom_separators() {
        let sheet = Stylesheet::new(&json!({
            "$type": "json",
            "content": {"a": 1, "b": [2, 3]},
            "context": {"json.indent": 2, "json.item_separator": ","}
        }))
        .unwrap();
        let out = sheet.render(&json!({}), false).unwrap();
        assert_eq!(out, "{\n  \"a\": 1,\n  \"b\": [\n    2,\n    3\n  ]\n}");
    }

    #[test]
    fn test_write_appends_newline() {
        let sheet = Stylesheet::new(&json!({"$type": "literal", "value": "@"})).unwrap();
        let mut buf = Vec::new();
        sheet.write(&mut buf, &json!({}), false).unwrap();
        assert_eq!(buf, b"@\n");
    }
}
