//! Rendering of JSON element trees into XML text.
//!
//! An element is a plain JSON object of the form
//!
//! ```text
//! { "name": "subject",
//!   "content": { "attrs": [...], "children": [...] },
//!   "prefix": ..., "namespace": ..., "prefixes": {...}, "hints": {...} }
//! ```
//!
//! produced by the engine's element-builder transforms. Layout is controlled
//! by a [`RenderContext`] assembled from `xml.*` context keys; an element's
//! `hints` override the context for that element and its subtree.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;

/// Namespace-URI → prefix table, in allocation order.
pub type PrefixMap = IndexMap<String, String>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("missing XML data: {0}")]
    MissingXmlData(String),
}

/// Layout settings derived from the `xml.*` context keys.
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// `xml.style`: `"pretty"` or `"compact"`.
    pub style: String,
    /// `xml.indent`: current left margin, in spaces.
    pub indent: i64,
    /// `xml.indent_step`: per-level indentation; negative suppresses all
    /// whitespace.
    pub indent_step: i64,
    /// `xml.max_line_length`: wrap threshold measured from column zero.
    pub max_line_length: usize,
    /// `xml.min_line_length`: lower clamp on the usable text width.
    pub min_line_length: usize,
    /// `xml.text_packing`: `"pretty"` wraps text; anything else leaves it on
    /// one line.
    pub text_packing: String,
    /// `xml.value_pad`: spaces around an inlined text value.
    pub value_pad: usize,
    /// `xml.xmlns`: the default namespace; matching elements get no prefix.
    pub xmlns: String,
    /// `xml.prefer_prefix`: emit a prefix even for the default namespace.
    pub prefer_prefix: bool,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            style: "pretty".into(),
            indent: 0,
            indent_step: 2,
            max_line_length: 75,
            min_line_length: 30,
            text_packing: "pretty".into(),
            value_pad: 0,
            xmlns: String::new(),
            prefer_prefix: false,
        }
    }
}

impl RenderContext {
    /// Apply a single `xml.*` hint. Unrecognized keys are ignored.
    pub fn apply_hint(&mut self, key: &str, value: &Value) {
        match key {
            "xml.style" => {
                if let Some(s) = value.as_str() {
                    self.style = s.to_string();
                }
            }
            "xml.indent" => {
                if let Some(n) = value.as_i64() {
                    self.indent = n;
                }
            }
            "xml.indent_step" => {
                if let Some(n) = value.as_i64() {
                    self.indent_step = n;
                }
            }
            "xml.max_line_length" => {
                if let Some(n) = value.as_u64() {
                    self.max_line_length = n as usize;
                }
            }
            "xml.min_line_length" => {
                if let Some(n) = value.as_u64() {
                    self.min_line_length = n as usize;
                }
            }
            "xml.text_packing" => {
                if let Some(s) = value.as_str() {
                    self.text_packing = s.to_string();
                }
            }
            "xml.value_pad" => {
                if let Some(n) = value.as_u64() {
                    self.value_pad = n as usize;
                }
            }
            "xml.xmlns" => {
                if let Some(s) = value.as_str() {
                    self.xmlns = s.to_string();
                }
            }
            "xml.prefer_prefix" => {
                if let Some(b) = value.as_bool() {
                    self.prefer_prefix = b;
                }
            }
            _ => {}
        }
    }

    /// A copy of this context with the given hints applied over it.
    pub fn with_hints(&self, hints: &Map<String, Value>) -> Self {
        let mut out = self.clone();
        for (key, value) in hints {
            out.apply_hint(key, value);
        }
        out
    }

    /// A fresh default context with the given hints applied.
    pub fn from_hints(hints: &Map<String, Value>) -> Self {
        Self::default().with_hints(hints)
    }

    fn compact(&self) -> bool {
        self.style == "compact" || self.indent_step < 0
    }

    fn margin(&self) -> usize {
        if self.compact() {
            0
        } else {
            self.indent.max(0) as usize
        }
    }
}

/// Break text into lines no longer than `width`, greedily, at whitespace
/// boundaries. A word longer than `width` gets a line of its own.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if line.is_empty() {
            line.push_str(word);
        } else if line.len() + 1 + word.len() <= width {
            line.push(' ');
            line.push_str(word);
        } else {
            lines.push(std::mem::take(&mut line));
            line.push_str(word);
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Decide the prefix to emit for a namespace, allocating and recording a new
/// one when needed.
///
/// Returns the prefix including its trailing colon (empty for the default
/// namespace) and any new `xmlns:p="ns"` attribute definitions to emit on the
/// current element.
pub fn determine_prefix(
    namespace: Option<&str>,
    prefix: Option<&str>,
    ctx: &RenderContext,
    prefixes: &mut PrefixMap,
) -> (String, Vec<String>) {
    let Some(ns) = namespace else {
        let p = prefix.map(|p| format!("{p}:")).unwrap_or_default();
        return (p, Vec::new());
    };

    if !ctx.xmlns.is_empty() && ns == ctx.xmlns && !ctx.prefer_prefix {
        return (String::new(), Vec::new());
    }

    if let Some(known) = prefixes.get(ns) {
        if prefix.is_none() || prefix == Some(known.as_str()) {
            return (format!("{known}:"), Vec::new());
        }
    }

    let chosen = match prefix {
        Some(p) => p.to_string(),
        None => allocate_prefix(prefixes),
    };
    let def = format!("xmlns:{chosen}=\"{ns}\"");
    prefixes.insert(ns.to_string(), chosen.clone());
    (format!("{chosen}:"), vec![def])
}

/// Auto-allocated prefixes are `ns<N>` with N one past the highest in use.
fn allocate_prefix(prefixes: &PrefixMap) -> String {
    let next = prefixes
        .values()
        .filter_map(|p| p.strip_prefix("ns").and_then(|n| n.parse::<u64>().ok()))
        .max()
        .unwrap_or(0)
        + 1;
    format!("ns{next}")
}

/// Lay out text inside an element per the context: wrapped and indented under
/// `pretty` packing, indented but unwrapped otherwise, and bare when a
/// negative `indent_step` suppresses whitespace entirely.
pub fn format_text(text: &str, ctx: &RenderContext) -> String {
    if ctx.indent_step < 0 {
        return text.to_string();
    }
    let margin = " ".repeat(ctx.indent.max(0) as usize);
    if ctx.text_packing != "pretty" {
        return format!("{margin}{text}");
    }
    let width = ctx
        .max_line_length
        .saturating_sub(ctx.indent.max(0) as usize)
        .max(ctx.min_line_length);
    wrap_text(text, width)
        .into_iter()
        .map(|line| format!("{margin}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn attr_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render an attribute list for an opening tag whose content starts at column
/// `start_col` (just past `<name`). Attributes pack onto the line until
/// `max_line_length`; overflow wraps to new lines aligned one past the tag
/// start. Namespace definitions accumulated while rendering (plus any in
/// `leading_defs`) are appended after the attributes.
///
/// Every token carries its own leading space, so the result drops directly
/// between `<name` and `>`.
pub fn format_attributes(
    attrs: &[Value],
    start_col: usize,
    ctx: &RenderContext,
    prefixes: &mut PrefixMap,
    leading_defs: Vec<String>,
) -> Result<String, RenderError> {
    let mut tokens = Vec::new();
    let mut defs = leading_defs;

    for attr in attrs {
        match attr {
            Value::String(raw) => tokens.push(raw.clone()),
            Value::Object(obj) => {
                let name = obj
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| RenderError::MissingXmlData("attribute has no name".into()))?;
                let value = obj
                    .get("value")
                    .map(attr_text)
                    .ok_or_else(|| RenderError::MissingXmlData("attribute has no value".into()))?;
                let namespace = obj.get("namespace").and_then(Value::as_str);
                let prefix = obj.get("prefix").and_then(Value::as_str);
                let (p, new_defs) = determine_prefix(namespace, prefix, ctx, prefixes);
                defs.extend(new_defs);
                tokens.push(format!("{p}{name}=\"{value}\""));
            }
            other => {
                return Err(RenderError::MissingXmlData(format!(
                    "attribute is neither an object nor a string: {other}"
                )));
            }
        }
    }
    tokens.extend(defs);

    if ctx.compact() {
        let mut out = String::new();
        for tok in &tokens {
            out.push(' ');
            out.push_str(tok);
        }
        return Ok(out);
    }

    let continuation = " ".repeat(start_col);
    let mut out = String::new();
    let mut col = start_col;
    for tok in &tokens {
        let needed = tok.len() + 1;
        if col > start_col && col + needed > ctx.max_line_length {
            out.push('\n');
            out.push_str(&continuation);
            col = start_col;
        }
        out.push(' ');
        out.push_str(tok);
        col += needed;
    }
    Ok(out)
}

/// Render an element tree with a fresh prefix table.
pub fn render_element(element: &Value, ctx: &RenderContext) -> Result<String, RenderError> {
    let mut prefixes = PrefixMap::new();
    format_element(element, ctx, &mut prefixes)
}

/// Render an element tree, sharing a prefix table with the surrounding
/// document so allocated prefixes stay stable across siblings.
pub fn format_element(
    element: &Value,
    ctx: &RenderContext,
    prefixes: &mut PrefixMap,
) -> Result<String, RenderError> {
    let el = element
        .as_object()
        .ok_or_else(|| RenderError::MissingXmlData(format!("element is not an object: {element}")))?;
    let name = el
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| RenderError::MissingXmlData("element has no name".into()))?;

    let ctx = match el.get("hints").and_then(Value::as_object) {
        Some(hints) => ctx.with_hints(hints),
        None => ctx.clone(),
    };

    if let Some(extra) = el.get("prefixes").and_then(Value::as_object) {
        for (ns, p) in extra {
            if let Some(p) = p.as_str() {
                prefixes.insert(ns.clone(), p.to_string());
            }
        }
    }

    let namespace = el.get("namespace").and_then(Value::as_str);
    let own_prefix = el.get("prefix").and_then(Value::as_str);
    let (p, defs) = determine_prefix(namespace, own_prefix, &ctx, prefixes);
    let tag = format!("{p}{name}");

    let empty = Map::new();
    let content = el.get("content").and_then(Value::as_object).unwrap_or(&empty);
    let attrs: &[Value] = content
        .get("attrs")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    let children: Vec<Value> = match content.get("children") {
        Some(Value::Array(items)) => items.clone(),
        Some(text @ Value::String(_)) => vec![text.clone()],
        _ => Vec::new(),
    };

    let margin = " ".repeat(ctx.margin());
    let start_col = ctx.margin() + 1 + tag.len();
    let atts = format_attributes(attrs, start_col, &ctx, prefixes, defs)?;

    if children.is_empty() {
        return Ok(format!("{margin}<{tag}{atts}/>"));
    }

    if ctx.compact() {
        let mut body = String::new();
        for child in &children {
            match child {
                Value::String(text) => body.push_str(text),
                other => body.push_str(&format_element(other, &ctx, prefixes)?),
            }
        }
        return Ok(format!("{margin}<{tag}{atts}>{body}</{tag}>"));
    }

    let mut child_ctx = ctx.clone();
    child_ctx.indent = ctx.indent + ctx.indent_step;

    // A lone text child sits on the open-tag line when it fits.
    if let [Value::String(text)] = children.as_slice() {
        if !atts.contains('\n') && !text.contains('\n') {
            let pad = " ".repeat(ctx.value_pad);
            let line = format!("{margin}<{tag}{atts}>{pad}{text}{pad}</{tag}>");
            if line.len() <= ctx.max_line_length || ctx.text_packing != "pretty" {
                return Ok(line);
            }
        }
        let body = format_text(text, &child_ctx);
        return Ok(format!("{margin}<{tag}{atts}>\n{body}\n{margin}</{tag}>"));
    }

    let mut lines = vec![format!("{margin}<{tag}{atts}>")];
    for child in &children {
        match child {
            Value::String(text) => lines.push(format_text(text, &child_ctx)),
            other => lines.push(format_element(other, &child_ctx, prefixes)?),
        }
    }
    lines.push(format!("{margin}</{tag}>"));
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
    const CAT: &str = "urn:example:schema/catalog/1.0";
    const BOOK: &str = "urn:example:schema/book/1.0";

    fn seeded_prefixes() -> PrefixMap {
        let mut p = PrefixMap::new();
        p.insert(XSI.to_string(), "xsi".to_string());
        p.insert(CAT.to_string(), "cat".to_string());
        p.insert("urn:example:misc".to_string(), "ns5".to_string());
        p
    }

    #[test]
    fn test_determine_prefix_explicit() {
        let ctx = RenderContext::default();
        let mut pfs = seeded_prefixes();
        let (p, defs) = determine_prefix(Some(BOOK), Some("bk"), &ctx, &mut pfs);
        assert_eq!(p, "bk:");
        assert_eq!(defs, vec![format!("xmlns:bk=\"{BOOK}\"")]);
        assert_eq!(pfs.get(BOOK).map(String::as_str), Some("bk"));
    }

    #[test]
    fn test_determine_prefix_no_namespace() {
        let ctx = RenderContext::default();
        let mut pfs = seeded_prefixes();
        let (p, defs) = determine_prefix(None, Some("cat"), &ctx, &mut pfs);
        assert_eq!(p, "cat:");
        assert!(defs.is_empty());
        assert!(!pfs.contains_key(BOOK));
    }

    #[test]
    fn test_determine_prefix_auto_allocation() {
        let ctx = RenderContext::default();
        let mut pfs = seeded_prefixes();
        let (p, defs) = determine_prefix(Some(BOOK), None, &ctx, &mut pfs);
        assert_eq!(p, "ns6:");
        assert_eq!(defs, vec![format!("xmlns:ns6=\"{BOOK}\"")]);
        assert_eq!(pfs.get(BOOK).map(String::as_str), Some("ns6"));
    }

    #[test]
    fn test_determine_prefix_reuse() {
        let ctx = RenderContext::default();
        let mut pfs = seeded_prefixes();
        let (p, defs) = determine_prefix(Some(CAT), None, &ctx, &mut pfs);
        assert_eq!(p, "cat:");
        assert!(defs.is_empty());
    }

    #[test]
    fn test_determine_prefix_default_namespace() {
        let mut ctx = RenderContext::default();
        ctx.xmlns = BOOK.to_string();
        let mut pfs = seeded_prefixes();
        let (p, defs) = determine_prefix(Some(BOOK), Some("bk"), &ctx, &mut pfs);
        assert_eq!(p, "");
        assert!(defs.is_empty());
        assert!(!pfs.contains_key(BOOK));

        ctx.prefer_prefix = true;
        let (p, defs) = determine_prefix(Some(BOOK), Some("bk"), &ctx, &mut pfs);
        assert_eq!(p, "bk:");
        assert_eq!(defs.len(), 1);
        assert!(pfs.contains_key(BOOK));
    }

    const LONG_TEXT: &str = "A catalog groups related publications under one heading so that \
readers can discover new material by browsing subjects rather than titles, authors, or \
publication dates alone.";

    #[test]
    fn test_format_text_wraps() {
        let mut ctx = RenderContext::default();
        ctx.indent = 8;
        ctx.max_line_length = 70;
        let out = format_text(LONG_TEXT, &ctx);
        let lines: Vec<&str> = out.split('\n').collect();
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.len() <= 70));
        assert!(lines.iter().all(|l| l.starts_with("        ")));
        assert!(lines.iter().all(|l| l.trim_start().len() <= 62));
    }

    #[test]
    fn test_format_text_suppressed() {
        let mut ctx = RenderContext::default();
        ctx.indent = 8;
        ctx.indent_step = -1;
        let out = format_text(LONG_TEXT, &ctx);
        assert_eq!(out, LONG_TEXT);
    }

    #[test]
    fn test_format_text_loose_packing() {
        let mut ctx = RenderContext::default();
        ctx.indent = 8;
        ctx.text_packing = "loose".to_string();
        let out = format_text(LONG_TEXT, &ctx);
        assert_eq!(out.split('\n').count(), 1);
        assert!(out.starts_with("        A catalog"));
        assert!(out.len() > 75);
    }

    #[test]
    fn test_format_text_clamps_to_min_width() {
        let mut ctx = RenderContext::default();
        ctx.indent = 60;
        ctx.max_line_length = 70;
        ctx.min_line_length = 30;
        let out = format_text(LONG_TEXT, &ctx);
        let lines: Vec<&str> = out.split('\n').collect();
        assert!(lines.len() > 1);
        // Width is clamped, so full lines overrun the nominal maximum.
        assert!(lines[0].len() > 70);
        assert!(lines.iter().all(|l| l.trim_start().len() <= 30));
    }

    #[test]
    fn test_format_attributes_packing() {
        let mut ctx = RenderContext::default();
        ctx.max_line_length = 60;
        let mut pfs = seeded_prefixes();
        let attrs = vec![
            json!({"name": "role", "value": "creation"}),
            json!({"name": "type", "value": "cat:Subject", "namespace": XSI}),
            json!({"name": "id", "value": "browse", "namespace": "urn:example:ids"}),
        ];
        let out = format_attributes(&attrs, 10, &ctx, &mut pfs, Vec::new()).unwrap();
        let lines: Vec<&str> = out.split('\n').collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], " role=\"creation\" xsi:type=\"cat:Subject\"");
        assert!(lines[1].starts_with("           ns6:id=\"browse\""));
        assert!(lines[1].ends_with(" xmlns:ns6=\"urn:example:ids\""));
    }

    #[test]
    fn test_format_element_simple() {
        let element = json!({
            "name": "subject",
            "content": {"children": ["metals"]},
            "hints": {"xml.value_pad": 2}
        });
        let mut ctx = RenderContext::default();
        ctx.indent = 4;
        let out = render_element(&element, &ctx).unwrap();
        assert_eq!(out, "    <subject>  metals  </subject>");

        ctx.style = "compact".to_string();
        let out = render_element(&element, &ctx).unwrap();
        assert_eq!(out, "<subject>metals</subject>");
    }

    #[test]
    fn test_format_element_empty_content() {
        let element = json!({
            "name": "placeholder",
            "content": {"attrs": [{"name": "role", "value": "spacer"}]}
        });
        let out = render_element(&element, &RenderContext::default()).unwrap();
        assert_eq!(out, "<placeholder role=\"spacer\"/>");
    }

    #[test]
    fn test_format_element_wrapped_text() {
        let element = json!({
            "name": "description",
            "content": {
                "children": [LONG_TEXT],
                "attrs": [{"name": "lang", "value": "en"}]
            },
            "hints": {"xml.value_pad": 2}
        });
        let mut ctx = RenderContext::default();
        ctx.indent = 5;
        let out = render_element(&element, &ctx).unwrap();
        let lines: Vec<&str> = out.split('\n').collect();
        assert!(lines.len() > 3);
        assert_eq!(lines[0], "     <description lang=\"en\">");
        assert_eq!(lines[lines.len() - 1], "     </description>");
        for body in &lines[1..lines.len() - 1] {
            assert!(body.starts_with("       "));
            assert!(body.len() <= 75);
        }
    }

    #[test]
    fn test_format_element_nested() {
        let element = json!({
            "name": "applicability",
            "content": {
                "attrs": [
                    {"name": "type", "prefix": "xsi", "namespace": XSI,
                     "value": "cat:Browsable"},
                    format!("xmlns:cat=\"{CAT}\"")
                ],
                "children": [
                    {"name": "mediaType", "content": {"children": ["print"]}},
                    {"name": "subjectClass", "content": {"children": ["history"]}},
                    {"name": "subjectClass", "content": {"children": ["biography"]}}
                ]
            }
        });
        let mut ctx = RenderContext::default();
        ctx.indent = 0;
        ctx.value_pad = 1;
        let expected = format!(
            "<applicability xsi:type=\"cat:Browsable\"\n               xmlns:cat=\"{CAT}\"\n               \
xmlns:xsi=\"{XSI}\">\n  <mediaType> print </mediaType>\n  <subjectClass> history </subjectClass>\n  \
<subjectClass> biography </subjectClass>\n</applicability>"
        );
        let out = render_element(&element, &ctx).unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_wrap_text_basic() {
        let lines = wrap_text("one two three four five", 9);
        assert_eq!(lines, vec!["one two", "three", "four five"]);
        assert!(wrap_text("", 10).is_empty());
        assert_eq!(wrap_text("single", 2), vec!["single"]);
    }
}
