//! Tokenizers for stylesheet directive strings: quoted strings, brace- or
//! bracket-enclosed fragments, argument lists, and the function-call form
//! `ident(arg1, arg2, ...)`.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::ConfigError;

static FUNC_PAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([\w.]+)\((.*)\)$").expect("valid function pattern"));

/// Whether a reference string is a function invocation, `f(...)`.
pub fn is_function_form(invocation: &str) -> bool {
    FUNC_PAT.is_match(invocation.trim())
}

/// Split the input into a leading quoted string (single or double quotes,
/// backslash-escapable) and the remainder. The quotes are kept. A first
/// character that is not a quote yields an empty token.
pub fn chomp_quote(input: &str) -> Result<(&str, &str), ConfigError> {
    let mut chars = input.char_indices();
    let Some((_, quote)) = chars.next() else {
        return Ok(("", input));
    };
    if quote != '"' && quote != '\'' {
        return Ok(("", input));
    }

    let mut backslashes = 0usize;
    for (i, c) in chars {
        if c == quote && backslashes % 2 == 0 {
            let end = i + c.len_utf8();
            return Ok((&input[..end], &input[end..]));
        }
        if c == '\\' {
            backslashes += 1;
        } else {
            backslashes = 0;
        }
    }
    Err(ConfigError::TemplateSyntax(format!(
        "missing closing quote ({quote}): {input}"
    )))
}

/// Split the input into a leading brace- or bracket-enclosed fragment and the
/// remainder, honoring nesting and quoted sections. The enclosing characters
/// are kept. A first character that opens no enclosure yields an empty token.
pub fn chomp_enclosure(input: &str) -> Result<(&str, &str), ConfigError> {
    let Some(open) = input.chars().next() else {
        return Ok(("", input));
    };
    let close = match open {
        '{' => '}',
        '[' => ']',
        _ => return Ok(("", input)),
    };

    let mut level = 1usize;
    let mut i = open.len_utf8();
    while level > 0 && i < input.len() {
        let Some(c) = input[i..].chars().next() else {
            break;
        };
        if c == open {
            level += 1;
            i += c.len_utf8();
        } else if c == close {
            level -= 1;
            i += c.len_utf8();
        } else if c == '"' || c == '\'' {
            let (quoted, _) = chomp_quote(&input[i..])?;
            i += quoted.len().max(c.len_utf8());
        } else {
            i += c.len_utf8();
        }
    }

    if level > 0 {
        return Err(ConfigError::TemplateSyntax(format!(
            "expected '{close}' to end enclosure: {input}"
        )));
    }
    Ok((&input[..i], &input[i..]))
}

/// Split an argument list into its first argument and the rest. The argument
/// ends at the first comma not enclosed by quotes, braces, or brackets.
pub fn chomp_arg(input: &str) -> Result<(String, &str), ConfigError> {
    let first = input.chars().next();
    let (token, rest) = match first {
        Some('{') | Some('[') => {
            let (tok, rest) = chomp_enclosure(input)?;
            (tok.to_string(), rest)
        }
        Some('"') | Some('\'') => {
            let (tok, rest) = chomp_quote(input)?;
            (tok.to_string(), rest)
        }
        _ => match input.find(',') {
            Some(pos) => (input[..pos].trim().to_string(), &input[pos..]),
            None => (input.trim().to_string(), ""),
        },
    };

    let rest = rest.trim_start();
    if !rest.is_empty() && !rest.starts_with(',') {
        return Err(ConfigError::TemplateSyntax(format!(
            "expected argument delimiter (','): {rest}"
        )));
    }
    let rest = rest.trim_start_matches([',', ' ']);
    Ok((token, rest))
}

/// Split an argument-list string into raw argument tokens.
pub fn split_args(input: &str) -> Result<Vec<String>, ConfigError> {
    let mut out = Vec::new();
    let mut rest = input.trim_start();
    while !rest.is_empty() {
        let (token, remainder) = chomp_arg(rest)?;
        out.push(token);
        rest = remainder;
    }
    Ok(out)
}

/// Parse a function invocation into its name and raw argument tokens.
pub fn parse_function(invocation: &str) -> Result<(String, Vec<String>), ConfigError> {
    let trimmed = invocation.trim();
    let caps = FUNC_PAT.captures(trimmed).ok_or_else(|| {
        ConfigError::FunctionSyntax(format!(
            "does not match function syntax, f(...): {invocation}"
        ))
    })?;
    let name = caps[1].to_string();
    let args = split_args(&caps[2])
        .map_err(|e| ConfigError::FunctionSyntax(format!("{trimmed}: {e}")))?;
    Ok((name, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chomp_quote() {
        let (tok, rest) = chomp_quote("'hello' there").unwrap();
        assert_eq!(tok, "'hello'");
        assert_eq!(rest, " there");

        let (tok, rest) = chomp_quote(r#""a \" quote", next"#).unwrap();
        assert_eq!(tok, r#""a \" quote""#);
        assert_eq!(rest, ", next");

        let (tok, rest) = chomp_quote("plain").unwrap();
        assert_eq!(tok, "");
        assert_eq!(rest, "plain");

        assert!(chomp_quote("'unterminated").is_err());
    }

    #[test]
    fn test_chomp_enclosure() {
        let (tok, rest) = chomp_enclosure("{a {b} c} tail").unwrap();
        assert_eq!(tok, "{a {b} c}");
        assert_eq!(rest, " tail");

        let (tok, rest) = chomp_enclosure("[1, 2, 3], more").unwrap();
        assert_eq!(tok, "[1, 2, 3]");
        assert_eq!(rest, ", more");

        // Braces inside quotes do not count toward nesting.
        let (tok, _) = chomp_enclosure("{'}' inside}").unwrap();
        assert_eq!(tok, "{'}' inside}");

        assert!(chomp_enclosure("{never closed").is_err());

        let (tok, rest) = chomp_enclosure("x{y}").unwrap();
        assert_eq!(tok, "");
        assert_eq!(rest, "x{y}");
    }

    #[test]
    fn test_split_args() {
        let args = split_args("1, 'two, three', [4, 5], {\"six\": 7}").unwrap();
        assert_eq!(args, vec!["1", "'two, three'", "[4, 5]", "{\"six\": 7}"]);

        assert!(split_args("").unwrap().is_empty());
        assert_eq!(split_args("solo").unwrap(), vec!["solo"]);
    }

    #[test]
    fn test_parse_function() {
        let (name, args) = parse_function("delimit(' and ')").unwrap();
        assert_eq!(name, "delimit");
        assert_eq!(args, vec!["' and '"]);

        let (name, args) = parse_function("tostr()").unwrap();
        assert_eq!(name, "tostr");
        assert!(args.is_empty());

        let (name, args) = parse_function("xml.attribute('role', /foo)").unwrap();
        assert_eq!(name, "xml.attribute");
        assert_eq!(args, vec!["'role'", "/foo"]);

        assert!(parse_function("not a function").is_err());
    }

    #[test]
    fn test_is_function_form() {
        assert!(is_function_form("indent(4)"));
        assert!(is_function_form("  tostr()  "));
        assert!(!is_function_form("indent"));
        assert!(!is_function_form("/data/pointer"));
        assert!(!is_function_form("f(x) extra"));
    }
}
