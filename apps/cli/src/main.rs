use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use serde_json::{Map, Value};
use stencil_engine::Stylesheet;

// Exit codes, by failure kind.
const FILE_NOT_FOUND: u8 = 1;
const INVALID_PARAM: u8 = 3;
const BAD_JSON_STYLESHEET: u8 = 4;
const BAD_JSON_DOCUMENT: u8 = 5;
const INVALID_TRANSFORM: u8 = 6;
const TRANSFORM_ERROR: u8 = 7;
const UNEXPECTED: u8 = 10;

/// Context parameters that must be integers when set from the command line.
const INT_PARAMS: [&str; 6] = [
    "json.indent",
    "xml.indent",
    "xml.indent_step",
    "xml.max_line_length",
    "xml.min_line_length",
    "xml.value_pad",
];

#[derive(Parser)]
#[command(
    name = "stencil",
    about = "Transform a JSON document against a stylesheet",
    version
)]
struct Cli {
    /// The stylesheet (JSON) to apply.
    ssheet: PathBuf,

    /// The input JSON document to transform ("-" or omitted reads stdin).
    doc: Option<PathBuf>,

    /// Insert spaces and newlines to make the JSON output prettier.
    #[arg(short = 'p', long = "pretty-print", action = ArgAction::SetTrue)]
    pretty: bool,

    /// Force JSON output, even when the result is text.
    #[arg(short = 'j', long = "json-out", action = ArgAction::SetTrue)]
    force_json: bool,

    /// Set a context parameter. Repeatable.
    #[arg(short = 'D', value_name = "KEY=VALUE")]
    context: Vec<String>,

    /// Set a system parameter. Repeatable.
    #[arg(short = 'S', value_name = "KEY=VALUE")]
    system: Vec<String>,

    /// Suppress messages explaining failures.
    #[arg(short = 'q', long, action = ArgAction::SetTrue)]
    quiet: bool,

    /// Suppress all output; the exit code tells the outcome.
    #[arg(short = 's', long, action = ArgAction::SetTrue)]
    silent: bool,

    /// Print extra error detail.
    #[arg(short = 'v', long, action = ArgAction::SetTrue)]
    verbose: bool,

    /// Print engine debugging messages.
    #[arg(short = 'g', long, action = ArgAction::SetTrue)]
    debug: bool,
}

#[derive(Debug)]
struct Failure {
    code: u8,
    message: String,
}

impl Failure {
    fn new(code: u8, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.debug {
        tracing_subscriber::fmt()
            .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
            .with_writer(io::stderr)
            .init();
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            if !cli.quiet && !cli.silent {
                eprintln!("stencil: {}", failure.message);
            }
            ExitCode::from(failure.code)
        }
    }
}

fn run(cli: &Cli) -> Result<(), Failure> {
    let mut context = parse_params(&cli.context)?;
    if cli.pretty && !context.contains_key("json.indent") {
        context.insert("json.indent".to_string(), Value::from(4));
    }
    let system = parse_params(&cli.system)?;

    let stylesheet_text = read_file(&cli.ssheet)?;
    let stylesheet: Value = serde_json::from_str(&stylesheet_text).map_err(|err| {
        Failure::new(
            BAD_JSON_STYLESHEET,
            format!("JSON syntax error in stylesheet: {err}"),
        )
    })?;

    let engine = Stylesheet::with_overrides(&stylesheet, Some(&context), Some(&system))
        .map_err(|err| {
            Failure::new(
                INVALID_TRANSFORM,
                format!("stylesheet configuration error: {err}"),
            )
        })?;

    let document_text = match &cli.doc {
        Some(path) if path.as_os_str() != "-" => read_file(path)?,
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|err| Failure::new(UNEXPECTED, format!("failed to read stdin: {err}")))?;
            buf
        }
    };
    let document: Value = serde_json::from_str(&document_text).map_err(|err| {
        Failure::new(
            BAD_JSON_DOCUMENT,
            format!("JSON syntax error in input document: {err}"),
        )
    })?;

    if cli.silent {
        engine
            .apply(&document)
            .map_err(transform_failure(cli, None))?;
        return Ok(());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    engine
        .write(&mut out, &document, cli.force_json)
        .map_err(transform_failure(cli, Some(&document)))?;
    out.flush()
        .map_err(|err| Failure::new(UNEXPECTED, format!("failed to write output: {err}")))
}

fn transform_failure<'a>(
    cli: &'a Cli,
    document: Option<&'a Value>,
) -> impl Fn(stencil_engine::ApplyError) -> Failure + 'a {
    move |err| {
        if cli.verbose && !cli.quiet && !cli.silent {
            if let Some(doc) = document {
                eprintln!("stencil: problem transforming input: {doc}");
            }
        }
        match err {
            stencil_engine::ApplyError::Config(cause) => Failure::new(
                INVALID_TRANSFORM,
                format!("stylesheet configuration error: {cause}"),
            ),
            other => Failure::new(TRANSFORM_ERROR, format!("transformation failed: {other}")),
        }
    }
}

fn read_file(path: &PathBuf) -> Result<String, Failure> {
    if !path.exists() {
        return Err(Failure::new(
            FILE_NOT_FOUND,
            format!("{}: file not found", path.display()),
        ));
    }
    fs::read_to_string(path)
        .map_err(|err| Failure::new(UNEXPECTED, format!("{}: {err}", path.display())))
}

/// Parse repeated `KEY=VALUE` parameters. Known integer parameters are
/// coerced; everything else stays a string.
fn parse_params(params: &[String]) -> Result<Map<String, Value>, Failure> {
    let mut out = Map::new();
    for param in params {
        let Some((key, value)) = param.split_once('=') else {
            return Err(Failure::new(
                INVALID_PARAM,
                format!("bad parameter syntax (missing '='): {param}"),
            ));
        };
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() {
            return Err(Failure::new(
                INVALID_PARAM,
                format!("bad parameter syntax (empty name): {param}"),
            ));
        }
        let value = if INT_PARAMS.contains(&key) {
            let n: i64 = value.parse().map_err(|_| {
                Failure::new(
                    INVALID_PARAM,
                    format!("{key}: bad parameter type (expected integer): {value}"),
                )
            })?;
            Value::from(n)
        } else {
            Value::String(value.to_string())
        };
        out.insert(key.to_string(), value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_params() {
        let params = vec![
            "name=catalog".to_string(),
            "json.indent=4".to_string(),
            "greeting=a=b".to_string(),
        ];
        let parsed = parse_params(&params).unwrap();
        assert_eq!(parsed["name"], Value::String("catalog".into()));
        assert_eq!(parsed["json.indent"], Value::from(4));
        assert_eq!(parsed["greeting"], Value::String("a=b".into()));
    }

    #[test]
    fn test_parse_params_errors() {
        assert_eq!(
            parse_params(&["nodelimiter".to_string()]).unwrap_err().code,
            INVALID_PARAM
        );
        assert_eq!(
            parse_params(&["=value".to_string()]).unwrap_err().code,
            INVALID_PARAM
        );
        assert_eq!(
            parse_params(&["xml.indent=four".to_string()])
                .unwrap_err()
                .code,
            INVALID_PARAM
        );
    }
}
