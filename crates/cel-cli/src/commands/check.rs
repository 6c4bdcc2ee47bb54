//! `celc check`: type-check a parsed expression tree.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context;
use cel_checker::diagnostic::{create_files, from_check_errors, JsonDiagnostic};
use cel_checker::{check, CheckResult, Env, Expr, ExprId, ReferenceInfo, SourceInfo};
use serde::{Deserialize, Serialize};
use termcolor::{ColorChoice, StandardStream};

use crate::config::EnvConfig;
use crate::output::StyledOutput;
use crate::Format;

/// Arguments of `celc check`
pub struct CheckOptions {
    pub input: PathBuf,
    pub config: Option<PathBuf>,
    pub format: Format,
    pub show_types: bool,
    pub color: ColorChoice,
}

/// Parsed expression as handed over by a parser
#[derive(Debug, Deserialize)]
pub struct CheckInput {
    /// Expression text, used for diagnostics
    #[serde(default)]
    pub source: String,
    /// Byte offset of each node in `source`
    #[serde(default)]
    pub positions: BTreeMap<ExprId, usize>,
    /// Root of the tree
    pub expr: Expr,
}

#[derive(Serialize)]
struct JsonReport {
    ok: bool,
    result_type: Option<String>,
    types: BTreeMap<ExprId, String>,
    references: BTreeMap<ExprId, ReferenceInfo>,
    diagnostics: Vec<JsonDiagnostic>,
    truncated: usize,
}

/// Check the input; returns whether it was free of diagnostics
pub fn execute(options: &CheckOptions) -> anyhow::Result<bool> {
    let env = load_env(options.config.as_deref())?;

    let content = std::fs::read_to_string(&options.input)
        .with_context(|| format!("Failed to read {}", options.input.display()))?;
    let input: CheckInput = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse expression tree in {}", options.input.display()))?;

    let name = options.input.display().to_string();
    let mut source = SourceInfo::new(name.as_str(), &input.source);
    for (&id, &offset) in &input.positions {
        source.set_position(id, offset);
    }

    let result = check(&env, &source, input.expr);
    match options.format {
        Format::Json => print_json(&result, &name, &input.source)?,
        Format::Human => print_human(&result, &name, &input.source, options)?,
    }
    Ok(!result.has_errors())
}

/// Environment from a config file, or the standard environment
pub fn load_env(config: Option<&std::path::Path>) -> anyhow::Result<Env> {
    let config = match config {
        Some(path) => EnvConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EnvConfig::default(),
    };
    Ok(config.build_env()?)
}

fn print_human(
    result: &CheckResult,
    name: &str,
    source: &str,
    options: &CheckOptions,
) -> anyhow::Result<()> {
    let files = create_files(name, source);
    let mut stderr = StandardStream::stderr(options.color);
    for diag in from_check_errors(&result.errors, 0, source) {
        diag.emit_to(&mut stderr, &files)?;
    }

    let mut out = StyledOutput::new(options.color);
    if options.show_types {
        let types: BTreeMap<_, _> = result.types.iter().collect();
        for (id, ty) in types {
            out.dim(&format!("{:>6}", id));
            out.plain(&format!("  {}", ty));
            if let Some(reference) = result.reference(*id) {
                out.info(&format!("  -> {}", describe(reference)));
            }
            out.newline();
        }
    }

    if result.has_errors() {
        let count = result.errors.len() + result.errors.dropped();
        out.error("error");
        out.plain(&format!(": {} diagnostic(s) in {}", count, name));
    } else {
        out.success("ok");
        let ty = result
            .result_type()
            .map(ToString::to_string)
            .unwrap_or_else(|| "<untyped>".to_string());
        out.plain(": ");
        out.bold(&ty);
    }
    out.newline();
    out.flush();
    Ok(())
}

fn print_json(result: &CheckResult, name: &str, source: &str) -> anyhow::Result<()> {
    let files = create_files(name, source);
    let report = JsonReport {
        ok: !result.has_errors(),
        result_type: result.result_type().map(ToString::to_string),
        types: result
            .types
            .iter()
            .map(|(id, ty)| (*id, ty.to_string()))
            .collect(),
        references: result
            .references
            .iter()
            .map(|(id, r)| (*id, r.clone()))
            .collect(),
        diagnostics: from_check_errors(&result.errors, 0, source)
            .iter()
            .map(|d| JsonDiagnostic::from_diagnostic(d, &files))
            .collect(),
        truncated: result.errors.dropped(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn describe(reference: &ReferenceInfo) -> String {
    if !reference.name.is_empty() {
        return reference.name.clone();
    }
    reference.overload_ids.join(" | ")
}
