//! Minimal CLI: schema + JSON inputs → (decode | encode | check)
use std::path::{Path, PathBuf};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, Args};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, info};
use json_cast::{Converter, Datum, MissingFieldPolicy, Options, Schema, SchemaError};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// validate JSON records against a schema document and convert them between wire and internal form
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// wire JSON → internal representation (field keys renamed, dates normalized)
    Decode(ConvertOut),
    /// internal representation → wire JSON
    Encode(ConvertOut),
    /// validate every record independently and report each failure
    Check(CheckOut),
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// schema document (JSON)
    #[arg(long, short)]
    schema: PathBuf,

    /// record type to use instead of the document's `root`
    #[arg(long)]
    root: Option<String>,

    /// feed missing fields to their type as `null` instead of rejecting them
    #[arg(long, default_value_t = false)]
    missing_as_null: bool,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON), one record list per line
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct ConvertOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// only print failures
    #[arg(long, short)]
    quiet: bool,
}

/// Outcome of checking one input file.
struct FileReport {
    source: PathBuf,
    records: usize,
    failures: Vec<SchemaError>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SchemaSettings {
    fn converter(&self) -> Result<Converter> {
        let source = std::fs::read_to_string(&self.schema)
            .with_context(|| format!("failed to read schema file {}", self.schema.display()))?;
        let mut schema = Schema::parse(&source)
            .with_context(|| format!("invalid schema file {}", self.schema.display()))?;
        if let Some(root) = &self.root {
            schema.root = root.clone();
        }
        let missing = if self.missing_as_null {
            MissingFieldPolicy::AbsentAsNull
        } else {
            MissingFieldPolicy::Strict
        };
        debug!(root = %schema.root, types = schema.registry.len(), ?missing, "schema loaded");
        Ok(schema.converter()?.with_options(Options { missing }))
    }
}

impl InputSettings {
    fn sources(&self) -> Result<Vec<PathBuf>> {
        resolve_file_path_patterns(&self.input)
            .map_err(|error| anyhow::anyhow!("failed to resolve input file paths: {error}"))
    }

    /// Every document a source file yields after NDJSON splitting and pre-selection.
    fn documents(&self, source_path: &Path) -> Result<Vec<Value>> {
        let source_path_str = source_path.to_string_lossy().to_string();
        let source = std::fs::read_to_string(source_path)
            .with_context(|| format!("failed to read source file {source_path_str}"))?;

        let raw: Vec<Value> = if self.ndjson {
            source
                .lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(i, line)| {
                    serde_json::from_str::<Value>(line).with_context(|| {
                        format!("failed to parse JSON on line {} of {source_path_str}", i + 1)
                    })
                })
                .collect::<Result<_>>()?
        } else {
            vec![serde_json::from_str::<Value>(&source)
                .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?]
        };

        let mut out = Vec::with_capacity(raw.len());
        for json_value in raw {
            let json_value = match self.json_pointer.as_deref() {
                None => json_value,
                Some(pointer) => crate::jq_exec::select_pointer(json_value, pointer)
                    .with_context(|| format!("in source file ({source_path_str})"))?,
            };
            match self.jq_expr.as_ref() {
                None => out.push(json_value),
                Some(jq_expr) => {
                    let result = crate::jq_exec::run_jaq(jq_expr, &json_value).with_context(|| {
                        format!("failed to apply jq expression to source file ({source_path_str})")
                    })?;
                    out.extend(result);
                }
            }
        }
        Ok(out)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// `Ok(false)` when `check` found invalid records.
    pub fn run(&self) -> Result<bool> {
        match &self.cmd {
            Command::Decode(target) => {
                let converter = target.schema_settings.converter()?;
                let mut records = Vec::new();
                for source_path in target.input_settings.sources()? {
                    for doc in target.input_settings.documents(&source_path)? {
                        let decoded = converter
                            .decode(&doc)
                            .with_context(|| format!("in {}", source_path.display()))?;
                        records.extend(decoded.into_iter().map(Value::from));
                    }
                }
                info!(records = records.len(), "decoded");
                write_output(target.out.as_deref(), &Value::Array(records))?;
                Ok(true)
            }
            Command::Encode(target) => {
                let converter = target.schema_settings.converter()?;
                let mut wire = Vec::new();
                for source_path in target.input_settings.sources()? {
                    for doc in target.input_settings.documents(&source_path)? {
                        let Value::Array(items) = doc else {
                            bail!("{}: expected a list of records", source_path.display());
                        };
                        let records: Vec<Datum> = items.into_iter().map(Datum::from).collect();
                        match converter.encode(&records)
                            .with_context(|| format!("in {}", source_path.display()))?
                        {
                            Value::Array(xs) => wire.extend(xs),
                            other => wire.push(other),
                        }
                    }
                }
                info!(records = wire.len(), "encoded");
                write_output(target.out.as_deref(), &Value::Array(wire))?;
                Ok(true)
            }
            Command::Check(target) => {
                let converter = target.schema_settings.converter()?;
                let sources = target.input_settings.sources()?;
                info!(files = sources.len(), "checking inputs");
                let reports = sources
                    .into_par_iter()
                    .map(|source| check_file(&converter, &target.input_settings, source))
                    .collect::<Result<Vec<_>>>()?;

                let mut clean = true;
                for report in &reports {
                    let shown = report.source.display();
                    if report.failures.is_empty() {
                        if !target.quiet {
                            println!("{} {shown}: {} records", "ok".green().bold(), report.records);
                        }
                        continue;
                    }
                    clean = false;
                    println!(
                        "{} {shown}: {} of {} records invalid",
                        "FAIL".red().bold(),
                        report.failures.len(),
                        report.records,
                    );
                    for failure in &report.failures {
                        println!("    {}", failure.to_string().dimmed());
                    }
                }
                Ok(clean)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn check_file(converter: &Converter, settings: &InputSettings, source: PathBuf) -> Result<FileReport> {
    let mut records = 0;
    let mut failures = Vec::new();
    for doc in settings.documents(&source)? {
        match converter.decode_each(&doc) {
            Ok(results) => {
                records += results.len();
                failures.extend(results.into_iter().filter_map(Result::err));
            }
            Err(error) => failures.push(error),
        }
    }
    debug!(source = %source.display(), records, failures = failures.len(), "checked");
    Ok(FileReport { source, records, failures })
}

fn write_output(out: Option<&Path>, value: &Value) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, &rendered)
                .with_context(|| format!("failed to write {}", out.display()))?;
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                matched_any = true;
                out.push(entry?);
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                return Err(format!("glob pattern matched no files: {pattern}").into());
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
