//! `tabload` command-line front end.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;

use tabload::inference::{detect_problems, infer_schema, ProblemReport};
use tabload::ingestion::{read_from_path, ReadOptions, SheetSelection};
use tabload::load::{
    list_tables, BulkLoader, Destination, LoadContext, LoadObserver, LoadOptions, LoadOutcome,
    LoadRequest, NoopObserver, ReviewDecision, Source, StdErrObserver,
};
use tabload::logging::{init_logging, LogConfig, LogFormat};
use tabload::normalize::{normalize_nulls, preview_from_path};
use tabload::schema::TableSchema;

mod cli;

use crate::cli::{Cli, Command, LoadArgs, LogFormatArg, PreviewArgs, SourceArgs};

fn main() {
    let cli = Cli::parse();
    let log_config = LogConfig::from_verbosity(cli.verbose)
        .with_format(match cli.log_format {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        })
        .with_log_file(cli.log_file.clone());
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }

    let result = match cli.command {
        Command::Load(args) => run_load(&args),
        Command::Inspect(args) => run_inspect(&args),
        Command::Preview(args) => run_preview(&args),
        Command::Tables { database } => run_tables(&database),
    };
    if let Err(error) = result {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn read_options(source: &SourceArgs) -> ReadOptions {
    ReadOptions {
        sheet: source
            .sheet
            .clone()
            .map_or(SheetSelection::First, SheetSelection::Named),
        ..ReadOptions::default()
    }
}

fn run_load(args: &LoadArgs) -> Result<()> {
    let options: LoadOptions = match &args.config {
        Some(path) => read_json(path).context("reading loader config")?,
        None => LoadOptions::default(),
    };
    let corrected: Option<TableSchema> = match &args.schema {
        Some(path) => Some(read_json(path).context("reading corrected schema")?),
        None => None,
    };

    let table = match &args.table {
        Some(table) => table.clone(),
        None => args
            .source
            .file
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_owned)
            .context("cannot derive a table name from the file name; pass --table")?,
    };
    let observer: Arc<dyn LoadObserver> = if args.quiet {
        Arc::new(NoopObserver)
    } else {
        Arc::new(StdErrObserver)
    };

    let loader = BulkLoader::new(options);
    let request = LoadRequest::new(
        Source::path(&args.source.file, read_options(&args.source)),
        Destination::new(&args.database, table),
    );
    let ctx = LoadContext::new(observer);

    let outcome = if corrected.is_none() && !args.apply_suggestions {
        loader.run(request, &ctx)
    } else {
        match loader.prepare(request, &ctx) {
            Ok(pending) => {
                let decision = match corrected {
                    Some(schema) => ReviewDecision::Corrected(schema),
                    None => ReviewDecision::Corrected(pending.suggested_schema()),
                };
                pending.resume(decision)
            }
            Err(outcome) => outcome,
        }
    };

    match outcome {
        LoadOutcome::Completed(summary) => {
            println!("{}", summary.message());
            Ok(())
        }
        other => bail!("{}", other.message()),
    }
}

#[derive(Serialize)]
struct Inspection {
    schema: TableSchema,
    problems: Vec<ProblemReport>,
}

fn run_inspect(args: &SourceArgs) -> Result<()> {
    let mut dataset = read_from_path(&args.file, &read_options(args))
        .with_context(|| format!("reading {}", args.file.display()))?;
    normalize_nulls(&mut dataset);
    let schema = infer_schema(&dataset);
    let problems = detect_problems(&dataset, &schema);
    let out = serde_json::to_string_pretty(&Inspection { schema, problems })?;
    println!("{out}");
    Ok(())
}

fn run_preview(args: &PreviewArgs) -> Result<()> {
    let options = ReadOptions {
        max_rows: Some(args.rows),
        ..read_options(&args.source)
    };
    let dataset = preview_from_path(&args.source.file, &options)
        .with_context(|| format!("reading {}", args.source.file.display()))?;

    let mut writer = csv::Writer::from_writer(io::stdout().lock());
    writer.write_record(dataset.schema.field_names())?;
    for row in &dataset.rows {
        writer.write_record(row.iter().map(|v| v.to_text().unwrap_or_default()))?;
    }
    writer.flush()?;
    Ok(())
}

fn run_tables(database: &Path) -> Result<()> {
    if !database.exists() {
        bail!("database {} does not exist", database.display());
    }
    for table in list_tables(database)? {
        println!("{table}");
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}
