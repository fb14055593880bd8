//! Import/Export commands

use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

use clap::{Args, ValueEnum};
use gremlin_mcp_core::{ExportFormat, ExportOptions, ImportFormat, ImportOptions};

use crate::output::{to_json, OutputFormat};
use crate::{AppContext, Cli};

/// Import file format
#[derive(Clone, Copy, ValueEnum)]
pub enum ImportFileFormat {
    #[value(name = "graphson")]
    GraphSon,
    Csv,
}

impl From<ImportFileFormat> for ImportFormat {
    fn from(f: ImportFileFormat) -> Self {
        match f {
            ImportFileFormat::GraphSon => ImportFormat::GraphSon,
            ImportFileFormat::Csv => ImportFormat::Csv,
        }
    }
}

/// Export format
#[derive(Clone, Copy, Default, ValueEnum)]
pub enum ExportFileFormat {
    #[default]
    Json,
    #[value(name = "graphson")]
    GraphSon,
    Csv,
}

impl From<ExportFileFormat> for ExportFormat {
    fn from(f: ExportFileFormat) -> Self {
        match f {
            ExportFileFormat::Json => ExportFormat::Json,
            ExportFileFormat::GraphSon => ExportFormat::GraphSon,
            ExportFileFormat::Csv => ExportFormat::Csv,
        }
    }
}

#[derive(Args)]
pub struct ImportArgs {
    /// Input file
    pub file: PathBuf,

    /// Input format (default: from the file extension)
    #[arg(long)]
    pub format: Option<ImportFileFormat>,

    /// Traversals per batch
    #[arg(long, default_value = "100")]
    pub batch_size: usize,

    /// Drop every vertex before importing
    #[arg(long)]
    pub clear: bool,

    /// Check the file without writing anything
    #[arg(long)]
    pub validate_only: bool,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Gremlin traversal selecting what to export
    pub traversal: String,

    /// Output file (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Export format
    #[arg(long, default_value = "json")]
    pub format: ExportFileFormat,

    /// Only export these properties (can be used multiple times)
    #[arg(long)]
    pub include: Vec<String>,

    /// Never export these properties (can be used multiple times)
    #[arg(long)]
    pub exclude: Vec<String>,
}

fn infer_format(path: &Path) -> ImportFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => ImportFormat::Csv,
        _ => ImportFormat::GraphSon,
    }
}

pub async fn run_import(args: &ImportArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let data = std::fs::read_to_string(&args.file)?;
    let format = args
        .format
        .map(ImportFormat::from)
        .unwrap_or_else(|| infer_format(&args.file));

    let options = ImportOptions {
        batch_size: args.batch_size,
        clear_graph: args.clear,
        validate_only: args.validate_only,
    };
    let summary = ctx.service.import(format, &data, &options).await?;

    match cli.output_format() {
        OutputFormat::Json => println!("{}", to_json(&summary)?),
        OutputFormat::Text if summary.validated_only => println!(
            "Valid: {} vertices, {} edges in {} batches",
            summary.vertices, summary.edges, summary.batches
        ),
        OutputFormat::Text => println!(
            "Imported {} vertices and {} edges in {} batches",
            summary.vertices, summary.edges, summary.batches
        ),
    }
    Ok(())
}

pub async fn run_export(args: &ExportArgs, _cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let options = ExportOptions {
        format: args.format.into(),
        include_properties: (!args.include.is_empty()).then(|| args.include.clone()),
        exclude_properties: args.exclude.clone(),
    };
    let content = ctx.service.export(&args.traversal, &options).await?;

    if let Some(ref path) = args.output {
        // Write with secure permissions (0o600 = owner read/write only)
        #[cfg(unix)]
        {
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(path)?;
            file.write_all(content.as_bytes())?;
        }
        #[cfg(not(unix))]
        {
            std::fs::write(path, &content)?;
        }
        eprintln!("Exported to {}", path.display());
    } else {
        println!("{}", content);
    }

    Ok(())
}
