//! CLI argument definitions for the report repointing tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "pbix-repoint",
    version,
    about = "Repoint Power BI thin reports from one data-model field to another",
    long_about = "Rewrite field bindings inside Power BI thin report layouts.\n\n\
                  A thin report binds its visuals to an external shared data model;\n\
                  when a model field moves or is renamed, every visual still points\n\
                  at the old name. This tool rewrites those bindings in place,\n\
                  leaving everything else in the report untouched."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Rewrite field bindings in a single report.
    Rename(RenameArgs),

    /// Rewrite field bindings in every report under a directory.
    RenameDir(RenameDirArgs),

    /// List the data-model fields a report binds to.
    Fields(FieldsArgs),

    /// Clear saved select-all state from slicers without a default selection.
    ResetSlicers(ResetSlicersArgs),
}

#[derive(Parser)]
pub struct RenameArgs {
    /// Path to the report archive (.pbix).
    #[arg(value_name = "REPORT")]
    pub report: PathBuf,

    /// Rename spec `Table.Field=Table.Field`; may be given multiple times.
    ///
    /// All specs are applied in one pass. When two specs share a source,
    /// the last one given wins. With --kind hierarchy-level the specs take
    /// the `Table.Hierarchy.Level=Table.Hierarchy.Level` form.
    #[arg(long = "rename", value_name = "OLD=NEW", required = true)]
    pub renames: Vec<String>,

    /// Which reference shapes the specs address.
    ///
    /// The default `auto` treats each spec as both a column and a measure,
    /// matching whichever shape the report actually uses.
    #[arg(long = "kind", value_enum, default_value = "auto")]
    pub kind: KindArg,

    /// Write the result here instead of updating the report in place.
    #[arg(long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Report what would change without writing anything.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct RenameDirArgs {
    /// Directory to scan recursively for .pbix files.
    #[arg(value_name = "DIR")]
    pub directory: PathBuf,

    /// Rename spec `Table.Field=Table.Field`; may be given multiple times.
    #[arg(long = "rename", value_name = "OLD=NEW", required = true)]
    pub renames: Vec<String>,

    /// Which reference shapes the specs address.
    #[arg(long = "kind", value_enum, default_value = "auto")]
    pub kind: KindArg,

    /// File name of the shared data model to leave untouched.
    #[arg(long = "model", value_name = "FILENAME")]
    pub model: Option<String>,

    /// Report what would change without writing anything.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct FieldsArgs {
    /// Path to the report archive (.pbix).
    #[arg(value_name = "REPORT")]
    pub report: PathBuf,

    /// Only report whether these fields occur (dotted `Table.Field` or a
    /// bare field name).
    #[arg(long = "contains", value_name = "FIELD")]
    pub contains: Vec<String>,
}

#[derive(Parser)]
pub struct ResetSlicersArgs {
    /// Path to the report archive (.pbix).
    #[arg(value_name = "REPORT")]
    pub report: PathBuf,

    /// Write the result here instead of updating the report in place.
    #[arg(long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Report what would change without writing anything.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

/// Reference shapes addressable from the command line.
#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Auto,
    Column,
    Measure,
    Hierarchy,
    HierarchyLevel,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
