use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "schemadef")]
#[command(about = "Resolve schema definitions and track their usage")]
pub(crate) struct Cli {
    /// Log at debug level on stderr.
    #[arg(short, long, global = true)]
    pub(crate) verbose: bool,
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    Resolve(ResolveArgs),
    Reference(ReferenceArgs),
}

#[derive(Debug, Args)]
pub(crate) struct ResolveArgs {
    #[arg(long = "schema-dir")]
    pub(crate) schema_dir: String,
    #[arg(long = "usage-file")]
    pub(crate) usage_file: Option<String>,
    #[arg(long = "include-new")]
    pub(crate) include_new: bool,
    #[arg(long = "commit")]
    pub(crate) commit: bool,
}

#[derive(Debug, Args)]
pub(crate) struct ReferenceArgs {
    #[arg(long = "schema-dir")]
    pub(crate) schema_dir: String,
    #[arg(long = "ref")]
    pub(crate) reference: String,
    #[arg(long = "context")]
    pub(crate) context: Option<String>,
}
