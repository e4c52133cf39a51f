use std::ffi::OsString;

use clap::Parser;
use sd_core::SchemaError;

mod cli_args;
mod commands;
mod error_map;
mod models;
mod source_loader;

pub(crate) use cli_args::{Cli, Mode, ReferenceArgs, ResolveArgs};
pub(crate) use error_map::{
    emit_error, map_cli_source_path, map_cli_source_read, map_cli_source_scan,
    map_cli_source_walk, map_usage,
};
pub(crate) use models::{mode_name, DefinitionLine, ReferenceLine};
pub(crate) use source_loader::{read_raw_definitions_from_dir, resolve_schema_dir};

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    init_logging(cli.verbose);
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

/// Installs the stderr subscriber; later calls in the same process are no-ops.
fn init_logging(verbose: bool) {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn run(cli: Cli) -> Result<i32, SchemaError> {
    match cli.command {
        Mode::Resolve(args) => commands::run_resolve(args),
        Mode::Reference(args) => commands::run_reference(args),
    }
}

#[cfg(test)]
mod tests;
