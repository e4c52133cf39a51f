use sd_core::SchemaError;
use sd_resolver::{resolve_schema, Schema};
use sd_usage::{run_usage, UsageMode, UsageOptions, UsageStore};
use tracing::info;

use crate::{
    map_usage, mode_name, read_raw_definitions_from_dir, resolve_schema_dir, DefinitionLine,
    ReferenceArgs, ReferenceLine, ResolveArgs,
};

fn load_schema(schema_dir: &str) -> Result<Schema, SchemaError> {
    let root = resolve_schema_dir(schema_dir)?;
    let raw = read_raw_definitions_from_dir(&root)?;
    resolve_schema(&raw)
}

fn json_line(key: &str, value: &impl serde::Serialize) {
    println!(
        "{}:{}",
        key,
        serde_json::to_string(value).expect("output line should serialize")
    );
}

pub(crate) fn run_resolve(args: ResolveArgs) -> Result<i32, SchemaError> {
    if args.usage_file.is_none() && (args.include_new || args.commit) {
        return Err(SchemaError::new(
            "CLI_USAGE_FILE_REQUIRED",
            "--include-new and --commit need --usage-file.",
        ));
    }

    let schema = load_schema(&args.schema_dir)?;

    let Some(usage_file) = &args.usage_file else {
        println!("RESULT:OK");
        println!("DEFINITIONS:{}", schema.len());
        for definition in schema.definitions() {
            json_line("DEFINITION_JSON", &DefinitionLine::new(&schema, definition, None));
        }
        return Ok(0);
    };

    let mut store = UsageStore::load(usage_file).map_err(map_usage)?;
    let options = UsageOptions {
        include_new: args.include_new,
    };
    let report = run_usage(&schema, &mut store, &options).map_err(map_usage)?;
    if args.commit {
        store.commit().map_err(map_usage)?;
    } else {
        info!(path = %store.path().display(), "usage file left untouched, pass --commit to write it");
    }

    println!("RESULT:OK");
    println!("DEFINITIONS:{}", schema.len());
    for mode in [
        UsageMode::Normal,
        UsageMode::CompatibilityOnly,
        UsageMode::Skip,
    ] {
        println!("MODE_COUNT:{}={}", mode_name(mode), report.count(mode));
    }
    for definition in schema.definitions() {
        json_line(
            "DEFINITION_JSON",
            &DefinitionLine::new(&schema, definition, Some(&report)),
        );
    }
    println!("USAGE_COMMITTED:{}", args.commit);
    Ok(0)
}

pub(crate) fn run_reference(args: ReferenceArgs) -> Result<i32, SchemaError> {
    let schema = load_schema(&args.schema_dir)?;
    let reference = schema.resolve_reference(&args.reference, args.context.as_deref())?;
    let split = reference
        .split_collection_searches(&schema)?
        .iter()
        .map(|part| part.text().to_string())
        .collect::<Vec<_>>();

    println!("RESULT:OK");
    json_line("REFERENCE_JSON", &ReferenceLine::new(&schema, &reference));
    json_line("SPLIT_JSON", &split);
    Ok(0)
}
