use sd_core::SchemaError;
use sd_usage::UsageError;
use std::fmt::Display;

fn map_error(code: &'static str, error: impl Display) -> SchemaError {
    SchemaError::new(code, error.to_string())
}

pub(crate) fn emit_error(error: SchemaError) -> i32 {
    println!("RESULT:ERROR");
    println!("ERROR_CODE:{}", error.code);
    println!(
        "ERROR_MSG_JSON:{}",
        serde_json::to_string(&error.message).expect("string json")
    );
    if let Some(span) = &error.span {
        println!("ERROR_AT:{}", span);
    }
    if !error.related.is_empty() {
        println!(
            "ERROR_RELATED_JSON:{}",
            serde_json::to_string(&error.related).expect("string list json")
        );
    }
    1
}

pub(crate) fn map_cli_source_path(error: std::io::Error) -> SchemaError {
    map_error("CLI_SOURCE_PATH", error)
}

pub(crate) fn map_cli_source_scan(error: std::path::StripPrefixError) -> SchemaError {
    map_error("CLI_SOURCE_SCAN", error)
}

pub(crate) fn map_cli_source_read(error: std::io::Error) -> SchemaError {
    map_error("CLI_SOURCE_READ", error)
}

pub(crate) fn map_cli_source_walk(error: walkdir::Error) -> SchemaError {
    map_error("CLI_SOURCE_SCAN", error)
}

pub(crate) fn map_usage(error: UsageError) -> SchemaError {
    map_error(error.code(), error)
}
