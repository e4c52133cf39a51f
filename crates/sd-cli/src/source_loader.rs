use std::fs;
use std::path::{Path, PathBuf};

use sd_core::{RawDefinition, SchemaError};
use sd_parser::parse_raw_definitions;
use tracing::debug;
use walkdir::WalkDir;

use crate::{map_cli_source_path, map_cli_source_read, map_cli_source_scan, map_cli_source_walk};

pub(crate) fn resolve_schema_dir(schema_dir: &str) -> Result<PathBuf, SchemaError> {
    let path = PathBuf::from(schema_dir);
    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map_err(map_cli_source_path)?
            .join(path)
    };

    if !absolute.exists() {
        return Err(SchemaError::new(
            "CLI_SOURCE_NOT_FOUND",
            format!("schema-dir does not exist: {}", absolute.display()),
        ));
    }

    if !absolute.is_dir() {
        return Err(SchemaError::new(
            "CLI_SOURCE_NOT_DIR",
            format!("schema-dir is not a directory: {}", absolute.display()),
        ));
    }

    Ok(absolute)
}

/// Reads every `*.json` file under `schema_dir`, in sorted path order.
pub(crate) fn read_raw_definitions_from_dir(
    schema_dir: &Path,
) -> Result<Vec<RawDefinition>, SchemaError> {
    let mut definitions = Vec::new();
    let mut files = 0;

    for entry in WalkDir::new(schema_dir)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(map_cli_source_walk)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|extension| extension.to_str()) != Some("json") {
            continue;
        }

        let relative = path
            .strip_prefix(schema_dir)
            .map_err(map_cli_source_scan)?
            .to_string_lossy()
            .replace('\\', "/");

        let content = fs::read_to_string(path).map_err(map_cli_source_read)?;
        let parsed = parse_raw_definitions(&content, &relative)?;
        debug!(file = %relative, definitions = parsed.len(), "loaded schema file");
        definitions.extend(parsed);
        files += 1;
    }

    if files == 0 {
        return Err(SchemaError::new(
            "CLI_SOURCE_EMPTY",
            format!("No .json schema files under {}", schema_dir.display()),
        ));
    }

    Ok(definitions)
}

#[cfg(test)]
mod source_loader_tests {
    use super::*;

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent should be created");
        }
        fs::write(path, content).expect("file should be written");
    }

    #[test]
    fn resolve_schema_dir_validates_existence_and_directory() {
        let root = tempfile::tempdir().expect("tempdir");

        let missing = root.path().join("missing-dir");
        let error = resolve_schema_dir(&missing.to_string_lossy())
            .expect_err("missing path should fail");
        assert_eq!(error.code, "CLI_SOURCE_NOT_FOUND");

        let file_path = root.path().join("plain-file");
        write_file(&file_path, "x");
        let error = resolve_schema_dir(&file_path.to_string_lossy())
            .expect_err("file path should fail");
        assert_eq!(error.code, "CLI_SOURCE_NOT_DIR");

        let resolved =
            resolve_schema_dir(&root.path().to_string_lossy()).expect("directory should resolve");
        assert_eq!(resolved, root.path());
    }

    #[test]
    fn read_raw_definitions_walks_json_files_in_sorted_order() {
        let root = tempfile::tempdir().expect("tempdir");
        write_file(
            &root.path().join("b.json"),
            r#"[{ "kind": "thing", "name": "Second" }]"#,
        );
        write_file(
            &root.path().join("nested").join("c.json"),
            r#"[{ "kind": "value", "name": "Third", "primitive": "string" }]"#,
        );
        write_file(
            &root.path().join("a.json"),
            r#"[{ "kind": "thing", "name": "First" }]"#,
        );
        write_file(&root.path().join("notes.txt"), "ignored");

        let definitions = read_raw_definitions_from_dir(root.path()).expect("scan should pass");
        let names = definitions
            .iter()
            .map(|definition| definition.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["First", "Second", "Third"]);
        assert_eq!(definitions[2].location.file, "nested/c.json");
    }

    #[test]
    fn read_raw_definitions_errors_when_no_json_files() {
        let root = tempfile::tempdir().expect("tempdir");
        write_file(&root.path().join("readme.txt"), "not a schema");

        let error =
            read_raw_definitions_from_dir(root.path()).expect_err("empty source set should fail");
        assert_eq!(error.code, "CLI_SOURCE_EMPTY");
    }

    #[test]
    fn read_raw_definitions_reports_invalid_json() {
        let root = tempfile::tempdir().expect("tempdir");
        write_file(&root.path().join("broken.json"), "[{");

        let error = read_raw_definitions_from_dir(root.path()).expect_err("bad json should fail");
        assert_eq!(error.code, "RAW_PARSE_ERROR");
    }
}
