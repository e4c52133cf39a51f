use sd_core::{RawDefinition, RawDefinitionKind, SchemaError, SourceSpan};
use tracing::debug;

/// Loads one JSON document holding an array of raw definitions.
///
/// Definitions without a source file are stamped with `origin`.
pub fn parse_raw_definitions(
    source: &str,
    origin: &str,
) -> Result<Vec<RawDefinition>, SchemaError> {
    let mut definitions: Vec<RawDefinition> = serde_json::from_str(source).map_err(|error| {
        SchemaError::with_span(
            "RAW_PARSE_ERROR",
            format!("Failed to parse raw definitions in \"{}\": {}", origin, error),
            SourceSpan::at(origin, error.line()),
        )
    })?;

    for definition in &mut definitions {
        stamp_origin(&mut definition.location, origin);
        if let Some(syncable) = definition.kind.syncable_mut() {
            for field in &mut syncable.fields {
                stamp_origin(&mut field.location, origin);
            }
        }
        if let RawDefinitionKind::Enum(raw_enum) = &mut definition.kind {
            for value in &mut raw_enum.values {
                stamp_origin(&mut value.location, origin);
            }
        }
    }

    debug!(origin, count = definitions.len(), "loaded raw definitions");
    Ok(definitions)
}

fn stamp_origin(location: &mut SourceSpan, origin: &str) {
    if location.file.is_empty() {
        location.file = origin.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_raw_definitions_stamps_origin_on_locations() {
        let source = r#"[
            { "kind": "thing", "name": "Item", "fields": [
                { "name": "title", "fieldType": { "single": "string" } }
            ] },
            { "kind": "value", "name": "Url", "primitive": "string",
              "location": { "file": "values.sd", "start": { "line": 3, "column": 1 },
                            "end": { "line": 3, "column": 9 } } }
        ]"#;

        let definitions = parse_raw_definitions(source, "schema/items.json")
            .expect("definitions should parse");
        assert_eq!(definitions.len(), 2);
        assert_eq!(definitions[0].location.file, "schema/items.json");
        let RawDefinitionKind::Thing(syncable) = &definitions[0].kind else {
            panic!("expected thing");
        };
        assert_eq!(syncable.fields[0].location.file, "schema/items.json");
        assert_eq!(definitions[1].location.file, "values.sd");
    }

    #[test]
    fn parse_raw_definitions_stamps_origin_on_enum_values() {
        let source = r#"[
            { "kind": "enum", "name": "Color", "values": [
                { "name": "red" },
                { "name": "blue", "location": { "file": "colors.sd",
                  "start": { "line": 2, "column": 3 }, "end": { "line": 2, "column": 7 } } }
            ] }
        ]"#;

        let definitions = parse_raw_definitions(source, "schema/colors.json")
            .expect("definitions should parse");
        let RawDefinitionKind::Enum(raw_enum) = &definitions[0].kind else {
            panic!("expected enum");
        };
        assert_eq!(raw_enum.values[0].location.file, "schema/colors.json");
        assert_eq!(raw_enum.values[1].location.file, "colors.sd");
    }

    #[test]
    fn parse_raw_definitions_reports_origin_and_line() {
        let error = parse_raw_definitions("[\n{ \"kind\": \"nope\" }\n]", "bad.json")
            .expect_err("unknown kind should fail");
        assert_eq!(error.code, "RAW_PARSE_ERROR");
        let span = error.span.expect("span");
        assert_eq!(span.file, "bad.json");
        assert!(span.start.line >= 1);
    }
}
