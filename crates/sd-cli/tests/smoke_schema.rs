use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("feed")
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_schemadef"))
        .args(args)
        .output()
        .expect("cli should execute")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn resolve_lists_definitions_with_usage_modes() {
    let schema_dir = fixture_dir().join("schema").to_string_lossy().to_string();
    let temp = tempfile::tempdir().expect("tempdir");
    let usage = temp.path().join("usage.txt");
    fs::copy(fixture_dir().join("usage.txt"), &usage).expect("usage fixture should copy");
    let usage_arg = usage.to_string_lossy().to_string();

    let output = run(&[
        "resolve",
        "--schema-dir",
        schema_dir.as_str(),
        "--usage-file",
        usage_arg.as_str(),
        "--commit",
    ]);
    let text = stdout(&output);
    assert!(
        output.status.success(),
        "resolve failed\nstdout:\n{}\nstderr:\n{}",
        text,
        String::from_utf8_lossy(&output.stderr)
    );

    assert!(text.starts_with("RESULT:OK\n"));
    assert!(text.contains(
        r#"DEFINITION_JSON:{"name":"Legacy","kind":"thing","deprecated":true,"mode":"compatibilityOnly","fields":["note"]}"#
    ));
    assert!(text.contains(r#""name":"UnknownShape","kind":"thing","deprecated":false,"unknownOf":"Shape""#));
    assert!(text.contains(r#"{"name":"Gallery","kind":"thing","deprecated":false,"mode":"skip","fields":[]}"#));
    assert!(text.contains("USAGE_COMMITTED:true"));

    let written = fs::read_to_string(&usage).expect("usage file should be readable");
    assert!(written.starts_with("action FetchFeed\n"));
    assert!(written.contains("# shipped in 1.0\nthing Feed\n"));
    assert!(written.contains("thing Item.title 1\n"));
    assert!(written.contains("thing Item.link 2\n"));
    assert!(written.contains("-thing Gallery\n"));
    assert!(written.contains("-action Envelope\n"));
}

#[test]
fn reference_splits_collection_searches() {
    let schema_dir = fixture_dir().join("schema").to_string_lossy().to_string();
    let output = run(&[
        "reference",
        "--schema-dir",
        schema_dir.as_str(),
        "--ref",
        "Feed.items.title",
    ]);
    let text = stdout(&output);
    assert!(output.status.success(), "reference failed:\n{}", text);
    assert!(text.contains(r#""flavor":"definitionPath""#));
    assert!(text.contains(r#""access":"collectionSearch""#));
    assert!(text.contains(r#"SPLIT_JSON:["Feed.items","Item.title"]"#));
}

#[test]
fn reference_into_a_collection_of_interfaces_is_rejected() {
    let schema_dir = fixture_dir().join("schema").to_string_lossy().to_string();
    let output = run(&[
        "reference",
        "--schema-dir",
        schema_dir.as_str(),
        "--ref",
        "Gallery.shapes.name",
    ]);
    let text = stdout(&output);
    assert_eq!(output.status.code(), Some(1));
    assert!(text.contains("RESULT:ERROR"));
    assert!(text.contains("ERROR_CODE:PATH_INVALID"));
    assert!(text.contains("ERROR_RELATED_JSON:"));
}
