use super::*;
use std::fs;
use std::path::{Path, PathBuf};

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("feed")
}

fn schema_dir() -> String {
    fixture_dir().join("schema").to_string_lossy().to_string()
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent should be created");
    }
    fs::write(path, content).expect("file should be written");
}

#[test]
fn cli_parses_subcommands_and_global_verbose() {
    let cli = Cli::try_parse_from([
        "schemadef",
        "reference",
        "--schema-dir",
        "schema",
        "--ref",
        ".items",
        "--context",
        "Feed",
        "--verbose",
    ])
    .expect("arguments should parse");
    assert!(cli.verbose);
    let Mode::Reference(args) = cli.command else {
        panic!("expected reference subcommand");
    };
    assert_eq!(args.reference, ".items");
    assert_eq!(args.context.as_deref(), Some("Feed"));
}

#[test]
fn usage_flags_require_a_usage_file() {
    let error = commands::run_resolve(ResolveArgs {
        schema_dir: schema_dir(),
        usage_file: None,
        include_new: false,
        commit: true,
    })
    .expect_err("commit without usage file should fail");
    assert_eq!(error.code, "CLI_USAGE_FILE_REQUIRED");
}

#[test]
fn resolve_fixture_without_usage_file_succeeds() {
    let schema_dir = schema_dir();
    let code = run_cli_from_args(["schemadef", "resolve", "--schema-dir", schema_dir.as_str()]);
    assert_eq!(code, 0);
}

#[test]
fn resolve_with_include_new_commits_every_fresh_entry() {
    let dir = tempfile::tempdir().expect("tempdir");
    let usage = dir.path().join("usage").join("usage.txt");
    let schema_dir = schema_dir();
    let usage_arg = usage.to_string_lossy().to_string();

    let code = run_cli_from_args([
        "schemadef",
        "resolve",
        "--schema-dir",
        schema_dir.as_str(),
        "--usage-file",
        usage_arg.as_str(),
        "--include-new",
        "--commit",
    ]);
    assert_eq!(code, 0);

    let written = fs::read_to_string(&usage).expect("usage file should be written");
    assert!(written.contains("thing Gallery\n"));
    assert!(written.contains("thing Gallery.shapes 1\n"));
    assert!(written.contains("-thing Legacy\n"));
    assert!(!written.contains("UnknownShape"));
}

#[test]
fn schema_errors_exit_non_zero() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_file(
        &dir.path().join("dup.json"),
        r#"[{ "kind": "thing", "name": "A" }, { "kind": "enum", "name": "A" }]"#,
    );

    let schema_dir = dir.path().to_string_lossy().to_string();
    let code = run_cli_from_args(["schemadef", "resolve", "--schema-dir", schema_dir.as_str()]);
    assert_eq!(code, 1);
}
