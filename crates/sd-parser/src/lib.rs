mod path;
mod raw_json;
mod reference;

pub use path::{parse_path, Path, PathSegment};
pub use raw_json::parse_raw_definitions;
pub use reference::{parse_reference, ParsedReference, ReferenceFlavor};

use std::sync::OnceLock;

use regex::Regex;

pub(crate) fn identifier_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][0-9A-Za-z_]*$").expect("identifier regex must compile")
    })
}

pub fn is_identifier(text: &str) -> bool {
    identifier_regex().is_match(text)
}
