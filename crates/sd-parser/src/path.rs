use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use sd_core::SchemaError;

use crate::is_identifier;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Field(String),
    Key(String),
    Index(usize),
}

impl PathSegment {
    pub fn is_collection_access(&self) -> bool {
        matches!(self, Self::Key(_) | Self::Index(_))
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => write!(f, ".{}", name),
            Self::Key(key) => {
                f.write_str("[\"")?;
                for ch in key.chars() {
                    if ch == '"' || ch == '\\' {
                        f.write_str("\\")?;
                    }
                    write!(f, "{}", ch)?;
                }
                f.write_str("\"]")
            }
            Self::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// An untyped path such as `.items["3"].title`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    pub segments: Vec<PathSegment>,
}

impl Path {
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl FromIterator<PathSegment> for Path {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

fn syntax_error(text: &str, offset: usize, detail: &str) -> SchemaError {
    SchemaError::new(
        "PATH_SYNTAX",
        format!(
            "Invalid path \"{}\" at offset {}: {}.",
            text, offset, detail
        ),
    )
}

/// Parses `.field`, `["key"]` and `[index]` segments left to right.
pub fn parse_path(text: &str) -> Result<Path, SchemaError> {
    if text.is_empty() {
        return Err(syntax_error(text, 0, "path is empty"));
    }

    let mut segments = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((offset, ch)) = chars.next() {
        match ch {
            '.' => {
                let name = take_while(&mut chars, |c| c.is_ascii_alphanumeric() || c == '_');
                if !is_identifier(&name) {
                    return Err(syntax_error(text, offset, "expected field name after '.'"));
                }
                segments.push(PathSegment::Field(name));
            }
            '[' => {
                let segment = match chars.peek() {
                    Some((_, '"')) => {
                        chars.next();
                        PathSegment::Key(parse_quoted_key(text, offset, &mut chars)?)
                    }
                    Some((_, c)) if c.is_ascii_digit() => {
                        let digits = take_while(&mut chars, |c| c.is_ascii_digit());
                        let index = digits
                            .parse::<usize>()
                            .map_err(|_| syntax_error(text, offset, "index out of range"))?;
                        PathSegment::Index(index)
                    }
                    _ => {
                        return Err(syntax_error(
                            text,
                            offset,
                            "expected quoted key or index after '['",
                        ))
                    }
                };
                match chars.next() {
                    Some((_, ']')) => segments.push(segment),
                    _ => return Err(syntax_error(text, offset, "missing closing ']'")),
                }
            }
            _ => {
                return Err(syntax_error(
                    text,
                    offset,
                    &format!("unexpected character '{}'", ch),
                ))
            }
        }
    }

    Ok(Path::new(segments))
}

fn take_while(chars: &mut Peekable<CharIndices<'_>>, accept: impl Fn(char) -> bool) -> String {
    let mut out = String::new();
    while let Some((_, ch)) = chars.peek() {
        if !accept(*ch) {
            break;
        }
        out.push(*ch);
        chars.next();
    }
    out
}

fn parse_quoted_key(
    text: &str,
    offset: usize,
    chars: &mut Peekable<CharIndices<'_>>,
) -> Result<String, SchemaError> {
    let mut key = String::new();
    loop {
        match chars.next() {
            Some((_, '"')) => return Ok(key),
            Some((_, '\\')) => match chars.next() {
                Some((_, escaped)) => key.push(escaped),
                None => return Err(syntax_error(text, offset, "dangling escape in key")),
            },
            Some((_, ch)) => key.push(ch),
            None => return Err(syntax_error(text, offset, "unterminated key")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_path_reads_fields_keys_and_indices() {
        let path = parse_path(r#".items["3"].tags[0]"#).expect("path should parse");
        assert_eq!(
            path.segments,
            vec![
                PathSegment::Field("items".to_string()),
                PathSegment::Key("3".to_string()),
                PathSegment::Field("tags".to_string()),
                PathSegment::Index(0),
            ]
        );
    }

    #[test]
    fn rendering_reproduces_source_text() {
        for source in [
            ".title",
            r#".items["3"].title"#,
            ".list[12].name",
            r#".a["with \"quote\""].b"#,
            r#"["k"][4]"#,
        ] {
            let path = parse_path(source).expect("path should parse");
            assert_eq!(path.to_string(), source);
        }
    }

    #[test]
    fn parse_path_rejects_malformed_segments() {
        for source in ["", "title", ".", ".1abc", "[x]", "[\"open", "[3", ".a..b", ".a[\"k\"x]"] {
            let error = parse_path(source).expect_err("path should be rejected");
            assert_eq!(error.code, "PATH_SYNTAX", "source: {}", source);
        }
    }

    #[test]
    fn collection_access_flags_keys_and_indices_only() {
        assert!(PathSegment::Key("a".to_string()).is_collection_access());
        assert!(PathSegment::Index(1).is_collection_access());
        assert!(!PathSegment::Field("a".to_string()).is_collection_access());
    }
}
