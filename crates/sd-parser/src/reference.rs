use sd_core::SchemaError;

use crate::{is_identifier, parse_path, Path};

/// Surface form of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceFlavor {
    /// `Type`
    Definition,
    /// `Type.path`
    DefinitionPath,
    /// `.path`, relative to the enclosing definition.
    RelativePath,
    /// `.`, the enclosing definition itself.
    RelativeSelf,
}

impl ReferenceFlavor {
    pub fn is_relative(self) -> bool {
        matches!(self, Self::RelativePath | Self::RelativeSelf)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReference {
    pub flavor: ReferenceFlavor,
    pub definition: Option<String>,
    pub path: Option<Path>,
}

pub fn parse_reference(text: &str) -> Result<ParsedReference, SchemaError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(SchemaError::new(
            "REFERENCE_SYNTAX",
            "Reference text is empty.",
        ));
    }

    if text == "." {
        return Ok(ParsedReference {
            flavor: ReferenceFlavor::RelativeSelf,
            definition: None,
            path: None,
        });
    }

    if text.starts_with('.') {
        return Ok(ParsedReference {
            flavor: ReferenceFlavor::RelativePath,
            definition: None,
            path: Some(parse_path(text)?),
        });
    }

    let split = text.find(['.', '[']).unwrap_or(text.len());
    let (name, rest) = text.split_at(split);
    if !is_identifier(name) {
        return Err(SchemaError::new(
            "REFERENCE_SYNTAX",
            format!("Reference \"{}\" does not start with a definition name.", text),
        ));
    }

    if rest.is_empty() {
        return Ok(ParsedReference {
            flavor: ReferenceFlavor::Definition,
            definition: Some(name.to_string()),
            path: None,
        });
    }

    Ok(ParsedReference {
        flavor: ReferenceFlavor::DefinitionPath,
        definition: Some(name.to_string()),
        path: Some(parse_path(rest)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathSegment;

    #[test]
    fn flavours_follow_surface_syntax() {
        let plain = parse_reference("Item").expect("type reference");
        assert_eq!(plain.flavor, ReferenceFlavor::Definition);
        assert_eq!(plain.definition.as_deref(), Some("Item"));
        assert!(plain.path.is_none());

        let pathed = parse_reference("Item.tags[0]").expect("type path reference");
        assert_eq!(pathed.flavor, ReferenceFlavor::DefinitionPath);
        assert_eq!(
            pathed.path.expect("path").segments,
            vec![PathSegment::Field("tags".to_string()), PathSegment::Index(0)]
        );

        let relative = parse_reference(".title").expect("relative reference");
        assert_eq!(relative.flavor, ReferenceFlavor::RelativePath);
        assert!(relative.definition.is_none());
        assert!(relative.flavor.is_relative());

        let own = parse_reference(".").expect("self reference");
        assert_eq!(own.flavor, ReferenceFlavor::RelativeSelf);
        assert!(own.path.is_none());
    }

    #[test]
    fn key_segment_may_follow_definition_name_directly() {
        let parsed = parse_reference(r#"Config["k"]"#).expect("reference should parse");
        assert_eq!(parsed.flavor, ReferenceFlavor::DefinitionPath);
        assert_eq!(parsed.definition.as_deref(), Some("Config"));
    }

    #[test]
    fn malformed_references_are_rejected() {
        assert_eq!(
            parse_reference("  ").expect_err("empty").code,
            "REFERENCE_SYNTAX"
        );
        assert_eq!(
            parse_reference("9Lives").expect_err("bad name").code,
            "REFERENCE_SYNTAX"
        );
        assert_eq!(
            parse_reference("Item.").expect_err("dangling dot").code,
            "PATH_SYNTAX"
        );
    }
}
