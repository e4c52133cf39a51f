//! Typed references: `Type`, `Type.path`, `.path` and `.`.

use std::hash::{Hash, Hasher};

use crate::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentAccess {
    /// Plain field access on a record value.
    Field,
    /// "Does any element of this collection have this field", not an indexed access.
    CollectionSearch,
    Key,
    Index,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSegment {
    /// Nearest enclosing record type.
    pub owner: DefId,
    /// Position of the previous segment in the chain.
    pub previous: Option<usize>,
    pub segment: PathSegment,
    pub field: FieldId,
    pub value_type: ValueType,
    pub access: SegmentAccess,
}

#[derive(Debug, Clone)]
pub struct Reference {
    text: String,
    context: Option<String>,
    flavor: ReferenceFlavor,
    target: DefId,
    segments: Vec<ResolvedSegment>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedDerivation {
    FirstAvailable(Vec<Reference>),
    Reactive(Vec<Reference>),
    Remap { list: Reference, field: FieldId },
}

impl Reference {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn flavor(&self) -> ReferenceFlavor {
        self.flavor
    }

    pub fn target(&self) -> DefId {
        self.target
    }

    pub fn has_path(&self) -> bool {
        !self.segments.is_empty()
    }

    pub fn segments(&self) -> &[ResolvedSegment] {
        &self.segments
    }

    pub fn previous(&self, segment: &ResolvedSegment) -> Option<&ResolvedSegment> {
        segment.previous.map(|index| &self.segments[index])
    }

    /// Type of the value the reference points at.
    pub fn value_type(&self) -> ValueType {
        match self.segments.last() {
            Some(segment) => segment.value_type.clone(),
            None => ValueType::Definition(self.target),
        }
    }

    pub fn path(&self) -> Path {
        self.segments
            .iter()
            .map(|segment| segment.segment.clone())
            .collect()
    }

    /// Rewrites collection searches into separate references, one per
    /// collection hop: `Feed.items.title` becomes `Feed.items` and `Item.title`.
    pub fn split_collection_searches(&self, schema: &Schema) -> Result<Vec<Reference>, SchemaError> {
        if !self
            .segments
            .iter()
            .any(|segment| segment.access == SegmentAccess::CollectionSearch)
        {
            return Ok(vec![self.clone()]);
        }

        let mut out = Vec::new();
        let mut root = self.target;
        let mut start = 0;
        for (index, segment) in self.segments.iter().enumerate() {
            if segment.access != SegmentAccess::CollectionSearch {
                continue;
            }
            out.push(self.sub_reference(schema, root, start, index)?);
            root = segment.owner;
            start = index;
        }
        out.push(self.sub_reference(schema, root, start, self.segments.len())?);
        Ok(out)
    }

    fn sub_reference(
        &self,
        schema: &Schema,
        root: DefId,
        start: usize,
        end: usize,
    ) -> Result<Reference, SchemaError> {
        let path: Path = self.segments[start..end]
            .iter()
            .map(|segment| segment.segment.clone())
            .collect();
        let text = format!("{}{}", schema.get(root).name, path);
        schema.resolve_reference(&text, None)
    }

    /// Groups the path into runs separated by key and index segments; the
    /// key and index segments themselves are dropped.
    pub fn split_collections(&self) -> Vec<Vec<ResolvedSegment>> {
        let mut runs = Vec::new();
        let mut current = Vec::new();
        for segment in &self.segments {
            if segment.segment.is_collection_access() {
                if !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
                continue;
            }
            current.push(segment.clone());
        }
        if !current.is_empty() {
            runs.push(current);
        }
        runs
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        if self.text != other.text {
            return false;
        }
        if self.flavor.is_relative() || other.flavor.is_relative() {
            return self.context == other.context;
        }
        true
    }
}

impl Eq for Reference {}

impl Hash for Reference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
        if self.flavor.is_relative() {
            self.context.hash(state);
        }
    }
}

fn invalid_path(text: &str, segment: &PathSegment, detail: String, related: &[&str]) -> SchemaError {
    SchemaError::new(
        "PATH_INVALID",
        format!(
            "Invalid path in reference \"{}\" at segment \"{}\": {}.",
            text, segment, detail
        ),
    )
    .with_related(related.iter().copied())
}

impl Schema {
    /// Resolves `text` against the finished graph. `context` names the
    /// definition the reference was written in and is required for `.path` and `.`.
    pub fn resolve_reference(
        &self,
        text: &str,
        context: Option<&str>,
    ) -> Result<Reference, SchemaError> {
        let parsed = parse_reference(text)?;
        let root_name = match (&parsed.definition, context) {
            (Some(name), _) => name.as_str(),
            (None, Some(context)) => context,
            (None, None) => {
                return Err(SchemaError::new(
                    "REFERENCE_CONTEXT_MISSING",
                    format!(
                        "Relative reference \"{}\" needs an enclosing definition.",
                        text
                    ),
                ))
            }
        };

        let target = self.definition(root_name).map_err(|error| {
            SchemaError::new(
                error.code,
                format!("{} Used by reference \"{}\".", error.message, text),
            )
            .with_related(error.related)
            .with_related(context)
        })?;

        let segments = match &parsed.path {
            Some(path) => self.resolve_path(target, path, text)?,
            None => Vec::new(),
        };

        Ok(Reference {
            text: text.trim().to_string(),
            context: context.map(ToString::to_string),
            flavor: parsed.flavor,
            target: target.id,
            segments,
        })
    }

    fn resolve_path(
        &self,
        root: &Definition,
        path: &Path,
        text: &str,
    ) -> Result<Vec<ResolvedSegment>, SchemaError> {
        let mut out: Vec<ResolvedSegment> = Vec::new();

        for raw in &path.segments {
            let resolved = match out.last() {
                None => {
                    let PathSegment::Field(name) = raw else {
                        return Err(invalid_path(
                            text,
                            raw,
                            "a path must start with a field access".to_string(),
                            &[root.name.as_str()],
                        ));
                    };
                    let field = self.record_field(root, name, text, raw)?;
                    ResolvedSegment {
                        owner: field.id.owner,
                        previous: None,
                        segment: raw.clone(),
                        field: field.id,
                        value_type: field.value_type().clone(),
                        access: SegmentAccess::Field,
                    }
                }
                Some(previous) => {
                    let previous_index = out.len() - 1;
                    match raw {
                        PathSegment::Field(name) => {
                            self.field_step(previous, previous_index, raw, name, text)?
                        }
                        PathSegment::Key(_) | PathSegment::Index(_) => {
                            let element = match &previous.value_type {
                                ValueType::List(inner) | ValueType::Map(inner) => {
                                    inner.as_ref().clone()
                                }
                                _ => {
                                    return Err(invalid_path(
                                        text,
                                        raw,
                                        format!(
                                            "\"{}\" is not a collection",
                                            self.field(previous.field).name
                                        ),
                                        &[self.get(previous.owner).name.as_str()],
                                    ))
                                }
                            };
                            ResolvedSegment {
                                owner: previous.owner,
                                previous: Some(previous_index),
                                segment: raw.clone(),
                                field: previous.field,
                                value_type: element,
                                access: if matches!(raw, PathSegment::Key(_)) {
                                    SegmentAccess::Key
                                } else {
                                    SegmentAccess::Index
                                },
                            }
                        }
                    }
                }
            };
            out.push(resolved);
        }

        Ok(out)
    }

    fn field_step(
        &self,
        previous: &ResolvedSegment,
        previous_index: usize,
        raw: &PathSegment,
        name: &str,
        text: &str,
    ) -> Result<ResolvedSegment, SchemaError> {
        let (element, access) = match &previous.value_type {
            ValueType::Definition(id) => (*id, SegmentAccess::Field),
            ValueType::List(inner) | ValueType::Map(inner) => match inner.as_ref() {
                ValueType::Definition(id) if self.get(*id).is_open() => {
                    let open = self.get(*id);
                    return Err(invalid_path(
                        text,
                        raw,
                        format!(
                            "\"{}\" is a collection of open type \"{}\"; index into it before accessing fields",
                            self.field(previous.field).name,
                            open.name
                        ),
                        &[open.name.as_str(), self.get(previous.owner).name.as_str()],
                    ));
                }
                ValueType::Definition(id) => (*id, SegmentAccess::CollectionSearch),
                _ => {
                    return Err(invalid_path(
                        text,
                        raw,
                        format!(
                            "elements of \"{}\" are not records",
                            self.field(previous.field).name
                        ),
                        &[self.get(previous.owner).name.as_str()],
                    ))
                }
            },
            ValueType::Primitive(primitive) => {
                return Err(invalid_path(
                    text,
                    raw,
                    format!("{} values have no fields", primitive.as_str()),
                    &[self.get(previous.owner).name.as_str()],
                ))
            }
        };

        let field = self.record_field(self.get(element), name, text, raw)?;
        Ok(ResolvedSegment {
            owner: field.id.owner,
            previous: Some(previous_index),
            segment: raw.clone(),
            field: field.id,
            value_type: field.value_type().clone(),
            access,
        })
    }

    /// Field lookup on a record value; slices expose their interface's fields.
    fn record_field<'s>(
        &'s self,
        record: &'s Definition,
        name: &str,
        text: &str,
        raw: &PathSegment,
    ) -> Result<&'s Field, SchemaError> {
        let record = match &record.kind {
            DefinitionKind::Slice(slice) => self.get(slice.interface()),
            _ => record,
        };
        if record.syncable().is_none() {
            return Err(invalid_path(
                text,
                raw,
                format!("{} \"{}\" has no fields", record.kind.keyword(), record.name),
                &[record.name.as_str()],
            ));
        }
        record.field(name).ok_or_else(|| {
            invalid_path(
                text,
                raw,
                format!("\"{}\" has no field \"{}\"", record.name, name),
                &[record.name.as_str()],
            )
        })
    }
}
