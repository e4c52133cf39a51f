use crate::referencer::{
    base_action_names, lookup_definition, transitive_implementations, unique_base_action,
    unique_default_auth, unique_default_remote,
};
use crate::*;

/// The resolved, immutable definition graph.
#[derive(Debug)]
pub struct Schema {
    definitions: Vec<Definition>,
    index: BTreeMap<String, DefId>,
}

impl Schema {
    pub(crate) fn new(definitions: Vec<Definition>, index: BTreeMap<String, DefId>) -> Self {
        Self { definitions, index }
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Definitions in creation order; synthesized ones follow their open type.
    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    pub fn get(&self, id: DefId) -> &Definition {
        &self.definitions[id.0]
    }

    pub fn find(&self, name: &str) -> Option<&Definition> {
        self.index.get(name).map(|id| self.get(*id))
    }

    pub fn definition(&self, name: &str) -> Result<&Definition, SchemaError> {
        lookup_definition(&self.definitions, &self.index, name)
    }

    pub fn field(&self, id: FieldId) -> &Field {
        &self.get(id.owner).fields()[id.index]
    }

    pub fn base_action(&self) -> Option<DefId> {
        unique_base_action(&self.definitions)
            .expect("base action uniqueness is checked when resolution completes")
    }

    /// Flagged base actions plus every action a remote names as its base.
    pub fn base_action_names(&self) -> BTreeSet<String> {
        base_action_names(&self.definitions)
    }

    pub fn default_auth(&self) -> Option<DefId> {
        unique_default_auth(&self.definitions)
            .expect("default auth uniqueness is checked when resolution completes")
    }

    pub fn default_remote(&self) -> Option<DefId> {
        unique_default_remote(&self.definitions)
            .expect("default remote uniqueness is checked when resolution completes")
    }

    pub fn implementations_of(&self, interface: DefId) -> BTreeSet<DefId> {
        transitive_implementations(&self.definitions, interface, |syncable| {
            Ok(syncable.implements().to_vec())
        })
        .expect("implements cells are resolved")
    }

    /// Every implementation a value of `open` may hold, the catch-all last.
    ///
    /// Empty for definitions that are not open.
    pub fn implementations(&self, open: DefId) -> Vec<Implementation> {
        let definition = self.get(open);
        match &definition.kind {
            DefinitionKind::Variety(variety) => variety.options().to_vec(),
            DefinitionKind::Slice(slice) => {
                let mut out = slice
                    .members()
                    .iter()
                    .map(|member| Implementation::Known(*member))
                    .collect::<Vec<_>>();
                if let Some(unknown) = self.get(slice.interface()).unknown_implementation() {
                    out.push(Implementation::Unknown(unknown));
                }
                out
            }
            _ if definition.is_interface() => {
                let mut out = Vec::new();
                let mut unknowns = Vec::new();
                for id in self.implementations_of(open) {
                    let implementation = self.get(id);
                    if implementation.is_interface() {
                        continue;
                    }
                    if implementation.is_synthesized() {
                        unknowns.push(Implementation::Unknown(id));
                    } else {
                        out.push(Implementation::Known(id));
                    }
                }
                out.extend(unknowns);
                out
            }
            _ => Vec::new(),
        }
    }

    /// Resolves the derivation rules of one field against the finished graph.
    pub fn derivations(&self, field: FieldId) -> Result<Vec<ResolvedDerivation>, SchemaError> {
        let owner = self.get(field.owner);
        let field = self.field(field);
        let mut out = Vec::new();
        for derivation in &field.derivations {
            let resolved = match derivation {
                RawDerivation::FirstAvailable { refs } => {
                    ResolvedDerivation::FirstAvailable(self.resolve_all(refs, &owner.name)?)
                }
                RawDerivation::Reactive { refs } => {
                    ResolvedDerivation::Reactive(self.resolve_all(refs, &owner.name)?)
                }
                RawDerivation::Remap { list, field: name } => {
                    let list = self.resolve_reference(list, Some(&owner.name))?;
                    let list_type = list.value_type();
                    let target = match list_type.element() {
                        ValueType::Definition(id) if list_type.is_collection() => {
                            self.get(*id).field(name).map(|found| found.id)
                        }
                        _ => None,
                    };
                    let Some(target) = target else {
                        return Err(SchemaError::with_span(
                            "REMAP_INVALID",
                            format!(
                                "Field \"{}.{}\" remaps \"{}\" from \"{}\", which is not a collection of records carrying that field.",
                                owner.name, field.name, name, list
                            ),
                            field.location.clone(),
                        )
                        .with_related([owner.name.as_str()]));
                    };
                    ResolvedDerivation::Remap { list, field: target }
                }
            };
            out.push(resolved);
        }
        Ok(out)
    }

    fn resolve_all(&self, refs: &[String], context: &str) -> Result<Vec<Reference>, SchemaError> {
        refs.iter()
            .map(|text| self.resolve_reference(text, Some(context)))
            .collect()
    }

    pub(crate) fn validate_derivations(&self) -> Result<(), SchemaError> {
        for definition in &self.definitions {
            if definition.is_synthesized() {
                continue;
            }
            for field in definition.fields() {
                self.derivations(field.id).map_err(|mut error| {
                    if error.span.is_none() {
                        error.span = Some(field.location.clone());
                    }
                    error.with_related([definition.name.as_str()])
                })?;
            }
        }
        Ok(())
    }
}
