use crate::*;

/// Read-only lookup context handed to deferred cells while the schema resolves.
///
/// Every lookup fails with `STAGE_VIOLATION` outside the resolving stage.
pub struct Referencer<'a> {
    pub(crate) stage: &'a Cell<Stage>,
    pub(crate) definitions: &'a [Definition],
    pub(crate) index: &'a BTreeMap<String, DefId>,
    pub(crate) queue: &'a WorkQueue,
}

impl<'a> Referencer<'a> {
    fn check_stage(&self, operation: &str) -> Result<(), SchemaError> {
        let stage = self.stage.get();
        if stage != Stage::Resolving {
            return Err(SchemaError::new(
                "STAGE_VIOLATION",
                format!(
                    "Lookup \"{}\" used while the resolver is {:?}; lookups are only valid while resolving.",
                    operation, stage
                ),
            ));
        }
        Ok(())
    }

    pub fn definition(&self, name: &str) -> Result<&'a Definition, SchemaError> {
        self.check_stage("definition")?;
        lookup_definition(self.definitions, self.index, name)
    }

    pub fn get(&self, id: DefId) -> Result<&'a Definition, SchemaError> {
        self.check_stage("get")?;
        Ok(&self.definitions[id.0])
    }

    pub fn thing(&self, name: &str) -> Result<&'a Definition, SchemaError> {
        let definition = self.definition(name)?;
        match definition.kind {
            DefinitionKind::Thing(_) => Ok(definition),
            _ => Err(kind_mismatch(definition, "thing")),
        }
    }

    pub fn action(&self, name: &str) -> Result<&'a Definition, SchemaError> {
        let definition = self.definition(name)?;
        match definition.kind {
            DefinitionKind::Action(_) => Ok(definition),
            _ => Err(kind_mismatch(definition, "action")),
        }
    }

    pub fn auth(&self, name: &str) -> Result<&'a Definition, SchemaError> {
        let definition = self.definition(name)?;
        match definition.kind {
            DefinitionKind::Auth(_) => Ok(definition),
            _ => Err(kind_mismatch(definition, "auth")),
        }
    }

    pub fn remote(&self, name: &str) -> Result<&'a Definition, SchemaError> {
        let definition = self.definition(name)?;
        match definition.kind {
            DefinitionKind::Remote(_) => Ok(definition),
            _ => Err(kind_mismatch(definition, "remote")),
        }
    }

    pub fn interface(&self, name: &str) -> Result<&'a Definition, SchemaError> {
        let definition = self.definition(name)?;
        if definition.is_interface() {
            Ok(definition)
        } else {
            Err(kind_mismatch(definition, "interface"))
        }
    }

    /// Names of every action acting as a base: flagged ones and those named by remotes.
    pub fn base_action_names(&self) -> Result<BTreeSet<String>, SchemaError> {
        self.check_stage("base_action_names")?;
        Ok(base_action_names(self.definitions))
    }

    pub fn base_action(&self) -> Result<Option<DefId>, SchemaError> {
        self.check_stage("base_action")?;
        unique_base_action(self.definitions)
    }

    pub fn default_remote(&self) -> Result<Option<DefId>, SchemaError> {
        self.check_stage("default_remote")?;
        unique_default_remote(self.definitions)
    }

    pub fn default_auth(&self) -> Result<Option<DefId>, SchemaError> {
        self.check_stage("default_auth")?;
        unique_default_auth(self.definitions)
    }

    /// Every definition implementing `interface`, directly or through other interfaces.
    pub fn implementations_of(&self, interface: DefId) -> Result<BTreeSet<DefId>, SchemaError> {
        self.check_stage("implementations_of")?;
        transitive_implementations(self.definitions, interface, |syncable| {
            syncable.implements.force(self).cloned()
        })
    }

    /// Registers a new cell on the work queue.
    pub(crate) fn defer<T: 'static>(
        &self,
        label: impl Into<String>,
        thunk: impl FnOnce(&Referencer<'_>) -> Result<T, SchemaError> + 'static,
    ) -> Result<Deferred<T>, SchemaError> {
        self.check_stage("defer")?;
        Ok(self.queue.defer(label, thunk))
    }
}

pub(crate) fn lookup_definition<'a>(
    definitions: &'a [Definition],
    index: &BTreeMap<String, DefId>,
    name: &str,
) -> Result<&'a Definition, SchemaError> {
    match index.get(name) {
        Some(id) => Ok(&definitions[id.0]),
        None => Err(SchemaError::new(
            "DEFINITION_UNKNOWN",
            format!("Unknown definition \"{}\".", name),
        )
        .with_related([name])),
    }
}

pub(crate) fn kind_mismatch(definition: &Definition, expected: &str) -> SchemaError {
    SchemaError::with_span(
        "DEFINITION_KIND_MISMATCH",
        format!(
            "Definition \"{}\" is a {}, expected {}.",
            definition.name,
            definition.kind.keyword(),
            expected
        ),
        definition.location.clone(),
    )
    .with_related([definition.name.as_str()])
}

fn unique<'a>(
    candidates: Vec<&'a Definition>,
    code: &str,
    what: &str,
) -> Result<Option<DefId>, SchemaError> {
    match candidates.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some(only.id)),
        [first, ..] => {
            let names = candidates
                .iter()
                .map(|definition| format!("\"{}\" ({})", definition.name, definition.location))
                .collect::<Vec<_>>()
                .join(", ");
            Err(SchemaError::with_span(
                code,
                format!("Only one {} is allowed, found: {}.", what, names),
                first.location.clone(),
            )
            .with_related(candidates.iter().map(|definition| definition.name.as_str())))
        }
    }
}

pub(crate) fn base_action_names(definitions: &[Definition]) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for definition in definitions {
        match &definition.kind {
            DefinitionKind::Action(action) if action.is_base => {
                names.insert(definition.name.clone());
            }
            DefinitionKind::Remote(remote) => {
                if let Some(name) = &remote.base_action_name {
                    names.insert(name.clone());
                }
            }
            _ => {}
        }
    }
    names
}

pub(crate) fn unique_base_action(definitions: &[Definition]) -> Result<Option<DefId>, SchemaError> {
    let candidates = definitions
        .iter()
        .filter(|definition| match &definition.kind {
            DefinitionKind::Action(action) => action.is_base && !action.syncable.is_interface,
            _ => false,
        })
        .collect();
    unique(candidates, "MULTIPLE_BASE_ACTIONS", "base action")
}

pub(crate) fn unique_default_remote(
    definitions: &[Definition],
) -> Result<Option<DefId>, SchemaError> {
    let candidates = definitions
        .iter()
        .filter(|definition| {
            matches!(&definition.kind, DefinitionKind::Remote(remote) if remote.is_default)
        })
        .collect();
    unique(candidates, "MULTIPLE_DEFAULT_REMOTES", "default remote")
}

pub(crate) fn unique_default_auth(definitions: &[Definition]) -> Result<Option<DefId>, SchemaError> {
    let candidates = definitions
        .iter()
        .filter(|definition| {
            matches!(&definition.kind, DefinitionKind::Auth(auth) if auth.is_default)
        })
        .collect();
    unique(candidates, "MULTIPLE_DEFAULT_AUTHS", "default auth")
}

/// Walks `implements` edges backwards from `root`; the visited set keeps cyclic
/// interface graphs finite.
pub(crate) fn transitive_implementations(
    definitions: &[Definition],
    root: DefId,
    mut implements: impl FnMut(&Syncable) -> Result<Vec<DefId>, SchemaError>,
) -> Result<BTreeSet<DefId>, SchemaError> {
    let mut found = BTreeSet::new();
    let mut visited = BTreeSet::from([root]);
    let mut stack = vec![root];

    while let Some(current) = stack.pop() {
        for definition in definitions {
            let Some(syncable) = definition.syncable() else {
                continue;
            };
            if !implements(syncable)?.contains(&current) {
                continue;
            }
            if visited.insert(definition.id) {
                found.insert(definition.id);
                stack.push(definition.id);
            }
        }
    }

    Ok(found)
}
