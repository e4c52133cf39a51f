//! Stage one: one typed definition per raw definition, with every
//! cross-reference registered as a deferred cell on the work queue.

use crate::*;

pub(crate) struct DefinitionBuilder<'q> {
    queue: &'q WorkQueue,
    pub(crate) definitions: Vec<Definition>,
    pub(crate) index: BTreeMap<String, DefId>,
}

impl<'q> DefinitionBuilder<'q> {
    pub(crate) fn new(queue: &'q WorkQueue) -> Self {
        Self {
            queue,
            definitions: Vec::new(),
            index: BTreeMap::new(),
        }
    }

    fn next_id(&self) -> DefId {
        DefId(self.definitions.len())
    }

    fn register(&mut self, definition: Definition) -> Result<(), SchemaError> {
        if let Some(existing) = self.index.get(&definition.name) {
            let existing = &self.definitions[existing.0];
            return Err(SchemaError::with_span(
                "DEFINITION_DUPLICATE",
                format!(
                    "Duplicate definition \"{}\": declared as {} at {} and as {} at {}.",
                    definition.name,
                    existing.kind.keyword(),
                    existing.location,
                    definition.kind.keyword(),
                    definition.location
                ),
                definition.location.clone(),
            )
            .with_related([definition.name.as_str()]));
        }

        self.index.insert(definition.name.clone(), definition.id);
        self.definitions.push(definition);
        Ok(())
    }

    pub(crate) fn add(&mut self, raw: &RawDefinition) -> Result<(), SchemaError> {
        let id = self.next_id();
        match &raw.kind {
            RawDefinitionKind::Thing(syncable) => {
                let unknown = syncable.is_interface.then_some(DefId(id.0 + 1));
                let built = self.syncable(id, raw, syncable, unknown)?;
                self.register(shell(raw, id, DefinitionKind::Thing(built)))?;
                if let Some(unknown) = unknown {
                    self.synthesize_unknown_syncable(raw, id, unknown)?;
                }
            }
            RawDefinitionKind::Action(action) => {
                let unknown = action.syncable.is_interface.then_some(DefId(id.0 + 1));
                let built = self.action(id, raw, action, unknown)?;
                self.register(shell(raw, id, DefinitionKind::Action(built)))?;
                if let Some(unknown) = unknown {
                    self.synthesize_unknown_syncable(raw, id, unknown)?;
                }
            }
            RawDefinitionKind::Value(value) => {
                let Some(primitive) = Primitive::from_name(&value.primitive) else {
                    return Err(SchemaError::with_span(
                        "VALUE_PRIMITIVE_INVALID",
                        format!(
                            "Value \"{}\" wraps unknown primitive \"{}\".",
                            raw.name, value.primitive
                        ),
                        raw.location.clone(),
                    )
                    .with_related([raw.name.as_str()]));
                };
                self.register(shell(raw, id, DefinitionKind::Value(ValueDef { primitive })))?;
            }
            RawDefinitionKind::Enum(raw_enum) => {
                let mut seen = BTreeSet::new();
                let mut values = Vec::new();
                for value in &raw_enum.values {
                    for name in std::iter::once(&value.name).chain(&value.aliases) {
                        if !seen.insert(name.clone()) {
                            return Err(SchemaError::with_span(
                                "ENUM_VALUE_DUPLICATE",
                                format!("Duplicate value \"{}\" in enum \"{}\".", name, raw.name),
                                value.location.clone(),
                            )
                            .with_related([raw.name.as_str()]));
                        }
                    }
                    values.push(EnumValue {
                        name: value.name.clone(),
                        aliases: value.aliases.clone(),
                        deprecated: value.deprecated,
                        description: value.description.clone(),
                        location: value.location.clone(),
                    });
                }
                self.register(shell(raw, id, DefinitionKind::Enum(EnumDef { values })))?;
            }
            RawDefinitionKind::Feature(feature) => {
                self.register(shell(
                    raw,
                    id,
                    DefinitionKind::Feature(FeatureDef {
                        enabled_by_default: feature.enabled_by_default,
                    }),
                ))?;
            }
            RawDefinitionKind::Auth(auth) => {
                self.register(shell(
                    raw,
                    id,
                    DefinitionKind::Auth(AuthDef {
                        is_default: auth.is_default,
                    }),
                ))?;
            }
            RawDefinitionKind::Remote(remote) => {
                let owner = raw.name.clone();
                let location = raw.location.clone();
                let name = remote.base_action.clone();
                let base_action = self.queue.defer(
                    format!("{}.baseAction", raw.name),
                    move |referencer| {
                        let Some(name) = &name else {
                            return Ok(None);
                        };
                        let action = referencer
                            .action(name)
                            .map_err(|error| referenced_from(error, &owner, &location))?;
                        if action.is_interface() {
                            return Err(SchemaError::with_span(
                                "BASE_ACTION_INVALID",
                                format!(
                                    "Remote \"{}\" names interface \"{}\" as its base action.",
                                    owner, action.name
                                ),
                                location.clone(),
                            )
                            .with_related([owner.as_str(), action.name.as_str()]));
                        }
                        Ok(Some(action.id))
                    },
                );
                self.register(shell(
                    raw,
                    id,
                    DefinitionKind::Remote(RemoteDef {
                        is_default: remote.is_default,
                        base_action_name: remote.base_action.clone(),
                        base_action,
                    }),
                ))?;
            }
            RawDefinitionKind::Variety(variety) => {
                let unknown = DefId(id.0 + 1);
                let owner = raw.name.clone();
                let location = raw.location.clone();
                let names = variety.options.clone();
                let options = self.queue.defer(format!("{}.options", raw.name), move |referencer| {
                    let mut seen = BTreeSet::new();
                    let mut options = Vec::new();
                    for name in &names {
                        if !seen.insert(name.as_str()) {
                            return Err(SchemaError::with_span(
                                "VARIETY_OPTION_DUPLICATE",
                                format!("Variety \"{}\" lists \"{}\" twice.", owner, name),
                                location.clone(),
                            )
                            .with_related([owner.as_str(), name.as_str()]));
                        }
                        let option = referencer
                            .thing(name)
                            .map_err(|error| referenced_from(error, &owner, &location))?;
                        if option.is_interface() {
                            return Err(SchemaError::with_span(
                                "VARIETY_OPTION_INVALID",
                                format!(
                                    "Variety \"{}\" cannot list interface \"{}\" as an option.",
                                    owner, name
                                ),
                                location.clone(),
                            )
                            .with_related([owner.as_str(), name.as_str()]));
                        }
                        options.push(Implementation::Known(option.id));
                    }
                    options.push(Implementation::Unknown(unknown));
                    Ok(options)
                });
                self.register(shell(
                    raw,
                    id,
                    DefinitionKind::Variety(VarietyDef { unknown, options }),
                ))?;
                self.synthesize_unknown_syncable(raw, id, unknown)?;
            }
            RawDefinitionKind::Slice(slice) => {
                let owner = raw.name.clone();
                let location = raw.location.clone();
                let interface_name = slice.interface.clone();
                let interface = {
                    let owner = owner.clone();
                    let location = location.clone();
                    self.queue.defer(format!("{}.interface", raw.name), move |referencer| {
                        referencer
                            .interface(&interface_name)
                            .map(|definition| definition.id)
                            .map_err(|error| referenced_from(error, &owner, &location))
                    })
                };
                let interface_cell = interface.clone();
                let names = slice.members.clone();
                let members = self.queue.defer(format!("{}.members", raw.name), move |referencer| {
                    let interface = *interface_cell.force(referencer)?;
                    let implementations = referencer.implementations_of(interface)?;
                    let mut members = Vec::new();
                    for name in &names {
                        let member = referencer
                            .definition(name)
                            .map_err(|error| referenced_from(error, &owner, &location))?;
                        if !implementations.contains(&member.id) {
                            let interface_name = &referencer.get(interface)?.name;
                            return Err(SchemaError::with_span(
                                "SLICE_MEMBER_INVALID",
                                format!(
                                    "Slice \"{}\" lists \"{}\", which does not implement \"{}\".",
                                    owner, name, interface_name
                                ),
                                location.clone(),
                            )
                            .with_related([
                                owner.as_str(),
                                name.as_str(),
                                interface_name.as_str(),
                            ]));
                        }
                        members.push(member.id);
                    }
                    Ok(members)
                });
                self.register(shell(
                    raw,
                    id,
                    DefinitionKind::Slice(SliceDef { interface, members }),
                ))?;
            }
        }
        Ok(())
    }

    /// Registers `Unknown<Name>` for the interface or variety `raw`.
    fn synthesize_unknown_syncable(
        &mut self,
        raw: &RawDefinition,
        open: DefId,
        unknown: DefId,
    ) -> Result<(), SchemaError> {
        let name = unknown_name(&raw.name);
        let kind = match &raw.kind {
            RawDefinitionKind::Thing(syncable) => {
                let copy = RawSyncable {
                    is_interface: false,
                    implements: vec![raw.name.clone()],
                    ..syncable.clone()
                };
                let stand_in = RawDefinition {
                    name: name.clone(),
                    ..raw.clone()
                };
                DefinitionKind::Thing(self.syncable(unknown, &stand_in, &copy, None)?)
            }
            RawDefinitionKind::Action(action) => {
                let copy = RawAction {
                    syncable: RawSyncable {
                        is_interface: false,
                        implements: vec![raw.name.clone()],
                        ..action.syncable.clone()
                    },
                    base: false,
                };
                let stand_in = RawDefinition {
                    name: name.clone(),
                    ..raw.clone()
                };
                DefinitionKind::Action(self.action(unknown, &stand_in, &copy, None)?)
            }
            _ => {
                let stand_in = RawDefinition {
                    name: name.clone(),
                    ..raw.clone()
                };
                DefinitionKind::Thing(self.syncable(
                    unknown,
                    &stand_in,
                    &RawSyncable::default(),
                    None,
                )?)
            }
        };

        debug!(open = %raw.name, unknown = %name, "synthesized catch-all implementation");
        self.register(Definition {
            id: unknown,
            name,
            deprecated: raw.deprecated,
            description: None,
            location: raw.location.clone(),
            unknown_of: Some(open),
            kind,
        })
    }

    fn action(
        &self,
        id: DefId,
        raw: &RawDefinition,
        action: &RawAction,
        unknown: Option<DefId>,
    ) -> Result<ActionDef, SchemaError> {
        let syncable = self.syncable(id, raw, &action.syncable, unknown)?;
        let label = format!("{}.base", raw.name);
        let base = if action.base {
            Deferred::ready(label, None)
        } else {
            let remote_cell = syncable.remote.clone();
            let name = raw.name.clone();
            self.queue.defer(label, move |referencer| {
                // An action some remote uses as its base has no base of its own.
                if referencer.base_action_names()?.contains(&name) {
                    return Ok(None);
                }
                if let Some(remote) = *remote_cell.force(referencer)? {
                    if let DefinitionKind::Remote(remote) = &referencer.get(remote)?.kind {
                        if let Some(base) = *remote.base_action.force(referencer)? {
                            return Ok((base != id).then_some(base));
                        }
                    }
                }
                Ok(referencer.base_action()?.filter(|base| *base != id))
            })
        };

        Ok(ActionDef {
            syncable,
            is_base: action.base,
            base,
        })
    }

    fn syncable(
        &self,
        id: DefId,
        raw: &RawDefinition,
        syncable: &RawSyncable,
        unknown: Option<DefId>,
    ) -> Result<Syncable, SchemaError> {
        let family = raw.kind.keyword();

        let auth = {
            let owner = raw.name.clone();
            let location = raw.location.clone();
            let name = syncable.auth.clone();
            self.queue.defer(format!("{}.auth", raw.name), move |referencer| match &name {
                Some(name) => referencer
                    .auth(name)
                    .map(|auth| Some(auth.id))
                    .map_err(|error| referenced_from(error, &owner, &location)),
                None => referencer.default_auth(),
            })
        };

        let remote = {
            let owner = raw.name.clone();
            let location = raw.location.clone();
            let name = syncable.remote.clone();
            self.queue.defer(format!("{}.remote", raw.name), move |referencer| match &name {
                Some(name) => referencer
                    .remote(name)
                    .map(|remote| Some(remote.id))
                    .map_err(|error| referenced_from(error, &owner, &location)),
                None => referencer.default_remote(),
            })
        };

        let implements = {
            let owner = raw.name.clone();
            let location = raw.location.clone();
            let names = syncable.implements.clone();
            self.queue.defer(format!("{}.implements", raw.name), move |referencer| {
                let mut ids = Vec::new();
                for name in &names {
                    let interface = referencer
                        .interface(name)
                        .map_err(|error| referenced_from(error, &owner, &location))?;
                    if interface.id == id || interface.kind.keyword() != family {
                        return Err(SchemaError::with_span(
                            "INTERFACE_INVALID",
                            format!(
                                "{} \"{}\" cannot implement {} interface \"{}\".",
                                family,
                                owner,
                                interface.kind.keyword(),
                                interface.name
                            ),
                            location.clone(),
                        )
                        .with_related([owner.as_str(), interface.name.as_str()]));
                    }
                    if !ids.contains(&interface.id) {
                        ids.push(interface.id);
                    }
                }
                Ok(ids)
            })
        };

        let mut seen = BTreeSet::new();
        let mut fields = Vec::new();
        for (index, field) in syncable.fields.iter().enumerate() {
            for name in std::iter::once(&field.name).chain(&field.aliases) {
                if !seen.insert(name.clone()) {
                    return Err(SchemaError::with_span(
                        "FIELD_DUPLICATE",
                        format!("Duplicate field \"{}\" in \"{}\".", name, raw.name),
                        field.location.clone(),
                    )
                    .with_related([raw.name.as_str()]));
                }
            }
            fields.push(self.field(FieldId { owner: id, index }, &raw.name, field));
        }

        Ok(Syncable {
            is_interface: syncable.is_interface,
            endpoint: syncable.endpoint.clone(),
            fields,
            unknown,
            auth,
            remote,
            implements,
        })
    }

    fn field(&self, id: FieldId, owner: &str, raw: &RawField) -> Field {
        let label = format!("{}.{}", owner, raw.name);
        let field_type = raw.field_type.clone();
        let derivations = raw.derivations.clone();
        let location = raw.location.clone();
        let cell_label = label.clone();
        let value_type = self.queue.defer(label, move |referencer| {
            let value_type = resolve_field_type(referencer, &field_type, &cell_label, &location)?;
            for derivation in &derivations {
                for text in derivation.reference_texts() {
                    defer_derivation_check(referencer, &cell_label, text, &location)?;
                }
            }
            Ok(value_type)
        });

        Field {
            id,
            name: raw.name.clone(),
            aliases: raw.aliases.clone(),
            flags: FieldFlags {
                identifying: raw.identifying,
                contributes_to_hash: raw.contributes_to_hash,
                deprecated: raw.deprecated,
                local_only: raw.local_only,
                is_root_field: raw.is_root_field,
            },
            derivations: raw.derivations.clone(),
            description: raw.description.clone(),
            location: raw.location.clone(),
            value_type,
        }
    }
}

fn shell(raw: &RawDefinition, id: DefId, kind: DefinitionKind) -> Definition {
    Definition {
        id,
        name: raw.name.clone(),
        deprecated: raw.deprecated,
        description: raw.description.clone(),
        location: raw.location.clone(),
        unknown_of: None,
        kind,
    }
}

fn referenced_from(error: SchemaError, owner: &str, location: &SourceSpan) -> SchemaError {
    let mut error = error.with_related([owner]);
    error.message = format!("{} Referenced from \"{}\" at {}.", error.message, owner, location);
    if error.span.is_none() {
        error.span = Some(location.clone());
    }
    error
}

fn resolve_field_type(
    referencer: &Referencer<'_>,
    field_type: &RawFieldType,
    label: &str,
    location: &SourceSpan,
) -> Result<ValueType, SchemaError> {
    let name = field_type.inner();
    let inner = match Primitive::from_name(name) {
        Some(primitive) => ValueType::Primitive(primitive),
        None => {
            let definition = referencer
                .definition(name)
                .map_err(|error| referenced_from(error, label, location))?;
            match definition.kind {
                DefinitionKind::Thing(_)
                | DefinitionKind::Value(_)
                | DefinitionKind::Enum(_)
                | DefinitionKind::Variety(_)
                | DefinitionKind::Slice(_) => ValueType::Definition(definition.id),
                _ => {
                    return Err(SchemaError::with_span(
                        "FIELD_TYPE_INVALID",
                        format!(
                            "Field \"{}\" cannot hold {} \"{}\".",
                            label,
                            definition.kind.keyword(),
                            definition.name
                        ),
                        location.clone(),
                    )
                    .with_related([definition.name.as_str()]))
                }
            }
        }
    };

    Ok(match field_type {
        RawFieldType::Single(_) => inner,
        RawFieldType::List(_) => ValueType::List(Box::new(inner)),
        RawFieldType::Map(_) => ValueType::Map(Box::new(inner)),
    })
}

/// Queues an existence check for the definition a derivation names.
fn defer_derivation_check(
    referencer: &Referencer<'_>,
    label: &str,
    text: &str,
    location: &SourceSpan,
) -> Result<(), SchemaError> {
    let parsed = parse_reference(text).map_err(|error| referenced_from(error, label, location))?;
    let Some(name) = parsed.definition else {
        return Ok(());
    };

    let label = label.to_string();
    let location = location.clone();
    referencer.defer(format!("{} -> {}", label, text), move |referencer| {
        referencer
            .definition(&name)
            .map(|_| ())
            .map_err(|error| referenced_from(error, &label, &location))
    })?;
    Ok(())
}
