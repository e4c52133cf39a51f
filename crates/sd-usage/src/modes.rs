//! Decides, per definition and per aspect, whether code generation emits it
//! fully, in a decode-only compatibility shape, or not at all.

use std::collections::{BTreeMap, BTreeSet};

use sd_resolver::{
    DefId, Definition, DefinitionKind, EnumValue, Field, FieldId, Implementation, Schema,
};
use tracing::{info, warn};

use crate::{UsageError, UsageKey, UsageKeyword, UsageStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UsageMode {
    Normal,
    /// Still needed to decode stored data, but no longer produced.
    CompatibilityOnly,
    Skip,
}

/// A part of a definition with its own usage entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Aspect {
    Field(FieldId),
    EnumValue { owner: DefId, index: usize },
}

impl Aspect {
    pub fn owner(self) -> DefId {
        match self {
            Self::Field(field) => field.owner,
            Self::EnumValue { owner, .. } => owner,
        }
    }

    /// Every aspect `definition` carries, fields first.
    pub fn all_of(definition: &Definition) -> Vec<Aspect> {
        let mut out = definition
            .fields()
            .iter()
            .map(|field| Aspect::Field(field.id))
            .collect::<Vec<_>>();
        if let Some(enumeration) = definition.as_enum() {
            out.extend((0..enumeration.values.len()).map(|index| Aspect::EnumValue {
                owner: definition.id,
                index,
            }));
        }
        out
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageOptions {
    /// Include every non-deprecated definition and aspect the store has not seen yet.
    pub include_new: bool,
}

pub fn keyword_of(kind: &DefinitionKind) -> Option<UsageKeyword> {
    match kind {
        DefinitionKind::Thing(_) | DefinitionKind::Variety(_) => Some(UsageKeyword::Thing),
        DefinitionKind::Action(_) => Some(UsageKeyword::Action),
        DefinitionKind::Value(_) => Some(UsageKeyword::Value),
        DefinitionKind::Enum(_) => Some(UsageKeyword::Enum),
        DefinitionKind::Feature(_)
        | DefinitionKind::Auth(_)
        | DefinitionKind::Remote(_)
        | DefinitionKind::Slice(_) => None,
    }
}

/// Usage entry of a tracked, declared definition.
pub fn definition_key(definition: &Definition) -> Option<UsageKey> {
    if definition.is_synthesized() {
        return None;
    }
    keyword_of(&definition.kind).map(|keyword| UsageKey::definition(keyword, &definition.name))
}

pub fn aspect_key(schema: &Schema, aspect: Aspect) -> Option<UsageKey> {
    let owner = schema.get(aspect.owner());
    let owner_key = definition_key(owner)?;
    let name = match aspect {
        Aspect::Field(field) => schema.field(field).name.clone(),
        Aspect::EnumValue { index, .. } => owner.as_enum()?.values.get(index)?.name.clone(),
    };
    Some(UsageKey::aspect(owner_key.keyword, owner_key.definition, name))
}

fn aspect_deprecated(schema: &Schema, aspect: Aspect) -> bool {
    match aspect {
        Aspect::Field(field) => schema.field(field).is_deprecated(),
        Aspect::EnumValue { owner, index } => schema
            .get(owner)
            .as_enum()
            .and_then(|enumeration| enumeration.values.get(index))
            .is_some_and(|value| value.deprecated),
    }
}

fn historical(included: bool, deprecated: bool) -> UsageMode {
    match (included, deprecated) {
        (false, _) => UsageMode::Skip,
        (true, true) => UsageMode::CompatibilityOnly,
        (true, false) => UsageMode::Normal,
    }
}

/// Lazily computes and memoizes usage modes over one schema and store.
pub struct UsageCalculator<'a> {
    schema: &'a Schema,
    store: &'a UsageStore,
    definitions: BTreeMap<DefId, UsageMode>,
    aspects: BTreeMap<Aspect, UsageMode>,
    live: Option<BTreeSet<DefId>>,
}

impl<'a> UsageCalculator<'a> {
    pub fn new(schema: &'a Schema, store: &'a UsageStore) -> Self {
        Self {
            schema,
            store,
            definitions: BTreeMap::new(),
            aspects: BTreeMap::new(),
            live: None,
        }
    }

    pub fn definition_mode(&mut self, id: DefId) -> UsageMode {
        if let Some(mode) = self.definitions.get(&id) {
            return *mode;
        }
        let schema = self.schema;
        let definition = schema.get(id);
        let mode = match definition.unknown_of {
            Some(open) => self.definition_mode(open),
            None => {
                let base = self.base_mode(id);
                let upgradable = base == UsageMode::CompatibilityOnly
                    && !matches!(definition.kind, DefinitionKind::Action(_));
                if upgradable && self.is_live(id) {
                    UsageMode::Normal
                } else {
                    base
                }
            }
        };
        self.definitions.insert(id, mode);
        mode
    }

    pub fn aspect_mode(&mut self, aspect: Aspect) -> UsageMode {
        if let Some(mode) = self.aspects.get(&aspect) {
            return *mode;
        }
        let mode = if self.definition_mode(aspect.owner()) == UsageMode::Skip {
            UsageMode::Skip
        } else {
            self.own_aspect_mode(aspect)
        };
        self.aspects.insert(aspect, mode);
        mode
    }

    /// Mode from the store alone, before deprecated records are checked for
    /// live users.
    fn base_mode(&self, id: DefId) -> UsageMode {
        let definition = self.schema.get(id);
        if let Some(open) = definition.unknown_of {
            return self.base_mode(open);
        }
        let Some(key) = definition_key(definition) else {
            return UsageMode::Normal;
        };
        if self.store.excluded(&key) {
            return UsageMode::Skip;
        }
        let included = self.store.included(&key);
        match definition.kind {
            DefinitionKind::Value(_) => historical(included, false),
            _ => historical(included, definition.deprecated),
        }
    }

    fn own_aspect_mode(&self, aspect: Aspect) -> UsageMode {
        let owner = self.schema.get(aspect.owner());
        if let (Some(open), Aspect::Field(field)) = (owner.unknown_of, aspect) {
            let name = &self.schema.field(field).name;
            return match self.schema.get(open).field(name) {
                Some(original) => self.own_aspect_mode(Aspect::Field(original.id)),
                None => self.base_mode(open),
            };
        }
        let Some(key) = aspect_key(self.schema, aspect) else {
            return UsageMode::Normal;
        };
        if self.store.excluded(&key) {
            return UsageMode::Skip;
        }
        historical(
            self.store.included(&key),
            aspect_deprecated(self.schema, aspect),
        )
    }

    fn is_live(&mut self, id: DefId) -> bool {
        if self.live.is_none() {
            self.live = Some(self.live_definitions());
        }
        self.live.as_ref().is_some_and(|live| live.contains(&id))
    }

    /// Definitions reachable from a non-deprecated, non-skipped definition
    /// through non-deprecated, non-skipped fields. A definition never keeps
    /// itself alive.
    fn live_definitions(&self) -> BTreeSet<DefId> {
        let mut visited = BTreeSet::new();
        let mut stack = Vec::new();
        for definition in self.schema.definitions() {
            if !definition.deprecated && self.base_mode(definition.id) != UsageMode::Skip {
                visited.insert(definition.id);
                stack.push(definition.id);
            }
        }

        while let Some(user) = stack.pop() {
            for field in self.schema.get(user).fields() {
                if field.is_deprecated()
                    || self.own_aspect_mode(Aspect::Field(field.id)) == UsageMode::Skip
                {
                    continue;
                }
                for used in self.field_targets(field) {
                    if used == user || self.base_mode(used) == UsageMode::Skip {
                        continue;
                    }
                    if visited.insert(used) {
                        stack.push(used);
                    }
                }
            }
        }

        visited
    }

    /// Every definition a value of `field` may hold: the element type and,
    /// for open types, each known implementation and the catch-all.
    fn field_targets(&self, field: &Field) -> Vec<DefId> {
        let Some(target) = field.value_type().definition() else {
            return Vec::new();
        };
        let mut out = BTreeSet::from([target]);
        out.extend(
            self.schema
                .implementations(target)
                .into_iter()
                .map(Implementation::id),
        );
        // Sub-interfaces are compatible too, not just the concrete leaves.
        if self.schema.get(target).is_interface() {
            out.extend(self.schema.implementations_of(target));
        }
        out.into_iter().collect()
    }
}

/// Includes every non-deprecated definition and aspect the store has never
/// seen. Returns how many entries were added.
pub fn register_new(schema: &Schema, store: &mut UsageStore) -> Result<usize, UsageError> {
    let mut added = 0;
    for definition in schema.definitions() {
        let Some(key) = definition_key(definition) else {
            continue;
        };
        if definition.deprecated || store.excluded(&key) {
            continue;
        }
        if store.include(key)? {
            added += 1;
        }
        for aspect in Aspect::all_of(definition) {
            let Some(key) = aspect_key(schema, aspect) else {
                continue;
            };
            if aspect_deprecated(schema, aspect) || store.excluded(&key) {
                continue;
            }
            if store.include(key)? {
                added += 1;
            }
        }
    }
    Ok(added)
}

/// Every mode of one run, detached from the calculator.
#[derive(Debug, Clone, Default)]
pub struct UsageReport {
    definitions: BTreeMap<DefId, UsageMode>,
    aspects: BTreeMap<Aspect, UsageMode>,
}

impl UsageReport {
    pub fn definition_mode(&self, id: DefId) -> UsageMode {
        self.definitions.get(&id).copied().unwrap_or(UsageMode::Skip)
    }

    pub fn aspect_mode(&self, aspect: Aspect) -> UsageMode {
        self.aspects.get(&aspect).copied().unwrap_or(UsageMode::Skip)
    }

    pub fn count(&self, mode: UsageMode) -> usize {
        self.definitions.values().filter(|found| **found == mode).count()
    }

    /// Drops skipped definitions, keeping input order.
    pub fn remove_skips<'s>(&self, definitions: &'s [Definition]) -> Vec<&'s Definition> {
        definitions
            .iter()
            .filter(|definition| self.definition_mode(definition.id) != UsageMode::Skip)
            .collect()
    }

    pub fn active_fields<'s>(&self, definition: &'s Definition) -> Vec<&'s Field> {
        definition
            .fields()
            .iter()
            .filter(|field| self.aspect_mode(Aspect::Field(field.id)) != UsageMode::Skip)
            .collect()
    }

    pub fn active_enum_values<'s>(&self, definition: &'s Definition) -> Vec<&'s EnumValue> {
        let Some(enumeration) = definition.as_enum() else {
            return Vec::new();
        };
        enumeration
            .values
            .iter()
            .enumerate()
            .filter(|(index, _)| {
                self.aspect_mode(Aspect::EnumValue {
                    owner: definition.id,
                    index: *index,
                }) != UsageMode::Skip
            })
            .map(|(_, value)| value)
            .collect()
    }
}

/// Computes every mode and records each skipped, never-seen item as excluded.
pub fn run_usage(
    schema: &Schema,
    store: &mut UsageStore,
    options: &UsageOptions,
) -> Result<UsageReport, UsageError> {
    if options.include_new {
        let added = register_new(schema, store)?;
        info!(added, "registered new usage entries");
    }

    for key in store.keys() {
        if schema.find(&key.definition).is_none() {
            warn!(entry = %key, "usage entry names a definition missing from the schema");
        }
    }

    let mut report = UsageReport::default();
    let mut skipped = Vec::new();
    {
        let mut calculator = UsageCalculator::new(schema, store);
        for definition in schema.definitions() {
            let mode = calculator.definition_mode(definition.id);
            report.definitions.insert(definition.id, mode);
            if mode == UsageMode::Skip {
                skipped.extend(definition_key(definition));
            }
            for aspect in Aspect::all_of(definition) {
                let mode = calculator.aspect_mode(aspect);
                report.aspects.insert(aspect, mode);
                if mode == UsageMode::Skip {
                    skipped.extend(aspect_key(schema, aspect));
                }
            }
        }
    }

    let mut excluded = 0;
    for key in skipped {
        if store.included(&key) || store.excluded(&key) {
            continue;
        }
        if store.exclude(key)? {
            excluded += 1;
        }
    }

    info!(
        normal = report.count(UsageMode::Normal),
        compatibility_only = report.count(UsageMode::CompatibilityOnly),
        skip = report.count(UsageMode::Skip),
        excluded,
        "usage modes computed"
    );
    Ok(report)
}
