//! Unresolved definitions as handed over by the schema text parser.
//!
//! Every cross-definition reference in this module is still a bare name.

use serde::{Deserialize, Serialize};

use crate::types::SourceSpan;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDefinition {
    pub name: String,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: SourceSpan,
    #[serde(flatten)]
    pub kind: RawDefinitionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RawDefinitionKind {
    Thing(RawSyncable),
    Action(RawAction),
    Value(RawValue),
    Enum(RawEnum),
    Feature(RawFeature),
    Auth(RawAuth),
    Remote(RawRemote),
    Variety(RawVariety),
    Slice(RawSlice),
}

impl RawDefinitionKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Thing(_) => "thing",
            Self::Action(_) => "action",
            Self::Value(_) => "value",
            Self::Enum(_) => "enum",
            Self::Feature(_) => "feature",
            Self::Auth(_) => "auth",
            Self::Remote(_) => "remote",
            Self::Variety(_) => "variety",
            Self::Slice(_) => "slice",
        }
    }

    pub fn syncable_mut(&mut self) -> Option<&mut RawSyncable> {
        match self {
            Self::Thing(syncable) => Some(syncable),
            Self::Action(action) => Some(&mut action.syncable),
            _ => None,
        }
    }
}

/// The part shared by things and actions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSyncable {
    /// `None` means the default auth mode.
    #[serde(default)]
    pub auth: Option<String>,
    /// `None` means the default remote, if one exists.
    #[serde(default)]
    pub remote: Option<String>,
    #[serde(default)]
    pub endpoint: Option<RawEndpoint>,
    #[serde(default)]
    pub implements: Vec<String>,
    #[serde(default)]
    pub is_interface: bool,
    #[serde(default)]
    pub fields: Vec<RawField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEndpoint {
    pub method: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAction {
    #[serde(flatten)]
    pub syncable: RawSyncable,
    #[serde(default)]
    pub base: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawValue {
    pub primitive: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEnum {
    #[serde(default)]
    pub values: Vec<RawEnumValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEnumValue {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: SourceSpan,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFeature {
    #[serde(default)]
    pub enabled_by_default: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAuth {
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRemote {
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub base_action: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawVariety {
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSlice {
    pub interface: String,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawField {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub field_type: RawFieldType,
    #[serde(default)]
    pub identifying: bool,
    #[serde(default)]
    pub contributes_to_hash: bool,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub local_only: bool,
    #[serde(default)]
    pub is_root_field: bool,
    #[serde(default)]
    pub derivations: Vec<RawDerivation>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RawFieldType {
    Single(String),
    List(String),
    Map(String),
}

impl RawFieldType {
    pub fn inner(&self) -> &str {
        match self {
            Self::Single(name) | Self::List(name) | Self::Map(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RawDerivation {
    FirstAvailable { refs: Vec<String> },
    Reactive { refs: Vec<String> },
    Remap { list: String, field: String },
}

impl RawDerivation {
    /// Every reference text mentioned by this rule, in declaration order.
    pub fn reference_texts(&self) -> Vec<&str> {
        match self {
            Self::FirstAvailable { refs } | Self::Reactive { refs } => {
                refs.iter().map(String::as_str).collect()
            }
            Self::Remap { list, .. } => vec![list.as_str()],
        }
    }
}

impl RawDefinition {
    pub fn new(name: impl Into<String>, kind: RawDefinitionKind) -> Self {
        Self {
            name: name.into(),
            deprecated: false,
            description: None,
            location: SourceSpan::synthetic(),
            kind,
        }
    }

    pub fn thing(name: impl Into<String>, fields: Vec<RawField>) -> Self {
        Self::new(
            name,
            RawDefinitionKind::Thing(RawSyncable {
                fields,
                ..RawSyncable::default()
            }),
        )
    }

    pub fn interface(name: impl Into<String>, fields: Vec<RawField>) -> Self {
        Self::new(
            name,
            RawDefinitionKind::Thing(RawSyncable {
                fields,
                is_interface: true,
                ..RawSyncable::default()
            }),
        )
    }

    pub fn action(name: impl Into<String>, fields: Vec<RawField>) -> Self {
        Self::new(
            name,
            RawDefinitionKind::Action(RawAction {
                syncable: RawSyncable {
                    fields,
                    ..RawSyncable::default()
                },
                base: false,
            }),
        )
    }

    pub fn value(name: impl Into<String>, primitive: impl Into<String>) -> Self {
        Self::new(
            name,
            RawDefinitionKind::Value(RawValue {
                primitive: primitive.into(),
            }),
        )
    }

    pub fn enumeration(name: impl Into<String>, values: &[&str]) -> Self {
        Self::new(
            name,
            RawDefinitionKind::Enum(RawEnum {
                values: values
                    .iter()
                    .map(|value| RawEnumValue {
                        name: (*value).to_string(),
                        aliases: Vec::new(),
                        deprecated: false,
                        description: None,
                        location: SourceSpan::synthetic(),
                    })
                    .collect(),
            }),
        )
    }

    pub fn variety(name: impl Into<String>, options: &[&str]) -> Self {
        Self::new(
            name,
            RawDefinitionKind::Variety(RawVariety {
                options: options.iter().map(|option| (*option).to_string()).collect(),
            }),
        )
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    pub fn located(mut self, location: SourceSpan) -> Self {
        self.location = location;
        self
    }

    /// Marks a thing or action as implementing the named interfaces.
    pub fn implementing(mut self, interfaces: &[&str]) -> Self {
        if let Some(syncable) = self.kind.syncable_mut() {
            syncable
                .implements
                .extend(interfaces.iter().map(|name| (*name).to_string()));
        }
        self
    }
}

impl RawField {
    pub fn new(name: impl Into<String>, field_type: RawFieldType) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            field_type,
            identifying: false,
            contributes_to_hash: false,
            deprecated: false,
            local_only: false,
            is_root_field: false,
            derivations: Vec::new(),
            description: None,
            location: SourceSpan::synthetic(),
        }
    }

    pub fn single(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name, RawFieldType::Single(type_name.into()))
    }

    pub fn list(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name, RawFieldType::List(type_name.into()))
    }

    pub fn map(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name, RawFieldType::Map(type_name.into()))
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    pub fn derived(mut self, derivation: RawDerivation) -> Self {
        self.derivations.push(derivation);
        self
    }
}

#[cfg(test)]
mod raw_tests {
    use super::*;

    #[test]
    fn raw_definition_json_uses_kind_tag_and_defaults() {
        let parsed: RawDefinition = serde_json::from_str(
            r#"{
                "kind": "action",
                "name": "Save",
                "base": true,
                "remote": "v3",
                "fields": [
                    { "name": "id", "fieldType": { "single": "string" }, "identifying": true }
                ]
            }"#,
        )
        .expect("action should deserialize");

        assert_eq!(parsed.name, "Save");
        assert!(!parsed.deprecated);
        let RawDefinitionKind::Action(action) = &parsed.kind else {
            panic!("expected action kind");
        };
        assert!(action.base);
        assert_eq!(action.syncable.remote.as_deref(), Some("v3"));
        assert!(action.syncable.fields[0].identifying);
        assert_eq!(action.syncable.fields[0].field_type.inner(), "string");
    }

    #[test]
    fn derivation_reference_texts_follow_declaration_order() {
        let reactive = RawDerivation::Reactive {
            refs: vec![".a".to_string(), "Other.b".to_string()],
        };
        assert_eq!(reactive.reference_texts(), vec![".a", "Other.b"]);

        let remap = RawDerivation::Remap {
            list: ".items".to_string(),
            field: "title".to_string(),
        };
        assert_eq!(remap.reference_texts(), vec![".items"]);
    }

    #[test]
    fn builders_attach_interfaces_only_to_syncables() {
        let mut thing = RawDefinition::thing("Item", Vec::new()).implementing(&["Node"]);
        assert_eq!(
            thing.kind.syncable_mut().map(|syncable| syncable.implements.clone()),
            Some(vec!["Node".to_string()])
        );

        let mut value = RawDefinition::value("Url", "string").implementing(&["Node"]);
        assert!(value.kind.syncable_mut().is_none());
        assert_eq!(value.kind.keyword(), "value");
    }
}
