use crate::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DefId(pub(crate) usize);

impl DefId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldId {
    pub owner: DefId,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Primitive {
    String,
    Int,
    Long,
    Float,
    Double,
    Bool,
    Timestamp,
    Bytes,
}

impl Primitive {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "string" => Self::String,
            "int" => Self::Int,
            "long" => Self::Long,
            "float" => Self::Float,
            "double" => Self::Double,
            "bool" => Self::Bool,
            "timestamp" => Self::Timestamp,
            "bytes" => Self::Bytes,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Bool => "bool",
            Self::Timestamp => "timestamp",
            Self::Bytes => "bytes",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Primitive(Primitive),
    Definition(DefId),
    List(Box<ValueType>),
    Map(Box<ValueType>),
}

impl ValueType {
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::List(_) | Self::Map(_))
    }

    /// The element type of a collection, or the type itself.
    pub fn element(&self) -> &ValueType {
        match self {
            Self::List(inner) | Self::Map(inner) => inner.element(),
            other => other,
        }
    }

    pub fn definition(&self) -> Option<DefId> {
        match self.element() {
            Self::Definition(id) => Some(*id),
            _ => None,
        }
    }
}

/// One implementation of an open type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Implementation {
    Known(DefId),
    /// The synthesized catch-all for implementations this schema does not declare.
    Unknown(DefId),
}

impl Implementation {
    pub fn id(self) -> DefId {
        match self {
            Self::Known(id) | Self::Unknown(id) => id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldFlags {
    pub identifying: bool,
    pub contributes_to_hash: bool,
    pub deprecated: bool,
    pub local_only: bool,
    pub is_root_field: bool,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub id: FieldId,
    pub name: String,
    pub aliases: Vec<String>,
    pub flags: FieldFlags,
    pub derivations: Vec<RawDerivation>,
    pub description: Option<String>,
    pub location: SourceSpan,
    pub(crate) value_type: Deferred<ValueType>,
}

impl Field {
    pub fn value_type(&self) -> &ValueType {
        self.value_type.get()
    }

    pub fn is_deprecated(&self) -> bool {
        self.flags.deprecated
    }

    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|alias| alias == name)
    }
}

#[derive(Debug, Clone)]
pub struct Syncable {
    pub is_interface: bool,
    pub endpoint: Option<RawEndpoint>,
    pub fields: Vec<Field>,
    /// Catch-all implementation, present on interfaces only.
    pub unknown: Option<DefId>,
    pub(crate) auth: Deferred<Option<DefId>>,
    pub(crate) remote: Deferred<Option<DefId>>,
    pub(crate) implements: Deferred<Vec<DefId>>,
}

impl Syncable {
    pub fn auth(&self) -> Option<DefId> {
        *self.auth.get()
    }

    pub fn remote(&self) -> Option<DefId> {
        *self.remote.get()
    }

    pub fn implements(&self) -> &[DefId] {
        self.implements.get()
    }
}

#[derive(Debug, Clone)]
pub struct ActionDef {
    pub syncable: Syncable,
    pub is_base: bool,
    pub(crate) base: Deferred<Option<DefId>>,
}

impl ActionDef {
    /// The envelope action this action extends.
    pub fn base(&self) -> Option<DefId> {
        *self.base.get()
    }
}

#[derive(Debug, Clone)]
pub struct ValueDef {
    pub primitive: Primitive,
}

#[derive(Debug, Clone)]
pub struct EnumValue {
    pub name: String,
    pub aliases: Vec<String>,
    pub deprecated: bool,
    pub description: Option<String>,
    pub location: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct EnumDef {
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone)]
pub struct FeatureDef {
    pub enabled_by_default: bool,
}

#[derive(Debug, Clone)]
pub struct AuthDef {
    pub is_default: bool,
}

#[derive(Debug, Clone)]
pub struct RemoteDef {
    pub is_default: bool,
    pub(crate) base_action_name: Option<String>,
    pub(crate) base_action: Deferred<Option<DefId>>,
}

impl RemoteDef {
    pub fn base_action(&self) -> Option<DefId> {
        *self.base_action.get()
    }
}

#[derive(Debug, Clone)]
pub struct VarietyDef {
    pub unknown: DefId,
    pub(crate) options: Deferred<Vec<Implementation>>,
}

impl VarietyDef {
    /// Declared options followed by the catch-all.
    pub fn options(&self) -> &[Implementation] {
        self.options.get()
    }
}

#[derive(Debug, Clone)]
pub struct SliceDef {
    pub(crate) interface: Deferred<DefId>,
    pub(crate) members: Deferred<Vec<DefId>>,
}

impl SliceDef {
    pub fn interface(&self) -> DefId {
        *self.interface.get()
    }

    pub fn members(&self) -> &[DefId] {
        self.members.get()
    }
}

#[derive(Debug, Clone)]
pub enum DefinitionKind {
    Thing(Syncable),
    Action(ActionDef),
    Value(ValueDef),
    Enum(EnumDef),
    Feature(FeatureDef),
    Auth(AuthDef),
    Remote(RemoteDef),
    Variety(VarietyDef),
    Slice(SliceDef),
}

impl DefinitionKind {
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
}

#[derive(Debug, Clone)]
pub struct Definition {
    pub id: DefId,
    pub name: String,
    pub deprecated: bool,
    pub description: Option<String>,
    pub location: SourceSpan,
    /// Set on synthesized catch-all implementations.
    pub unknown_of: Option<DefId>,
    pub kind: DefinitionKind,
}

impl Definition {
    pub fn syncable(&self) -> Option<&Syncable> {
        match &self.kind {
            DefinitionKind::Thing(syncable) => Some(syncable),
            DefinitionKind::Action(action) => Some(&action.syncable),
            _ => None,
        }
    }

    pub fn as_action(&self) -> Option<&ActionDef> {
        match &self.kind {
            DefinitionKind::Action(action) => Some(action),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumDef> {
        match &self.kind {
            DefinitionKind::Enum(def) => Some(def),
            _ => None,
        }
    }

    pub fn is_interface(&self) -> bool {
        self.syncable().is_some_and(|syncable| syncable.is_interface)
    }

    /// Interfaces, varieties and slices admit implementations this schema does not know.
    pub fn is_open(&self) -> bool {
        self.is_interface()
            || matches!(
                self.kind,
                DefinitionKind::Variety(_) | DefinitionKind::Slice(_)
            )
    }

    pub fn is_synthesized(&self) -> bool {
        self.unknown_of.is_some()
    }

    pub fn fields(&self) -> &[Field] {
        match self.syncable() {
            Some(syncable) => &syncable.fields,
            None => &[],
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields().iter().find(|field| field.answers_to(name))
    }

    /// The catch-all implementation synthesized for this open type.
    pub fn unknown_implementation(&self) -> Option<DefId> {
        match &self.kind {
            DefinitionKind::Variety(variety) => Some(variety.unknown),
            _ => self.syncable().and_then(|syncable| syncable.unknown),
        }
    }
}
