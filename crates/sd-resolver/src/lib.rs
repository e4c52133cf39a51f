use std::cell::{Cell, OnceCell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use sd_core::{
    RawAction, RawDefinition, RawDefinitionKind, RawDerivation, RawEndpoint, RawField,
    RawFieldType, RawSyncable, SchemaError, SourceSpan,
};
use sd_parser::{parse_reference, Path, PathSegment, ReferenceFlavor};
use tracing::{debug, info};

mod build;
mod deferred;
mod model;
mod reference;
mod referencer;
mod schema;
mod session;

pub use deferred::Deferred;
pub use model::{
    ActionDef, AuthDef, DefId, Definition, DefinitionKind, EnumDef, EnumValue, FeatureDef,
    Field, FieldFlags, FieldId, Implementation, Primitive, RemoteDef, SliceDef, Syncable,
    ValueDef, ValueType, VarietyDef,
};
pub use reference::{Reference, ResolvedDerivation, ResolvedSegment, SegmentAccess};
pub use referencer::Referencer;
pub use schema::Schema;
pub use session::{resolve_schema, SchemaResolver, Stage};

pub(crate) use deferred::{Force, WorkQueue};

/// Prefix of the catch-all implementation synthesized for open types.
pub const UNKNOWN_PREFIX: &str = "Unknown";

pub fn unknown_name(name: &str) -> String {
    format!("{}{}", UNKNOWN_PREFIX, name)
}
