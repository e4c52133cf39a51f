use serde::Serialize;

use sd_parser::ReferenceFlavor;
use sd_resolver::{Definition, Reference, Schema, SegmentAccess, ValueType};
use sd_usage::{UsageMode, UsageReport};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DefinitionLine {
    pub(crate) name: String,
    pub(crate) kind: &'static str,
    pub(crate) deprecated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) unknown_of: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) mode: Option<&'static str>,
    pub(crate) fields: Vec<String>,
}

impl DefinitionLine {
    pub(crate) fn new(
        schema: &Schema,
        definition: &Definition,
        report: Option<&UsageReport>,
    ) -> Self {
        let fields = match report {
            Some(report) => report
                .active_fields(definition)
                .into_iter()
                .map(|field| field.name.clone())
                .collect(),
            None => definition
                .fields()
                .iter()
                .map(|field| field.name.clone())
                .collect(),
        };
        Self {
            name: definition.name.clone(),
            kind: definition.kind.keyword(),
            deprecated: definition.deprecated,
            unknown_of: definition
                .unknown_of
                .map(|open| schema.get(open).name.clone()),
            mode: report.map(|report| mode_name(report.definition_mode(definition.id))),
            fields,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SegmentLine {
    pub(crate) segment: String,
    pub(crate) owner: String,
    pub(crate) access: &'static str,
    pub(crate) value_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReferenceLine {
    pub(crate) text: String,
    pub(crate) flavor: &'static str,
    pub(crate) target: String,
    pub(crate) value_type: String,
    pub(crate) segments: Vec<SegmentLine>,
}

impl ReferenceLine {
    pub(crate) fn new(schema: &Schema, reference: &Reference) -> Self {
        Self {
            text: reference.text().to_string(),
            flavor: flavor_name(reference.flavor()),
            target: schema.get(reference.target()).name.clone(),
            value_type: describe_value_type(schema, &reference.value_type()),
            segments: reference
                .segments()
                .iter()
                .map(|segment| SegmentLine {
                    segment: segment.segment.to_string(),
                    owner: schema.get(segment.owner).name.clone(),
                    access: access_name(segment.access),
                    value_type: describe_value_type(schema, &segment.value_type),
                })
                .collect(),
        }
    }
}

pub(crate) fn mode_name(mode: UsageMode) -> &'static str {
    match mode {
        UsageMode::Normal => "normal",
        UsageMode::CompatibilityOnly => "compatibilityOnly",
        UsageMode::Skip => "skip",
    }
}

fn flavor_name(flavor: ReferenceFlavor) -> &'static str {
    match flavor {
        ReferenceFlavor::Definition => "definition",
        ReferenceFlavor::DefinitionPath => "definitionPath",
        ReferenceFlavor::RelativePath => "relativePath",
        ReferenceFlavor::RelativeSelf => "relativeSelf",
    }
}

fn access_name(access: SegmentAccess) -> &'static str {
    match access {
        SegmentAccess::Field => "field",
        SegmentAccess::CollectionSearch => "collectionSearch",
        SegmentAccess::Key => "key",
        SegmentAccess::Index => "index",
    }
}

pub(crate) fn describe_value_type(schema: &Schema, value_type: &ValueType) -> String {
    match value_type {
        ValueType::Primitive(primitive) => primitive.as_str().to_string(),
        ValueType::Definition(id) => schema.get(*id).name.clone(),
        ValueType::List(inner) => format!("list<{}>", describe_value_type(schema, inner)),
        ValueType::Map(inner) => format!("map<{}>", describe_value_type(schema, inner)),
    }
}
