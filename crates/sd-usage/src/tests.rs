use super::*;
use sd_core::{RawDefinition, RawDefinitionKind, RawFeature, RawField};
use sd_resolver::{resolve_schema, Schema};

fn schema(definitions: Vec<RawDefinition>) -> Schema {
    resolve_schema(&definitions).expect("schema should resolve")
}

fn store(text: &str) -> UsageStore {
    UsageStore::parse(text, "usage.txt").expect("usage file should parse")
}

fn id(schema: &Schema, name: &str) -> sd_resolver::DefId {
    schema.find(name).expect("definition should exist").id
}

fn liveness_schema(orphan_field_deprecated: bool) -> Schema {
    let mut orphan_field = RawField::single("orphan", "Orphan");
    orphan_field.deprecated = orphan_field_deprecated;
    schema(vec![
        RawDefinition::thing(
            "Root",
            vec![RawField::single("active", "Active"), orphan_field],
        ),
        RawDefinition::thing("Active", vec![RawField::single("name", "string")]),
        RawDefinition::thing("Orphan", vec![RawField::single("name", "string")]).deprecated(),
    ])
}

#[test]
fn deprecated_type_used_only_by_skipped_fields_is_compatibility_only() {
    let schema = liveness_schema(false);
    let store = store("thing Root\nthing Root.active\nthing Active\nthing Orphan\n");
    let mut calculator = UsageCalculator::new(&schema, &store);

    assert_eq!(calculator.definition_mode(id(&schema, "Active")), UsageMode::Normal);
    assert_eq!(
        calculator.definition_mode(id(&schema, "Orphan")),
        UsageMode::CompatibilityOnly
    );
}

#[test]
fn deprecated_type_missing_from_the_store_is_skipped() {
    let schema = liveness_schema(false);
    let store = store("thing Root\nthing Root.active\nthing Active\n");
    let mut calculator = UsageCalculator::new(&schema, &store);

    assert_eq!(calculator.definition_mode(id(&schema, "Active")), UsageMode::Normal);
    assert_eq!(calculator.definition_mode(id(&schema, "Orphan")), UsageMode::Skip);
}

#[test]
fn deprecated_type_with_a_live_user_stays_normal() {
    let schema = liveness_schema(false);
    let store = store("thing Root\nthing Root.active\nthing Root.orphan\nthing Active\nthing Orphan\n");
    let mut calculator = UsageCalculator::new(&schema, &store);
    assert_eq!(calculator.definition_mode(id(&schema, "Orphan")), UsageMode::Normal);

    let schema = liveness_schema(true);
    let mut calculator = UsageCalculator::new(&schema, &store);
    assert_eq!(
        calculator.definition_mode(id(&schema, "Orphan")),
        UsageMode::CompatibilityOnly
    );
}

#[test]
fn liveness_flows_through_deprecated_chains_and_interfaces() {
    let schema = schema(vec![
        RawDefinition::thing(
            "Root",
            vec![
                RawField::single("middle", "Middle"),
                RawField::list("shapes", "Shape"),
            ],
        ),
        RawDefinition::thing("Middle", vec![RawField::single("leaf", "Leaf")]).deprecated(),
        RawDefinition::thing("Leaf", Vec::new()).deprecated(),
        RawDefinition::interface("Shape", Vec::new()),
        RawDefinition::thing("Circle", Vec::new())
            .implementing(&["Shape"])
            .deprecated(),
    ]);
    let store = store(
        "thing Root\nthing Root.middle\nthing Root.shapes\nthing Middle\nthing Middle.leaf\nthing Leaf\nthing Shape\nthing Circle\n",
    );
    let mut calculator = UsageCalculator::new(&schema, &store);

    for name in ["Middle", "Leaf", "Circle", "Shape", "UnknownShape"] {
        assert_eq!(
            calculator.definition_mode(id(&schema, name)),
            UsageMode::Normal,
            "{}",
            name
        );
    }
}

#[test]
fn interface_fields_keep_deprecated_sub_interfaces_alive() {
    let schema = schema(vec![
        RawDefinition::thing("Root", vec![RawField::single("shape", "Base")]),
        RawDefinition::interface("Base", Vec::new()),
        RawDefinition::interface("Mid", Vec::new())
            .implementing(&["Base"])
            .deprecated(),
        RawDefinition::thing("Leaf", Vec::new()).implementing(&["Mid"]),
    ]);
    let store = store("thing Root\nthing Root.shape\nthing Base\nthing Mid\nthing Leaf\n");
    let mut calculator = UsageCalculator::new(&schema, &store);

    assert_eq!(calculator.definition_mode(id(&schema, "Leaf")), UsageMode::Normal);
    assert_eq!(calculator.definition_mode(id(&schema, "Mid")), UsageMode::Normal);
}

#[test]
fn a_type_does_not_keep_itself_alive() {
    let schema = schema(vec![
        RawDefinition::thing("Node", vec![RawField::single("next", "Node")]).deprecated(),
    ]);
    let store = store("thing Node\nthing Node.next\n");
    let mut calculator = UsageCalculator::new(&schema, &store);
    assert_eq!(
        calculator.definition_mode(id(&schema, "Node")),
        UsageMode::CompatibilityOnly
    );
}

#[test]
fn values_actions_and_untracked_kinds_follow_their_own_rules() {
    let schema = schema(vec![
        RawDefinition::value("Id", "string").deprecated(),
        RawDefinition::action("Old", Vec::new()).deprecated(),
        RawDefinition::action("Gone", Vec::new()).deprecated(),
        RawDefinition::action("Retired", Vec::new()),
        RawDefinition::new("Beta", RawDefinitionKind::Feature(RawFeature::default())),
    ]);
    let store = store("value Id\naction Old\n-action Retired\n");
    let mut calculator = UsageCalculator::new(&schema, &store);

    assert_eq!(calculator.definition_mode(id(&schema, "Id")), UsageMode::Normal);
    assert_eq!(
        calculator.definition_mode(id(&schema, "Old")),
        UsageMode::CompatibilityOnly
    );
    assert_eq!(calculator.definition_mode(id(&schema, "Gone")), UsageMode::Skip);
    assert_eq!(calculator.definition_mode(id(&schema, "Retired")), UsageMode::Skip);
    assert_eq!(calculator.definition_mode(id(&schema, "Beta")), UsageMode::Normal);
}

#[test]
fn aspects_follow_the_store_and_their_owner() {
    let mut color = RawDefinition::enumeration("Color", &["red", "green", "blue"]);
    if let RawDefinitionKind::Enum(values) = &mut color.kind {
        values.values[2].deprecated = true;
    }
    let schema = schema(vec![
        color,
        RawDefinition::thing("Gone", vec![RawField::single("name", "string")]),
    ]);
    let store = store(
        "enum Color\nenum Color.red\nenum Color.blue\n-enum Color.green\n-thing Gone\nthing Gone.name\n",
    );

    let mut calculator = UsageCalculator::new(&schema, &store);
    let color = schema.find("Color").expect("Color");
    let modes = Aspect::all_of(color)
        .into_iter()
        .map(|aspect| calculator.aspect_mode(aspect))
        .collect::<Vec<_>>();
    assert_eq!(
        modes,
        vec![
            UsageMode::Normal,
            UsageMode::Skip,
            UsageMode::CompatibilityOnly
        ]
    );

    let gone = schema.find("Gone").expect("Gone");
    assert_eq!(
        calculator.aspect_mode(Aspect::Field(gone.fields()[0].id)),
        UsageMode::Skip
    );
}

#[test]
fn run_usage_registers_new_items_and_excludes_skips() {
    let schema = liveness_schema(false);
    let mut store = UsageStore::empty("usage.txt");

    let report = run_usage(&schema, &mut store, &UsageOptions { include_new: true })
        .expect("usage run should succeed");

    let root = schema.find("Root").expect("Root");
    assert_eq!(report.definition_mode(root.id), UsageMode::Normal);
    assert_eq!(report.definition_mode(id(&schema, "Orphan")), UsageMode::Skip);
    assert!(store.included(&UsageKey::definition(UsageKeyword::Thing, "Root")));
    assert!(store.excluded(&UsageKey::definition(UsageKeyword::Thing, "Orphan")));
    assert_eq!(
        store
            .id(&UsageKey::aspect(UsageKeyword::Thing, "Root", "active"))
            .expect("active id"),
        1
    );
    assert_eq!(
        store
            .id(&UsageKey::aspect(UsageKeyword::Thing, "Root", "orphan"))
            .expect("orphan id"),
        2
    );

    let kept = report
        .remove_skips(schema.definitions())
        .into_iter()
        .map(|definition| definition.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(kept, vec!["Root", "Active"]);

    let fields = report
        .active_fields(root)
        .into_iter()
        .map(|field| field.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(fields, vec!["active", "orphan"]);
}

#[test]
fn run_usage_without_include_new_skips_everything_unseen() {
    let schema = schema(vec![
        RawDefinition::thing("Fresh", vec![RawField::single("name", "string")]),
        RawDefinition::enumeration("Color", &["red", "green"]),
    ]);
    let mut store = store("enum Color\nenum Color.red\n");

    let report = run_usage(&schema, &mut store, &UsageOptions::default())
        .expect("usage run should succeed");

    assert_eq!(report.definition_mode(id(&schema, "Fresh")), UsageMode::Skip);
    assert!(store.excluded(&UsageKey::definition(UsageKeyword::Thing, "Fresh")));
    assert!(store.excluded(&UsageKey::aspect(UsageKeyword::Thing, "Fresh", "name")));
    assert!(store.excluded(&UsageKey::aspect(UsageKeyword::Enum, "Color", "green")));

    let color = schema.find("Color").expect("Color");
    let values = report
        .active_enum_values(color)
        .into_iter()
        .map(|value| value.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(values, vec!["red"]);

    let rendered = store.render();
    assert!(rendered.contains("-thing Fresh\n"));
    assert!(!rendered.contains("-thing Fresh.name"));
}
