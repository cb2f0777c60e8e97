//! Integration tests for databind.
//!
//! These tests exercise the public API from outside the crate: data sources
//! driving bound components, conditions, collection expansion, symbol
//! propagation and project round-trips.

use std::cell::Cell;
use std::rc::Rc;

use databind::condition::ConditionProps;
use databind::{
    ComponentDef, ComponentId, DataRecord, DataSourceDef, Editor, EditorError, EventKind, LogicalOperator,
    ResolverError, SymbolOverride, Topic,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn variable(path: &str) -> Value {
    json!({ "type": "data-variable", "path": path })
}

fn item_variable(collection: &str, variable_type: &str, path: Option<&str>) -> Value {
    let mut value = json!({
        "type": "data-collection-variable",
        "variableType": variable_type,
        "collectionId": collection,
    });
    if let Some(path) = path {
        value["path"] = json!(path);
    }
    value
}

fn prop(ed: &Editor, id: ComponentId, key: &str) -> Value {
    ed.component(id).unwrap().prop(key).cloned().unwrap_or(Value::Null)
}

fn attribute(ed: &Editor, id: ComponentId, key: &str) -> Value {
    ed.component(id).unwrap().attribute(key).cloned().unwrap_or(Value::Null)
}

fn people() -> DataSourceDef {
    DataSourceDef::new("people").with_records([
        DataRecord::new("p0").with_field("name", "Ada"),
        DataRecord::new("p1").with_field("name", "Ben"),
        DataRecord::new("p2").with_field("name", "Cleo"),
        DataRecord::new("p3").with_field("name", "Dev"),
        DataRecord::new("p4").with_field("name", "Eve"),
    ])
}

fn people_collection(start: Option<i64>, end: Option<i64>) -> Value {
    let mut config = json!({ "collectionId": "people", "dataSource": variable("people") });
    if let Some(start) = start {
        config["startIndex"] = json!(start);
    }
    if let Some(end) = end {
        config["endIndex"] = json!(end);
    }
    json!({
        "type": "data-collection",
        "collectionDef": {
            "collectionConfig": config,
            "componentDef": {
                "type": "card",
                "name": item_variable("people", "currentItem", Some("name")),
                "position": item_variable("people", "currentIndex", None),
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Data variables
// ---------------------------------------------------------------------------

#[test]
fn example_scenario_attribute_follows_record() {
    let mut ed = Editor::new();
    ed.add_data_source(DataSourceDef::new("ds").with_record(DataRecord::new("r1").with_field("value", "A")));
    let id = ed
        .append_json(
            ed.wrapper(),
            json!({
                "tagName": "div",
                "attributes": {
                    "title": { "type": "data-variable", "path": "ds.r1.value", "defaultValue": "X" }
                }
            }),
        )
        .unwrap();
    assert_eq!(attribute(&ed, id, "title"), json!("A"));

    ed.record_mut("ds", "r1").unwrap().set("value", "B").unwrap();
    assert_eq!(attribute(&ed, id, "title"), json!("B"));
    assert_eq!(ed.children(ed.wrapper()), &[id]);

    insta::assert_json_snapshot!(ed.to_json(id), @r#"
    {
      "tagName": "div",
      "attributes": {
        "title": {
          "type": "data-variable",
          "path": "ds.r1.value",
          "defaultValue": "X"
        }
      }
    }
    "#);
}

#[test]
fn successive_writes_are_never_stale() {
    let mut ed = Editor::new();
    ed.add_data_source(DataSourceDef::new("ds").with_record(DataRecord::new("r").with_field("n", 0)));
    let id = ed
        .add_component(ComponentDef::new("counter").with_prop("count", variable("ds.r.n")))
        .unwrap();

    for n in 1..=20 {
        ed.set_record_value("ds", "r", "n", json!(n)).unwrap();
        assert_eq!(prop(&ed, id, "count"), json!(n));
    }
    for n in [7, -3, 100] {
        ed.set_value("ds.r.n", n).unwrap();
        assert_eq!(prop(&ed, id, "count"), json!(n));
    }
}

#[test]
fn nested_fields_and_late_sources() {
    let mut ed = Editor::new();
    let id = ed
        .add_component(
            ComponentDef::new("text")
                .with_prop("city", json!({ "type": "data-variable", "path": "ds.r.address.city", "defaultValue": "?" })),
        )
        .unwrap();
    assert_eq!(prop(&ed, id, "city"), json!("?"));

    ed.add_data_source(
        DataSourceDef::new("ds").with_record(DataRecord::new("r").with_field("address", json!({ "city": "Oslo" }))),
    );
    assert_eq!(prop(&ed, id, "city"), json!("Oslo"));

    ed.set_value("ds.r.address.city", "Rome").unwrap();
    assert_eq!(prop(&ed, id, "city"), json!("Rome"));

    ed.remove_data_source("ds");
    assert_eq!(prop(&ed, id, "city"), json!("?"));
}

#[test]
fn immutable_records_refuse_removal() {
    let mut ed = Editor::new();
    ed.add_data_source(DataSourceDef::new("ds").with_record(DataRecord::new("locked").with_mutable(false)));
    assert!(ed.remove_record("ds", "locked").is_err());
    assert!(ed.remove_record_dangerously("ds", "locked").is_ok());
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

#[test]
fn condition_branches_follow_their_sources() {
    let mut ed = Editor::new();
    ed.add_data_source(
        DataSourceDef::new("flags").with_record(DataRecord::new("f").with_field("count", 3).with_field("on", "yes")),
    );
    ed.add_data_source(DataSourceDef::new("labels").with_record(DataRecord::new("l").with_field("off", "no")));
    let id = ed
        .add_component(ComponentDef::new("badge").with_prop(
            "label",
            json!({
                "type": "data-condition",
                "condition": { "left": variable("flags.f.count"), "operator": ">", "right": 5 },
                "ifTrue": variable("flags.f.on"),
                "ifFalse": variable("labels.l.off"),
            }),
        ))
        .unwrap();
    assert_eq!(prop(&ed, id, "label"), json!("no"));

    ed.set_value("labels.l.off", "nope").unwrap();
    assert_eq!(prop(&ed, id, "label"), json!("nope"));

    ed.set_value("flags.f.count", 9).unwrap();
    assert_eq!(prop(&ed, id, "label"), json!("yes"));

    ed.set_value("flags.f.on", "yes!").unwrap();
    assert_eq!(prop(&ed, id, "label"), json!("yes!"));
}

#[test]
fn missing_condition_fails_construction() {
    let mut ed = Editor::new();
    let result = ed.add_component(
        ComponentDef::new("badge").with_prop("label", json!({ "type": "data-condition", "ifTrue": "a" })),
    );
    assert!(matches!(result, Err(EditorError::Resolver(ResolverError::MissingCondition))));
    assert!(ed.children(ed.wrapper()).is_empty());
}

#[test]
fn logic_groups() {
    let mut ed = Editor::new();
    ed.add_data_source(DataSourceDef::new("ds").with_record(DataRecord::new("r").with_field("n", 10)));
    let store = ed.data_sources();
    let big = || ConditionProps::expression(variable("ds.r.n"), ">", 5);
    let small = || ConditionProps::expression(variable("ds.r.n"), "<", 5);
    let eval = |op, statements| ConditionProps::group(op, statements).evaluate(store).unwrap();

    assert!(eval(LogicalOperator::And, vec![big(), ConditionProps::Boolean(true)]));
    assert!(!eval(LogicalOperator::And, vec![big(), small(), ConditionProps::Boolean(true)]));
    assert!(eval(LogicalOperator::Or, vec![small(), big()]));
    assert!(!eval(LogicalOperator::Or, vec![small(), ConditionProps::Boolean(false)]));
    assert!(eval(LogicalOperator::Xor, vec![small(), big(), ConditionProps::Boolean(false)]));
    assert!(!eval(LogicalOperator::Xor, vec![big(), ConditionProps::Boolean(true)]));
    assert!(!eval(
        LogicalOperator::Xor,
        vec![big(), ConditionProps::Boolean(true), ConditionProps::Boolean(true)]
    ));
    assert!(eval(
        LogicalOperator::And,
        vec![
            ConditionProps::group(LogicalOperator::Or, vec![small(), big()]),
            ConditionProps::group(LogicalOperator::Xor, vec![small(), big()]),
        ]
    ));
}

#[test]
fn conditional_components_swap_children() {
    let mut ed = Editor::new();
    ed.add_data_source(DataSourceDef::new("ds").with_record(DataRecord::new("r").with_field("admin", true)));
    let id = ed
        .append_json(
            ed.wrapper(),
            json!({
                "type": "data-condition",
                "condition": { "left": variable("ds.r.admin"), "operator": "isTrue" },
                "ifTrue": { "type": "panel", "label": "admin" },
                "ifFalse": "guest",
            }),
        )
        .unwrap();
    let child = ed.children(id)[0];
    assert_eq!(ed.component(child).unwrap().component_type(), "panel");

    ed.set_value("ds.r.admin", false).unwrap();
    let child = ed.children(id)[0];
    assert_eq!(ed.component(child).unwrap().component_type(), "textnode");
    assert_eq!(prop(&ed, child, "content"), json!("guest"));

    // Only the definition is saved.
    let saved = ed.to_json(id);
    assert_eq!(saved.get("components"), None);
    assert_eq!(saved["ifFalse"], json!("guest"));
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

#[test]
fn collection_range_selects_records() {
    let mut ed = Editor::new();
    ed.add_data_source(people());
    let id = ed.append_json(ed.wrapper(), people_collection(Some(1), Some(2))).unwrap();
    let items = ed.children(id).to_vec();
    assert_eq!(items.len(), 2);
    assert_eq!(prop(&ed, items[0], "name"), json!("Ben"));
    assert_eq!(prop(&ed, items[1], "name"), json!("Cleo"));
    assert_eq!(prop(&ed, items[0], "position"), json!(1));

    let state = &ed.collection_state_map(items[1]).unwrap()["people"];
    assert_eq!((state.start_index, state.end_index, state.total_items), (1, 2, 2));
    assert_eq!(state.remaining_items, 0);
}

#[test]
fn record_removal_and_addition_reconcile() {
    let mut ed = Editor::new();
    ed.add_data_source(people());
    let id = ed.append_json(ed.wrapper(), people_collection(None, None)).unwrap();
    let before = ed.children(id).to_vec();
    assert_eq!(before.len(), 5);

    ed.remove_record("people", "p1").unwrap();
    let after = ed.children(id).to_vec();
    assert_eq!(after, vec![before[0], before[2], before[3], before[4]]);
    let positions: Vec<Value> = after.iter().map(|&c| prop(&ed, c, "position")).collect();
    assert_eq!(positions, vec![json!(0), json!(1), json!(2), json!(3)]);
    assert_eq!(prop(&ed, after[1], "name"), json!("Cleo"));

    ed.add_record("people", DataRecord::new("p5").with_field("name", "Fay")).unwrap();
    let grown = ed.children(id).to_vec();
    assert_eq!(grown[..4], after[..]);
    assert_eq!(prop(&ed, grown[4], "name"), json!("Fay"));

    // Field writes update items in place.
    ed.set_value("people.p5.name", "Faye").unwrap();
    assert_eq!(ed.children(id), &grown[..]);
    assert_eq!(prop(&ed, grown[4], "name"), json!("Faye"));
}

#[test]
fn children_added_inside_items_see_collection_state() {
    let mut ed = Editor::new();
    ed.add_data_source(people());
    let id = ed.append_json(ed.wrapper(), people_collection(Some(0), Some(1))).unwrap();
    let second = ed.children(id)[1];
    let label = ed
        .append(
            second,
            ComponentDef::new("label").with_prop("text", item_variable("people", "currentItem", Some("name"))),
        )
        .unwrap();
    assert_eq!(prop(&ed, label, "text"), json!("Ben"));

    // The addition reached the other item too.
    let first = ed.children(id)[0];
    let copy = ed.children(first)[0];
    assert_eq!(prop(&ed, copy, "text"), json!("Ada"));
}

#[test]
fn nested_collections() {
    let mut ed = Editor::new();
    ed.add_data_source(DataSourceDef::new("users").with_records([
        DataRecord::new("u1").with_field("pets", json!(["cat", "dog"])),
        DataRecord::new("u2").with_field("pets", json!(["fish"])),
    ]));
    let pets = json!({
        "type": "data-collection",
        "collectionDef": {
            "collectionConfig": {
                "collectionId": "pets",
                "dataSource": item_variable("users", "currentItem", Some("pets")),
            },
            "componentDef": {
                "type": "pet",
                "name": item_variable("pets", "currentItem", None),
                "owner": item_variable("users", "currentIndex", None),
            }
        }
    });
    let users = json!({
        "type": "data-collection",
        "collectionDef": {
            "collectionConfig": { "collectionId": "users", "dataSource": "users" },
            "componentDef": { "type": "user", "components": [pets] }
        }
    });
    let id = ed.append_json(ed.wrapper(), users).unwrap();

    let pet_names = |ed: &Editor, user: usize| -> Vec<Value> {
        let user = ed.children(id)[user];
        let list = ed.children(user)[0];
        ed.children(list).iter().map(|&p| prop(ed, p, "name")).collect()
    };
    assert_eq!(pet_names(&ed, 0), vec![json!("cat"), json!("dog")]);
    assert_eq!(pet_names(&ed, 1), vec![json!("fish")]);

    ed.set_record_value("users", "u1", "pets", json!(["cat", "dog", "bird"])).unwrap();
    assert_eq!(pet_names(&ed, 0), vec![json!("cat"), json!("dog"), json!("bird")]);

    ed.remove_record("users", "u1").unwrap();
    assert_eq!(ed.children(id).len(), 1);
    let user = ed.children(id)[0];
    let fish = ed.children(ed.children(user)[0])[0];
    assert_eq!(prop(&ed, fish, "name"), json!("fish"));
    assert_eq!(prop(&ed, fish, "owner"), json!(0));
}

#[test]
fn collection_id_collision_is_logged() {
    let mut ed = Editor::new();
    let inner = json!({
        "type": "data-collection",
        "collectionDef": {
            "collectionConfig": { "collectionId": "list", "dataSource": [1, 2] },
            "componentDef": { "type": "leaf" }
        }
    });
    let outer = json!({
        "type": "data-collection",
        "collectionDef": {
            "collectionConfig": { "collectionId": "list", "dataSource": ["a"] },
            "componentDef": { "type": "branch", "components": [inner] }
        }
    });
    let id = ed.append_json(ed.wrapper(), outer).unwrap();
    let branch = ed.children(id)[0];
    assert!(ed.children(ed.children(branch)[0]).is_empty());
    assert!(ed.error_log().contains("already exists in the parent collection state"));
}

#[test]
fn unknown_collection_variables_render_empty() {
    let mut ed = Editor::new();
    let id = ed
        .add_component(ComponentDef::new("text").with_prop("value", item_variable("missing", "currentIndex", None)))
        .unwrap();
    assert_eq!(prop(&ed, id, "value"), json!(""));
    assert!(!ed.logged_errors().is_empty());
}

// ---------------------------------------------------------------------------
// Symbols
// ---------------------------------------------------------------------------

#[test]
fn collection_items_share_changes_until_overridden() {
    let mut ed = Editor::new();
    ed.add_data_source(people());
    let id = ed.append_json(ed.wrapper(), people_collection(Some(0), Some(2))).unwrap();
    let items = ed.children(id).to_vec();

    ed.set_prop(items[1], "theme", "dark").unwrap();
    for &item in &items {
        assert_eq!(prop(&ed, item, "theme"), json!("dark"));
    }

    ed.set_symbol_override(items[2], Some(SymbolOverride::Props(vec!["theme".into()])))
        .unwrap();
    ed.set_prop(items[0], "theme", "light").unwrap();
    assert_eq!(prop(&ed, items[0], "theme"), json!("light"));
    assert_eq!(prop(&ed, items[1], "theme"), json!("light"));
    assert_eq!(prop(&ed, items[2], "theme"), json!("dark"));

    // Collection-variable definitions pass overrides and resolve per item.
    ed.set_prop(items[0], "theme", item_variable("people", "currentItem", Some("name")))
        .unwrap();
    let themes: Vec<Value> = items.iter().map(|&c| prop(&ed, c, "theme")).collect();
    assert_eq!(themes, vec![json!("Ada"), json!("Ben"), json!("Cleo")]);
}

#[test]
fn overridden_instance_keeps_child_edits_local() {
    let mut ed = Editor::new();
    let main = ed
        .add_component(ComponentDef::new("card").with_child(ComponentDef::new("title")))
        .unwrap();
    let a = ed.clone_symbol(main).unwrap();
    let b = ed.clone_symbol(main).unwrap();
    ed.set_symbol_override(b, Some(SymbolOverride::Props(vec!["components".into()])))
        .unwrap();

    let badge = ed.append(b, ComponentDef::new("badge")).unwrap();
    assert_eq!(ed.children(b).len(), 2);
    assert_eq!(ed.children(main).len(), 1);
    assert_eq!(ed.children(a).len(), 1);

    ed.remove(badge);
    ed.reset_children(b, vec![ComponentDef::new("x"), ComponentDef::new("y"), ComponentDef::new("z")])
        .unwrap();
    assert_eq!(ed.children(b).len(), 3);
    assert_eq!(ed.children(main).len(), 1);
    assert_eq!(ed.children(a).len(), 1);

    // Edits made on the main still reach the other instance.
    ed.append(main, ComponentDef::new("footer")).unwrap();
    assert_eq!(ed.children(a).len(), 2);
    assert_eq!(ed.children(b).len(), 3);
}

#[test]
fn symbol_classes_and_detach() {
    let mut ed = Editor::new();
    let main = ed
        .add_component(ComponentDef::new("card").with_child(ComponentDef::new("title")))
        .unwrap();
    let copy = ed.clone_symbol(main).unwrap();

    ed.set_classes(copy, vec!["shadow".into()]).unwrap();
    assert!(ed.component(main).unwrap().has_class("shadow"));

    let title = ed.children(main)[0];
    ed.set_prop(title, "text", "Hello").unwrap();
    assert_eq!(prop(&ed, ed.children(copy)[0], "text"), json!("Hello"));

    ed.detach_symbol(copy);
    ed.set_prop(title, "text", "Bye").unwrap();
    assert_eq!(prop(&ed, ed.children(copy)[0], "text"), json!("Hello"));
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[test]
fn component_events_reach_host_handlers() {
    let mut ed = Editor::new();
    ed.add_data_source(DataSourceDef::new("ds").with_record(DataRecord::new("r").with_field("v", 1)));
    let id = ed
        .add_component(ComponentDef::new("text").with_prop("v", variable("ds.r.v")))
        .unwrap();

    let changes = Rc::new(Cell::new(0));
    let seen = Rc::clone(&changes);
    let subscription = ed.on(Topic::component(id, EventKind::Change), move |_| seen.set(seen.get() + 1));
    ed.set_value("ds.r.v", 2).unwrap();
    let seen_once = changes.get();
    assert!(seen_once > 0);

    assert!(ed.off(subscription));
    ed.set_value("ds.r.v", 3).unwrap();
    assert_eq!(changes.get(), seen_once);
    assert_eq!(prop(&ed, id, "v"), json!(3));
}

// ---------------------------------------------------------------------------
// Round-trip
// ---------------------------------------------------------------------------

#[test]
fn project_round_trip_keeps_values_and_liveness() {
    let sources = || {
        DataSourceDef::new("ds").with_record(DataRecord::new("r1").with_field("value", "A").with_field("count", 3))
    };
    let mut ed = Editor::new();
    ed.add_data_source(sources());
    ed.add_data_source(people());

    let page = json!({
        "type": "page",
        "heading": variable("ds.r1.value"),
        "attributes": {
            "data-size": {
                "type": "data-condition",
                "condition": { "left": variable("ds.r1.count"), "operator": ">", "right": 5 },
                "ifTrue": "big",
                "ifFalse": "small",
            }
        },
        "style": { "color": { "type": "data-variable", "path": "ds.r1.color", "defaultValue": "red" } },
        "traits": [{ "name": "title", "value": variable("ds.r1.value") }],
        "components": [people_collection(Some(0), Some(1))]
    });
    let id = ed.append_json(ed.wrapper(), page).unwrap();
    let saved = ed.project_data().to_value();

    let mut loaded = Editor::new();
    loaded.load_project_json(saved.clone()).unwrap();
    assert_eq!(loaded.project_data().to_value(), saved);

    let copy = loaded.children(loaded.wrapper())[0];
    for (ed, page) in [(&mut ed, id), (&mut loaded, copy)] {
        assert_eq!(prop(ed, page, "heading"), json!("A"));
        assert_eq!(attribute(ed, page, "title"), json!("A"));
        assert_eq!(attribute(ed, page, "data-size"), json!("small"));
        assert_eq!(ed.component(page).unwrap().style().get("color"), Some(&json!("red")));
        let list = ed.children(page)[0];
        let names: Vec<Value> = ed.children(list).iter().map(|&c| prop(ed, c, "name")).collect();
        assert_eq!(names, vec![json!("Ada"), json!("Ben")]);

        ed.set_value("ds.r1.value", "B").unwrap();
        ed.set_value("ds.r1.count", 8).unwrap();
        ed.set_value("ds.r1.color", "blue").unwrap();
        ed.set_value("people.p0.name", "Ana").unwrap();
        assert_eq!(prop(ed, page, "heading"), json!("B"));
        assert_eq!(attribute(ed, page, "title"), json!("B"));
        assert_eq!(attribute(ed, page, "data-size"), json!("big"));
        assert_eq!(ed.component(page).unwrap().style().get("color"), Some(&json!("blue")));
        let first = ed.children(list)[0];
        assert_eq!(prop(ed, first, "name"), json!("Ana"));
    }
}
