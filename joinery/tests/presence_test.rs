use std::collections::HashSet;

use joinery::{
    known_tables, Column, FieldDescriptor, HydrationConfig, RelationshipDetector, RelationshipGraph,
    RelationshipKind, Schema, Strategy, TablePresence, TableSchema,
};

fn field(name: &str) -> FieldDescriptor {
    FieldDescriptor { name: name.to_string(), origin_table: None }
}

fn field_from(name: &str, origin: &str) -> FieldDescriptor {
    FieldDescriptor { name: name.to_string(), origin_table: Some(origin.to_string()) }
}

fn shop_schema() -> Schema {
    Schema::new(vec![
        TableSchema::new("customers")
            .column(Column::new("id", "INT"))
            .column(Column::new("name", "TEXT"))
            .primary_key(["id"]),
        TableSchema::new("orders")
            .column(Column::new("id", "INT"))
            .column(Column::new("customer_id", "INT").references("customers", "id"))
            .column(Column::new("shipping_address_id", "INT").nullable().references("addresses", "id"))
            .primary_key(["id"]),
        TableSchema::new("addresses")
            .column(Column::new("id", "INT"))
            .column(Column::new("street", "TEXT"))
            .primary_key(["id"]),
        TableSchema::new("warehouses")
            .column(Column::new("id", "INT"))
            .primary_key(["id"]),
    ])
    .expect("valid schema")
}

fn graph(schema: &Schema) -> RelationshipGraph {
    RelationshipGraph::build(schema, &RelationshipDetector::default())
}

#[test]
fn test_known_tables_are_root_and_neighbours() {
    let schema = shop_schema();
    let graph = graph(&schema);

    let known = known_tables(&graph, "orders", &HydrationConfig::default());
    let expected: HashSet<String> = ["orders", "customers", "addresses"].iter().map(|s| s.to_string()).collect();
    assert_eq!(known, expected);

    let widened = known_tables(&graph, "orders", &HydrationConfig::new().extra_tables(["warehouses"]));
    assert!(widened.contains("warehouses"));
}

#[test]
fn test_prefix_must_be_a_known_table() {
    let known: HashSet<String> = ["orders", "customers"].iter().map(|s| s.to_string()).collect();
    let fields = vec![field("id"), field("customers.name"), field("version.major"), field("notes")];

    let presence = TablePresence::detect(&fields, &known, '.');
    assert!(presence.is_present("customers"));
    assert!(!presence.is_present("version"));
    assert!(!presence.is_present("orders"));
}

#[test]
fn test_explicit_origin_wins_over_name() {
    let known: HashSet<String> = HashSet::new();
    let fields = vec![field_from("name", "customers"), field_from("street", "  "), field("addresses.street")];

    let presence = TablePresence::detect(&fields, &known, '.');
    assert!(presence.is_present("customers"));
    assert!(!presence.is_present("addresses"), "blank origin falls back to an unknown prefix");
    assert_eq!(presence.tables().count(), 1);
}

#[test]
fn test_custom_separator() {
    let known: HashSet<String> = ["customers".to_string()].into_iter().collect();
    let presence = TablePresence::detect(&[field("customer_name")], &known, '_');
    assert!(!presence.is_present("customers"));

    let presence = TablePresence::detect(&[field("customers.name")], &known, ':');
    assert!(!presence.is_present("customers"));

    let presence = TablePresence::detect(&[field("customers:name")], &known, ':');
    assert!(presence.is_present("customers"));
}

#[test]
fn test_strategy_follows_first_present_relationship() {
    let schema = shop_schema();
    let graph = graph(&schema);
    let known = known_tables(&graph, "orders", &HydrationConfig::default());

    let presence = TablePresence::detect(&[field("id"), field("addresses.street")], &known, '.');
    match Strategy::select(&graph, "orders", &presence) {
        Strategy::Single(rel) => assert_eq!(rel.to_table, "addresses"),
        other => panic!("unexpected strategy {:?}", other),
    }

    let presence = TablePresence::detect(
        &[field("id"), field("addresses.street"), field("customers.name")],
        &known,
        '.',
    );
    let strategy = Strategy::select(&graph, "orders", &presence);
    assert_eq!(strategy.relationship().map(|r| r.to_table.as_str()), Some("customers"));
}

#[test]
fn test_strategy_for_children_and_fallback() {
    let schema = shop_schema();
    let graph = graph(&schema);
    let known = known_tables(&graph, "customers", &HydrationConfig::default());

    let presence = TablePresence::detect(&[field("id"), field("orders.id")], &known, '.');
    match Strategy::select(&graph, "customers", &presence) {
        Strategy::Children(rel) => {
            assert_eq!(rel.kind, RelationshipKind::OneToMany);
            assert_eq!(rel.to_table, "orders");
        }
        other => panic!("unexpected strategy {:?}", other),
    }

    let presence = TablePresence::detect(&[field("id"), field("name")], &known, '.');
    assert_eq!(Strategy::select(&graph, "customers", &presence), Strategy::Plain);
}
