use joinery::{
    Column, Error, FieldDescriptor, HydrationConfig, Hydrator, RawValue, Record, RecordStream, Related,
    RelationshipDetector, RelationshipGraph, RowSource, RowStream, Schema, SqlType, TableSchema, Value,
};
use serde::Deserialize;
use serde_json::json;

fn purchasing() -> Schema {
    Schema::new(vec![
        TableSchema::new("suppliers")
            .column(Column::new("id", "TEXT"))
            .column(Column::new("name", "TEXT"))
            .primary_key(["id"]),
        TableSchema::new("purchase_orders")
            .column(Column::new("po_number", "TEXT"))
            .column(Column::new("supplier_id", "TEXT").references("suppliers", "id"))
            .primary_key(["po_number"]),
    ])
    .expect("valid schema")
}

fn blog() -> Schema {
    Schema::new(vec![
        TableSchema::new("users")
            .column(Column::new("id", "INT"))
            .column(Column::new("username", "TEXT"))
            .primary_key(["id"]),
        TableSchema::new("categories")
            .column(Column::new("id", "INT"))
            .column(Column::new("label", "TEXT"))
            .primary_key(["id"]),
        TableSchema::new("posts")
            .column(Column::new("id", "INT"))
            .column(Column::new("user_id", "INT").references("users", "id"))
            .column(Column::new("category_id", "INT").nullable().references("categories", "id"))
            .column(Column::new("title", "TEXT"))
            .primary_key(["id"]),
        TableSchema::new("tags")
            .column(Column::new("id", "INT"))
            .column(Column::new("name", "TEXT"))
            .primary_key(["id"]),
        TableSchema::new("post_tags")
            .column(Column::new("post_id", "INT").references("posts", "id"))
            .column(Column::new("tag_id", "INT").references("tags", "id"))
            .primary_key(["post_id", "tag_id"]),
    ])
    .expect("valid schema")
}

fn user_post(user: i32, post: i32, title: &str) -> Record {
    Record::new()
        .with("id", user)
        .with("username", format!("user{}", user))
        .with("posts.id", post)
        .with("posts.user_id", user)
        .with("posts.category_id", None::<i32>)
        .with("posts.title", title)
}

#[test]
fn test_scenario_many_to_one() -> Result<(), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let schema = purchasing();
    let graph = RelationshipGraph::build(&schema, &RelationshipDetector::default());
    let hydrator = Hydrator::new(&schema, &graph);

    let rows = RecordStream::new(vec![
        Record::new().with("po_number", "PO1").with("supplier_id", "S1").with("suppliers.name", "Acme"),
    ]);
    let orders = hydrator.hydrate("purchase_orders", rows)?;

    assert_eq!(orders.len(), 1);
    assert_eq!(
        orders[0].to_json(),
        json!({"poNumber": "PO1", "supplierId": "S1", "supplier": {"id": "S1", "name": "Acme"}})
    );
    Ok(())
}

#[test]
fn test_rows_sharing_a_key_collapse() -> Result<(), Error> {
    let schema = purchasing();
    let graph = RelationshipGraph::build(&schema, &RelationshipDetector::default());
    let hydrator = Hydrator::new(&schema, &graph);

    let rows: RecordStream = (0..5)
        .map(|i| {
            Record::new()
                .with("po_number", "PO1")
                .with("supplier_id", "S1")
                .with("suppliers.name", format!("name {}", i))
        })
        .collect();
    let orders = hydrator.hydrate("purchase_orders", rows)?;

    assert_eq!(orders.len(), 1);
    let supplier = orders[0].one("supplier").expect("supplier attached");
    assert_eq!(supplier.get("name").and_then(Value::as_str), Some("name 0"), "first row wins");
    Ok(())
}

#[test]
fn test_children_interleaved_keep_first_seen_order() -> Result<(), Error> {
    let schema = blog();
    let graph = RelationshipGraph::build(&schema, &RelationshipDetector::default());
    let hydrator = Hydrator::new(&schema, &graph);

    let rows = RecordStream::new(vec![
        user_post(1, 10, "first"),
        user_post(2, 20, "other"),
        user_post(1, 11, "second"),
    ]);
    let users = hydrator.hydrate("users", rows)?;

    assert_eq!(users.len(), 2);
    assert_eq!(users[0].get("id"), Some(&Value::Int32(1)));
    assert_eq!(users[1].get("id"), Some(&Value::Int32(2)));

    let titles: Vec<&str> = users[0].many("posts").iter().filter_map(|p| p.get("title")?.as_str()).collect();
    assert_eq!(titles, vec!["first", "second"]);
    assert_eq!(users[1].many("posts").len(), 1);
    Ok(())
}

#[test]
fn test_left_join_without_children_gives_empty_list() -> Result<(), Error> {
    let schema = blog();
    let graph = RelationshipGraph::build(&schema, &RelationshipDetector::default());
    let hydrator = Hydrator::new(&schema, &graph);

    let rows = RecordStream::new(vec![Record::new()
        .with("id", 3)
        .with("username", "lurker")
        .with("posts.id", None::<i32>)
        .with("posts.user_id", None::<i32>)
        .with("posts.category_id", None::<i32>)
        .with("posts.title", None::<String>)]);
    let users = hydrator.hydrate("users", rows)?;

    assert_eq!(users.len(), 1);
    assert_eq!(users[0].relation("posts"), Some(&Related::Many(Vec::new())));
    Ok(())
}

#[test]
fn test_missing_related_columns_give_null_reference() -> Result<(), Error> {
    let schema = purchasing();
    let graph = RelationshipGraph::build(&schema, &RelationshipDetector::default());
    let hydrator = Hydrator::new(&schema, &graph);

    let rel = graph.first_between("purchase_orders", "suppliers").unwrap();
    let rows = RecordStream::new(vec![Record::new().with("po_number", "PO9").with("supplier_id", "S4")]);
    let orders = hydrator.hydrate_via("purchase_orders", rel, rows)?;

    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].relation("supplier"), Some(&Related::One(None)));
    assert_eq!(orders[0].to_json()["supplier"], serde_json::Value::Null);
    Ok(())
}

#[test]
fn test_children_get_their_own_references() -> Result<(), Error> {
    let schema = blog();
    let graph = RelationshipGraph::build(&schema, &RelationshipDetector::default());
    let hydrator = Hydrator::new(&schema, &graph);

    let rows = RecordStream::new(vec![
        user_post(1, 10, "tagged").with("posts.category_id", 5).with("categories.label", "rust"),
        user_post(1, 11, "plain").with("categories.label", None::<String>),
    ]);
    let users = hydrator.hydrate("users", rows)?;

    let posts = users[0].many("posts");
    assert_eq!(posts.len(), 2);
    let category = posts[0].one("category").expect("category attached to first post");
    assert_eq!(category.get("id"), Some(&Value::Int32(5)));
    assert_eq!(category.get("label").and_then(Value::as_str), Some("rust"));
    assert!(posts[1].one("category").is_none());
    assert!(posts[0].one("user").is_none(), "no hop back to the root");
    Ok(())
}

#[test]
fn test_many_to_many_through_junction() -> Result<(), Error> {
    let schema = blog();
    let graph = RelationshipGraph::build(&schema, &RelationshipDetector::default());
    let hydrator = Hydrator::new(&schema, &graph);

    let post = |id: i32, tag: i32, name: &str| {
        Record::new()
            .with("id", id)
            .with("user_id", 1)
            .with("category_id", None::<i32>)
            .with("title", format!("post {}", id))
            .with("tags.id", tag)
            .with("tags.name", name)
    };
    let rows = RecordStream::new(vec![post(10, 1, "db"), post(10, 2, "orm"), post(11, 1, "db")]);
    let posts = hydrator.hydrate("posts", rows)?;

    assert_eq!(posts.len(), 2);
    let names: Vec<&str> = posts[0].many("tags").iter().filter_map(|t| t.get("name")?.as_str()).collect();
    assert_eq!(names, vec!["db", "orm"]);
    assert_eq!(posts[1].many("tags").len(), 1);
    assert!(posts[0].many("post_tags").is_empty());
    Ok(())
}

#[test]
fn test_plain_rows_are_not_deduplicated() -> Result<(), Error> {
    let schema = blog();
    let graph = RelationshipGraph::build(&schema, &RelationshipDetector::default());
    let hydrator = Hydrator::new(&schema, &graph);

    let rows = RecordStream::new(vec![
        Record::new().with("id", 1).with("username", "ann"),
        Record::new().with("id", 1).with("username", "ann"),
        Record::new().with("id", 2).with("username", "bo"),
    ]);
    let users = hydrator.hydrate("users", rows)?;
    assert_eq!(users.len(), 3);
    Ok(())
}

#[test]
fn test_composite_key_dedup() -> Result<(), Error> {
    let schema = Schema::new(vec![
        TableSchema::new("locations").column(Column::new("id", "INT")).primary_key(["id"]),
        TableSchema::new("stock")
            .column(Column::new("sku", "TEXT"))
            .column(Column::new("location_id", "INT").references("locations", "id"))
            .column(Column::new("qty", "INT"))
            .primary_key(["sku", "location_id"]),
    ])?;
    let graph = RelationshipGraph::build(&schema, &RelationshipDetector::default());
    let hydrator = Hydrator::new(&schema, &graph).with_config(HydrationConfig::new().key_delimiter("/"));

    let row = |sku: &str, loc: i32| {
        Record::new().with("sku", sku).with("location_id", loc).with("qty", 1).with("locations.id", loc)
    };
    let rows = RecordStream::new(vec![row("A", 1), row("A", 2), row("A", 1), row("B", 1)]);
    let stock = hydrator.hydrate("stock", rows)?;

    assert_eq!(stock.len(), 3);
    assert_eq!(stock[1].get("location_id"), Some(&Value::Int32(2)));
    Ok(())
}

#[test]
fn test_empty_stream() -> Result<(), Error> {
    let schema = blog();
    let graph = RelationshipGraph::build(&schema, &RelationshipDetector::default());
    let hydrator = Hydrator::new(&schema, &graph);

    let mut rows = RecordStream::new(Vec::new());
    assert!(hydrator.hydrate("users", &mut rows)?.is_empty());
    assert!(rows.is_closed());
    Ok(())
}

#[test]
fn test_stream_closed_after_success_and_failure() {
    let schema = blog();
    let graph = RelationshipGraph::build(&schema, &RelationshipDetector::default());
    let hydrator = Hydrator::new(&schema, &graph);

    let mut ok_rows = RecordStream::new(vec![Record::new().with("id", 1).with("username", "ann")]);
    assert!(hydrator.hydrate("users", &mut ok_rows).is_ok());
    assert!(ok_rows.is_closed());

    let mut bad_rows = RecordStream::new(vec![
        Record::new().with("id", 1).with("username", "ann"),
        Record::new().with("id", "one").with("username", "ann"),
    ]);
    let err = hydrator.hydrate("users", &mut bad_rows).unwrap_err();
    assert!(matches!(err, Error::MalformedValue { .. }));
    assert!(bad_rows.is_closed());
}

/// A stream that fails to fetch its second row.
struct FlakyStream {
    row: Record,
    served: usize,
    closed: bool,
}

impl RowSource for FlakyStream {
    fn fields(&self) -> Vec<FieldDescriptor> {
        self.row.fields()
    }

    fn read(&self, field: &str, hint: SqlType) -> Result<RawValue, Error> {
        self.row.read(field, hint)
    }
}

impl RowStream for FlakyStream {
    fn advance(&mut self) -> Result<bool, Error> {
        self.served += 1;
        if self.served > 1 {
            return Err(Error::Stream("connection reset".to_string()));
        }
        Ok(true)
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[test]
fn test_advance_failure_propagates_and_closes() {
    let schema = blog();
    let graph = RelationshipGraph::build(&schema, &RelationshipDetector::default());
    let hydrator = Hydrator::new(&schema, &graph);

    let mut stream = FlakyStream { row: Record::new().with("id", 1).with("username", "ann"), served: 0, closed: false };
    let err = hydrator.hydrate("users", &mut stream).unwrap_err();
    assert!(matches!(err, Error::Stream(_)));
    assert!(stream.closed);
}

#[test]
fn test_unknown_root_and_mismatched_relationship() {
    let schema = blog();
    let graph = RelationshipGraph::build(&schema, &RelationshipDetector::default());
    let hydrator = Hydrator::new(&schema, &graph);

    let err = hydrator.hydrate("nope", RecordStream::new(Vec::new())).unwrap_err();
    assert!(matches!(err, Error::UnknownTable(_)));

    let rel = graph.first_between("posts", "users").unwrap();
    let err = hydrator.hydrate_via("users", rel, RecordStream::new(Vec::new())).unwrap_err();
    assert!(matches!(err, Error::RelationshipMismatch { .. }));
}

#[derive(Debug, Deserialize)]
struct Order {
    po_number: String,
    supplier: Option<Supplier>,
}

#[derive(Debug, Deserialize)]
struct Supplier {
    id: String,
    name: String,
}

#[test]
fn test_entities_deserialize_into_models() -> Result<(), Box<dyn std::error::Error>> {
    let schema = purchasing();
    let graph = RelationshipGraph::build(&schema, &RelationshipDetector::default());
    let hydrator = Hydrator::new(&schema, &graph);

    let rows = RecordStream::new(vec![
        Record::new().with("po_number", "PO1").with("supplier_id", "S1").with("suppliers.name", "Acme"),
        Record::new().with("po_number", "PO2").with("supplier_id", "S2").with("suppliers.name", "Bolt"),
    ]);
    let orders: Vec<Order> = hydrator
        .hydrate("purchase_orders", rows)?
        .iter()
        .map(|e| e.into_model::<Order>())
        .collect::<Result<_, _>>()?;

    assert_eq!(orders[1].po_number, "PO2");
    let supplier = orders[1].supplier.as_ref().expect("supplier present");
    assert_eq!((supplier.id.as_str(), supplier.name.as_str()), ("S2", "Bolt"));

    let json = serde_json::to_value(&hydrator.hydrate(
        "purchase_orders",
        RecordStream::new(vec![Record::new().with("po_number", "PO3").with("supplier_id", "S3")]),
    )?)?;
    assert_eq!(json[0]["poNumber"], "PO3");
    Ok(())
}

#[test]
fn test_nullable_related_columns_do_not_invent_an_entity() -> Result<(), Error> {
    let schema = Schema::new(vec![
        TableSchema::new("suppliers")
            .column(Column::new("id", "TEXT"))
            .column(Column::new("name", "TEXT").nullable())
            .primary_key(["id"]),
        TableSchema::new("purchase_orders")
            .column(Column::new("po_number", "TEXT"))
            .column(Column::new("supplier_id", "TEXT").references("suppliers", "id"))
            .primary_key(["po_number"]),
    ])?;
    let graph = RelationshipGraph::build(&schema, &RelationshipDetector::default());
    let hydrator = Hydrator::new(&schema, &graph);
    let rel = graph.first_between("purchase_orders", "suppliers").unwrap();

    let rows = RecordStream::new(vec![Record::new().with("po_number", "PO9").with("supplier_id", "S4")]);
    let orders = hydrator.hydrate_via("purchase_orders", rel, rows)?;
    assert_eq!(orders[0].relation("supplier"), Some(&Related::One(None)));

    let rows = RecordStream::new(vec![
        Record::new().with("po_number", "PO9").with("supplier_id", "S4").with("suppliers.name", None::<String>),
        Record::new().with("po_number", "PO10").with("supplier_id", "S5").with("suppliers.name", "Bolt"),
    ]);
    let orders = hydrator.hydrate("purchase_orders", rows)?;
    assert!(orders[0].one("supplier").is_none());
    let supplier = orders[1].one("supplier").expect("supplier attached");
    assert_eq!(supplier.get("id").and_then(Value::as_str), Some("S5"));
    Ok(())
}

#[test]
fn test_null_child_foreign_key_never_borrows_the_root_key() -> Result<(), Error> {
    let schema = Schema::new(vec![
        TableSchema::new("users")
            .column(Column::new("id", "INT"))
            .column(Column::new("username", "TEXT"))
            .primary_key(["id"]),
        TableSchema::new("categories")
            .column(Column::new("id", "INT"))
            .column(Column::new("label", "TEXT").nullable())
            .primary_key(["id"]),
        TableSchema::new("posts")
            .column(Column::new("id", "INT"))
            .column(Column::new("user_id", "INT").references("users", "id"))
            .column(Column::new("category_id", "INT").nullable().references("categories", "id"))
            .primary_key(["id"]),
    ])?;
    let graph = RelationshipGraph::build(&schema, &RelationshipDetector::default());
    let hydrator = Hydrator::new(&schema, &graph);

    let row = |post: i32, category: Option<i32>, label: Option<&str>| {
        Record::new()
            .with("id", 7)
            .with("username", "ann")
            .with("posts.id", post)
            .with("posts.user_id", 7)
            .with("posts.category_id", category)
            .with("categories.label", label)
    };
    let rows = RecordStream::new(vec![row(70, None, None), row(71, None, Some("stale")), row(72, Some(3), Some("news"))]);
    let users = hydrator.hydrate("users", rows)?;

    let posts = users[0].many("posts");
    assert_eq!(posts.len(), 3);
    assert!(posts[0].one("category").is_none());
    assert!(posts[1].one("category").is_none());
    let category = posts[2].one("category").expect("category attached");
    assert_eq!(category.get("id"), Some(&Value::Int32(3)));
    Ok(())
}

#[test]
fn test_delimiter_inside_key_values_does_not_merge_roots() -> Result<(), Error> {
    let schema = Schema::new(vec![
        TableSchema::new("locations").column(Column::new("id", "INT")).primary_key(["id"]),
        TableSchema::new("stock")
            .column(Column::new("sku", "TEXT"))
            .column(Column::new("bin", "TEXT"))
            .column(Column::new("location_id", "INT").references("locations", "id"))
            .primary_key(["sku", "bin"]),
    ])?;
    let graph = RelationshipGraph::build(&schema, &RelationshipDetector::default());
    let hydrator = Hydrator::new(&schema, &graph);

    let row = |sku: &str, bin: &str| {
        Record::new().with("sku", sku).with("bin", bin).with("location_id", 1).with("locations.id", 1)
    };
    let rows = RecordStream::new(vec![row("a|b", "c"), row("a", "b|c"), row("a|b", "c"), row("a\\", "|c")]);
    let stock = hydrator.hydrate("stock", rows)?;

    let keys: Vec<(&str, &str)> = stock
        .iter()
        .filter_map(|s| Some((s.get("sku")?.as_str()?, s.get("bin")?.as_str()?)))
        .collect();
    assert_eq!(keys, vec![("a|b", "c"), ("a", "b|c"), ("a\\", "|c")]);
    Ok(())
}

#[test]
fn test_two_foreign_keys_to_one_table_keep_separate_slots() -> Result<(), Error> {
    let schema = Schema::new(vec![
        TableSchema::new("users")
            .column(Column::new("id", "INT"))
            .column(Column::new("username", "TEXT"))
            .primary_key(["id"]),
        TableSchema::new("posts")
            .column(Column::new("id", "INT"))
            .column(Column::new("author_id", "INT").references("users", "id"))
            .column(Column::new("editor_id", "INT").nullable().references("users", "id"))
            .primary_key(["id"]),
    ])?;
    let graph = RelationshipGraph::build(&schema, &RelationshipDetector::default());
    let hydrator = Hydrator::new(&schema, &graph);

    let rows = RecordStream::new(vec![Record::new()
        .with("id", 1)
        .with("username", "ann")
        .with("posts.id", 10)
        .with("posts.author_id", 1)
        .with("posts.editor_id", 2)]);
    let users = hydrator.hydrate("users", rows)?;

    assert_eq!(users[0].many("posts_author").len(), 1);
    assert_eq!(users[0].relation("posts_editor"), Some(&Related::Many(Vec::new())));
    let json = users[0].to_json();
    assert_eq!(json["postsAuthor"][0]["editorId"], 2);
    assert_eq!(json["postsEditor"], json!([]));
    Ok(())
}
