use joinery::{
    Database, HydrationConfig, Hydrator, Model, RelationshipDetector, RelationshipGraph, Schema,
};

#[derive(Model)]
#[orm(table = "users")]
#[allow(dead_code)]
struct User {
    #[orm(primary_key)]
    id: i64,
    #[orm(unique)]
    username: String,
    bio: Option<String>,
}

#[derive(Model)]
#[orm(table = "posts")]
#[allow(dead_code)]
struct Post {
    #[orm(primary_key)]
    id: i64,
    #[orm(foreign_key = "users::id")]
    user_id: i64,
    title: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let schema = Schema::new(vec![User::schema(), Post::schema()])?;
    let graph = RelationshipGraph::build(&schema, &RelationshipDetector::default());

    for rel in graph.relationships() {
        println!("{:?}: {}.{} -> {}.{}", rel.kind, rel.from_table, rel.from_column, rel.to_table, rel.to_column);
    }

    let db = Database::builder().max_connections(1).connect("sqlite::memory:").await?;
    db.raw("CREATE TABLE users (id INTEGER PRIMARY KEY, username TEXT NOT NULL, bio TEXT)").execute().await?;
    db.raw("CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER NOT NULL, title TEXT NOT NULL)")
        .execute()
        .await?;

    db.raw("INSERT INTO users (id, username, bio) VALUES (1, 'alice', 'writes a lot'), (2, 'bob', NULL)")
        .execute()
        .await?;
    db.raw("INSERT INTO posts (id, user_id, title) VALUES (10, 1, 'Hello'), (11, 1, 'Again'), (12, 2, 'First')")
        .execute()
        .await?;

    let hydrator = Hydrator::new(&schema, &graph).with_config(HydrationConfig::default());
    let users = db
        .raw(
            "SELECT u.id, u.username, u.bio, \
                    p.id AS \"posts.id\", p.user_id AS \"posts.user_id\", p.title AS \"posts.title\" \
             FROM users u LEFT JOIN posts p ON p.user_id = u.id ORDER BY u.id, p.id",
        )
        .hydrate(&hydrator, "users")
        .await?;

    log::info!("Hydrated {} users", users.len());
    println!("{}", serde_json::to_string_pretty(&users)?);
    Ok(())
}
