//! # Database Module
//!
//! A thin sqlx connection layer for running JOIN queries and handing their
//! rows to the hydrator. Works with PostgreSQL, MySQL and SQLite through the
//! `Any` driver.

// ============================================================================
// External Crate Imports
// ============================================================================

use futures::future::BoxFuture;
use sqlx::{any::AnyArguments, AnyPool, Arguments};

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::{any_row::SqlxRowStream, Entity, Error, Hydrator};

// ============================================================================
// Database Driver Enum
// ============================================================================

/// Supported database drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drivers {
    /// PostgreSQL driver
    Postgres,
    /// MySQL driver
    MySQL,
    /// SQLite driver
    SQLite,
}

impl Drivers {
    /// Detects the driver from a connection URL.
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("postgres") {
            Drivers::Postgres
        } else if url.starts_with("mysql") {
            Drivers::MySQL
        } else {
            Drivers::SQLite
        }
    }
}

// ============================================================================
// Database Struct
// ============================================================================

/// A pooled database connection.
///
/// Cheap to clone; the pool is shared.
#[derive(Debug, Clone)]
pub struct Database {
    /// The underlying SQLx connection pool
    pub(crate) pool: AnyPool,
    /// The detected database driver
    pub(crate) driver: Drivers,
}

impl Database {
    /// Creates a new DatabaseBuilder for configuring the connection.
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    /// Connects to a database using the provided connection string.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        DatabaseBuilder::new().connect(url).await
    }

    pub fn driver(&self) -> Drivers {
        self.driver
    }

    /// Creates a raw SQL query.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let orders = db
    ///     .raw("SELECT o.*, s.name AS \"suppliers.name\" FROM purchase_orders o JOIN suppliers s ON s.id = o.supplier_id")
    ///     .hydrate(&hydrator, "purchase_orders")
    ///     .await?;
    /// ```
    pub fn raw<'a>(&self, sql: &'a str) -> RawQuery<'a, Self> {
        RawQuery::new(self.clone(), sql)
    }
}

// ============================================================================
// DatabaseBuilder Struct
// ============================================================================

pub struct DatabaseBuilder {
    max_connections: u32,
}

impl Default for DatabaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        Self { max_connections: 5 }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub async fn connect(self, url: &str) -> Result<Database, Error> {
        sqlx::any::install_default_drivers();
        let pool = sqlx::any::AnyPoolOptions::new().max_connections(self.max_connections).connect(url).await?;
        Ok(Database { pool, driver: Drivers::from_url(url) })
    }
}

// ============================================================================
// Connection Trait
// ============================================================================

/// Something raw queries can run against.
pub trait Connection: Send + Sync {
    fn execute<'a, 'q: 'a>(
        &'a self,
        sql: &'q str,
        args: AnyArguments<'q>,
    ) -> BoxFuture<'a, Result<sqlx::any::AnyQueryResult, sqlx::Error>>;

    fn fetch_all<'a, 'q: 'a>(
        &'a self,
        sql: &'q str,
        args: AnyArguments<'q>,
    ) -> BoxFuture<'a, Result<Vec<sqlx::any::AnyRow>, sqlx::Error>>;
}

impl Connection for Database {
    fn execute<'a, 'q: 'a>(
        &'a self,
        sql: &'q str,
        args: AnyArguments<'q>,
    ) -> BoxFuture<'a, Result<sqlx::any::AnyQueryResult, sqlx::Error>> {
        Box::pin(async move { sqlx::query_with(sql, args).execute(&self.pool).await })
    }

    fn fetch_all<'a, 'q: 'a>(
        &'a self,
        sql: &'q str,
        args: AnyArguments<'q>,
    ) -> BoxFuture<'a, Result<Vec<sqlx::any::AnyRow>, sqlx::Error>> {
        Box::pin(async move { sqlx::query_with(sql, args).fetch_all(&self.pool).await })
    }
}

// ============================================================================
// Raw SQL Query Builder
// ============================================================================

pub struct RawQuery<'a, C> {
    conn: C,
    sql: &'a str,
    args: AnyArguments<'a>,
    /// First parameter that failed to encode; reported instead of running the query.
    bind_error: Option<sqlx::Error>,
}

impl<'a, C> RawQuery<'a, C>
where
    C: Connection,
{
    pub(crate) fn new(conn: C, sql: &'a str) -> Self {
        Self { conn, sql, args: AnyArguments::default(), bind_error: None }
    }

    /// Binds the next positional parameter.
    ///
    /// An encoding failure is kept and returned by `execute`, `fetch_rows`
    /// or `hydrate`; later binds are ignored.
    pub fn bind<T>(mut self, value: T) -> Self
    where
        T: 'a + sqlx::Encode<'a, sqlx::Any> + sqlx::Type<sqlx::Any> + Send + Sync,
    {
        if self.bind_error.is_some() {
            return self;
        }
        if let Err(e) = self.args.add(value) {
            log::warn!("Failed to bind query parameter: {}", e);
            self.bind_error = Some(sqlx::Error::Encode(e));
        }
        self
    }

    fn into_parts(self) -> Result<(C, &'a str, AnyArguments<'a>), Error> {
        match self.bind_error {
            Some(e) => Err(Error::Database(e)),
            None => Ok((self.conn, self.sql, self.args)),
        }
    }

    /// Executes the statement and returns the number of affected rows.
    pub async fn execute(self) -> Result<u64, Error> {
        let (conn, sql, args) = self.into_parts()?;
        let result = conn.execute(sql, args).await?;
        Ok(result.rows_affected())
    }

    /// Runs the query and returns its rows as a [`RowStream`](crate::RowStream).
    pub async fn fetch_rows(self) -> Result<SqlxRowStream, Error> {
        let (conn, sql, args) = self.into_parts()?;
        let rows = conn.fetch_all(sql, args).await?;
        Ok(SqlxRowStream::new(rows))
    }

    /// Runs the query and hydrates its rows into `root` entities.
    pub async fn hydrate(self, hydrator: &Hydrator<'_>, root: &str) -> Result<Vec<Entity>, Error> {
        let stream = self.fetch_rows().await?;
        hydrator.hydrate(root, stream)
    }
}
