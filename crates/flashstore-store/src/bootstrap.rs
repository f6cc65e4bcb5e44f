// ABOUTME: Declarative, idempotent schema bootstrap: table DDL, column migrations, and seed rows.
// ABOUTME: Built by the caller and applied by the lifecycle manager on every startup.

use serde_json::Value;

/// A single additive column migration, applied only if the column is absent.
///
/// Migrations never drop or rename existing columns or rows; applying one
/// twice is a no-op.
#[derive(Debug, Clone)]
pub struct ColumnMigration {
    pub table: String,
    pub column: String,
    pub definition: String,
}

impl ColumnMigration {
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        definition: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            definition: definition.into(),
        }
    }
}

/// A default row inserted only when no row with the same natural key exists,
/// so repeated boots never duplicate seed data.
#[derive(Debug, Clone)]
pub struct Seed {
    /// Table holding the seed row.
    pub table: String,
    /// Natural-key column checked before inserting.
    pub key_column: String,
    /// Natural-key value of this seed row.
    pub key: Value,
    /// Insert statement executed when the key is absent.
    pub insert: String,
    /// Positional params for the insert statement.
    pub params: Vec<Value>,
}

impl Seed {
    pub fn new(
        table: impl Into<String>,
        key_column: impl Into<String>,
        key: Value,
        insert: impl Into<String>,
        params: Vec<Value>,
    ) -> Self {
        Self {
            table: table.into(),
            key_column: key_column.into(),
            key,
            insert: insert.into(),
            params,
        }
    }
}

/// The full bootstrap definition applied at startup, in order: table DDL
/// (create-if-not-exists semantics exclusively), then column migrations,
/// then seed rows.
#[derive(Debug, Clone, Default)]
pub struct Bootstrap {
    tables: Vec<String>,
    migrations: Vec<ColumnMigration>,
    seeds: Vec<Seed>,
}

impl Bootstrap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `CREATE TABLE IF NOT EXISTS` statement.
    pub fn table(mut self, ddl: impl Into<String>) -> Self {
        self.tables.push(ddl.into());
        self
    }

    /// Add an additive column migration.
    pub fn migration(mut self, migration: ColumnMigration) -> Self {
        self.migrations.push(migration);
        self
    }

    /// Add a natural-key guarded seed row.
    pub fn seed(mut self, seed: Seed) -> Self {
        self.seeds.push(seed);
        self
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn migrations(&self) -> &[ColumnMigration] {
        &self.migrations
    }

    pub fn seeds(&self) -> &[Seed] {
        &self.seeds
    }
}
