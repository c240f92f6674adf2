//! Catalog extraction: turns driver output into schema model records.

pub mod ddl;
pub mod dump;

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::{ConfigError, GeneratorConfig};
use crate::model::{Schema, Table, TableRef};

pub use dump::{DumpCatalog, SqlParseError};

/// One column as reported by the catalog, before interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub nullable: bool,
    /// Raw default representation; `None` when the catalog reports no default.
    pub default: Option<String>,
    /// Type with optional size group, e.g. `varchar(255)`
    pub typ: String,
    pub primary_key: bool,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, typ: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nullable: true,
            default: None,
            typ: typ.into(),
            primary_key: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn default_value(mut self, raw: impl Into<String>) -> Self {
        self.default = Some(raw.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog connection failed: {0}")]
    Connection(String),
    #[error("unsupported dsn `{0}` (expected `dump:<path>`)")]
    UnsupportedDsn(String),
    #[error("database `{0}` is not known to the catalog")]
    UnknownDatabase(String),
    #[error("table `{0}` is not known to the catalog")]
    UnknownTable(TableRef),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse schema dump: {0}")]
    Parse(#[from] SqlParseError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Source of raw catalog metadata. Calls are blocking and made in sequence.
pub trait CatalogDriver {
    fn list_tables(&mut self, database: &str) -> Result<Vec<String>, CatalogError>;

    fn list_columns(
        &mut self,
        database: &str,
        table: &str,
    ) -> Result<Vec<ColumnDescriptor>, CatalogError>;

    fn create_statement(&mut self, database: &str, table: &str) -> Result<String, CatalogError>;
}

/// In-memory catalog snapshot.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    databases: BTreeMap<String, BTreeMap<String, StaticTable>>,
}

#[derive(Debug, Clone, Default)]
struct StaticTable {
    columns: Vec<ColumnDescriptor>,
    create_statement: String,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(
        mut self,
        database: &str,
        table: &str,
        columns: Vec<ColumnDescriptor>,
        create_statement: impl Into<String>,
    ) -> Self {
        self.insert(database, table, columns, create_statement);
        self
    }

    pub fn insert(
        &mut self,
        database: &str,
        table: &str,
        columns: Vec<ColumnDescriptor>,
        create_statement: impl Into<String>,
    ) {
        self.databases.entry(database.to_string()).or_default().insert(
            table.to_string(),
            StaticTable {
                columns,
                create_statement: create_statement.into(),
            },
        );
    }

    pub fn database_names(&self) -> Vec<String> {
        self.databases.keys().cloned().collect()
    }

    fn get(&self, database: &str, table: &str) -> Result<&StaticTable, CatalogError> {
        self.databases
            .get(database)
            .ok_or_else(|| CatalogError::UnknownDatabase(database.to_string()))?
            .get(table)
            .ok_or_else(|| CatalogError::UnknownTable(TableRef::new(database, table)))
    }
}

impl CatalogDriver for StaticCatalog {
    fn list_tables(&mut self, database: &str) -> Result<Vec<String>, CatalogError> {
        self.databases
            .get(database)
            .map(|tables| tables.keys().cloned().collect())
            .ok_or_else(|| CatalogError::UnknownDatabase(database.to_string()))
    }

    fn list_columns(
        &mut self,
        database: &str,
        table: &str,
    ) -> Result<Vec<ColumnDescriptor>, CatalogError> {
        Ok(self.get(database, table)?.columns.clone())
    }

    fn create_statement(&mut self, database: &str, table: &str) -> Result<String, CatalogError> {
        Ok(self.get(database, table)?.create_statement.clone())
    }
}

/// Routes each database to its own driver.
#[derive(Default)]
pub struct RoutedCatalog {
    drivers: BTreeMap<String, Box<dyn CatalogDriver>>,
}

impl RoutedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, database: impl Into<String>, driver: Box<dyn CatalogDriver>) {
        self.drivers.insert(database.into(), driver);
    }

    pub fn database_names(&self) -> Vec<String> {
        self.drivers.keys().cloned().collect()
    }

    fn driver(&mut self, database: &str) -> Result<&mut Box<dyn CatalogDriver>, CatalogError> {
        self.drivers
            .get_mut(database)
            .ok_or_else(|| CatalogError::UnknownDatabase(database.to_string()))
    }
}

impl CatalogDriver for RoutedCatalog {
    fn list_tables(&mut self, database: &str) -> Result<Vec<String>, CatalogError> {
        self.driver(database)?.list_tables(database)
    }

    fn list_columns(
        &mut self,
        database: &str,
        table: &str,
    ) -> Result<Vec<ColumnDescriptor>, CatalogError> {
        self.driver(database)?.list_columns(database, table)
    }

    fn create_statement(&mut self, database: &str, table: &str) -> Result<String, CatalogError> {
        self.driver(database)?.create_statement(database, table)
    }
}

/// Open a driver for a configured DSN.
pub fn connect(dsn: &str, database: &str) -> Result<Box<dyn CatalogDriver>, CatalogError> {
    match dsn.split_once(':') {
        Some(("dump", path)) if !path.is_empty() => {
            let catalog = DumpCatalog::open(path, database)?;
            Ok(Box::new(catalog))
        }
        _ => Err(CatalogError::UnsupportedDsn(dsn.to_string())),
    }
}

/// Connect every database named in the configuration.
pub fn connect_all(config: &GeneratorConfig) -> Result<RoutedCatalog, CatalogError> {
    let mut routed = RoutedCatalog::new();
    for (name, db) in &config.databases {
        tracing::debug!(database = %name, "opening catalog");
        routed.insert(name.clone(), connect(&db.dsn, name)?);
    }
    Ok(routed)
}

/// Read one database's tables into `schema`. Returns the number of tables added.
pub fn extract_database(
    driver: &mut dyn CatalogDriver,
    database: &str,
    config: &GeneratorConfig,
    schema: &mut Schema,
) -> Result<usize, CatalogError> {
    let db_settings = config.resolve(database, None)?;
    let mut names = driver.list_tables(database)?;
    names.sort();

    let mut added = 0;
    for name in names {
        if db_settings.is_ignored(&name) {
            tracing::debug!(database, table = %name, "table ignored by configuration");
            continue;
        }

        let settings = config.resolve(database, Some(&name))?;
        let mut table = Table::new(database, &name);
        table.columns = driver
            .list_columns(database, &name)?
            .iter()
            .map(ddl::column_from_descriptor)
            .collect();

        if let Some(pk) = &settings.primary_key {
            apply_primary_key_override(&mut table, pk);
        }

        let definition = driver.create_statement(database, &name)?;
        table.foreign_keys = ddl::scan_foreign_keys(&table.table_ref(), &definition);

        if table.is_keyless() {
            tracing::info!(table = %table.table_ref(), "table has no primary key");
        }

        schema.add_table(table);
        added += 1;
    }

    tracing::info!(database, tables = added, "catalog extracted");
    Ok(added)
}

fn apply_primary_key_override(table: &mut Table, pk: &[String]) {
    let unknown: Vec<&String> = pk.iter().filter(|c| !table.has_column(c)).collect();
    if !unknown.is_empty() {
        tracing::warn!(
            table = %table.table_ref(),
            ?unknown,
            "primary_key override names unknown columns; keeping catalog key"
        );
        return;
    }

    for column in &mut table.columns {
        column.is_primary_key = pk.contains(&column.name);
    }
    // The key is derived from column flags, so it always follows catalog order.
    if !table.primary_key().iter().zip(pk).all(|(a, b)| *a == b) {
        tracing::warn!(
            table = %table.table_ref(),
            "primary_key override order differs from column order; column order is used"
        );
    }
}
