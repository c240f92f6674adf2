//! Offline catalog backed by a SQL schema dump.
//!
//! The dump is parsed once; `create_statement` renders a normalized definition in
//! the shape `SHOW CREATE TABLE` reports. A reference target keeps its qualifier
//! only when it names another database; qualifiers the dump uses for its own
//! tables (`public.` in PostgreSQL dumps) are dropped.

mod lexer;
mod parser;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub use parser::{DumpForeignKey, DumpTable, SqlParseError, parse_dump};

use super::{CatalogDriver, CatalogError, ColumnDescriptor};
use crate::model::TableRef;

#[derive(Debug, Clone)]
pub struct DumpCatalog {
    database: String,
    tables: BTreeMap<String, DumpTable>,
}

impl DumpCatalog {
    pub fn open(path: impl AsRef<Path>, database: &str) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let sql = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), database, "parsing schema dump");
        Self::parse(&sql, database)
    }

    pub fn parse(sql: &str, database: &str) -> Result<Self, CatalogError> {
        let mut tables: BTreeMap<String, DumpTable> = parse_dump(sql)?
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect();

        // `REFERENCES t` without a column list points at t's primary key.
        let keys: BTreeMap<String, Vec<String>> = tables
            .iter()
            .map(|(name, t)| {
                let pk = t
                    .columns
                    .iter()
                    .filter(|c| c.primary_key)
                    .map(|c| c.name.clone())
                    .collect();
                (name.clone(), pk)
            })
            .collect();
        let mut local_schemas: BTreeSet<String> =
            tables.values().filter_map(|t| t.schema.clone()).collect();
        local_schemas.insert(database.to_string());

        for table in tables.values_mut() {
            for fk in &mut table.foreign_keys {
                if fk
                    .target_schema
                    .as_ref()
                    .is_some_and(|schema| local_schemas.contains(schema))
                {
                    fk.target_schema = None;
                }
                if fk.target_schema.is_none() && fk.target_columns.is_empty() {
                    if let Some(pk) = keys.get(&fk.target) {
                        fk.target_columns = pk.clone();
                    }
                }
            }
        }

        Ok(Self {
            database: database.to_string(),
            tables,
        })
    }

    fn table(&self, database: &str, table: &str) -> Result<&DumpTable, CatalogError> {
        if database != self.database {
            return Err(CatalogError::UnknownDatabase(database.to_string()));
        }
        self.tables
            .get(table)
            .ok_or_else(|| CatalogError::UnknownTable(TableRef::new(database, table)))
    }
}

impl CatalogDriver for DumpCatalog {
    fn list_tables(&mut self, database: &str) -> Result<Vec<String>, CatalogError> {
        if database != self.database {
            return Err(CatalogError::UnknownDatabase(database.to_string()));
        }
        Ok(self.tables.keys().cloned().collect())
    }

    fn list_columns(
        &mut self,
        database: &str,
        table: &str,
    ) -> Result<Vec<ColumnDescriptor>, CatalogError> {
        Ok(self.table(database, table)?.columns.clone())
    }

    fn create_statement(&mut self, database: &str, table: &str) -> Result<String, CatalogError> {
        Ok(render_create_statement(self.table(database, table)?))
    }
}

fn quoted_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("`{n}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_create_statement(table: &DumpTable) -> String {
    let mut lines: Vec<String> = Vec::new();

    for column in &table.columns {
        let mut line = format!("  `{}` {}", column.name, column.typ);
        if !column.nullable {
            line.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            line.push_str(&format!(" DEFAULT {default}"));
        }
        lines.push(line);
    }

    let pk: Vec<String> = table
        .columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| c.name.clone())
        .collect();
    if !pk.is_empty() {
        lines.push(format!("  PRIMARY KEY ({})", quoted_list(&pk)));
    }

    for fk in &table.foreign_keys {
        let target = match &fk.target_schema {
            Some(schema) => format!("`{schema}`.`{}`", fk.target),
            None => format!("`{}`", fk.target),
        };
        lines.push(format!(
            "  FOREIGN KEY ({}) REFERENCES {target} ({})",
            quoted_list(&fk.columns),
            quoted_list(&fk.target_columns)
        ));
    }

    format!("CREATE TABLE `{}` (\n{}\n)", table.name, lines.join(",\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ddl::scan_foreign_keys;

    const DUMP: &str = r#"
        CREATE TABLE author (id INT PRIMARY KEY, name VARCHAR(80) NOT NULL);
        CREATE TABLE book (
            id INT PRIMARY KEY,
            author_id INT NOT NULL REFERENCES author(id),
            title VARCHAR(255) DEFAULT 'untitled'
        );
    "#;

    #[test]
    fn test_dump_catalog_driver() {
        let mut catalog = DumpCatalog::parse(DUMP, "library").unwrap();

        assert_eq!(catalog.list_tables("library").unwrap(), vec!["author", "book"]);
        let columns = catalog.list_columns("library", "book").unwrap();
        assert_eq!(columns[1].name, "author_id");
        assert!(!columns[1].nullable);
        assert!(catalog.list_tables("other").is_err());
    }

    #[test]
    fn test_rendered_statement_round_trips_through_scanner() {
        let mut catalog = DumpCatalog::parse(DUMP, "library").unwrap();
        let ddl = catalog.create_statement("library", "book").unwrap();

        assert!(ddl.contains("`title` VARCHAR(255) DEFAULT 'untitled'"));
        assert!(ddl.contains("PRIMARY KEY (`id`)"));

        let keys = scan_foreign_keys(&TableRef::new("library", "book"), &ddl);
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].referenced, TableRef::new("library", "author"));
    }

    #[test]
    fn test_reference_without_columns_targets_primary_key() {
        let sql = "CREATE TABLE team (code CHAR(3) PRIMARY KEY);
                   CREATE TABLE player (id INT PRIMARY KEY, team_code CHAR(3) REFERENCES team);";
        let catalog = DumpCatalog::parse(sql, "league").unwrap();

        assert_eq!(catalog.tables["player"].foreign_keys[0].target_columns, vec!["code"]);
    }

    #[test]
    fn test_reference_into_other_database_stays_qualified() {
        let sql = "CREATE TABLE public.shipment (
                       id INT PRIMARY KEY,
                       order_id INT REFERENCES public.orders(id),
                       carrier_id INT REFERENCES logistics.carrier(id)
                   );
                   CREATE TABLE public.orders (id INT PRIMARY KEY);";
        let mut catalog = DumpCatalog::parse(sql, "shop").unwrap();
        let ddl = catalog.create_statement("shop", "shipment").unwrap();

        assert!(ddl.contains("REFERENCES `orders` (`id`)"));
        assert!(ddl.contains("REFERENCES `logistics`.`carrier` (`id`)"));
        let keys = scan_foreign_keys(&TableRef::new("shop", "shipment"), &ddl);
        assert_eq!(keys[0].referenced, TableRef::new("shop", "orders"));
        assert_eq!(keys[1].referenced, TableRef::new("logistics", "carrier"));
    }

    #[test]
    fn test_missing_file() {
        let err = DumpCatalog::open("/nonexistent/schema.sql", "library").unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }
}
