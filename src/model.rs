//! In-memory schema model built from one catalog snapshot.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("foreign key on {table} has no columns")]
    EmptyForeignKey { table: String },
    #[error("foreign key on {table} maps {local} local columns to {referenced} referenced columns")]
    ColumnCountMismatch {
        table: String,
        local: usize,
        referenced: usize,
    },
}

/// Fully qualified table reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TableRef {
    pub database: String,
    pub table: String,
}

impl TableRef {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    Absent,
    Null,
    Literal(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub nullable: bool,
    pub default: DefaultValue,
    pub typ: String,
    pub size: Option<String>,
    pub is_primary_key: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Provenance {
    /// Parsed from the catalog DDL
    Explicit,
    /// Synthesized by the naming-convention fallback
    Inferred,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Explicit => "explicit",
            Provenance::Inferred => "inferred",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub local: TableRef,
    pub local_columns: Vec<String>,
    pub referenced: TableRef,
    pub referenced_columns: Vec<String>,
    pub provenance: Provenance,
}

impl ForeignKey {
    pub fn new(
        local: TableRef,
        local_columns: Vec<String>,
        referenced: TableRef,
        referenced_columns: Vec<String>,
        provenance: Provenance,
    ) -> Result<Self, ModelError> {
        if local_columns.is_empty() || referenced_columns.is_empty() {
            return Err(ModelError::EmptyForeignKey {
                table: local.to_string(),
            });
        }
        if local_columns.len() != referenced_columns.len() {
            return Err(ModelError::ColumnCountMismatch {
                table: local.to_string(),
                local: local_columns.len(),
                referenced: referenced_columns.len(),
            });
        }
        Ok(Self {
            local,
            local_columns,
            referenced,
            referenced_columns,
            provenance,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub database: String,
    pub columns: Vec<Column>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    pub fn new(database: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            database: database.into(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn table_ref(&self) -> TableRef {
        TableRef::new(&self.database, &self.name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Primary key column names in catalog order. Empty for keyless tables.
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn is_keyless(&self) -> bool {
        !self.columns.iter().any(|c| c.is_primary_key)
    }

    pub fn is_primary_key(&self, columns: &[String]) -> bool {
        let pk = self.primary_key();
        !pk.is_empty() && pk.len() == columns.len() && pk.iter().zip(columns).all(|(a, b)| *a == b)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Database {
    pub name: String,
    pub tables: BTreeMap<String, Table>,
}

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelationKind {
    HasOne,
    HasMany,
    ManyToMany,
}

impl RelationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RelationKind::HasOne => "has_one",
            RelationKind::HasMany => "has_many",
            RelationKind::ManyToMany => "many_to_many",
        }
    }

    pub fn is_collection(self) -> bool {
        !matches!(self, RelationKind::HasOne)
    }
}

/// Join table mediating a many-to-many relationship.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct JoinTable {
    pub table: TableRef,
    /// Columns on the join table referencing the local key
    pub local_columns: Vec<String>,
    /// Columns on the join table referencing the remote key
    pub remote_columns: Vec<String>,
}

/// Name qualifier assigned when several relationships share the same endpoints.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Qualifier {
    None,
    ByColumns(Vec<String>),
    Via(TableRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub kind: RelationKind,
    pub local: TableRef,
    pub remote: TableRef,
    pub local_columns: Vec<String>,
    pub remote_columns: Vec<String>,
    pub via: Option<JoinTable>,
    pub provenance: Provenance,
    pub qualifier: Qualifier,
}

impl Relationship {
    /// Foreign-key columns that tell this relationship apart from its siblings.
    pub fn fk_columns(&self) -> &[String] {
        match self.kind {
            RelationKind::HasOne => &self.local_columns,
            RelationKind::HasMany => &self.remote_columns,
            RelationKind::ManyToMany => self
                .via
                .as_ref()
                .map(|j| j.local_columns.as_slice())
                .unwrap_or(&[]),
        }
    }

    pub(crate) fn sort_key(&self) -> (&TableRef, RelationKind, &TableRef, &[String], Option<&TableRef>) {
        (
            &self.local,
            self.kind,
            &self.remote,
            self.fk_columns(),
            self.via.as_ref().map(|j| &j.table),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    pub databases: BTreeMap<String, Database>,
    /// Derived by the inference engine; empty until it runs.
    pub relationships: Vec<Relationship>,
    /// Tables classified as pure many-to-many join tables.
    pub join_tables: BTreeSet<TableRef>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, table: Table) {
        self.databases
            .entry(table.database.clone())
            .or_insert_with(|| Database::new(table.database.clone()))
            .tables
            .insert(table.name.clone(), table);
    }

    pub fn table(&self, table_ref: &TableRef) -> Option<&Table> {
        self.databases
            .get(&table_ref.database)
            .and_then(|db| db.tables.get(&table_ref.table))
    }

    /// All tables, ordered by database then table name.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.databases.values().flat_map(|db| db.tables.values())
    }

    pub fn is_join_table(&self, table_ref: &TableRef) -> bool {
        self.join_tables.contains(table_ref)
    }

    pub fn relationships_of<'a>(
        &'a self,
        table_ref: &'a TableRef,
    ) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.relationships.iter().filter(move |r| &r.local == table_ref)
    }
}
