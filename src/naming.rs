//! Class and accessor identifiers derived from table, column and relationship names.

use std::collections::BTreeMap;

use heck::{ToSnakeCase, ToUpperCamelCase};
use thiserror::Error;

use crate::config::{ConfigError, GeneratorConfig};
use crate::model::{Qualifier, Relationship, Schema, TableRef};

#[derive(Debug, Error, PartialEq)]
pub enum NamingError {
    #[error("{table}: `{name}` is derived for both {first} and {second}")]
    Collision {
        table: TableRef,
        name: String,
        first: String,
        second: String,
    },
    #[error("{table}: class `{class}` clashes with a class derived for {other}")]
    ClassCollision {
        table: TableRef,
        class: String,
        other: TableRef,
    },
    #[error("no class names derived for {0}")]
    UnknownTable(TableRef),
}

/// Method verbs. Every derived method carries one, so no method name is a bare keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Set,
    Load,
    Add,
    Remove,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::Set => "set",
            Verb::Load => "load",
            Verb::Add => "add",
            Verb::Remove => "remove",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassNames {
    /// Prefix plus title-cased table name
    pub stem: String,
    pub generated: String,
    pub starter: String,
    /// Module (file) name of both artifacts
    pub module: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnAccessor {
    pub column: String,
    pub getter: String,
    pub setter: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationAccessor {
    pub relationship: Relationship,
    pub remote: ClassNames,
    /// Remote stem plus qualifier, before verbs and suffixes
    pub stem: String,
    /// Struct field holding the lazy slot
    pub slot: String,
    pub load: String,
    pub get: String,
    pub set: String,
    pub add: Option<String>,
    pub remove: Option<String>,
}

/// Everything the emitter needs to name for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub table: TableRef,
    pub class: ClassNames,
    pub columns: Vec<ColumnAccessor>,
    pub relations: Vec<RelationAccessor>,
}

/// Rust keywords a title-cased stem can collide with.
const CLASS_KEYWORDS: &[&str] = &["Self"];

/// Struct fields every generated class declares.
const RESERVED_SLOTS: &[&str] = &["fields"];

/// Explicit table → class name map for one schema.
#[derive(Debug, Clone)]
pub struct NameMap {
    classes: BTreeMap<TableRef, ClassNames>,
    collection_suffix: String,
}

impl NameMap {
    pub fn build(schema: &Schema, config: &GeneratorConfig) -> Result<Self, ConfigError> {
        let mut classes = BTreeMap::new();
        for table in schema.tables() {
            let settings = config.resolve(&table.database, Some(&table.name))?;
            let stem = class_stem(
                &table.name,
                &settings.table.strip_table_name_prefixes,
                &config.class_prefix,
            );
            classes.insert(
                table.table_ref(),
                ClassNames {
                    generated: format!("{stem}{}", config.generated_suffix),
                    starter: format!("{stem}{}", config.starter_object_suffix),
                    module: stem.to_snake_case(),
                    stem,
                },
            );
        }
        Ok(Self {
            classes,
            collection_suffix: config.collection_suffix.clone(),
        })
    }

    pub fn class(&self, table: &TableRef) -> Option<&ClassNames> {
        self.classes.get(table)
    }

    /// Derive column and relationship accessors for one table.
    ///
    /// Keyless tables get column and has-one accessors only.
    pub fn derive(&self, schema: &Schema, table_ref: &TableRef) -> Result<TableNames, NamingError> {
        let table = schema
            .table(table_ref)
            .ok_or_else(|| NamingError::UnknownTable(table_ref.clone()))?;
        let class = self
            .class(table_ref)
            .ok_or_else(|| NamingError::UnknownTable(table_ref.clone()))?
            .clone();

        // Generated modules import starters, so a generated name may not shadow one.
        if let Some((other, _)) = self.classes.iter().find(|(other, names)| {
            *other != table_ref
                && (names.module == class.module
                    || names.starter == class.generated
                    || names.generated == class.starter)
        }) {
            return Err(NamingError::ClassCollision {
                table: table_ref.clone(),
                class: class.stem.clone(),
                other: other.clone(),
            });
        }

        let mut methods = Registry::new(table_ref);
        let mut slots = Registry::new(table_ref);
        for reserved in RESERVED_SLOTS {
            slots.claim(reserved, "the field store")?;
        }

        let mut columns = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            let stem = column.name.to_upper_camel_case();
            let owner = format!("column `{}`", column.name);
            let getter = methods.claim(&method_name(Verb::Get, &stem), &owner)?;
            let setter = methods.claim(&method_name(Verb::Set, &stem), &owner)?;
            columns.push(ColumnAccessor {
                column: column.name.clone(),
                getter,
                setter,
            });
        }

        let keyless = table.is_keyless();
        let mut relations = Vec::new();
        for relationship in schema.relationships_of(table_ref) {
            if keyless && relationship.kind.is_collection() {
                continue;
            }
            let Some(remote) = self.class(&relationship.remote) else {
                continue;
            };
            let stem = self.accessor_stem(relationship, remote);
            let owner = format!(
                "{} relationship to {} on {:?}",
                relationship.kind.as_str(),
                relationship.remote,
                relationship.fk_columns()
            );

            let named = if relationship.kind.is_collection() {
                format!("{stem}{}", self.collection_suffix)
            } else {
                stem.clone()
            };
            let slot = slots.claim(&named.to_snake_case(), &owner)?;
            let load = methods.claim(&method_name(Verb::Load, &named), &owner)?;
            let get = methods.claim(&method_name(Verb::Get, &named), &owner)?;
            let set = methods.claim(&method_name(Verb::Set, &named), &owner)?;
            let (add, remove) = if relationship.kind.is_collection() {
                (
                    Some(methods.claim(&method_name(Verb::Add, &stem), &owner)?),
                    Some(methods.claim(&method_name(Verb::Remove, &stem), &owner)?),
                )
            } else {
                (None, None)
            };

            relations.push(RelationAccessor {
                relationship: relationship.clone(),
                remote: remote.clone(),
                stem,
                slot,
                load,
                get,
                set,
                add,
                remove,
            });
        }

        Ok(TableNames {
            table: table_ref.clone(),
            class,
            columns,
            relations,
        })
    }

    fn accessor_stem(&self, relationship: &Relationship, remote: &ClassNames) -> String {
        let mut stem = remote.stem.clone();
        match &relationship.qualifier {
            Qualifier::None => {}
            Qualifier::ByColumns(columns) => {
                for column in columns {
                    stem.push_str("By");
                    stem.push_str(&column.to_upper_camel_case());
                }
            }
            Qualifier::Via(join) => {
                stem.push_str("Via");
                match self.class(join) {
                    Some(names) => stem.push_str(&names.stem),
                    None => stem.push_str(&join.table.to_upper_camel_case()),
                }
            }
        }
        stem
    }
}

/// Tracks which element claimed each identifier within one table.
struct Registry<'a> {
    table: &'a TableRef,
    owners: BTreeMap<String, String>,
}

impl<'a> Registry<'a> {
    fn new(table: &'a TableRef) -> Self {
        Self {
            table,
            owners: BTreeMap::new(),
        }
    }

    fn claim(&mut self, name: &str, owner: &str) -> Result<String, NamingError> {
        if let Some(first) = self.owners.get(name) {
            return Err(NamingError::Collision {
                table: self.table.clone(),
                name: name.to_string(),
                first: first.clone(),
                second: owner.to_string(),
            });
        }
        self.owners.insert(name.to_string(), owner.to_string());
        Ok(name.to_string())
    }
}

/// Class stem for a table: longest configured prefix removed, title-cased, `class_prefix` prepended.
pub fn class_stem(table: &str, strip_prefixes: &[String], class_prefix: &str) -> String {
    let stripped = strip_prefixes
        .iter()
        .filter(|p| !p.is_empty() && table.starts_with(p.as_str()) && table.len() > p.len())
        .max_by_key(|p| p.len())
        .map_or(table, |p| &table[p.len()..]);

    let stem = format!("{class_prefix}{}", stripped.to_upper_camel_case());
    let starts_ok = stem
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_');
    if !starts_ok || CLASS_KEYWORDS.contains(&stem.as_str()) {
        format!("T{stem}")
    } else {
        stem
    }
}

/// `(Get, "NetworkByNetworkIdVerejna")` → `get_network_by_network_id_verejna`
pub fn method_name(verb: Verb, stem: &str) -> String {
    let snake = stem.to_snake_case();
    if snake.is_empty() {
        verb.as_str().to_string()
    } else {
        format!("{}_{snake}", verb.as_str())
    }
}
