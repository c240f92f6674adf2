//! Runtime interface the generated classes compile against.
//!
//! Row storage, lazily loaded relation slots and the explicit key cascade live
//! here; query execution is delegated to a [`Loader`] supplied by the caller.
//! Nothing in this module touches a database on its own.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "'{v}'"),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Column values of one row, in insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldStore {
    entries: Vec<(String, Value)>,
}

impl FieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Store a value, returning the previous one.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Option<Value> {
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name.to_string(), value));
                None
            }
        }
    }

    /// Values of `columns` in order; missing columns read as `Null`.
    pub fn values(&self, columns: &[&str]) -> Vec<Value> {
        columns
            .iter()
            .map(|c| self.get(c).cloned().unwrap_or(Value::Null))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(String, Value),
    NotEq(String, Value),
}

impl Condition {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Condition::Eq(column.to_string(), value.into())
    }

    pub fn not_eq(column: &str, value: impl Into<Value>) -> Self {
        Condition::NotEq(column.to_string(), value.into())
    }

    pub fn matches(&self, row: &FieldStore) -> bool {
        let field = |column: &str| row.get(column).cloned().unwrap_or(Value::Null);
        match self {
            Condition::Eq(column, value) => field(column) == *value,
            Condition::NotEq(column, value) => field(column) != *value,
        }
    }
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("loader failed: {0}")]
    Loader(String),
    #[error("{database}.{table}: {message}")]
    Query {
        database: String,
        table: String,
        message: String,
    },
}

/// Executes the selects issued by relation loads.
pub trait Loader {
    fn select(
        &self,
        database: &str,
        table: &str,
        conditions: &[Condition],
    ) -> Result<Vec<FieldStore>, RuntimeError>;
}

/// A row-backed class. Implemented by every generated class for its starter type.
pub trait Entity: Sized {
    const DATABASE: &'static str;
    const TABLE: &'static str;
    /// Key columns in catalog order; empty for keyless tables.
    const PRIMARY_KEY: &'static [&'static str];
    /// Soft-delete column and the value marking a row deleted.
    const DELETE_FLAG: Option<(&'static str, &'static str)> = None;

    fn fields(&self) -> &FieldStore;

    fn fields_mut(&mut self) -> &mut FieldStore;

    fn from_fields(fields: FieldStore) -> Self;

    fn key(&self) -> Vec<Value> {
        self.fields().values(Self::PRIMARY_KEY)
    }
}

/// Join table columns mediating a many-to-many relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Via {
    pub database: &'static str,
    pub table: &'static str,
    /// Local key columns
    pub key: &'static [&'static str],
    /// Join columns referencing the local key
    pub local: &'static [&'static str],
    /// Join columns referencing the remote key
    pub remote: &'static [&'static str],
}

#[derive(Debug, Clone)]
pub enum HasOne<T> {
    NotLoaded,
    Loaded(Option<Box<T>>),
}

impl<T> Default for HasOne<T> {
    fn default() -> Self {
        HasOne::NotLoaded
    }
}

impl<T> HasOne<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, HasOne::Loaded(_))
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            HasOne::Loaded(Some(item)) => Some(item),
            _ => None,
        }
    }

    pub fn set(&mut self, item: Option<T>) {
        *self = HasOne::Loaded(item.map(Box::new));
    }

    pub fn clear(&mut self) {
        *self = HasOne::NotLoaded;
    }
}

/// Lazily loaded child collection. Adding to an unloaded slot starts the
/// collection from the added item.
#[derive(Debug, Clone)]
pub enum HasMany<T> {
    NotLoaded,
    Loaded(Vec<T>),
}

impl<T> Default for HasMany<T> {
    fn default() -> Self {
        HasMany::NotLoaded
    }
}

impl<T> HasMany<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, HasMany::Loaded(_))
    }

    pub fn items(&self) -> &[T] {
        match self {
            HasMany::Loaded(items) => items,
            HasMany::NotLoaded => &[],
        }
    }

    pub fn set(&mut self, items: Vec<T>) {
        *self = HasMany::Loaded(items);
    }

    pub fn push(&mut self, item: T) {
        match self {
            HasMany::Loaded(items) => items.push(item),
            HasMany::NotLoaded => *self = HasMany::Loaded(vec![item]),
        }
    }

    pub fn clear(&mut self) {
        *self = HasMany::NotLoaded;
    }

    fn loaded_mut(&mut self) -> Option<&mut Vec<T>> {
        match self {
            HasMany::Loaded(items) => Some(items),
            HasMany::NotLoaded => None,
        }
    }
}

/// Lazily loaded many-to-many collection with its pending join rows.
#[derive(Debug, Clone)]
pub enum ManyToMany<T> {
    NotLoaded,
    Loaded { links: Vec<FieldStore>, items: Vec<T> },
}

impl<T> Default for ManyToMany<T> {
    fn default() -> Self {
        ManyToMany::NotLoaded
    }
}

impl<T> ManyToMany<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, ManyToMany::Loaded { .. })
    }

    pub fn items(&self) -> &[T] {
        match self {
            ManyToMany::Loaded { items, .. } => items,
            ManyToMany::NotLoaded => &[],
        }
    }

    pub fn links(&self) -> &[FieldStore] {
        match self {
            ManyToMany::Loaded { links, .. } => links,
            ManyToMany::NotLoaded => &[],
        }
    }

    pub fn set(&mut self, links: Vec<FieldStore>, items: Vec<T>) {
        *self = ManyToMany::Loaded { links, items };
    }

    pub fn clear(&mut self) {
        *self = ManyToMany::NotLoaded;
    }

    fn parts_mut(&mut self) -> (&mut Vec<FieldStore>, &mut Vec<T>) {
        match self {
            ManyToMany::Loaded { links, items } => (links, items),
            ManyToMany::NotLoaded => {
                self.set(Vec::new(), Vec::new());
                self.parts_mut()
            }
        }
    }
}

/// Equality conditions `to[i] = source[from[i]]`; `None` when a source value is null.
pub fn key_conditions(source: &FieldStore, from: &[&str], to: &[&str]) -> Option<Vec<Condition>> {
    from.iter()
        .zip(to)
        .map(|(f, t)| match source.get(f) {
            Some(value) if !value.is_null() => Some(Condition::eq(t, value.clone())),
            _ => None,
        })
        .collect()
}

pub fn assign(target: &mut FieldStore, columns: &[&str], values: &[Value]) {
    for (column, value) in columns.iter().zip(values) {
        target.set(column, value.clone());
    }
}

pub fn select<T: Entity>(loader: &dyn Loader, conditions: &[Condition]) -> Result<Vec<T>, RuntimeError> {
    Ok(loader
        .select(T::DATABASE, T::TABLE, conditions)?
        .into_iter()
        .map(T::from_fields)
        .collect())
}

/// Like [`select`], skipping rows carrying `T`'s delete flag.
pub fn select_live<T: Entity>(
    loader: &dyn Loader,
    conditions: &[Condition],
) -> Result<Vec<T>, RuntimeError> {
    let mut conditions = conditions.to_vec();
    if let Some((column, value)) = T::DELETE_FLAG {
        conditions.push(Condition::not_eq(column, value));
    }
    select(loader, &conditions)
}

pub fn load_has_one<'a, T: Entity>(
    slot: &'a mut HasOne<T>,
    loader: &dyn Loader,
    source: &FieldStore,
    foreign: &[&str],
) -> Result<Option<&'a T>, RuntimeError> {
    if !slot.is_loaded() {
        let found = match key_conditions(source, foreign, T::PRIMARY_KEY) {
            Some(conditions) => select::<T>(loader, &conditions)?.into_iter().next(),
            None => None,
        };
        slot.set(found);
    }
    Ok(slot.get())
}

/// Point `foreign` at `item`'s key, or null it when `item` is `None`.
pub fn set_has_one<T: Entity>(
    slot: &mut HasOne<T>,
    target: &mut FieldStore,
    foreign: &[&str],
    item: Option<T>,
) {
    let values = match &item {
        Some(item) => item.key(),
        None => vec![Value::Null; foreign.len()],
    };
    assign(target, foreign, &values);
    slot.set(item);
}

pub fn load_has_many<'a, T: Entity>(
    slot: &'a mut HasMany<T>,
    loader: &dyn Loader,
    source: &FieldStore,
    key: &[&str],
    foreign: &[&str],
) -> Result<&'a [T], RuntimeError> {
    if !slot.is_loaded() {
        let items = match key_conditions(source, key, foreign) {
            Some(conditions) => select_live::<T>(loader, &conditions)?,
            None => Vec::new(),
        };
        slot.set(items);
    }
    Ok(slot.items())
}

pub fn set_has_many<T: Entity>(
    slot: &mut HasMany<T>,
    source: &FieldStore,
    key: &[&str],
    foreign: &[&str],
    items: Vec<T>,
) {
    slot.set(items);
    cascade_has_many(slot, source, key, foreign);
}

pub fn add_has_many<T: Entity>(
    slot: &mut HasMany<T>,
    source: &FieldStore,
    key: &[&str],
    foreign: &[&str],
    mut item: T,
) {
    assign(item.fields_mut(), foreign, &source.values(key));
    slot.push(item);
}

/// Detach the loaded child whose key equals `item_key`, nulling its foreign key.
///
/// Keyless children all share the empty key and are never matched; remove
/// them by position with [`remove_has_many_at`].
pub fn remove_has_many<T: Entity>(
    slot: &mut HasMany<T>,
    foreign: &[&str],
    item_key: &[Value],
) -> Option<T> {
    if T::PRIMARY_KEY.is_empty() {
        return None;
    }
    let index = slot.items().iter().position(|item| item.key() == item_key)?;
    remove_has_many_at(slot, foreign, index)
}

/// Detach the loaded child at `index`, nulling its foreign key.
pub fn remove_has_many_at<T: Entity>(
    slot: &mut HasMany<T>,
    foreign: &[&str],
    index: usize,
) -> Option<T> {
    let items = slot.loaded_mut()?;
    if index >= items.len() {
        return None;
    }
    let mut item = items.remove(index);
    assign(item.fields_mut(), foreign, &vec![Value::Null; foreign.len()]);
    Some(item)
}

/// Copy `source`'s key into the foreign key of every loaded child.
/// Unloaded slots are left alone and the loader is never consulted.
pub fn cascade_has_many<T: Entity>(
    slot: &mut HasMany<T>,
    source: &FieldStore,
    key: &[&str],
    foreign: &[&str],
) {
    let values = source.values(key);
    if let Some(items) = slot.loaded_mut() {
        for item in items {
            assign(item.fields_mut(), foreign, &values);
        }
    }
}

pub fn load_many_to_many<'a, T: Entity>(
    slot: &'a mut ManyToMany<T>,
    loader: &dyn Loader,
    source: &FieldStore,
    via: &Via,
) -> Result<&'a [T], RuntimeError> {
    if !slot.is_loaded() {
        let (links, items) = match key_conditions(source, via.key, via.local) {
            Some(conditions) => {
                let links = loader.select(via.database, via.table, &conditions)?;
                let mut items = Vec::with_capacity(links.len());
                for link in &links {
                    if let Some(conditions) = key_conditions(link, via.remote, T::PRIMARY_KEY) {
                        items.extend(select_live::<T>(loader, &conditions)?);
                    }
                }
                (links, items)
            }
            None => (Vec::new(), Vec::new()),
        };
        slot.set(links, items);
    }
    Ok(slot.items())
}

fn link_row(source: &FieldStore, via: &Via, remote_key: &[Value]) -> FieldStore {
    let mut link = FieldStore::new();
    assign(&mut link, via.local, &source.values(via.key));
    assign(&mut link, via.remote, remote_key);
    link
}

pub fn set_many_to_many<T: Entity>(slot: &mut ManyToMany<T>, source: &FieldStore, via: &Via, items: Vec<T>) {
    let links = items.iter().map(|item| link_row(source, via, &item.key())).collect();
    slot.set(links, items);
}

/// Add `item` with a pending join row linking it to `source`.
pub fn add_many_to_many<T: Entity>(slot: &mut ManyToMany<T>, source: &FieldStore, via: &Via, item: T) {
    let link = link_row(source, via, &item.key());
    let (links, items) = slot.parts_mut();
    links.push(link);
    items.push(item);
}

/// Drop the item whose key equals `item_key` together with its join rows.
pub fn remove_many_to_many<T: Entity>(
    slot: &mut ManyToMany<T>,
    via: &Via,
    item_key: &[Value],
) -> Option<T> {
    if !slot.is_loaded() || T::PRIMARY_KEY.is_empty() {
        return None;
    }
    let (links, items) = slot.parts_mut();
    let index = items.iter().position(|item| item.key() == item_key)?;
    links.retain(|link| link.values(via.remote) != item_key);
    Some(items.remove(index))
}

/// Copy `source`'s key into the local columns of every loaded join row.
pub fn cascade_many_to_many<T>(slot: &mut ManyToMany<T>, source: &FieldStore, via: &Via) {
    let values = source.values(via.key);
    if let ManyToMany::Loaded { links, .. } = slot {
        for link in links {
            assign(link, via.local, &values);
        }
    }
}

/// In-memory [`Loader`] that counts the selects it serves.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    tables: RefCell<BTreeMap<(String, String), Vec<FieldStore>>>,
    calls: Cell<usize>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, database: &str, table: &str, row: FieldStore) {
        self.tables
            .borrow_mut()
            .entry((database.to_string(), table.to_string()))
            .or_default()
            .push(row);
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Loader for MemoryLoader {
    fn select(
        &self,
        database: &str,
        table: &str,
        conditions: &[Condition],
    ) -> Result<Vec<FieldStore>, RuntimeError> {
        self.calls.set(self.calls.get() + 1);
        let tables = self.tables.borrow();
        let rows = tables
            .get(&(database.to_string(), table.to_string()))
            .map(|rows| {
                rows.iter()
                    .filter(|row| conditions.iter().all(|c| c.matches(row)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }
}
