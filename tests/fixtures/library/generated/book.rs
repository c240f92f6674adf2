// @generated by dbclassgen from lib.book. Do not edit: this file is rewritten
// on every run. Customize `Book` in its starter module instead.
//
// column    | type | size | null | default | key
// ----------+------+------+------+---------+----
// id        | int  |      | no   |         | PK
// author_id | int  |      | yes  |         | FK
// title     | text |      | yes  |         |
//
// relationships:
//   has_one lib.author (author_id -> id) [inferred]

use dbclassgen::runtime as rt;

use super::super::concrete::author::Author;
use super::super::concrete::book::Book;

/// Generated base of [`Book`].
#[derive(Debug, Clone, Default)]
pub struct BookGenerated {
    fields: rt::FieldStore,
    author: rt::HasOne<Author>,
}

impl BookGenerated {
    pub const DATABASE: &'static str = "lib";
    pub const TABLE: &'static str = "book";
    pub const PRIMARY_KEY: &'static [&'static str] = &["id"];
    pub const DELETE_FLAG: Option<(&'static str, &'static str)> = None;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: rt::FieldStore) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    pub fn fields(&self) -> &rt::FieldStore {
        &self.fields
    }

    pub fn get_id(&self) -> Option<&rt::Value> {
        self.fields.get("id")
    }

    pub fn set_id(&mut self, value: impl Into<rt::Value>) {
        self.fields.set("id", value);
        self.on_key_change();
    }

    pub fn get_author_id(&self) -> Option<&rt::Value> {
        self.fields.get("author_id")
    }

    pub fn set_author_id(&mut self, value: impl Into<rt::Value>) {
        self.fields.set("author_id", value);
        self.author.clear();
    }

    pub fn get_title(&self) -> Option<&rt::Value> {
        self.fields.get("title")
    }

    pub fn set_title(&mut self, value: impl Into<rt::Value>) {
        self.fields.set("title", value);
    }

    pub fn load_author(&mut self, loader: &dyn rt::Loader) -> Result<Option<&Author>, rt::RuntimeError> {
        rt::load_has_one(&mut self.author, loader, &self.fields, &["author_id"])
    }

    pub fn get_author(&self) -> Option<&Author> {
        self.author.get()
    }

    pub fn set_author(&mut self, value: Option<Author>) {
        rt::set_has_one(&mut self.author, &mut self.fields, &["author_id"], value);
    }

    /// Copy the current key into loaded children and pending join rows.
    fn on_key_change(&mut self) {
    }
}

impl rt::Entity for Book {
    const DATABASE: &'static str = BookGenerated::DATABASE;
    const TABLE: &'static str = BookGenerated::TABLE;
    const PRIMARY_KEY: &'static [&'static str] = BookGenerated::PRIMARY_KEY;
    const DELETE_FLAG: Option<(&'static str, &'static str)> = BookGenerated::DELETE_FLAG;

    fn fields(&self) -> &rt::FieldStore {
        &self.0.fields
    }

    fn fields_mut(&mut self) -> &mut rt::FieldStore {
        &mut self.0.fields
    }

    fn from_fields(fields: rt::FieldStore) -> Self {
        Self(BookGenerated::from_fields(fields))
    }
}
