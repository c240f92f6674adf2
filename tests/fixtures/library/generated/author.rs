// @generated by dbclassgen from lib.author. Do not edit: this file is rewritten
// on every run. Customize `Author` in its starter module instead.
//
// column | type | size | null | default | key
// -------+------+------+------+---------+----
// id     | int  |      | no   |         | PK
// name   | text |      | yes  |         |
//
// relationships:
//   has_many lib.book (id -> author_id) [inferred]

use dbclassgen::runtime as rt;

use super::super::concrete::author::Author;
use super::super::concrete::book::Book;

/// Generated base of [`Author`].
#[derive(Debug, Clone, Default)]
pub struct AuthorGenerated {
    fields: rt::FieldStore,
    book_collection: rt::HasMany<Book>,
}

impl AuthorGenerated {
    pub const DATABASE: &'static str = "lib";
    pub const TABLE: &'static str = "author";
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

    pub fn get_name(&self) -> Option<&rt::Value> {
        self.fields.get("name")
    }

    pub fn set_name(&mut self, value: impl Into<rt::Value>) {
        self.fields.set("name", value);
    }

    pub fn load_book_collection(&mut self, loader: &dyn rt::Loader) -> Result<&[Book], rt::RuntimeError> {
        rt::load_has_many(&mut self.book_collection, loader, &self.fields, &["id"], &["author_id"])
    }

    pub fn get_book_collection(&self) -> &[Book] {
        self.book_collection.items()
    }

    pub fn set_book_collection(&mut self, items: Vec<Book>) {
        rt::set_has_many(&mut self.book_collection, &self.fields, &["id"], &["author_id"], items);
    }

    pub fn add_book(&mut self, item: Book) {
        rt::add_has_many(&mut self.book_collection, &self.fields, &["id"], &["author_id"], item);
    }

    pub fn remove_book(&mut self, key: &[rt::Value]) -> Option<Book> {
        rt::remove_has_many(&mut self.book_collection, &["author_id"], key)
    }

    /// Copy the current key into loaded children and pending join rows.
    fn on_key_change(&mut self) {
        rt::cascade_has_many(&mut self.book_collection, &self.fields, &["id"], &["author_id"]);
    }
}

impl rt::Entity for Author {
    const DATABASE: &'static str = AuthorGenerated::DATABASE;
    const TABLE: &'static str = AuthorGenerated::TABLE;
    const PRIMARY_KEY: &'static [&'static str] = AuthorGenerated::PRIMARY_KEY;
    const DELETE_FLAG: Option<(&'static str, &'static str)> = AuthorGenerated::DELETE_FLAG;

    fn fields(&self) -> &rt::FieldStore {
        &self.0.fields
    }

    fn fields_mut(&mut self) -> &mut rt::FieldStore {
        &mut self.0.fields
    }

    fn from_fields(fields: rt::FieldStore) -> Self {
        Self(AuthorGenerated::from_fields(fields))
    }
}
