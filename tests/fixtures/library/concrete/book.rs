// Starter class for lib.book, created once by dbclassgen and never overwritten.
// Add custom behavior here; the generated base is reachable through `Deref`.

use std::ops::{Deref, DerefMut};

use super::super::generated::book::BookGenerated;

#[derive(Debug, Clone, Default)]
pub struct Book(pub(crate) BookGenerated);

impl Book {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Deref for Book {
    type Target = BookGenerated;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Book {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<BookGenerated> for Book {
    fn from(generated: BookGenerated) -> Self {
        Self(generated)
    }
}
