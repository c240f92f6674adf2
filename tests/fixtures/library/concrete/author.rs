// Starter class for lib.author, created once by dbclassgen and never overwritten.
// Add custom behavior here; the generated base is reachable through `Deref`.

use std::ops::{Deref, DerefMut};

use super::super::generated::author::AuthorGenerated;

#[derive(Debug, Clone, Default)]
pub struct Author(pub(crate) AuthorGenerated);

impl Author {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Deref for Author {
    type Target = AuthorGenerated;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Author {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<AuthorGenerated> for Author {
    fn from(generated: AuthorGenerated) -> Self {
        Self(generated)
    }
}
