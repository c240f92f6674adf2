// Written once by dbclassgen. Add modules for new tables here.

pub mod author;
pub mod book;
