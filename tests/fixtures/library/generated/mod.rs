// @generated by dbclassgen. Do not edit.

pub mod author;
pub mod book;
