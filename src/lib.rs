//! Map typed records onto rows of an embedded SQL table.
//!
//! `#[derive(Record)]` registers the column layout of a struct once, the SQL of
//! every statement (`CREATE TABLE`, `REPLACE INTO`, `SELECT`, ...) is derived from it.
//! The engine binding (`tabula-sqlite`) executes the statements and caches them.

pub use tabula_core::*;
pub use tabula_macros::*;
