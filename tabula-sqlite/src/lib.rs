mod cbox;
mod connection;
mod database;
mod error;
mod extract;
mod prepared;
mod sql_writer;

pub(crate) use cbox::*;
pub use connection::*;
pub use database::*;
pub use error::*;
pub use prepared::*;
pub use sql_writer::*;
