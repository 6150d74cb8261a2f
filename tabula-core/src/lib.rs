mod as_value;
mod error;
mod field_def;
mod prepared_cache;
mod query;
mod record;
mod sql_kind;
mod sql_writer;
mod util;
mod value;

pub use ::anyhow::Context;
pub use as_value::*;
pub use error::*;
pub use field_def::*;
pub use prepared_cache::*;
pub use query::*;
pub use record::*;
pub use sql_kind::*;
pub use sql_writer::*;
pub use util::*;
pub use value::*;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
