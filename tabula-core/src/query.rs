use crate::Value;
use std::sync::Arc;

/// Metadata about modify operations (INSERT/REPLACE/DELETE).
///
/// Both values describe the execution that returned them, even when other
/// threads write through the same connection.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowsAffected {
    /// Total number of rows impacted.
    pub rows_affected: u64,
    /// Row id of the most recent successful insert on the connection, when available.
    pub last_affected_id: Option<i64>,
}

/// Shared reference-counted column name list.
pub type RowNames = Arc<[String]>;
/// Owned row values, in column order.
pub type Row = Box<[Value]>;

/// Builds a parameter slice for a query, converting each argument into a [`Value`].
///
/// ```rust
/// use tabula_core::{params, Value};
/// let params = params![1, "two", None::<f64>];
/// assert_eq!(params.len(), 3);
/// assert_eq!(params[1], Value::Varchar(Some("two".into())));
/// ```
#[macro_export]
macro_rules! params {
    () => {
        [] as [$crate::Value; 0]
    };
    ($($param:expr),+ $(,)?) => {
        [$($crate::Value::from($param)),+]
    };
}
