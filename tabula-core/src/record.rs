use crate::{Error, FieldDef, Result, Row, ScanTarget};

/// A typed structure that maps onto one row of a table.
///
/// Usually derived with `#[derive(Record)]`. All three views of the record
/// (field descriptors, outbound values and inbound scan targets) follow the
/// declared field order, the first field is the primary key.
///
/// ```rust,ignore
/// #[derive(Record, Default)]
/// struct User {
///     id: Option<isize>,
///     #[tabula(extra = "UNIQUE")]
///     email: String,
///     tags: Vec<String>,
/// }
/// ```
pub trait Record {
    fn fields() -> &'static [FieldDef];

    /// Current field values, used as the parameters of an insert.
    fn values(&self) -> Row;

    /// Locations the columns of a row are scanned into.
    ///
    /// A `Vec<String>` field is overwritten by the scan with a one-element
    /// vector, or an empty one when the column is NULL.
    fn targets(&mut self) -> Vec<&mut dyn ScanTarget>;

    fn column_names() -> impl ExactSizeIterator<Item = &'static str> {
        Self::fields().iter().map(|f| f.name)
    }

    /// Scans `row` into the record, column by column.
    ///
    /// Stops at the first column that cannot be converted, the columns before it
    /// keep the new value.
    fn scan(&mut self, row: Row) -> Result<()> {
        let mut targets = self.targets();
        if targets.len() != row.len() {
            return Err(Error::msg(format!(
                "Expected {} columns to scan into the record, the row has {}",
                targets.len(),
                row.len()
            )));
        }
        for (i, (target, value)) in targets.iter_mut().zip(row.into_vec()).enumerate() {
            target
                .assign(value)
                .map_err(|e| e.context(format!("While scanning column {}", i)))?;
        }
        Ok(())
    }
}
