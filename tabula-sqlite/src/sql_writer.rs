use tabula_core::SqlWriter;

/// SQLite dialect of the statements.
///
/// A table name starting with a digit is bracket quoted (`[10x]`), any other is
/// single quoted (`'users'`), SQLite accepts both as identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteSqlWriter;

impl SqlWriter for SqliteSqlWriter {
    fn write_table_name(&self, out: &mut String, table: &str) {
        if table.starts_with(|c: char| c.is_ascii_digit()) {
            if table.contains(']') {
                // Brackets have no escape sequence
                out.push('"');
                self.write_escaped(out, table, '"', r#""""#);
                out.push('"');
            } else {
                out.push('[');
                out.push_str(table);
                out.push(']');
            }
        } else {
            out.push('\'');
            self.write_escaped(out, table, '\'', "''");
            out.push('\'');
        }
    }

    fn write_list_tables(&self, out: &mut String) {
        out.push_str("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name;");
    }
}
