use crate::{FieldDef, separated_by};

/// Builds the SQL text of every statement issued by the data layer.
///
/// All the methods append to `out` and terminate the statement with `;`.
/// Conditions are raw SQL fragments (`WHERE id = ?`, `ORDER BY name`) copied
/// verbatim after the table name, the caller is responsible for them.
/// Column names are written as they are declared.
///
/// Dialects override [`SqlWriter::write_table_name`] and
/// [`SqlWriter::write_list_tables`].
pub trait SqlWriter {
    fn write_escaped(&self, out: &mut String, value: &str, search: char, replace: &str) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    fn write_table_name(&self, out: &mut String, table: &str) {
        out.push('"');
        self.write_escaped(out, table, '"', r#""""#);
        out.push('"');
    }

    fn write_condition(&self, out: &mut String, condition: &str) {
        let condition = condition.trim();
        if !condition.is_empty() {
            out.push(' ');
            out.push_str(condition);
        }
    }

    /// `CREATE TABLE IF NOT EXISTS`, the first field is the primary key.
    ///
    /// The extra DDL of the primary key field is not written, `additional`
    /// clauses (constraints like `FOREIGN KEY(...)`) follow the columns.
    fn write_create_table(
        &self,
        out: &mut String,
        table: &str,
        fields: &[FieldDef],
        additional: &[&str],
    ) {
        out.push_str("CREATE TABLE IF NOT EXISTS ");
        self.write_table_name(out, table);
        out.push_str(" (");
        separated_by(
            out,
            fields.iter().enumerate(),
            |out, (i, field)| {
                self.write_column_definition(out, field);
                if i == 0 {
                    out.push_str(" PRIMARY KEY");
                } else if !field.extra.is_empty() {
                    out.push(' ');
                    out.push_str(field.extra);
                }
            },
            ", ",
        );
        for clause in additional.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
            out.push_str(", ");
            out.push_str(clause);
        }
        out.push_str(");");
    }

    fn write_column_definition(&self, out: &mut String, field: &FieldDef) {
        out.push_str(field.name);
        out.push(' ');
        out.push_str(field.kind.as_str());
        out.push(' ');
        out.push_str(field.nullability());
    }

    /// `REPLACE INTO` when `replace` (upsert), `INSERT INTO` otherwise.
    fn write_insert(&self, out: &mut String, table: &str, columns: &[String], replace: bool) {
        out.push_str(if replace {
            "REPLACE INTO "
        } else {
            "INSERT INTO "
        });
        self.write_table_name(out, table);
        out.push_str(" (");
        separated_by(out, columns, |out, v| out.push_str(v), ", ");
        out.push_str(") VALUES (");
        separated_by(out, columns, |out, _| out.push('?'), ", ");
        out.push_str(");");
    }

    fn write_select(&self, out: &mut String, table: &str, condition: &str) {
        out.push_str("SELECT * FROM ");
        self.write_table_name(out, table);
        self.write_condition(out, condition);
        out.push(';');
    }

    /// A query returning the columns of `table` and no row.
    fn write_probe(&self, out: &mut String, table: &str) {
        self.write_select(out, table, "LIMIT 0");
    }

    fn write_delete(&self, out: &mut String, table: &str, condition: &str) {
        out.push_str("DELETE FROM ");
        self.write_table_name(out, table);
        self.write_condition(out, condition);
        out.push(';');
    }

    fn write_drop_table(&self, out: &mut String, table: &str) {
        out.push_str("DROP TABLE ");
        self.write_table_name(out, table);
        out.push(';');
    }

    fn write_count(&self, out: &mut String, table: &str) {
        out.push_str("SELECT COUNT(1) FROM ");
        self.write_table_name(out, table);
        out.push(';');
    }

    /// Condition selecting `limit` random rows.
    fn write_random_order(&self, out: &mut String, limit: u32) {
        out.push_str("ORDER BY RANDOM() LIMIT ");
        out.push_str(&limit.to_string());
    }

    /// Names of the user tables, in lexicographic order.
    fn write_list_tables(&self, out: &mut String) {
        out.push_str(
            "SELECT table_name FROM information_schema.tables WHERE table_type='BASE TABLE' ORDER BY table_name;",
        );
    }
}
