use crate::SqlKind;
use std::fmt::{self, Display};

/// Descriptor of one record field, the column it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Column name.
    pub name: &'static str,
    pub kind: SqlKind,
    pub nullable: bool,
    /// Additional DDL appended after the column type, for example `UNIQUE`.
    pub extra: &'static str,
}

impl FieldDef {
    pub const fn new(name: &'static str, kind: SqlKind, nullable: bool) -> Self {
        Self {
            name,
            kind,
            nullable,
            extra: "",
        }
    }

    pub const fn with_extra(mut self, extra: &'static str) -> Self {
        self.extra = extra;
        self
    }

    pub const fn nullability(&self) -> &'static str {
        if self.nullable { "NULL" } else { "NOT NULL" }
    }
}

/// Writes `<name> <KIND> NULL|NOT NULL`, the extra DDL is not included.
impl Display for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.kind, self.nullability())
    }
}
