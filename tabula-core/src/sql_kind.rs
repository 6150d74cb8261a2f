use std::fmt::{self, Display};

/// SQL type classification of a record field.
///
/// The variants map one to one on the column type words written in the DDL,
/// see [`SqlKind::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlKind {
    Boolean,
    TinyInt,
    UnsignedTinyInt,
    SmallInt,
    UnsignedSmallInt,
    Integer,
    UnsignedInteger,
    Int,
    UnsignedInt,
    BigInt,
    UnsignedBigInt,
    Float,
    Double,
    Text,
    Blob,
}

impl SqlKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SqlKind::Boolean => "BOOLEAN",
            SqlKind::TinyInt => "TINYINT",
            SqlKind::UnsignedTinyInt => "UNSIGNED TINYINT",
            SqlKind::SmallInt => "SMALLINT",
            SqlKind::UnsignedSmallInt => "UNSIGNED SMALLINT",
            SqlKind::Integer => "INTEGER",
            SqlKind::UnsignedInteger => "UNSIGNED INTEGER",
            SqlKind::Int => "INT",
            SqlKind::UnsignedInt => "UNSIGNED INT",
            SqlKind::BigInt => "BIGINT",
            SqlKind::UnsignedBigInt => "UNSIGNED BIGINT",
            SqlKind::Float => "FLOAT",
            SqlKind::Double => "DOUBLE",
            SqlKind::Text => "TEXT",
            SqlKind::Blob => "BLOB",
        }
    }
}

impl Display for SqlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
