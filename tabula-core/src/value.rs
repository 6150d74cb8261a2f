use crate::SqlKind;

/// Dynamically typed value moved between records and the engine.
///
/// Every typed variant carries an `Option`: `None` is a typed NULL, it keeps
/// the information about the kind of the column it belongs to.
#[derive(Default, Debug, Clone)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int8(Option<i8>),
    Int16(Option<i16>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    UInt8(Option<u8>),
    UInt16(Option<u16>),
    UInt32(Option<u32>),
    UInt64(Option<u64>),
    Float32(Option<f32>),
    Float64(Option<f64>),
    Varchar(Option<String>),
    Blob(Option<Box<[u8]>>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            Value::Null
                | Value::Boolean(None)
                | Value::Int8(None)
                | Value::Int16(None)
                | Value::Int32(None)
                | Value::Int64(None)
                | Value::UInt8(None)
                | Value::UInt16(None)
                | Value::UInt32(None)
                | Value::UInt64(None)
                | Value::Float32(None)
                | Value::Float64(None)
                | Value::Varchar(None)
                | Value::Blob(None)
        )
    }

    pub fn same_type(&self, other: &Self) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }

    /// The closest column kind for this value, `None` for an untyped NULL.
    pub fn kind(&self) -> Option<SqlKind> {
        Some(match self {
            Value::Null => return None,
            Value::Boolean(..) => SqlKind::Boolean,
            Value::Int8(..) => SqlKind::TinyInt,
            Value::Int16(..) => SqlKind::SmallInt,
            Value::Int32(..) => SqlKind::Int,
            Value::Int64(..) => SqlKind::BigInt,
            Value::UInt8(..) => SqlKind::UnsignedTinyInt,
            Value::UInt16(..) => SqlKind::UnsignedSmallInt,
            Value::UInt32(..) => SqlKind::UnsignedInt,
            Value::UInt64(..) => SqlKind::UnsignedBigInt,
            Value::Float32(..) => SqlKind::Float,
            Value::Float64(..) => SqlKind::Double,
            Value::Varchar(..) => SqlKind::Text,
            Value::Blob(..) => SqlKind::Blob,
        })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(l), Self::Boolean(r)) => l == r,
            (Self::Int8(l), Self::Int8(r)) => l == r,
            (Self::Int16(l), Self::Int16(r)) => l == r,
            (Self::Int32(l), Self::Int32(r)) => l == r,
            (Self::Int64(l), Self::Int64(r)) => l == r,
            (Self::UInt8(l), Self::UInt8(r)) => l == r,
            (Self::UInt16(l), Self::UInt16(r)) => l == r,
            (Self::UInt32(l), Self::UInt32(r)) => l == r,
            (Self::UInt64(l), Self::UInt64(r)) => l == r,
            (Self::Float32(l), Self::Float32(r)) => l == r,
            (Self::Float64(l), Self::Float64(r)) => l == r,
            (Self::Varchar(l), Self::Varchar(r)) => l == r,
            (Self::Blob(l), Self::Blob(r)) => l == r,
            _ => self.same_type(other),
        }
    }
}
