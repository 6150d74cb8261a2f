use crate::{Error, Result, SqlKind, Value};
use std::{any, time::Duration};

/// Conversion between native Rust types and the dynamically typed [`Value`].
///
/// It is also the compile time source of the column descriptor: `KIND` and
/// `NULLABLE` are read by `#[derive(Record)]` to build the field list of a
/// record without inspecting it at runtime.
///
/// # Examples
/// ```rust
/// use tabula_core::{AsValue, SqlKind, Value};
/// let v = 42i32.as_value();
/// assert!(matches!(v, Value::Int32(Some(42))));
/// assert_eq!(<i32 as AsValue>::KIND, SqlKind::Int);
/// let n: i32 = AsValue::try_from_value(v).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue {
    /// Column kind used in the DDL.
    const KIND: SqlKind;
    /// Whether the column accepts NULL.
    const NULLABLE: bool = false;
    /// A NULL of the variant used by this type.
    fn as_empty_value() -> Value;
    fn as_value(self) -> Value;
    /// Attempt to convert a dynamic [`Value`] into `Self`.
    ///
    /// Accepts the canonical variant and, for numbers, any other numeric
    /// variant that fits the target range. Values coming from the engine are
    /// usually widened (`Int64`, `Float64`), the range check makes the
    /// narrowing explicit.
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
}

/// A location a column value is scanned into.
pub trait ScanTarget {
    fn assign(&mut self, value: Value) -> Result<()>;
}

impl<T: AsValue> ScanTarget for T {
    fn assign(&mut self, value: Value) -> Result<()> {
        *self = T::try_from_value(value)?;
        Ok(())
    }
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(Some(value.into()))
    }
}

fn as_integer(value: &Value) -> Option<i128> {
    Some(match *value {
        Value::Int8(Some(v)) => v as i128,
        Value::Int16(Some(v)) => v as i128,
        Value::Int32(Some(v)) => v as i128,
        Value::Int64(Some(v)) => v as i128,
        Value::UInt8(Some(v)) => v as i128,
        Value::UInt16(Some(v)) => v as i128,
        Value::UInt32(Some(v)) => v as i128,
        Value::UInt64(Some(v)) => v as i128,
        _ => return None,
    })
}

fn conversion_error<T>(value: &Value) -> Error {
    Error::msg(format!(
        "Cannot convert {:?} to {}",
        value,
        any::type_name::<T>()
    ))
}

macro_rules! impl_as_value {
    ($source:ty, $destination:path, $kind:expr) => {
        impl AsValue for $source {
            const KIND: SqlKind = $kind;
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self as _))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                if let $destination(Some(v)) = value {
                    return Ok(v as _);
                }
                let Some(v) = as_integer(&value) else {
                    return Err(conversion_error::<Self>(&value));
                };
                if v < <$source>::MIN as i128 || v > <$source>::MAX as i128 {
                    return Err(Error::msg(format!(
                        "Value {} is out of range for {}",
                        v,
                        any::type_name::<Self>(),
                    )));
                }
                Ok(v as _)
            }
        }
    };
}

impl_as_value!(i8, Value::Int8, SqlKind::TinyInt);
impl_as_value!(i16, Value::Int16, SqlKind::SmallInt);
impl_as_value!(i32, Value::Int32, SqlKind::Int);
impl_as_value!(i64, Value::Int64, SqlKind::BigInt);
impl_as_value!(isize, Value::Int64, SqlKind::Integer);
impl_as_value!(u8, Value::UInt8, SqlKind::UnsignedTinyInt);
impl_as_value!(u16, Value::UInt16, SqlKind::UnsignedSmallInt);
impl_as_value!(u32, Value::UInt32, SqlKind::UnsignedInt);
impl_as_value!(u64, Value::UInt64, SqlKind::UnsignedBigInt);
impl_as_value!(usize, Value::UInt64, SqlKind::UnsignedInteger);

impl AsValue for bool {
    const KIND: SqlKind = SqlKind::Boolean;
    fn as_empty_value() -> Value {
        Value::Boolean(None)
    }
    fn as_value(self) -> Value {
        Value::Boolean(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if let Value::Boolean(Some(v)) = value {
            return Ok(v);
        }
        as_integer(&value)
            .map(|v| v != 0)
            .ok_or_else(|| conversion_error::<Self>(&value))
    }
}

impl AsValue for f32 {
    const KIND: SqlKind = SqlKind::Float;
    fn as_empty_value() -> Value {
        Value::Float32(None)
    }
    fn as_value(self) -> Value {
        Value::Float32(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float32(Some(v)) => Ok(v),
            Value::Float64(Some(v)) => Ok(v as _),
            _ => as_integer(&value)
                .map(|v| v as _)
                .ok_or_else(|| conversion_error::<Self>(&value)),
        }
    }
}

impl AsValue for f64 {
    const KIND: SqlKind = SqlKind::Double;
    fn as_empty_value() -> Value {
        Value::Float64(None)
    }
    fn as_value(self) -> Value {
        Value::Float64(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float64(Some(v)) => Ok(v),
            Value::Float32(Some(v)) => Ok(v as _),
            _ => as_integer(&value)
                .map(|v| v as _)
                .ok_or_else(|| conversion_error::<Self>(&value)),
        }
    }
}

impl AsValue for String {
    const KIND: SqlKind = SqlKind::Text;
    fn as_empty_value() -> Value {
        Value::Varchar(None)
    }
    fn as_value(self) -> Value {
        Value::Varchar(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Varchar(Some(v)) => Ok(v),
            Value::Blob(Some(v)) => String::from_utf8(v.into_vec())
                .map_err(|e| Error::new(e).context("The blob is not a valid UTF-8 string")),
            _ => Err(conversion_error::<Self>(&value)),
        }
    }
}

/// Byte sequences are nullable: a NULL column is read back as an empty vector.
impl AsValue for Vec<u8> {
    const KIND: SqlKind = SqlKind::Blob;
    const NULLABLE: bool = true;
    fn as_empty_value() -> Value {
        Value::Blob(None)
    }
    fn as_value(self) -> Value {
        Value::Blob(Some(self.into_boxed_slice()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Blob(Some(v)) => Ok(v.into_vec()),
            Value::Varchar(Some(v)) => Ok(v.into_bytes()),
            _ if value.is_null() => Ok(Vec::new()),
            _ => Err(conversion_error::<Self>(&value)),
        }
    }
}

/// Target of a repeated text field: a value is read as a one element
/// sequence, NULL as an empty one.
impl ScanTarget for Vec<String> {
    fn assign(&mut self, value: Value) -> Result<()> {
        if value.is_null() {
            self.clear();
            return Ok(());
        }
        *self = vec![String::try_from_value(value)?];
        Ok(())
    }
}

/// Stored as a count of nanoseconds.
///
/// Durations longer than `i64::MAX` nanoseconds (about 292 years) are clamped
/// to it with a warning, they do not read back to the same value.
impl AsValue for Duration {
    const KIND: SqlKind = SqlKind::BigInt;
    fn as_empty_value() -> Value {
        Value::Int64(None)
    }
    fn as_value(self) -> Value {
        let nanos = i64::try_from(self.as_nanos()).unwrap_or_else(|_| {
            log::warn!(
                "The duration {:?} does not fit a 64 bit count of nanoseconds, storing {}",
                self,
                i64::MAX
            );
            i64::MAX
        });
        Value::Int64(Some(nanos))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        let nanos = i64::try_from_value(value)?;
        let nanos = u64::try_from(nanos).map_err(|_| {
            Error::msg(format!("Cannot convert {} nanoseconds to a Duration", nanos))
        })?;
        Ok(Duration::from_nanos(nanos))
    }
}

impl<T: AsValue> AsValue for Option<T> {
    const KIND: SqlKind = T::KIND;
    const NULLABLE: bool = true;
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => T::as_empty_value(),
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(T::try_from_value(value)?))
    }
}
