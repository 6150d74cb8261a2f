use libsqlite3_sys::*;
use std::{
    ffi::{CStr, c_int},
    slice,
};
use tabula_core::{Context, Error, Result, Value};

pub(crate) fn extract_value(statement: *mut sqlite3_stmt, index: c_int) -> Result<Value> {
    unsafe {
        let column_type = sqlite3_column_type(statement, index);
        Ok(match column_type {
            SQLITE_NULL => Value::Null,
            SQLITE_INTEGER => Value::Int64(Some(sqlite3_column_int64(statement, index))),
            SQLITE_FLOAT => Value::Float64(Some(sqlite3_column_double(statement, index))),
            SQLITE_BLOB => {
                // The pointer is null for a zero length blob
                let ptr = sqlite3_column_blob(statement, index) as *const u8;
                let len = sqlite3_column_bytes(statement, index) as usize;
                let bytes = if ptr.is_null() || len == 0 {
                    &[][..]
                } else {
                    slice::from_raw_parts(ptr, len)
                };
                Value::Blob(Some(bytes.into()))
            }
            SQLITE_TEXT => {
                let ptr = sqlite3_column_text(statement, index);
                let len = sqlite3_column_bytes(statement, index) as usize;
                let bytes = if ptr.is_null() || len == 0 {
                    &[][..]
                } else {
                    slice::from_raw_parts(ptr, len)
                };
                let text = String::from_utf8(bytes.to_vec())
                    .with_context(|| format!("Column {} is not a valid UTF-8 string", index))?;
                Value::Varchar(Some(text))
            }
            _ => {
                return Err(Error::msg(format!(
                    "Unexpected column type {}",
                    column_type
                )));
            }
        })
    }
}

pub(crate) fn extract_name(statement: *mut sqlite3_stmt, index: c_int) -> Result<String> {
    unsafe {
        let name = sqlite3_column_name(statement, index);
        if name.is_null() {
            return Err(Error::msg(format!(
                "Could not read the name of column {}",
                index
            )));
        }
        Ok(CStr::from_ptr(name).to_str()?.into())
    }
}
