use crate::{AsValue, Error, Result, Value};

pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut first = true;
    for v in values {
        if !first {
            out.push_str(separator);
        }
        first = false;
        f(out, v);
    }
}

/// Builds a `<prefix> <op> (?,?,...,?)` condition together with its parameters.
///
/// ```rust
/// use tabula_core::{query_set, Value};
/// let (condition, params) = query_set("WHERE id", "IN", [3, 5]).unwrap();
/// assert_eq!(condition, "WHERE id IN (?,?)");
/// assert_eq!(params, [Value::Int32(Some(3)), Value::Int32(Some(5))]);
/// ```
pub fn query_set<T: AsValue>(
    prefix: &str,
    op: &str,
    values: impl IntoIterator<Item = T>,
) -> Result<(String, Vec<Value>)> {
    let params: Vec<Value> = values.into_iter().map(AsValue::as_value).collect();
    if params.is_empty() {
        return Err(Error::msg(format!(
            "Cannot build `{} {}` from an empty set of values",
            prefix, op
        )));
    }
    let mut condition = String::with_capacity(prefix.len() + op.len() + 4 + 2 * params.len());
    condition.push_str(prefix);
    condition.push(' ');
    condition.push_str(op);
    condition.push_str(" (");
    separated_by(&mut condition, &params, |out, _| out.push('?'), ",");
    condition.push(')');
    Ok((condition, params))
}

#[doc(hidden)]
pub fn char_boundary(value: &str, max: usize) -> usize {
    let mut end = max.min(value.len());
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    end
}

/// Formats a query for error messages and logs, cut after roughly 500 bytes.
#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        format_args!(
            "{}{}",
            &$query[..$crate::char_boundary(&$query, 497)].trim_end(),
            if $query.len() > 497 { "..." } else { "" },
        )
    };
}
