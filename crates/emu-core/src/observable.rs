//! Observability trait for inspecting component state.
//!
//! Debuggers and tests look at the machine through string paths such as
//! `cpu.a` or `bank.altzp`. Queries never affect emulation state.

use std::fmt;

/// A dynamically-typed value returned by a state query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    U8(u8),
    U16(u16),
    U64(u64),
    String(String),
    Array(Vec<Value>),
}

impl Value {
    /// Widen any numeric variant. Returns `None` for non-numeric values.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U8(v) => Some(u64::from(*v)),
            Value::U16(v) => Some(u64::from(*v)),
            Value::U64(v) => Some(*v),
            Value::Bool(v) => Some(u64::from(*v)),
            Value::String(_) | Value::Array(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "${v:02X}"),
            Value::U16(v) => write!(f, "${v:04X}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
            Value::Array(arr) => {
                write!(f, "[")?;
                for (i, v) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::U8(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::U16(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

/// A component whose state can be inspected.
pub trait Observable {
    /// Query a specific property by dotted path, e.g. `flags.z`.
    ///
    /// Returns `None` if the path is not recognised.
    fn query(&self, path: &str) -> Option<Value>;

    /// List all paths accepted by `query()`.
    fn query_paths(&self) -> &'static [&'static str];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_hex_for_bytes_and_words() {
        assert_eq!(Value::U8(0x0A).to_string(), "$0A");
        assert_eq!(Value::U16(0xC08B).to_string(), "$C08B");
        assert_eq!(
            Value::Array(vec![Value::Bool(true), Value::U64(3)]).to_string(),
            "[true, 3]"
        );
    }

    #[test]
    fn as_u64_widens_numbers_only() {
        assert_eq!(Value::U16(0x1FF).as_u64(), Some(0x1FF));
        assert_eq!(Value::from("x").as_u64(), None);
    }
}
