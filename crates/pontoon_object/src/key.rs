//! Hashable keys for maps and sets.

use core::fmt;

/// A map key or set member.
///
/// Keys are rendered to strings when a map is serialized, the same way a
/// JSON encoder coerces non-string keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// The null key, rendered as `"null"`.
    Null,
    /// A boolean key, rendered as `"true"` or `"false"`.
    Bool(bool),
    /// An integer key, rendered as its decimal digits.
    Int(i64),
    /// A string key, rendered as itself.
    Str(String),
}

impl Key {
    /// Returns the string form used as a JSON object key.
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Returns the key as a JSON value, used for set members.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Str(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&String> for Key {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

impl From<bool> for Key {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Key {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl<K: Into<Key>> From<Option<K>> for Key {
    fn from(value: Option<K>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_render_like_json_key_coercion() {
        assert_eq!(Key::Null.render(), "null");
        assert_eq!(Key::Bool(true).render(), "true");
        assert_eq!(Key::Bool(false).render(), "false");
        assert_eq!(Key::Int(-7).render(), "-7");
        assert_eq!(Key::from("name").render(), "name");
    }

    #[test]
    fn set_members_keep_their_json_type() {
        assert_eq!(Key::Int(3).to_value(), serde_json::json!(3));
        assert_eq!(Key::Null.to_value(), serde_json::Value::Null);
        assert_eq!(Key::from(None::<&str>), Key::Null);
    }
}
