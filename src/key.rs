//! Index keys
//!
//! A key is either text or a number. The two never compare equal, so `123`
//! and `"123"` are distinct keys even though they print the same way.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShardexError};

/// A caller supplied key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    /// A numeric key (must be finite)
    Number(f64),

    /// A text key (must be non-empty after trimming)
    Text(String),
}

impl Key {
    /// Check the validity rule, returning the key unchanged when it holds
    pub fn validate(self) -> Result<Self> {
        if self.is_valid() {
            return Ok(self);
        }
        match self {
            Key::Number(n) => Err(ShardexError::InvalidKey(format!("non-finite number {}", n))),
            Key::Text(_) => Err(ShardexError::InvalidKey("empty text key".to_string())),
        }
    }

    /// Whether the key satisfies the validity rule
    pub fn is_valid(&self) -> bool {
        match self {
            Key::Number(n) => n.is_finite(),
            Key::Text(s) => !s.trim().is_empty(),
        }
    }

    /// Bit pattern used for numeric equality; `-0.0` folds onto `0.0`
    fn number_bits(n: f64) -> u64 {
        if n == 0.0 {
            0.0f64.to_bits()
        } else {
            n.to_bits()
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::Number(a), Key::Number(b)) => Self::number_bits(*a) == Self::number_bits(*b),
            (Key::Text(a), Key::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Key::Number(n) => {
                0u8.hash(state);
                Self::number_bits(*n).hash(state);
            }
            Key::Text(s) => {
                1u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Number(n) => write!(f, "{}", f64::from_bits(Self::number_bits(*n))),
            Key::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Text(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Text(s)
    }
}

impl From<&String> for Key {
    fn from(s: &String) -> Self {
        Key::Text(s.clone())
    }
}

impl From<f64> for Key {
    fn from(n: f64) -> Self {
        Key::Number(n)
    }
}

impl From<i32> for Key {
    fn from(n: i32) -> Self {
        Key::Number(n as f64)
    }
}

impl From<u32> for Key {
    fn from(n: u32) -> Self {
        Key::Number(n as f64)
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Number(n as f64)
    }
}

impl From<u64> for Key {
    fn from(n: u64) -> Self {
        Key::Number(n as f64)
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}
