//! Typed identifier newtypes for values minted by the remote service.
//!
//! The remote API hands out numeric ids that do not fit in 32 bits (and are
//! not guaranteed to fit in 64), so identifiers are kept in their textual
//! form and compared as opaque strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub struct $name(String);

        impl $name {
            /// Wrap an identifier, rejecting empty strings.
            ///
            /// # Errors
            ///
            /// Returns [`ValidationError::EmptyId`] when `value` is blank.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let value = value.into();
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(ValidationError::EmptyId);
                }
                Ok(Self(trimmed.to_string()))
            }

            /// Access the textual form.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value.to_string())
            }
        }

        impl From<u128> for $name {
            fn from(value: u128) -> Self {
                Self(value.to_string())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                match RawId::deserialize(deserializer)? {
                    RawId::Number(n) => {
                        let digits = n.to_string();
                        if digits.bytes().all(|b| b.is_ascii_digit()) {
                            Ok(Self(digits))
                        } else {
                            Err(serde::de::Error::custom(format!(
                                "identifier must be a non-negative integer, got {digits}"
                            )))
                        }
                    }
                    RawId::Text(s) => Self::new(s).map_err(serde::de::Error::custom),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

/// Wire representation accepted for identifiers: a JSON number or a string.
///
/// Numbers keep their literal digits, whatever their width.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(serde_json::Number),
    Text(String),
}

define_id!(
    /// Identity of a motion/ding notification; stable across its updates.
    EventId
);

define_id!(
    /// Identity of a remote device (the floodlight camera).
    DeviceId
);
