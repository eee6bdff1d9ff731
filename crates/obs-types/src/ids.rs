use std::fmt;

use crate::error::ObsError;

/// Maximum byte length accepted for an [`Entity`] or [`Variable`] identifier.
///
/// Both are opaque DCID-shaped strings in the upstream knowledge graph; this
/// bound only guards against pathological input, it does not encode any
/// domain meaning.
const MAX_ID_LEN: usize = 2048;

fn validate_id(kind: &'static str, raw: &str) -> Result<(), ObsError> {
    if raw.is_empty() {
        return Err(ObsError::invalid_argument(format!("{kind} must not be empty")));
    }
    if raw.len() > MAX_ID_LEN {
        return Err(ObsError::invalid_argument(format!(
            "{kind} exceeds the maximum length of {MAX_ID_LEN} bytes"
        )));
    }
    if raw.chars().any(char::is_whitespace) {
        return Err(ObsError::invalid_argument(format!("{kind} must not contain whitespace")));
    }
    Ok(())
}

macro_rules! opaque_id {
    ($name:ident, $kind:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Result<Self, ObsError> {
                let raw = raw.into();
                validate_id($kind, &raw)?;
                Ok(Self(raw))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ObsError;

            fn try_from(raw: String) -> Result<Self, Self::Error> {
                Self::new(raw)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = ObsError;

            fn try_from(raw: &str) -> Result<Self, Self::Error> {
                Self::new(raw.to_owned())
            }
        }
    };
}

opaque_id!(Entity, "entity");
opaque_id!(Variable, "variable");
opaque_id!(ChildType, "child type");

/// An opaque, monotonic date string (`YYYY`, `YYYY-MM`, or `YYYY-MM-DD`).
///
/// Ordering is lexicographic on the underlying string, never a calendar
/// parse: the ranking path in `obs-ranker` depends on this (see
/// `Date::cmp`'s doc comment at the call sites instead of here, since the
/// derived `Ord` below already gives the required byte-wise comparison).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Date(String);

impl Date {
    pub fn new(raw: impl Into<String>) -> Result<Self, ObsError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(ObsError::invalid_argument("date must not be empty"));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
