//! Branded ID newtypes for type safety.
//!
//! Each identifier is a newtype wrapper around `String` so a trigger ID can
//! never be passed where a firing-cycle ID is expected.
//!
//! All IDs are UUID v7 (time-ordered) generated via [`uuid::Uuid::now_v7`].

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Generate a new UUID v7 string (time-ordered).
fn new_v7() -> String {
    Uuid::now_v7().to_string()
}

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new random ID (UUID v7, time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(new_v7())
            }

            /// Create from an existing string value.
            #[must_use]
            pub fn from_string(s: String) -> Self {
                Self(s)
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Identity of one trigger registration.
    ///
    /// Minted on every `add`, so registering the same callable twice yields
    /// two distinct triggers.
    TriggerId
}

branded_id! {
    /// Identifier for one firing cycle of an event, used to correlate the
    /// log records of a cycle that suspends and resumes on another thread.
    CycleId
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn new_ids_are_unique() {
        let ids: HashSet<TriggerId> = (0..100).map(|_| TriggerId::new()).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn ids_are_uuid_v7() {
        let id = CycleId::new();
        let parsed = Uuid::parse_str(id.as_str()).unwrap();
        assert_eq!(parsed.get_version_num(), 7);
    }

    #[test]
    fn display_matches_inner() {
        let id = TriggerId::from("abc");
        assert_eq!(id.to_string(), "abc");
        assert_eq!(id.as_ref(), "abc");
    }

    #[test]
    fn serde_is_transparent() {
        let id = TriggerId::from("t-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"t-1\"");
        let back: TriggerId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn into_inner_round_trip() {
        let id = TriggerId::from_string("raw".to_string());
        let s: String = id.clone().into();
        assert_eq!(s, "raw");
        assert_eq!(id.into_inner(), "raw");
    }
}
