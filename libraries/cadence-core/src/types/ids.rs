/// ID types for Cadence entities
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Structured 12-byte identifier: 4-byte big-endian seconds timestamp
/// followed by 8 random bytes. Its public form is 24 lowercase hex chars.
///
/// Historic playlist records are keyed by this binary form rather than by
/// an opaque string, see `cadence_storage::playlists::IdResolution`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectKey([u8; 12]);

impl ObjectKey {
    /// Generate a fresh key stamped with the current time
    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        let seconds = Utc::now().timestamp() as u32;
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..].copy_from_slice(&Uuid::new_v4().as_bytes()[..8]);
        Self(bytes)
    }

    /// Build a key from raw bytes
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Parse the 24-char hex form; anything else is not a structured key
    pub fn parse_hex(s: &str) -> Option<Self> {
        if s.len() != 24 {
            return None;
        }
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes).ok()?;
        Some(Self(bytes))
    }

    /// Raw bytes as stored
    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    /// Lowercase hex form used as the public identifier
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a new structured identifier
            pub fn generate() -> Self {
                Self(ObjectKey::generate().to_hex())
            }

            /// Get the inner string
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True until the entity has been persisted
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// User identifier (playlist owner)
    UserId
);

string_id!(
    /// Track identifier
    TrackId
);

string_id!(
    /// Playlist identifier
    PlaylistId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_hex() {
        let id1 = PlaylistId::generate();
        let id2 = PlaylistId::generate();
        assert_ne!(id1, id2);
        assert_eq!(id1.as_str().len(), 24);
        assert!(ObjectKey::parse_hex(id1.as_str()).is_some());
    }

    #[test]
    fn object_key_hex_round_trip() {
        let key = ObjectKey::from_bytes([0xab; 12]);
        assert_eq!(key.to_hex(), "abababababababababababab");
        assert_eq!(ObjectKey::parse_hex(&key.to_hex()), Some(key));
    }

    #[test]
    fn opaque_strings_are_not_object_keys() {
        assert!(ObjectKey::parse_hex("playlist-456").is_none());
        assert!(ObjectKey::parse_hex("zzzzzzzzzzzzzzzzzzzzzzzz").is_none());
    }

    #[test]
    fn default_track_id_is_empty() {
        assert!(TrackId::default().is_empty());
        assert_eq!(format!("{}", TrackId::new("track-123")), "track-123");
    }
}
