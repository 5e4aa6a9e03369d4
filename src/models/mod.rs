pub mod event;
pub mod identity;
pub mod market;

pub use event::{EventRecord, MarketCancelled, MarketCreated, MarketResolved, RegistryEvent};
pub use identity::{Identity, IdentityParseError};
pub use market::{Cancellation, Market, MarketStatus, Resolution};

// ---------------------------------------------------------------------------
// Opaque byte payloads travel as standard base64 strings
// ---------------------------------------------------------------------------

pub(crate) mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
