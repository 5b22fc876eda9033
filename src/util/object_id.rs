use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Document identifier: 4 bytes of unix time followed by 8 random bytes,
/// written as 24 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid object id: {0:?}")]
pub struct InvalidObjectId(pub String);

impl ObjectId {
    pub fn new() -> Self {
        let secs = chrono::Utc::now().timestamp() as u32;

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        rand::thread_rng().fill_bytes(&mut bytes[4..]);

        ObjectId(bytes)
    }

    pub fn parse(s: &str) -> Result<Self, InvalidObjectId> {
        if s.len() != 24 {
            return Err(InvalidObjectId(s.to_string()));
        }
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| InvalidObjectId(s.to_string()))?;
        Ok(ObjectId(bytes))
    }

    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ObjectId {
    type Err = InvalidObjectId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse(s)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ObjectId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_24_hex() {
        let id = ObjectId::new();
        let s = id.to_string();
        assert_eq!(s.len(), 24);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(ObjectId::parse(&s).unwrap(), id);
    }

    #[test]
    fn test_ids_differ() {
        assert_ne!(ObjectId::new(), ObjectId::new());
    }

    #[test]
    fn test_parse_normalizes_case() {
        let id = ObjectId::parse("507F1F77BCF86CD799439011").unwrap();
        assert_eq!(id.to_hex(), "507f1f77bcf86cd799439011");
        assert_eq!(id.timestamp(), 0x507f1f77);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(ObjectId::parse("").is_err());
        assert!(ObjectId::parse("not-an-id").is_err());
        assert!(ObjectId::parse("507f1f77bcf86cd79943901").is_err());
        assert!(ObjectId::parse("507f1f77bcf86cd79943901g").is_err());
        assert!(ObjectId::parse("507f1f77bcf86cd7994390110").is_err());
    }
}
