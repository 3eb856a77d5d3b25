use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Length in bytes of a compressed secp256k1 public key.
const PUBKEY_LEN: usize = 33;

/// LND's 64-bit channel identifier (the integer form of a short channel id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u64);

impl ChannelId {
    /// Create a channel id from its integer form.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw integer value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Funding block height encoded in the upper 24 bits.
    pub fn block_height(&self) -> u32 {
        (self.0 >> 40) as u32
    }

    /// Funding transaction index within its block.
    pub fn tx_index(&self) -> u32 {
        ((self.0 >> 16) & 0xFF_FFFF) as u32
    }

    /// Funding output index.
    pub fn output_index(&self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    /// The `BLOCKxTXxOUT` rendering used by BOLT 7.
    pub fn to_short_channel_id(&self) -> String {
        format!(
            "{}x{}x{}",
            self.block_height(),
            self.tx_index(),
            self.output_index()
        )
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChannelId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl FromStr for ChannelId {
    type Err = CoreError;

    /// Accepts the decimal integer form or the `BLOCKxTXxOUT` form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(id) = s.parse::<u64>() {
            return Ok(Self(id));
        }

        let parts: Vec<&str> = s.split('x').collect();
        if parts.len() != 3 {
            return Err(CoreError::InvalidChannelId(s.to_string()));
        }
        let invalid = || CoreError::InvalidChannelId(s.to_string());
        let block: u64 = parts[0].parse().map_err(|_| invalid())?;
        let tx: u64 = parts[1].parse().map_err(|_| invalid())?;
        let out: u64 = parts[2].parse().map_err(|_| invalid())?;
        if block > 0xFF_FFFF || tx > 0xFF_FFFF || out > 0xFFFF {
            return Err(invalid());
        }
        Ok(Self((block << 40) | (tx << 16) | out))
    }
}

impl Serialize for ChannelId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for ChannelId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        crate::serde_helpers::u64_from_str_or_num(deserializer).map(ChannelId)
    }
}

/// A node's compressed public key, kept as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(String);

impl NodeId {
    /// The hex encoding.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decoded key bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        // Validated on construction.
        hex::decode(&self.0).unwrap_or_default()
    }

    /// First eight hex characters, handy in logs.
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NodeId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let bytes =
            hex::decode(&normalized).map_err(|_| CoreError::InvalidNodeId(s.to_string()))?;
        if bytes.len() != PUBKEY_LEN || !matches!(bytes[0], 0x02 | 0x03) {
            return Err(CoreError::InvalidNodeId(s.to_string()));
        }
        Ok(Self(normalized))
    }
}

impl TryFrom<String> for NodeId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}
