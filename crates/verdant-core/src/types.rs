use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Token and native-currency amounts in base units (18 decimals).
pub type Balance = u128;

/// Unix timestamp (seconds, UTC) as reported by the block.
pub type Timestamp = i64;

// ── Address ──────────────────────────────────────────────────────────────────

/// 20-byte account or contract address.
///
/// Serialized as a `0x`-prefixed hex string so genesis params and call files
/// stay human-editable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn from_bytes(b: [u8; 20]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Deterministic address: first 20 bytes of BLAKE3(domain || parts...).
    pub fn derive(domain: &[u8], parts: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(domain);
        for p in parts {
            hasher.update(p);
        }
        let hash = hasher.finalize();
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&hash.as_bytes()[..20]);
        Self(arr)
    }

    /// Convenience for tests and fixtures: an address filled with `byte`.
    pub fn repeat(byte: u8) -> Self {
        Self([byte; 20])
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut arr = [0u8; 20];
        hex::decode_to_slice(s, &mut arr)?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({}…)", &self.to_hex()[..10])
    }
}

impl FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ── Context ──────────────────────────────────────────────────────────────────

/// Execution context of one call: who is calling, how much native currency is
/// attached, and the trusted block timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Context {
    pub caller: Address,
    pub value: Balance,
    pub now: Timestamp,
}

impl Context {
    pub fn new(caller: Address, now: Timestamp) -> Self {
        Self { caller, value: 0, now }
    }

    pub fn with_value(caller: Address, value: Balance, now: Timestamp) -> Self {
        Self { caller, value, now }
    }

    /// The same block, seen from another account (contract-to-contract calls).
    pub fn as_caller(&self, caller: Address) -> Self {
        Self { caller, value: 0, now: self.now }
    }
}

// ── Role ─────────────────────────────────────────────────────────────────────

/// Roles recognised by the token's access control.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// Grants and revokes every role; configures fees and strategic wallets.
    Admin,
    Minter,
    Pauser,
    Blacklister,
    FeelessAdmin,
    Snapshotter,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::Minter => "minter",
            Role::Pauser => "pauser",
            Role::Blacklister => "blacklister",
            Role::FeelessAdmin => "feeless-admin",
            Role::Snapshotter => "snapshotter",
        };
        f.write_str(name)
    }
}
