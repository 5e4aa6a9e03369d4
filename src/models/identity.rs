use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const ADDRESS_HEX_LEN: usize = 40;

/// Account identity: a 20-byte address in `0x`-prefixed lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityParseError {
    #[error("address must start with 0x")]
    MissingPrefix,

    #[error("address must have 40 hex digits, got {0}")]
    WrongLength(usize),

    #[error("address contains non-hex character {0:?}")]
    InvalidCharacter(char),
}

impl Identity {
    pub const ZERO_STR: &'static str = "0x0000000000000000000000000000000000000000";

    /// The null identity. Never a valid owner, resolver or payout recipient.
    pub fn zero() -> Self {
        Identity(Self::ZERO_STR.to_string())
    }

    /// Deterministic identity whose low 8 bytes encode `n`.
    pub fn from_low_u64(n: u64) -> Self {
        Identity(format!("0x{:040x}", n))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == Self::ZERO_STR
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `0x1234...abcd` form for log lines and notification text.
    pub fn short(&self) -> String {
        format!("{}...{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

impl FromStr for Identity {
    type Err = IdentityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let hex = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or(IdentityParseError::MissingPrefix)?;

        if hex.len() != ADDRESS_HEX_LEN {
            return Err(IdentityParseError::WrongLength(hex.len()));
        }
        if let Some(c) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(IdentityParseError::InvalidCharacter(c));
        }

        Ok(Identity(format!("0x{}", hex.to_ascii_lowercase())))
    }
}

impl TryFrom<String> for Identity {
    type Error = IdentityParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
