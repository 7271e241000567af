use std::{fmt, str::FromStr};

use curve25519_dalek::Scalar;
use serde::{Deserialize, Serialize};

use crate::{error::TicketError, scalar};

pub const ADDRESS_LEN: usize = 20;

/// A 20-byte account or token identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// 160 bits always fit below the scalar modulus, so this is injective.
    pub fn to_scalar(&self) -> Scalar {
        scalar::from_be_bytes(&self.0)
    }
}

impl FromStr for Address {
    type Err = TicketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != ADDRESS_LEN * 2 {
            return Err(TicketError::InvalidInput(format!(
                "address `{s}` must have {} hex digits, got {}",
                ADDRESS_LEN * 2,
                digits.len()
            )));
        }
        let bytes = hex::decode(digits)
            .map_err(|err| TicketError::InvalidInput(format!("address `{s}`: {err}")))?;
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}
