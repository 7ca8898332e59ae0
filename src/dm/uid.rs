//! Record identifier: page number and in-page offset, packed as `pgno << 32 | offset`.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uid {
    pub pgno: u32,
    pub offset: u16,
}

impl Uid {
    pub const fn new(pgno: u32, offset: u16) -> Self {
        Self { pgno, offset }
    }

    #[inline]
    pub const fn to_u64(self) -> u64 {
        ((self.pgno as u64) << 32) | self.offset as u64
    }

    /// Bits 16..32 are never set by `to_u64`; they are ignored here.
    #[inline]
    pub const fn from_u64(v: u64) -> Self {
        Self {
            pgno: (v >> 32) as u32,
            offset: (v & 0xffff) as u16,
        }
    }
}

impl From<Uid> for u64 {
    fn from(u: Uid) -> u64 {
        u.to_u64()
    }
}

impl From<u64> for Uid {
    fn from(v: u64) -> Uid {
        Uid::from_u64(v)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_u64())
    }
}

/// Accepts the packed decimal form, `0x`-prefixed hex, or `pgno:offset`.
impl FromStr for Uid {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let s = s.trim();
        if let Some((p, o)) = s.split_once(':') {
            return Ok(Uid::new(p.parse()?, o.parse()?));
        }
        let v = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16)?,
            None => s.parse()?,
        };
        Ok(Uid::from_u64(v))
    }
}
