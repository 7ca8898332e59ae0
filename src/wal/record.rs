//! wal/record — payloads of log entries.
//!
//! ```text
//! insert: [0][xid u64][pgno u32][offset u16][raw]
//! update: [1][xid u64][uid u64][old raw][new raw]   (old and new have equal length)
//! ```
//!
//! `raw` is always a whole record image: `[valid u8][size u16][payload]`.

use anyhow::Result;
use byteorder::{BigEndian, ByteOrder};

use crate::consts::{LOG_TYPE_INSERT, LOG_TYPE_UPDATE};
use crate::dm::uid::Uid;
use crate::error::DmError;

const INSERT_HDR: usize = 1 + 8 + 4 + 2;
const UPDATE_HDR: usize = 1 + 8 + 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    Insert {
        xid: u64,
        pgno: u32,
        offset: u16,
        raw: Vec<u8>,
    },
    Update {
        xid: u64,
        uid: Uid,
        old_raw: Vec<u8>,
        new_raw: Vec<u8>,
    },
}

impl LogRecord {
    pub fn xid(&self) -> u64 {
        match self {
            Self::Insert { xid, .. } | Self::Update { xid, .. } => *xid,
        }
    }

    pub fn pgno(&self) -> u32 {
        match self {
            Self::Insert { pgno, .. } => *pgno,
            Self::Update { uid, .. } => uid.pgno,
        }
    }

    pub fn offset(&self) -> u16 {
        match self {
            Self::Insert { offset, .. } => *offset,
            Self::Update { uid, .. } => uid.offset,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Insert { .. } => "insert",
            Self::Update { .. } => "update",
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Insert {
                xid,
                pgno,
                offset,
                raw,
            } => {
                let mut out = vec![0u8; INSERT_HDR + raw.len()];
                out[0] = LOG_TYPE_INSERT;
                BigEndian::write_u64(&mut out[1..9], *xid);
                BigEndian::write_u32(&mut out[9..13], *pgno);
                BigEndian::write_u16(&mut out[13..15], *offset);
                out[INSERT_HDR..].copy_from_slice(raw);
                out
            }
            Self::Update {
                xid,
                uid,
                old_raw,
                new_raw,
            } => {
                debug_assert_eq!(old_raw.len(), new_raw.len());
                let mut out = Vec::with_capacity(UPDATE_HDR + old_raw.len() * 2);
                out.push(LOG_TYPE_UPDATE);
                out.extend_from_slice(&xid.to_be_bytes());
                out.extend_from_slice(&uid.to_u64().to_be_bytes());
                out.extend_from_slice(old_raw);
                out.extend_from_slice(new_raw);
                out
            }
        }
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        let bad = |why: &str| DmError::BadLogFile(format!("log record: {}", why));
        match buf.first() {
            Some(&LOG_TYPE_INSERT) => {
                if buf.len() < INSERT_HDR {
                    return Err(bad("short insert").into());
                }
                Ok(Self::Insert {
                    xid: BigEndian::read_u64(&buf[1..9]),
                    pgno: BigEndian::read_u32(&buf[9..13]),
                    offset: BigEndian::read_u16(&buf[13..15]),
                    raw: buf[INSERT_HDR..].to_vec(),
                })
            }
            Some(&LOG_TYPE_UPDATE) => {
                if buf.len() < UPDATE_HDR || (buf.len() - UPDATE_HDR) % 2 != 0 {
                    return Err(bad("update images differ in length").into());
                }
                let half = (buf.len() - UPDATE_HDR) / 2;
                Ok(Self::Update {
                    xid: BigEndian::read_u64(&buf[1..9]),
                    uid: Uid::from_u64(BigEndian::read_u64(&buf[9..17])),
                    old_raw: buf[UPDATE_HDR..UPDATE_HDR + half].to_vec(),
                    new_raw: buf[UPDATE_HDR + half..].to_vec(),
                })
            }
            Some(t) => Err(bad(&format!("unknown type {}", t)).into()),
            None => Err(bad("empty").into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_wire_layout() {
        let r = LogRecord::Insert {
            xid: 7,
            pgno: 2,
            offset: 0x0102,
            raw: vec![0, 0, 1, 0xaa],
        };
        let b = r.encode();
        assert_eq!(b[0], LOG_TYPE_INSERT);
        assert_eq!(&b[1..9], &7u64.to_be_bytes());
        assert_eq!(&b[9..13], &2u32.to_be_bytes());
        assert_eq!(&b[13..15], &[1, 2]);
        assert_eq!(LogRecord::decode(&b).unwrap(), r);
        assert_eq!(r.pgno(), 2);
    }

    #[test]
    fn update_splits_images_in_half() {
        let r = LogRecord::Update {
            xid: 9,
            uid: Uid::new(4, 30),
            old_raw: vec![0, 0, 2, b'a', b'b'],
            new_raw: vec![0, 0, 2, b'c', b'd'],
        };
        let b = r.encode();
        assert_eq!(b.len(), 17 + 10);
        match LogRecord::decode(&b).unwrap() {
            LogRecord::Update { uid, old_raw, new_raw, .. } => {
                assert_eq!(uid, Uid::new(4, 30));
                assert_eq!(&old_raw[3..], b"ab");
                assert_eq!(&new_raw[3..], b"cd");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(LogRecord::decode(&[]).is_err());
        assert!(LogRecord::decode(&[5, 0, 0]).is_err());
        assert!(LogRecord::decode(&[LOG_TYPE_INSERT, 0]).is_err());
        let mut odd = vec![LOG_TYPE_UPDATE];
        odd.extend_from_slice(&[0u8; 16]);
        odd.push(1);
        assert!(LogRecord::decode(&odd).is_err());
    }
}
