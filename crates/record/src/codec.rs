//! Binary record encoding.
//!
//! ## Frame
//!
//! ```text
//! [magic: u32 LE = "REC1"][body_len: u32 LE][crc32: u32 LE][body ...]
//! ```
//!
//! The CRC covers the body only.
//!
//! ## Body
//!
//! ```text
//! version (u64)
//! name (str) | namespace (str)
//! n_labels (u32)  { key (str) | value (str) }
//! n_owners (u32)  { kind (str) | name (str) | uid (str) | controller (u8) }
//! n_data (u32)    { key (str) | value (bytes) }
//!
//! str / bytes := len (u32) | raw bytes
//! ```
//!
//! All integers are little-endian.

use byteorder::{LittleEndian, ReadBytesExt};
use crc32fast::Hasher as Crc32;
use std::collections::BTreeMap;
use std::io::{self, Read};
use thiserror::Error;

use crate::{ObjectMeta, OwnerReference, Record};

/// Magic number identifying an encoded record (ASCII "REC1").
pub const RECORD_MAGIC: u32 = 0x5245_4331;

/// Frame header size: magic + body_len + crc.
pub const HEADER_BYTES: usize = 4 + 4 + 4;

/// Errors raised while decoding a record.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Bad magic, length, checksum or structure.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Returns the exact number of bytes [`encode`] produces for `record`.
pub fn encoded_len(record: &Record) -> usize {
    let str_len = |s: &str| 4 + s.len();

    let mut body = 8 + str_len(&record.meta.name) + str_len(&record.meta.namespace);
    body += 4;
    for (k, v) in &record.meta.labels {
        body += str_len(k) + str_len(v);
    }
    body += 4;
    for o in &record.meta.owner_references {
        body += str_len(&o.kind) + str_len(&o.name) + str_len(&o.uid) + 1;
    }
    body += 4;
    for (k, v) in &record.data {
        body += str_len(k) + 4 + v.len();
    }

    HEADER_BYTES + body
}

/// Serializes `record` into a self-checking frame.
pub fn encode(record: &Record) -> Vec<u8> {
    let mut buf = Vec::with_capacity(encoded_len(record));

    // header is filled in once the body length and CRC are known
    buf.extend_from_slice(&[0u8; HEADER_BYTES]);

    put_u64(&mut buf, record.meta.version);
    put_bytes(&mut buf, record.meta.name.as_bytes());
    put_bytes(&mut buf, record.meta.namespace.as_bytes());

    put_u32(&mut buf, record.meta.labels.len());
    for (k, v) in &record.meta.labels {
        put_bytes(&mut buf, k.as_bytes());
        put_bytes(&mut buf, v.as_bytes());
    }

    put_u32(&mut buf, record.meta.owner_references.len());
    for o in &record.meta.owner_references {
        put_bytes(&mut buf, o.kind.as_bytes());
        put_bytes(&mut buf, o.name.as_bytes());
        put_bytes(&mut buf, o.uid.as_bytes());
        buf.push(u8::from(o.controller));
    }

    put_u32(&mut buf, record.data.len());
    for (k, v) in &record.data {
        put_bytes(&mut buf, k.as_bytes());
        put_bytes(&mut buf, v);
    }

    let body = &buf[HEADER_BYTES..];
    let mut hasher = Crc32::new();
    hasher.update(body);
    let crc = hasher.finalize();
    let body_len = body.len() as u32;

    buf[0..4].copy_from_slice(&RECORD_MAGIC.to_le_bytes());
    buf[4..8].copy_from_slice(&body_len.to_le_bytes());
    buf[8..12].copy_from_slice(&crc.to_le_bytes());
    buf
}

/// Parses a frame produced by [`encode`].
///
/// Every declared length is checked against the bytes that remain, so a
/// damaged length field can never trigger a huge allocation.
pub fn decode(bytes: &[u8]) -> Result<Record, CodecError> {
    if bytes.len() < HEADER_BYTES {
        return Err(CodecError::Corrupt(format!(
            "frame too small ({} bytes)",
            bytes.len()
        )));
    }

    let mut hdr = &bytes[..HEADER_BYTES];
    let magic = hdr.read_u32::<LittleEndian>()?;
    if magic != RECORD_MAGIC {
        return Err(CodecError::Corrupt(format!("bad magic {magic:#010x}")));
    }
    let body_len = hdr.read_u32::<LittleEndian>()? as usize;
    let crc = hdr.read_u32::<LittleEndian>()?;

    let body = &bytes[HEADER_BYTES..];
    if body.len() != body_len {
        return Err(CodecError::Corrupt(format!(
            "body length {} does not match header {}",
            body.len(),
            body_len
        )));
    }

    let mut hasher = Crc32::new();
    hasher.update(body);
    if hasher.finalize() != crc {
        return Err(CodecError::Corrupt("checksum mismatch".into()));
    }

    let mut r = body;
    let version = r.read_u64::<LittleEndian>()?;
    let name = read_string(&mut r)?;
    let namespace = read_string(&mut r)?;

    let mut labels = BTreeMap::new();
    for _ in 0..read_count(&mut r)? {
        let k = read_string(&mut r)?;
        let v = read_string(&mut r)?;
        if labels.insert(k, v).is_some() {
            return Err(CodecError::Corrupt("duplicate label key".into()));
        }
    }

    let mut owner_references = Vec::new();
    for _ in 0..read_count(&mut r)? {
        let kind = read_string(&mut r)?;
        let name = read_string(&mut r)?;
        let uid = read_string(&mut r)?;
        let controller = match r.read_u8()? {
            0 => false,
            1 => true,
            other => {
                return Err(CodecError::Corrupt(format!("bad controller flag {other}")));
            }
        };
        owner_references.push(OwnerReference {
            kind,
            name,
            uid,
            controller,
        });
    }

    let mut data = BTreeMap::new();
    for _ in 0..read_count(&mut r)? {
        let k = read_string(&mut r)?;
        let v = read_bytes(&mut r)?;
        if data.insert(k, v).is_some() {
            return Err(CodecError::Corrupt("duplicate data key".into()));
        }
    }

    if !r.is_empty() {
        return Err(CodecError::Corrupt(format!("{} trailing bytes", r.len())));
    }

    Ok(Record {
        meta: ObjectMeta {
            name,
            namespace,
            labels,
            owner_references,
            version,
        },
        data,
    })
}

fn put_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_u32(buf: &mut Vec<u8>, v: usize) {
    buf.extend_from_slice(&(v as u32).to_le_bytes());
}

fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    put_u32(buf, bytes.len());
    buf.extend_from_slice(bytes);
}

fn read_count(r: &mut &[u8]) -> Result<u32, CodecError> {
    let n = r.read_u32::<LittleEndian>()?;
    // every element needs at least 4 bytes, reject counts the body can't hold
    if (n as usize).saturating_mul(4) > r.len() {
        return Err(CodecError::Corrupt(format!("element count {n} exceeds body")));
    }
    Ok(n)
}

fn read_bytes(r: &mut &[u8]) -> Result<Vec<u8>, CodecError> {
    let len = r.read_u32::<LittleEndian>()? as usize;
    if len > r.len() {
        return Err(CodecError::Corrupt(format!(
            "length {} exceeds remaining {}",
            len,
            r.len()
        )));
    }
    let mut out = vec![0u8; len];
    r.read_exact(&mut out)?;
    Ok(out)
}

fn read_string(r: &mut &[u8]) -> Result<String, CodecError> {
    String::from_utf8(read_bytes(r)?).map_err(|_| CodecError::Corrupt("invalid utf-8".into()))
}
