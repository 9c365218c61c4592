// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! ANS-104 bundle decoder (spec.md §6), the "special client" mentioned in
//! §4.1: given a bundle transaction's raw body, streams the header (item
//! count + per-item offsets), then decodes each nested signed data item.
//!
//! A malformed header or a truncated item does not fail the whole bundle
//! — it is logged and yields zero items, so the outer pump loop treats
//! the bundle transaction as simply not decomposed (spec.md §4.1).

use thiserror::Error;

const COUNT_FIELD_LEN: usize = 32;
const SIZE_FIELD_LEN: usize = 32;
const ID_FIELD_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BundleError {
    #[error("bundle header truncated")]
    TruncatedHeader,
    #[error("declared item count {0} would overflow the header table")]
    CountOverflow(u64),
    #[error("item {index} body truncated: declared {declared} bytes, {available} available")]
    TruncatedItem {
        index: usize,
        declared: u64,
        available: usize,
    },
    #[error("item {index} has unsupported signature type {signature_type}")]
    UnsupportedSignatureType { index: usize, signature_type: u16 },
    #[error("item {index} body truncated while reading {field}")]
    TruncatedField { index: usize, field: &'static str },
}

/// One decoded data item: a self-contained signed transaction nested
/// inside the outer bundle envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataItem {
    /// Base64url-encoded item id, taken from the bundle's header table
    /// (not recomputed from the signature).
    pub id: String,
    pub signature_type: u16,
    /// Base64url-encoded owner public key.
    pub owner: String,
    pub target: Option<String>,
    pub anchor: Option<String>,
    pub tags: Vec<Tag>,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

/// `(signature_len, owner_len)` in bytes for each ANS-104 signature type
/// this decoder understands. Unknown types are reported, not guessed at.
fn signature_lengths(signature_type: u16) -> Option<(usize, usize)> {
    match signature_type {
        1 => Some((512, 512)), // Arweave RSA-PSS
        2 => Some((64, 32)),   // ED25519
        3 => Some((65, 65)),   // Ethereum secp256k1
        _ => None,
    }
}

/// Decodes a full ANS-104 bundle body into its constituent data items.
/// Returns an empty vec (with a logged warning) rather than propagating an
/// error for any individual malformed item, per spec.md §4.1 — except a
/// malformed *header*, which makes the whole bundle undecodable and is
/// returned as an error so the caller can decide how to log it once.
pub fn decode_bundle(body: &[u8]) -> Result<Vec<DataItem>, BundleError> {
    if body.len() < COUNT_FIELD_LEN {
        return Err(BundleError::TruncatedHeader);
    }
    let count = read_u64_le(&body[0..COUNT_FIELD_LEN]);
    let header_entry_len = SIZE_FIELD_LEN + ID_FIELD_LEN;
    let header_table_len = (count as usize)
        .checked_mul(header_entry_len)
        .ok_or(BundleError::CountOverflow(count))?;

    let mut offset = COUNT_FIELD_LEN;
    if body.len() < offset + header_table_len {
        return Err(BundleError::TruncatedHeader);
    }

    let mut sizes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let size = read_u64_le(&body[offset..offset + SIZE_FIELD_LEN]);
        offset += SIZE_FIELD_LEN;
        let id = base64url(&body[offset..offset + ID_FIELD_LEN]);
        offset += ID_FIELD_LEN;
        sizes.push((size, id));
    }

    let mut items = Vec::with_capacity(count as usize);
    for (index, (declared_size, id)) in sizes.into_iter().enumerate() {
        let declared = declared_size as usize;
        if body.len() < offset + declared {
            tracing::warn!(index, "bundle item body truncated, skipping remainder");
            break;
        }
        let item_body = &body[offset..offset + declared];
        offset += declared;

        match decode_item(index, id, item_body) {
            Ok(item) => items.push(item),
            Err(err) => tracing::warn!(index, error = %err, "skipping malformed bundle item"),
        }
    }

    Ok(items)
}

fn decode_item(index: usize, id: String, body: &[u8]) -> Result<DataItem, BundleError> {
    let mut cursor = Cursor::new(body);

    let signature_type = cursor
        .take(2, index, "signature_type")
        .map(|b| u16::from_le_bytes([b[0], b[1]]))?;
    let (sig_len, owner_len) = signature_lengths(signature_type)
        .ok_or(BundleError::UnsupportedSignatureType { index, signature_type })?;

    let _signature = cursor.take(sig_len, index, "signature")?;
    let owner = base64url(cursor.take(owner_len, index, "owner")?);

    let target_present = cursor.take(1, index, "target_presence")?[0];
    let target = if target_present != 0 {
        Some(base64url(cursor.take(32, index, "target")?))
    } else {
        None
    };

    let anchor_present = cursor.take(1, index, "anchor_presence")?[0];
    let anchor = if anchor_present != 0 {
        Some(base64url(cursor.take(32, index, "anchor")?))
    } else {
        None
    };

    let tag_count = u64::from_le_bytes(cursor.take(8, index, "tag_count")?.try_into().unwrap());
    let tag_bytes_len = u64::from_le_bytes(cursor.take(8, index, "tag_bytes_len")?.try_into().unwrap());
    let tag_bytes = cursor.take(tag_bytes_len as usize, index, "tags")?;
    let tags = decode_avro_tags(tag_bytes, tag_count);

    let payload = cursor.rest().to_vec();

    Ok(DataItem {
        id,
        signature_type,
        owner,
        target,
        anchor,
        tags,
        payload,
    })
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, len: usize, index: usize, field: &'static str) -> Result<&'a [u8], BundleError> {
        if self.pos + len > self.buf.len() {
            return Err(BundleError::TruncatedField { index, field });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }
}

/// Decodes Avro's block-encoded array format: a zigzag-varint block count
/// (negative meaning "this many items follow, then a byte-size prefix"),
/// items of `(name, value)` UTF-8 string pairs, terminated by a zero
/// block count. Truncated or malformed tag bytes yield whatever tags
/// were decoded before the failure, rather than discarding the item.
fn decode_avro_tags(buf: &[u8], expected_count: u64) -> Vec<Tag> {
    let mut tags = Vec::with_capacity(expected_count as usize);
    let mut pos = 0usize;

    loop {
        let Some((count, consumed)) = read_zigzag_varint(&buf[pos..]) else {
            break;
        };
        pos += consumed;
        if count == 0 {
            break;
        }
        let block_count = if count < 0 {
            let Some((_block_size, consumed)) = read_zigzag_varint(&buf[pos..]) else {
                break;
            };
            pos += consumed;
            -count
        } else {
            count
        };

        for _ in 0..block_count {
            let Some(name) = read_avro_string(buf, &mut pos) else {
                return tags;
            };
            let Some(value) = read_avro_string(buf, &mut pos) else {
                return tags;
            };
            tags.push(Tag { name, value });
        }
    }

    tags
}

fn read_avro_string(buf: &[u8], pos: &mut usize) -> Option<String> {
    let (len, consumed) = read_zigzag_varint(&buf[*pos..])?;
    *pos += consumed;
    let len = usize::try_from(len).ok()?;
    if *pos + len > buf.len() {
        return None;
    }
    let bytes = &buf[*pos..*pos + len];
    *pos += len;
    String::from_utf8(bytes.to_vec()).ok()
}

/// Returns `(value, bytes_consumed)`.
fn read_zigzag_varint(buf: &[u8]) -> Option<(i64, usize)> {
    let mut result: u64 = 0;
    let mut shift = 0u32;
    for (consumed, &byte) in buf.iter().enumerate() {
        result |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            let zigzag = ((result >> 1) as i64) ^ -((result & 1) as i64);
            return Some((zigzag, consumed + 1));
        }
        shift += 7;
        if shift >= 64 {
            return None;
        }
    }
    None
}

fn read_u64_le(bytes: &[u8]) -> u64 {
    // The header fields are 32-byte little-endian integers; bundle sizes
    // and counts never approach u64::MAX, so only the low 8 bytes matter.
    let mut low = [0u8; 8];
    low.copy_from_slice(&bytes[0..8]);
    u64::from_le_bytes(low)
}

fn base64url(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_zigzag_varint(out: &mut Vec<u8>, value: i64) {
        let mut zigzag = ((value << 1) ^ (value >> 63)) as u64;
        loop {
            let mut byte = (zigzag & 0x7f) as u8;
            zigzag >>= 7;
            if zigzag != 0 {
                byte |= 0x80;
            }
            out.push(byte);
            if zigzag == 0 {
                break;
            }
        }
    }

    fn encode_avro_tags(tags: &[(&str, &str)]) -> Vec<u8> {
        let mut out = Vec::new();
        if !tags.is_empty() {
            write_zigzag_varint(&mut out, tags.len() as i64);
            for (name, value) in tags {
                write_zigzag_varint(&mut out, name.len() as i64);
                out.extend_from_slice(name.as_bytes());
                write_zigzag_varint(&mut out, value.len() as i64);
                out.extend_from_slice(value.as_bytes());
            }
        }
        write_zigzag_varint(&mut out, 0);
        out
    }

    fn build_ed25519_item(tags: &[(&str, &str)], payload: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&2u16.to_le_bytes()); // signature type: ED25519
        body.extend_from_slice(&[0u8; 64]); // signature
        body.extend_from_slice(&[1u8; 32]); // owner
        body.push(0); // no target
        body.push(0); // no anchor

        let tag_bytes = encode_avro_tags(tags);
        body.extend_from_slice(&(tags.len() as u64).to_le_bytes());
        body.extend_from_slice(&(tag_bytes.len() as u64).to_le_bytes());
        body.extend_from_slice(&tag_bytes);
        body.extend_from_slice(payload);
        body
    }

    fn build_bundle(items: &[Vec<u8>]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut count_field = [0u8; 32];
        count_field[0..8].copy_from_slice(&(items.len() as u64).to_le_bytes());
        out.extend_from_slice(&count_field);

        for (i, item) in items.iter().enumerate() {
            let mut size_field = [0u8; 32];
            size_field[0..8].copy_from_slice(&(item.len() as u64).to_le_bytes());
            out.extend_from_slice(&size_field);

            let mut id_field = [0u8; 32];
            id_field[0] = i as u8;
            out.extend_from_slice(&id_field);
        }
        for item in items {
            out.extend_from_slice(item);
        }
        out
    }

    #[test]
    fn decodes_a_single_item_bundle_with_tags() {
        let item = build_ed25519_item(&[("App-Name", "node")], b"hello");
        let bundle = build_bundle(&[item]);

        let items = decode_bundle(&bundle).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].signature_type, 2);
        assert_eq!(items[0].tags, vec![Tag { name: "App-Name".into(), value: "node".into() }]);
        assert_eq!(items[0].payload, b"hello");
        assert!(items[0].target.is_none());
    }

    #[test]
    fn decodes_multiple_items_preserving_order() {
        let a = build_ed25519_item(&[], b"first");
        let b = build_ed25519_item(&[], b"second");
        let bundle = build_bundle(&[a, b]);

        let items = decode_bundle(&bundle).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].payload, b"first");
        assert_eq!(items[1].payload, b"second");
    }

    #[test]
    fn truncated_header_is_an_error() {
        let err = decode_bundle(&[0u8; 10]).unwrap_err();
        assert_eq!(err, BundleError::TruncatedHeader);
    }

    #[test]
    fn truncated_item_body_yields_partial_results_not_an_error() {
        let a = build_ed25519_item(&[], b"first");
        let mut bundle = build_bundle(&[a.clone(), a]);
        bundle.truncate(bundle.len() - 5);

        let items = decode_bundle(&bundle).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn unsupported_signature_type_is_skipped_not_fatal() {
        let mut item = build_ed25519_item(&[], b"payload");
        item[0..2].copy_from_slice(&99u16.to_le_bytes());
        let bundle = build_bundle(&[item]);

        let items = decode_bundle(&bundle).unwrap();
        assert!(items.is_empty());
    }
}
