//! # Traffic values codec
//!
//! **Strategy:** pack the 3-bit speed codes back to back, then hand the
//! whole buffer to zlib. The bit-packing alone reaches 3 bits per segment;
//! the deflate pass then exploits the long runs of equal codes that real
//! colorings have.
//!
//! ```text
//! [version: u8 = 0][value count N: varint][N x 3-bit codes][zero padding]
//! ```
//! ...all wrapped in a zlib stream at best compression. The values blob is
//! always fetched remotely, never embedded in the tile, and its order is
//! parallel to the keys blob of [`crate::traffic_keys`].

use std::io::{Cursor, Read, Write};

use bytes::Bytes;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::bits::{read_exact_or_eof, BitReader, BitWriter};
use crate::error::{CodecError, Result};
use crate::varint::{read_varint, write_varint};
use crate::SpeedGroup;

/// Format revision this build reads and writes.
pub const VALUES_VERSION: u8 = 0;

pub fn serialize_traffic_values(values: &[SpeedGroup]) -> Result<Bytes> {
    let mut packed = Vec::new();
    packed.push(VALUES_VERSION);
    write_varint(&mut packed, values.len() as u64)?;
    {
        let mut bits = BitWriter::new(&mut packed);
        for value in values {
            bits.write(u64::from(value.to_bits()), 3)?;
        }
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(&packed)
        .map_err(CodecError::DeflateFailed)?;
    let deflated = encoder.finish().map_err(CodecError::DeflateFailed)?;
    Ok(Bytes::from(deflated))
}

pub fn deserialize_traffic_values(data: &[u8]) -> Result<Vec<SpeedGroup>> {
    let mut inflated = Vec::new();
    ZlibDecoder::new(data)
        .read_to_end(&mut inflated)
        .map_err(CodecError::InflateFailed)?;

    let mut source = Cursor::new(inflated.as_slice());
    let mut version = [0u8; 1];
    read_exact_or_eof(&mut source, &mut version)?;
    if version[0] != VALUES_VERSION {
        return Err(CodecError::UnsupportedVersion {
            expected: u16::from(VALUES_VERSION),
            got: u16::from(version[0]),
        });
    }
    let count = read_varint(&mut source)?;

    // The payload length is fully determined by the declared count; check
    // before reading so a lying header cannot drive unbounded work.
    let payload = inflated.len() as u64 - source.position();
    let needed = count
        .checked_mul(3)
        .and_then(|bits| bits.checked_add(7))
        .map(|bits| bits / 8)
        .ok_or_else(|| CodecError::CorruptValues("value count overflows".into()))?;
    if payload != needed {
        return Err(CodecError::CorruptValues(format!(
            "payload is {payload} bytes, expected {needed} for {count} values"
        )));
    }

    let mut values = Vec::with_capacity(count as usize);
    let mut bits = BitReader::new(&mut source);
    for _ in 0..count {
        values.push(SpeedGroup::from_bits(bits.read(3)? as u8));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inflate(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        ZlibDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_known_pre_deflate_image() {
        // Codes 0, 3, 7, 0, 1 packed LSB-first after version and count.
        let values = vec![
            SpeedGroup::Unknown,
            SpeedGroup::G2,
            SpeedGroup::TempBlock,
            SpeedGroup::Unknown,
            SpeedGroup::G0,
        ];
        let blob = serialize_traffic_values(&values).unwrap();
        assert_eq!(inflate(&blob), vec![0x00, 0x05, 0xD8, 0x11]);
        assert_eq!(deserialize_traffic_values(&blob).unwrap(), values);
    }

    #[test]
    fn test_roundtrip_all_groups() {
        let values: Vec<SpeedGroup> = (0..8u8).map(SpeedGroup::from_bits).collect();
        let blob = serialize_traffic_values(&values).unwrap();
        assert_eq!(deserialize_traffic_values(&blob).unwrap(), values);
    }

    #[test]
    fn test_roundtrip_empty() {
        let blob = serialize_traffic_values(&[]).unwrap();
        assert!(deserialize_traffic_values(&blob).unwrap().is_empty());
    }

    #[test]
    fn test_roundtrip_long_runs() {
        let mut values = vec![SpeedGroup::G5; 10_000];
        values.extend(vec![SpeedGroup::Unknown; 5_000]);
        values.push(SpeedGroup::TempBlock);

        let blob = serialize_traffic_values(&values).unwrap();
        // The deflate layer should crush the runs well below 3 bits/value.
        assert!(blob.len() < values.len() / 8);
        assert_eq!(deserialize_traffic_values(&blob).unwrap(), values);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let blob = deflate(&[0x01, 0x00]);
        assert!(matches!(
            deserialize_traffic_values(&blob),
            Err(CodecError::UnsupportedVersion { expected: 0, got: 1 })
        ));
    }

    #[test]
    fn test_rejects_short_payload() {
        // Claims four values but carries one payload byte instead of two.
        let blob = deflate(&[0x00, 0x04, 0xFF]);
        assert!(matches!(
            deserialize_traffic_values(&blob),
            Err(CodecError::CorruptValues(_))
        ));
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let blob = deflate(&[0x00, 0x01, 0x05, 0xEE]);
        assert!(matches!(
            deserialize_traffic_values(&blob),
            Err(CodecError::CorruptValues(_))
        ));
    }

    #[test]
    fn test_rejects_garbage_stream() {
        assert!(matches!(
            deserialize_traffic_values(&[0xDE, 0xAD, 0xBE, 0xEF]),
            Err(CodecError::InflateFailed(_))
        ));
    }
}
