//! # Restriction section codec
//!
//! **Wire layout:** a fixed 12-byte little-endian header, then two
//! bit-packed groups ("No" restrictions, then "Only" restrictions)
//! concatenated with no padding bytes between header and payload. Each
//! group's bit stream is zero-padded to a byte boundary when its bit writer
//! drops, so the "Only" group always starts on a fresh byte.
//!
//! ```text
//! [version: u16][reserved: u16][no_count: u32][only_count: u32]
//! [No group bit stream, byte-padded][Only group bit stream, byte-padded]
//! ```
//!
//! Within a group, each restriction is:
//!
//! ```text
//! [link_count - 1 : Elias delta]
//! per link: [zigzag(fid - prev) + 1 : Elias delta]
//! ```
//!
//! The first link of a restriction is delta-coded against the first link of
//! the *previous* restriction in the group; subsequent links chain within
//! the restriction. Sorting the group makes those deltas small. Both biases
//! keep every codeword at least 1, so a decoded zero can only mean a
//! corrupt stream.

use std::io::{Read, Write};

use crate::bits::{read_exact_or_eof, BitReader, BitWriter};
use crate::elias::{delta_decode, delta_encode};
use crate::error::{CodecError, Result};
use crate::varint::{zigzag_decode, zigzag_encode};
use crate::{Restriction, RestrictionType};

/// Format revision this build reads and writes.
pub const RESTRICTION_VERSION: u16 = 0;

/// Fixed-size section header; exactly [`RestrictionHeader::SIZE`] bytes on
/// the wire, all fields little-endian.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestrictionHeader {
    pub version: u16,
    pub reserved: u16,
    pub no_count: u32,
    pub only_count: u32,
}

impl RestrictionHeader {
    pub const SIZE: usize = 12;

    pub fn new(no_count: u32, only_count: u32) -> Self {
        Self {
            version: RESTRICTION_VERSION,
            reserved: 0,
            no_count,
            only_count,
        }
    }

    pub fn serialize<W: Write>(&self, sink: &mut W) -> Result<()> {
        sink.write_all(&self.version.to_le_bytes())?;
        sink.write_all(&self.reserved.to_le_bytes())?;
        sink.write_all(&self.no_count.to_le_bytes())?;
        sink.write_all(&self.only_count.to_le_bytes())?;
        Ok(())
    }

    pub fn deserialize<R: Read>(source: &mut R) -> Result<Self> {
        let mut raw = [0u8; Self::SIZE];
        read_exact_or_eof(source, &mut raw)?;
        let header = Self {
            version: u16::from_le_bytes([raw[0], raw[1]]),
            reserved: u16::from_le_bytes([raw[2], raw[3]]),
            no_count: u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]),
            only_count: u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]),
        };
        if header.version != RESTRICTION_VERSION {
            return Err(CodecError::UnsupportedVersion {
                expected: RESTRICTION_VERSION,
                got: header.version,
            });
        }
        if header.reserved != 0 {
            // Tolerated for forward compatibility; writers always emit 0.
            log::warn!(
                "nonzero reserved field in restriction header: {:#06x}",
                header.reserved
            );
        }
        Ok(header)
    }
}

/// Serializes a sorted restriction vector, `[0, split)` holding the `No`
/// restrictions and `[split, len)` the `Only` ones, writing the header and
/// both groups to `sink`.
///
/// The input is validated before a single byte is emitted: each group must
/// be sorted, hold only its own polarity, and contain only
/// [`Restriction::is_valid`] entries.
pub fn serialize_restrictions<W: Write>(
    restrictions: &[Restriction],
    split: usize,
    sink: &mut W,
) -> Result<()> {
    if split > restrictions.len() {
        return Err(CodecError::InvalidRestriction(format!(
            "split index {split} past the end of {} restrictions",
            restrictions.len()
        )));
    }
    let (no, only) = restrictions.split_at(split);
    validate_group(no, RestrictionType::No)?;
    validate_group(only, RestrictionType::Only)?;

    let no_count = group_count(no)?;
    let only_count = group_count(only)?;
    RestrictionHeader::new(no_count, only_count).serialize(sink)?;
    serialize_group(no, sink)?;
    serialize_group(only, sink)?;
    Ok(())
}

/// Decodes the two restriction groups described by `header` from `source`.
///
/// On any error nothing is returned; partially decoded restrictions are
/// discarded rather than exposed.
pub fn deserialize_restrictions<R: Read>(
    header: &RestrictionHeader,
    source: &mut R,
) -> Result<Vec<Restriction>> {
    let mut restrictions = Vec::new();
    deserialize_group(RestrictionType::No, header.no_count, source, &mut restrictions)?;
    deserialize_group(RestrictionType::Only, header.only_count, source, &mut restrictions)?;
    Ok(restrictions)
}

fn group_count(group: &[Restriction]) -> Result<u32> {
    u32::try_from(group.len()).map_err(|_| {
        CodecError::InvalidRestriction(format!("group of {} does not fit the header", group.len()))
    })
}

fn validate_group(group: &[Restriction], kind: RestrictionType) -> Result<()> {
    for restriction in group {
        if restriction.kind != kind {
            return Err(CodecError::InvalidRestriction(format!(
                "{} restriction in the {} group",
                restriction.kind, kind
            )));
        }
        if !restriction.is_valid() {
            return Err(CodecError::InvalidRestriction(format!(
                "invalid restriction {restriction}"
            )));
        }
    }
    if !group.windows(2).all(|w| w[0] <= w[1]) {
        return Err(CodecError::InvalidRestriction(format!(
            "{kind} group is not sorted"
        )));
    }
    Ok(())
}

fn serialize_group<W: Write>(group: &[Restriction], sink: &mut W) -> Result<()> {
    if group.is_empty() {
        return Ok(());
    }
    let mut bits = BitWriter::new(sink);
    let mut prev_first_fid = 0u32;
    for restriction in group {
        delta_encode(&mut bits, (restriction.feature_ids.len() - 1) as u64)?;
        let mut prev_link = prev_first_fid;
        for &fid in &restriction.feature_ids {
            let delta = zigzag_encode(fid.wrapping_sub(prev_link) as i32);
            delta_encode(&mut bits, u64::from(delta) + 1)?;
            prev_link = fid;
        }
        prev_first_fid = restriction.feature_ids[0];
    }
    Ok(())
}

fn deserialize_group<R: Read>(
    kind: RestrictionType,
    count: u32,
    source: &mut R,
    out: &mut Vec<Restriction>,
) -> Result<()> {
    if count == 0 {
        return Ok(());
    }
    let mut bits = BitReader::new(source);
    let mut prev_first_fid = 0u32;
    for _ in 0..count {
        let link_count = decode_biased(&mut bits)?
            .checked_add(1)
            .ok_or(CodecError::CorruptRestriction("link count overflows"))?;
        let mut feature_ids = Vec::new();
        let mut prev_link = prev_first_fid;
        for _ in 0..link_count {
            let delta = decode_biased(&mut bits)? - 1;
            if delta > u64::from(u32::MAX) {
                return Err(CodecError::CorruptRestriction("link delta exceeds 32 bits"));
            }
            let fid = prev_link.wrapping_add(zigzag_decode(delta as u32) as u32);
            feature_ids.push(fid);
            prev_link = fid;
        }
        prev_first_fid = feature_ids[0];
        out.push(Restriction::new(kind, feature_ids));
    }
    Ok(())
}

/// Decodes one biased codeword. The wire biases every value by +1, so a
/// zero can only be expressed by an overlong unary run; classify that as
/// stream corruption rather than a coder-level overflow.
fn decode_biased<R: Read>(bits: &mut BitReader<'_, R>) -> Result<u64> {
    match delta_decode(bits) {
        Err(CodecError::Overflow) => Err(CodecError::CorruptRestriction(
            "biased value decoded as zero",
        )),
        other => other,
    }
}
