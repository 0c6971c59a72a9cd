//! # Traffic keys codec
//!
//! **Strategy:** a sorted list of directed road segments is almost entirely
//! redundant. Within one feature the segment indices are a dense `0..n`
//! and the directions are either all-forward or a strict fwd/rev
//! alternation, so the list collapses into three parallel arrays per
//! feature: the fid, the segment count, and a one-way flag. Fids are
//! delta-coded and both integer streams use Elias gamma with a +1 bias.
//!
//! ```text
//! [version: u8 = 0]
//! [group count G: varint]
//! per group: [fid delta + 1 : gamma]    (all G of them)
//! per group: [num_segs + 1  : gamma]    (all G of them)
//! per group: [one_way       : 1 bit]    (all G of them)
//! [zero bits to the next byte boundary]
//! ```
//!
//! No outer compression pass; the blob is stored as-is in the tile
//! container or fetched as a remote `*.keys` file.

use std::io::Cursor;

use bytes::Bytes;

use crate::bits::{read_exact_or_eof, BitReader, BitWriter};
use crate::elias::{gamma_decode, gamma_encode};
use crate::error::{CodecError, Result};
use crate::varint::{read_varint, write_varint};
use crate::RoadSegmentId;

/// Format revision this build reads and writes.
pub const KEYS_VERSION: u8 = 0;

struct KeyGroup {
    fid: u32,
    num_segs: u16,
    one_way: bool,
}

/// Serializes a sorted, densely grouped key list.
///
/// The input must be strictly ascending, and each fid's entries must be
/// exactly the `(idx, dir)` grid the decoder will regenerate; anything else
/// is [`CodecError::InconsistentKeys`].
pub fn serialize_traffic_keys(keys: &[RoadSegmentId]) -> Result<Bytes> {
    let groups = group_keys(keys)?;

    let mut out = Vec::new();
    out.push(KEYS_VERSION);
    write_varint(&mut out, groups.len() as u64)?;
    {
        let mut bits = BitWriter::new(&mut out);
        let mut prev_fid = 0u32;
        for group in &groups {
            gamma_encode(&mut bits, u64::from(group.fid - prev_fid) + 1)?;
            prev_fid = group.fid;
        }
        for group in &groups {
            gamma_encode(&mut bits, u64::from(group.num_segs) + 1)?;
        }
        for group in &groups {
            bits.write(u64::from(group.one_way), 1)?;
        }
    }
    Ok(Bytes::from(out))
}

/// Decodes a keys blob back into the sorted segment list.
pub fn deserialize_traffic_keys(data: &[u8]) -> Result<Vec<RoadSegmentId>> {
    let mut source = Cursor::new(data);

    let mut version = [0u8; 1];
    read_exact_or_eof(&mut source, &mut version)?;
    if version[0] != KEYS_VERSION {
        return Err(CodecError::UnsupportedVersion {
            expected: u16::from(KEYS_VERSION),
            got: u16::from(version[0]),
        });
    }
    let group_count = read_varint(&mut source)?;

    let mut fids: Vec<u32> = Vec::new();
    let mut num_segs: Vec<u16> = Vec::new();
    let mut one_way: Vec<bool> = Vec::new();
    {
        let mut bits = BitReader::new(&mut source);
        let mut prev_fid = 0u64;
        for g in 0..group_count {
            let diff = gamma_decode(&mut bits)? - 1;
            if g > 0 && diff == 0 {
                return Err(CodecError::CorruptKeys(
                    "feature ids are not strictly ascending".into(),
                ));
            }
            let fid = prev_fid
                .checked_add(diff)
                .filter(|&fid| fid <= u64::from(u32::MAX))
                .ok_or_else(|| CodecError::CorruptKeys("feature id exceeds 32 bits".into()))?;
            fids.push(fid as u32);
            prev_fid = fid;
        }
        for _ in 0..group_count {
            let n = gamma_decode(&mut bits)? - 1;
            if n > u64::from(u16::MAX) {
                return Err(CodecError::CorruptKeys(
                    "segment count exceeds the 16-bit index space".into(),
                ));
            }
            num_segs.push(n as u16);
        }
        for _ in 0..group_count {
            one_way.push(bits.read(1)? == 1);
        }
    }
    let consumed = source.position() as usize;
    if consumed < data.len() {
        return Err(CodecError::CorruptKeys(format!(
            "{} trailing bytes after payload",
            data.len() - consumed
        )));
    }

    let mut keys = Vec::new();
    for ((&fid, &segs), &ow) in fids.iter().zip(&num_segs).zip(&one_way) {
        let dirs = if ow { 1 } else { 2 };
        for idx in 0..segs {
            for dir in 0..dirs {
                keys.push(RoadSegmentId::new(fid, idx, dir));
            }
        }
    }
    Ok(keys)
}

fn group_keys(keys: &[RoadSegmentId]) -> Result<Vec<KeyGroup>> {
    // Strict ordering also guarantees equal-fid runs are contiguous.
    if !keys.windows(2).all(|w| w[0] < w[1]) {
        return Err(CodecError::InconsistentKeys(
            "keys are not strictly sorted".into(),
        ));
    }

    let mut groups = Vec::new();
    let mut i = 0;
    while i < keys.len() {
        let fid = keys[i].fid;
        let mut j = i;
        while j < keys.len() && keys[j].fid == fid {
            j += 1;
        }
        let entries = &keys[i..j];

        let ow = entries.iter().all(|k| k.dir != RoadSegmentId::REVERSE);
        let dirs = if ow { 1usize } else { 2 };
        if entries.len() % dirs != 0 {
            return Err(CodecError::InconsistentKeys(format!(
                "feature {fid}: {} entries cannot cover {dirs} directions",
                entries.len()
            )));
        }
        let segs = entries.len() / dirs;
        if segs > usize::from(u16::MAX) {
            return Err(CodecError::InconsistentKeys(format!(
                "feature {fid}: {segs} segments exceed the 16-bit index space"
            )));
        }

        // The wire only stores counts; the entries must therefore be the
        // exact grid the decoder will expand them back into.
        for (k, entry) in entries.iter().enumerate() {
            let expected = RoadSegmentId::new(fid, (k / dirs) as u16, (k % dirs) as u8);
            if *entry != expected {
                return Err(CodecError::InconsistentKeys(format!(
                    "feature {fid}: segment list is not a dense index/direction grid \
                     (found {entry}, expected {expected})"
                )));
            }
        }

        groups.push(KeyGroup {
            fid,
            num_segs: segs as u16,
            one_way: ow,
        });
        i = j;
    }
    Ok(groups)
}
