//! # tilecodec
//!
//! Bit-packed codecs for the two auxiliary payloads stored alongside a
//! pre-built map tile: turn **restrictions** on the road graph, and a
//! traffic **coloring** mapping directed road segments to coarse speed
//! classes.
//!
//! Both wire formats are consumed by already-deployed readers, so every
//! codec here is bit-exact. Each payload stacks the same few tricks:
//!
//! | Payload | Layers |
//! |---------|--------|
//! | restrictions | fid deltas → zig-zag → Elias delta, framed by a 12-byte header |
//! | traffic keys | group by fid → fid/segment-count deltas → Elias gamma + flag bits |
//! | traffic values | 3-bit speed codes → zlib |
//!
//! Within a byte, bits fill LSB-first; within a multi-bit codeword, bits are
//! emitted MSB-first one at a time. Keeping those two orders straight is the
//! whole game — see [`bits`] and [`elias`].

use std::collections::BTreeMap;
use std::fmt;

pub mod bits;
pub mod coloring;
pub mod elias;
pub mod error;
pub mod restriction;
pub mod traffic_keys;
pub mod traffic_values;
pub mod varint;

pub use coloring::{
    combine_colorings, extract_traffic_keys, pair_coloring, speed_group, FeatureSource,
    RoadClassifier,
};
pub use error::{CodecError, Result};
pub use restriction::{deserialize_restrictions, serialize_restrictions, RestrictionHeader};
pub use traffic_keys::{deserialize_traffic_keys, serialize_traffic_keys};
pub use traffic_values::{deserialize_traffic_values, serialize_traffic_values};

/// Polarity of a turn restriction.
///
/// Every restriction tag found in source data collapses into one of two
/// categories: driving along the chain is forbidden (`No`), or it is the only
/// permitted way through the junction (`Only`). `No` sorts before `Only`,
/// which is also their order on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RestrictionType {
    No = 0,
    Only = 1,
}

impl fmt::Display for RestrictionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RestrictionType::No => "No",
            RestrictionType::Only => "Only",
        })
    }
}

/// A turn restriction: a chain of two or more road features plus a polarity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Restriction {
    pub kind: RestrictionType,
    /// Links of the restriction, in feature-id terms.
    pub feature_ids: Vec<u32>,
}

impl Restriction {
    /// Sentinel for a link that could not be resolved to a real feature.
    pub const INVALID_FEATURE_ID: u32 = u32::MAX;

    pub fn new(kind: RestrictionType, feature_ids: Vec<u32>) -> Self {
        Self { kind, feature_ids }
    }

    /// A restriction is encodable only if it has at least two links, none of
    /// them the invalid sentinel, and no link repeats its predecessor.
    pub fn is_valid(&self) -> bool {
        self.feature_ids.len() >= 2
            && self
                .feature_ids
                .iter()
                .all(|&fid| fid != Self::INVALID_FEATURE_ID)
            && self.feature_ids.windows(2).all(|w| w[0] != w[1])
    }
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {:?}]", self.kind, self.feature_ids)
    }
}

/// A directed sub-segment of a road feature.
///
/// `idx` is the index of the segment's starting point within the feature's
/// polyline; `dir` is [`RoadSegmentId::FORWARD`] or [`RoadSegmentId::REVERSE`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoadSegmentId {
    pub fid: u32,
    pub idx: u16,
    pub dir: u8,
}

impl RoadSegmentId {
    pub const FORWARD: u8 = 0;
    pub const REVERSE: u8 = 1;

    pub fn new(fid: u32, idx: u16, dir: u8) -> Self {
        Self { fid, idx, dir }
    }
}

impl fmt::Display for RoadSegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = if self.dir == Self::FORWARD { "fwd" } else { "rev" };
        write!(f, "{}/{}/{}", self.fid, self.idx, dir)
    }
}

/// Coarse traffic speed classification, stored on the wire as a 3-bit code.
///
/// The numeric codes are fixed by deployed consumers and must not change.
/// `Unknown` (code 0) means "no data for this segment".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SpeedGroup {
    Unknown = 0,
    G0 = 1,
    G1 = 2,
    G2 = 3,
    G3 = 4,
    G4 = 5,
    G5 = 6,
    TempBlock = 7,
}

impl SpeedGroup {
    /// Decodes a 3-bit wire code. Total: only the low three bits are read.
    pub fn from_bits(code: u8) -> Self {
        match code & 0b111 {
            0 => SpeedGroup::Unknown,
            1 => SpeedGroup::G0,
            2 => SpeedGroup::G1,
            3 => SpeedGroup::G2,
            4 => SpeedGroup::G3,
            5 => SpeedGroup::G4,
            6 => SpeedGroup::G5,
            _ => SpeedGroup::TempBlock,
        }
    }

    pub fn to_bits(self) -> u8 {
        self as u8
    }
}

/// A traffic coloring: speed class per directed road segment of one tile.
pub type Coloring = BTreeMap<RoadSegmentId, SpeedGroup>;
