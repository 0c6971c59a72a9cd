//! Seeding and assembly of tile colorings.
//!
//! The key list for a tile is derived from the tile itself, not from the
//! traffic feed: every road feature contributes one segment per polyline
//! edge and direction. Feature iteration and road classification belong to
//! external collaborators, consumed here through two narrow traits.

use crate::error::{CodecError, Result};
use crate::{Coloring, RoadSegmentId, SpeedGroup};

/// Iteration over the features of one map tile.
pub trait FeatureSource {
    type Feature;

    /// Visits every feature with its feature id.
    fn for_each_feature(&self, visit: &mut dyn FnMut(u32, &Self::Feature));

    /// Number of points in the feature's best geometry.
    fn points_count(&self, feature: &Self::Feature) -> u16;
}

/// Road classification predicate.
pub trait RoadClassifier<F> {
    fn is_road(&self, feature: &F) -> bool;
    fn is_one_way(&self, feature: &F) -> bool;
}

/// Enumerates the directed road segments of a tile as a sorted key list.
///
/// A feature with `n` polyline points yields `n - 1` segments, each in one
/// direction for one-way roads and in both otherwise.
pub fn extract_traffic_keys<S, C>(tile: &S, classifier: &C) -> Vec<RoadSegmentId>
where
    S: FeatureSource,
    C: RoadClassifier<S::Feature>,
{
    let mut keys = Vec::new();
    tile.for_each_feature(&mut |fid, feature| {
        if !classifier.is_road(feature) {
            return;
        }
        let num_points = tile.points_count(feature);
        let num_dirs = if classifier.is_one_way(feature) { 1 } else { 2 };
        for idx in 0..num_points.saturating_sub(1) {
            for dir in 0..num_dirs {
                keys.push(RoadSegmentId::new(fid, idx, dir));
            }
        }
    });
    keys.sort_unstable();
    keys
}

/// Builds the full coloring for `all_keys`: known entries keep their speed
/// group, everything else becomes [`SpeedGroup::Unknown`].
///
/// Every key in `known` must appear in `all_keys`; a coloring for segments
/// the tile does not have means the two sides disagree about the tile.
pub fn combine_colorings(all_keys: &[RoadSegmentId], known: &Coloring) -> Result<Coloring> {
    let mut combined = Coloring::new();
    let mut num_known = 0usize;
    for key in all_keys {
        match known.get(key) {
            Some(&group) => {
                combined.insert(*key, group);
                num_known += 1;
            }
            None => {
                combined.insert(*key, SpeedGroup::Unknown);
            }
        }
    }

    let unexpected = known.keys().filter(|k| !combined.contains_key(k)).count();
    if unexpected > 0 {
        return Err(CodecError::InconsistentKeys(format!(
            "{unexpected} colored segments missing from the key list"
        )));
    }

    log::info!(
        "road segments known/unknown/total = {}/{}/{}",
        num_known,
        combined.len() - num_known,
        combined.len()
    );
    Ok(combined)
}

/// Zips a decoded key list with its parallel value list into a coloring.
pub fn pair_coloring(keys: &[RoadSegmentId], values: &[SpeedGroup]) -> Result<Coloring> {
    if keys.len() != values.len() {
        return Err(CodecError::CorruptValues(format!(
            "{} values for {} keys",
            values.len(),
            keys.len()
        )));
    }
    Ok(keys.iter().copied().zip(values.iter().copied()).collect())
}

/// Looks up a segment's speed group, defaulting to [`SpeedGroup::Unknown`].
pub fn speed_group(coloring: &Coloring, id: &RoadSegmentId) -> SpeedGroup {
    coloring.get(id).copied().unwrap_or(SpeedGroup::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockFeature {
        road: bool,
        one_way: bool,
        points: u16,
    }

    struct MockTile {
        features: Vec<MockFeature>,
    }

    impl FeatureSource for MockTile {
        type Feature = MockFeature;

        fn for_each_feature(&self, visit: &mut dyn FnMut(u32, &MockFeature)) {
            for (fid, feature) in self.features.iter().enumerate() {
                visit(fid as u32, feature);
            }
        }

        fn points_count(&self, feature: &MockFeature) -> u16 {
            feature.points
        }
    }

    struct MockClassifier;

    impl RoadClassifier<MockFeature> for MockClassifier {
        fn is_road(&self, feature: &MockFeature) -> bool {
            feature.road
        }

        fn is_one_way(&self, feature: &MockFeature) -> bool {
            feature.one_way
        }
    }

    #[test]
    fn test_extract_keys() {
        let tile = MockTile {
            features: vec![
                MockFeature { road: true, one_way: false, points: 3 },
                MockFeature { road: false, one_way: false, points: 10 },
                MockFeature { road: true, one_way: true, points: 3 },
                MockFeature { road: true, one_way: true, points: 1 },
            ],
        };

        let keys = extract_traffic_keys(&tile, &MockClassifier);
        assert_eq!(
            keys,
            vec![
                RoadSegmentId::new(0, 0, 0),
                RoadSegmentId::new(0, 0, 1),
                RoadSegmentId::new(0, 1, 0),
                RoadSegmentId::new(0, 1, 1),
                RoadSegmentId::new(2, 0, 0),
                RoadSegmentId::new(2, 1, 0),
            ]
        );
    }

    #[test]
    fn test_extracted_keys_serialize() {
        let tile = MockTile {
            features: vec![
                MockFeature { road: true, one_way: false, points: 3 },
                MockFeature { road: true, one_way: true, points: 4 },
            ],
        };

        let keys = extract_traffic_keys(&tile, &MockClassifier);
        let decoded =
            crate::deserialize_traffic_keys(&crate::serialize_traffic_keys(&keys).unwrap())
                .unwrap();
        assert_eq!(decoded, keys);
    }

    #[test]
    fn test_combine_fills_unknown() {
        let keys = vec![
            RoadSegmentId::new(1, 0, 0),
            RoadSegmentId::new(1, 0, 1),
            RoadSegmentId::new(2, 0, 0),
        ];
        let mut known = Coloring::new();
        known.insert(keys[1], SpeedGroup::G3);

        let combined = combine_colorings(&keys, &known).unwrap();
        assert_eq!(combined.len(), keys.len());
        assert_eq!(combined[&keys[0]], SpeedGroup::Unknown);
        assert_eq!(combined[&keys[1]], SpeedGroup::G3);
        assert_eq!(combined[&keys[2]], SpeedGroup::Unknown);
    }

    #[test]
    fn test_combine_rejects_unexpected_keys() {
        let keys = vec![RoadSegmentId::new(1, 0, 0)];
        let mut known = Coloring::new();
        known.insert(RoadSegmentId::new(9, 0, 0), SpeedGroup::G1);

        assert!(matches!(
            combine_colorings(&keys, &known),
            Err(CodecError::InconsistentKeys(_))
        ));
    }

    #[test]
    fn test_pair_coloring() {
        let keys = vec![RoadSegmentId::new(1, 0, 0), RoadSegmentId::new(1, 1, 0)];
        let values = vec![SpeedGroup::G0, SpeedGroup::G5];

        let coloring = pair_coloring(&keys, &values).unwrap();
        assert_eq!(speed_group(&coloring, &keys[0]), SpeedGroup::G0);
        assert_eq!(speed_group(&coloring, &keys[1]), SpeedGroup::G5);
        assert_eq!(
            speed_group(&coloring, &RoadSegmentId::new(7, 0, 0)),
            SpeedGroup::Unknown
        );

        assert!(matches!(
            pair_coloring(&keys, &values[..1]),
            Err(CodecError::CorruptValues(_))
        ));
    }
}
