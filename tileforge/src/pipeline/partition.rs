//! Splitting search results into bounded orders.

use super::PipelineError;
use crate::geometry::FeatureSet;
use crate::manifest::OrderManifestEntry;
use crate::provider::SceneId;

/// Order-preserving chunking of scene ids into batches of at most
/// `max_order_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderPartitioner {
    max_order_size: usize,
}

impl OrderPartitioner {
    /// Fails when `max_order_size` is zero.
    pub fn new(max_order_size: usize) -> Result<Self, PipelineError> {
        if max_order_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_order_size must be at least 1".to_string(),
            ));
        }
        Ok(Self { max_order_size })
    }

    pub fn max_order_size(&self) -> usize {
        self.max_order_size
    }

    /// Number of batches `len` ids split into.
    pub fn batch_count(&self, len: usize) -> usize {
        len.div_ceil(self.max_order_size)
    }

    /// Batches of ids, in discovery order. Empty input yields nothing.
    pub fn split<'a>(&self, ids: &'a [SceneId]) -> impl Iterator<Item = &'a [SceneId]> + 'a {
        ids.chunks(self.max_order_size)
    }

    /// One manifest entry per batch, each carrying the target collection.
    pub fn partition<'a>(
        &self,
        geojson: &'a FeatureSet,
        ids: &'a [SceneId],
    ) -> impl Iterator<Item = OrderManifestEntry> + 'a {
        self.split(ids).map(move |batch| OrderManifestEntry {
            geojson: geojson.clone(),
            asset_ids: batch.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ids(n: usize) -> Vec<SceneId> {
        (0..n).map(|i| format!("scene_{i}")).collect()
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(matches!(
            OrderPartitioner::new(0),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty_input_yields_no_batches() {
        let partitioner = OrderPartitioner::new(3).unwrap();
        assert_eq!(partitioner.split(&[]).count(), 0);
        assert_eq!(partitioner.batch_count(0), 0);
    }

    #[test]
    fn test_exact_multiple_keeps_every_id() {
        let partitioner = OrderPartitioner::new(2).unwrap();
        let input = ids(4);
        let batches: Vec<_> = partitioner.split(&input).collect();
        assert_eq!(batches, vec![&input[0..2], &input[2..4]]);
    }

    #[test]
    fn test_partition_carries_geometry() {
        let partitioner = OrderPartitioner::new(2).unwrap();
        let geojson = FeatureSet::new(vec![]);
        let input = ids(3);
        let entries: Vec<_> = partitioner.partition(&geojson, &input).collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].asset_ids, vec!["scene_2".to_string()]);
        assert!(entries.iter().all(|e| e.geojson == geojson));
    }

    proptest! {
        #[test]
        fn prop_batch_sizes_and_order(n in 0usize..400, m in 1usize..60) {
            let partitioner = OrderPartitioner::new(m).unwrap();
            let input = ids(n);
            let batches: Vec<&[SceneId]> = partitioner.split(&input).collect();

            prop_assert_eq!(batches.len(), n.div_ceil(m));
            prop_assert_eq!(batches.len(), partitioner.batch_count(n));
            if let Some((last, full)) = batches.split_last() {
                prop_assert!(full.iter().all(|b| b.len() == m));
                prop_assert!(!last.is_empty() && last.len() <= m);
            }
            let rejoined: Vec<SceneId> = batches.concat();
            prop_assert_eq!(rejoined, input);
        }
    }
}
