//! Grid weighting: duplicate quadrant rows so that systematic sampling over
//! the address order favours some quadrants over others.
//!
//! - `none`: the table is passed through.
//! - `density-factor` / `inverse-density`: sparse quadrants are duplicated
//!   according to `max(count) / count`.
//! - `cluster`: the quadrants nearest to k-means centers of the quadrant
//!   centroids are duplicated.
//!
//! Duplication never changes a row's address or geometry, and the output is
//! re-sorted by address so duplicates sit next to their original.

use crate::compute::random::fork;
use crate::compute::spatial::{Clusterer, KMeans, QuadrantIndex, SpatialIndex};
use crate::config::WeightMethod;
use crate::error::{GrtsError, Result};
use crate::table::{QuadRow, QuadrantTable};
use grts_types::address::QuadAddress;
use rand::Rng;
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;

/// Cluster labels of the quadrant layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterLayout {
    pub labels: BTreeMap<QuadAddress, usize>,
    pub centers: Vec<[f64; 2]>,
}

/// Quadrant rows after weighting, sorted by address, duplicates allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedTable {
    rows: Vec<QuadRow>,
    clusters: Option<ClusterLayout>,
}

impl WeightedTable {
    fn sorted(mut rows: Vec<QuadRow>, clusters: Option<ClusterLayout>) -> Self {
        rows.sort_by(|a, b| a.address.cmp(&b.address));
        Self { rows, clusters }
    }

    pub fn rows(&self) -> &[QuadRow] {
        &self.rows
    }

    /// Number of rows, counting duplicates.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of distinct quadrant addresses.
    pub fn distinct_len(&self) -> usize {
        let mut n = 0;
        let mut last: Option<&QuadAddress> = None;
        for row in &self.rows {
            if last != Some(&row.address) {
                n += 1;
                last = Some(&row.address);
            }
        }
        n
    }

    /// How many rows carry `address`.
    pub fn occurrences(&self, address: &QuadAddress) -> usize {
        self.rows.iter().filter(|row| &row.address == address).count()
    }

    /// Cluster layout, present after `cluster` weighting.
    pub fn clusters(&self) -> Option<&ClusterLayout> {
        self.clusters.as_ref()
    }

    /// Table without any row carrying one of the given addresses.
    pub fn without(&self, excluded: &FxHashSet<QuadAddress>) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .filter(|row| !excluded.contains(&row.address))
                .cloned()
                .collect(),
            clusters: self.clusters.clone(),
        }
    }
}

impl From<QuadrantTable> for WeightedTable {
    fn from(table: QuadrantTable) -> Self {
        Self {
            rows: table.into_rows(),
            clusters: None,
        }
    }
}

/// Inverse relative density `max(count) / count` of every row.
pub fn oversample_factors(table: &QuadrantTable) -> Result<Vec<f64>> {
    let max = table.max_count().unwrap_or(0) as f64;
    table
        .iter()
        .map(|row| {
            if row.count == 0 {
                Err(GrtsError::InvalidInput(format!(
                    "quadrant '{}' has no points and cannot be density weighted",
                    row.address
                )))
            } else {
                Ok(max / row.count as f64)
            }
        })
        .collect()
}

/// Density-based duplication.
///
/// `inverse-density` appends `round(factor)` copies of every row with a
/// factor above 1; `density-factor` appends one copy of every row with a
/// factor above 2.
pub fn weight_upsample(table: &QuadrantTable, inverse_density: bool) -> Result<WeightedTable> {
    let factors = oversample_factors(table)?;
    let mut rows = table.rows().to_vec();

    for (row, factor) in table.iter().zip(factors) {
        let copies = if inverse_density {
            if factor > 1.0 { factor.round() as usize } else { 0 }
        } else if factor > 2.0 {
            1
        } else {
            0
        };
        rows.extend(std::iter::repeat_n(row, copies).cloned());
    }

    Ok(WeightedTable::sorted(rows, None))
}

/// Cluster-proximity duplication.
///
/// Clusters the quadrant centroids into `n_clusters` groups and appends a
/// copy of the `num_results` quadrants nearest to each cluster center.
pub fn weight_grids<C, R>(
    table: &QuadrantTable,
    n_clusters: usize,
    num_results: usize,
    clusterer: &C,
    rng: &mut R,
) -> Result<WeightedTable>
where
    C: Clusterer,
    R: Rng + ?Sized,
{
    if n_clusters > table.len() {
        return Err(GrtsError::insufficient(
            "cluster weighting",
            n_clusters,
            table.len(),
        ));
    }

    let centroids: Vec<[f64; 2]> = table
        .iter()
        .map(|row| {
            let c = row.bbox.centroid();
            [c.x(), c.y()]
        })
        .collect();

    let clustering = clusterer.cluster(&centroids, n_clusters, &mut fork(rng))?;
    let index = QuadrantIndex::new(table.iter().map(|row| &row.bbox));

    let mut rows = table.rows().to_vec();
    for center in &clustering.centers {
        for near in index.nearest(center[0], center[1], num_results) {
            rows.push(table.rows()[near].clone());
        }
    }

    let labels = table
        .iter()
        .zip(&clustering.assignments)
        .map(|(row, &label)| (row.address.clone(), label))
        .collect();

    log::debug!(
        "Cluster weighting added {} rows around {} centers",
        rows.len() - table.len(),
        clustering.centers.len()
    );

    Ok(WeightedTable::sorted(
        rows,
        Some(ClusterLayout {
            labels,
            centers: clustering.centers,
        }),
    ))
}

/// Applies one [`WeightMethod`] to quadrant tables.
#[derive(Debug, Clone)]
pub struct WeightingEngine<C = KMeans> {
    method: WeightMethod,
    clusterer: C,
}

impl WeightingEngine<KMeans> {
    pub fn new(method: WeightMethod) -> Self {
        Self::with_clusterer(method, KMeans::default())
    }
}

impl<C: Clusterer> WeightingEngine<C> {
    pub fn with_clusterer(method: WeightMethod, clusterer: C) -> Self {
        Self { method, clusterer }
    }

    pub fn method(&self) -> WeightMethod {
        self.method
    }

    pub fn apply<R: Rng + ?Sized>(&self, table: &QuadrantTable, rng: &mut R) -> Result<WeightedTable> {
        let weighted = match self.method {
            WeightMethod::None => WeightedTable::from(table.clone()),
            WeightMethod::DensityFactor => weight_upsample(table, false)?,
            WeightMethod::InverseDensity => weight_upsample(table, true)?,
            WeightMethod::Cluster {
                n_clusters,
                num_results,
            } => weight_grids(table, n_clusters, num_results, &self.clusterer, rng)?,
        };

        log::debug!(
            "Weighting '{}' expanded {} quadrants to {} rows",
            self.method.name(),
            table.len(),
            weighted.len()
        );
        Ok(weighted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grts_types::bbox::BBox;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn table_with_counts(counts: &[usize]) -> QuadrantTable {
        let rows = counts
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                let x = i as f64 * 10.0;
                QuadRow::new(
                    QuadAddress::root().child(i as u8),
                    BBox::new(x, 0.0, x + 10.0, 10.0),
                    count,
                )
            })
            .collect();
        QuadrantTable::from_rows(rows).unwrap()
    }

    fn address(s: &str) -> QuadAddress {
        QuadAddress::parse(s).unwrap()
    }

    #[test]
    fn test_oversample_factors() {
        let table = table_with_counts(&[10, 5, 1]);
        assert_eq!(oversample_factors(&table).unwrap(), vec![1.0, 2.0, 10.0]);
    }

    #[test]
    fn test_inverse_density() {
        let table = table_with_counts(&[10, 5, 1]);
        let weighted = weight_upsample(&table, true).unwrap();

        assert_eq!(weighted.occurrences(&address("0")), 1);
        assert_eq!(weighted.occurrences(&address("1")), 3);
        assert_eq!(weighted.occurrences(&address("2")), 11);
        assert_eq!(weighted.distinct_len(), 3);
    }

    #[test]
    fn test_density_factor() {
        let table = table_with_counts(&[10, 5, 1]);
        let weighted = weight_upsample(&table, false).unwrap();

        // Only the factor 10 quadrant clears the > 2 bar, and only once
        assert_eq!(weighted.occurrences(&address("0")), 1);
        assert_eq!(weighted.occurrences(&address("1")), 1);
        assert_eq!(weighted.occurrences(&address("2")), 2);
    }

    #[test]
    fn test_weighted_rows_stay_sorted() {
        let table = table_with_counts(&[1, 8, 2, 4]);
        let weighted = weight_upsample(&table, true).unwrap();
        let rows = weighted.rows();
        assert!(rows.windows(2).all(|w| w[0].address <= w[1].address));
        assert!(rows.iter().all(|r| table.get(&r.address) == Some(r)));
    }

    #[test]
    fn test_none_passes_through() {
        let table = table_with_counts(&[3, 1]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let weighted = WeightingEngine::new(WeightMethod::None)
            .apply(&table, &mut rng)
            .unwrap();
        assert_eq!(weighted.rows(), table.rows());
    }

    #[test]
    fn test_cluster_weighting() {
        let table = table_with_counts(&[1, 1, 1, 1]);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let engine = WeightingEngine::new(WeightMethod::Cluster {
            n_clusters: 2,
            num_results: 1,
        });
        let weighted = engine.apply(&table, &mut rng).unwrap();

        assert_eq!(weighted.len(), 6);
        assert_eq!(weighted.distinct_len(), 4);
        let layout = weighted.clusters().unwrap();
        assert_eq!(layout.centers.len(), 2);
        assert_eq!(layout.labels.len(), 4);
    }

    #[test]
    fn test_cluster_weighting_needs_enough_quadrants() {
        let table = table_with_counts(&[1, 1]);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let result = WeightingEngine::new(WeightMethod::cluster()).apply(&table, &mut rng);
        assert!(matches!(result, Err(GrtsError::InsufficientPool { .. })));
    }
}
