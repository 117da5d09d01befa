//! Generalized Random Tessellation Stratified (GRTS) sampling.
//!
//! Grid selection walks the address-sorted (and possibly weighted) quadrant
//! rows with a fixed skip, which spreads the picks evenly over space because
//! address order follows a Morton-like curve. Points are then drawn inside
//! each selected quadrant.

use crate::compute::random::fork;
use crate::compute::spatial::SpatialIndex;
use crate::config::SampleConfig;
use crate::dataset::PointDataset;
use crate::error::{GrtsError, Result};
use crate::table::QuadRow;
use crate::tree::QuadTree;
use crate::weighting::{WeightedTable, WeightingEngine};
use grts_types::address::QuadAddress;
use rand::Rng;
use rand::seq::SliceRandom;
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;

/// How points are chosen inside a selected quadrant.
#[derive(Debug, Clone, PartialEq)]
pub enum WithinGrid<'s> {
    /// Per attribute value, up to the value's quota (default `samples_per_grid`).
    Stratified {
        column: &'s str,
        quotas: Option<&'s BTreeMap<String, usize>>,
    },
    /// Weighted by distance to the quadrant edge, interior points favoured.
    DistanceWeighted { multiplier: f64 },
    /// Uniform without replacement.
    Plain,
}

/// Grids and points chosen by one GRTS draw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleOutput {
    /// Selected quadrants, distinct, in selection order.
    pub grids: Vec<QuadRow>,
    /// Selected point ids, distinct and ascending.
    pub points: Vec<usize>,
}

impl SampleOutput {
    pub fn addresses(&self) -> impl Iterator<Item = &QuadAddress> {
        self.grids.iter().map(|row| &row.address)
    }

    /// Rows of `dataset` for the selected points.
    pub fn to_dataset(&self, dataset: &PointDataset) -> Result<PointDataset> {
        dataset.select(&self.points)
    }
}

pub struct GrtsSampler<'s, I> {
    dataset: &'s PointDataset,
    index: &'s I,
    samples_per_grid: usize,
    policy: WithinGrid<'s>,
}

impl<'s, I: SpatialIndex> GrtsSampler<'s, I> {
    /// Validate `config` and resolve its within-grid policy.
    ///
    /// Precedence: stratified, then distance-weighted, then plain.
    pub fn new(dataset: &'s PointDataset, index: &'s I, config: &'s SampleConfig) -> Result<Self> {
        config.validate().map_err(GrtsError::InvalidConfig)?;

        let policy = if let Some(column) = config.strata_column.as_deref() {
            if dataset.column(column).is_none() {
                return Err(GrtsError::InvalidConfig(format!(
                    "strata column '{}' is not in the dataset",
                    column
                )));
            }
            WithinGrid::Stratified {
                column,
                quotas: config.strata_samples_per_grid.as_ref(),
            }
        } else if config.weight_sample_by_distance {
            WithinGrid::DistanceWeighted {
                multiplier: config.multiply_distance_weights_by,
            }
        } else {
            WithinGrid::Plain
        };

        Ok(Self {
            dataset,
            index,
            samples_per_grid: config.samples_per_grid,
            policy,
        })
    }

    pub fn policy(&self) -> &WithinGrid<'s> {
        &self.policy
    }

    /// Select `n` distinct quadrants from an address-sorted pool.
    ///
    /// With `seed_start` a random number of leading rows, below the skip, is
    /// dropped first so repeated draws do not lock onto the same phase. Rows
    /// are then taken every `ceil(pool / n)` positions; if duplicates or the
    /// trimmed pool leave the selection short, the rest is drawn uniformly
    /// from the unselected quadrants.
    pub fn select_grids<R: Rng + ?Sized>(
        &self,
        pool: &WeightedTable,
        n: usize,
        seed_start: bool,
        rng: &mut R,
    ) -> Result<Vec<QuadRow>> {
        if n == 0 {
            return Err(GrtsError::InvalidConfig(
                "the target grid count must be greater than zero".to_string(),
            ));
        }

        let distinct = pool.distinct_len();
        if n > distinct {
            return Err(GrtsError::insufficient("grid selection", n, distinct));
        }

        let rows = pool.rows();
        let start = if seed_start {
            fork(rng).gen_range(0..rows.len().div_ceil(n))
        } else {
            0
        };

        let trimmed = &rows[start..];
        let skip = trimmed.len().div_ceil(n);

        let mut seen = FxHashSet::default();
        let mut selected: Vec<QuadRow> = trimmed
            .iter()
            .step_by(skip)
            .filter(|row| seen.insert(row.address.clone()))
            .cloned()
            .collect();

        log::debug!(
            "GRTS pool of {} rows ({} quadrants): start {}, skip {}, {} systematic picks",
            rows.len(),
            distinct,
            start,
            skip,
            selected.len()
        );

        if selected.len() < n {
            let mut unselected: Vec<&QuadRow> = Vec::new();
            for row in rows {
                if seen.insert(row.address.clone()) {
                    unselected.push(row);
                }
            }

            let needed = n - selected.len();
            if unselected.len() < needed {
                return Err(GrtsError::insufficient(
                    "grid top-up",
                    needed,
                    unselected.len(),
                ));
            }

            let mut sub = fork(rng);
            selected.extend(
                unselected
                    .choose_multiple(&mut sub, needed)
                    .map(|row| (*row).clone()),
            );
            log::debug!("Topped up {} grids at random", needed);
        }

        Ok(selected)
    }

    /// Draw points inside each grid and return the distinct ids, ascending.
    ///
    /// Every grid draws from its own child generator, so a grid's picks do
    /// not depend on how many candidates the grids before it held.
    pub fn sample_points<R: Rng + ?Sized>(&self, grids: &[QuadRow], rng: &mut R) -> Result<Vec<usize>> {
        let mut ids = Vec::with_capacity(grids.len() * self.samples_per_grid);

        for grid in grids {
            let mut grid_rng = fork(rng);
            let mut candidates = self.index.intersect(&grid.bbox);
            if candidates.is_empty() {
                if self.samples_per_grid > 0 {
                    return Err(GrtsError::EmptyQuadrant {
                        address: grid.address.to_string(),
                        requested: self.samples_per_grid,
                    });
                }
                continue;
            }

            candidates.shuffle(&mut grid_rng);

            match &self.policy {
                WithinGrid::Stratified { column, quotas } => {
                    ids.extend(self.stratified(&candidates, column, *quotas, &mut grid_rng)?);
                }
                WithinGrid::DistanceWeighted { multiplier } => {
                    ids.extend(self.distance_weighted(grid, &candidates, *multiplier, &mut grid_rng)?);
                }
                WithinGrid::Plain => {
                    candidates.truncate(self.samples_per_grid);
                    ids.extend(candidates);
                }
            }
        }

        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    /// Select `n` grids from `pool`, then points inside them.
    pub fn draw<R: Rng + ?Sized>(
        &self,
        pool: &WeightedTable,
        n: usize,
        seed_start: bool,
        rng: &mut R,
    ) -> Result<SampleOutput> {
        let grids = self.select_grids(pool, n, seed_start, rng)?;
        let points = self.sample_points(&grids, rng)?;
        Ok(SampleOutput { grids, points })
    }

    fn stratified<R: Rng + ?Sized>(
        &self,
        candidates: &[usize],
        column: &str,
        quotas: Option<&BTreeMap<String, usize>>,
        rng: &mut R,
    ) -> Result<Vec<usize>> {
        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for &id in candidates {
            let value = self.dataset.attribute(id, column).ok_or_else(|| {
                GrtsError::InvalidInput(format!("point {} has no '{}' value", id, column))
            })?;
            groups.entry(value).or_default().push(id);
        }

        let mut chosen = Vec::new();
        for (value, members) in groups {
            let quota = quotas
                .and_then(|q| q.get(value))
                .copied()
                .unwrap_or(self.samples_per_grid);
            let take = quota.min(members.len());
            let mut sub = fork(rng);
            chosen.extend(members.choose_multiple(&mut sub, take).copied());
        }
        Ok(chosen)
    }

    fn distance_weighted<R: Rng + ?Sized>(
        &self,
        grid: &QuadRow,
        candidates: &[usize],
        multiplier: f64,
        rng: &mut R,
    ) -> Result<Vec<usize>> {
        let mut distances = Vec::with_capacity(candidates.len());
        for &id in candidates {
            let point = self.dataset.point(id).ok_or_else(|| {
                GrtsError::InvalidInput(format!("index returned unknown point id {}", id))
            })?;
            distances.push(grid.bbox.boundary_distance(point.x(), point.y()));
        }

        let max = distances.iter().copied().fold(0.0, f64::max);
        let mut weighted: Vec<(usize, f64)> = candidates
            .iter()
            .zip(&distances)
            .map(|(&id, &d)| {
                let w = if max > 0.0 { (d / max).clamp(0.1, 1.0) } else { 1.0 };
                (id, w * multiplier)
            })
            .collect();

        let total: f64 = weighted.iter().map(|(_, w)| w).sum();
        for (_, w) in &mut weighted {
            *w /= total;
        }

        let take = self.samples_per_grid.min(candidates.len());
        let mut sub = fork(rng);
        let chosen = weighted
            .choose_multiple_weighted(&mut sub, take, |item| item.1)
            .map_err(|e| {
                GrtsError::InvalidInput(format!(
                    "distance weights for quadrant '{}' are invalid: {}",
                    grid.address, e
                ))
            })?
            .map(|item| item.0)
            .collect();
        Ok(chosen)
    }
}

impl<'a, I: SpatialIndex> QuadTree<'a, I> {
    /// Draw a GRTS sample of `config.n` grids over the current quadrants.
    ///
    /// ```rust
    /// use grts::{PointDataset, QuadTree, SampleConfig};
    ///
    /// let coords: Vec<(f64, f64)> = (0..64)
    ///     .map(|i| ((i % 8) as f64 * 10_000.0, (i / 8) as f64 * 10_000.0))
    ///     .collect();
    /// let dataset = PointDataset::from_xy(coords)?;
    /// let mut tree = QuadTree::new(&dataset, true)?;
    /// tree.split(0).split(0);
    ///
    /// let config = SampleConfig::new(4).with_random_state(42);
    /// let sample = tree.sample(&config, &mut config.rng())?;
    /// assert_eq!(sample.grids.len(), 4);
    /// assert_eq!(sample.points.len(), 4);
    /// # Ok::<(), grts::GrtsError>(())
    /// ```
    pub fn sample<R: Rng + ?Sized>(&self, config: &SampleConfig, rng: &mut R) -> Result<SampleOutput> {
        let sampler = GrtsSampler::new(self.dataset(), self.index(), config)?;
        let pool = WeightingEngine::new(config.weight_method).apply(&self.table(), rng)?;
        let output = sampler.draw(&pool, config.n, false, rng)?;

        log::info!(
            "Sampled {} points from {} of {} grids",
            output.points.len(),
            output.grids.len(),
            self.nquads()
        );
        Ok(output)
    }
}
