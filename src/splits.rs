//! Disjoint train/validation/test partitions and k-fold sequences built from
//! repeated GRTS draws.

use crate::compute::spatial::SpatialIndex;
use crate::config::{KFoldConfig, SampleConfig, TrainValTestConfig};
use crate::error::{GrtsError, Result};
use crate::sampler::GrtsSampler;
use crate::table::{QuadRow, QuadrantTable};
use crate::tree::QuadTree;
use crate::weighting::{WeightedTable, WeightingEngine};
use grts_types::address::QuadAddress;
use rand::Rng;
use rustc_hash::FxHashSet;
use serde::Serialize;

/// One partition: the grids it owns and the points drawn inside them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Split {
    pub grids: Vec<QuadRow>,
    pub points: Vec<usize>,
}

impl Split {
    pub fn addresses(&self) -> FxHashSet<QuadAddress> {
        self.grids.iter().map(|row| row.address.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitSet {
    pub train: Split,
    pub val: Split,
    pub test: Split,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fold {
    /// Zero-based fold number.
    pub index: usize,
    pub train: Split,
    pub test: Split,
}

/// Fail with `GrtsError::Integrity` unless every split holds distinct grids and
/// no grid address or point id is shared between two splits.
pub fn check_integrity(splits: &[(&str, &Split)]) -> Result<()> {
    let mut owners: Vec<(&str, FxHashSet<QuadAddress>, FxHashSet<usize>)> =
        Vec::with_capacity(splits.len());

    for (name, split) in splits {
        let addresses = split.addresses();
        if addresses.len() != split.grids.len() {
            return Err(GrtsError::Integrity(format!(
                "{} split holds {} duplicate grid(s)",
                name,
                split.grids.len() - addresses.len()
            )));
        }
        let points: FxHashSet<usize> = split.points.iter().copied().collect();

        for (other, other_addresses, other_points) in &owners {
            if let Some(address) = addresses.intersection(other_addresses).next() {
                return Err(GrtsError::Integrity(format!(
                    "grid '{}' is in both the {} and {} splits",
                    address, other, name
                )));
            }
            if let Some(id) = points.intersection(other_points).next() {
                return Err(GrtsError::Integrity(format!(
                    "point {} is in both the {} and {} splits",
                    id, other, name
                )));
            }
        }
        owners.push((name, addresses, points));
    }
    Ok(())
}

/// `floor(available * fraction)`; a split needs at least one grid.
fn split_size(context: &str, available: usize, fraction: f64) -> Result<usize> {
    let size = (available as f64 * fraction).floor() as usize;
    if size == 0 {
        return Err(GrtsError::insufficient(context, 1, available));
    }
    Ok(size)
}

/// Draw one split with a random start and remove its grids from `pool`.
fn draw_split<I: SpatialIndex, R: Rng + ?Sized>(
    sampler: &GrtsSampler<'_, I>,
    pool: &mut WeightedTable,
    context: &str,
    fraction: f64,
    rng: &mut R,
) -> Result<Split> {
    let n = split_size(context, pool.distinct_len(), fraction)?;
    let output = sampler.draw(pool, n, true, rng)?;
    let split = Split {
        grids: output.grids,
        points: output.points,
    };
    *pool = pool.without(&split.addresses());
    Ok(split)
}

impl<'a, I: SpatialIndex> QuadTree<'a, I> {
    /// Draw test, then validation, then train grids from a shrinking pool.
    ///
    /// The quadrant table is weighted once. Each split is sized from the
    /// distinct quadrants still in the pool and drawn with a random start.
    ///
    /// # Errors
    ///
    /// `InsufficientPool` naming the split when a fraction of the remaining
    /// pool rounds down to zero grids.
    pub fn train_val_test<R: Rng + ?Sized>(
        &self,
        config: &SampleConfig,
        fractions: &TrainValTestConfig,
        rng: &mut R,
    ) -> Result<SplitSet> {
        fractions.validate().map_err(GrtsError::InvalidConfig)?;
        let sampler = GrtsSampler::new(self.dataset(), self.index(), config)?;
        let mut pool = WeightingEngine::new(config.weight_method).apply(&self.table(), rng)?;

        let test = draw_split(&sampler, &mut pool, "test split", fractions.test_frac, rng)?;
        let val = draw_split(&sampler, &mut pool, "validation split", fractions.val_frac, rng)?;
        let train = draw_split(&sampler, &mut pool, "train split", fractions.train_frac, rng)?;

        check_integrity(&[("train", &train), ("val", &val), ("test", &test)])?;
        log::info!(
            "Split {} quadrants into train/val/test grids {}/{}/{}",
            self.nquads(),
            train.grids.len(),
            val.grids.len(),
            test.grids.len()
        );

        Ok(SplitSet { train, val, test })
    }

    /// Lazily yield `n_splits` folds whose test grids tile the quadrant table.
    ///
    /// ```rust
    /// use grts::{KFoldConfig, PointDataset, QuadTree, SampleConfig};
    ///
    /// let coords: Vec<(f64, f64)> = (0..64)
    ///     .map(|i| ((i % 8) as f64 * 10_000.0, (i / 8) as f64 * 10_000.0))
    ///     .collect();
    /// let dataset = PointDataset::from_xy(coords)?;
    /// let mut tree = QuadTree::new(&dataset, true)?;
    /// tree.split(0).split(0);
    ///
    /// let config = SampleConfig::default().with_random_state(3);
    /// let mut rng = config.rng();
    /// let folds = tree
    ///     .kfold(&config, &KFoldConfig::new(4), &mut rng)?
    ///     .collect::<Result<Vec<_>, _>>()?;
    /// assert_eq!(folds.len(), 4);
    /// assert!(folds.iter().all(|fold| fold.test.grids.len() == 4));
    /// # Ok::<(), grts::GrtsError>(())
    /// ```
    pub fn kfold<'s, 'r, R: Rng + ?Sized>(
        &'s self,
        config: &'s SampleConfig,
        kfold: &KFoldConfig,
        rng: &'r mut R,
    ) -> Result<KFold<'s, 'r, I, R>> {
        kfold.validate().map_err(GrtsError::InvalidConfig)?;
        let sampler = GrtsSampler::new(self.dataset(), self.index(), config)?;

        let full = self.table();
        let fold_size = full.len() / kfold.n_splits;
        if fold_size == 0 {
            return Err(GrtsError::insufficient(
                "k-fold test split",
                kfold.n_splits,
                full.len(),
            ));
        }
        log::debug!(
            "K-fold over {} quadrants: {} folds of {} grids",
            full.len(),
            kfold.n_splits,
            fold_size
        );

        Ok(KFold {
            sampler,
            engine: WeightingEngine::new(config.weight_method),
            remaining: full.clone(),
            full,
            fold_size,
            n_splits: kfold.n_splits,
            next: 0,
            done: false,
            rng,
        })
    }
}

/// Fold sequence returned by [`QuadTree::kfold`].
///
/// Each fold draws its test grids from the quadrants no earlier fold has
/// tested, without a random start. Train grids are every other quadrant of the
/// full table. Iteration ends after `n_splits` folds or the first error.
pub struct KFold<'s, 'r, I, R: ?Sized> {
    sampler: GrtsSampler<'s, I>,
    engine: WeightingEngine,
    full: QuadrantTable,
    remaining: QuadrantTable,
    fold_size: usize,
    n_splits: usize,
    next: usize,
    done: bool,
    rng: &'r mut R,
}

impl<I, R: ?Sized> KFold<'_, '_, I, R> {
    pub fn fold_size(&self) -> usize {
        self.fold_size
    }

    /// Quadrants not yet used as test grids.
    pub fn remaining(&self) -> &QuadrantTable {
        &self.remaining
    }
}

impl<I: SpatialIndex, R: Rng + ?Sized> KFold<'_, '_, I, R> {
    fn next_fold(&mut self) -> Result<Fold> {
        let pool = self.engine.apply(&self.remaining, &mut *self.rng)?;
        let output = self.sampler.draw(&pool, self.fold_size, false, &mut *self.rng)?;
        let test = Split {
            grids: output.grids,
            points: output.points,
        };

        let tested = test.addresses();
        let train_grids = self.full.without(&tested).into_rows();
        let train_points = self.sampler.sample_points(&train_grids, &mut *self.rng)?;
        let train = Split {
            grids: train_grids,
            points: train_points,
        };

        check_integrity(&[("train", &train), ("test", &test)])?;
        self.remaining = self.remaining.without(&tested);

        log::info!(
            "Fold {}/{}: {} train grids, {} test grids, {} quadrants left",
            self.next + 1,
            self.n_splits,
            train.grids.len(),
            test.grids.len(),
            self.remaining.len()
        );

        Ok(Fold {
            index: self.next,
            train,
            test,
        })
    }
}

impl<I: SpatialIndex, R: Rng + ?Sized> Iterator for KFold<'_, '_, I, R> {
    type Item = Result<Fold>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.next >= self.n_splits {
            return None;
        }
        let fold = self.next_fold();
        match fold {
            Ok(_) => self.next += 1,
            Err(_) => self.done = true,
        }
        Some(fold)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        (0, Some(self.n_splits - self.next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::PointDataset;
    use grts_types::bbox::BBox;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn lattice(side: usize, spacing: f64) -> PointDataset {
        let coords = (0..side * side).map(|i| ((i % side) as f64 * spacing, (i / side) as f64 * spacing));
        PointDataset::from_xy(coords).unwrap()
    }

    fn split_of(addresses: &[&str], points: Vec<usize>) -> Split {
        Split {
            grids: addresses
                .iter()
                .map(|a| QuadRow::new(QuadAddress::parse(a).unwrap(), BBox::new(0.0, 0.0, 1.0, 1.0), 1))
                .collect(),
            points,
        }
    }

    #[test]
    fn test_integrity_accepts_disjoint_splits() {
        let a = split_of(&["00", "01"], vec![0, 1]);
        let b = split_of(&["02"], vec![2]);
        assert!(check_integrity(&[("train", &a), ("test", &b)]).is_ok());
    }

    #[test]
    fn test_integrity_rejects_duplicates_and_leaks() {
        let dup = split_of(&["00", "00"], vec![0]);
        assert!(matches!(
            check_integrity(&[("train", &dup)]),
            Err(GrtsError::Integrity(_))
        ));

        let a = split_of(&["00"], vec![0]);
        let b = split_of(&["00"], vec![1]);
        assert!(matches!(
            check_integrity(&[("train", &a), ("test", &b)]),
            Err(GrtsError::Integrity(_))
        ));

        let c = split_of(&["01"], vec![0]);
        let err = check_integrity(&[("train", &a), ("val", &c)]).unwrap_err();
        assert!(err.to_string().contains("point 0"));
    }

    #[test]
    fn test_train_val_test_sizes() {
        let dataset = lattice(8, 10_000.0);
        let mut tree = QuadTree::new(&dataset, true).unwrap();
        tree.split(0).split(0);
        assert_eq!(tree.nquads(), 16);

        let config = SampleConfig::default();
        let fractions = TrainValTestConfig::new(1.0, 0.25, 0.25);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let set = tree.train_val_test(&config, &fractions, &mut rng).unwrap();

        assert_eq!(set.test.grids.len(), 4);
        assert_eq!(set.val.grids.len(), 3);
        assert_eq!(set.train.grids.len(), 9);
        assert_eq!(set.test.points.len(), 4);
    }

    #[test]
    fn test_train_val_test_zero_sized_split() {
        let dataset = lattice(2, 10_000.0);
        let tree = QuadTree::new(&dataset, true).unwrap();
        let config = SampleConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let result = tree.train_val_test(&config, &TrainValTestConfig::default(), &mut rng);
        match result {
            Err(GrtsError::InsufficientPool {
                context,
                requested,
                available,
            }) => {
                assert_eq!(context, "test split");
                assert_eq!(requested, 1);
                assert_eq!(available, 1);
            }
            other => panic!("expected an insufficient pool, got {:?}", other),
        }
    }

    #[test]
    fn test_kfold_tiles_quadrants() {
        let dataset = lattice(8, 10_000.0);
        let mut tree = QuadTree::new(&dataset, true).unwrap();
        tree.split(0).split(0);

        let config = SampleConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let folds: Vec<Fold> = tree
            .kfold(&config, &KFoldConfig::new(4), &mut rng)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(folds.len(), 4);
        let mut tested = FxHashSet::default();
        for (i, fold) in folds.iter().enumerate() {
            assert_eq!(fold.index, i);
            assert_eq!(fold.test.grids.len(), 4);
            assert_eq!(fold.train.grids.len(), 12);
            for address in fold.test.addresses() {
                assert!(tested.insert(address));
            }
        }
        assert_eq!(tested.len(), 16);
    }

    #[test]
    fn test_kfold_more_folds_than_quadrants() {
        let dataset = lattice(2, 10_000.0);
        let tree = QuadTree::new(&dataset, true).unwrap();
        let config = SampleConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(matches!(
            tree.kfold(&config, &KFoldConfig::new(2), &mut rng),
            Err(GrtsError::InsufficientPool { .. })
        ));
        assert!(matches!(
            tree.kfold(&config, &KFoldConfig::new(1), &mut rng),
            Err(GrtsError::InvalidConfig(_))
        ));
    }
}
