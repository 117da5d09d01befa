use grts::prelude::*;
use grts::{BBox, Fold, SpatialIndex, check_integrity};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, BTreeSet};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 10 x 10 points spaced so that four splits of the padded square put each
/// point in the middle of its own quadrant.
fn hundred_quadrant_dataset() -> PointDataset {
    let c = 40_000.0 / 7.0;
    let coords: Vec<(f64, f64)> = (0..100)
        .map(|k| ((k % 10) as f64 * c, (k / 10) as f64 * c))
        .collect();
    PointDataset::from_xy(coords).unwrap()
}

/// Irregular clusters of points with a land-cover class.
fn clustered_dataset() -> PointDataset {
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let centers = [(0.0, 0.0), (60_000.0, 10_000.0), (25_000.0, 70_000.0), (80_000.0, 80_000.0)];
    let mut coords = Vec::new();
    let mut classes = Vec::new();
    for (i, (cx, cy)) in centers.iter().enumerate() {
        for j in 0..150 {
            let dx: f64 = rng.gen_range(-12_000.0..12_000.0);
            let dy: f64 = rng.gen_range(-12_000.0..12_000.0);
            coords.push((cx + dx, cy + dy));
            classes.push(match (i + j) % 3 {
                0 => "forest",
                1 => "urban",
                _ => "water",
            });
        }
    }
    PointDataset::from_xy(coords)
        .unwrap()
        .with_column("landcover", classes)
        .unwrap()
}

fn is_base4(address: &QuadAddress) -> bool {
    address.as_str().bytes().all(|b| (b'0'..=b'3').contains(&b))
}

#[test]
fn test_addresses_after_n_splits() {
    init_logging();
    let dataset = clustered_dataset();
    let mut tree = QuadTree::new(&dataset, true).unwrap();

    for depth in 1..=5 {
        tree.split(0);
        let addresses: Vec<&QuadAddress> = tree.quadrants().iter().map(|q| &q.address).collect();
        assert!(addresses.iter().all(|a| a.depth() == depth && is_base4(a)));

        let distinct: BTreeSet<_> = addresses.iter().collect();
        assert_eq!(distinct.len(), addresses.len());
    }
}

#[test]
fn test_split_conserves_points() {
    init_logging();
    let dataset = clustered_dataset();
    let mut tree = QuadTree::new(&dataset, true).unwrap();

    let mut before: usize = tree.counts().values().sum();
    assert_eq!(before, dataset.len());

    for _ in 0..5 {
        let parents = tree.quadrants().to_vec();
        tree.split(0);
        let after: usize = tree.counts().values().sum();

        // Every parent's points land in exactly one of its children.
        for parent in &parents {
            let in_children: usize = tree
                .quadrants()
                .iter()
                .filter(|q| q.address.parent().as_ref() == Some(&parent.address))
                .map(|q| q.count)
                .sum();
            assert_eq!(in_children, parent.count);
        }
        assert_eq!(after, before);
        before = after;
    }
}

#[test]
fn test_split_with_threshold_drops_points() {
    let dataset = clustered_dataset();
    let mut tree = QuadTree::new(&dataset, true).unwrap();
    tree.split(0).split(0).split(0);
    let before: usize = tree.counts().values().sum();

    // Points in children holding 1..=3 points are dropped by the next split.
    let pruned: usize = tree
        .quadrants()
        .iter()
        .flat_map(|q| q.bbox.children())
        .map(|child| tree.index().intersect(&child).len())
        .filter(|&count| count <= 3)
        .sum();

    tree.split(3);
    let after: usize = tree.counts().values().sum();
    assert!(tree.quadrants().iter().all(|q| q.count > 3));
    assert_eq!(after, before - pruned);
    assert!(tree.contains_null());
}

#[test]
fn test_max_length_stopping_rule() {
    init_logging();
    let dataset = clustered_dataset();
    let mut tree = QuadTree::new(&dataset, true).unwrap();

    let limit = 15_000.0;
    let splits = tree.split_recursive(&SplitOptions::max_length(limit)).unwrap();
    assert!(splits > 0);
    assert!(tree.quadrants().iter().all(|q| q.bbox.min_side() <= limit));
    assert!(tree.qmin() <= limit);
}

#[test]
fn test_missing_stopping_rule() {
    let dataset = clustered_dataset();
    let mut tree = QuadTree::new(&dataset, true).unwrap();
    let result = tree.split_recursive(&SplitOptions::default());
    assert!(matches!(result, Err(GrtsError::InvalidConfig(_))));
}

#[test]
fn test_sample_five_points() {
    init_logging();
    let dataset = hundred_quadrant_dataset();
    let mut tree = QuadTree::new(&dataset, true).unwrap();
    tree.split(0).split(0);
    assert!(tree.nquads() >= 5);

    let config = SampleConfig::new(5).with_random_state(17);
    let sample = tree.sample(&config, &mut config.rng()).unwrap();

    assert_eq!(sample.points.len(), 5);
    assert!(sample.points.windows(2).all(|w| w[0] < w[1]));
    for id in &sample.points {
        let point = dataset.point(*id).unwrap();
        assert!(sample.grids.iter().any(|g| g.bbox.contains_point(point)));
    }
}

#[test]
fn test_sample_is_deterministic_per_seed() {
    let dataset = clustered_dataset();
    let mut tree = QuadTree::new(&dataset, true).unwrap();
    tree.split_recursive(&SplitOptions::max_samples(40)).unwrap();

    let config = SampleConfig::new(8)
        .with_samples_per_grid(3)
        .with_weight_method(WeightMethod::DensityFactor)
        .with_random_state(99);

    let a = tree.sample(&config, &mut config.rng()).unwrap();
    let b = tree.sample(&config, &mut config.rng()).unwrap();
    assert_eq!(a, b);

    let differs = (0..10u64).any(|seed| {
        let other = config.clone().with_random_state(seed);
        tree.sample(&other, &mut other.rng()).unwrap().points != a.points
    });
    assert!(differs);
}

#[test]
fn test_sample_more_grids_than_quadrants() {
    let dataset = hundred_quadrant_dataset();
    let tree = QuadTree::new(&dataset, true).unwrap();
    let config = SampleConfig::new(2).with_random_state(1);
    let result = tree.sample(&config, &mut config.rng());
    assert!(matches!(
        result,
        Err(GrtsError::InsufficientPool {
            requested: 2,
            available: 1,
            ..
        })
    ));
}

#[test]
fn test_stratified_quotas_per_grid() {
    init_logging();
    let dataset = clustered_dataset();
    let mut tree = QuadTree::new(&dataset, true).unwrap();
    tree.split(0).split(0);

    let mut quotas = BTreeMap::new();
    quotas.insert("forest".to_string(), 2);
    quotas.insert("water".to_string(), 0);
    let config = SampleConfig::new(4)
        .with_samples_per_grid(1)
        .with_strata_column("landcover")
        .with_strata_quotas(quotas)
        .with_random_state(5);

    let sample = tree.sample(&config, &mut config.rng()).unwrap();
    let landcover = |id: &usize| dataset.attribute(*id, "landcover").unwrap();

    assert!(sample.points.iter().all(|id| landcover(id) != "water"));
    for grid in &sample.grids {
        let in_grid: Vec<&usize> = sample
            .points
            .iter()
            .filter(|&&id| grid.bbox.contains_point(dataset.point(id).unwrap()))
            .collect();
        assert!(in_grid.iter().filter(|id| landcover(id) == "forest").count() <= 2);
        assert!(in_grid.iter().filter(|id| landcover(id) == "urban").count() <= 1);
    }
}

#[test]
fn test_weighting_methods_sample_same_size() {
    let dataset = clustered_dataset();
    let mut tree = QuadTree::new(&dataset, true).unwrap();
    tree.split(0).split(0).split(0);

    for method in [
        WeightMethod::None,
        WeightMethod::DensityFactor,
        WeightMethod::InverseDensity,
        WeightMethod::Cluster {
            n_clusters: 3,
            num_results: 2,
        },
    ] {
        let config = SampleConfig::new(6).with_weight_method(method).with_random_state(3);
        let sample = tree.sample(&config, &mut config.rng()).unwrap();
        assert_eq!(sample.grids.len(), 6, "{}", method.name());
        assert_eq!(sample.points.len(), 6, "{}", method.name());
    }
}

#[test]
fn test_train_val_test_disjoint() {
    init_logging();
    let dataset = hundred_quadrant_dataset();
    let mut tree = QuadTree::new(&dataset, true).unwrap();
    for _ in 0..4 {
        tree.split(0);
    }
    assert_eq!(tree.nquads(), 100);

    let config = SampleConfig::default()
        .with_weight_method(WeightMethod::InverseDensity)
        .with_random_state(8);
    let set = tree
        .train_val_test(&config, &TrainValTestConfig::default(), &mut config.rng())
        .unwrap();

    assert_eq!(set.test.grids.len(), 20);
    assert_eq!(set.val.grids.len(), 16);
    assert_eq!(set.train.grids.len(), 64);
    check_integrity(&[("train", &set.train), ("val", &set.val), ("test", &set.test)]).unwrap();
}

#[test]
fn test_kfold_over_hundred_quadrants() {
    init_logging();
    let dataset = hundred_quadrant_dataset();
    let mut tree = QuadTree::new(&dataset, true).unwrap();
    for _ in 0..4 {
        tree.split(0);
    }
    assert_eq!(tree.nquads(), 100);

    let config = SampleConfig::default().with_random_state(21);
    let mut rng = config.rng();
    let folds = tree.kfold(&config, &KFoldConfig::new(5), &mut rng).unwrap();
    assert_eq!(folds.fold_size(), 20);

    let folds: Vec<Fold> = folds.collect::<grts::Result<_>>().unwrap();
    assert_eq!(folds.len(), 5);

    let mut tested = BTreeSet::new();
    for fold in &folds {
        assert_eq!(fold.test.grids.len(), 20);
        assert_eq!(fold.train.grids.len(), 80);
        assert_eq!(fold.train.points.len(), 80);
        check_integrity(&[("train", &fold.train), ("test", &fold.test)]).unwrap();
        for address in fold.test.addresses() {
            assert!(tested.insert(address), "grid tested twice");
        }
    }
    let all: BTreeSet<QuadAddress> = tree.quadrants().iter().map(|q| q.address.clone()).collect();
    assert_eq!(tested, all);
}

#[test]
fn test_kfold_is_lazy() {
    let dataset = hundred_quadrant_dataset();
    let mut tree = QuadTree::new(&dataset, true).unwrap();
    for _ in 0..4 {
        tree.split(0);
    }

    let config = SampleConfig::default().with_random_state(4);
    let mut rng = config.rng();
    let mut folds = tree.kfold(&config, &KFoldConfig::new(5), &mut rng).unwrap();

    assert_eq!(folds.remaining().len(), 100);
    folds.next().unwrap().unwrap();
    assert_eq!(folds.remaining().len(), 80);
}

#[test]
fn test_sample_output_to_dataset() {
    let dataset = clustered_dataset();
    let mut tree = QuadTree::new(&dataset, true).unwrap();
    tree.split(0).split(0);

    let config = SampleConfig::new(3).with_samples_per_grid(2).with_random_state(12);
    let sample = tree.sample(&config, &mut config.rng()).unwrap();
    let selected = sample.to_dataset(&dataset).unwrap();

    assert_eq!(selected.len(), sample.points.len());
    assert!(selected.column("landcover").is_some());
    let within = BBox::new(-40_000.0, -40_000.0, 140_000.0, 140_000.0);
    assert!(selected.points().iter().all(|p| within.contains_point(p)));
}
