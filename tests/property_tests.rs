//! Property-based tests for the merge engine.
//!
//! These verify invariants that must hold for any input:
//! - exactly `n - k` merges, ending with `k` clusters
//! - the partition and pool-size invariants after every step
//! - pool distances equal brute-force linkage over cluster members
//! - entropy ratio in [0, 1] and stable canonical ordering

use agglo::{
    entropy_ratio, Ahc, ClusteringContext, FeatureMetric, Linkage, MergeEngine, NormOption,
    Partition,
};
use proptest::prelude::*;

fn brute_force(linkage: Linkage, a: &[usize], b: &[usize], points: &[Vec<f32>]) -> f32 {
    let dist = |i: usize, j: usize| -> f32 {
        points[i]
            .iter()
            .zip(&points[j])
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt()
    };
    let all: Vec<f32> = a
        .iter()
        .flat_map(|&i| b.iter().map(move |&j| dist(i, j)))
        .collect();
    match linkage {
        Linkage::Single => all.iter().copied().fold(f32::INFINITY, f32::min),
        Linkage::Complete => all.iter().copied().fold(f32::NEG_INFINITY, f32::max),
        Linkage::Average => {
            (all.iter().map(|&d| d as f64).sum::<f64>() / all.len() as f64) as f32
        }
    }
}

prop_compose! {
    fn arb_points(max_n: usize)(n in 2..=max_n)(
        points in prop::collection::vec(prop::collection::vec(-50.0f32..50.0, 2), n)
    ) -> Vec<Vec<f32>> {
        points
    }
}

prop_compose! {
    fn arb_problem(max_n: usize)(points in arb_points(max_n))(
        k in 1..points.len(),
        points in Just(points),
    ) -> (Vec<Vec<f32>>, usize) {
        (points, k)
    }
}

fn arb_linkage() -> impl Strategy<Value = Linkage> {
    prop_oneof![
        Just(Linkage::Single),
        Just(Linkage::Complete),
        Just(Linkage::Average)
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn engine_invariants_hold_every_step(
        (points, k) in arb_problem(12),
        linkage in arb_linkage(),
    ) {
        let n = points.len();
        let ctx = ClusteringContext::new(
            FeatureMetric::new(&points, NormOption::Euclidean).unwrap(),
        );
        let mut engine = MergeEngine::new(&ctx, linkage, k).unwrap();

        let mut steps = 0usize;
        while let Some(step) = engine.step().unwrap() {
            steps += 1;
            prop_assert_eq!(step.merged, n + steps - 1);
            let m = engine.registry().len();
            prop_assert_eq!(m, n - steps);
            prop_assert_eq!(engine.pool().len(), m * (m - 1) / 2);
            prop_assert!(engine.registry().verify_partition().is_ok());

            for edge in engine.pool().edges() {
                let a = engine.registry().get(edge.first).unwrap().members();
                let b = engine.registry().get(edge.second).unwrap().members();
                let expected = brute_force(linkage, a, b, &points);
                prop_assert!(
                    (edge.distance - expected).abs() <= 1e-4 * expected.max(1.0),
                    "{linkage} edge ({}, {}): {} vs brute force {}",
                    edge.first, edge.second, edge.distance, expected
                );
            }
        }
        prop_assert_eq!(steps, n - k);
        prop_assert_eq!(engine.registry().len(), k);
    }

    #[test]
    fn merge_distances_never_beat_pool_minimum(
        (points, k) in arb_problem(10),
        linkage in arb_linkage(),
    ) {
        let ctx = ClusteringContext::new(
            FeatureMetric::new(&points, NormOption::Euclidean).unwrap(),
        );
        let mut engine = MergeEngine::new(&ctx, linkage, k).unwrap();
        loop {
            let before = engine.pool().edges().iter().map(|e| e.distance).fold(f32::INFINITY, f32::min);
            match engine.step().unwrap() {
                Some(step) => prop_assert_eq!(step.distance, before),
                None => break,
            }
        }
    }

    #[test]
    fn result_is_a_consistent_labelling(
        (points, k) in arb_problem(15),
        linkage in arb_linkage(),
    ) {
        let result = Ahc::new(k).with_linkage(linkage).fit_features(&points).unwrap();
        let n = points.len();

        prop_assert_eq!(result.n_clusters(), k);
        prop_assert_eq!(result.labels().len(), n);
        prop_assert!(result.labels().iter().all(|&l| l < k));
        prop_assert_eq!(result.sizes().iter().sum::<usize>(), n);
        prop_assert_eq!(result.centroids().dim(), (k, 2));

        for (g, cluster) in result.partition().clusters().iter().enumerate() {
            for &p in cluster.members() {
                prop_assert_eq!(result.labels()[p], g);
            }
            let rep = result.representatives()[g];
            prop_assert!(cluster.members().contains(&rep.closest));
            prop_assert!(cluster.members().contains(&rep.furthest));
            prop_assert!(rep.closest_distance <= rep.furthest_distance);
        }

        let ratio = result.entropy_ratio();
        if k == 1 {
            prop_assert_eq!(ratio, 0.0);
        } else {
            prop_assert!((0.0..=1.0).contains(&ratio), "entropy ratio {}", ratio);
        }
    }

    #[test]
    fn ordering_is_idempotent((points, k) in arb_problem(12)) {
        let result = Ahc::new(k).fit_features(&points).unwrap();
        let partition = result.partition().clone();
        prop_assert!(partition.is_ordered());
        let resorted = Partition::new(partition.clone().into_clusters(), points.len()).unwrap();
        prop_assert_eq!(resorted, partition);
    }

    #[test]
    fn entropy_ratio_bounds(sizes in prop::collection::vec(1usize..100, 2..10)) {
        let r = entropy_ratio(&sizes);
        prop_assert!((0.0..=1.0).contains(&r));
    }

    #[test]
    fn equal_sizes_have_unit_entropy(size in 1usize..50, k in 2usize..10) {
        prop_assert_eq!(entropy_ratio(&vec![size; k]), 1.0);
    }
}
