use agglo::{Ahc, ClusteringContext, DistanceMatrix, FeatureMetric, Linkage, NormOption};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Two bundles of 3-vertex polylines in 3-D, flattened to one row each.
    // Bundle A runs along x near the origin, bundle B along y near z = 5.
    let mut streamlines: Vec<Vec<f32>> = Vec::new();
    for i in 0..4 {
        let o = 0.1 * i as f32;
        streamlines.push(vec![0.0, o, 0.0, 1.0, o, 0.0, 2.0, o, 0.0]);
    }
    for i in 0..3 {
        let o = 0.1 * i as f32;
        streamlines.push(vec![o, 0.0, 5.0, o, 1.0, 5.0, o, 2.0, 5.0]);
    }

    let norm = NormOption::Hausdorff;
    let metric = FeatureMetric::new(&streamlines, norm)?;
    let features = metric.features().to_owned();

    // Build the table once, write it where a later run would look for it,
    // and cluster from the reloaded copy.
    let dir = tempfile::tempdir()?;
    let path = DistanceMatrix::build(&metric)?.save(dir.path(), norm)?;
    println!("cached distances: {}", path.display());
    let cache = DistanceMatrix::load(dir.path(), norm)?;

    let mut ctx = ClusteringContext::new(metric).with_cache(cache)?;
    let result = Ahc::new(2)
        .with_linkage(Linkage::Complete)
        .fit(features.view(), &mut ctx)?;

    println!("labels: {:?}", result.labels());
    println!("sizes: {:?}", result.sizes());
    println!("entropy ratio: {:.3}", result.entropy_ratio());
    for (label, rep) in result.representatives().iter().enumerate() {
        println!(
            "cluster {label}: closest #{} ({:.3}), furthest #{} ({:.3})",
            rep.closest, rep.closest_distance, rep.furthest, rep.furthest_distance
        );
    }
    for activity in ctx.diagnostics().activities() {
        println!("{}: {:?}", activity.label, activity.elapsed);
    }

    Ok(())
}
