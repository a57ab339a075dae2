#![allow(clippy::uninlined_format_args)]
use glam::Vec3;
use probesh_algorithms::{
    encode_probe, AlgorithmParams, ClusteringMethod, EncoderConfig, KMeansClustering,
    KMeansConfig, SampleMetric,
};
use probesh_core::{BoxRoom, SampleBatch};

fn room_capture(size: u32) -> SampleBatch {
    let room = BoxRoom::default();
    room.capture(room.center(), size)
}

fn geometric_metric(batch: &SampleBatch) -> SampleMetric {
    let config = EncoderConfig::default()
        .with_lambda(0.0)
        .with_weights(0.0, 1.0, 0.0);
    let scale = batch.distance.iter().sum::<f32>() / batch.len() as f32;
    SampleMetric::new(&config, scale)
}

#[test]
fn test_kmeans_separates_walls_by_normal() {
    let mut batch = room_capture(16);
    let metric = geometric_metric(&batch);
    let algo = KMeansClustering::new(KMeansConfig {
        k: 6,
        max_iterations: 64,
        seed: 7,
    });
    let mut state = algo.create_state();
    let n = algo.cluster(&mut batch, &metric, &mut state).unwrap();
    assert_eq!(n, 6, "k-means found {} sets, expected 6", n);

    for set in 0..6 {
        let normals: Vec<Vec3> = (0..batch.len())
            .filter(|&i| batch.set_id[i] == set)
            .map(|i| batch.normal[i])
            .collect();
        assert!(!normals.is_empty());
        assert!(
            normals.windows(2).all(|w| w[0] == w[1]),
            "set {} mixes walls",
            set
        );
    }
}

#[test]
fn test_labels_are_dense() {
    let mut batch = room_capture(8);
    let metric = SampleMetric::new(&EncoderConfig::default(), 2.0);
    let algo = KMeansClustering::new(KMeansConfig {
        k: 20,
        ..KMeansConfig::default()
    });
    let mut state = algo.create_state();
    let n = algo.cluster(&mut batch, &metric, &mut state).unwrap();
    assert!(n <= 20);
    for set in 0..n as i32 {
        assert!(batch.set_id.contains(&set));
    }
    assert!(batch.set_id.iter().all(|&id| id >= 0 && id < n as i32));
}

#[test]
fn test_sky_stays_unassigned() {
    let room = BoxRoom::default().with_open_ceiling(true);
    let mut batch = room.capture(room.center(), 16);
    let metric = SampleMetric::new(&EncoderConfig::default(), 2.0);
    let algo = KMeansClustering::new(KMeansConfig {
        k: 8,
        ..KMeansConfig::default()
    });
    let mut state = algo.create_state();
    algo.cluster(&mut batch, &metric, &mut state).unwrap();

    for i in 0..batch.len() {
        if batch.is_sky(i) {
            assert_eq!(batch.set_id[i], -1);
        } else {
            assert!(batch.set_id[i] >= 0);
        }
    }
}

#[test]
fn test_encode_probe_kmeans() {
    let mut batch = room_capture(16);
    let config = EncoderConfig::default().with_k(12).with_light_samples(16);
    let probe = encode_probe(
        &mut batch,
        ClusteringMethod::KMeans,
        &config,
        &AlgorithmParams::default(),
    )
    .unwrap();

    assert!(!probe.sets.is_empty());
    assert!(probe.sets.len() <= 12);
    assert_eq!(probe.statistics.sky_samples, 0);
    // Closed room: no sky visibility.
    assert!(probe.sh_occlusion.iter().all(|c| c.abs() < 1e-6));

    let total: usize = probe.sets.iter().map(|s| s.sample_count).sum();
    assert_eq!(total, batch.len());
    for set in &probe.sets {
        assert!(set.light_samples.len() <= 16);
        assert!(set.area > 0.0);
    }
}

#[test]
fn test_encode_probe_filling() {
    let mut batch = room_capture(16);
    let params = AlgorithmParams {
        fill_tolerance: 0.2,
        ..AlgorithmParams::default()
    };
    let probe = encode_probe(
        &mut batch,
        ClusteringMethod::Filling,
        &EncoderConfig::default(),
        &params,
    )
    .unwrap();
    assert_eq!(probe.sets.len(), 6);
    // Opposite walls of the room: the largest solid angle belongs to the
    // closest walls (floor and ceiling).
    assert!(probe.sets[0].normal.y.abs() > 0.999);
}

#[test]
fn test_encode_probe_sky_only() {
    let mut batch = SampleBatch::new(4, Vec3::ZERO, 100.0);
    for _ in 0..SampleBatch::texel_count(4) {
        batch.push(&probesh_core::Sample::sky());
    }
    let probe = encode_probe(
        &mut batch,
        ClusteringMethod::KMeans,
        &EncoderConfig::default(),
        &AlgorithmParams::default(),
    )
    .unwrap();
    assert!(probe.sets.is_empty());
    assert!(probe.sh_occlusion[0] > 3.0);
}

#[test]
fn test_encode_probe_rejects_invalid_config() {
    let mut batch = room_capture(4);
    let config = EncoderConfig::default().with_k(0);
    assert!(encode_probe(
        &mut batch,
        ClusteringMethod::KMeans,
        &config,
        &AlgorithmParams::default()
    )
    .is_err());
}
