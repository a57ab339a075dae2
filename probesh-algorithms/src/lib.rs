//! probesh-algorithms: Set clustering and SH encoding for probe captures.
//!
//! This crate provides:
//! - **k-means** - weighted k-means with k-means++ seeding (primary)
//! - **Filling** - region growing over the cube map
//! - **Set encoding** - averages, principal axes, SH9 bounce, light samples
//! - **Statistics** - distance statistics, occlusion and static SH
//!
#![warn(missing_docs)]

mod filling;
mod kmeans;
pub mod metric;
mod processing;
mod sets;
mod statistics;

pub use filling::{FillingClustering, FillingConfig, FillingState};
pub use kmeans::{KMeansClustering, KMeansConfig, KMeansState};
pub use metric::{Centroid, SampleMetric};
pub use processing::{cluster_batch, encode_probe, AlgorithmParams, ClusteringMethod};
pub use sets::{encode_set, encode_sets};
pub use statistics::{compute_statistics, occlusion_sh, static_sh};

// Re-export core configuration
pub use probesh_core::config::EncoderConfig;
