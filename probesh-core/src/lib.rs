//! probesh-core: Core types for light-probe set encoding.
//!
//! This crate provides cube-map texel geometry, order-2 spherical harmonics,
//! the structure-of-arrays sample batch, encoder configuration and the
//! probe/set types produced by the encoding pipeline.
//!

pub mod config;
pub mod cube;
pub mod error;
pub mod probe;
pub mod room;
pub mod sample;
pub mod sh;

pub use config::EncoderConfig;
pub use cube::{CubeFace, Texel};
pub use error::{ClusteringError, Error, Result};
pub use probe::{EncodedProbe, LightSample, ProbeSet, ProbeStatistics};
pub use room::BoxRoom;
pub use sample::{Sample, SampleBatch};
pub use sh::{ShRgb, ShScalar, SH_COEFFS};
