//! probesh-io: File I/O for probesh.
//!
//! Reads `.pom` captures through memory-mapped files (memmap2), writes
//! captures and encoded `.probeset` files, dumps JSON summaries and renders
//! cube-cross previews.
//!

mod error;
pub mod preview;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use preview::{render_cube_cross, save_preview, PreviewOptions, ViewMode};
pub use reader::{MappedFileReader, PomFileReader, PomHeader};
pub use writer::{write_summary_json, PomFileWriter, ProbeSetWriter};

/// Magic number of `.pom` captures ("POM ").
pub const POM_MAGIC: u32 = 0x204D_4F50;
/// Magic number of `.probeset` files ("PSET").
pub const PROBESET_MAGIC: u32 = 0x5445_5350;
/// Format version written and accepted.
pub const FORMAT_VERSION: u32 = 1;
