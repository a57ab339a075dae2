//! Memory-mapped capture readers.
//!

use crate::{Error, Result, FORMAT_VERSION, POM_MAGIC};
use glam::Vec3;
use log::debug;
use memmap2::Mmap;
use probesh_core::{Sample, SampleBatch};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Size of the `.pom` header in bytes.
pub(crate) const POM_HEADER_SIZE: usize = 28;
/// Size of one `.pom` texel record in bytes (13 × f32).
pub(crate) const POM_RECORD_SIZE: usize = 52;

/// A memory-mapped file reader.
///
/// Uses memmap2 to access file contents without loading the entire file
/// into memory.
pub struct MappedFileReader {
    mmap: Mmap,
    path: PathBuf,
}

impl MappedFileReader {
    /// Opens a file for memory-mapped reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
        // This is the standard safety contract for memory mapping.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            mmap,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the file contents as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap[..]
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Returns the path the file was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Little-endian cursor over a byte slice.
struct ByteCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(bytes: &'a [u8], offset: usize) -> Self {
        Self { bytes, offset }
    }

    fn take4(&mut self) -> Result<[u8; 4]> {
        let end = self.offset + 4;
        let chunk = self.bytes.get(self.offset..end).ok_or_else(|| {
            Error::InvalidFormat(format!("unexpected end of data at {}", self.offset))
        })?;
        self.offset = end;
        let mut out = [0u8; 4];
        out.copy_from_slice(chunk);
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take4()?))
    }

    fn f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.take4()?))
    }

    fn vec3(&mut self) -> Result<Vec3> {
        Ok(Vec3::new(self.f32()?, self.f32()?, self.f32()?))
    }
}

/// Header of a `.pom` capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PomHeader {
    /// Format version.
    pub version: u32,
    /// Resolution of one cube face.
    pub face_size: u32,
    /// Probe position.
    pub position: Vec3,
    /// Distances at or beyond this are sky.
    pub far_distance: f32,
}

impl PomHeader {
    /// Number of texel records following the header.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        SampleBatch::texel_count(self.face_size)
    }

    /// Total file size of a capture with the given face size, or `None` if it
    /// does not fit in memory.
    fn file_size_for(face_size: u32) -> Option<usize> {
        SampleBatch::checked_texel_count(face_size)?
            .checked_mul(POM_RECORD_SIZE)?
            .checked_add(POM_HEADER_SIZE)
    }

    fn parse(bytes: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(bytes, 0);
        let magic = cursor.u32()?;
        if magic != POM_MAGIC {
            return Err(Error::InvalidFormat(format!(
                "bad magic 0x{magic:08X}, expected 0x{POM_MAGIC:08X}"
            )));
        }
        let version = cursor.u32()?;
        if version != FORMAT_VERSION {
            return Err(Error::InvalidFormat(format!(
                "unsupported version {version}"
            )));
        }
        let face_size = cursor.u32()?;
        if face_size == 0 {
            return Err(Error::InvalidFormat("face size is zero".to_string()));
        }
        if Self::file_size_for(face_size).is_none() {
            return Err(Error::InvalidFormat(format!(
                "face size {face_size} is too large"
            )));
        }
        Ok(Self {
            version,
            face_size,
            position: cursor.vec3()?,
            far_distance: cursor.f32()?,
        })
    }
}

/// A `.pom` capture reader with memory-mapped I/O.
pub struct PomFileReader {
    reader: MappedFileReader,
    header: PomHeader,
}

impl PomFileReader {
    /// Opens a capture and validates its header and length.
    ///
    /// # Errors
    /// Returns an error if the file cannot be mapped, has a bad header, or
    /// is shorter than its header announces.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = MappedFileReader::open(path)?;
        if reader.len() < POM_HEADER_SIZE {
            return Err(Error::InvalidFormat(format!(
                "{} bytes is too short for a capture header",
                reader.len()
            )));
        }
        let header = PomHeader::parse(reader.as_bytes())?;

        let expected = PomHeader::file_size_for(header.face_size).ok_or_else(|| {
            Error::InvalidFormat(format!("face size {} is too large", header.face_size))
        })?;
        if reader.len() < expected {
            return Err(Error::InvalidFormat(format!(
                "truncated capture: {} bytes, expected {expected}",
                reader.len()
            )));
        }
        debug!(
            "opened {} (face size {}, {} samples)",
            reader.path().display(),
            header.face_size,
            header.sample_count()
        );
        Ok(Self { reader, header })
    }

    /// Returns the capture header.
    #[must_use]
    pub fn header(&self) -> &PomHeader {
        &self.header
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn file_size(&self) -> usize {
        self.reader.len()
    }

    /// Decodes every texel record into a [`SampleBatch`].
    ///
    /// # Errors
    /// Returns an error if a record cannot be decoded.
    pub fn read_batch(&self) -> Result<SampleBatch> {
        let header = &self.header;
        let mut batch = SampleBatch::new(header.face_size, header.position, header.far_distance);
        let mut cursor = ByteCursor::new(self.reader.as_bytes(), POM_HEADER_SIZE);
        for _ in 0..header.sample_count() {
            let sample = Sample {
                position: cursor.vec3()?,
                normal: cursor.vec3()?,
                albedo: cursor.vec3()?,
                static_lit: cursor.vec3()?,
                distance: cursor.f32()?,
            };
            batch.push(&sample);
        }
        Ok(batch)
    }
}
