//! File writers for captures and encoded probes.

use crate::{Error, Result, FORMAT_VERSION, POM_MAGIC, PROBESET_MAGIC};
use glam::Vec3;
use probesh_core::{EncodedProbe, SampleBatch, ShRgb};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

fn write_u32<W: Write>(w: &mut W, value: u32) -> Result<()> {
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn write_f32<W: Write>(w: &mut W, value: f32) -> Result<()> {
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn write_vec3<W: Write>(w: &mut W, v: Vec3) -> Result<()> {
    for c in v.to_array() {
        write_f32(w, c)?;
    }
    Ok(())
}

fn write_sh_rgb<W: Write>(w: &mut W, sh: &ShRgb) -> Result<()> {
    for c in &sh.coeffs {
        write_vec3(w, *c)?;
    }
    Ok(())
}

fn count_u32(count: usize, what: &str) -> Result<u32> {
    u32::try_from(count).map_err(|_| Error::InvalidFormat(format!("too many {what}: {count}")))
}

/// Writer for `.pom` captures.
pub struct PomFileWriter {
    writer: BufWriter<File>,
}

impl PomFileWriter {
    /// Creates a new capture file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Writes a complete capture: header followed by one record per texel.
    ///
    /// Format per texel: position, normal, albedo, static lighting (3 × f32
    /// each) and distance (f32). Total: 52 bytes per texel.
    ///
    /// # Errors
    /// Returns an error if the batch does not cover the whole cube map or the
    /// write fails.
    pub fn write_batch(&mut self, batch: &SampleBatch) -> Result<()> {
        if !batch.is_complete() {
            return Err(Error::InvalidFormat(format!(
                "capture has {} samples, face size {} needs {}",
                batch.len(),
                batch.face_size,
                SampleBatch::texel_count(batch.face_size)
            )));
        }

        let w = &mut self.writer;
        write_u32(w, POM_MAGIC)?;
        write_u32(w, FORMAT_VERSION)?;
        write_u32(w, batch.face_size)?;
        write_vec3(w, batch.probe_position)?;
        write_f32(w, batch.far_distance)?;

        for i in 0..batch.len() {
            write_vec3(w, batch.position[i])?;
            write_vec3(w, batch.normal[i])?;
            write_vec3(w, batch.albedo[i])?;
            write_vec3(w, batch.static_lit[i])?;
            write_f32(w, batch.distance[i])?;
        }

        self.writer.flush()?;
        Ok(())
    }
}

/// Writer for encoded `.probeset` files.
pub struct ProbeSetWriter {
    writer: BufWriter<File>,
}

impl ProbeSetWriter {
    /// Creates a new probe set file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Writes the encoded probe.
    ///
    /// Layout: 208 header bytes, then per set 172 bytes followed by 28 bytes
    /// per light sample.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub fn write_probe(&mut self, probe: &EncodedProbe) -> Result<()> {
        let w = &mut self.writer;
        let stats = &probe.statistics;

        write_u32(w, PROBESET_MAGIC)?;
        write_u32(w, FORMAT_VERSION)?;
        write_vec3(w, probe.position)?;
        write_f32(w, stats.mean_distance)?;
        write_f32(w, stats.mean_harmonic_distance)?;
        write_f32(w, stats.min_distance)?;
        write_f32(w, stats.max_distance)?;
        write_vec3(w, stats.bbox_min)?;
        write_vec3(w, stats.bbox_max)?;
        for c in probe.sh_occlusion {
            write_f32(w, c)?;
        }
        write_sh_rgb(w, &probe.sh_static)?;

        write_u32(w, count_u32(probe.sets.len(), "sets")?)?;
        for set in &probe.sets {
            write_vec3(w, set.position)?;
            write_vec3(w, set.normal)?;
            write_vec3(w, set.tangent)?;
            write_vec3(w, set.bitangent)?;
            write_vec3(w, set.albedo)?;
            write_sh_rgb(w, &set.sh_bounce)?;
            write_u32(w, count_u32(set.light_samples.len(), "light samples")?)?;
            for sample in &set.light_samples {
                write_vec3(w, sample.position)?;
                write_vec3(w, sample.normal)?;
                write_f32(w, sample.radius)?;
            }
        }

        self.writer.flush()?;
        Ok(())
    }
}

/// Writes a pretty-printed JSON dump of the encoded probe.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_summary_json<P: AsRef<Path>>(path: P, probe: &EncodedProbe) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, probe)?;
    writer.flush()?;
    Ok(())
}
