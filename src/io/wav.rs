//! WAV file output.

use std::{fs::File, io::BufWriter, path::Path};

use hound::{WavSpec, WavWriter};
use tracing::info;

use super::{AudioSink, SinkError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WavFormat {
    /// 32-bit float, unclipped.
    #[default]
    Float32,
    /// 16-bit PCM, clipped to full scale.
    Int16,
}

pub struct WavSink {
    writer: Option<WavWriter<BufWriter<File>>>,
    format: WavFormat,
    frames: u64,
}

impl WavSink {
    pub fn create(
        path: impl AsRef<Path>,
        sample_rate: u32,
        format: WavFormat,
    ) -> Result<Self, SinkError> {
        let (bits_per_sample, sample_format) = match format {
            WavFormat::Float32 => (32, hound::SampleFormat::Float),
            WavFormat::Int16 => (16, hound::SampleFormat::Int),
        };
        let spec = WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample,
            sample_format,
        };
        let writer = WavWriter::create(path, spec)?;

        Ok(Self {
            writer: Some(writer),
            format,
            frames: 0,
        })
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl AudioSink for WavSink {
    fn write_block(&mut self, left: &[f32], right: &[f32]) -> Result<(), SinkError> {
        let writer = self.writer.as_mut().ok_or(SinkError::Finished)?;

        for (&l, &r) in left.iter().zip(right) {
            match self.format {
                WavFormat::Float32 => {
                    writer.write_sample(l)?;
                    writer.write_sample(r)?;
                }
                WavFormat::Int16 => {
                    writer.write_sample(quantize(l))?;
                    writer.write_sample(quantize(r))?;
                }
            }
        }
        self.frames += left.len().min(right.len()) as u64;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
            info!(frames = self.frames, "wav finalized");
        }
        Ok(())
    }
}

fn quantize(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_readable_float_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");

        let mut sink = WavSink::create(&path, 44_100, WavFormat::Float32).unwrap();
        sink.write_block(&[0.5, -0.25], &[0.1, 0.2]).unwrap();
        sink.finish().unwrap();
        assert!(matches!(
            sink.write_block(&[0.0], &[0.0]),
            Err(SinkError::Finished)
        ));

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        let samples: Vec<f32> = reader.samples::<f32>().map(Result::unwrap).collect();
        assert_eq!(samples, vec![0.5, 0.1, -0.25, 0.2]);
    }

    #[test]
    fn test_int16_clips() {
        assert_eq!(quantize(2.0), i16::MAX);
        assert_eq!(quantize(-2.0), -i16::MAX);
        assert_eq!(quantize(0.0), 0);
    }
}
