// Purpose - external interfaces, format conversions, where finished blocks go

pub mod converter;
pub mod wav;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("wav: {0}")]
    Wav(#[from] hound::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sink already finished")]
    Finished,
}

/// Destination for the master stage's stereo output.
pub trait AudioSink {
    /// Take one block. `left` and `right` have the same length.
    fn write_block(&mut self, left: &[f32], right: &[f32]) -> Result<(), SinkError>;

    /// Flush and close. Writing after this fails.
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: AudioSink + ?Sized> AudioSink for &mut S {
    fn write_block(&mut self, left: &[f32], right: &[f32]) -> Result<(), SinkError> {
        (**self).write_block(left, right)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish()
    }
}

/// Collects everything in memory.
#[derive(Debug, Default, Clone)]
pub struct BufferSink {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(frames: usize) -> Self {
        Self {
            left: Vec::with_capacity(frames),
            right: Vec::with_capacity(frames),
        }
    }

    pub fn frames(&self) -> usize {
        self.left.len()
    }

    pub fn clear(&mut self) {
        self.left.clear();
        self.right.clear();
    }

    /// Left/right pairs, frame by frame.
    pub fn interleaved(&self) -> Vec<f32> {
        self.left
            .iter()
            .zip(&self.right)
            .flat_map(|(&l, &r)| [l, r])
            .collect()
    }

    pub fn peak(&self) -> f32 {
        self.left
            .iter()
            .chain(&self.right)
            .fold(0.0f32, |acc, s| acc.max(s.abs()))
    }
}

impl AudioSink for BufferSink {
    fn write_block(&mut self, left: &[f32], right: &[f32]) -> Result<(), SinkError> {
        self.left.extend_from_slice(left);
        self.right.extend_from_slice(right);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_sink_collects_blocks() {
        let mut sink = BufferSink::new();
        sink.write_block(&[1.0, 2.0], &[-1.0, -2.0]).unwrap();
        sink.write_block(&[3.0], &[-3.0]).unwrap();

        assert_eq!(sink.frames(), 3);
        assert_eq!(sink.interleaved(), vec![1.0, -1.0, 2.0, -2.0, 3.0, -3.0]);
        assert_eq!(sink.peak(), 3.0);
    }
}
