//! Circular delay line with integer and cubic fractional taps.

/*
Delay Lines
===========

A delay line remembers the last N samples it was given. Reading it "d
samples ago" gives back what was written d writes earlier. Everything in
the effects chain that sounds like space (chorus, reverb) is built from
delay lines whose tap positions move over time.

Vocabulary
----------

  capacity    Number of samples the ring buffer holds. The longest delay
              that can be read is capacity - 3 (the cubic read needs one
              sample of headroom on each side).

  tap         A read position expressed as "samples ago". Tap 1 is the
              most recent write.

  fractional  A tap that falls between two stored samples, e.g. 12.37.
              Modulated delays always land between samples.


Cubic (4-point Lagrange) Interpolation
--------------------------------------

Linear interpolation between two neighbours dulls the top end and adds
audible zipper noise when the tap sweeps. The cubic read uses the four
samples around the tap:

        y0        y1        y2        y3
    ----+---------+----x----+---------+----→ older
      n - 1       n   n+t  n + 1     n + 2

  c0 = y1
  c1 = y2 - y0/3 - y1/2 - y3/6
  c2 = (y0 + y2)/2 - y1
  c3 = (y3 - y0)/6 + (y1 - y2)/2

  out = ((c3·t + c2)·t + c1)·t + c0

At t = 0 this returns y1 exactly and at t = 1 it returns y2 exactly, so
integer taps read the same value as the plain integer read.
*/

/// Ring buffer holding the most recent `capacity` samples.
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    /// Allocate a delay line holding `capacity` samples (at least 4).
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(4)],
            write_pos: 0,
        }
    }

    /// Allocate enough room for `seconds` of audio at `sample_rate`.
    pub fn with_max_seconds(seconds: f32, sample_rate: f32) -> Self {
        let capacity = (seconds.max(0.0) * sample_rate).ceil() as usize + 4;
        Self::new(capacity)
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Longest tap (in samples) that `read_interpolated` can honour.
    pub fn max_delay(&self) -> f32 {
        (self.buffer.len() - 3) as f32
    }

    /// Push one sample into the line.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Sample written `delay` writes ago. Tap 1 is the latest write.
    #[inline]
    pub fn read(&self, delay: usize) -> f32 {
        let len = self.buffer.len();
        let delay = delay.clamp(1, len);
        self.buffer[(self.write_pos + len - delay) % len]
    }

    /// Cubic-interpolated read at a fractional tap, clamped to `[1, max_delay]`.
    #[inline]
    pub fn read_interpolated(&self, delay: f32) -> f32 {
        let delay = delay.clamp(1.0, self.max_delay());
        let whole = delay.floor();
        let t = delay - whole;
        let n = whole as usize;

        let y0 = if n > 1 { self.read(n - 1) } else { self.read(n) };
        let y1 = self.read(n);
        let y2 = self.read(n + 1);
        let y3 = self.read(n + 2);

        let c0 = y1;
        let c1 = y2 - y0 / 3.0 - y1 * 0.5 - y3 / 6.0;
        let c2 = (y0 + y2) * 0.5 - y1;
        let c3 = (y3 - y0) / 6.0 + (y1 - y2) * 0.5;

        ((c3 * t + c2) * t + c1) * t + c0
    }

    /// Write `sample`, then read `delay` samples behind it (0 returns `sample`).
    pub fn next_sample(&mut self, sample: f32, delay: usize) -> f32 {
        self.write(sample);
        self.read(delay + 1)
    }

    pub fn render(&mut self, buffer: &mut [f32], delay: usize) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(*sample, delay);
        }
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}
