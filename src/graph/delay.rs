use crate::{
    dsp::delay::DelayLine,
    graph::node::{GraphNode, RenderCtx},
};

/*
Delay Taps
==========

A source feeds one delay line and the node outputs a sum of taps read from
it, optionally with the source itself mixed in:

  out = dry · x[n] + Σ x[n - tap_i(t)]

A tap either sits still or glides exponentially from one delay time to
another, and keeps going at the same rate afterwards until it reaches the
end of the line. Sliding taps read between samples with the cubic read, so
the echo slurs in pitch while it moves.

  Tap::fixed(1.1)               one echo 1.1 s late
  Tap::glide(0.01, 1.0, 10.0)   10 ms, stretching to 1 s over ten seconds
*/

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tap {
    pub from: f32,
    pub to: f32,
    pub glide: f32,
}

impl Tap {
    pub const fn fixed(seconds: f32) -> Self {
        Self {
            from: seconds,
            to: seconds,
            glide: 0.0,
        }
    }

    pub const fn glide(from: f32, to: f32, seconds: f32) -> Self {
        Self {
            from,
            to,
            glide: seconds,
        }
    }

    /// Delay time `elapsed` seconds into the note.
    pub fn seconds_at(&self, elapsed: f32) -> f32 {
        if self.glide <= 0.0 || self.from <= 0.0 || self.to <= 0.0 {
            return self.from;
        }
        self.from * (self.to / self.from).powf(elapsed / self.glide)
    }
}

pub struct DelayTapsNode<N> {
    source: N,
    taps: Vec<Tap>,
    dry: f32,
    max_seconds: f32,
    line: DelayLine,
    elapsed: u64,
}

impl<N> DelayTapsNode<N> {
    /// Taps longer than `max_seconds` are held at the end of the line.
    pub fn new(source: N, max_seconds: f32, taps: &[Tap]) -> Self {
        Self {
            source,
            taps: taps.to_vec(),
            dry: 0.0,
            max_seconds: max_seconds.max(0.0),
            line: DelayLine::new(0),
            elapsed: 0,
        }
    }

    /// Mix the undelayed source in at `gain`.
    pub fn with_dry(mut self, gain: f32) -> Self {
        self.dry = gain;
        self
    }
}

impl<N: GraphNode> GraphNode for DelayTapsNode<N> {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.source.render_block(out, ctx);

        let longest = self.line.max_delay() - 1.0;
        for sample in out.iter_mut() {
            let input = *sample;
            self.line.write(input);

            let t = self.elapsed as f32 / ctx.sample_rate;
            let mut acc = self.dry * input;
            for tap in &self.taps {
                let delay = (tap.seconds_at(t) * ctx.sample_rate).min(longest);
                // tap 1 is the sample just written
                acc += self.line.read_interpolated(delay + 1.0);
            }
            *sample = acc;
            self.elapsed += 1;
        }
    }

    fn note_on(&mut self, ctx: &RenderCtx) {
        let needed = (self.max_seconds * ctx.sample_rate).ceil() as usize + 4;
        if self.line.capacity() < needed {
            self.line = DelayLine::new(needed);
        } else {
            self.line.reset();
        }
        self.elapsed = 0;
        self.source.note_on(ctx);
    }

    fn note_off(&mut self, ctx: &RenderCtx) {
        self.source.note_off(ctx);
    }

    fn get_envelope_level(&self) -> Option<f32> {
        self.source.get_envelope_level()
    }
}
