//! Bus 210: the feedback delay network as a mixer stage.

use crate::{
    dsp::reverb::{FdnParams, FeedbackDelayNetwork},
    effects::BusEffect,
    mixer::{BusId, MixerState, SendId, LEFT, MASTER_BUS, REVERB_BUS, RIGHT},
    MAX_BLOCK_SIZE,
};

/// Sums its stereo input to mono, reverberates it and sends the stereo
/// result onwards (to the master by default).
pub struct Reverb {
    id: BusId,
    targets: Vec<BusId>,
    network: FeedbackDelayNetwork,
    input: Vec<f32>,
    left: Vec<f32>,
    right: Vec<f32>,
}

impl Reverb {
    pub fn new(params: FdnParams, sample_rate: f32) -> Self {
        Self {
            id: REVERB_BUS,
            targets: vec![MASTER_BUS],
            network: FeedbackDelayNetwork::new(params, sample_rate),
            input: vec![0.0; MAX_BLOCK_SIZE],
            left: vec![0.0; MAX_BLOCK_SIZE],
            right: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    /// Own `bus` instead of the orchestra's default number.
    pub fn on_bus(mut self, bus: BusId) -> Self {
        self.id = bus;
        self
    }

    pub fn with_targets(mut self, targets: impl IntoIterator<Item = BusId>) -> Self {
        self.targets = targets.into_iter().collect();
        self
    }

    pub fn targets(&self) -> &[BusId] {
        &self.targets
    }

    pub fn output(&self) -> (&[f32], &[f32]) {
        (&self.left, &self.right)
    }
}

impl BusEffect for Reverb {
    fn id(&self) -> BusId {
        self.id
    }

    fn name(&self) -> &'static str {
        "reverb"
    }

    fn process(&mut self, mixer: &mut MixerState, frames: usize) {
        let frames = frames.min(MAX_BLOCK_SIZE);
        let input = &mut self.input[..frames];
        input.fill(0.0);
        for ((x, &l), &r) in input
            .iter_mut()
            .zip(mixer.receive(self.id, LEFT))
            .zip(mixer.receive(self.id, RIGHT))
        {
            *x = (l + r) * 0.5;
        }

        self.network.process_block(
            &self.input[..frames],
            &mut self.left[..frames],
            &mut self.right[..frames],
        );

        let send = SendId::from(self.id);
        for &target in &self.targets {
            mixer.send(&self.left[..frames], send, target, LEFT);
            mixer.send(&self.right[..frames], send, target, RIGHT);
        }
    }

    fn reset(&mut self) {
        self.network.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 44_100.0;
    const BLOCK: usize = 441;

    fn still() -> FdnParams {
        FdnParams {
            pitch_mod: 0.0,
            ..FdnParams::default()
        }
    }

    #[test]
    fn test_silent_in_silent_out() {
        let mut reverb = Reverb::new(still(), SAMPLE_RATE);
        let mut mixer = MixerState::with_busses(BLOCK, [REVERB_BUS, MASTER_BUS]);
        mixer.set_level(SendId::from(REVERB_BUS), MASTER_BUS, 1.0);

        for _ in 0..10 {
            reverb.process(&mut mixer, BLOCK);
            mixer.clear();
        }

        let (left, right) = reverb.output();
        assert!(left.iter().chain(right).all(|&s| s == 0.0));
    }

    #[test]
    fn test_impulse_tail_reaches_master() {
        let mut reverb = Reverb::new(still(), SAMPLE_RATE);
        let mut mixer = MixerState::with_busses(BLOCK, [REVERB_BUS, MASTER_BUS]);
        mixer.set_level(SendId(5), REVERB_BUS, 1.0);
        mixer.set_level(SendId::from(REVERB_BUS), MASTER_BUS, 1.0);

        let mut impulse = vec![0.0; BLOCK];
        impulse[0] = 1.0;
        mixer.send(&impulse, SendId(5), REVERB_BUS, LEFT);

        let mut energy = 0.0;
        for _ in 0..20 {
            reverb.process(&mut mixer, BLOCK);
            energy += mixer
                .receive(MASTER_BUS, LEFT)
                .iter()
                .chain(mixer.receive(MASTER_BUS, RIGHT))
                .map(|s| s * s)
                .sum::<f32>();
            mixer.clear();
        }

        assert!(energy > 1e-4, "tail energy {energy}");
    }

    #[test]
    fn test_unrouted_output_stays_on_reverb() {
        let mut reverb = Reverb::new(still(), SAMPLE_RATE);
        let mut mixer = MixerState::with_busses(BLOCK, [REVERB_BUS, MASTER_BUS]);
        mixer.set_level(SendId(5), REVERB_BUS, 1.0);
        mixer.send(&vec![0.5; BLOCK], SendId(5), REVERB_BUS, RIGHT);

        for _ in 0..10 {
            reverb.process(&mut mixer, BLOCK);
        }

        // reverb -> master level was never set
        assert!(mixer.receive(MASTER_BUS, LEFT).iter().all(|&s| s == 0.0));
    }
}
