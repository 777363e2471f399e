//! Benchmarks for the bus effects, fed and drained through the mixer.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use silence_dsp::{
    config::{ChorusConfig, MasterConfig, ReverbConfig},
    effects::{chorus::Chorus, master::MasterOutput, reverb::Reverb, BusEffect},
    mixer::{MixerState, SendId, CHORUS_BUS, LEFT, MASTER_BUS, REVERB_BUS, RIGHT},
};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

fn routed(size: usize) -> MixerState {
    let mut mixer = MixerState::with_busses(size, [CHORUS_BUS, REVERB_BUS, MASTER_BUS]);
    for bus in [CHORUS_BUS, REVERB_BUS, MASTER_BUS] {
        mixer.set_level(SendId(5), bus, 0.5);
    }
    mixer.set_level(CHORUS_BUS.into(), REVERB_BUS, 0.1);
    mixer.set_level(CHORUS_BUS.into(), MASTER_BUS, 0.2);
    mixer.set_level(REVERB_BUS.into(), MASTER_BUS, 1.0);
    mixer
}

pub fn bench_effects(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/effects");

    for &size in BLOCK_SIZES {
        let signal: Vec<f32> = (0..size).map(|i| (i as f32 * 0.03).sin()).collect();

        // sixteen voices' worth of sends into three busses
        let mut mixer = routed(size);
        group.bench_with_input(BenchmarkId::new("mixer_sends", size), &size, |b, _| {
            b.iter(|| {
                for _ in 0..16 {
                    for bus in [CHORUS_BUS, REVERB_BUS, MASTER_BUS] {
                        mixer.send(black_box(&signal), SendId(5), bus, LEFT);
                        mixer.send(black_box(&signal), SendId(5), bus, RIGHT);
                    }
                }
                mixer.clear();
            })
        });

        let mut mixer = routed(size);
        let mut chorus = Chorus::new(&ChorusConfig::default(), SAMPLE_RATE);
        group.bench_with_input(BenchmarkId::new("chorus", size), &size, |b, _| {
            b.iter(|| {
                mixer.send(&signal, SendId(5), CHORUS_BUS, LEFT);
                chorus.process(black_box(&mut mixer), size);
                mixer.clear();
            })
        });

        let mut mixer = routed(size);
        let mut reverb = Reverb::new(ReverbConfig::default().fdn_params(), SAMPLE_RATE);
        group.bench_with_input(BenchmarkId::new("reverb", size), &size, |b, _| {
            b.iter(|| {
                mixer.send(&signal, SendId(5), REVERB_BUS, LEFT);
                reverb.process(black_box(&mut mixer), size);
                mixer.clear();
            })
        });

        let mut mixer = routed(size);
        let mut master = MasterOutput::new(&MasterConfig::default(), SAMPLE_RATE);
        group.bench_with_input(BenchmarkId::new("master", size), &size, |b, _| {
            b.iter(|| {
                master.begin_block();
                mixer.send(&signal, SendId(5), MASTER_BUS, LEFT);
                master.condition(black_box(&mixer), size);
                master.clear(&mut mixer);
            })
        });
    }

    group.finish();
}
