use silence_dsp::{
    config::{ChorusConfig, MasterConfig, OrchestraConfig},
    dsp::reverb::{junction_pressure, FdnParams, FeedbackDelayNetwork, LINE_COUNT},
    effects::{chorus::Chorus, master::MasterOutput, reverb::Reverb, BusEffect},
    mixer::{MixerState, SendId, CHORUS_BUS, LEFT, MASTER_BUS, REVERB_BUS, RIGHT},
    patch::Schedule,
};

const SAMPLE_RATE: f32 = 44_100.0;
const BLOCK: usize = 64;

fn orchestra_mixer() -> MixerState {
    let schedule = Schedule::orchestra(&OrchestraConfig::default()).unwrap();
    let mut mixer = MixerState::with_busses(BLOCK, schedule.busses());
    for route in schedule.sends() {
        mixer.set_level(route.from, route.to, route.gain);
    }
    mixer.set_level(SendId(99), CHORUS_BUS, 1.0);
    mixer
}

fn impulse() -> Vec<f32> {
    let mut signal = vec![0.0; BLOCK];
    signal[0] = 1.0;
    signal
}

#[test]
fn chorus_impulse_reaches_reverb_and_master_in_one_block() {
    let mut mixer = orchestra_mixer();
    let mut chorus = Chorus::new(&ChorusConfig::default(), SAMPLE_RATE);

    mixer.send(&impulse(), SendId(99), CHORUS_BUS, LEFT);
    mixer.send(&impulse(), SendId(99), CHORUS_BUS, RIGHT);
    chorus.process(&mut mixer, BLOCK);

    // dry half of the impulse, scaled by the .1 and .2 matrix gains
    for channel in [LEFT, RIGHT] {
        let reverb = mixer.receive(REVERB_BUS, channel)[0];
        let master = mixer.receive(MASTER_BUS, channel)[0];
        assert!((reverb - 0.05).abs() < 1e-6, "reverb got {reverb}");
        assert!((master - 0.1).abs() < 1e-6, "master got {master}");
    }
}

#[test]
fn chorus_taps_arrive_around_two_milliseconds() {
    let mut chorus = Chorus::new(&ChorusConfig::default(), SAMPLE_RATE);
    let mut mixer = orchestra_mixer();
    let mut energy_at = Vec::new();

    // 2 ms ± 1/3 ms at 44.1 kHz lands in the second block
    for block in 0..3 {
        if block == 0 {
            mixer.send(&impulse(), SendId(99), CHORUS_BUS, LEFT);
        }
        chorus.process(&mut mixer, BLOCK);
        let wet: f32 = chorus.output(LEFT)[1..].iter().map(|x| x.abs()).sum();
        energy_at.push(wet);
        mixer.clear();
    }

    assert!(energy_at[0] < 1e-6, "no taps before 1.6 ms: {energy_at:?}");
    assert!(energy_at[1] > 0.5, "four taps of .5 each: {energy_at:?}");
}

#[test]
fn junction_pressure_is_a_quarter_of_the_sum() {
    let filtered: [f32; LINE_COUNT] = [0.1, -0.4, 0.25, 0.9, -0.3, 0.05, 0.6, -0.2];
    let sum: f32 = filtered.iter().sum();

    assert!((junction_pressure(&filtered) - 0.25 * sum).abs() < 1e-6);
    assert_eq!(junction_pressure(&[0.0; LINE_COUNT]), 0.0);
}

#[test]
fn reverb_answers_after_its_shortest_line() {
    let params = FdnParams {
        pitch_mod: 0.0,
        ..FdnParams::default()
    };
    let mut network = FeedbackDelayNetwork::new(params, SAMPLE_RATE);
    let mut input = vec![0.0; 1024];
    input[0] = 1.0;
    let (mut left, mut right) = (vec![0.0; 1024], vec![0.0; 1024]);

    let mut first_sound = None;
    for block in 0..4 {
        network.process_block(&input, &mut left, &mut right);
        input[0] = 0.0;
        let loud = left.iter().chain(&right).any(|x| x.abs() > 1e-6);
        if loud && first_sound.is_none() {
            first_sound = Some(block);
        }
    }

    // the shortest line is 1933 samples, so the second 1024 block is the first to ring
    assert_eq!(first_sound, Some(1));
}

#[test]
fn reverb_stage_feeds_master_only() {
    let mut mixer = orchestra_mixer();
    let mut reverb = Reverb::new(FdnParams::default(), SAMPLE_RATE);
    mixer.set_level(SendId(99), REVERB_BUS, 1.0);

    for _ in 0..40 {
        mixer.send(&impulse(), SendId(99), REVERB_BUS, LEFT);
        reverb.process(&mut mixer, BLOCK);
    }

    let master: f32 = mixer.receive(MASTER_BUS, LEFT).iter().map(|x| x.abs()).sum();
    assert!(master > 0.0, "reverb output should land on the master bus");
    assert!(mixer.receive(CHORUS_BUS, LEFT).iter().all(|&x| x == 0.0));
}

#[test]
fn master_clears_every_bus_after_emitting() {
    let mut mixer = orchestra_mixer();
    let mut master = MasterOutput::new(&MasterConfig::default(), SAMPLE_RATE);
    mixer.set_level(SendId(99), MASTER_BUS, 1.0);

    master.begin_block();
    mixer.send(&impulse(), SendId(99), CHORUS_BUS, LEFT);
    mixer.send(&impulse(), SendId(99), MASTER_BUS, LEFT);
    master.condition(&mixer, BLOCK);
    let (left, _) = master.output();
    assert!(left[0].abs() > 0.5, "impulse emitted: {}", left[0]);

    master.clear(&mut mixer);
    for bus in [CHORUS_BUS, REVERB_BUS, MASTER_BUS] {
        assert!(mixer.receive(bus, LEFT).iter().all(|&x| x == 0.0), "{bus} not cleared");
    }
}
