use silence_dsp::{
    config::{OrchestraConfig, ReverbConfig},
    effects::master::MasterState,
    engine::Engine,
    io::BufferSink,
    mixer::{SendId, CHORUS_BUS, MASTER_BUS, REVERB_BUS},
    render::Renderer,
    score::{NoteEvent, Score},
    synth::message::SynthMessage,
    voices,
};

fn quick() -> OrchestraConfig {
    OrchestraConfig {
        sample_rate: 8_000.0,
        block_size: 32,
        tail_secs: 0.2,
        reverb: ReverbConfig {
            cutoff_hz: 3_000.0,
            ..ReverbConfig::default()
        },
        ..OrchestraConfig::default()
    }
}

fn run(engine: &mut Engine, blocks: usize) -> BufferSink {
    let mut sink = BufferSink::new();
    for _ in 0..blocks {
        engine.process_block(&mut sink).unwrap();
    }
    sink
}

#[test]
fn empty_orchestra_renders_silence() {
    let mut engine = Engine::new(&quick()).unwrap();
    let sink = run(&mut engine, 50);

    assert_eq!(sink.frames(), 50 * 32);
    assert_eq!(sink.peak(), 0.0);
    assert!(engine.is_idle());
}

#[test]
fn master_ends_every_block_cleared() {
    let mut engine = Engine::new(&quick()).unwrap();
    assert_eq!(engine.master_state(), MasterState::Idle);

    engine.handle(SynthMessage::NoteOn {
        instrument: 5,
        key: 60.0,
        velocity: 100.0,
        pan: 0.0,
        duration: 0.5,
    });
    run(&mut engine, 4);

    assert_eq!(engine.master_state(), MasterState::Clear);
    for bus in [CHORUS_BUS, REVERB_BUS, MASTER_BUS] {
        for channel in 0..2 {
            assert!(
                engine.mixer().receive(bus, channel).iter().all(|&x| x == 0.0),
                "{bus} left dirty"
            );
        }
    }
}

#[test]
fn every_instrument_is_audible_and_bounded() {
    for instrument in voices::all().iter().map(|def| def.id) {
        let mut renderer = Renderer::new(&quick()).unwrap();
        let score = Score::new().note(NoteEvent::new(instrument, 0.0, 0.5, 57.0, 110.0));
        let mut sink = BufferSink::new();

        renderer.render(&score, &mut sink).unwrap();

        let peak = sink.peak();
        assert!(peak > 1e-3, "instrument {instrument} is silent");
        assert!(peak.is_finite() && peak < 10.0, "instrument {instrument} peaks at {peak}");
    }
}

#[test]
fn notes_start_at_their_block() {
    let config = quick();
    let mut engine = Engine::new(&config).unwrap();
    // 0.1 s at 8 kHz = frame 800 = block 25
    engine.schedule_score(&Score::new().note(NoteEvent::new(13, 0.1, 0.2, 60.0, 100.0)));

    let sink = run(&mut engine, 25);
    assert_eq!(sink.peak(), 0.0, "nothing before frame 800");
    assert_eq!(engine.active_voices(), 0);

    let sink = run(&mut engine, 2);
    assert!(sink.peak() > 0.0);
    assert_eq!(engine.active_voices(), 1);
}

#[test]
fn set_level_mutes_an_instrument() {
    let mut renderer = Renderer::new(&quick()).unwrap();
    let mut score = Score::new().note(NoteEvent::new(16, 0.0, 0.3, 60.0, 110.0));
    for bus in [CHORUS_BUS, REVERB_BUS, MASTER_BUS] {
        score = score.level(0.0, SendId(16), bus, 0.0);
    }
    let mut sink = BufferSink::new();

    renderer.render(&score, &mut sink).unwrap();

    assert_eq!(sink.peak(), 0.0, "every send of instrument 16 is zero");
}

#[test]
fn held_note_rings_until_released() {
    let mut engine = Engine::new(&quick()).unwrap();
    engine.handle(SynthMessage::NoteOn {
        instrument: 11,
        key: 60.0,
        velocity: 90.0,
        pan: -0.5,
        duration: 0.0,
    });
    run(&mut engine, 250);
    assert_eq!(engine.active_voices(), 1, "held note still sounding after 1 s");

    engine.handle(SynthMessage::NoteOff {
        instrument: 11,
        key: 60.0,
    });
    // the pad releases over half a second
    run(&mut engine, 250);
    assert_eq!(engine.active_voices(), 0);
}

#[test]
fn voice_limit_steals() {
    let config = OrchestraConfig {
        max_voices: 3,
        ..quick()
    };
    let mut engine = Engine::new(&config).unwrap();
    for key in 0..6 {
        engine.handle(SynthMessage::NoteOn {
            instrument: 5,
            key: 60.0 + key as f32,
            velocity: 80.0,
            pan: 0.0,
            duration: 1.0,
        });
    }

    assert_eq!(engine.active_voices(), 3);
}

#[test]
fn unknown_instrument_is_dropped() {
    let mut engine = Engine::new(&quick()).unwrap();
    engine.handle(SynthMessage::NoteOn {
        instrument: 42,
        key: 60.0,
        velocity: 80.0,
        pan: 0.0,
        duration: 1.0,
    });

    assert_eq!(engine.active_voices(), 0);
}

#[test]
fn reset_rewinds_and_silences() {
    let mut engine = Engine::new(&quick()).unwrap();
    engine.schedule_score(&Score::new().note(NoteEvent::new(5, 0.0, 2.0, 48.0, 100.0)));
    run(&mut engine, 10);
    assert!(engine.frame() > 0);

    engine.reset();

    assert_eq!(engine.frame(), 0);
    assert!(engine.is_idle());
    assert_eq!(run(&mut engine, 400).peak(), 0.0, "reverb tail dropped too");
}

#[test]
fn stop_handle_cuts_between_blocks() {
    let mut renderer = Renderer::new(&quick()).unwrap();
    let stop = renderer.stop_handle();
    let score = Score::new().note(NoteEvent::new(5, 0.0, 1.0, 60.0, 80.0));

    struct StopAfter<'a> {
        sink: BufferSink,
        stop: &'a silence_dsp::render::StopHandle,
        blocks: usize,
    }

    impl silence_dsp::io::AudioSink for StopAfter<'_> {
        fn write_block(
            &mut self,
            left: &[f32],
            right: &[f32],
        ) -> Result<(), silence_dsp::io::SinkError> {
            self.blocks += 1;
            if self.blocks == 3 {
                self.stop.stop();
            }
            self.sink.write_block(left, right)
        }
    }

    let mut sink = StopAfter {
        sink: BufferSink::new(),
        stop: &stop,
        blocks: 0,
    };
    let summary = renderer.render(&score, &mut sink).unwrap();

    assert!(summary.stopped);
    assert_eq!(sink.sink.frames(), 3 * 32);
    assert_eq!(renderer.engine().frame(), 0, "engine reset after stop");
}

#[test]
fn level_changes_do_not_outlive_their_render() {
    let muted = Score::new()
        .note(NoteEvent::new(13, 0.0, 0.2, 60.0, 100.0))
        .level(0.0, SendId(13), MASTER_BUS, 0.0)
        .level(0.0, SendId(13), REVERB_BUS, 0.0);
    let plain = Score::new().note(NoteEvent::new(13, 0.0, 0.2, 60.0, 100.0));

    let mut reused = Renderer::new(&quick()).unwrap();
    let mut sink = BufferSink::new();
    reused.render(&muted, &mut sink).unwrap();
    assert_eq!(sink.peak(), 0.0);

    let mut again = BufferSink::new();
    reused.render(&plain, &mut again).unwrap();
    let mut fresh = BufferSink::new();
    Renderer::new(&quick()).unwrap().render(&plain, &mut fresh).unwrap();

    assert!(fresh.peak() > 0.0);
    assert_eq!(again.interleaved(), fresh.interleaved());
}

#[test]
fn custom_master_bus_is_audible() {
    use silence_dsp::{
        mixer::BusId,
        patch::{Patch, StageKind},
    };

    let mut patch = Patch::default();
    patch
        .stage(5, StageKind::Voice, "organ")
        .stage(230, StageKind::Master, "master")
        .send(SendId(5), BusId(230), 1.0);
    let mut engine = Engine::with_schedule(&quick(), &patch.schedule().unwrap()).unwrap();
    engine.handle(SynthMessage::NoteOn {
        instrument: 5,
        key: 60.0,
        velocity: 100.0,
        pan: 0.0,
        duration: 0.0,
    });

    let sink = run(&mut engine, 50);

    assert!(sink.peak() > 0.0);
}
