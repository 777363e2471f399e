//! Orchestra settings.
//!
//! Everything that shapes the sound but is not part of the score lives here:
//! sample rate and block size, the effect parameters, the effects matrix and
//! per-instrument send overrides. Defaults reproduce the orchestra as
//! written; a TOML file only needs the values it changes.
//!
//! ```toml
//! sample_rate = 48000
//! block_size = 64
//!
//! [reverb]
//! gain = 0.9
//!
//! [[instruments]]
//! id = 11
//! chorus = 0.5
//! reverb = 0.4
//! master = 0.8
//! ```
//!
//! Loading always validates, so the engine never sees an out-of-range value.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{
    dsp::reverb::{FdnParams, JITTER_DEPTHS, LINE_LENGTHS},
    voices::{self, SendLevels},
    MAX_BLOCK_SIZE,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{field}: {reason}")]
    OutOfRange { field: &'static str, reason: String },
    #[error("instrument {0} does not exist")]
    UnknownInstrument(u32),
}

fn out_of_range(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::OutOfRange {
        field,
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrchestraConfig {
    pub sample_rate: f32,
    /// Frames per block (the control period).
    pub block_size: usize,
    /// Voices allowed to sound at once before the oldest are stolen.
    pub max_voices: usize,
    /// Seconds rendered after the last note ends, so tails can ring out.
    pub tail_secs: f32,
    pub chorus: ChorusConfig,
    pub reverb: ReverbConfig,
    pub master: MasterConfig,
    pub matrix: EffectsMatrix,
    pub instruments: Vec<InstrumentSends>,
}

impl Default for OrchestraConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100.0,
            block_size: 15,
            max_voices: 128,
            tail_secs: 8.0,
            chorus: ChorusConfig::default(),
            reverb: ReverbConfig::default(),
            master: MasterConfig::default(),
            matrix: EffectsMatrix::default(),
            instruments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChorusConfig {
    /// Base delay; taps sit at a fifth of it.
    pub delay_ms: f32,
    /// LFO depth is `delay_ms / divisor`.
    pub divisor: f32,
}

impl Default for ChorusConfig {
    fn default() -> Self {
        Self {
            delay_ms: 10.0,
            divisor: 30.0,
        }
    }
}

impl ChorusConfig {
    pub fn depth_ms(&self) -> f32 {
        self.delay_ms / self.divisor
    }

    pub fn center_ms(&self) -> f32 {
        self.delay_ms / 5.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReverbConfig {
    pub gain: f32,
    pub pitch_mod: f32,
    pub cutoff_hz: f32,
    pub seed: Option<u64>,
}

impl Default for ReverbConfig {
    fn default() -> Self {
        let fdn = FdnParams::default();
        Self {
            gain: fdn.gain,
            pitch_mod: fdn.pitch_mod,
            cutoff_hz: fdn.cutoff_hz,
            seed: None,
        }
    }
}

impl ReverbConfig {
    pub fn fdn_params(&self) -> FdnParams {
        FdnParams {
            gain: self.gain,
            pitch_mod: self.pitch_mod,
            cutoff_hz: self.cutoff_hz,
            seed: self.seed.unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MasterConfig {
    pub level: f32,
    pub fade_in_secs: f32,
    pub fade_out_secs: f32,
    /// Amount of low-passed signal added back for bass enhancement.
    pub bass_boost: f32,
    pub bass_cutoff_hz: f32,
    pub dc_block_gain: f32,
    pub compressor: CompressorConfig,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            level: 1.0,
            fade_in_secs: 0.1,
            fade_out_secs: 0.1,
            bass_boost: 1.5,
            bass_cutoff_hz: 100.0,
            dc_block_gain: 0.99,
            compressor: CompressorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressorConfig {
    pub enabled: bool,
    /// Linear amplitude above which gain is reduced.
    pub threshold: f32,
    pub ratio: f32,
    pub attack_secs: f32,
    pub release_secs: f32,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 0.5,
            ratio: 2.0,
            attack_secs: 0.01,
            release_secs: 0.1,
        }
    }
}

/// Gains between the effect busses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EffectsMatrix {
    pub chorus_to_reverb: f32,
    pub chorus_to_master: f32,
    pub reverb_to_master: f32,
}

impl Default for EffectsMatrix {
    fn default() -> Self {
        Self {
            chorus_to_reverb: 0.1,
            chorus_to_master: 0.2,
            reverb_to_master: 1.0,
        }
    }
}

/// Replaces an instrument's default send levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstrumentSends {
    pub id: u32,
    pub chorus: f32,
    pub reverb: f32,
    pub master: f32,
}

impl InstrumentSends {
    pub fn levels(&self) -> SendLevels {
        SendLevels::new(self.chorus, self.reverb, self.master)
    }
}

impl OrchestraConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), "loaded orchestra config");
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Send levels for instrument `id`: the override if one is configured,
    /// the instrument's defaults otherwise.
    pub fn sends_for(&self, id: u32) -> Option<SendLevels> {
        self.instruments
            .iter()
            .rev()
            .find(|sends| sends.id == id)
            .map(InstrumentSends::levels)
            .or_else(|| voices::lookup(id).map(|def| def.sends))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sr = self.sample_rate;
        let nyquist = sr * 0.5;

        if !(sr.is_finite() && sr > 0.0) {
            return Err(out_of_range("sample_rate", format!("{sr} must be positive")));
        }
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(out_of_range(
                "block_size",
                format!("{} must be in 1..={MAX_BLOCK_SIZE}", self.block_size),
            ));
        }
        if self.max_voices == 0 {
            return Err(out_of_range("max_voices", "must be at least 1"));
        }
        non_negative("tail_secs", self.tail_secs)?;

        // chorus
        non_negative("chorus.delay_ms", self.chorus.delay_ms)?;
        if !(self.chorus.divisor.is_finite() && self.chorus.divisor > 0.0) {
            return Err(out_of_range("chorus.divisor", "must be positive"));
        }
        let longest_tap = self.chorus.center_ms() + self.chorus.depth_ms();
        if longest_tap > crate::effects::chorus::SHORTEST_MAX_DELAY_MS {
            return Err(out_of_range(
                "chorus.delay_ms",
                format!("taps reach {longest_tap} ms, longer than the delay lines"),
            ));
        }

        // reverb
        let gain = self.reverb.gain;
        if !(0.0..1.0).contains(&gain) {
            return Err(out_of_range("reverb.gain", format!("{gain} must be in [0, 1)")));
        }
        non_negative("reverb.pitch_mod", self.reverb.pitch_mod)?;
        for (length, depth) in LINE_LENGTHS.iter().zip(JITTER_DEPTHS) {
            let swing = depth * self.reverb.pitch_mod * sr;
            if length - swing <= self.block_size as f32 + 4.0 || length + swing + 4.0 >= sr {
                return Err(out_of_range(
                    "reverb.pitch_mod",
                    format!(
                        "{} swings a {length}-sample line by {swing} samples",
                        self.reverb.pitch_mod
                    ),
                ));
            }
        }
        below_nyquist("reverb.cutoff_hz", self.reverb.cutoff_hz, nyquist)?;

        // master
        let master = &self.master;
        non_negative("master.level", master.level)?;
        non_negative("master.fade_in_secs", master.fade_in_secs)?;
        non_negative("master.fade_out_secs", master.fade_out_secs)?;
        non_negative("master.bass_boost", master.bass_boost)?;
        below_nyquist("master.bass_cutoff_hz", master.bass_cutoff_hz, nyquist)?;
        if !(0.0..1.0).contains(&master.dc_block_gain) {
            return Err(out_of_range("master.dc_block_gain", "must be in [0, 1)"));
        }
        let comp = &master.compressor;
        if !(comp.threshold.is_finite() && comp.threshold > 0.0) {
            return Err(out_of_range("master.compressor.threshold", "must be positive"));
        }
        if !(comp.ratio.is_finite() && comp.ratio >= 1.0) {
            return Err(out_of_range("master.compressor.ratio", "must be at least 1"));
        }
        non_negative("master.compressor.attack_secs", comp.attack_secs)?;
        non_negative("master.compressor.release_secs", comp.release_secs)?;

        // routing
        finite("matrix.chorus_to_reverb", self.matrix.chorus_to_reverb)?;
        finite("matrix.chorus_to_master", self.matrix.chorus_to_master)?;
        finite("matrix.reverb_to_master", self.matrix.reverb_to_master)?;
        for sends in &self.instruments {
            if voices::lookup(sends.id).is_none() {
                return Err(ConfigError::UnknownInstrument(sends.id));
            }
            finite("instruments.chorus", sends.chorus)?;
            finite("instruments.reverb", sends.reverb)?;
            finite("instruments.master", sends.master)?;
        }

        Ok(())
    }
}

fn finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(out_of_range(field, format!("{value} is not finite")))
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(out_of_range(field, format!("{value} must be zero or more")))
    }
}

fn below_nyquist(field: &'static str, value: f32, nyquist: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 && value < nyquist {
        Ok(())
    } else {
        Err(out_of_range(
            field,
            format!("{value} Hz must be between 0 and {nyquist} Hz"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = OrchestraConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.block_size, 15);
        assert_eq!(config.reverb.gain, 0.81);
        assert!(!config.master.compressor.enabled);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = OrchestraConfig::from_toml_str(
            r#"
            block_size = 64

            [reverb]
            gain = 0.9
            "#,
        )
        .unwrap();

        assert_eq!(config.block_size, 64);
        assert_eq!(config.reverb.gain, 0.9);
        assert_eq!(config.reverb.cutoff_hz, 16_000.0);
        assert_eq!(config.chorus, ChorusConfig::default());
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let cases = [
            "sample_rate = -1.0",
            "block_size = 0",
            "block_size = 4096",
            "[reverb]\ngain = 1.0",
            "[reverb]\npitch_mod = -0.5",
            "[reverb]\npitch_mod = 50.0",
            "[reverb]\ncutoff_hz = 30000.0",
            "[chorus]\ndivisor = 0.0",
            "[chorus]\ndelay_ms = -3.0",
            "[master]\nfade_in_secs = -1.0",
            "[master.compressor]\nratio = 0.5",
        ];
        for case in cases {
            assert!(
                matches!(
                    OrchestraConfig::from_toml_str(case),
                    Err(ConfigError::OutOfRange { .. })
                ),
                "{case:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_unknown_field_is_parse_error() {
        assert!(matches!(
            OrchestraConfig::from_toml_str("sampel_rate = 48000.0"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_instrument_override() {
        let config = OrchestraConfig::from_toml_str(
            "[[instruments]]\nid = 13\nchorus = 0.5\nreverb = 0.1\nmaster = 0.9\n",
        )
        .unwrap();

        assert_eq!(config.sends_for(13), Some(SendLevels::new(0.5, 0.1, 0.9)));
        assert_eq!(config.sends_for(5), Some(SendLevels::new(0.0, 0.2, 1.0)));
        assert_eq!(config.sends_for(99), None);

        assert!(matches!(
            OrchestraConfig::from_toml_str(
                "[[instruments]]\nid = 99\nchorus = 0.0\nreverb = 0.0\nmaster = 1.0\n"
            ),
            Err(ConfigError::UnknownInstrument(99))
        ));
    }

    #[test]
    fn test_round_trips_through_toml() {
        let mut config = OrchestraConfig::default();
        config.reverb.seed = Some(7);
        let text = config.to_toml_string().unwrap();
        assert_eq!(OrchestraConfig::from_toml_str(&text).unwrap(), config);
    }
}
