//! silence - render or play a score through the orchestra
//!
//! Run with: cargo run -- render score.toml -o out.wav

mod play;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use silence_dsp::{
    config::OrchestraConfig,
    diagnostics::{init_tracing, DEFAULT_FILTER},
    io::wav::{WavFormat, WavSink},
    patch::Schedule,
    render::Renderer,
    score::Score,
    voices,
};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "silence")]
#[command(about = "Render scores through a chorus / reverb / master bus orchestra")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Default log filter; RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = DEFAULT_FILTER)]
    log: String,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render a score to a WAV file
    Render {
        score: PathBuf,

        #[arg(short, long, default_value = "silence.wav")]
        output: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,

        /// Seconds to keep rendering after the last note
        #[arg(long)]
        tail: Option<f32>,

        /// Write 16-bit PCM instead of 32-bit float
        #[arg(long)]
        int16: bool,
    },
    /// Play a score on the default output device
    Play {
        score: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        tail: Option<f32>,
    },
    /// Print the stage order and send levels
    Topology {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List the instruments
    Instruments,
}

fn load_config(path: Option<&Path>) -> Result<OrchestraConfig> {
    match path {
        Some(path) => OrchestraConfig::load(path)
            .wrap_err_with(|| format!("failed to load config {}", path.display())),
        None => Ok(OrchestraConfig::default()),
    }
}

fn load_score(path: &Path) -> Result<Score> {
    Score::load(path).wrap_err_with(|| format!("failed to load score {}", path.display()))
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(&cli.log);

    match cli.command {
        Commands::Render {
            score,
            output,
            config,
            tail,
            int16,
        } => {
            let config = load_config(config.as_deref())?;
            let score = load_score(&score)?;
            let format = if int16 {
                WavFormat::Int16
            } else {
                WavFormat::Float32
            };

            let mut renderer =
                Renderer::new(&config)?.with_tail(tail.unwrap_or(config.tail_secs));
            let mut sink = WavSink::create(&output, config.sample_rate.round() as u32, format)
                .wrap_err_with(|| format!("failed to create {}", output.display()))?;
            let summary = renderer.render(&score, &mut sink)?;

            info!(
                path = %output.display(),
                seconds = summary.seconds,
                "wrote soundfile"
            );
        }
        Commands::Play {
            score,
            config,
            tail,
        } => {
            let config = load_config(config.as_deref())?;
            let score = load_score(&score)?;
            play::run(config, &score, tail)?;
        }
        Commands::Topology { config } => {
            let config = load_config(config.as_deref())?;
            print!("{}", Schedule::orchestra(&config)?);
        }
        Commands::Instruments => {
            println!(" id  name    chorus reverb master  declick     description");
            for def in voices::all() {
                println!(
                    "{:>3}  {:<7} {:>6.2} {:>6.2} {:>6.2}  {:.3}/{:.3}  {}",
                    def.id,
                    def.name,
                    def.sends.chorus,
                    def.sends.reverb,
                    def.sends.master,
                    def.attack,
                    def.release,
                    def.description
                );
            }
        }
    }

    Ok(())
}
