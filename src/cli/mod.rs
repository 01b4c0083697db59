//! CLI Module
//!
//! Command-line interface over WAV files: full remixes, and each stage on its own.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::mixer::MixMode;

/// Remixer - record-and-remix audio engine
#[derive(Parser, Debug)]
#[command(name = "remixer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Mix placement on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Overlay,
    Sequential,
}

impl From<ModeArg> for MixMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Overlay => MixMode::Overlay,
            ModeArg::Sequential => MixMode::Sequential,
        }
    }
}

/// Effect selection shared by `remix` and `effect`
#[derive(clap::Args, Debug, Clone, Default)]
pub struct EffectArgs {
    /// Effect kind: none, echo, reverb, voiceFilter
    #[arg(long)]
    pub kind: Option<String>,

    /// Echo delay in seconds
    #[arg(long)]
    pub delay: Option<f32>,

    /// Echo feedback (0 to <1)
    #[arg(long)]
    pub feedback: Option<f32>,

    /// Wet level for echo or reverb (0-1)
    #[arg(long)]
    pub wet: Option<f32>,

    /// Reverb room size (0-1)
    #[arg(long)]
    pub room_size: Option<f32>,

    /// Reverb damping (0-1)
    #[arg(long)]
    pub damping: Option<f32>,

    /// Voice filter type: robot, chipmunk, deep, telephone
    #[arg(long)]
    pub voice: Option<String>,

    /// Voice filter intensity (0-1)
    #[arg(long)]
    pub intensity: Option<f32>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Trim, process and mix a take over an original clip
    #[command(name = "remix")]
    Remix {
        /// Original clip
        #[arg(long)]
        original: PathBuf,

        /// Recorded take
        #[arg(long)]
        take: PathBuf,

        /// Output WAV file
        #[arg(short, long)]
        output: PathBuf,

        /// JSON configuration file; flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Placement of the take
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Original clip volume (0-1)
        #[arg(long)]
        original_volume: Option<f32>,

        /// Take volume (0-1)
        #[arg(long)]
        remix_volume: Option<f32>,

        /// Seconds cut from the start of the take
        #[arg(long)]
        trim_start: Option<f64>,

        /// Seconds cut from the end of the take
        #[arg(long)]
        trim_end: Option<f64>,

        #[command(flatten)]
        effect: EffectArgs,
    },

    /// Mix WAV files into one
    #[command(name = "mix")]
    Mix {
        /// Input files, in order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output WAV file
        #[arg(short, long)]
        output: PathBuf,

        /// Gain per input (defaults to 1.0)
        #[arg(long, value_delimiter = ',')]
        gains: Vec<f32>,

        /// Start offset in seconds per input (defaults to 0)
        #[arg(long, value_delimiter = ',')]
        offsets: Vec<f64>,

        /// Output sample rate
        #[arg(long, default_value_t = crate::engine::DEFAULT_SAMPLE_RATE)]
        sample_rate: u32,

        /// Output channel count
        #[arg(long, default_value_t = crate::engine::DEFAULT_CHANNELS)]
        channels: usize,
    },

    /// Cut seconds from the start and end of a WAV file
    #[command(name = "trim")]
    Trim {
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Seconds removed from the start
        #[arg(long, default_value_t = 0.0)]
        start: f64,

        /// Seconds removed from the end
        #[arg(long, default_value_t = 0.0)]
        end: f64,
    },

    /// Apply one effect to a WAV file
    #[command(name = "effect")]
    Effect {
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        effect: EffectArgs,
    },

    /// Run the level meter over a WAV file
    #[command(name = "meter")]
    Meter {
        input: PathBuf,

        /// Meter tick in milliseconds
        #[arg(long, default_value_t = 16)]
        tick_ms: u64,
    },

    /// Print format and levels of a WAV file
    #[command(name = "info")]
    Info { input: PathBuf },

    /// Print the default configuration as JSON
    #[command(name = "config")]
    Config,
}
