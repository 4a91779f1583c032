use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::utils::version;

#[derive(Parser, Debug)]
#[command(author, version = version(), about)]
pub struct Cli {
    #[arg(short, long, value_name = "FLOAT", help = "Tick rate, i.e. number of ticks per second", default_value_t = 4.0)]
    pub tick_rate: f64,

    #[arg(short, long, value_name = "FLOAT", help = "Frame rate, i.e. number of frames per second", default_value_t = 30.0)]
    pub frame_rate: f64,

    /// Image editing server to talk to, overriding the configured one.
    #[arg(short, long, value_name = "URL")]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Runs a single tool without the terminal interface and prints where the
/// result was saved.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Cut the subject out of an image.
    RemoveBg {
        file: PathBuf,
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },
    /// Blur everything behind the subject.
    Blur {
        file: PathBuf,
        #[arg(long, value_name = "0-10")]
        strength: Option<u8>,
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },
    /// Place the subject in a generated scene.
    AiBackground {
        file: PathBuf,
        #[arg(short, long)]
        prompt: String,
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },
}
