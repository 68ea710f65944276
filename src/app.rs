//! Command-line parsing and command routing.

use crate::commands;
use crate::logging;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

/// Import or record audio clips, get AI analysis and mixing advice
#[derive(Parser)]
#[command(name = "audiodesk")]
#[command(version)]
#[command(about = "Import or record audio clips, get AI analysis and mixing advice")]
#[command(long_about = "Import or record audio clips, get AI analysis and mixing advice.\n\nThe Gemini API key is read from GEMINI_API_KEY (or API_KEY).\n\nEXAMPLES:\n    # Analyze a file\n    $ audiodesk analyze take.wav\n\n    # Record 30 seconds, save and analyze\n    $ audiodesk record -s 30 -o take.wav --analyze\n\n    # Ask the advisor about a clip\n    $ audiodesk chat --file take.wav")]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/audiodesk/audiodesk.toml\n    History:            ~/.local/share/audiodesk/analysis_history.db\n    Logs:               ~/.local/state/audiodesk/audiodesk.log.*"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze an audio file
    ///
    /// Sends the clip to the AI service for transcription, sentiment,
    /// noise level, a quality score and enhancement suggestions.
    #[command(visible_alias = "a")]
    Analyze {
        /// Path to the audio file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record from the microphone
    ///
    /// Press Enter or Ctrl+C to stop.
    #[command(visible_alias = "r")]
    Record {
        /// Stop after this many seconds
        #[arg(short, long, value_name = "SECONDS")]
        seconds: Option<u64>,

        /// Write the recording to a WAV file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Analyze the recording when it stops
        #[arg(long)]
        analyze: bool,
    },

    /// Chat with the mixing advisor
    ///
    /// With a file, the clip is analyzed first and the summary becomes
    /// part of the conversation.
    Chat {
        /// Audio file to discuss
        #[arg(short, long, value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// List previous analyses
    #[command(visible_alias = "h")]
    History {
        /// Show at most this many entries
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Open configuration file in your preferred editor
    #[command(visible_alias = "c")]
    Config,

    /// List available audio input devices
    #[command(name = "list-devices")]
    ListDevices,

    /// Show recent log entries
    Logs,

    /// Generate shell completion script
    ///
    /// Examples:
    ///   audiodesk completions bash > audiodesk.bash
    ///   audiodesk completions zsh > _audiodesk
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the command given on the command line.
///
/// # Errors
/// - If logging initialization fails
/// - If the command fails
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Commands that need neither logging nor config
    match cli.command {
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "audiodesk", &mut io::stdout());
            return Ok(());
        }
        Commands::ListDevices => return commands::handle_list_devices(),
        Commands::Logs => return commands::handle_logs(),
        _ => {}
    }

    logging::init_logging()?;
    tracing::debug!("audiodesk {}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Analyze { file, json } => commands::handle_analyze(file, json).await,
        Commands::Record {
            seconds,
            output,
            analyze,
        } => commands::handle_record(seconds, output, analyze).await,
        Commands::Chat { file } => commands::handle_chat(file).await,
        Commands::History { limit } => commands::handle_history(limit),
        Commands::Config => commands::handle_config(),
        Commands::Completions { .. } | Commands::ListDevices | Commands::Logs => {
            unreachable!("handled before logging is initialized")
        }
    }
}
