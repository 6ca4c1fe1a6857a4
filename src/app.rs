//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate command handlers.

use crate::commands;
use crate::logging;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::process;

/// A terminal-based live speech-to-text recorder with on-device streaming transcription
#[derive(Parser)]
#[command(name = "sotto")]
#[command(version)]
#[command(about = "\n\n s o t t o \n live speech-to-text")]
#[command(
    long_about = "\n\n s o t t o \n\nA terminal-based live dictation screen. Captures microphone audio and\nstreams it through an on-device speech recognition model, rendering\ncommitted and in-flight transcript text as you speak.\n\nDEFAULT COMMAND:\n    If no command is specified, 'live' is used by default.\n\nEXAMPLES:\n    # Open the live dictation screen\n    $ sotto\n    $ sotto live\n\n    # Download the speech model ahead of time\n    $ sotto download\n    $ sotto download whisper-base-en\n\n    # List available models and their download status\n    $ sotto models\n\n    # List audio input devices\n    $ sotto list-devices\n\n    # Edit configuration file\n    $ sotto config\n\n    # Toggle recording from a window-manager hotkey\n    $ pkill -USR1 sotto"
)]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/sotto/sotto.toml\n    Models:             ~/.config/sotto/models/\n    Logs:               ~/.local/state/sotto/sotto.log.*"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the live dictation screen (default)
    ///
    /// While the speech model is downloading, a progress view is shown.
    /// Once ready: Space/Enter toggles recording, 'c' clears the transcript,
    /// 'y' copies it to the clipboard, Escape/q exits. SIGUSR1 also toggles
    /// recording, for use with global hotkeys.
    #[command(visible_alias = "l")]
    Live,

    /// List available speech models and their download status
    #[command(visible_alias = "m")]
    Models,

    /// Download a speech model ahead of time
    ///
    /// Without an argument, downloads the model configured in sotto.toml.
    /// Downloads are resumable; an interrupted download picks up where it
    /// left off.
    #[command(visible_alias = "d")]
    Download {
        /// Model id to download (see 'sotto models')
        #[arg(value_name = "MODEL")]
        model: Option<String>,
    },

    /// List available audio input devices
    ///
    /// Shows device IDs, names, and configurations to help configure
    /// the correct input device in sotto.toml.
    #[command(name = "list-devices")]
    ListDevices,

    /// Open configuration file in your preferred editor
    ///
    /// Edit audio settings, model selection, and other configuration.
    /// Uses $EDITOR environment variable or falls back to nano/vi.
    #[command(visible_alias = "c")]
    Config,

    /// Show recent log entries from the application
    ///
    /// Display the last 50 lines of the most recent log file.
    /// Useful for troubleshooting issues.
    Logs,

    /// Generate shell completion script
    ///
    /// Generate completion script for your shell. Save the output to your
    /// shell's completion directory or source it directly.
    ///
    /// Examples:
    ///   sotto completions bash > sotto.bash
    ///   sotto completions zsh > _sotto
    ///   sotto completions fish > sotto.fish
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the main application based on command-line arguments.
///
/// # Exit Codes
/// - 0: Success
/// - 1: General error
/// - 2: Usage error (invalid arguments)
///
/// # Errors
/// - If logging initialization fails
/// - If command execution fails (e.g., the live screen, model download)
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Handle commands that don't need logging or config setup
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "sotto", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => {
            return match commands::handle_list_devices() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        Some(Commands::Logs) => {
            return match commands::handle_logs() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        _ => {}
    }

    // Initialize logging for all other commands
    logging::init_logging()?;

    // Route to appropriate command handler
    match cli.command {
        None | Some(Commands::Live) => {
            commands::handle_live().await?;
        }
        Some(Commands::Models) => {
            commands::handle_models()?;
        }
        Some(Commands::Download { model }) => {
            commands::handle_download(model).await?;
        }
        Some(Commands::Config) => {
            commands::handle_config()?;
        }
        Some(Commands::Completions { .. }) | Some(Commands::ListDevices) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}
