//! NoteBeam command-line entry point.
//!
//! # Responsibility
//! - Run the startup contract: instance lock first, stores second.
//! - Surface lock failures as a user-facing notice with exit status 1.
//! - Release the lock on every exit path (the app context is dropped before
//!   `main` returns).

use clap::{Parser, Subcommand};
use log::error;
use notebeam_core::store::backup::{archive_path, mirror_path, today_archive_date};
use notebeam_core::{default_log_level, init_logging, AppConfig, NoteBeamApp, StartupError};
use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

const EXIT_LOCK_FAILURE: u8 = 1;
const EXIT_FAILURE: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "notebeam", version, about = "Single-note store with rolling backups")]
struct Cli {
    /// Directory holding index.md (overrides NOTEBEAM_NOTE_DIR).
    #[arg(long, global = true)]
    note_dir: Option<PathBuf>,
    /// Directory holding the .lock file (overrides NOTEBEAM_DATA_DIR).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Absolute directory for rolling log files.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Skip the instance lock (development only, same as NOTEBEAM_SKIP_LOCK=1).
    #[arg(long, global = true)]
    skip_lock: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the note to stdout.
    Show,
    /// Replace the note with the content of a file or stdin.
    Save {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print resolved note, lock, and backup paths.
    Paths,
    /// Hold the instance lock until a line is read from stdin.
    Hold,
    /// Print core linkage and version.
    Ping,
}

enum CliError {
    Startup(StartupError),
    Other(String),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Startup(err)) => match err.user_notice() {
            Some((title, message)) => {
                eprintln!("Error: {title} - {message}");
                ExitCode::from(EXIT_LOCK_FAILURE)
            }
            None => {
                eprintln!("Error: {err}");
                ExitCode::from(EXIT_FAILURE)
            }
        },
        Err(CliError::Other(message)) => {
            eprintln!("Error: {message}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = resolve_config(&cli)?;

    let log_dir = cli.log_dir.clone().unwrap_or_else(|| config.log_dir());
    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    // Logging is diagnostics only; a broken log dir must not block the note.
    if let Err(err) = init_logging(level, &log_dir.to_string_lossy()) {
        eprintln!("Warning: logging disabled: {err}");
    }

    match cli.command {
        Command::Ping => {
            println!("notebeam_core ping={}", notebeam_core::ping());
            println!("notebeam_core version={}", notebeam_core::core_version());
            Ok(())
        }
        Command::Paths => {
            let today = today_archive_date();
            println!("note={}", config.note_path.display());
            println!("lock={}", config.lock_path.display());
            println!("mirror={}", mirror_path(&config.note_path).display());
            println!(
                "archive={}",
                archive_path(&config.note_path, &today).display()
            );
            println!("backups={}", config.backups_dir().display());
            println!("images={}", config.images_dir().display());
            Ok(())
        }
        Command::Show => {
            let app = start(&config)?;
            let content = app
                .notes()
                .load_note()
                .map_err(|err| CliError::Other(err.to_string()))?;
            io::stdout()
                .write_all(&content)
                .map_err(|err| CliError::Other(format!("failed to write stdout: {err}")))?;
            app.shutdown();
            Ok(())
        }
        Command::Save { file } => {
            let mut app = start(&config)?;
            let content = read_input(file.as_ref())?;
            let outcome = app
                .notes_mut()
                .save_note(&content)
                .map_err(|err| CliError::Other(err.to_string()))?;
            println!(
                "saved bytes={} mirrored={} archived={}",
                content.len(),
                outcome.mirrored,
                outcome
                    .archived
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
            app.shutdown();
            Ok(())
        }
        Command::Hold => {
            let app = start(&config)?;
            println!(
                "holding {} (pid {}); press Enter to release",
                config.lock_path.display(),
                std::process::id()
            );
            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .map_err(|err| CliError::Other(format!("failed to read stdin: {err}")))?;
            app.shutdown();
            Ok(())
        }
    }
}

fn resolve_config(cli: &Cli) -> Result<AppConfig, CliError> {
    let mut config = AppConfig::from_env_with(cli.note_dir.clone(), cli.data_dir.clone())
        .map_err(|err| CliError::Startup(StartupError::Config(err)))?;
    config.skip_lock |= cli.skip_lock;
    Ok(config)
}

fn start(config: &AppConfig) -> Result<NoteBeamApp, CliError> {
    NoteBeamApp::start(config).map_err(|err| {
        error!("event=cli_start module=cli status=error error={err}");
        CliError::Startup(err)
    })
}

fn read_input(file: Option<&PathBuf>) -> Result<Vec<u8>, CliError> {
    match file {
        Some(path) => std::fs::read(path)
            .map_err(|err| CliError::Other(format!("failed to read `{}`: {err}", path.display()))),
        None => {
            let mut buffer = Vec::new();
            io::stdin()
                .read_to_end(&mut buffer)
                .map_err(|err| CliError::Other(format!("failed to read stdin: {err}")))?;
            Ok(buffer)
        }
    }
}
