// TermTunes - Terminal Music Player
// Search the catalog, pick a track, and mpv plays through the results

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::style::Stylize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use termtunes::audio::{MpvLauncher, PlaybackSession};
use termtunes::catalog::YtDlpCatalog;
use termtunes::config::Config;
use termtunes::installer;
use termtunes::shutdown::{self, Teardown, FAULT_EXIT_CODE};
use termtunes::ui::{Menu, MenuExit};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "termtunes")]
#[command(about = "Search for music and play it from the terminal through mpv")]
struct Args {
    /// Enable developer logging (stderr + debug output)
    #[arg(long)]
    dev: bool,

    /// Use this config file instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Interactive menu (default)
    Play,
    /// Report whether mpv and the search tool are installed
    Check,
    /// Install mpv through the system package manager
    InstallPlayer,
}

fn init_logging(dev: bool, log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    // Daily rotating file appender
    let file_appender = tracing_appender::rolling::daily(log_dir, "termtunes.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,termtunes=debug"));

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false);

    // stdout belongs to the menu, so dev output goes to stderr
    let stderr_layer = dev.then(|| fmt::layer().with_writer(std::io::stderr).with_target(true));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    if dev {
        eprintln!("🔧 Dev mode: Debug output enabled to stderr + file");
    }

    Ok(guard)
}

/// Signals and user exits are clean; only errors fail the process
fn exit_code<T>(result: &Result<T>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(_) => FAULT_EXIT_CODE,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    let result = run(args).await;
    if let Err(e) = &result {
        eprintln!("{} {:#}", "Error:".red(), e);
    }
    let code = exit_code(&result);

    // A pending stdin read would otherwise keep the runtime from shutting down
    std::process::exit(code);
}

async fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let _guard = init_logging(args.dev, &config.logging.directory)?;
    info!("🎵 TermTunes starting up");
    debug!(?config, "Loaded configuration");

    let result = match args.command.unwrap_or(Command::Play) {
        Command::Play => run_player(config).await,
        Command::Check => {
            check_tools(&config).await;
            Ok(())
        }
        Command::InstallPlayer => {
            if installer::install(&config.player.binary).await {
                Ok(())
            } else {
                Err(anyhow::anyhow!("{} is not installed", config.player.binary))
            }
        }
    };

    if let Err(e) = &result {
        error!("Exiting with error: {:#}", e);
    }
    info!("Process exiting");
    result
}

async fn check_tools(config: &Config) {
    let player = &config.player.binary;
    if installer::is_external_player_installed(player) {
        println!("{} {}", "✓".green(), player);
        if let Some(version) = installer::player_version(player).await {
            println!("  {}", version.dark_grey());
        }
    } else {
        println!("{} {} not found", "✗".red(), player);
    }

    let catalog = &config.catalog.binary;
    if installer::is_external_player_installed(catalog) {
        println!("{} {}", "✓".green(), catalog);
    } else {
        println!("{} {} not found", "✗".red(), catalog);
    }
}

async fn run_player(config: Config) -> Result<()> {
    // Reported once by main on the way out
    let catalog = YtDlpCatalog::initialize(&config.catalog)
        .await
        .context("Failed to initialize catalog client")?;

    if !installer::is_external_player_installed(&config.player.binary) {
        println!(
            "{}",
            format!("{} was not found; playback will fail until it is installed.", config.player.binary).yellow()
        );
        installer::print_manual_instructions();
    }

    let launcher = Arc::new(MpvLauncher::new(config.player.clone()));
    let session = PlaybackSession::new(launcher, config.playback.clone());

    let teardown = Teardown::new(session.live_process(), config.playback.kill_grace());
    teardown.install_panic_hook();

    let signals = shutdown::listen().context("Failed to listen for shutdown signals")?;
    let input = BufReader::new(tokio::io::stdin()).lines();
    let mut menu = Menu::new(session, Box::new(catalog), input, signals);

    println!("{}", "🎵 CLI Music Player".blue().bold());
    println!("===================");

    match menu.run().await {
        Ok(MenuExit::User) | Ok(MenuExit::EndOfInput) => {
            teardown.run();
            println!("{}", "Goodbye!".green());
            Ok(())
        }
        Ok(MenuExit::Signal(signal)) => {
            println!("{}", format!("\nReceived {}, cleaning up...", signal).yellow());
            teardown.run();
            // Give the player a moment to go down before we do
            tokio::time::sleep(Duration::from_secs(1)).await;
            println!("{}", "Cleanup complete. Goodbye!".green());
            Ok(())
        }
        Err(e) => {
            teardown.run();
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termtunes::shutdown::ShutdownSignal;

    #[test]
    fn test_exit_codes() {
        let user: Result<MenuExit> = Ok(MenuExit::User);
        let eof: Result<MenuExit> = Ok(MenuExit::EndOfInput);
        let signal: Result<MenuExit> = Ok(MenuExit::Signal(ShutdownSignal::Terminate));
        let failed: Result<MenuExit> = Err(anyhow::anyhow!("catalog tool missing"));

        assert_eq!(exit_code(&user), 0);
        assert_eq!(exit_code(&eof), 0);
        assert_eq!(exit_code(&signal), 0);
        assert_eq!(exit_code(&failed), 1);
    }

    #[test]
    fn test_subcommand_defaults_to_play() {
        let args = Args::try_parse_from(["termtunes"]).unwrap();
        assert!(args.command.is_none());
        assert!(!args.dev);

        let args = Args::try_parse_from(["termtunes", "--dev", "--config", "/tmp/t.toml", "install-player"]).unwrap();
        assert!(matches!(args.command, Some(Command::InstallPlayer)));
        assert_eq!(args.config, Some(PathBuf::from("/tmp/t.toml")));
    }
}
