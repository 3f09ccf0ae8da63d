use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};
use tracing_subscriber::EnvFilter;

use spotishuffler::{cli, config, error, shuffler::ShuffleMode};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authorize with Spotify API
    Auth,

    /// Run the HTTP server and the scheduled history sync
    Serve(ServeOptions),

    /// List your playlists, tracked ones are marked
    Playlists(PlaylistsOptions),

    /// Track the given playlists (ids, URIs or links), replacing the current selection
    Track(TrackOptions),

    /// Count the plays of the recently played feed
    Sync,

    /// Show the play counts of the tracked tracks
    History(HistoryOptions),

    /// Queue the tracks you played the least
    Shuffle(ShuffleOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct ServeOptions {
    /// Serve the HTTP routes only, without the periodic sync
    #[clap(long)]
    pub no_schedule: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct PlaylistsOptions {
    /// Search for playlists by name
    #[clap(long)]
    pub search: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct TrackOptions {
    pub playlists: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct HistoryOptions {
    /// Only show the first N rows
    #[clap(long)]
    pub limit: Option<usize>,
}

#[derive(Parser, Debug, Clone)]
pub struct ShuffleOptions {
    /// Selection strategy; by_time queues a third of the amount
    #[clap(long, value_enum, default_value_t = ShuffleMode::ByCount)]
    pub mode: ShuffleMode,

    /// Number of tracks to ask for
    #[clap(long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..))]
    pub amount: u32,

    /// Print the selection instead of queueing it
    #[clap(long)]
    pub dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // the server logs its activity, the other commands only problems
    let default_filter = match cli.command {
        Command::Serve(_) => "spotishuffler=info",
        _ => "warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    match cli.command {
        Command::Auth => cli::auth().await,
        Command::Serve(opt) => cli::serve(opt.no_schedule).await,
        Command::Playlists(opt) => cli::playlists(opt.search).await,
        Command::Track(opt) => cli::track(opt.playlists).await,
        Command::Sync => cli::sync().await,
        Command::History(opt) => cli::history(opt.limit).await,
        Command::Shuffle(opt) => cli::shuffle(opt.mode, opt.amount, opt.dry_run).await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
