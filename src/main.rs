use std::path;
use std::process::ExitCode;

use anyhow::Context;
use anyhow::Result;
use bit::App;
use bit::Config;
use bit::clients::git::Git;
use bit::clients::git::RealGit;
use bit::clients::github::GithubClient;
use bit::clients::github::PrState;
use bit::clients::vault::KeyringVault;
use bit::commands::ListKind;
use bit::history::ActionHistory;
use bit::history::JsonFileStore;
use bit::prompt::TerminalPrompter;
use bit::ui;
use clap::Parser;
use clap::Subcommand;
use tracing::debug;
use tracing::level_filters::LevelFilter;

type RealApp = App<RealGit, GithubClient, KeyringVault, TerminalPrompter>;

#[derive(Parser)]
#[command(name = "bit", version)]
#[command(about = "BetterGit: a friendlier git where every change can be undone", long_about = None)]
pub struct Cli {
    /// Print diagnostic logs to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new repository (in a new directory if a name is given)
    Init {
        name: Option<String>,
        /// Don't offer to create a remote repository
        #[arg(long)]
        no_remote: bool,
    },
    /// Stage and commit: `bit save [files...] "message"`
    Save { args: Vec<String> },
    /// Switch to a branch, account or commit
    Switch {
        target: String,
        /// Create the branch first
        #[arg(short, long)]
        create: bool,
    },
    /// List branches, saves, remotes, accounts, history or stashes
    List { kind: Option<ListKind> },
    /// Show the working tree and the last recorded action
    Status,
    /// Push the current branch to origin
    Push {
        #[arg(short, long)]
        force: bool,
    },
    /// Pull into the current branch
    Pull {
        #[arg(long)]
        rebase: bool,
    },
    /// Merge a branch into the current branch
    Merge { branch: String },
    /// Stash uncommitted changes
    Stash { message: Option<String> },
    /// Delete a local branch
    Delete { branch: String },
    /// Undo the last action, or the one matching a branch or commit
    Undo {
        target: Option<String>,
        /// Pick the action to undo from a list
        #[arg(short, long)]
        interactive: bool,
    },
    /// Show recorded actions
    History {
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
    /// Work with pull requests
    #[command(subcommand)]
    Pr(PrCommand),
    /// Create or switch to the branch for an issue
    Workon { issue: u64 },
    /// Pull with rebase, then push
    Sync,
    /// Delete merged branches, prune remotes and run gc
    Cleanup {
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the commit graph
    Graph {
        #[arg(short, long)]
        all: bool,
    },
    /// Show the configuration file
    Config,
}

#[derive(Subcommand)]
pub enum PrCommand {
    /// Push the current branch and open a pull request
    Create {
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        body: Option<String>,
        /// Target branch (defaults to the main branch)
        #[arg(long)]
        base: Option<String>,
    },
    /// List pull requests
    List {
        #[arg(long, value_enum, default_value_t = PrState::Open)]
        state: PrState,
    },
    /// Check out the branch of a pull request
    Checkout { number: u64 },
}

fn setup_logging(verbose: bool) -> Result<()> {
    let timer = tracing_subscriber::fmt::time::ChronoLocal::new("%H:%M:%S%.3f".into());
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env()?;
    tracing_subscriber::fmt()
        .with_timer(timer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

/// Build the app for a working directory. The history file is keyed by the
/// repository root, or by `dir` outside a repository.
async fn build_app(config: Config, dir: path::PathBuf) -> Result<RealApp> {
    let backend = RealGit::new(dir.clone());
    let root = Git::new(backend.clone())
        .repository_root()
        .await?
        .unwrap_or(dir);
    let store = JsonFileStore::for_repository(&config.dir, &root);
    debug!(history = %store.path().display(), "Using history file");

    let remote = GithubClient::new(config.issue_tracker.api_url.clone());
    Ok(App::new(
        config,
        backend,
        remote,
        KeyringVault,
        TerminalPrompter,
        ActionHistory::new(store),
    ))
}

/// Where the command runs: a new directory for `bit init <name>`, otherwise
/// the current one.
fn working_dir(command: &Commands) -> Result<path::PathBuf> {
    let cwd = std::env::current_dir().context("Failed to determine the current directory")?;
    match command {
        Commands::Init {
            name: Some(name), ..
        } => {
            let dir = cwd.join(name);
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            Ok(dir)
        }
        _ => Ok(cwd),
    }
}

async fn run(command: Commands) -> Result<()> {
    let config = Config::load()?;
    let dir = working_dir(&command)?;
    let mut app = build_app(config, dir.clone()).await?;
    let stdout = &mut std::io::stdout();

    match command {
        Commands::Init { no_remote, .. } => app.cmd_init(&dir, no_remote, stdout).await,
        Commands::Save { args } => app.cmd_save(&args, stdout).await,
        Commands::Switch { target, create } => app.cmd_switch(&target, create, stdout).await,
        Commands::List { kind } => app.cmd_list(kind, stdout).await,
        Commands::Status => app.cmd_status(stdout).await,
        Commands::Push { force } => app.cmd_push(force, stdout).await,
        Commands::Pull { rebase } => app.cmd_pull(rebase, stdout).await,
        Commands::Merge { branch } => app.cmd_merge(&branch, stdout).await,
        Commands::Stash { message } => app.cmd_stash(message.as_deref(), stdout).await,
        Commands::Delete { branch } => app.cmd_delete(&branch, stdout).await,
        Commands::Undo {
            target,
            interactive,
        } => app.cmd_undo(target.as_deref(), interactive, stdout).await,
        Commands::History { limit } => app.cmd_history(limit, stdout).await,
        Commands::Pr(PrCommand::Create { title, body, base }) => {
            app.cmd_pr_create(title, body, base, stdout).await
        }
        Commands::Pr(PrCommand::List { state }) => app.cmd_pr_list(state, stdout).await,
        Commands::Pr(PrCommand::Checkout { number }) => app.cmd_pr_checkout(number, stdout).await,
        Commands::Workon { issue } => app.cmd_workon(issue, stdout).await,
        Commands::Sync => app.cmd_sync(stdout).await,
        Commands::Cleanup { dry_run } => app.cmd_cleanup(dry_run, stdout).await,
        Commands::Graph { all } => app.cmd_graph(all, stdout).await,
        Commands::Config => app.cmd_config(stdout).await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = setup_logging(cli.verbose) {
        eprintln!("Invalid RUST_LOG: {e}");
    }

    match run(cli.command.unwrap_or(Commands::Status)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let _ = ui::error(&mut std::io::stderr(), format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
