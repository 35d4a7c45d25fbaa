//! DevStudio CLI
//!
//! Command-line interface for opening a workspace, managing the public env
//! config and the configuration file.

use clap::{Args, Parser, Subcommand};
use console::style;
use devstudio::config::{
    config_path, load_config_from_path, read_config_snapshot, save_config, validate_config,
    ConfigValidationResult,
};
use devstudio::env::{default_env_config, is_allowed_env_var, EnvConfig, EnvStore, PUBLIC_ENV_PREFIX};
use devstudio::remote::RepoRef;
use devstudio::sandbox::{OutputChunk, OutputKind};
use devstudio::{Config, Error, OpenOptions, Result, Workspace, VERSION};
use secrecy::SecretString;
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "devstudio",
    version = VERSION,
    about = "DevStudio - Sandboxed workspaces for hosted repositories",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a repository into a sandbox, install dependencies and serve it
    Up(UpArgs),

    /// Manage the stored public env config
    Env {
        #[command(subcommand)]
        action: EnvAction,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args)]
struct UpArgs {
    /// Repository as owner/name or a GitHub URL
    repo: String,

    /// Branch to load
    #[arg(short, long, default_value = "main")]
    branch: String,

    /// Bearer token for the repository host
    #[arg(long, env = "DEVSTUDIO_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Skip dependency installation
    #[arg(long)]
    no_install: bool,

    /// Do not start the dev server
    #[arg(long)]
    no_dev: bool,

    /// Do not write the env file into the sandbox
    #[arg(long)]
    no_env: bool,
}

#[derive(Subcommand)]
enum EnvAction {
    /// Show the env config that would be injected
    Show,
    /// Store one or more KEY=VALUE pairs
    Set {
        #[arg(required = true)]
        vars: Vec<String>,
    },
    /// Remove one stored variable
    Unset { name: String },
    /// Remove every stored variable
    Clear,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
        /// Write to this path instead of the default location
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Validate the configuration file
    Check {
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("devstudio=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Up(args) => up(args).await,
        Commands::Env { action } => manage_env(action).await,
        Commands::Config { action } => manage_config(action),
    };

    if let Err(e) = result {
        eprintln!("{} {}", style("✗").red(), e);
        std::process::exit(1);
    }
}

// ============================================================================
// Workspace
// ============================================================================

async fn up(args: UpArgs) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(token) = args.token.filter(|t| !t.is_empty()) {
        config.remote.token = Some(SecretString::from(token));
    }

    let validation = validate_config(&config);
    if !validation.valid {
        print_validation(&validation);
        return Err(Error::Config("configuration is invalid".to_string()));
    }

    let repo: RepoRef = args.repo.parse()?;
    let workspace = Workspace::from_config(&config)?;
    let printer = workspace.runtime().output().on_output(print_chunk);

    let options = OpenOptions {
        inject_env: !args.no_env,
        install: !args.no_install,
        start_dev_server: !args.no_dev,
    };

    println!(
        "🚀 Opening {}@{}\n",
        style(&repo).cyan().bold(),
        style(&args.branch).cyan()
    );

    let opened = tokio::select! {
        result = workspace.open(&repo, &args.branch, None, options) => result,
        _ = tokio::signal::ctrl_c() => {
            println!("\n{}", style("Interrupted").yellow());
            close(&workspace).await;
            printer.abort();
            return Ok(());
        }
    };

    let opened = match opened {
        Ok(opened) => opened,
        Err(e) => {
            close(&workspace).await;
            printer.abort();
            return Err(e);
        }
    };

    let summary = opened.summary;
    println!(
        "\n   {} {} files loaded ({} skipped, {} too large, {} failed)",
        style("✓").green(),
        summary.loaded,
        summary.skipped,
        summary.oversized,
        summary.failed
    );
    if !args.no_env {
        println!("   {} {} public env vars injected", style("✓").green(), opened.env_vars);
    }

    match &opened.dev_server {
        Some(server) => {
            println!(
                "   {} Dev server ready at {}\n",
                style("✓").green(),
                style(&server.url).cyan().underlined()
            );
            println!("Press Ctrl-C to stop");
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                code = server.process.wait() => {
                    println!("\n{} Dev server exited with code {}", style("!").yellow(), code);
                }
            }
        }
        None => {
            println!("\nSandbox is up. Press Ctrl-C to tear it down");
            let _ = tokio::signal::ctrl_c().await;
        }
    }

    close(&workspace).await;
    printer.abort();
    Ok(())
}

async fn close(workspace: &Workspace) {
    if let Err(e) = workspace.shutdown().await {
        warn!("Workspace shutdown failed: {}", e);
    }
}

fn print_chunk(chunk: OutputChunk) {
    match chunk.kind {
        OutputKind::Input => println!("{} {}", style("$").green().bold(), chunk.text),
        OutputKind::Output => {
            let mut stdout = std::io::stdout();
            let _ = write!(stdout, "{}", chunk.text);
            let _ = stdout.flush();
        }
        OutputKind::Error => eprintln!("{} {}", style("✗").red(), style(chunk.text).red()),
        OutputKind::System => println!("{} {}", style("›").cyan(), style(chunk.text).dim()),
    }
}

// ============================================================================
// Env
// ============================================================================

async fn manage_env(action: EnvAction) -> Result<()> {
    let config = Config::from_env()?;
    let store = EnvStore::new(config.env.store_path.clone());

    match action {
        EnvAction::Show => {
            let defaults = default_env_config(&config.env.defaults, std::env::vars());
            let stored = store.load().await.unwrap_or_default();

            println!("🔐 Public env ({})\n", store.path().display());
            if defaults.is_empty() && stored.is_empty() {
                println!("   (none)");
            }
            for (name, value) in defaults.iter() {
                if stored.get(name).is_none() {
                    println!("   {}={} {}", name, value, style("(default)").dim());
                }
            }
            for (name, value) in stored.iter() {
                println!("   {}={}", name, value);
            }
        }
        EnvAction::Set { vars } => {
            let mut stored = store.load().await.unwrap_or_default();
            for assignment in &vars {
                let (name, value) = assignment.split_once('=').ok_or_else(|| {
                    Error::InvalidInput(format!("expected KEY=VALUE, got {}", assignment))
                })?;
                if !stored.insert(name, value) {
                    return Err(Error::InvalidInput(format!(
                        "{} is not public; only {}* variables are allowed",
                        name, PUBLIC_ENV_PREFIX
                    )));
                }
            }
            store.save(&stored).await?;
            println!("   {} Stored {} variable(s)", style("✓").green(), vars.len());
        }
        EnvAction::Unset { name } => {
            if !is_allowed_env_var(&name) {
                return Err(Error::InvalidInput(format!("{} is not public", name)));
            }
            let mut stored = store.load().await.unwrap_or_else(EnvConfig::new);
            match stored.remove(&name) {
                Some(_) => {
                    store.save(&stored).await?;
                    println!("   {} Removed {}", style("✓").green(), name);
                }
                None => println!("   {} {} was not stored", style("!").yellow(), name),
            }
        }
        EnvAction::Clear => {
            store.clear().await?;
            println!("   {} Stored env cleared", style("✓").green());
        }
    }

    Ok(())
}

// ============================================================================
// Config
// ============================================================================

fn manage_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init { force, path } => {
            let path = path.unwrap_or_else(config_path);
            if path.exists() && !force {
                println!(
                    "{} {} already exists (use --force to overwrite)",
                    style("!").yellow(),
                    path.display()
                );
                return Ok(());
            }
            save_config(&Config::default(), &path)?;
            load_config_from_path(&path)?;
            println!("   {} Wrote {}", style("✓").green(), path.display());
        }
        ConfigAction::Check { path } => {
            let path = path.unwrap_or_else(config_path);
            let snapshot = read_config_snapshot(&path);
            println!("🔍 Configuration ({})\n", path.display());

            let config = match snapshot.config {
                Some(config) => {
                    println!("   {} Parsed", style("✓").green());
                    config
                }
                None if !snapshot.exists => {
                    println!("   {} No file, using defaults", style("!").yellow());
                    Config::default()
                }
                None => {
                    for issue in &snapshot.issues {
                        println!("   {} {}", style("✗").red(), issue);
                    }
                    return Err(Error::Config(format!("cannot parse {}", path.display())));
                }
            };

            let validation = validate_config(&config);
            print_validation(&validation);
            if !validation.valid {
                return Err(Error::Config("configuration is invalid".to_string()));
            }
        }
    }
    Ok(())
}

fn print_validation(result: &ConfigValidationResult) {
    for issue in &result.errors {
        println!("   {} {}: {}", style("✗").red(), issue.path, issue.message);
        if let Some(suggestion) = &issue.suggestion {
            println!("     {}", style(suggestion).dim());
        }
    }
    for issue in &result.warnings {
        println!("   {} {}: {}", style("!").yellow(), issue.path, issue.message);
        if let Some(suggestion) = &issue.suggestion {
            println!("     {}", style(suggestion).dim());
        }
    }
    if result.errors.is_empty() && result.warnings.is_empty() {
        println!("   {} No issues", style("✓").green());
    }
}
