//! `agentenv`: drive a workspace environment from the command line.
//!
//! Each subcommand builds an [`Environment`] for the workspace root and calls
//! one capability through it, printing results on stdout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use agentenv::core::invariants::validate_tree;
use agentenv::core::types::TabIndex;
use agentenv::environment::Environment;
use agentenv::exit_codes;
use agentenv::io::browser::DummyBrowser;
use agentenv::io::config::{EnvConfig, config_path, load_config, write_config};
use agentenv::io::filesystem::LocalFileSystem;
use agentenv::io::linter::DummyLinter;
use agentenv::io::terminal::ShellTerminal;
use agentenv::io::ui::CliUserInterface;
use agentenv::logging;
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "agentenv",
    version,
    about = "Execution environment for a workspace-acting agent"
)]
struct Cli {
    /// Workspace root.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write `.agentenv/config.toml` with default settings if missing.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Print the workspace snapshot (or one node of it) as JSON.
    Tree {
        /// Exact node path, e.g. `src/main.py`.
        #[arg(long)]
        path: Option<String>,
    },
    /// Print the repository lint report, or the scoped report for one file.
    Lint {
        file: Option<String>,
    },
    /// Run a shell command in a new terminal tab and print its output.
    Run {
        command: String,
        /// Give up after this many milliseconds (default from config).
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Kill the command on timeout instead of leaving it running.
        #[arg(long)]
        hard: bool,
    },
    /// Ask the user a question on stdin and print the reply.
    Ask {
        prompt: String,
    },
}

#[tokio::main]
async fn main() {
    logging::init();
    match run().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    let root = cli.root;
    match cli.command {
        Command::Init { force } => cmd_init(&root, force),
        Command::Tree { path } => cmd_tree(&root, path.as_deref()).await,
        Command::Lint { file } => cmd_lint(&root, file.as_deref()).await,
        Command::Run {
            command,
            timeout_ms,
            hard,
        } => cmd_run(&root, &command, timeout_ms, hard).await,
        Command::Ask { prompt } => cmd_ask(&root, &prompt).await,
    }
}

fn cmd_init(root: &Path, force: bool) -> Result<i32> {
    let path = config_path(root);
    if !force && path.exists() {
        println!("{} already exists", path.display());
        return Ok(exit_codes::OK);
    }
    write_config(&path, &EnvConfig::default())?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}

async fn cmd_tree(root: &Path, path: Option<&str>) -> Result<i32> {
    let env = environment(root, false).await?;
    let tree = env.get_file_system().await?;
    let errors = validate_tree(&tree);
    if !errors.is_empty() {
        bail!("snapshot invariant violations:\n- {}", errors.join("\n- "));
    }
    let node = match path {
        Some(path) => tree
            .get_by_path(path)
            .with_context(|| format!("no node with path '{path}'"))?,
        None => &tree,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(node).context("serialize snapshot")?
    );
    Ok(exit_codes::OK)
}

async fn cmd_lint(root: &Path, file: Option<&str>) -> Result<i32> {
    let env = environment(root, true).await?;
    let Some(file) = file else {
        print!("{}", env.get_lint_output().await?);
        return Ok(exit_codes::OK);
    };
    let result = env.lint_file(file).await?;
    if result.is_ok {
        return Ok(exit_codes::OK);
    }
    println!("{}", result.output);
    Ok(exit_codes::LINT_FINDINGS)
}

async fn cmd_run(root: &Path, command: &str, timeout_ms: Option<u64>, hard: bool) -> Result<i32> {
    let env = environment(root, false).await?;
    let output = env
        .run_command(
            command,
            TabIndex::New,
            timeout_ms.map(Duration::from_millis),
            hard,
        )
        .await?;
    print!("{output}");
    Ok(exit_codes::OK)
}

async fn cmd_ask(root: &Path, prompt: &str) -> Result<i32> {
    let env = environment(root, false).await?;
    let reply = env.ask_prompt(prompt).await?;
    println!("{reply}");
    Ok(exit_codes::OK)
}

/// Build the local environment. The tool linter (and its init command) is only
/// wired in for commands that lint.
async fn environment(root: &Path, with_linter: bool) -> Result<Environment> {
    let config = load_config(&config_path(root))?;
    if with_linter {
        return Ok(Environment::local(root, &config).await);
    }
    Ok(Environment::new(
        Box::new(LocalFileSystem::new(root, config.filesystem.clone())),
        Box::new(DummyBrowser),
        Box::new(ShellTerminal::new(root, config.terminal.clone())),
        Box::new(CliUserInterface::new()),
        Box::new(DummyLinter),
    ))
}
