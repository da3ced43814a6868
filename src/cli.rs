use clap::{Args, Parser, Subcommand};

use crate::config::Provider;

/// Quill - AI-powered git commit message generator
#[derive(Debug, Parser)]
#[command(name = "quill", version, about)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    // A bare `quill` invocation behaves like `quill generate`.
    #[command(flatten)]
    pub generate: GenerateArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a commit message from pending changes
    Generate(GenerateArgs),
    /// Show previously generated messages
    Show(ShowArgs),
}

#[derive(Debug, Args, Clone)]
pub struct GenerateArgs {
    /// Analyze only staged changes (the default)
    #[arg(short = 's', long = "staged-only", conflicts_with = "all")]
    pub staged_only: bool,

    /// Analyze all changes including unstaged
    #[arg(short = 'a', long = "all")]
    pub all: bool,

    /// Output the collected changes as JSON instead of generating a message
    #[arg(short = 'j', long = "json")]
    pub json: bool,

    /// API key for the selected provider (falls back to its environment
    /// variable, then the config file)
    #[arg(short = 'k', long = "api-key", value_name = "KEY")]
    pub api_key: Option<String>,

    /// Model identifier (defaults per provider)
    #[arg(short = 'm', long = "model", value_name = "MODEL")]
    pub model: Option<String>,

    /// AI provider to use
    #[arg(short = 'p', long = "provider", value_enum, value_name = "PROVIDER")]
    pub provider: Option<Provider>,

    /// Create a commit with the generated message
    #[arg(short = 'c', long = "commit")]
    pub commit: bool,

    /// Push to the given upstream branch after committing
    #[arg(short = 'u', long = "upstream", value_name = "BRANCH", requires = "commit")]
    pub upstream: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    /// Maximum number of entries to display
    #[arg(short = 'n', long = "limit", value_name = "COUNT")]
    pub limit: Option<usize>,

    /// Include entries from all repositories, not just the current one
    #[arg(short = 'r', long = "all-repos")]
    pub all_repos: bool,

    /// Delete stored messages instead of listing them
    #[arg(long = "clear")]
    pub clear: bool,
}
