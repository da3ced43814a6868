use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use colored::*;
use std::io::{self, Write};
use tracing::warn;

use crate::ai::{self, GenerationRequest};
use crate::changes::{self, DiffMode};
use crate::cli::{GenerateArgs, ShowArgs};
use crate::config::{Config, Provider};
use crate::git::{self, GitInspector};
use crate::history::{HistoryEntry, MessageHistory, DEFAULT_LIMIT};

/// The full generate workflow: inspect, summarize, generate, optionally
/// commit and push, then record the message. This is the only place that
/// mutates the repository, and every destructive step sits behind a prompt.
pub async fn run_generate(args: GenerateArgs, mut config: Config) -> Result<()> {
    if !git::git_available() {
        bail!("git is not installed or not on PATH");
    }

    let cwd = std::env::current_dir().context("could not determine current directory")?;
    let Some(repo) = GitInspector::discover(&cwd) else {
        bail!("not inside a git repository (run `git init` first)");
    };

    let provider = args.provider.unwrap_or(config.ai.provider);
    if let Some(key) = args.api_key.clone() {
        match provider {
            Provider::Anthropic => config.ai.anthropic_api_key = Some(key),
            Provider::OpenAi => config.ai.openai_api_key = Some(key),
        }
    }

    let mode = if args.all {
        DiffMode::AllChanges
    } else {
        DiffMode::StagedOnly
    };

    // Untracked files are only picked up if the user opts in; declining
    // leaves them out of the analysis entirely. Accepted files are staged
    // right before committing, not here.
    let mut included_untracked: Vec<String> = Vec::new();
    let untracked = repo.untracked_files();
    if !untracked.is_empty() {
        println!("{}", "Untracked files:".yellow().bold());
        for path in &untracked {
            println!("  {}", path);
        }
        if confirm("Include these files in the analysis?")? {
            included_untracked = untracked;
        }
    }

    let diff = match mode {
        DiffMode::StagedOnly => repo.staged_diff(),
        DiffMode::AllChanges => repo.all_diff(),
    };

    let Some(changeset) = changes::summarize(&diff, &included_untracked, mode) else {
        println!("No changes detected to analyze");
        return Ok(());
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&changeset.files)?);
        return Ok(());
    }

    let request = GenerationRequest::from_changes(&changeset, provider, args.model.clone());
    let generated = ai::generate(&request, &config.ai).await.map_err(|e| {
        anyhow!(
            "{} (provider: {}, model: {})",
            e,
            request.provider,
            request.model
        )
    })?;

    println!("\n{}", "Generated commit message:".green().bold());
    println!("  {}\n", generated.message);

    let mut message = generated.message.clone();
    let mut action: Result<()> = Ok(());

    if args.commit {
        match commit_confirmation()? {
            Decision::Abort => {
                println!("Commit aborted");
            }
            decision => {
                if let Decision::Edit(edited) = decision {
                    message = edited;
                }
                action = commit_and_push(&repo, &message, mode, &included_untracked, args.upstream.as_deref());
            }
        }
    }

    // The history captures every generated message, committed or not, and a
    // failed commit or push never unwinds it. Persistence problems must not
    // block the git action either, so they are only logged.
    let entry = HistoryEntry {
        timestamp: Utc::now(),
        repo_path: repo.repo_id(),
        message,
        provider: generated.provider,
        model: generated.model.clone(),
        files_changed: changeset.file_paths(),
    };
    match MessageHistory::open_default() {
        Ok(history) => {
            if let Err(e) = history.append(entry) {
                warn!("could not record message history: {:#}", e);
            }
        }
        Err(e) => warn!("could not open message history: {:#}", e),
    }

    action
}

fn commit_and_push(
    repo: &GitInspector,
    message: &str,
    mode: DiffMode,
    untracked: &[String],
    upstream: Option<&str>,
) -> Result<()> {
    if !untracked.is_empty() {
        repo.stage(untracked)?;
    }

    let commit_id = repo.commit(message, matches!(mode, DiffMode::AllChanges))?;
    println!(
        "{} {}",
        "Created commit".green().bold(),
        commit_id.get(..7).unwrap_or(&commit_id)
    );

    if let Some(branch) = upstream {
        repo.push(branch)?;
        println!("{} origin/{}", "Pushed to".green().bold(), branch);
    }

    Ok(())
}

pub fn run_show(args: ShowArgs) -> Result<()> {
    let history = MessageHistory::open_default()?;

    let repo_scope: Option<String> = if args.all_repos {
        None
    } else {
        let cwd = std::env::current_dir().context("could not determine current directory")?;
        let repo = GitInspector::discover(&cwd).ok_or_else(|| {
            anyhow!("not inside a git repository (use --all-repos to list every repository)")
        })?;
        Some(repo.repo_id())
    };

    if args.clear {
        if repo_scope.is_none() {
            println!(
                "{}",
                "This removes the stored messages for every repository."
                    .red()
                    .bold()
            );
            if !confirm("Clear all history?")? {
                println!("Nothing cleared");
                return Ok(());
            }
        }
        history.clear(repo_scope.as_deref())?;
        println!("History cleared");
        return Ok(());
    }

    let limit = args.limit.unwrap_or(DEFAULT_LIMIT);
    let entries = history.list(repo_scope.as_deref(), Some(limit));

    if entries.is_empty() {
        println!("No generated messages recorded yet");
        return Ok(());
    }

    for entry in entries {
        println!(
            "{}  {}  ({} / {})",
            entry
                .timestamp
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
                .blue(),
            entry.message.bold(),
            entry.provider,
            entry.model
        );
        if args.all_repos {
            println!("    repo:  {}", entry.repo_path);
        }
        if !entry.files_changed.is_empty() {
            println!("    files: {}", entry.files_changed.join(", "));
        }
    }

    Ok(())
}

enum Decision {
    Accept,
    Edit(String),
    Abort,
}

fn commit_confirmation() -> Result<Decision> {
    loop {
        print!("Create a commit with this message? [y]es / [e]dit / [n]o: ");
        io::stdout().flush()?;

        let mut line = String::new();
        io::stdin().read_line(&mut line)?;

        match line.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(Decision::Accept),
            "e" | "edit" => {
                print!("New commit message: ");
                io::stdout().flush()?;
                let mut edited = String::new();
                io::stdin().read_line(&mut edited)?;
                let edited = edited.trim().to_string();
                if edited.is_empty() {
                    println!("Empty message, keeping the generated one");
                    return Ok(Decision::Accept);
                }
                return Ok(Decision::Edit(edited));
            }
            "n" | "no" | "" => return Ok(Decision::Abort),
            _ => println!("Please answer y, e, or n"),
        }
    }
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N]: ", question);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}
