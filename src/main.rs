use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use vigil_core::OutputFormat;
use vigil_repo::provider::Credentials;
use vigil_review::{FileEntry, ReviewClient, ReviewPipeline, ReviewReport};

#[derive(Parser)]
#[command(
    name = "vigil",
    version,
    about = "Parallel AI code review for whole repositories",
    long_about = "Vigil clones a repository, correlates every source file with its last\n\
                   commit and pull request, and fans file reviews out to Azure OpenAI\n\
                   across a bounded worker pool.\n\n\
                   Examples:\n  \
                     vigil review https://github.com/org/repo      Review a public repository\n  \
                     vigil review <url> --username me --token ...  Review a private repository\n  \
                     vigil review <url> --select                   Pick files interactively\n  \
                     vigil init                                    Create a .vigil.toml config file"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .vigil.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable report (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Clone a repository and review its source files with AI
    #[command(long_about = "Clone a repository and review its source files with AI.\n\n\
        Enumerates source files with per-file commit and PR metadata, then runs\n\
        the reviews concurrently against Azure OpenAI. Private repositories take\n\
        --username/--token (or VIGIL_GIT_USERNAME/VIGIL_GIT_TOKEN).\n\n\
        Examples:\n  vigil review https://github.com/org/repo\n  \
        vigil review https://dev.azure.com/org/project/_git/repo --select")]
    Review {
        /// Repository URL (GitHub or Azure DevOps)
        url: String,

        /// Username for private repositories
        #[arg(long)]
        username: Option<String>,

        /// Personal access token for private repositories
        #[arg(
            long,
            long_help = "Personal access token for private repositories.\n\n\
                GitHub: a token with 'repo' scope.\n\
                Azure DevOps: a PAT with 'Code (Read)' permission.\n\
                Also read from VIGIL_GIT_TOKEN."
        )]
        token: Option<String>,

        /// Pick the files to review interactively
        #[arg(long)]
        select: bool,

        /// Concurrent review workers (default: from config, 3)
        #[arg(long)]
        max_workers: Option<usize>,
    },
    /// Create a default .vigil.toml configuration file
    #[command(long_about = "Create a default .vigil.toml configuration file.\n\n\
        Generates a commented template with all available options.\n\
        Fails if .vigil.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

const CONFIG_TEMPLATE: &str = "\
# vigil configuration
#
# Azure OpenAI settings. Environment variables override these:
# AZURE_OPENAI_ENDPOINT, AZURE_OPENAI_KEY, AZURE_OPENAI_DEPLOYMENT.
[azure]
# endpoint = \"https://myresource.openai.azure.com\"
# api_key = \"...\"
# deployment = \"gpt-4o-mini\"

[review]
# Concurrent review tasks; keep low to respect service rate limits.
max_workers = 3
# Skip files larger than this many bytes.
max_file_size = 1000000
# Chunk budget in bytes when splitting large files.
chunk_size = 2000
# Output token bound per model request.
max_output_tokens = 2000
";

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!("vigil v{version} — parallel AI code review for whole repositories\n");
    println!("Quick start:");
    println!("  vigil init                                Create a .vigil.toml config file");
    println!("  vigil review https://github.com/org/repo  Review a repository\n");
    println!("Run 'vigil <command> --help' for details.");
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => vigil_core::VigilConfig::from_file(path)?,
        None => {
            let default_path = std::path::Path::new(".vigil.toml");
            if default_path.exists() {
                vigil_core::VigilConfig::from_file(default_path)?
            } else {
                vigil_core::VigilConfig::default()
            }
        }
    };

    match cli.command {
        None => {
            print_welcome();
            Ok(())
        }
        Some(Command::Init) => {
            let path = std::path::Path::new(".vigil.toml");
            if path.exists() {
                miette::bail!(".vigil.toml already exists, not overwriting");
            }
            std::fs::write(path, CONFIG_TEMPLATE).into_diagnostic()?;
            println!("Created .vigil.toml");
            Ok(())
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "vigil", &mut std::io::stdout());
            Ok(())
        }
        Some(Command::Review {
            url,
            username,
            token,
            select,
            max_workers,
        }) => {
            run_review(
                &config,
                &url,
                username,
                token,
                select,
                max_workers,
                cli.format,
                cli.verbose,
            )
            .await
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_review(
    config: &vigil_core::VigilConfig,
    url: &str,
    username: Option<String>,
    token: Option<String>,
    select: bool,
    max_workers: Option<usize>,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    // Configuration problems abort before any clone or review work.
    let azure = config.azure.resolve().map_err(|e| {
        miette::miette!(
            help = "Set AZURE_OPENAI_ENDPOINT, AZURE_OPENAI_KEY and AZURE_OPENAI_DEPLOYMENT, \
                    or add them to .vigil.toml under [azure]",
            "{e}"
        )
    })?;
    let client = ReviewClient::new(azure, config.review.clone())?;

    let credentials = resolve_credentials(username, token)?;

    eprintln!("Cloning {url}...");
    let cloned = vigil_repo::ClonedRepo::clone(url, credentials.as_ref())?;

    eprintln!("Finding source files...");
    let sources = vigil_repo::files::list_source_files(cloned.path(), config.review.max_file_size)?;
    if sources.is_empty() {
        miette::bail!("No source files found in the repository");
    }
    eprintln!("Found {} source files", sources.len());

    // Commit metadata is gathered once, single-threaded, before fan-out.
    let repo = cloned.repository()?;
    let mut entries = Vec::with_capacity(sources.len());
    for source in &sources {
        let commit = match vigil_repo::commit::last_commit_for(&repo, &source.relative_path, url) {
            Ok(info) => info,
            Err(e) => {
                if verbose {
                    eprintln!(
                        "No commit info for {}: {e}",
                        source.relative_path.display()
                    );
                }
                None
            }
        };
        entries.push(FileEntry {
            relative_path: source.relative_path.clone(),
            absolute_path: source.absolute_path.clone(),
            language: source.language.name().to_string(),
            notebook: source.language == vigil_repo::Language::Notebook,
            commit,
        });
    }
    drop(repo);

    print_file_listing(&entries);

    let entries = if select {
        let chosen = prompt_selection(entries.len())?;
        entries
            .into_iter()
            .enumerate()
            .filter(|(i, _)| chosen.contains(&(i + 1)))
            .map(|(_, e)| e)
            .collect()
    } else {
        entries
    };
    if entries.is_empty() {
        miette::bail!("Nothing selected for review");
    }

    eprintln!("\nStarting parallel review of {} files...", entries.len());
    let workers = max_workers.unwrap_or(config.review.max_workers);
    let bar = indicatif::ProgressBar::new(entries.len() as u64);
    bar.set_style(
        indicatif::ProgressStyle::with_template("{bar:30.cyan} {msg}")
            .expect("progress template"),
    );
    let pipeline = ReviewPipeline::new(Arc::new(client), workers).with_progress(bar);
    let results = pipeline.review_all(entries).await;
    let report = ReviewReport::new(results);

    // The temporary checkout is gone before anything is rendered; results
    // carry their own file snapshots.
    cloned.cleanup()?;

    match format {
        OutputFormat::Text => print!("{report}"),
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).into_diagnostic()?
            );
        }
        OutputFormat::Markdown => print!("{}", report.to_markdown()),
    }
    Ok(())
}

fn resolve_credentials(
    username: Option<String>,
    token: Option<String>,
) -> Result<Option<Credentials>> {
    let username = username.or_else(|| std::env::var("VIGIL_GIT_USERNAME").ok());
    let token = token.or_else(|| std::env::var("VIGIL_GIT_TOKEN").ok());
    match (username, token) {
        (Some(username), Some(token)) => Ok(Some(Credentials { username, token })),
        (None, None) => Ok(None),
        _ => miette::bail!("Private repositories need both --username and --token"),
    }
}

fn print_file_listing(entries: &[FileEntry]) {
    println!("\nFiles for review:");
    for (idx, entry) in entries.iter().enumerate() {
        println!("{}. {}", idx + 1, entry.relative_path.display());
        if let Some(commit) = &entry.commit {
            println!("   Last modified by: {}", commit.committer);
            println!("   Date: {}", commit.timestamp.to_rfc3339());
            match &commit.pr_number {
                Some(number) => println!("   PR: #{number}"),
                None => println!("   PR: None"),
            }
            println!("   Commit: {}", &commit.hash[..commit.hash.len().min(8)]);
        }
    }
}

fn prompt_selection(count: usize) -> Result<Vec<usize>> {
    println!("\nEnter the numbers of files to review (comma-separated) or 'all':");
    print!("> ");
    std::io::stdout().flush().into_diagnostic()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input).into_diagnostic()?;
    parse_selection(&input, count)
        .ok_or_else(|| miette::miette!("Invalid selection, expected file numbers or 'all'"))
}

fn parse_selection(input: &str, count: usize) -> Option<Vec<usize>> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("all") {
        return Some((1..=count).collect());
    }
    let mut chosen = Vec::new();
    for part in input.split(',') {
        let idx: usize = part.trim().parse().ok()?;
        if idx == 0 || idx > count {
            return None;
        }
        chosen.push(idx);
    }
    if chosen.is_empty() {
        None
    } else {
        Some(chosen)
    }
}
