//! Veritas CLI

use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use veritas_llm::{ClientConfig, OpenAIClient};

#[derive(Parser)]
#[command(name = "veritas")]
#[command(about = "Veritas - proof-carrying repository analysis")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a repository: clone, parse, analyze, score, and write findings
    Scan {
        /// Clone URL or local path
        #[arg(value_name = "REPO")]
        repo: String,

        /// Branch or tag to scan (defaults to the repository's default branch)
        #[arg(long)]
        git_ref: Option<String>,

        /// Output directory for artifacts
        #[arg(short, long, default_value = "./veritas-output")]
        out: PathBuf,

        /// Maximum files to discover
        #[arg(long)]
        max_files: Option<usize>,

        /// Comma-separated analyzer categories to run
        #[arg(long, value_delimiter = ',')]
        analyzers: Option<Vec<String>>,
    },

    /// Index a repository: clone, parse, chunk, embed, and upsert vectors
    Index {
        /// Clone URL or local path
        #[arg(value_name = "REPO")]
        repo: String,

        /// Branch or tag to index (defaults to the repository's default branch)
        #[arg(long)]
        git_ref: Option<String>,

        /// Provider profile to use for embeddings
        #[arg(short, long)]
        profile: String,
    },

    /// Ask a question about a repository and get a proof-carrying answer
    Ask {
        /// Clone URL or local path
        #[arg(value_name = "REPO")]
        repo: String,

        /// Question to ask
        question: String,

        /// Branch or tag to index (defaults to the repository's default branch)
        #[arg(long)]
        git_ref: Option<String>,

        /// Provider profile to use
        #[arg(short, long)]
        profile: String,

        /// Output directory for the answer artifact
        #[arg(short, long, default_value = "./veritas-output")]
        out: PathBuf,

        /// Number of retrieved sources to consider
        #[arg(long, default_value_t = 10)]
        top_k: usize,
    },

    /// Configure provider profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List configured profiles
    List,

    /// Add a new provider profile
    Add {
        /// Profile name
        name: String,

        /// Base URL
        #[arg(short, long)]
        url: String,

        /// API key (stored in the OS keychain)
        #[arg(short, long)]
        key: String,

        /// Default model
        #[arg(short, long, default_value = "gpt-4o-mini")]
        model: String,

        /// Request timeout in seconds
        #[arg(long, default_value_t = 60)]
        timeout: u64,
    },

    /// Test a provider connection
    Test {
        /// Profile name
        name: String,
    },

    /// Remove a profile
    Remove {
        /// Profile name
        name: String,
    },
}

const DEFAULT_ANALYZERS: &[&str] = &["security", "privacy", "reliability", "performance", "maintainability", "architecture"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { repo, git_ref, out, max_files, analyzers } => {
            scan_repo(repo, git_ref, out, max_files, analyzers).await
        }
        Commands::Index { repo, git_ref, profile } => index_repo(repo, git_ref, profile).await,
        Commands::Ask { repo, question, git_ref, profile, out, top_k } => {
            ask_repo(repo, question, git_ref, profile, out, top_k).await
        }
        Commands::Config { command } => handle_config(command).await,
    }
}

/// Split a clone URL or local path into `(owner, name)` for repository
/// identity, taking the last two path segments (`.git` suffix stripped).
fn derive_repo_identity(repo: &str) -> (String, String) {
    let trimmed = repo.trim_end_matches('/').trim_end_matches(".git");
    let segments: Vec<&str> = trimmed.rsplit(['/', ':']).filter(|s| !s.is_empty()).collect();
    let name = segments.first().copied().unwrap_or("repo").to_string();
    let owner = segments.get(1).copied().unwrap_or("local").to_string();
    (owner, name)
}

async fn scan_repo(
    repo: String,
    git_ref: Option<String>,
    out: PathBuf,
    max_files: Option<usize>,
    analyzers: Option<Vec<String>>,
) -> anyhow::Result<()> {
    println!("{}", style("Veritas Scan").bold().cyan());
    println!("  Repository: {}", repo);

    let (owner, name) = derive_repo_identity(&repo);
    let analyzers_enabled = analyzers.unwrap_or_else(|| DEFAULT_ANALYZERS.iter().map(|s| s.to_string()).collect());

    let store = Arc::new(veritas_orchestrate::InMemoryStore::new());
    let clone_root = std::env::temp_dir().join("veritas-clones");
    let mut orchestrator = veritas_orchestrate::ScanOrchestrator::new(store.clone(), clone_root);

    let request = veritas_orchestrate::ScanRequest {
        owner,
        name,
        clone_url: repo,
        git_ref,
        credential: None,
        analyzers_enabled: analyzers_enabled.clone(),
        max_files,
    };

    let run = orchestrator.run(request).await?;
    let findings = store.get_findings(&run.id);
    let coverage = store.get_coverage(&run.id).unwrap_or_default();
    let controls = veritas_orchestrate::build_control_results(&analyzers_enabled, &findings);
    let control_tuples: Vec<(String, bool)> = controls
        .iter()
        .map(|c| (c.category.clone(), c.status == veritas_orchestrate::ControlStatus::Pass))
        .collect();

    let health_score = veritas_analyze::repository_health_score(&findings);

    println!();
    println!("{}", style("Scan Summary").bold().green());
    println!("  Run ID: {}", run.id);
    println!("  Status: {:?}", run.status);
    println!("  Health Score: {}/10", health_score);
    println!("  Findings: {}", findings.len());

    let writer = veritas_artifacts::ArtifactWriter::new(&out);
    let paths = writer.write_all(&run, &findings, &coverage, &control_tuples).await?;

    println!();
    println!("{}", style("Artifacts:").bold());
    println!("  {}", paths.scan_run_json.display());
    println!("  {}", paths.findings_json.display());
    println!("  {}", paths.coverage_json.display());
    println!("  {}", paths.report_md.display());

    Ok(())
}

async fn index_repo(repo: String, git_ref: Option<String>, profile_name: String) -> anyhow::Result<()> {
    println!("{}", style("Veritas Index").bold().cyan());
    println!("  Repository: {}", repo);

    let (owner, name) = derive_repo_identity(&repo);
    let client: Arc<dyn veritas_vector::Embedder> = Arc::new(load_client(&profile_name, 120)?);

    let store = Arc::new(veritas_orchestrate::InMemoryStore::new());
    let vectors = Arc::new(tokio::sync::Mutex::new(veritas_vector::VectorStore::new()));
    let clone_root = std::env::temp_dir().join("veritas-clones");
    let orchestrator = veritas_orchestrate::IndexOrchestrator::new(store.clone(), client, vectors, clone_root);

    let request = veritas_orchestrate::IndexRequest {
        owner,
        name,
        clone_url: repo,
        git_ref,
        credential: None,
        embedding_batch_size: 64,
    };

    let report = orchestrator.run(request).await?;

    println!();
    println!("{}", style("Index Summary").bold().green());
    println!("  Commit: {}", report.commit_sha);
    println!("  Files: {}", report.file_count);
    println!("  Symbols: {}", report.symbol_count);
    println!("  Chunks embedded: {}", report.chunk_count);

    Ok(())
}

async fn ask_repo(
    repo: String,
    question: String,
    git_ref: Option<String>,
    profile_name: String,
    out: PathBuf,
    top_k: usize,
) -> anyhow::Result<()> {
    println!("{}", style("Veritas Ask").bold().cyan());
    println!("  Repository: {}", repo);
    println!("  Question: {}", question);

    let (owner, name) = derive_repo_identity(&repo);
    let repo_id = format!("{owner}/{name}");
    let client = Arc::new(load_client(&profile_name, 120)?);

    let working_dir = std::env::temp_dir().join(format!("veritas-ask-{}", uuid::Uuid::new_v4()));
    let result = ask_inner(&repo_id, &repo, git_ref, &question, client, top_k, &out, &working_dir).await;

    if working_dir.exists() {
        let _ = tokio::fs::remove_dir_all(&working_dir).await;
    }
    result
}

async fn ask_inner(
    repo_id: &str,
    clone_url: &str,
    git_ref: Option<String>,
    question: &str,
    client: Arc<OpenAIClient>,
    top_k: usize,
    out: &std::path::Path,
    working_dir: &std::path::Path,
) -> anyhow::Result<()> {
    let clone_options = veritas_git::CloneOptions { git_ref, ..Default::default() };
    let git_repo = veritas_git::GitRepo::clone(clone_url, working_dir, &clone_options).await?;
    let commit_sha = git_repo.current_commit().await?;

    let mut coverage = veritas_core::CoverageTracker::new(false);
    let discovered = veritas_orchestrate::discovery::discover(working_dir, &mut coverage, None).await;

    let mut indexer = veritas_index::Indexer::new();
    for file in &discovered {
        if let Ok(parsed) = veritas_parse::parse_file(&file.path, &file.content) {
            indexer.ingest(&file.path, &parsed);
        }
    }

    let symbols: Vec<_> = indexer.all_symbols().into_iter().cloned().collect();
    let records: Vec<veritas_retrieval::SymbolRecord> = symbols
        .iter()
        .map(|s| veritas_retrieval::SymbolRecord {
            name: s.name.clone(),
            qualified_name: s.qualified_name.clone(),
            file_path: s.file_path.clone(),
            line_start: s.line_start,
            line_end: s.line_end,
            search_text: format!("{} {}", s.signature.as_deref().unwrap_or(""), s.docstring.as_deref().unwrap_or("")),
        })
        .collect();

    let mut symbol_index = veritas_retrieval::InProcessSymbolIndex::new();
    symbol_index.replace_repo(repo_id, records);

    let mut chunks = veritas_vector::chunk_symbols(repo_id, &symbols);
    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let embeddings = veritas_vector::embed_all(client.as_ref(), &texts, 64).await?;
    for (chunk, embedding) in chunks.iter_mut().zip(embeddings.into_iter()) {
        chunk.embedding = Some(embedding);
    }

    let mut vector_store = veritas_vector::VectorStore::new();
    vector_store.replace_repo(repo_id, chunks);

    let question_vector = veritas_vector::Embedder::embed_batch(client.as_ref(), &[question.to_string()])
        .await?
        .into_iter()
        .next()
        .unwrap_or_default();
    let sources = veritas_retrieval::retrieve(repo_id, question, &question_vector, &symbol_index, &vector_store);
    let sources = sources.into_iter().take(top_k).collect::<Vec<_>>();

    let db = veritas_core::LocalDb::in_memory()?;
    let fetcher = veritas_retrieval::LocalCheckoutFetcher::new(working_dir);
    let sources = veritas_retrieval::fill_snippets(sources, &db, repo_id, &commit_sha, &fetcher).await;

    let answer = veritas_llm::generate_answer(client.as_ref(), repo_id, question, &sources).await;

    println!();
    println!("{}", style("Answer").bold().green());
    println!("  Confidence: {:?}", answer.confidence_tier);
    for section in &answer.answer_sections {
        println!("  {}", section.text);
    }
    if !answer.unknowns.is_empty() {
        println!("{}", style("Unknowns:").yellow());
        for unknown in &answer.unknowns {
            println!("  - {}", unknown);
        }
    }

    let writer = veritas_artifacts::ArtifactWriter::new(out);
    let path = writer.write_answer_json(&answer).await?;
    println!();
    println!("  Artifact: {}", path.display());

    Ok(())
}

fn load_client(profile_name: &str, timeout_seconds: u64) -> anyhow::Result<OpenAIClient> {
    let manager = veritas_llm::ProfileManager::default();
    let (profile, api_key) = manager
        .get_profile_with_key(profile_name)?
        .ok_or_else(|| anyhow::anyhow!("Profile '{}' not found. Use 'veritas config add' to configure one.", profile_name))?;
    let api_key = api_key.ok_or_else(|| anyhow::anyhow!("No API key stored for profile '{}'", profile_name))?;

    let config = ClientConfig {
        base_url: profile.base_url.clone(),
        api_key,
        default_model: profile.default_model.clone(),
        headers: profile.headers.clone(),
        organization: profile.organization.clone(),
        project: profile.project.clone(),
        disable_system_proxy: false,
        timeout_seconds,
        max_retries: 2,
        rate_limit_config: None,
        cache_enabled: true,
    };
    OpenAIClient::new(config)
}

async fn handle_config(command: ConfigCommands) -> anyhow::Result<()> {
    let manager = veritas_llm::ProfileManager::default();

    match command {
        ConfigCommands::List => {
            println!("{}", style("Provider Profiles").bold());
            let profiles = manager.load_profiles()?;
            if profiles.is_empty() {
                println!("  No profiles configured.");
                println!("  Use: veritas config add <name> --url <url> --key <key>");
            } else {
                for profile in profiles {
                    println!("  - {} ({})", profile.name, profile.base_url);
                    println!("    Model: {}", profile.default_model);
                }
            }
        }
        ConfigCommands::Add { name, url, key, model, timeout } => {
            println!("{}", style(format!("Adding profile: {}", name)).bold().green());

            let mut profile = veritas_llm::ProviderProfile::new(name.clone(), url).with_model(model);
            profile.timeout_s = timeout;
            profile.validate_base_url().map_err(|e| anyhow::anyhow!(e))?;

            manager.save_profile(profile, Some(&key))?;
            println!("{}", style("Profile saved").green());
        }
        ConfigCommands::Test { name } => {
            println!("{}", style(format!("Testing connection: {}", name)).bold());
            let client = load_client(&name, 30)?;
            match client.test_connection().await {
                Ok(true) => println!("{}", style("Connection successful").green()),
                Ok(false) => println!("{}", style("Connection failed").red()),
                Err(e) => println!("{}", style(format!("Error: {}", e)).red()),
            }
        }
        ConfigCommands::Remove { name } => {
            println!("{}", style(format!("Removing profile: {}", name)).bold());
            if manager.delete_profile(&name)? {
                println!("{}", style("Profile removed").green());
            } else {
                println!("{}", style("Profile not found").red());
            }
        }
    }

    Ok(())
}
