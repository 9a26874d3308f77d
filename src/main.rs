//! ammie CLI: symbolic dialogue interpreter.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use ammie::config::{DirectoryStore, VocabularyStore};
use ammie::engine::DialogueEngine;
use ammie::evolution::{EvolutionAgent, OfflineAgent};
use ammie::llm::LlmEvolutionAgent;
use ammie::paths::AmmiePaths;
use ammie::seeds;
use ammie::settings::Settings;

#[derive(Parser)]
#[command(name = "ammie", version, about = "Symbolic dialogue interpreter")]
struct Cli {
    /// Settings file (TOML). Defaults to $XDG_CONFIG_HOME/ammie/ammie.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding symbols.json, scenes.json, ontology.json and capabilities.json.
    #[arg(long, global = true)]
    vocabulary_dir: Option<PathBuf>,

    /// Never consult the language model; unknown input is simply not understood.
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive conversation (default).
    Chat,

    /// Process a single utterance and print the response.
    Say {
        /// The utterance.
        text: String,
    },

    /// Write the built-in seed vocabulary into the vocabulary directory.
    Init {
        /// Overwrite existing documents.
        #[arg(long)]
        force: bool,
    },

    /// List symbol entries and intent rules.
    Vocab,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let paths = AmmiePaths::resolve();
    let settings_file = match (&cli.config, &paths) {
        (Some(path), _) => Some(path.clone()),
        (None, Ok(paths)) => Some(paths.settings_file()),
        (None, Err(_)) => None,
    };
    let settings = match settings_file {
        Some(path) => Settings::load_or_default(&path)?,
        None => Settings::default(),
    };

    let vocabulary_dir = match cli.vocabulary_dir.clone().or(settings.vocabulary_dir.clone()) {
        Some(dir) => dir,
        None => paths?.vocabulary_dir(),
    };
    let store = DirectoryStore::new(vocabulary_dir);

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Init { force } => {
            store.initialize(&seeds::default_configuration(), force)?;
            println!("Initialized vocabulary at {}", store.root().display());
        }

        Commands::Vocab => {
            let symbols = store.load_symbols()?;
            println!(
                "Symbol table (version {}, {} entries, {} rules):",
                symbols.version(),
                symbols.len(),
                symbols.rule_count()
            );
            for (surface, entry) in symbols.entries() {
                if entry.aliases.is_empty() {
                    println!("  {surface} -> {}", entry.canonical);
                } else {
                    println!(
                        "  {surface} (aliases: {}) -> {}",
                        entry.aliases.join(", "),
                        entry.canonical
                    );
                }
            }
            println!("Intent rules:");
            for (i, rule) in symbols.rules().iter().enumerate() {
                let required: Vec<&str> = rule.required.iter().map(|a| a.as_str()).collect();
                println!("  {}. {{{}}} => {}", i + 1, required.join(", "), rule.intent);
            }
        }

        Commands::Say { text } => {
            let mut engine = DialogueEngine::open(store, evolution_agent(cli.offline, &settings))?;
            println!("{}", engine.process(&text));
        }

        Commands::Chat => {
            let mut engine = DialogueEngine::open(store, evolution_agent(cli.offline, &settings))?;
            chat(&mut engine).into_diagnostic()?;
        }
    }

    Ok(())
}

/// Pick the evolution agent: the LLM when a key is configured, offline otherwise.
fn evolution_agent(offline: bool, settings: &Settings) -> Box<dyn EvolutionAgent> {
    if offline {
        return Box::new(OfflineAgent);
    }
    let config = settings.llm_config();
    if config.api_key.is_none() {
        tracing::warn!(
            env = %settings.llm.api_key_env,
            "no API key configured; running without vocabulary evolution"
        );
        return Box::new(OfflineAgent);
    }
    Box::new(LlmEvolutionAgent::new(config))
}

fn chat(engine: &mut DialogueEngine) -> std::io::Result<()> {
    println!("--- Ammie v{} ---", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or 'quit' to leave.");

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut line = String::new();
    loop {
        write!(stdout, "\nUser: ")?;
        stdout.flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!("\nBye.");
            return Ok(());
        }
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text.eq_ignore_ascii_case("exit") || text.eq_ignore_ascii_case("quit") {
            return Ok(());
        }
        println!("Ammie: {}", engine.process(text));
    }
}
