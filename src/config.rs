//! Vocabulary persistence: loading the four configuration documents and
//! saving the symbol table.
//!
//! The engine only talks to the [`VocabularyStore`] trait. [`DirectoryStore`]
//! keeps the documents as JSON files in one directory; [`MemoryStore`] keeps
//! them in memory for embedding and tests.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::ontology::OntologyStore;
use crate::symbols::SymbolTable;

/// Errors from loading or saving configuration documents.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("missing configuration document {document}: {path}")]
    #[diagnostic(
        code(ammie::config::missing),
        help(
            "All four documents (symbols.json, scenes.json, ontology.json, capabilities.json) \
             must exist. Run `ammie init` to write the default set."
        )
    )]
    Missing { document: &'static str, path: String },

    #[error("failed to read {path}")]
    #[diagnostic(
        code(ammie::config::read),
        help("Ensure the file is readable by the current user.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    #[diagnostic(
        code(ammie::config::parse),
        help("Check the JSON syntax. The file must be a single UTF-8 JSON document.")
    )]
    Parse { path: String, message: String },

    #[error("failed to serialize symbol table: {message}")]
    #[diagnostic(code(ammie::config::serialize))]
    Serialize { message: String },

    #[error("failed to write {path}")]
    #[diagnostic(
        code(ammie::config::write),
        help("Ensure the vocabulary directory exists and is writable.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration already exists at {path}")]
    #[diagnostic(
        code(ammie::config::already_initialized),
        help("Pass --force to overwrite the existing documents.")
    )]
    AlreadyInitialized { path: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// The four named documents of a vocabulary directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Document {
    Symbols,
    Scenes,
    Ontology,
    Capabilities,
}

impl Document {
    pub const ALL: [Document; 4] = [
        Document::Symbols,
        Document::Scenes,
        Document::Ontology,
        Document::Capabilities,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Symbols => "symbols.json",
            Self::Scenes => "scenes.json",
            Self::Ontology => "ontology.json",
            Self::Capabilities => "capabilities.json",
        }
    }
}

/// Everything loaded at startup.
///
/// Scene templates and the capabilities table are not interpreted by the
/// dialogue pipeline; they are carried through unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Configuration {
    pub symbols: SymbolTable,
    pub ontology: OntologyStore,
    pub scenes: serde_json::Value,
    pub capabilities: serde_json::Value,
}

/// Load/save capability the dialogue engine depends on.
pub trait VocabularyStore {
    /// Load all configuration documents.
    fn load(&self) -> ConfigResult<Configuration>;

    /// Reload just the symbol table.
    fn load_symbols(&self) -> ConfigResult<SymbolTable>;

    /// Persist the full symbol table.
    fn save_symbols(&mut self, symbols: &SymbolTable) -> ConfigResult<()>;
}

/// JSON documents in a single directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, document: Document) -> PathBuf {
        self.root.join(document.file_name())
    }

    /// Whether any of the documents already exists.
    pub fn is_initialized(&self) -> bool {
        Document::ALL.iter().any(|d| self.path(*d).exists())
    }

    /// Write a complete configuration, creating the directory if needed.
    pub fn initialize(&self, config: &Configuration, force: bool) -> ConfigResult<()> {
        if !force && self.is_initialized() {
            return Err(ConfigError::AlreadyInitialized {
                path: self.root.display().to_string(),
            });
        }
        std::fs::create_dir_all(&self.root).map_err(|e| ConfigError::Write {
            path: self.root.display().to_string(),
            source: e,
        })?;
        self.write(Document::Symbols, &config.symbols)?;
        self.write(Document::Scenes, &config.scenes)?;
        self.write(Document::Ontology, &config.ontology)?;
        self.write(Document::Capabilities, &config.capabilities)?;
        tracing::info!(root = %self.root.display(), "wrote vocabulary documents");
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, document: Document) -> ConfigResult<T> {
        let path = self.path(document);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::Missing {
                    document: document.file_name(),
                    path: path.display().to_string(),
                });
            }
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source: e,
                });
            }
        };
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Write through a sibling temp file so a failed write never truncates
    /// the existing document.
    fn write<T: Serialize>(&self, document: Document, value: &T) -> ConfigResult<()> {
        let path = self.path(document);
        let content = serde_json::to_string_pretty(value).map_err(|e| ConfigError::Serialize {
            message: e.to_string(),
        })?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)
            .and_then(|()| std::fs::rename(&tmp, &path))
            .map_err(|e| ConfigError::Write {
                path: path.display().to_string(),
                source: e,
            })
    }
}

impl VocabularyStore for DirectoryStore {
    fn load(&self) -> ConfigResult<Configuration> {
        let config = Configuration {
            symbols: self.read(Document::Symbols)?,
            scenes: self.read(Document::Scenes)?,
            ontology: self.read(Document::Ontology)?,
            capabilities: self.read(Document::Capabilities)?,
        };
        tracing::debug!(
            root = %self.root.display(),
            entries = config.symbols.len(),
            rules = config.symbols.rule_count(),
            version = config.symbols.version(),
            "loaded configuration"
        );
        Ok(config)
    }

    fn load_symbols(&self) -> ConfigResult<SymbolTable> {
        self.read(Document::Symbols)
    }

    fn save_symbols(&mut self, symbols: &SymbolTable) -> ConfigResult<()> {
        self.write(Document::Symbols, symbols)
    }
}

/// In-memory store. Saves replace the held symbol table.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    config: Configuration,
    saves: usize,
}

impl MemoryStore {
    pub fn new(config: Configuration) -> Self {
        Self { config, saves: 0 }
    }

    /// Number of successful `save_symbols` calls.
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl VocabularyStore for MemoryStore {
    fn load(&self) -> ConfigResult<Configuration> {
        Ok(self.config.clone())
    }

    fn load_symbols(&self) -> ConfigResult<SymbolTable> {
        Ok(self.config.symbols.clone())
    }

    fn save_symbols(&mut self, symbols: &SymbolTable) -> ConfigResult<()> {
        self.config.symbols = symbols.clone();
        self.saves += 1;
        Ok(())
    }
}
