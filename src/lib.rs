// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # ammie
//!
//! A symbolic dialogue interpreter. Free text is reduced to canonical atoms,
//! self-referential actions are checked against an ontology, atom
//! combinations are matched against intent rules, and unknown utterances are
//! handed to a language model that may teach the interpreter a new word.
//!
//! ## Architecture
//!
//! - **Atoms** (`atom`): canonical tokens and the closed referent/entity sets
//! - **Symbol table** (`symbols`): surface words → atoms, intent rules, extraction
//! - **Ontology** (`ontology`): entity → permitted actions, refusal detection
//! - **Scene** (`scene`): location heuristic
//! - **Evolution** (`evolution`, `llm`): proposal validation and additive learning
//! - **Persistence** (`config`): the four JSON vocabulary documents
//! - **Engine** (`engine`): the per-turn pipeline
//!
//! ## Library usage
//!
//! ```no_run
//! use ammie::config::MemoryStore;
//! use ammie::engine::DialogueEngine;
//! use ammie::evolution::OfflineAgent;
//! use ammie::seeds;
//!
//! let store = MemoryStore::new(seeds::default_configuration());
//! let mut engine = DialogueEngine::open(store, OfflineAgent).unwrap();
//! println!("{}", engine.process("你会唱歌吗"));
//! ```

pub mod atom;
pub mod config;
pub mod engine;
pub mod error;
pub mod evolution;
pub mod llm;
pub mod ontology;
pub mod paths;
pub mod scene;
pub mod seeds;
pub mod settings;
pub mod symbols;
