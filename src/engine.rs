//! Dialogue engine: the per-turn interpretation pipeline.
//!
//! The [`DialogueEngine`] owns the symbol table, ontology, scene state, an
//! evolution agent and a vocabulary store. Each call to
//! [`DialogueEngine::turn`] runs:
//!
//! 1. scene update
//! 2. atom extraction
//! 3. ontology check (refusal wins over everything else)
//! 4. intent rule match
//! 5. evolution, when nothing above fired
//!
//! A successful evolution persists the grown table and reloads it; the caller
//! is asked to repeat the input, the engine never retries on its own.

use crate::atom::Atom;
use crate::config::{Configuration, VocabularyStore};
use crate::error::{AmmieError, AmmieResult};
use crate::evolution::{Commit, EvolutionAgent, Lesson};
use crate::ontology::OntologyStore;
use crate::scene::{Location, SceneState};
use crate::symbols::{SymbolTable, VocabKey};

/// Surface word used in refusals when the trigger word is unknown.
const FALLBACK_SURFACE: &str = "这个";
const ACKNOWLEDGMENT: &str = "好的，我这就处理。";
const LEARNED: &str = "【学习成功】已掌握新词汇，请再次提问。";
const NOT_UNDERSTOOD: &str = "无法理解该动作。";
const PERSISTENCE_FAILED: &str = "学习失败：词汇表无法保存。";

/// Result of one turn.
///
/// `Display` renders the user-facing response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The ontology does not permit the requested self-action.
    Refused {
        location: Location,
        action: Atom,
        /// Self-referent display form.
        subject: String,
        negation: String,
        /// Literal word that triggered the action.
        surface: String,
    },
    /// An intent rule matched.
    Acknowledged { location: Location, intent: String },
    /// A new word and rule were learned; the input should be repeated.
    Learned {
        surface: String,
        canonical: Atom,
        intent: String,
        version: u64,
    },
    /// Evolution failed; nothing was learned.
    NotUnderstood { reason: String },
}

impl std::fmt::Display for TurnOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Refused {
                location,
                subject,
                negation,
                surface,
                ..
            } => write!(f, "[{location}] {subject}{negation}{surface} ✨"),
            Self::Acknowledged { location, .. } => write!(f, "[{location}] {ACKNOWLEDGMENT} ✨"),
            Self::Learned { .. } => f.write_str(LEARNED),
            Self::NotUnderstood { .. } => f.write_str(NOT_UNDERSTOOD),
        }
    }
}

/// Orchestrator for the interpretation and evolution pipeline.
pub struct DialogueEngine {
    symbols: SymbolTable,
    ontology: OntologyStore,
    scene: SceneState,
    scenes: serde_json::Value,
    capabilities: serde_json::Value,
    agent: Box<dyn EvolutionAgent>,
    store: Box<dyn VocabularyStore>,
}

impl DialogueEngine {
    /// Load configuration from `store` and build an engine.
    ///
    /// Fails if any required configuration document is missing or malformed.
    pub fn open(
        store: impl VocabularyStore + 'static,
        agent: impl EvolutionAgent + 'static,
    ) -> AmmieResult<Self> {
        let Configuration {
            symbols,
            ontology,
            scenes,
            capabilities,
        } = store.load()?;

        tracing::info!(
            entries = symbols.len(),
            rules = symbols.rule_count(),
            version = symbols.version(),
            "dialogue engine ready"
        );

        Ok(Self {
            symbols,
            ontology,
            scene: SceneState::default(),
            scenes,
            capabilities,
            agent: Box::new(agent),
            store: Box::new(store),
        })
    }

    /// Process one utterance and render the response.
    ///
    /// Never fails: faults are reported as a turn-level failure message so
    /// the caller can keep accepting input.
    pub fn process(&mut self, text: &str) -> String {
        match self.turn(text) {
            Ok(outcome) => outcome.to_string(),
            Err(AmmieError::Persistence { source }) => {
                tracing::error!(error = %source, "learned vocabulary was not persisted");
                format!("[{}] {PERSISTENCE_FAILED}", self.scene.location)
            }
            Err(e) => {
                tracing::error!(error = %e, "turn failed");
                format!("[{}] 处理失败：{e}", self.scene.location)
            }
        }
    }

    /// Process one utterance and return the structured outcome.
    pub fn turn(&mut self, text: &str) -> AmmieResult<TurnOutcome> {
        self.scene.observe(text);
        let location = self.scene.location;
        let extraction = self.symbols.extract(text);

        if let Some(refusal) = self.ontology.first_refusal(&extraction) {
            tracing::info!(action = %refusal.action, %location, "self-action refused by ontology");
            return Ok(TurnOutcome::Refused {
                location,
                subject: self.symbols.display(VocabKey::SelfReferent).to_string(),
                negation: self.symbols.display(VocabKey::Negative).to_string(),
                surface: refusal
                    .surface
                    .unwrap_or_else(|| FALLBACK_SURFACE.to_string()),
                action: refusal.action,
            });
        }

        if let Some(rule) = self.symbols.match_rule(&extraction) {
            tracing::info!(intent = %rule.intent, %location, "intent rule matched");
            return Ok(TurnOutcome::Acknowledged {
                location,
                intent: rule.intent.clone(),
            });
        }

        self.evolve(text)
    }

    fn evolve(&mut self, text: &str) -> AmmieResult<TurnOutcome> {
        tracing::debug!("no rule matched, consulting evolution agent");
        let proposal = self.agent.propose(text);

        let lesson = match proposal.validate(text, &self.symbols) {
            Ok(lesson) => lesson,
            Err(rejection) => {
                tracing::warn!(reason = %rejection, "evolution proposal rejected");
                return Ok(TurnOutcome::NotUnderstood {
                    reason: rejection.to_string(),
                });
            }
        };

        match self.commit(text, &lesson)? {
            Some(commit) => {
                tracing::info!(
                    surface = %lesson.surface,
                    canonical = %lesson.canonical,
                    intent = %lesson.intent,
                    new_entry = commit.entry_added,
                    required = ?commit.rule.required,
                    version = self.symbols.version(),
                    "learned new vocabulary"
                );
                Ok(TurnOutcome::Learned {
                    surface: lesson.surface,
                    canonical: lesson.canonical,
                    intent: lesson.intent,
                    version: self.symbols.version(),
                })
            }
            None => Ok(TurnOutcome::NotUnderstood {
                reason: "the table already holds this word and rule".into(),
            }),
        }
    }

    /// Apply `lesson` to a copy of the table, persist it, then reload.
    ///
    /// The live table is only replaced after the save succeeded, so a
    /// persistence failure leaves memory and disk as they were. A crash
    /// before the save loses the lesson.
    fn commit(&mut self, text: &str, lesson: &Lesson) -> AmmieResult<Option<Commit>> {
        let mut grown = self.symbols.clone();
        let commit = match lesson.apply(text, &mut grown) {
            Ok(commit) => commit,
            Err(rejection) => {
                tracing::warn!(reason = %rejection, "lesson not applied");
                return Ok(None);
            }
        };
        debug_assert!(grown.extends(&self.symbols));

        self.store
            .save_symbols(&grown)
            .map_err(|source| AmmieError::Persistence { source })?;

        match self.store.load_symbols() {
            Ok(reloaded) => {
                if reloaded.version() != grown.version() {
                    tracing::warn!(
                        written = grown.version(),
                        reloaded = reloaded.version(),
                        "reloaded symbol table version differs from the one written"
                    );
                }
                self.symbols = reloaded;
            }
            Err(e) => {
                // The save went through; keep what was written.
                self.symbols = grown;
                return Err(e.into());
            }
        }
        Ok(Some(commit))
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn ontology(&self) -> &OntologyStore {
        &self.ontology
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    /// Scene templates, as loaded.
    pub fn scenes(&self) -> &serde_json::Value {
        &self.scenes
    }

    /// Capabilities table, as loaded.
    pub fn capabilities(&self) -> &serde_json::Value {
        &self.capabilities
    }
}

impl std::fmt::Debug for DialogueEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogueEngine")
            .field("entries", &self.symbols.len())
            .field("rules", &self.symbols.rule_count())
            .field("version", &self.symbols.version())
            .field("scene", &self.scene)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryStore;
    use crate::evolution::{EvolutionProposal, OfflineAgent};
    use crate::seeds;

    struct Fixed(EvolutionProposal);

    impl EvolutionAgent for Fixed {
        fn propose(&self, _text: &str) -> EvolutionProposal {
            self.0.clone()
        }
    }

    fn engine(agent: impl EvolutionAgent + 'static) -> DialogueEngine {
        DialogueEngine::open(MemoryStore::new(seeds::default_configuration()), agent).unwrap()
    }

    #[test]
    fn refusal_names_location_and_surface() {
        let mut e = engine(OfflineAgent);
        let outcome = e.turn("你会说谎吗").unwrap();
        assert!(matches!(outcome, TurnOutcome::Refused { .. }));
        assert_eq!(outcome.to_string(), "[virtual] 我不会说谎 ✨");
    }

    #[test]
    fn matched_rule_acknowledges_with_location() {
        let mut e = engine(OfflineAgent);
        let outcome = e.turn("你会唱歌吗").unwrap();
        assert_eq!(
            outcome,
            TurnOutcome::Acknowledged {
                location: Location::Virtual,
                intent: "REQUEST_SING".into(),
            }
        );
        assert_eq!(outcome.to_string(), "[virtual] 好的，我这就处理。 ✨");
    }

    #[test]
    fn refusal_takes_precedence_over_matching_rule() {
        let config = Configuration {
            symbols: seeds::symbols().with_rule(&["REF_SELF", "ACTION_LIE"], "REQUEST_LIE"),
            ..seeds::default_configuration()
        };
        let mut e = DialogueEngine::open(MemoryStore::new(config), OfflineAgent).unwrap();
        assert!(matches!(
            e.turn("你能撒谎吗").unwrap(),
            TurnOutcome::Refused { .. }
        ));
    }

    #[test]
    fn missing_vocabulary_uses_defaults() {
        let config = Configuration {
            symbols: SymbolTable::new()
                .with_entry("你", "REF_SELF", &[])
                .with_entry("说谎", "ACTION_LIE", &[]),
            ..seeds::default_configuration()
        };
        let mut e = DialogueEngine::open(MemoryStore::new(config), OfflineAgent).unwrap();
        assert_eq!(e.process("你说谎"), "[virtual] 我不会说谎 ✨");
    }

    #[test]
    fn unknown_input_is_not_understood_offline() {
        let mut e = engine(OfflineAgent);
        let before = e.symbols().clone();
        assert_eq!(e.process("今天天气怎么样"), NOT_UNDERSTOOD);
        assert_eq!(e.symbols(), &before);
    }

    #[test]
    fn learned_action_is_still_refused_on_retry() {
        let mut e = engine(Fixed(EvolutionProposal::Learn {
            surface: "跳舞".into(),
            canonical: "ACTION_DANCE".into(),
            intent: "QUERY_DANCE".into(),
        }));
        let before = e.symbols().clone();
        assert!(matches!(
            e.turn("你会跳舞吗").unwrap(),
            TurnOutcome::Learned { version: 1, .. }
        ));
        assert_eq!(e.symbols().len(), before.len() + 1);
        assert_eq!(e.symbols().rule_count(), before.rule_count() + 1);
        // "dance" is not in the self-agent's permitted set.
        assert!(matches!(
            e.turn("你会跳舞吗").unwrap(),
            TurnOutcome::Refused { .. }
        ));
    }

    #[test]
    fn scene_location_prefixes_responses() {
        let mut e = engine(OfflineAgent);
        assert_eq!(e.process("我回家了，你会唱歌吗"), "[home] 好的，我这就处理。 ✨");
        assert_eq!(e.scene().location, Location::Home);
    }

    #[test]
    fn pass_through_documents_are_kept() {
        let e = engine(OfflineAgent);
        assert!(e.scenes().get("locations").is_some());
        assert!(e.capabilities().get("ammie").is_some());
    }
}
