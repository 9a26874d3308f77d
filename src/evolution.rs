//! Vocabulary evolution: learning a new surface word and intent rule from an
//! external language-understanding capability.
//!
//! The protocol is consult → validate → commit → report. This module owns the
//! first three steps' data: [`EvolutionAgent`] is the capability,
//! [`EvolutionProposal::validate`] turns a raw proposal into a [`Lesson`], and
//! [`Lesson::apply`] performs the additive table mutation. Persisting and
//! reloading the table is the engine's job.

use thiserror::Error;

use crate::atom::{Atom, Referent, is_canonical};
use crate::symbols::{IntentRule, SymbolEntry, SymbolTable, normalize};

/// Output of an evolution agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvolutionProposal {
    /// Map `surface` to `canonical` and add a rule producing `intent`.
    Learn {
        surface: String,
        canonical: String,
        intent: String,
    },
    /// The agent could not (or did not) produce a usable mapping.
    Unknown { reason: String },
}

impl EvolutionProposal {
    pub fn unknown(reason: impl Into<String>) -> Self {
        Self::Unknown {
            reason: reason.into(),
        }
    }

    /// Check that the proposal can be committed for `input` against `table`.
    pub fn validate(self, input: &str, table: &SymbolTable) -> Result<Lesson, Rejection> {
        let (surface, canonical, intent) = match self {
            Self::Learn {
                surface,
                canonical,
                intent,
            } => (surface.trim().to_string(), canonical, intent),
            Self::Unknown { reason } => return Err(Rejection::Unknown { reason }),
        };

        if surface.is_empty() {
            return Err(Rejection::MissingField { field: "new_atom" });
        }
        if canonical.trim().is_empty() {
            return Err(Rejection::MissingField { field: "canonical" });
        }
        if intent.trim().is_empty() {
            return Err(Rejection::MissingField { field: "intent" });
        }
        let canonical = Atom::parse(&canonical).ok_or(Rejection::NotCanonical {
            field: "canonical",
            value: canonical,
        })?;
        let intent = intent.trim().to_string();
        if !is_canonical(&intent) {
            return Err(Rejection::NotCanonical {
                field: "intent",
                value: intent,
            });
        }
        if !normalize(input).contains(&normalize(&surface)) {
            return Err(Rejection::SurfaceAbsent { surface });
        }
        if let Some(existing) = table.resolve(&surface) {
            if *existing != canonical {
                return Err(Rejection::Conflict {
                    surface,
                    existing: existing.clone(),
                });
            }
        }

        Ok(Lesson {
            surface,
            canonical,
            intent,
        })
    }
}

/// Why a proposal was not committed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("agent returned no mapping: {reason}")]
    Unknown { reason: String },

    #[error("proposal is missing \"{field}\"")]
    MissingField { field: &'static str },

    #[error("proposal field \"{field}\" is not a canonical identifier: {value:?}")]
    NotCanonical { field: &'static str, value: String },

    #[error("proposed word {surface:?} does not occur in the input")]
    SurfaceAbsent { surface: String },

    #[error("{surface:?} already maps to {existing}")]
    Conflict { surface: String, existing: Atom },

    #[error("the table already holds this word and rule")]
    Redundant,
}

/// A validated proposal, ready to be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    pub surface: String,
    pub canonical: Atom,
    pub intent: String,
}

/// What a lesson changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub entry_added: bool,
    pub rule: IntentRule,
}

impl Lesson {
    /// Add the entry and rule to `table`. Strictly additive.
    ///
    /// The rule requires the canonical atom, plus the self-referent when the
    /// input addresses the agent (the self-referent is extractable from it).
    pub fn apply(&self, input: &str, table: &mut SymbolTable) -> Result<Commit, Rejection> {
        let entry_added = table.add_entry(&self.surface, SymbolEntry::new(self.canonical.clone()));

        let mut required = vec![self.canonical.clone()];
        if table.extract(input).mentions(Referent::SelfAgent) {
            required.push(Referent::SelfAgent.atom());
        }
        let rule = IntentRule::new(required, self.intent.clone());
        let rule_added = table.add_rule(rule.clone());

        if !entry_added && !rule_added {
            return Err(Rejection::Redundant);
        }
        table.bump_version();
        Ok(Commit { entry_added, rule })
    }
}

/// External language-understanding capability.
///
/// Implementations must never panic on bad upstream data; transport errors,
/// timeouts and malformed replies all become [`EvolutionProposal::Unknown`].
pub trait EvolutionAgent {
    fn propose(&self, text: &str) -> EvolutionProposal;
}

impl<A: EvolutionAgent + ?Sized> EvolutionAgent for Box<A> {
    fn propose(&self, text: &str) -> EvolutionProposal {
        (**self).propose(text)
    }
}

/// Agent used when no language model is configured. Never learns anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineAgent;

impl EvolutionAgent for OfflineAgent {
    fn propose(&self, _text: &str) -> EvolutionProposal {
        EvolutionProposal::unknown("no language model configured")
    }
}
