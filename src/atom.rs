//! Canonical atoms and the closed referent/entity vocabulary.
//!
//! Atoms are the only unit the ontology and rule layers reason about. Every
//! surface word in the symbol table resolves to exactly one [`Atom`]; an atom
//! whose name carries the `ACTION_` prefix is an *action-class* atom and is
//! subject to the ontology permission check.
//!
//! Referents and entities are closed enumerations so that the
//! referent → entity mapping is total and known at compile time.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Prefix that marks an action-class atom.
pub const ACTION_PREFIX: &str = "ACTION_";

static CANONICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").unwrap());

/// Whether `name` is a canonical identifier (`UPPER_SNAKE_CASE`, ASCII only).
///
/// Natural-language words (any script) are never canonical.
pub fn is_canonical(name: &str) -> bool {
    CANONICAL.is_match(name)
}

/// Canonical semantic token produced by symbol resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Atom(String);

impl Atom {
    /// Wrap a name as an atom without validation.
    ///
    /// Used for atoms that come from trusted configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Parse a canonical identifier, returning `None` for anything else.
    pub fn parse(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        is_canonical(trimmed).then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is an action-class atom (`ACTION_*`).
    pub fn is_action(&self) -> bool {
        self.0.starts_with(ACTION_PREFIX)
    }

    /// Bare action name used as the ontology key: `ACTION_SING` → `sing`.
    pub fn action_name(&self) -> String {
        self.0
            .strip_prefix(ACTION_PREFIX)
            .unwrap_or(&self.0)
            .to_lowercase()
    }
}

impl std::fmt::Display for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Participants an utterance can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Referent {
    /// The agent itself ("you" from the user's point of view).
    SelfAgent,
    /// The person talking to the agent.
    Interlocutor,
}

impl Referent {
    pub const ALL: [Referent; 2] = [Referent::SelfAgent, Referent::Interlocutor];

    /// Canonical atom name for this referent.
    pub fn atom_name(self) -> &'static str {
        match self {
            Self::SelfAgent => "REF_SELF",
            Self::Interlocutor => "REF_USER",
        }
    }

    pub fn atom(self) -> Atom {
        Atom::new(self.atom_name())
    }

    /// Resolve an atom back to a referent, if it is one.
    pub fn from_atom(atom: &Atom) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.atom_name() == atom.as_str())
    }

    /// Ontology entity this referent stands for. Total by construction.
    pub fn entity(self) -> Entity {
        match self {
            Self::SelfAgent => Entity::SelfAgent,
            Self::Interlocutor => Entity::User,
        }
    }
}

/// Entities registered in the ontology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    SelfAgent,
    User,
}

impl Entity {
    /// Key under which this entity is stored in `ontology.json`.
    pub fn key(self) -> &'static str {
        match self {
            Self::SelfAgent => "ammie",
            Self::User => "user",
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_identifiers() {
        assert!(is_canonical("ACTION_SING"));
        assert!(is_canonical("REF_SELF"));
        assert!(is_canonical("QUERY_LIE2"));
        assert!(!is_canonical("action_sing"));
        assert!(!is_canonical("说谎"));
        assert!(!is_canonical("ACTION SING"));
        assert!(!is_canonical("_ACTION"));
        assert!(!is_canonical(""));
    }

    #[test]
    fn parse_trims_and_validates() {
        assert_eq!(Atom::parse(" ACTION_LIE ").unwrap().as_str(), "ACTION_LIE");
        assert!(Atom::parse("lie").is_none());
    }

    #[test]
    fn action_names_are_bare_and_lowercase() {
        let sing = Atom::new("ACTION_SING");
        assert!(sing.is_action());
        assert_eq!(sing.action_name(), "sing");
        assert!(!Atom::new("OBJ_SONG").is_action());
    }

    #[test]
    fn referents_map_to_entities() {
        assert_eq!(Referent::SelfAgent.entity(), Entity::SelfAgent);
        assert_eq!(Referent::Interlocutor.entity(), Entity::User);
        assert_eq!(Entity::SelfAgent.key(), "ammie");
        assert_eq!(
            Referent::from_atom(&Atom::new("REF_USER")),
            Some(Referent::Interlocutor)
        );
        assert_eq!(Referent::from_atom(&Atom::new("ACTION_SING")), None);
    }
}
