//! Ontology store: which actions each entity is permitted to perform.
//!
//! The store is loaded once and never mutated at runtime. Learning new
//! vocabulary therefore cannot grant new permissions: an action absent from
//! an entity's permitted set is refused for that entity no matter which
//! intent rules exist.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::atom::{Atom, Entity, Referent};
use crate::symbols::Extraction;

/// Permitted actions of a single entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub actions: BTreeSet<String>,
}

/// A self-action the ontology does not permit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refusal {
    /// The disallowed action atom.
    pub action: Atom,
    /// Literal surface word that triggered it, if known.
    pub surface: Option<String>,
}

/// Entity → permitted action names, as stored in `ontology.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyStore {
    #[serde(default)]
    entities: BTreeMap<String, Permissions>,
}

impl OntologyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity: Entity, actions: &[&str]) -> Self {
        self.entities.insert(
            entity.key().to_string(),
            Permissions {
                actions: actions.iter().map(|a| a.to_string()).collect(),
            },
        );
        self
    }

    /// Permitted action names of `entity`. Unregistered entities permit nothing.
    pub fn permitted(&self, entity: Entity) -> impl Iterator<Item = &str> {
        self.entities
            .get(entity.key())
            .into_iter()
            .flat_map(|p| p.actions.iter().map(String::as_str))
    }

    /// Whether `subject` may perform `action`.
    pub fn permits(&self, subject: Referent, action: &Atom) -> bool {
        let name = action.action_name();
        self.entities
            .get(subject.entity().key())
            .is_some_and(|p| p.actions.contains(&name))
    }

    /// First action the self-agent is asked to perform but may not.
    ///
    /// Only consulted when the self-referent was extracted; every
    /// action-class atom is checked, in atom order.
    pub fn first_refusal(&self, extraction: &Extraction) -> Option<Refusal> {
        if !extraction.mentions(Referent::SelfAgent) {
            return None;
        }
        extraction
            .actions()
            .find(|action| !self.permits(Referent::SelfAgent, action))
            .map(|action| Refusal {
                action: action.clone(),
                surface: extraction.surface_of(action).map(str::to_string),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::SymbolTable;

    fn ontology() -> OntologyStore {
        OntologyStore::new()
            .with_entity(Entity::SelfAgent, &["sing", "talk"])
            .with_entity(Entity::User, &["sing", "lie"])
    }

    fn table() -> SymbolTable {
        SymbolTable::new()
            .with_entry("你", "REF_SELF", &[])
            .with_entry("唱", "ACTION_SING", &[])
            .with_entry("说谎", "ACTION_LIE", &["撒谎"])
    }

    #[test]
    fn permits_normalizes_action_names() {
        let o = ontology();
        assert!(o.permits(Referent::SelfAgent, &Atom::new("ACTION_SING")));
        assert!(!o.permits(Referent::SelfAgent, &Atom::new("ACTION_LIE")));
        assert!(o.permits(Referent::Interlocutor, &Atom::new("ACTION_LIE")));
    }

    #[test]
    fn unregistered_entity_permits_nothing() {
        let o = OntologyStore::new().with_entity(Entity::User, &["sing"]);
        assert!(!o.permits(Referent::SelfAgent, &Atom::new("ACTION_SING")));
        assert_eq!(o.permitted(Entity::SelfAgent).count(), 0);
    }

    #[test]
    fn refusal_requires_self_referent() {
        let o = ontology();
        let t = table();
        assert!(o.first_refusal(&t.extract("说谎不好")).is_none());
        let refusal = o.first_refusal(&t.extract("你会撒谎吗")).unwrap();
        assert_eq!(refusal.action.as_str(), "ACTION_LIE");
        assert_eq!(refusal.surface.as_deref(), Some("说谎"));
    }

    #[test]
    fn permitted_actions_are_not_refused() {
        assert!(ontology().first_refusal(&table().extract("你唱")).is_none());
    }

    #[test]
    fn reads_ontology_document() {
        let json = r#"{ "entities": { "ammie": { "actions": ["sing"] }, "user": {} } }"#;
        let o: OntologyStore = serde_json::from_str(json).unwrap();
        assert_eq!(o.permitted(Entity::SelfAgent).collect::<Vec<_>>(), vec!["sing"]);
        assert_eq!(o.permitted(Entity::User).count(), 0);
    }
}
