//! Symbol table: surface words → canonical atoms, plus intent rules.
//!
//! The table is keyed by surface word, so a surface word maps to exactly one
//! [`Atom`] while several words (and their aliases) may share an atom. Intent
//! rules are kept in insertion order; matching is first-match-wins.
//!
//! The table is versioned: every evolution commit bumps [`SymbolTable::version`]
//! before it is persisted, so a reload can be checked against what was written.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::atom::{Atom, Referent};

/// Normalize text for matching: NFKC, then lowercase.
///
/// Applied identically to input, surface words and aliases.
pub fn normalize(text: &str) -> String {
    text.nfkc().collect::<String>().to_lowercase()
}

/// What a surface word resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    /// Canonical atom the word (and its aliases) resolves to.
    pub canonical: Atom,
    /// Alternative surface strings for the same word.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl SymbolEntry {
    pub fn new(canonical: Atom) -> Self {
        Self {
            canonical,
            aliases: Vec::new(),
        }
    }
}

/// Required atom set → intent label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentRule {
    pub required: BTreeSet<Atom>,
    pub intent: String,
}

impl IntentRule {
    pub fn new(required: impl IntoIterator<Item = Atom>, intent: impl Into<String>) -> Self {
        Self {
            required: required.into_iter().collect(),
            intent: intent.into(),
        }
    }

    /// Exact set containment. A rule with no requirements never matches.
    pub fn matches(&self, extraction: &Extraction) -> bool {
        !self.required.is_empty() && self.required.iter().all(|a| extraction.contains(a))
    }
}

/// Keys into the response vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VocabKey {
    /// Display form of the self-referent ("I" in the agent's voice).
    SelfReferent,
    /// Negation token used in refusals.
    Negative,
}

impl VocabKey {
    pub fn key(self) -> &'static str {
        match self {
            Self::SelfReferent => Referent::SelfAgent.atom_name(),
            Self::Negative => "NEGATIVE",
        }
    }

    /// Used when the vocabulary has no entry for this key.
    pub fn fallback(self) -> &'static str {
        match self {
            Self::SelfReferent => "我",
            Self::Negative => "不会",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseComponents {
    #[serde(rename = "VOCABULARY", default)]
    pub vocabulary: BTreeMap<String, String>,
}

/// Atoms found in one utterance, with the surface word that produced each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    atoms: BTreeSet<Atom>,
    surfaces: BTreeMap<Atom, String>,
}

impl Extraction {
    pub fn contains(&self, atom: &Atom) -> bool {
        self.atoms.contains(atom)
    }

    pub fn mentions(&self, referent: Referent) -> bool {
        self.atoms.contains(&referent.atom())
    }

    pub fn atoms(&self) -> &BTreeSet<Atom> {
        &self.atoms
    }

    /// Action-class atoms, in atom order.
    pub fn actions(&self) -> impl Iterator<Item = &Atom> {
        self.atoms.iter().filter(|a| a.is_action())
    }

    /// The surface word that first produced `atom`.
    pub fn surface_of(&self, atom: &Atom) -> Option<&str> {
        self.surfaces.get(atom).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    fn record(&mut self, atom: &Atom, surface: &str) {
        if self.atoms.insert(atom.clone()) {
            self.surfaces.insert(atom.clone(), surface.to_string());
        }
    }
}

/// Mutable, versioned vocabulary owned by the dialogue engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTable {
    #[serde(default)]
    version: u64,
    #[serde(default)]
    atomic: BTreeMap<String, SymbolEntry>,
    #[serde(default)]
    logic_map: Vec<IntentRule>,
    #[serde(default)]
    response_components: ResponseComponents,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, surface: &str, canonical: &str, aliases: &[&str]) -> Self {
        self.atomic.insert(
            surface.to_string(),
            SymbolEntry {
                canonical: Atom::new(canonical),
                aliases: aliases.iter().map(|a| a.to_string()).collect(),
            },
        );
        self
    }

    pub fn with_rule(mut self, required: &[&str], intent: &str) -> Self {
        self.logic_map
            .push(IntentRule::new(required.iter().map(|a| Atom::new(*a)), intent));
        self
    }

    pub fn with_vocabulary(mut self, key: VocabKey, display: &str) -> Self {
        self.response_components
            .vocabulary
            .insert(key.key().to_string(), display.to_string());
        self
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of symbol entries.
    pub fn len(&self) -> usize {
        self.atomic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atomic.is_empty()
    }

    pub fn rule_count(&self) -> usize {
        self.logic_map.len()
    }

    /// Entries in surface-word order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &SymbolEntry)> {
        self.atomic.iter().map(|(surface, entry)| (surface.as_str(), entry))
    }

    pub fn rules(&self) -> &[IntentRule] {
        &self.logic_map
    }

    pub fn entry(&self, surface: &str) -> Option<&SymbolEntry> {
        self.atomic.get(surface)
    }

    /// Atom that `surface` already resolves to, through any entry's surface
    /// word or alias, compared after normalization.
    pub fn resolve(&self, surface: &str) -> Option<&Atom> {
        let wanted = normalize(surface);
        if wanted.is_empty() {
            return None;
        }
        self.atomic
            .iter()
            .find(|(key, entry)| {
                normalize(key) == wanted || entry.aliases.iter().any(|a| normalize(a) == wanted)
            })
            .map(|(_, entry)| &entry.canonical)
    }

    /// Display string for a vocabulary key, falling back to a fixed default.
    pub fn display(&self, key: VocabKey) -> &str {
        self.response_components
            .vocabulary
            .get(key.key())
            .map(String::as_str)
            .unwrap_or_else(|| key.fallback())
    }

    /// Find every atom whose surface word or alias occurs in `text`.
    ///
    /// Entries are visited in surface-word order, so when several words map
    /// to the same atom the recorded surface is the lexicographically
    /// smallest word that fired. An alias hit records the entry's surface
    /// word, not the alias.
    pub fn extract(&self, text: &str) -> Extraction {
        let haystack = normalize(text);
        let mut extraction = Extraction::default();
        for (surface, entry) in &self.atomic {
            let hit = occurs(&haystack, surface)
                || entry.aliases.iter().any(|alias| occurs(&haystack, alias));
            if hit {
                extraction.record(&entry.canonical, surface);
            }
        }
        tracing::debug!(
            atoms = ?extraction.atoms,
            "extracted {} atom(s)",
            extraction.len()
        );
        extraction
    }

    /// First rule, in table order, whose requirements are all present.
    pub fn match_rule(&self, extraction: &Extraction) -> Option<&IntentRule> {
        self.logic_map.iter().find(|rule| rule.matches(extraction))
    }

    /// Add a surface word. Never replaces an existing entry.
    ///
    /// Returns `false` if the word already resolves, as a surface word or an
    /// alias in any letter case or width.
    pub fn add_entry(&mut self, surface: &str, entry: SymbolEntry) -> bool {
        if self.resolve(surface).is_some() {
            return false;
        }
        self.atomic.insert(surface.to_string(), entry);
        true
    }

    /// Append a rule unless an identical one already exists.
    pub fn add_rule(&mut self, rule: IntentRule) -> bool {
        if self.logic_map.contains(&rule) {
            return false;
        }
        self.logic_map.push(rule);
        true
    }

    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }

    /// Whether every entry and rule of `earlier` is still present here.
    pub fn extends(&self, earlier: &SymbolTable) -> bool {
        earlier
            .atomic
            .iter()
            .all(|(surface, entry)| self.atomic.get(surface) == Some(entry))
            && earlier.logic_map.iter().all(|r| self.logic_map.contains(r))
    }
}

fn occurs(haystack: &str, needle: &str) -> bool {
    let needle = normalize(needle);
    !needle.is_empty() && haystack.contains(&needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SymbolTable {
        SymbolTable::new()
            .with_entry("你", "REF_SELF", &["you"])
            .with_entry("唱", "ACTION_SING", &["sing"])
            .with_entry("唱歌", "ACTION_SING", &[])
            .with_entry("歌", "OBJ_SONG", &[])
            .with_rule(&["REF_SELF", "ACTION_SING"], "REQUEST_SING")
            .with_rule(&["ACTION_SING"], "MENTION_SING")
    }

    #[test]
    fn unknown_text_extracts_nothing() {
        let extraction = table().extract("今天天气不错");
        assert!(extraction.is_empty());
        assert!(table().match_rule(&extraction).is_none());
    }

    #[test]
    fn synonyms_collapse_to_one_atom() {
        let extraction = table().extract("你会唱歌吗");
        assert_eq!(extraction.len(), 3);
        assert!(extraction.contains(&Atom::new("ACTION_SING")));
        // "唱" sorts before "唱歌", so it wins the reverse map.
        assert_eq!(extraction.surface_of(&Atom::new("ACTION_SING")), Some("唱"));
    }

    #[test]
    fn aliases_match_case_insensitively() {
        let extraction = table().extract("Can YOU Sing?");
        assert!(extraction.mentions(Referent::SelfAgent));
        assert_eq!(extraction.surface_of(&Atom::new("ACTION_SING")), Some("唱"));
    }

    #[test]
    fn fullwidth_input_is_normalized() {
        let extraction = table().extract("ＳＩＮＧ");
        assert!(extraction.contains(&Atom::new("ACTION_SING")));
    }

    #[test]
    fn first_matching_rule_wins() {
        let t = table();
        let rule = t.match_rule(&t.extract("你唱")).unwrap();
        assert_eq!(rule.intent, "REQUEST_SING");
        let rule = t.match_rule(&t.extract("唱")).unwrap();
        assert_eq!(rule.intent, "MENTION_SING");
    }

    #[test]
    fn empty_rule_never_matches() {
        let t = SymbolTable::new().with_rule(&[], "ANYTHING");
        assert!(t.match_rule(&t.extract("")).is_none());
    }

    #[test]
    fn add_entry_never_overwrites() {
        let mut t = table();
        assert!(!t.add_entry("唱", SymbolEntry::new(Atom::new("ACTION_SHOUT"))));
        assert_eq!(t.entry("唱").unwrap().canonical.as_str(), "ACTION_SING");
        assert!(t.add_entry("说谎", SymbolEntry::new(Atom::new("ACTION_LIE"))));
        assert_eq!(t.len(), 5);
    }

    #[test]
    fn resolve_sees_aliases_across_case_and_width() {
        let t = table();
        assert_eq!(t.resolve("SING").map(Atom::as_str), Some("ACTION_SING"));
        assert_eq!(t.resolve("ｓｉｎｇ").map(Atom::as_str), Some("ACTION_SING"));
        assert_eq!(t.resolve("歌").map(Atom::as_str), Some("OBJ_SONG"));
        assert!(t.resolve("dance").is_none());
        assert!(t.resolve("").is_none());
    }

    #[test]
    fn add_entry_rejects_existing_alias() {
        let mut t = table();
        assert!(!t.add_entry("Sing", SymbolEntry::new(Atom::new("ACTION_CHANT"))));
        assert!(t.entry("Sing").is_none());
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn duplicate_rules_are_not_appended() {
        let mut t = table();
        assert!(!t.add_rule(IntentRule::new([Atom::new("ACTION_SING")], "MENTION_SING")));
        assert_eq!(t.rule_count(), 2);
    }

    #[test]
    fn vocabulary_falls_back_to_defaults() {
        let t = table().with_vocabulary(VocabKey::SelfReferent, "Ammie");
        assert_eq!(t.display(VocabKey::SelfReferent), "Ammie");
        assert_eq!(t.display(VocabKey::Negative), "不会");
    }

    #[test]
    fn reads_documents_without_optional_sections() {
        let json = r#"{ "atomic": { "唱": { "canonical": "ACTION_SING" } } }"#;
        let t: SymbolTable = serde_json::from_str(json).unwrap();
        assert_eq!(t.version(), 0);
        assert_eq!(t.len(), 1);
        assert_eq!(t.rule_count(), 0);
    }

    #[test]
    fn extends_detects_removed_rules() {
        let before = table();
        let mut after = before.clone();
        after.add_entry("说谎", SymbolEntry::new(Atom::new("ACTION_LIE")));
        assert!(after.extends(&before));
        assert!(!before.extends(&after));
        assert!(!SymbolTable::new().extends(&before));
    }
}
