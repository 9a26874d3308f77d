//! Built-in seed vocabulary.
//!
//! `ammie init` writes this configuration into an empty vocabulary
//! directory. The symbol pool matches the canonical symbols the evolution
//! prompt advertises: `REF_SELF`, `REF_USER`, `NEGATIVE`, `POSITIVE`, `BODY`,
//! `KNOWLEDGE`, `ACTION_SING`, `OBJ_SONG`, plus `ACTION_LIE` and
//! `ACTION_TALK` so a fresh install can demonstrate both the refusal and the
//! acknowledgment paths.

use serde_json::json;

use crate::atom::Entity;
use crate::config::Configuration;
use crate::ontology::OntologyStore;
use crate::symbols::{SymbolTable, VocabKey};

/// Default symbol table.
pub fn symbols() -> SymbolTable {
    SymbolTable::new()
        .with_entry("你", "REF_SELF", &["您", "you"])
        .with_entry("我", "REF_USER", &[])
        .with_entry("不", "NEGATIVE", &["没"])
        .with_entry("好", "POSITIVE", &["棒"])
        .with_entry("身体", "BODY", &[])
        .with_entry("知识", "KNOWLEDGE", &[])
        .with_entry("唱", "ACTION_SING", &["sing"])
        .with_entry("歌", "OBJ_SONG", &["song"])
        .with_entry("说话", "ACTION_TALK", &["聊天", "talk"])
        .with_entry("说谎", "ACTION_LIE", &["撒谎", "骗"])
        .with_rule(&["REF_SELF", "ACTION_SING"], "REQUEST_SING")
        .with_rule(&["REF_SELF", "ACTION_TALK"], "REQUEST_TALK")
        .with_rule(&["REF_SELF", "KNOWLEDGE"], "QUERY_KNOWLEDGE")
        .with_rule(&["REF_USER", "BODY"], "REPORT_BODY")
        .with_vocabulary(VocabKey::SelfReferent, "我")
        .with_vocabulary(VocabKey::Negative, "不会")
}

/// Default ontology. The self-agent may sing and talk but never lie.
pub fn ontology() -> OntologyStore {
    OntologyStore::new()
        .with_entity(Entity::SelfAgent, &["sing", "talk"])
        .with_entity(Entity::User, &["sing", "talk", "lie"])
}

/// Complete default configuration, including pass-through documents.
pub fn default_configuration() -> Configuration {
    Configuration {
        symbols: symbols(),
        ontology: ontology(),
        scenes: json!({
            "default": { "WHO": "user", "WHAT": "IDLE", "WHEN": "now", "WHERE": "virtual" },
            "locations": {
                "home": ["家", "回", "home"],
                "office": ["公司", "办公室", "office"]
            }
        }),
        capabilities: json!({
            "ammie": { "voice": true, "memory": "scene" }
        }),
    }
}
