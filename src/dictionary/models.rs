//! Data models for dictionary entries, the shard index and warmup status.
//!
//! Serialized field names match the published JSON artifacts, which the
//! reading app consumes directly: entry fields keep their Portuguese names
//! and index/status fields are camelCase.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// One published lexical entry. Immutable once written into a shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    /// Display term; may contain `/`-separated synonym variants.
    #[serde(default)]
    pub palavra_pt: String,
    #[serde(default)]
    pub palavra_original: String,
    #[serde(default)]
    pub transliteracao: String,
    /// Strong lexical code, `H####` or `G####`.
    #[serde(default)]
    pub strong: String,
    #[serde(default)]
    pub significado_raiz: String,
    #[serde(default)]
    pub significado_contextual: String,
    #[serde(default)]
    pub explicacao_detalhada: String,
    #[serde(default)]
    pub por_que_esta_palavra: String,
    #[serde(default)]
    pub conexao_teologica: String,
    /// Related scripture references; 2-5 unique entries in curated data.
    #[serde(default, deserialize_with = "deserialize_references")]
    pub referencias_relacionadas: Vec<String>,
}

impl DictionaryEntry {
    /// Whether the Strong code is well-formed. Legacy data carries
    /// placeholders here, so this is audited at build time rather than
    /// enforced at load time.
    pub fn has_valid_strong(&self) -> bool {
        super::key::is_valid_strong(&self.strong)
    }

    fn trimmed(mut self) -> Self {
        for field in [
            &mut self.palavra_pt,
            &mut self.palavra_original,
            &mut self.transliteracao,
            &mut self.strong,
            &mut self.significado_raiz,
            &mut self.significado_contextual,
            &mut self.explicacao_detalhada,
            &mut self.por_que_esta_palavra,
            &mut self.conexao_teologica,
        ] {
            *field = field.trim().to_string();
        }
        self
    }
}

/// Source-data reference items come in two shapes: plain strings and
/// `{ "referencia": ..., "relevancia": ... }` objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum ReferenceItem {
    Text(String),
    Annotated {
        #[serde(default)]
        referencia: String,
    },
}

fn deserialize_references<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items: Vec<ReferenceItem> = Vec::deserialize(deserializer)?;
    let mut refs = Vec::with_capacity(items.len());
    for item in items {
        let raw = match item {
            ReferenceItem::Text(s) => s,
            ReferenceItem::Annotated { referencia } => referencia,
        };
        let trimmed = raw.trim();
        if !trimmed.is_empty() && !refs.iter().any(|r| r == trimmed) {
            refs.push(trimmed.to_string());
        }
    }
    Ok(refs)
}

/// Reason a record was dropped during shard sanitization.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryRejection {
    #[error("entry is not a JSON object")]
    NotAnObject,
    #[error("entry has malformed fields: {0}")]
    MalformedFields(String),
}

/// Typed deserialize-with-validation for a single entry. Invalid records
/// are rejected with a reason instead of being silently coerced.
pub fn validate_entry(value: serde_json::Value) -> Result<DictionaryEntry, EntryRejection> {
    if !value.is_object() {
        return Err(EntryRejection::NotAnObject);
    }
    serde_json::from_value::<DictionaryEntry>(value)
        .map(DictionaryEntry::trimmed)
        .map_err(|e| EntryRejection::MalformedFields(e.to_string()))
}

/// All entries of one `(book, chapter)` pair, keyed by raw dictionary key.
pub type ChapterShard = HashMap<String, DictionaryEntry>;

/// Sanitize a fetched shard entry-by-entry: invalid individual records are
/// dropped, the rest of the chapter remains usable.
pub fn sanitize_shard(value: serde_json::Value) -> ChapterShard {
    let map = match value {
        serde_json::Value::Object(map) => map,
        _ => return ChapterShard::new(),
    };

    let mut shard = ChapterShard::with_capacity(map.len());
    let mut dropped = 0usize;
    for (key, raw) in map {
        match validate_entry(raw) {
            Ok(entry) => {
                shard.insert(key, entry);
            }
            Err(reason) => {
                dropped += 1;
                log::debug!("Dropped dictionary entry '{key}': {reason}");
            }
        }
    }
    if dropped > 0 {
        log::warn!("Dropped {dropped} invalid dictionary entries from shard");
    }
    shard
}

/// Per-book summary in the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexBook {
    pub chapters: Vec<u32>,
    pub entry_count: usize,
}

/// Per-chapter shard metadata: where to fetch it and how big it is
/// (clients size progress bars from `size` before downloading).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexChapter {
    pub path: String,
    pub entry_count: usize,
    pub size: u64,
}

/// The shard manifest produced by the builder and consumed by the loader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DictionaryIndex {
    /// Derived from `dictionary_hash`; gives reproducible cache-busting
    /// without manual version bumps.
    pub version: String,
    pub generated_at: String,
    pub total_entries: usize,
    pub total_books: usize,
    pub total_chapters: usize,
    pub dictionary_hash: String,
    pub books: BTreeMap<String, IndexBook>,
    pub chapters: BTreeMap<String, IndexChapter>,
}

/// Warmup lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarmupPhase {
    Idle,
    Running,
    Done,
    Error,
}

/// Progress snapshot of the offline warmup, persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WarmupStatus {
    pub phase: WarmupPhase,
    pub completed: usize,
    pub total: usize,
    pub percentage: u8,
    /// Unix milliseconds of the last update.
    pub updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Default for WarmupStatus {
    fn default() -> Self {
        Self {
            phase: WarmupPhase::Idle,
            completed: 0,
            total: 0,
            percentage: 0,
            updated_at: 0,
            error: None,
        }
    }
}

impl WarmupStatus {
    /// Build a progress snapshot, computing the clamped percentage and
    /// stamping the current time.
    pub fn progress(phase: WarmupPhase, completed: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            0
        } else {
            (((completed as f64 / total as f64) * 100.0).round() as u64).min(100) as u8
        };
        Self {
            phase,
            completed,
            total,
            percentage,
            updated_at: chrono::Utc::now().timestamp_millis(),
            error: None,
        }
    }

    /// Terminal failure snapshot.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            phase: WarmupPhase::Error,
            completed: 0,
            total: 0,
            percentage: 0,
            updated_at: chrono::Utc::now().timestamp_millis(),
            error: Some(message.into()),
        }
    }
}

/// Completion marker handed off to a background worker once a warmup run
/// finishes, so it can persist its own "fully synced" bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncComplete {
    pub version: String,
    pub total_chapters: usize,
    pub total_entries: usize,
    pub completed_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_entry_trims_fields() {
        let entry = validate_entry(json!({
            "palavra_pt": "  principio ",
            "strong": " H7225",
            "referencias_relacionadas": ["Salmos 119:105", "João 1:1"]
        }))
        .unwrap();
        assert_eq!(entry.palavra_pt, "principio");
        assert_eq!(entry.strong, "H7225");
        assert!(entry.has_valid_strong());
        assert_eq!(entry.significado_raiz, "");
    }

    #[test]
    fn test_validate_entry_rejects_non_objects() {
        assert_eq!(
            validate_entry(json!("just a string")),
            Err(EntryRejection::NotAnObject)
        );
        assert_eq!(validate_entry(json!(null)), Err(EntryRejection::NotAnObject));
        assert!(matches!(
            validate_entry(json!({"palavra_pt": 42})),
            Err(EntryRejection::MalformedFields(_))
        ));
    }

    #[test]
    fn test_references_accept_both_shapes() {
        let entry = validate_entry(json!({
            "palavra_pt": "amor",
            "referencias_relacionadas": [
                "Romanos 8:28",
                { "referencia": "Salmos 119:105", "relevancia": "A Palavra como guia" },
                "  ",
                "Romanos 8:28"
            ]
        }))
        .unwrap();
        assert_eq!(
            entry.referencias_relacionadas,
            vec!["Romanos 8:28", "Salmos 119:105"]
        );
    }

    #[test]
    fn test_sanitize_shard_drops_invalid_records() {
        let shard = sanitize_shard(json!({
            "genesis_1_1_principio": { "palavra_pt": "principio", "strong": "H7225" },
            "genesis_1_1_broken": "not an object",
            "genesis_1_2_terra": { "palavra_pt": "terra" }
        }));
        assert_eq!(shard.len(), 2);
        assert!(shard.contains_key("genesis_1_1_principio"));
        assert!(!shard.contains_key("genesis_1_1_broken"));
    }

    #[test]
    fn test_index_serializes_camel_case() {
        let mut index = DictionaryIndex {
            version: "dict-abc".into(),
            dictionary_hash: "abc".into(),
            ..Default::default()
        };
        index.chapters.insert(
            "genesis_1".into(),
            IndexChapter {
                path: "/data/dictionary/chapters/genesis/1.json".into(),
                entry_count: 4,
                size: 812,
            },
        );

        let value = serde_json::to_value(&index).unwrap();
        assert!(value.get("dictionaryHash").is_some());
        assert!(value.get("generatedAt").is_some());
        assert_eq!(value["chapters"]["genesis_1"]["entryCount"], 4);
    }

    #[test]
    fn test_warmup_status_percentage() {
        let status = WarmupStatus::progress(WarmupPhase::Running, 3, 9);
        assert_eq!(status.percentage, 33);
        let status = WarmupStatus::progress(WarmupPhase::Done, 9, 9);
        assert_eq!(status.percentage, 100);
        let status = WarmupStatus::progress(WarmupPhase::Running, 0, 0);
        assert_eq!(status.percentage, 0);
    }

    #[test]
    fn test_warmup_status_roundtrip() {
        let status = WarmupStatus::failed("shard download failed");
        let raw = serde_json::to_string(&status).unwrap();
        assert!(raw.contains("\"phase\":\"error\""));
        let parsed: WarmupStatus = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, status);
    }
}
