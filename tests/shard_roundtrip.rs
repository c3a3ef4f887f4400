//! End-to-end: build shards from a flat dictionary, load them back through
//! the filesystem fetcher, look words up, and warm the offline cache.

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use dabar::dictionary::{
    find_words_in_verse, get_entry, DictionaryLoader, FsCache, FsFetcher, FsStatusStore,
    ShardBuilder, WarmupOptions, WarmupPhase, WarmupService, INDEX_PATH,
};

fn flat_dictionary() -> serde_json::Value {
    json!({
        "genesis_1_1_principio": {
            "palavra_pt": "principio",
            "palavra_original": "רֵאשִׁית",
            "transliteracao": "reshit",
            "strong": "H7225",
            "significado_raiz": "Primeiro, começo",
            "referencias_relacionadas": ["João 1:1", "Colossenses 1:16"]
        },
        "genesis_1_1_ceus": {
            "palavra_pt": "céus",
            "strong": "H8064",
            "referencias_relacionadas": ["Salmos 19:1", "Isaías 66:1"]
        },
        "genesis_1_1_terra": {
            "palavra_pt": "terra",
            "strong": "H776",
            "referencias_relacionadas": ["Salmos 24:1", "Isaías 45:18"]
        },
        "genesis_1_3_luz": {
            "palavra_pt": "luz",
            "strong": "H216",
            "referencias_relacionadas": ["João 8:12", "1João 1:5"]
        },
        "exodo_3_14_eu_sou": {
            "palavra_pt": "eu sou",
            "strong": "H1961",
            "referencias_relacionadas": ["João 8:58", "Apocalipse 1:8"]
        }
    })
}

/// Build the artifact tree under `<root>/data/dictionary` so that index
/// paths resolve against an [`FsFetcher`] rooted at `<root>`.
fn build_tree(root: &TempDir) -> dabar::dictionary::BuildReport {
    let input = root.path().join("dicionario_completo.json");
    std::fs::write(&input, serde_json::to_vec(&flat_dictionary()).unwrap()).unwrap();

    ShardBuilder::default()
        .build(&input, &root.path().join("data/dictionary"))
        .unwrap()
}

#[tokio::test]
async fn test_built_tree_loads_and_matches() {
    let root = TempDir::new().unwrap();
    let report = build_tree(&root);
    assert!(report.version.starts_with("dict-"));

    let loader = DictionaryLoader::new(Arc::new(FsFetcher::new(root.path())));

    let index = loader.load_index().await;
    assert_eq!(index.version, report.version);
    assert_eq!(index.total_entries, 5);
    assert_eq!(index.total_chapters, 3);

    let text = "No principio criou Deus os céus e a terra.";
    let matches = find_words_in_verse(&loader, "gn", 1, 1, text).await;

    assert_eq!(matches.len(), 3);
    assert_eq!(matches[0].word, "principio");
    assert_eq!(matches[0].index, 3);
    assert_eq!(matches[0].entry.strong, "H7225");
    assert_eq!(matches[1].word, "céus");
    assert_eq!(matches[2].word, "terra");
    assert!(matches[0].index < matches[1].index && matches[1].index < matches[2].index);
}

#[tokio::test]
async fn test_repeated_word_yields_two_ordered_matches() {
    let root = TempDir::new().unwrap();
    build_tree(&root);
    let loader = DictionaryLoader::new(Arc::new(FsFetcher::new(root.path())));

    let text = "E houve luz, e a luz era boa.";
    let matches = find_words_in_verse(&loader, "gn", 1, 3, text).await;

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].word, "luz");
    assert_eq!(matches[1].word, "luz");
    assert!(matches[0].index < matches[1].index);
}

#[tokio::test]
async fn test_resolver_tiers_over_built_tree() {
    let root = TempDir::new().unwrap();
    build_tree(&root);
    let loader = DictionaryLoader::new(Arc::new(FsFetcher::new(root.path())));

    // Exact key after token normalization of the selected surface form.
    let entry = get_entry(&loader, "gn", 1, 1, "Céus,").await.unwrap();
    assert_eq!(entry.strong, "H8064");

    // Fuzzy tier tolerates small typos.
    let entry = get_entry(&loader, "gn", 1, 1, "prancipio").await.unwrap();
    assert_eq!(entry.strong, "H7225");

    // Multi-word tokens resolve in their own chapter.
    let entry = get_entry(&loader, "ex", 3, 14, "EU SOU").await.unwrap();
    assert_eq!(entry.strong, "H1961");

    assert!(get_entry(&loader, "gn", 1, 1, "zzz").await.is_none());
}

#[tokio::test]
async fn test_warmup_populates_offline_cache() {
    let root = TempDir::new().unwrap();
    build_tree(&root);

    let cache_dir = TempDir::new().unwrap();
    let loader = Arc::new(DictionaryLoader::new(Arc::new(FsFetcher::new(root.path()))));
    let service = WarmupService::new(
        loader,
        Arc::new(FsCache::new(cache_dir.path())),
        Arc::new(FsStatusStore::new(
            cache_dir.path().join("warmup-status.json"),
        )),
    );

    let status = service.warmup(WarmupOptions::default()).await;
    assert_eq!(status.phase, WarmupPhase::Done);
    assert_eq!(status.total, 3);
    assert_eq!(status.percentage, 100);

    let cached = |path: &str| cache_dir.path().join(path.trim_start_matches('/'));
    assert!(cached(INDEX_PATH).exists());
    assert!(cached("/data/dictionary/chapters/genesis/1.json").exists());
    assert!(cached("/data/dictionary/chapters/genesis/3.json").exists());
    assert!(cached("/data/dictionary/chapters/exodo/3.json").exists());

    // The cached tree is itself a servable artifact root.
    let offline = DictionaryLoader::new(Arc::new(FsFetcher::new(cache_dir.path())));
    let matches = find_words_in_verse(&offline, "gn", 1, 3, "E houve luz.").await;
    assert_eq!(matches.len(), 1);

    // A completed warmup short-circuits on the persisted status.
    let again = service.warmup(WarmupOptions::default()).await;
    assert_eq!(again.phase, WarmupPhase::Done);
    assert!(service.is_offline_ready().await);
}
