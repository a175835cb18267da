//! End-to-end run over a card folder: enrich in place, then dedupe.

use chrono::NaiveDate;
use configuration::PriceSettings;
use core_types::ResolutionPolicy;
use dedupe::{DedupeSummary, DuplicateGrouper};
use enricher::{enrich_batch, prepare_jobs, EnrichOptions, RecordEnricher};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use store::{apply_resolution, CardStore, FilePriceSource, TrashOptions};

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 2).unwrap()
}

fn write_json(path: &Path, value: &Value) {
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

fn prices(rows: &[(&str, Value)]) -> Value {
    Value::Array(rows.iter().map(|(d, p)| json!({"date": d, "price": p})).collect())
}

/// Cards: two copies of one MSTR/BTC event and one undated ETH card.
fn fixture(root: &Path) -> (std::path::PathBuf, PriceSettings) {
    let cards = root.join("cards");
    let price_dir = root.join("prices");
    fs::create_dir_all(&cards).unwrap();
    fs::create_dir_all(&price_dir).unwrap();

    write_json(
        &cards.join("100.json"),
        &json!({"Stock Ticker": "MSTR", "Token": "BTC", "Raise Ann. Date": "2025-10-27"}),
    );
    write_json(
        &cards.join("200.json"),
        &json!({
            "Company": "Strategy",
            "Stock Ticker": "$mstr",
            "Token": "btc",
            "Raise Ann. Date": "27/10/2025",
            "Raise Amount": "$2B",
            "Raise Type": "Convertible notes"
        }),
    );
    write_json(&cards.join("300.json"), &json!({"Token": "ETH", "Raise Ann. Date": "N/A"}));
    fs::write(cards.join("100.orig.txt"), "source article").unwrap();

    write_json(
        &price_dir.join("MSTR.json"),
        &prices(&[
            ("2025-10-17", json!(10)),
            ("2025-10-26", json!(12)),
            ("2025-10-27", json!(11)),
            ("2025-10-28", json!(13)),
            ("2025-11-03", json!(15)),
        ]),
    );
    write_json(
        &price_dir.join("BTC-USD.json"),
        &prices(&[
            ("2025-10-20", json!("100")),
            ("2025-10-26", json!("104")),
            ("2025-10-27", json!("105")),
            ("2025-10-28", json!("110")),
            ("2025-11-03", json!("120")),
        ]),
    );
    write_json(
        &price_dir.join("ETH-USD.json"),
        &prices(&[("2025-10-31", json!(2000)), ("2025-11-01", json!(2100))]),
    );

    let settings = PriceSettings {
        dir: price_dir,
        ..Default::default()
    };
    (cards, settings)
}

fn enrich_folder(dir: &Path, settings: &PriceSettings) {
    let store = CardStore::open(dir).unwrap();
    let mut batch = store.load(None).unwrap();
    let enricher = RecordEnricher::new(EnrichOptions::new(as_of()));
    let source = FilePriceSource::new(settings.clone());
    let jobs = prepare_jobs(&enricher, std::mem::take(&mut batch.records), &source);
    let outcomes = enrich_batch(&enricher, jobs, 4, |_| {}).unwrap();
    batch.records = outcomes.into_iter().map(|o| o.record).collect();
    store.save_all(&batch).unwrap();
}

fn read(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn enrich_then_dedupe_a_card_folder() {
    let root = tempfile::tempdir().unwrap();
    let (cards, settings) = fixture(root.path());

    enrich_folder(&cards, &settings);

    let mstr = read(&cards.join("200.json"));
    assert_eq!(mstr["Share Price on Ann. Date"], json!("11"));
    assert_eq!(mstr["D Stock Perf"], json!("-8.33%"));
    assert_eq!(mstr["1D Stock Perf"], json!("18.18%"));
    assert_eq!(mstr["7D Stock Perf"], json!("36.36%"));
    assert_eq!(mstr["-7D Stock Perf"], json!("10.00%"));
    assert_eq!(mstr["-7 to -1D Stock Perf"], json!("20.00%"));
    assert_eq!(mstr["30D Stock Perf"], json!("N/A"));
    assert_eq!(mstr["D Token Perf"], json!("0.96%"));
    assert_eq!(mstr["7D Token Perf"], json!("14.29%"));
    assert_eq!(mstr["-7D Token Perf"], json!("5.00%"));
    assert_eq!(mstr["Raise Ann. Date"], json!("27/10/2025"));
    assert!(mstr.get("30D Token Perf").is_none());

    // undated: no stock fields, token anchored on the day before the run
    let eth = read(&cards.join("300.json"));
    assert_eq!(eth["Token Anchor Date"], json!("2025-11-01"));
    assert_eq!(eth["Raise Ann. Date"], json!("N/A"));
    assert_eq!(eth["D Token Perf"], json!("5.00%"));
    assert!(eth.as_object().unwrap().keys().all(|k| !k.contains("Stock")));

    // a second pass changes nothing on disk
    let before: Vec<String> = ["100.json", "200.json", "300.json"]
        .iter()
        .map(|f| fs::read_to_string(cards.join(f)).unwrap())
        .collect();
    enrich_folder(&cards, &settings);
    let after: Vec<String> = ["100.json", "200.json", "300.json"]
        .iter()
        .map(|f| fs::read_to_string(cards.join(f)).unwrap())
        .collect();
    assert_eq!(before, after);

    let store = CardStore::open(&cards).unwrap();
    let batch = store.load(None).unwrap();
    let sizes = batch.sizes_by_id();
    let grouper = DuplicateGrouper::new();
    let groups = grouper.group(&batch.records);
    let outcomes = grouper.resolve(&groups, ResolutionPolicy::KeepLargest, |r| {
        sizes.get(r.id()).copied().unwrap_or(0)
    });

    assert_eq!(
        DedupeSummary::from_outcomes(&outcomes),
        DedupeSummary {
            groups_considered: 2,
            groups_deduped: 1,
            kept_count: 2,
            duplicate_count: 1,
        }
    );
    let deduped = outcomes.iter().find(|o| !o.discarded.is_empty()).unwrap();
    assert_eq!(deduped.kept_id, "200");
    assert_eq!(deduped.discarded[0].record_id, "100");
    assert_eq!(deduped.discarded[0].policy, ResolutionPolicy::KeepLargest);

    let actions = apply_resolution(store.dir(), &batch.cards, &outcomes, &TrashOptions::default()).unwrap();
    assert_eq!(actions.len(), 2);
    let trash = cards.join("_dedup_trash");
    assert!(trash.join("100.json").exists());
    assert!(trash.join("100.orig.txt").exists());
    assert!(cards.join("200.json").exists());
    assert!(cards.join("300.json").exists());
    assert_eq!(store.load(None).unwrap().records.len(), 2);
}
