use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;

use companion_updater::{
    DeriveError, Derived, DeriverSet, Document, Fetcher, JsonFileStore, RawContent, SectionDeriver,
    SectionKey, Store, StoreError, UpdateError, Updater, LAST_UPDATED_KEY,
};

/* ------------------------ stubs ------------------------ */

struct Offline;

impl Fetcher for Offline {
    async fn fetch(&self) -> RawContent {
        RawContent::Unavailable {
            reason: "connection refused".into(),
        }
    }
}

struct Page(String);

impl Fetcher for Page {
    async fn fetch(&self) -> RawContent {
        RawContent::Body(self.0.clone())
    }
}

struct Panicking(SectionKey);

impl SectionDeriver for Panicking {
    fn key(&self) -> SectionKey {
        self.0
    }

    fn derive(&self, _raw: &RawContent) -> Result<Derived, DeriveError> {
        panic!("selector drifted for {}", self.0)
    }
}

/// Returns whatever JSON it was built with, bypassing the typed records.
struct Emits(SectionKey, Value);

impl SectionDeriver for Emits {
    fn key(&self) -> SectionKey {
        self.0
    }

    fn derive(&self, _raw: &RawContent) -> Result<Derived, DeriveError> {
        Ok(Derived {
            value: self.1.clone(),
            degraded: false,
        })
    }
}

/// Reads through to a real file but refuses every write.
struct ReadOnly(JsonFileStore);

impl Store for ReadOnly {
    fn load(&self) -> Document {
        self.0.load()
    }

    fn save(&self, _document: &Document) -> Result<(), StoreError> {
        Err(StoreError::Commit {
            path: self.0.path().to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }
}

/// Stages every write for real, then loses the temp file before the rename.
struct CommitFails(JsonFileStore);

impl Store for CommitFails {
    fn load(&self) -> Document {
        self.0.load()
    }

    fn save(&self, document: &Document) -> Result<(), StoreError> {
        let staged = self.0.stage(document)?;
        fs::remove_file(staged.temp_path()).map_err(|source| StoreError::Write {
            path: self.0.path().to_path_buf(),
            source,
        })?;
        staged.commit()
    }
}

/* ------------------------ fixtures ------------------------ */

fn island(key: &str, json: &str) -> String {
    format!(r#"<script type="application/json" data-section="{key}">{json}</script>"#)
}

fn full_page() -> String {
    let islands = [
        island(
            "market_trends",
            r#"{ "trends": [{ "item_name": "AK-74N突击步枪", "price": 98000, "change": -2.5, "volume": 3000, "history": [100000, 98000] }],
                 "hot_items": [{ "item_name": "医疗包", "price": 9000, "trade_count": 800, "hotness": 88 }] }"#,
        ),
        island(
            "news",
            r#"[{ "title": "武器平衡性调整公告", "content": "调整", "publish_time": "2026-10-13 12:00:00", "category": "公告" }]"#,
        ),
        island(
            "weapon_codes",
            r#"[{ "weapon_name": "MP5", "weapon_type": "冲锋枪", "code": "MP5-MOD-101", "effectiveness": 90 }]"#,
        ),
        island(
            "map_points",
            r#"[{ "map_name": "酒店", "points": [{ "name": "酒店点位1", "type": "资源点", "coordinates": { "x": 5, "y": 6 }, "risk_level": "中" }] }]"#,
        ),
        island(
            "bullet_price_diff",
            r#"[{ "bullet_type": "7.62mm", "buy_price": 400, "sell_price": 250, "demand": "高" }]"#,
        ),
        island(
            "workbench_profit",
            r#"[{ "recipe_name": "医疗包", "cost": 10000, "sell_price": 18000, "craft_time": 30 }]"#,
        ),
        island(
            "restock_prediction",
            r#"[{ "item_name": "HK416", "current_stock": 3, "restock_time": 12, "restock_probability": 70, "demand_level": "高" }]"#,
        ),
        island(
            "s4_missions",
            r#"[{ "mission_name": "完成10局经典模式", "reward": 50000, "difficulty": "简单", "progress": 100, "status": "已完成" }]"#,
        ),
        island(
            "boss_spawns",
            r#"[{ "boss_name": "酒店首领", "map": "酒店", "spawn_rate": 30,
                  "locations": [{ "name": "酒店点位1", "spawn_probability": 25, "guards": 4, "difficulty": "中等" }],
                  "drops": [{ "item": "首领信物", "drop_rate": 100, "value": 80000 }] }]"#,
        ),
    ];
    format!("<html><body><h1>情报站</h1>{}</body></html>", islands.concat())
}

fn data_path(dir: &TempDir) -> PathBuf {
    dir.path().join("public").join("data.json")
}

fn seed(path: &Path, doc: Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
}

fn read(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

/* ------------------------ tests ------------------------ */

#[tokio::test]
async fn empty_store_and_offline_source_still_writes_every_section() {
    let dir = TempDir::new().unwrap();
    let path = data_path(&dir);
    let updater = Updater::new(Offline, JsonFileStore::new(&path), DeriverSet::standard());

    let report = updater.update().await.unwrap();
    assert!(!report.fetched);
    assert_eq!(report.degraded.len(), 9);
    assert!(report.fallbacks.is_empty());
    assert!(report.is_degraded());

    let doc = read(&path);
    let obj = doc.as_object().unwrap();
    assert_eq!(obj.len(), 10);
    for key in SectionKey::ALL {
        let v = &obj[key.as_str()];
        assert!(v.is_array() || v.is_object(), "{key} = {v}");
    }
    assert_eq!(obj["market_trends"], json!({ "trends": [], "hot_items": [] }));
    assert_eq!(obj[LAST_UPDATED_KEY], json!(report.last_updated));
}

#[tokio::test]
async fn unknown_top_level_keys_survive() {
    let dir = TempDir::new().unwrap();
    let path = data_path(&dir);
    let extra = json!({ "tips": ["多带医疗包"], "nested": { "a": [1, 2, { "b": null }] } });
    seed(&path, json!({ "gameModes": extra.clone(), "news": [{ "id": 99 }] }));

    let updater = Updater::new(Page(full_page()), JsonFileStore::new(&path), DeriverSet::standard());
    updater.update().await.unwrap();

    let doc = read(&path);
    assert_eq!(doc["gameModes"], extra);
    assert_eq!(doc.as_object().unwrap().len(), 11);
    // known keys are replaced wholesale
    assert_eq!(doc["news"][0]["id"], json!(1));
    assert_eq!(doc["news"][0]["title"], json!("武器平衡性调整公告"));
}

#[tokio::test]
async fn full_page_produces_fresh_derived_sections() {
    let dir = TempDir::new().unwrap();
    let path = data_path(&dir);
    let updater = Updater::new(Page(full_page()), JsonFileStore::new(&path), DeriverSet::standard());

    let report = updater.update().await.unwrap();
    assert!(report.fetched);
    assert!(!report.is_degraded());

    let doc = read(&path);
    assert_eq!(doc["bullet_price_diff"][0]["price_diff"], json!(150));
    assert_eq!(doc["bullet_price_diff"][0]["profit_margin"], json!(37.5));
    assert_eq!(doc["workbench_profit"][0]["profit"], json!(8000));
    assert_eq!(doc["workbench_profit"][0]["profit_margin"], json!(80.0));
    assert_eq!(doc["restock_prediction"][0]["next_restock"], json!("12小时后"));
    assert_eq!(doc["boss_spawns"][0]["locations"][0]["location_id"], json!(1));
    assert_eq!(doc["market_trends"]["hot_items"][0]["hotness"], json!(88));

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("武器平衡性调整公告"));
}

#[tokio::test]
async fn panicking_deriver_falls_back_to_previous_value() {
    let dir = TempDir::new().unwrap();
    let path = data_path(&dir);
    let previous_news = json!([{ "id": 1, "title": "旧闻", "content": "", "publish_time": "t", "category": "公告" }]);
    seed(&path, json!({ "news": previous_news.clone() }));

    let derivers = DeriverSet::standard().with(Panicking(SectionKey::News));
    let updater = Updater::new(Page(full_page()), JsonFileStore::new(&path), derivers);

    let report = updater.update().await.unwrap();
    assert_eq!(report.fallbacks.len(), 1);
    assert_eq!(report.fallbacks[0].key, SectionKey::News);
    assert!(report.fallbacks[0].kept_previous);
    assert!(report.fallbacks[0].failure.to_string().contains("selector drifted"));

    let doc = read(&path);
    assert_eq!(doc["news"], previous_news);
    assert_eq!(doc["weapon_codes"][0]["code"], json!("MP5-MOD-101"));
    assert_eq!(doc["s4_missions"][0]["progress"], json!(100));
}

#[tokio::test]
async fn failing_deriver_without_history_writes_empty_section() {
    let dir = TempDir::new().unwrap();
    let path = data_path(&dir);

    let derivers = DeriverSet::standard().with(Panicking(SectionKey::MarketTrends));
    let updater = Updater::new(Page(full_page()), JsonFileStore::new(&path), derivers);

    let report = updater.update().await.unwrap();
    assert!(!report.fallbacks[0].kept_previous);

    let doc = read(&path);
    assert_eq!(doc["market_trends"], json!({ "trends": [], "hot_items": [] }));
    assert_eq!(doc["map_points"][0]["map_name"], json!("酒店"));
}

#[tokio::test]
async fn out_of_contract_values_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = data_path(&dir);
    let good = json!([{ "id": 1, "mission_name": "m", "progress": 50 }]);
    seed(&path, json!({ "s4_missions": good.clone() }));

    let derivers = DeriverSet::standard()
        .with(Emits(SectionKey::S4Missions, json!([{ "id": 1, "progress": 180 }])))
        .with(Emits(SectionKey::News, Value::Null));
    let updater = Updater::new(Offline, JsonFileStore::new(&path), derivers);

    let report = updater.update().await.unwrap();
    let mut failed: Vec<_> = report.fallbacks.iter().map(|f| f.key).collect();
    failed.sort();
    assert_eq!(failed, vec![SectionKey::News, SectionKey::S4Missions]);

    let doc = read(&path);
    assert_eq!(doc["s4_missions"], good);
    assert_eq!(doc["news"], json!([]));
}

#[tokio::test]
async fn persist_failure_fails_the_run_and_keeps_the_old_file() {
    let dir = TempDir::new().unwrap();
    let path = data_path(&dir);
    seed(&path, json!({ "news": [], "last_updated": "2026-10-01 00:00:00" }));
    let before = fs::read(&path).unwrap();

    let updater = Updater::new(
        Page(full_page()),
        ReadOnly(JsonFileStore::new(&path)),
        DeriverSet::standard(),
    );
    let err = updater.update().await.unwrap_err();
    assert!(matches!(err, UpdateError::Persist(StoreError::Commit { .. })));

    assert_eq!(fs::read(&path).unwrap(), before);
}

#[tokio::test]
async fn failed_commit_after_staging_keeps_the_previous_document() {
    let dir = TempDir::new().unwrap();
    let path = data_path(&dir);
    let seeded = json!({ "news": [{ "id": 3, "title": "旧闻" }], "last_updated": "2026-10-01 00:00:00" });
    seed(&path, seeded.clone());
    let before = fs::read(&path).unwrap();

    let updater = Updater::new(
        Page(full_page()),
        CommitFails(JsonFileStore::new(&path)),
        DeriverSet::standard(),
    );
    let err = updater.update().await.unwrap_err();
    assert!(matches!(err, UpdateError::Persist(StoreError::Commit { .. })));

    assert_eq!(fs::read(&path).unwrap(), before);
    assert_eq!(Value::Object(updater.store().load()), seeded);

    let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}

#[tokio::test]
async fn invalid_previous_value_is_not_reused() {
    let dir = TempDir::new().unwrap();
    let path = data_path(&dir);
    seed(&path, json!({ "s4_missions": [{ "id": 1, "mission_name": "m", "progress": 180 }] }));

    let derivers = DeriverSet::standard().with(Panicking(SectionKey::S4Missions));
    let updater = Updater::new(Page(full_page()), JsonFileStore::new(&path), derivers);

    let report = updater.update().await.unwrap();
    assert_eq!(report.fallbacks.len(), 1);
    assert!(!report.fallbacks[0].kept_previous);
    assert_eq!(read(&path)["s4_missions"], json!([]));
}

#[tokio::test]
async fn interrupted_write_leaves_previous_document_loadable() {
    let dir = TempDir::new().unwrap();
    let path = data_path(&dir);
    let updater = Updater::new(Offline, JsonFileStore::new(&path), DeriverSet::standard());
    updater.update().await.unwrap();
    let before = updater.store().load();

    let mut next = before.clone();
    next.insert("news".into(), json!([{ "id": 1 }]));
    let staged = updater.store().stage(&next).unwrap();
    drop(staged);

    assert_eq!(updater.store().load(), before);
}

#[tokio::test]
async fn corrupt_document_is_replaced_with_a_valid_one() {
    let dir = TempDir::new().unwrap();
    let path = data_path(&dir);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "{\"news\": [").unwrap();

    let updater = Updater::new(Offline, JsonFileStore::new(&path), DeriverSet::standard());
    updater.update().await.unwrap();

    assert_eq!(read(&path).as_object().unwrap().len(), 10);
}

#[tokio::test]
async fn last_updated_never_moves_backwards() {
    let dir = TempDir::new().unwrap();
    let path = data_path(&dir);
    seed(&path, json!({ "last_updated": "2999-01-01 00:00:00" }));

    let updater = Updater::new(Offline, JsonFileStore::new(&path), DeriverSet::standard());
    let report = updater.update().await.unwrap();
    assert_eq!(report.last_updated, "2999-01-01 00:00:00");
}

#[tokio::test]
async fn consecutive_runs_do_not_drift() {
    let dir = TempDir::new().unwrap();
    let path = data_path(&dir);
    let updater = Updater::new(Page(full_page()), JsonFileStore::new(&path), DeriverSet::standard());

    updater.update().await.unwrap();
    let mut first = read(&path);
    updater.update().await.unwrap();
    let mut second = read(&path);

    first.as_object_mut().unwrap().remove(LAST_UPDATED_KEY);
    second.as_object_mut().unwrap().remove(LAST_UPDATED_KEY);
    assert_eq!(first, second);
}
