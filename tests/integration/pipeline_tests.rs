//! Integration tests for the sweep pipeline
//!
//! These tests run the real HTTP provider client and HTML extractor against
//! a wiremock server standing in for the scrape API, and check the canonical
//! records that land in SQLite.

use catalog_sweep::catalog::load_catalog_urls;
use catalog_sweep::checkpoint::{CheckpointStore, PassKind};
use catalog_sweep::config::load_config_with_hash;
use catalog_sweep::pipeline::{Pipeline, StartPhase};
use catalog_sweep::storage::{CanonicalStore, RunStatus, SqliteStorage};
use catalog_sweep::{ApiCost, ObservationRecord, ObservationStatus, ProductFields, Stage};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const URL_A: &str = "https://shop.example.com/item-a";
const URL_B: &str = "https://shop.example.com/item-b";

const PRODUCT_PAGE: &str = r#"<html><body>
  <h1 class="ui-pdp-title">Zapatilla Running</h1>
  <div class="ui-pdp-price__second-line">
    <span class="andes-money-amount__fraction">1.234</span>
  </div>
  <h2 class="ui-seller-data-header__title">Tienda Oficial</h2>
  <div class="ui-pdp-price__subtitles">Mismo precio en 6 cuotas</div>
  <img class="ui-pdp-image" src="https://img.example.com/a.jpg">
</body></html>"#;

const EMPTY_PAGE: &str = "<html><body><div class=\"loading\"></div></body></html>";

/// Scrape API stand-in
///
/// Item A renders on the first try. Item B renders without its title until
/// the provider is asked to wait 10 seconds (the second escalation stage).
/// First-pass attempts bill 0.001, retry-pass attempts 0.002.
struct CatalogResponder;

impl Respond for CatalogResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let param = |name: &str| {
            request
                .url
                .query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
        };

        let target = param("url").unwrap_or_default();
        let retrying = param("retry").as_deref() == Some("true");
        let cost = if retrying { "0.002" } else { "0.001" };

        let content = if target == URL_A || param("rendering_wait").as_deref() == Some("10000") {
            PRODUCT_PAGE
        } else {
            EMPTY_PAGE
        };

        ResponseTemplate::new(200)
            .insert_header("X-Scrapfly-Api-Cost", cost)
            .set_body_json(serde_json::json!({
                "result": { "content": content, "success": true }
            }))
    }
}

async fn start_provider() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/scrape"))
        .respond_with(CatalogResponder)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "subscription": {
                "usage": { "scrape": { "remaining": 9876 } },
                "period": { "start": "2026-10-01 00:00:00", "end": "2026-11-01 00:00:00" }
            }
        })))
        .mount(&server)
        .await;

    server
}

/// Writes a config file and a catalog file into `dir`
fn write_config(dir: &TempDir, base_url: &str) -> std::path::PathBuf {
    let catalog = dir.path().join("catalog.txt");
    std::fs::write(&catalog, format!("# competitor items\n{}\n\n{}\n", URL_A, URL_B)).unwrap();

    let config = format!(
        r#"
[provider]
base-url = "{base_url}"
api-key = "test-key"

[first-pass]
max-concurrent-fetches = 2
request-timeout-ms = 5000
pacing-min-ms = 0
pacing-max-ms = 10

[retry-pass]
inter-url-delay-ms = 0
request-timeout-ms = 5000

[output]
database-path = "{db}"
checkpoint-dir = "{cp}"
summary-path = "{md}"

[catalog]
urls-file = "{catalog}"
"#,
        db = dir.path().join("sweep.db").display(),
        cp = dir.path().join("checkpoints").display(),
        md = dir.path().join("summary.md").display(),
        catalog = catalog.display(),
    );

    let path = dir.path().join("sweep.toml");
    std::fs::write(&path, config).unwrap();
    path
}

fn scrape_requests(requests: &[Request]) -> Vec<&Request> {
    requests.iter().filter(|r| r.url.path() == "/scrape").collect()
}

fn session_of(request: &Request) -> String {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == "session")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_two_item_sweep_end_to_end() {
    let server = start_provider().await;
    let dir = TempDir::new().unwrap();
    let config_path = write_config(&dir, &server.uri());

    let (config, hash) = load_config_with_hash(&config_path).unwrap();
    let urls = load_catalog_urls(&config.catalog).unwrap();
    assert_eq!(urls, vec![URL_A, URL_B]);

    let mut pipeline = Pipeline::from_config(config.clone(), hash.clone()).unwrap();
    let report = pipeline.run(&urls, StartPhase::FirstPass).await.unwrap();

    assert_eq!(report.first_pass_observations, 2);
    assert_eq!(report.retried_urls, 1);
    assert_eq!(report.retry_observations, 2);
    assert_eq!(report.budget.as_ref().unwrap().remaining_credits, 9876);

    // Canonical keys equal the observed URL set
    let keys: Vec<_> = report.canonical.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(keys, vec![URL_A, URL_B]);

    let a = &report.canonical[0];
    assert_eq!(a.status, ObservationStatus::Succeeded);
    assert_eq!(a.stage, Stage::Primary);
    assert_eq!(a.price, 1234);
    assert_eq!(a.installments_text, "Mismo precio en 6 cuotas");
    assert!((a.aggregated_cost - 0.001).abs() < 1e-9);

    let b = &report.canonical[1];
    assert_eq!(b.status, ObservationStatus::Succeeded);
    assert_eq!(b.stage, Stage::SecondAttempt);
    assert_eq!(b.attempts, 3);
    assert!((b.aggregated_cost - 0.005).abs() < 1e-9);

    // Exactly one first-pass call per URL, then two escalation stages for B
    let requests = server.received_requests().await.unwrap();
    let scrapes = scrape_requests(&requests);
    assert_eq!(scrapes.len(), 4);
    let retry_sessions: Vec<_> = scrapes
        .iter()
        .map(|r| session_of(r))
        .filter(|s| s.starts_with("FAILED-"))
        .collect();
    assert_eq!(retry_sessions.len(), 2);
    assert_eq!(retry_sessions[0], retry_sessions[1]);

    // Persisted state
    let storage = SqliteStorage::new(Path::new(&config.output.database_path)).unwrap();
    assert_eq!(storage.count_canonical().unwrap(), 2);
    let stored_b = storage.get_canonical(URL_B).unwrap().unwrap();
    assert_eq!(stored_b, *b);
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, hash);
    assert_eq!(run.observations, 4);

    let summary = std::fs::read_to_string(dir.path().join("summary.md")).unwrap();
    assert!(summary.contains("| succeeded | 2 |"));
    assert!(summary.contains("- **Remaining Credits**: 9876"));
}

#[tokio::test]
async fn test_restart_from_retry_pass_reads_first_pass_checkpoint() {
    let server = start_provider().await;
    let dir = TempDir::new().unwrap();
    let config_path = write_config(&dir, &server.uri());
    let (config, hash) = load_config_with_hash(&config_path).unwrap();

    // First pass of an earlier, interrupted run
    let earlier = chrono::Utc::now() - chrono::Duration::minutes(30);
    let mut lost = ObservationRecord {
        url: URL_B.to_string(),
        timestamp: earlier,
        status: ObservationStatus::ProviderError,
        fields: ProductFields::unknown(),
        api_cost: ApiCost::Unknown,
        stage: Stage::Primary,
        failure_reason: Some("ERR::SCRAPE::OPERATION_TIMEOUT".to_string()),
    };
    let mut found = lost.clone();
    found.url = URL_A.to_string();
    found.status = ObservationStatus::Succeeded;
    found.fields.title = "Zapatilla Running".to_string();
    found.fields.price = "999".to_string();
    found.api_cost = ApiCost::Billed(0.001);
    found.failure_reason = None;
    lost.timestamp = earlier + chrono::Duration::seconds(1);

    let checkpoints = CheckpointStore::new(&config.output.checkpoint_dir);
    checkpoints.write(PassKind::FirstPass, &[found, lost]).unwrap();

    let mut pipeline = Pipeline::from_config(config, hash).unwrap();
    let report = pipeline.run(&[], StartPhase::RetryPass).await.unwrap();

    // No first-pass traffic: every scrape belongs to the retry pass
    let requests = server.received_requests().await.unwrap();
    let scrapes = scrape_requests(&requests);
    assert_eq!(scrapes.len(), 2);
    assert!(scrapes.iter().all(|r| session_of(r).starts_with("FAILED-")));

    assert_eq!(report.canonical.len(), 2);
    assert_eq!(report.canonical[0].price, 999);
    assert_eq!(report.canonical[0].stage, Stage::Primary);
    assert_eq!(report.canonical[1].status, ObservationStatus::Succeeded);
    assert!((report.canonical[1].aggregated_cost - 0.004).abs() < 1e-9);
}

#[tokio::test]
async fn test_stale_retry_checkpoint_is_replaced() {
    let server = start_provider().await;
    let dir = TempDir::new().unwrap();
    let config_path = write_config(&dir, &server.uri());
    let (config, hash) = load_config_with_hash(&config_path).unwrap();

    // Leftover from some older run, for a URL no longer in the catalog
    let stale = ObservationRecord {
        url: "https://shop.example.com/delisted".to_string(),
        timestamp: chrono::Utc::now(),
        status: ObservationStatus::Failed,
        fields: ProductFields::unknown(),
        api_cost: ApiCost::Billed(5.0),
        stage: Stage::DeepRescue,
        failure_reason: Some("title_not_found".to_string()),
    };
    CheckpointStore::new(&config.output.checkpoint_dir)
        .write(PassKind::RetryPass, &[stale])
        .unwrap();

    let mut pipeline = Pipeline::from_config(config, hash).unwrap();
    let report = pipeline
        .run(&[URL_A.to_string()], StartPhase::FirstPass)
        .await
        .unwrap();

    assert_eq!(report.retried_urls, 0);
    assert_eq!(report.retry_observations, 0);
    let keys: Vec<_> = report.canonical.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(keys, vec![URL_A]);
}

#[tokio::test]
async fn test_empty_catalog_makes_no_requests() {
    let server = start_provider().await;
    let dir = TempDir::new().unwrap();
    let config_path = write_config(&dir, &server.uri());
    let (config, hash) = load_config_with_hash(&config_path).unwrap();

    let mut pipeline = Pipeline::from_config(config, hash).unwrap();
    let report = pipeline.run(&[], StartPhase::FirstPass).await.unwrap();

    assert!(report.canonical.is_empty());
    let requests = server.received_requests().await.unwrap();
    assert!(scrape_requests(&requests).is_empty());
}
