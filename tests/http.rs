use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct FieldTotal {
    sum: u64,
    defined: usize,
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    city_count: usize,
    total_electorate: u64,
    votes_2018: FieldTotal,
    target_2026: FieldTotal,
    target_min_2026: FieldTotal,
}

#[derive(Debug, Deserialize)]
struct GrowthCounts {
    growing: usize,
    declining: usize,
    stable: usize,
}

#[derive(Debug, Deserialize)]
struct PerformanceResponse {
    comparison_available: bool,
    counts: GrowthCounts,
    top_growth: Vec<Value>,
}

const FIXTURE: &str = r#"[
  {"NUM": 3, "CIDADE": "Rio Bonito", "NUM_ELEITORES": 45000,
   "DEP_ESTADUAL_2018": 200, "DEP_ESTADUAL_2022": 150,
   "PROJECAO_2026_MAX": null, "PROJECAO_2026_MED": null, "PROJECAO_2026_MIN": 100},
  {"NUM": 1, "CIDADE": "Rio de Janeiro", "NUM_ELEITORES": 5000000,
   "DEP_ESTADUAL_2018": 100, "DEP_ESTADUAL_2022": 120,
   "PROJECAO_2026_MAX": 200, "PROJECAO_2026_MED": 150, "PROJECAO_2026_MIN": null},
  {"NUM": 2, "CIDADE": "Belford Roxo", "NUM_ELEITORES": 350000,
   "DEP_ESTADUAL_2018": 0, "DEP_ESTADUAL_2022": 50,
   "PROJECAO_2026_MAX": null, "PROJECAO_2026_MED": 80, "PROJECAO_2026_MIN": null},
  {"NUM": 4, "CIDADE": "Paraty", "NUM_ELEITORES": 30000,
   "DEP_ESTADUAL_2018": null, "DEP_ESTADUAL_2022": null,
   "PROJECAO_2026_MAX": null, "PROJECAO_2026_MED": null, "PROJECAO_2026_MIN": null}
]"#;

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::Once;
    use std::sync::atomic::{AtomicI32, Ordering};

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_path(tag: &str) -> std::path::PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!(
        "election_dashboard_{tag}_{}_{}.json",
        std::process::id(),
        nanos
    ));
    path
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/health")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server(data_path: &std::path::Path) -> TestServer {
    let port = pick_free_port();
    let child = Command::new(env!("CARGO_BIN_EXE_election_dashboard"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", data_path)
        .env_remove("APP_DATA_URL")
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let data_path = unique_data_path("fixture");
    std::fs::write(&data_path, FIXTURE).expect("write fixture");
    let server = Arc::new(spawn_server(&data_path).await);
    *guard = Some(Arc::clone(&server));
    server
}

fn city_ids(body: &Value) -> Vec<i64> {
    body["cities"]
        .as_array()
        .expect("cities array")
        .iter()
        .map(|city| city["id"].as_i64().expect("numeric id"))
        .collect()
}

#[tokio::test]
async fn http_summary_reports_totals() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;

    let summary: SummaryResponse = Client::new()
        .get(format!("{}/api/summary", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(summary.city_count, 4);
    assert_eq!(summary.total_electorate, 5_425_000);
    assert_eq!(summary.votes_2018.sum, 300);
    assert_eq!(summary.votes_2018.defined, 3);
    assert_eq!(summary.target_2026.sum, 380);
    assert_eq!(summary.target_min_2026.sum, 100);
    assert_eq!(summary.target_min_2026.defined, 1);
}

#[tokio::test]
async fn http_cities_filter_by_name_and_bucket() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let all: Value = client
        .get(format!("{}/api/cities", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(city_ids(&all), vec![1, 2, 3, 4]);

    let rio: Value = client
        .get(format!("{}/api/cities", server.base_url))
        .query(&[("q", "RIO")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(city_ids(&rio), vec![1, 3]);
    assert_eq!(rio["cities"][0]["growthPct"], 20.0);
    assert_eq!(rio["cities"][0]["effectiveTarget2026"], 200);

    let small: Value = client
        .get(format!("{}/api/cities", server.base_url))
        .query(&[("q", "rio"), ("bucket", "0-50000")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(city_ids(&small), vec![3]);
    assert_eq!(small["count"], 1);
}

#[tokio::test]
async fn http_cities_hidden_without_years() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let none: Value = client
        .get(format!("{}/api/cities", server.base_url))
        .query(&[("years", "")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(none["count"], 0);
    assert!(city_ids(&none).is_empty());

    let one: Value = client
        .get(format!("{}/api/cities", server.base_url))
        .query(&[("years", "2026")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(city_ids(&one), vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn http_performance_partitions_growth() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let performance: PerformanceResponse = client
        .get(format!("{}/api/performance", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(performance.comparison_available);
    assert_eq!(performance.counts.growing, 1);
    assert_eq!(performance.counts.declining, 1);
    assert_eq!(performance.counts.stable, 0);
    assert_eq!(performance.top_growth.len(), 2);
    assert_eq!(performance.top_growth[0]["id"], 1);

    let without_2018: PerformanceResponse = client
        .get(format!("{}/api/performance", server.base_url))
        .query(&[("years", "2022,2026")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!without_2018.comparison_available);
    assert!(without_2018.top_growth.is_empty());
}

#[tokio::test]
async fn http_dashboard_omits_inactive_series() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;

    let dashboard: Value = Client::new()
        .get(format!("{}/api/dashboard", server.base_url))
        .query(&[("years", "2018,2026")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let years: Vec<u64> = dashboard["votes_chart"]["series"]
        .as_array()
        .unwrap()
        .iter()
        .map(|series| series["year"].as_u64().unwrap())
        .collect();
    assert_eq!(years, vec![2018, 2026]);
    assert_eq!(dashboard["votes_chart"]["series"][1]["values"][3], Value::Null);
    assert_eq!(dashboard["electorate_chart"]["others"], 0);
}

#[tokio::test]
async fn http_invalid_filters_are_rejected() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/api/cities", server.base_url))
        .query(&[("bucket", "1-2")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .get(format!("{}/api/dashboard", server.base_url))
        .query(&[("years", "2020")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_index_renders_filtered_table() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;

    let response = Client::new()
        .get(format!("{}/", server.base_url))
        .query(&[("q", "belford")])
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let html = response.text().await.unwrap();
    assert!(html.contains("Belford Roxo"));
    assert!(html.contains("1 cidade<"));
    assert!(html.contains("4 cidades monitoradas"));
}

#[tokio::test]
async fn http_missing_data_is_unavailable() {
    let server = spawn_server(&unique_data_path("missing")).await;
    let client = Client::new();

    let response = client
        .get(format!("{}/api/summary", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.text().await.unwrap(), "data unavailable");

    let response = client.get(format!("{}/", server.base_url)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.text().await.unwrap().contains("Dados indisponíveis"));
}
