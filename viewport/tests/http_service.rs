//! Drives the HTTP transport against a stub simulation service.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use viewport::poller::endpoints;
use viewport::{
    lock_viewport, Applied, ControlEvent, EvolutionSchedule, HttpSimulationService,
    Outcome, PollError, PopulationPoller, RecordingSink, Update, ViewportConfig,
    ViewportController,
};

type Params = Query<HashMap<String, String>>;

#[derive(Clone, Default)]
struct Stub {
    steps: Arc<Mutex<Vec<(u32, u32)>>>,
}

fn number(params: &HashMap<String, String>, key: &str) -> i64 {
    params.get(key).and_then(|v| v.parse().ok()).unwrap_or(0)
}

async fn update_population(Query(params): Params) -> Json<Value> {
    let size = number(&params, "pop_size");
    let height = number(&params, "worldY");
    let individuals: Vec<Value> = (0..size)
        .map(|i| json!({"coords": [i % height.max(1), i], "color": format!("{i:08x}")}))
        .collect();
    Json(Value::Array(individuals))
}

async fn evolve_step(State(stub): State<Stub>, Query(params): Params) -> Json<Value> {
    let generation = number(&params, "generationIdx");
    let step = number(&params, "stepIdx");
    stub.steps
        .lock()
        .unwrap()
        .push((generation as u32, step as u32));
    Json(json!([{"coords": [generation, step], "hex_gene_sequence": "00ff00ff"}]))
}

async fn update_lifespan(Query(params): Params) -> String {
    format!("lifespan={}", number(&params, "lifespan"))
}

async fn update_num_genes(Query(params): Params) -> Json<Value> {
    let genes = number(&params, "num_genes");
    Json(json!([{"coords": [0, genes], "color": "genes"}]))
}

async fn start() -> &'static str {
    "Genesis"
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn spawn_stub() -> (String, Stub) {
    let stub = Stub::default();
    let app = Router::new()
        .route("/update_population", get(update_population))
        .route("/evolve_step", get(evolve_step))
        .route("/update_lifespan", get(update_lifespan))
        .route("/update_num_genes", get(update_num_genes))
        .route("/update_mate_probability", get(broken))
        .route("/action/start", get(start))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), stub)
}

fn service(base_url: &str) -> HttpSimulationService {
    HttpSimulationService::new(base_url, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn poller_speaks_the_service_protocol() {
    let (base_url, _stub) = spawn_stub().await;
    let poller = PopulationPoller::new(service(&base_url));

    let params = viewport::SimulationParameters {
        population_size: 4,
        world_height: 10,
        world_width: 10,
        ..Default::default()
    };
    let individuals = poller.request_population_update(&params).await.unwrap();
    assert_eq!(individuals.len(), 4);
    assert_eq!(individuals[3].coordinates, (3, 3));
    assert_eq!(individuals[3].color_key, "00000003");

    assert_eq!(
        poller.push_lifespan(75).await.unwrap(),
        Update::Acknowledged("lifespan=75".into())
    );
    let genes = poller.push_num_genes(7).await.unwrap();
    assert_eq!(genes.individuals().map(|i| i[0].coordinates), Some((0, 7)));

    let step = poller.advance_step(4, 11).await.unwrap();
    assert_eq!(step[0].coordinates, (4, 11));
    assert_eq!(step[0].color_key, "00ff00ff");

    assert_eq!(poller.announce_start().await.unwrap(), "Genesis");
}

#[tokio::test]
async fn http_failures_are_network_errors() {
    let (base_url, _stub) = spawn_stub().await;
    let poller = PopulationPoller::new(service(&base_url));

    let err = poller
        .push_setting(viewport::Setting::MateProbability(0.25))
        .await
        .unwrap_err();
    match err {
        PollError::Network { endpoint, message } => {
            assert_eq!(endpoint, endpoints::UPDATE_MATE_PROBABILITY);
            assert!(message.contains("500"), "unexpected message: {message}");
        }
        other => panic!("expected a network error, got {other:?}"),
    }

    // nothing listens on the discard port
    let unreachable = PopulationPoller::new(service("http://127.0.0.1:9"));
    let err = unreachable.advance_step(0, 0).await.unwrap_err();
    assert!(matches!(err, PollError::Network { .. }));
}

#[tokio::test]
async fn controller_runs_an_evolution_over_http() {
    let (base_url, stub) = spawn_stub().await;
    let config = ViewportConfig {
        service_url: base_url.clone(),
        schedule: EvolutionSchedule {
            generations: 4,
            steps_per_generation: 5,
        },
        concurrency: 3,
        ..ViewportConfig::default()
    };
    let sink = Arc::new(RecordingSink::new());
    let mut controller = ViewportController::new(service(&base_url), &config, sink.clone());

    let outcome = controller.initialize().await;
    assert!(matches!(outcome, Outcome::Applied(Applied::Painted(_))));

    assert_eq!(controller.handle(ControlEvent::Start).await, Outcome::EvolutionStarted);
    let report = controller.wait_for_evolution().await.unwrap();
    assert_eq!(report.dispatched, 20);
    assert_eq!(report.painted + report.stale, 20);
    assert_eq!(report.failed, 0);
    assert!(sink.is_empty());

    let mut steps = stub.steps.lock().unwrap().clone();
    steps.sort_unstable();
    let expected: Vec<(u32, u32)> = (0..4).flat_map(|g| (0..5).map(move |s| (g, s))).collect();
    assert_eq!(steps, expected);

    let viewport = controller.viewport();
    let state = lock_viewport(&viewport);
    let highlighted = state.grid().highlighted();
    assert_eq!(highlighted.len(), 1);
    let pos = highlighted[0].0;
    assert!(pos.row < 4 && pos.col < 5);
}
