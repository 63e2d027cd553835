//! The Client role: an external collaborator, outside the consensus
//! core, that generates a simulated workload against the Proposers and
//! receives commit notifications from the Learners.

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use chrono::Utc;
use paxos_core::config::ClientConfig;
use paxos_core::wire::{CommitRequest, CommitResponse, ProposeRequest, ProposeResponse};
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

struct AppState {
    config: ClientConfig,
    http: reqwest::Client,
    results: Mutex<HashMap<u64, CommitRequest>>,
}

async fn commit(body: web::Json<CommitRequest>, app: web::Data<Arc<AppState>>) -> impl Responder {
    let req = body.into_inner();
    info!(
        request_id = req.request_id,
        result = %req.result,
        proposal_id = %req.proposal_id,
        "commit notification received"
    );
    app.results.lock().insert(req.request_id, req);
    HttpResponse::Ok().json(CommitResponse { ok: true })
}

async fn root() -> impl Responder {
    "CLIENT OK"
}

async fn send_transaction(app: &AppState, request_id: u64) {
    let proposer_url = {
        let mut rng = rand::thread_rng();
        app.config.proposer_urls[rng.gen_range(0..app.config.proposer_urls.len())].clone()
    };

    let transaction = paxos_core::Transaction {
        client_id: app.config.client_id.clone(),
        request_id,
        timestamp: Utc::now().timestamp_millis(),
        value: format!("WRITE_{}_{}", app.config.client_id, request_id),
    };

    let payload = ProposeRequest {
        transaction: Some(transaction),
    };

    match app.http.post(&proposer_url).json(&payload).send().await {
        Ok(resp) => {
            let status = resp.status();
            let body = resp.json::<ProposeResponse>().await.ok();
            info!(request_id, %proposer_url, %status, proposal_id = ?body.map(|b| b.proposal_id), "sent transaction");
        }
        Err(err) => {
            warn!(request_id, %proposer_url, error = %err, "error sending transaction");
        }
    }
}

async fn wait_for_commit(app: &AppState, request_id: u64, timeout: Duration) -> bool {
    let poll_interval = Duration::from_millis(200);
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        if let Some(result) = app.results.lock().get(&request_id) {
            return result.result == "COMMITTED";
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Sends a random number (10-50) of transactions, one at a time, to
/// random Proposers, waiting up to 15s per request and moving on to a
/// fresh request id whether or not it committed in time.
async fn run_workload(app: Arc<AppState>) {
    let max_requests: u32 = rand::thread_rng().gen_range(10..=50);
    info!(max_requests, "starting client workload");

    let mut next_request_id = 1u64;
    let mut completed = 0u32;

    while completed < max_requests {
        let request_id = next_request_id;
        next_request_id += 1;

        send_transaction(&app, request_id).await;
        let committed = wait_for_commit(&app, request_id, Duration::from_secs(15)).await;

        if committed {
            completed += 1;
            let sleep_secs: u64 = rand::thread_rng().gen_range(1..=5);
            info!(request_id, completed, max_requests, "request COMMITTED");
            tokio::time::sleep(Duration::from_secs(sleep_secs)).await;
        } else {
            warn!(request_id, "request not committed within timeout");
            let sleep_secs: f64 = rand::thread_rng().gen_range(1.0..=5.0);
            tokio::time::sleep(Duration::from_secs_f64(sleep_secs)).await;
        }
    }

    info!(max_requests, "client workload finished");
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = ClientConfig::from_env();
    paxos_core::logger::init("client", &config.client_id);

    info!(
        port = config.port,
        proposers = ?config.proposer_urls,
        "client starting"
    );

    let app_state = Arc::new(AppState {
        http: paxos_core::http::client_with_timeout(Duration::from_secs(5)),
        results: Mutex::new(HashMap::new()),
        config,
    });

    tokio::spawn(run_workload(app_state.clone()));

    let port = app_state.config.port;
    let data = web::Data::new(app_state);

    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .route("/commit", web::post().to(commit))
            .route("/", web::get().to(root))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
