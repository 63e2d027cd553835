mod state;

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use futures::future::join_all;
use paxos_core::config::AcceptorConfig;
use paxos_core::metrics::AcceptorMetrics;
use paxos_core::wire::{AcceptRequest, AcceptedResponse, LearnRequest, PrepareRequest, PromiseResponse};
use paxos_core::Transaction;
use parking_lot::Mutex;
use state::AcceptorState;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

struct AppState {
    state: Mutex<AcceptorState>,
    config: AcceptorConfig,
    metrics: AcceptorMetrics,
    http: reqwest::Client,
}

/// Fan-out of the Acceptor's vote to every known Learner, bounded by a
/// short per-call timeout; failures are silently swallowed. Calls run
/// concurrently, so the fan-out is bounded by the slowest Learner.
async fn notify_learners(app: &AppState, proposal_id: &str, transaction: &Transaction, accepted: bool) {
    let payload = LearnRequest {
        acceptor_id: app.config.acceptor_id.clone(),
        proposal_id: proposal_id.to_string(),
        accepted,
        transaction: transaction.clone(),
    };

    let calls = app.config.learner_urls.iter().map(|url| {
        let http = app.http.clone();
        let payload = payload.clone();
        let url = url.clone();
        async move {
            if let Err(err) = http.post(&url).json(&payload).send().await {
                debug!(url = %url, error = %err, "learner notification failed, ignoring");
            }
        }
    });

    join_all(calls).await;
}

async fn prepare(
    body: web::Json<PrepareRequest>,
    app: web::Data<Arc<AppState>>,
) -> impl Responder {
    let req = body.into_inner();
    info!(proposal_id = %req.proposal_id, "received PREPARE");

    let proposal_id = paxos_core::ballot::parse_lenient(&req.proposal_id);
    let outcome = app.state.lock().prepare(&proposal_id);

    let body = PromiseResponse {
        kind: if outcome.promised { "promise" } else { "not_promise" }.to_string(),
        tid_in_use: outcome.tid_in_use,
        accepted_id: outcome.accepted_id,
        accepted_value: outcome.accepted_value,
    };

    if outcome.promised {
        app.metrics.promises_sent_total.inc();
        HttpResponse::Ok().json(body)
    } else {
        app.metrics.rejections_sent_total.inc();
        HttpResponse::Conflict().json(body)
    }
}

async fn accept(
    body: web::Json<AcceptRequest>,
    app: web::Data<Arc<AppState>>,
) -> impl Responder {
    let req = body.into_inner();
    info!(proposal_id = %req.proposal_id, "received ACCEPT");

    let proposal_id = paxos_core::ballot::parse_lenient(&req.proposal_id);
    let outcome = app.state.lock().accept(&proposal_id, req.transaction.clone());

    if outcome.accepted {
        app.metrics.accepts_received_total.inc();
        notify_learners(&app, &req.proposal_id, &req.transaction, true).await;
        app.metrics.learner_notifications_total.inc();

        HttpResponse::Ok().json(AcceptedResponse {
            response: "accepted".to_string(),
            tid: req.proposal_id,
            tid_in_use: None,
        })
    } else {
        warn!(proposal_id = %req.proposal_id, tid_in_use = ?outcome.tid_in_use, "rejecting stale ACCEPT");
        app.metrics.rejections_sent_total.inc();
        notify_learners(&app, &req.proposal_id, &req.transaction, false).await;

        HttpResponse::Conflict().json(AcceptedResponse {
            response: "not_accepted".to_string(),
            tid: req.proposal_id,
            tid_in_use: outcome.tid_in_use,
        })
    }
}

async fn metrics(app: web::Data<Arc<AppState>>) -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(app.metrics.render())
}

async fn root() -> impl Responder {
    "ACCEPTOR OK"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = AcceptorConfig::from_env();
    paxos_core::logger::init("acceptor", &config.acceptor_id);

    info!(
        port = config.port,
        learners = ?config.learner_urls,
        "acceptor starting"
    );

    let app_state = Arc::new(AppState {
        state: Mutex::new(AcceptorState::new()),
        http: paxos_core::http::client_with_timeout(Duration::from_millis(500)),
        metrics: AcceptorMetrics::new(),
        config,
    });

    let port = app_state.config.port;
    let data = web::Data::new(app_state);

    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .route("/prepare", web::post().to(prepare))
            .route("/accept", web::post().to(accept))
            .route("/metrics", web::get().to(metrics))
            .route("/", web::get().to(root))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
