mod tally;

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use paxos_core::config::LearnerConfig;
use paxos_core::metrics::LearnerMetrics;
use paxos_core::wire::{CommitRequest, LearnRequest, LearnResponse};
use paxos_core::Transaction;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tally::{LearnerState, TallyDecision};
use tracing::{error, info};

struct AppState {
    tallies: Mutex<LearnerState>,
    metrics: LearnerMetrics,
    http: reqwest::Client,
}

/// Synthesizes a commit URL by convention from `client_id` and POSTs
/// the outcome, bounded by a short timeout. Failures are logged and not
/// retried.
async fn notify_client(app: &AppState, transaction: &Transaction, committed: bool, proposal_id: &str) {
    let url = format!("http://{}:5000/commit", transaction.client_id);
    let payload = CommitRequest {
        request_id: transaction.request_id,
        result: if committed { "COMMITTED" } else { "REJECTED" }.to_string(),
        proposal_id: proposal_id.to_string(),
    };

    app.metrics.client_notification_sent_total.inc();

    match app.http.post(&url).json(&payload).send().await {
        Ok(resp) if resp.status().is_success() => {
            info!(
                client_id = %transaction.client_id,
                request_id = transaction.request_id,
                result = %payload.result,
                "notified client"
            );
        }
        Ok(resp) => {
            error!(
                client_id = %transaction.client_id,
                status = %resp.status(),
                "client notification rejected"
            );
        }
        Err(err) => {
            error!(client_id = %transaction.client_id, error = %err, "failed notifying client");
        }
    }
}

async fn learn(body: web::Json<LearnRequest>, app: web::Data<Arc<AppState>>) -> impl Responder {
    let req = body.into_inner();
    info!(
        acceptor_id = %req.acceptor_id,
        proposal_id = %req.proposal_id,
        accepted = req.accepted,
        "received vote"
    );

    let (decision, transaction) = app.tallies.lock().record_vote(
        &req.acceptor_id,
        &req.proposal_id,
        req.accepted,
        req.transaction,
    );

    let status = match decision {
        TallyDecision::Committed => {
            app.metrics.commit_total.inc();
            notify_client(&app, &transaction, true, &req.proposal_id).await;
            "committed"
        }
        TallyDecision::Rejected => {
            notify_client(&app, &transaction, false, &req.proposal_id).await;
            "rejected"
        }
        TallyDecision::Pending => "pending",
    };

    HttpResponse::Ok().json(LearnResponse {
        status: status.to_string(),
    })
}

async fn metrics(app: web::Data<Arc<AppState>>) -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(app.metrics.render())
}

async fn root() -> impl Responder {
    "LEARNER OK"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = LearnerConfig::from_env();
    paxos_core::logger::init("learner", &config.learner_id);

    let quorum = config.quorum();
    info!(port = config.port, quorum, "learner starting");

    let app_state = Arc::new(AppState {
        tallies: Mutex::new(LearnerState::new(quorum)),
        http: paxos_core::http::client_with_timeout(Duration::from_secs(2)),
        metrics: LearnerMetrics::new(),
    });

    let port = config.port;
    let data = web::Data::new(app_state);

    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .route("/learn", web::post().to(learn))
            .route("/metrics", web::get().to(metrics))
            .route("/", web::get().to(root))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
