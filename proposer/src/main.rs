mod paxos;

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use futures::future::join_all;
use paxos::{highest_adopted_value, highest_seen_n, BallotMinter};
use paxos_core::config::ProposerConfig;
use paxos_core::metrics::ProposerMetrics;
use paxos_core::wire::{
    AcceptRequest, AcceptedResponse, PrepareRequest, ProposeError, ProposeRequest, ProposeResponse,
    PromiseResponse,
};
use paxos_core::Transaction;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

struct AppState {
    config: ProposerConfig,
    metrics: ProposerMetrics,
    minter: BallotMinter,
    http: reqwest::Client,
}

async fn send_prepare_to_all(
    app: &AppState,
    proposal_id: &str,
    transaction: &Transaction,
) -> (Vec<PromiseResponse>, Vec<PromiseResponse>) {
    let calls = app.config.acceptor_urls.iter().map(|base| {
        let http = app.http.clone();
        let url = format!("{base}/prepare");
        let body = PrepareRequest {
            proposal_id: proposal_id.to_string(),
            transaction: Some(transaction.clone()),
        };
        async move {
            match http.post(&url).json(&body).send().await {
                Ok(resp) => {
                    let promoted = resp.status().is_success();
                    match resp.json::<PromiseResponse>().await {
                        Ok(body) => (promoted && body.kind == "promise", body),
                        Err(_) => (false, blank_promise()),
                    }
                }
                Err(_) => (false, blank_promise()),
            }
        }
    });

    let results = join_all(calls).await;
    let mut promises = Vec::new();
    let mut not_promises = Vec::new();
    for (is_promise, body) in results {
        if is_promise {
            promises.push(body);
        } else {
            not_promises.push(body);
        }
    }
    (promises, not_promises)
}

fn blank_promise() -> PromiseResponse {
    PromiseResponse {
        kind: "not_promise".to_string(),
        tid_in_use: None,
        accepted_id: None,
        accepted_value: None,
    }
}

async fn send_accept_to_all(
    app: &AppState,
    proposal_id: &str,
    transaction: &Transaction,
) -> (Vec<AcceptedResponse>, Vec<AcceptedResponse>) {
    let calls = app.config.acceptor_urls.iter().map(|base| {
        let http = app.http.clone();
        let url = format!("{base}/accept");
        let body = AcceptRequest {
            proposal_id: proposal_id.to_string(),
            transaction: transaction.clone(),
        };
        let fallback_tid = proposal_id.to_string();
        async move {
            match http.post(&url).json(&body).send().await {
                Ok(resp) => {
                    let ok = resp.status().is_success();
                    match resp.json::<AcceptedResponse>().await {
                        Ok(body) => (ok && body.response == "accepted", body),
                        Err(_) => (false, blank_accept(fallback_tid)),
                    }
                }
                Err(_) => (false, blank_accept(fallback_tid)),
            }
        }
    });

    let results = join_all(calls).await;
    let mut accepts = Vec::new();
    let mut not_accepts = Vec::new();
    for (is_accepted, body) in results {
        if is_accepted {
            accepts.push(body);
        } else {
            not_accepts.push(body);
        }
    }
    (accepts, not_accepts)
}

fn blank_accept(tid: String) -> AcceptedResponse {
    AcceptedResponse {
        response: "not_accepted".to_string(),
        tid,
        tid_in_use: None,
    }
}

/// The consensus loop: Phase 1 (Prepare), value adoption, Phase 2
/// (Accept), retrying under a bumped ballot with randomized backoff on
/// either phase's quorum failure. No exit condition other than success;
/// a partitioned Proposer loops forever.
async fn run_consensus(app: Arc<AppState>, mut proposal_id: String, transaction: Transaction) {
    let majority = app.config.majority();

    loop {
        app.metrics.prepares_sent_total.inc();
        let (promises, not_promises) = send_prepare_to_all(&app, &proposal_id, &transaction).await;

        if promises.len() < majority {
            app.metrics.promises_quorum_fail_total.inc();
            let highest = highest_seen_n(
                promises
                    .iter()
                    .chain(not_promises.iter())
                    .map(|r| r.tid_in_use.as_deref()),
            );
            proposal_id = app.minter.bump(highest).to_string();
            warn!(
                promises = promises.len(),
                majority, new_proposal_id = %proposal_id, "Phase 1 quorum failure, retrying"
            );
            backoff(&app.config).await;
            continue;
        }

        let mut value = transaction.clone();
        if let Some(adopted) = highest_adopted_value(&promises) {
            if let Some(prior) = &adopted.accepted_value {
                if *prior != value {
                    info!(
                        request_id = transaction.request_id,
                        adopted_from = ?adopted.accepted_id,
                        "adopting previously accepted value per Paxos safety"
                    );
                    value = prior.clone();
                }
            }
        }

        let (accepts, not_accepts) = send_accept_to_all(&app, &proposal_id, &value).await;

        if accepts.len() >= majority {
            app.metrics.commits_total.inc();
            info!(proposal_id = %proposal_id, "Phase 2 quorum reached, round complete");
            return;
        }

        app.metrics.accepts_quorum_fail_total.inc();
        let highest = highest_seen_n(
            accepts
                .iter()
                .chain(not_accepts.iter())
                .flat_map(|r| [r.tid_in_use.as_deref(), Some(r.tid.as_str())]),
        );
        proposal_id = app.minter.bump(highest).to_string();
        warn!(
            accepts = accepts.len(),
            majority, new_proposal_id = %proposal_id, "Phase 2 quorum failure, retrying"
        );
        backoff(&app.config).await;
    }
}

async fn backoff(config: &ProposerConfig) {
    let sleep_secs = {
        let mut rng = rand::thread_rng();
        rng.gen_range(config.backoff_min..=config.backoff_max)
    };
    tokio::time::sleep(Duration::from_secs_f64(sleep_secs)).await;
}

async fn propose(body: web::Json<ProposeRequest>, app: web::Data<Arc<AppState>>) -> impl Responder {
    let transaction = match body.into_inner().transaction {
        Some(t) => t,
        None => {
            return HttpResponse::BadRequest().json(ProposeError {
                error: "missing transaction".to_string(),
            });
        }
    };

    app.metrics.attempts_total.inc();

    let proposal_id = app.minter.next().to_string();
    info!(proposal_id = %proposal_id, request_id = transaction.request_id, "accepted /propose");

    let app_for_task = app.get_ref().clone();
    let spawned_id = proposal_id.clone();
    tokio::spawn(run_consensus(app_for_task, spawned_id, transaction));

    HttpResponse::Accepted().json(ProposeResponse {
        status: "PENDING".to_string(),
        proposal_id,
    })
}

async fn metrics(app: web::Data<Arc<AppState>>) -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(app.metrics.render())
}

async fn root() -> impl Responder {
    "PROPOSER OK"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = ProposerConfig::from_env();
    paxos_core::logger::init("proposer", &config.proposer_id);

    info!(
        port = config.port,
        acceptors = ?config.acceptor_urls,
        majority = config.majority(),
        backoff_min = config.backoff_min,
        backoff_max = config.backoff_max,
        "proposer starting"
    );

    let app_state = Arc::new(AppState {
        minter: BallotMinter::new(config.proposer_id.clone()),
        metrics: ProposerMetrics::new(),
        http: paxos_core::http::client_with_timeout(Duration::from_secs(3)),
        config,
    });

    let port = app_state.config.port;
    let data = web::Data::new(app_state);

    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .route("/propose", web::post().to(propose))
            .route("/metrics", web::get().to(metrics))
            .route("/", web::get().to(root))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
