use anyhow::Context;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use futures_util::future::join_all;
use seatlock_shared::SeatSnapshot;
use serde_json::{json, Value};
use tower::ServiceExt;
use tracing::{error, info};

pub const DEFAULT_CLIENTS: [&str; 5] = ["alice", "bob", "carol", "dave", "eve"];

#[derive(Debug)]
pub struct SimulationReport {
    pub seat_id: u32,
    pub winner: Option<String>,
    pub rejected: Vec<(String, StatusCode)>,
    pub confirm_status: Option<StatusCode>,
    pub final_seat: Option<SeatSnapshot>,
}

/// Fire concurrent lock requests for one seat through the router, then have
/// the winning client confirm. Mirrors what a burst of real clients sees.
pub async fn run_simulation(app: Router, seat_id: u32, clients: &[&str]) -> SimulationReport {
    info!(
        "--- Running concurrency simulation on seat {} with clients: {} ---",
        seat_id,
        clients.join(", ")
    );

    let attempts = clients.iter().map(|client| {
        let app = app.clone();
        async move {
            let outcome = post_action(app, seat_id, "lock", client).await;
            (client.to_string(), outcome)
        }
    });

    let mut winner = None;
    let mut rejected = Vec::new();
    for (client, outcome) in join_all(attempts).await {
        match outcome {
            Ok((status, body)) => {
                info!("[{}] status={} response={}", client, status, body);
                if status == StatusCode::OK && winner.is_none() {
                    winner = Some(client);
                } else {
                    rejected.push((client, status));
                }
            }
            Err(e) => error!("[{}] request failed: {:#}", client, e),
        }
    }

    let mut report = SimulationReport {
        seat_id,
        winner,
        rejected,
        confirm_status: None,
        final_seat: None,
    };

    let Some(holder) = report.winner.clone() else {
        info!("No client was able to lock seat {}; it may already be locked or booked", seat_id);
        return report;
    };
    info!("-> Client '{}' acquired the lock. Confirming the booking...", holder);

    match post_action(app.clone(), seat_id, "confirm", &holder).await {
        Ok((status, body)) => {
            info!("Confirm status={} body={}", status, body);
            report.confirm_status = Some(status);
        }
        Err(e) => error!("Confirm request failed: {:#}", e),
    }

    match call(app, Method::GET, format!("/seats/{}", seat_id), None).await {
        Ok((_, body)) => match serde_json::from_value::<SeatSnapshot>(body) {
            Ok(seat) => {
                info!("Final seat state: {:?}", seat);
                report.final_seat = Some(seat);
            }
            Err(e) => error!("Unexpected seat payload: {}", e),
        },
        Err(e) => error!("Seat lookup failed: {:#}", e),
    }

    info!("--- Simulation complete ---");
    report
}

async fn post_action(app: Router, seat_id: u32, action: &str, user_id: &str) -> anyhow::Result<(StatusCode, Value)> {
    let uri = format!("/seats/{}/{}", seat_id, action);
    call(app, Method::POST, uri, Some(json!({ "userId": user_id }))).await
}

async fn call(app: Router, method: Method, uri: String, body: Option<Value>) -> anyhow::Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(payload) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(payload.to_string())
        }
        None => Body::empty(),
    };
    let request = builder.body(body).context("building request")?;

    let response = app.oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .context("reading response body")?;
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    Ok((status, body))
}
