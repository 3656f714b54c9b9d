use std::sync::Arc;

use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde::Serialize;

use valkeeper_cluster::handler::UpdateHandler;

#[derive(Serialize)]
pub struct ReadyResponse {
    pub configured: bool,
}

/// Liveness: the process is up and serving.
#[get("/healthz")]
pub fn healthz() -> Status {
    Status::Ok
}

/// Readiness: whether the last configuration attempt succeeded. Kept
/// separate from liveness so the orchestrator can tell "process up" from
/// "ready to serve".
#[get("/readyz")]
pub fn readyz(handler: &State<Arc<UpdateHandler>>) -> (Status, Json<ReadyResponse>) {
    let configured = handler.cluster_configured();

    let status = if configured {
        Status::Ok
    } else {
        Status::InternalServerError
    };

    (status, Json(ReadyResponse { configured }))
}
