use super::AppState;
use crate::{
    error::{MoodShotError, Result},
    models::ResponseEnvelope,
    pipeline,
};
use actix_web::{http::StatusCode, web, HttpResponse};
use futures::StreamExt;
use serde_json::json;
use uuid::Uuid;

/// POST /api/generate
pub async fn generate(state: web::Data<AppState>, payload: web::Payload) -> HttpResponse {
    let request_id = Uuid::new_v4().to_string();

    let body = match read_body(payload, state.config.max_body_bytes).await {
        Ok(body) => body,
        Err(err) => return envelope_response(pipeline::respond(Err(err), &request_id)),
    };
    log::info!(
        "[req:{}] POST /api/generate ({} bytes)",
        request_id,
        body.len()
    );

    let outcome = pipeline::process(&state.config, &state.http, &body, &request_id).await;
    envelope_response(pipeline::respond(outcome, &request_id))
}

/// Collects the request body, rejecting it as soon as it grows past `limit`.
async fn read_body(mut payload: web::Payload, limit: usize) -> Result<web::BytesMut> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| {
            MoodShotError::ValidationError(format!("failed to read request body: {}", e))
        })?;
        if body.len() + chunk.len() > limit {
            return Err(MoodShotError::ValidationError(format!(
                "request body exceeds the {} byte limit",
                limit
            )));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

fn envelope_response((status, envelope): (u16, ResponseEnvelope)) -> HttpResponse {
    HttpResponse::build(StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR))
        .json(envelope)
}

/// CORS preflight: 200 with no body.
pub async fn preflight() -> HttpResponse {
    HttpResponse::Ok().finish()
}

pub async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().json(ResponseEnvelope::method_not_allowed())
}

/// GET /api/health
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
