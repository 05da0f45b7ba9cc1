//! Request-scoped flow: credentials, validation, ingestion, prompt, batch, envelope.

use crate::{
    clients::MoodShotClient,
    config::Config,
    error::{MoodShotError, Result},
    ingest::ingest,
    logger,
    models::{
        GenerateBody, GenerationJob, GenerationRequest, GenerationResult, ModelPreset,
        ResponseEnvelope,
    },
    orchestrator::generate_batch,
    prompt::build_prompt,
};
use reqwest::Client;

/// Runs one validated request against already-built collaborators.
pub async fn run(
    client: &MoodShotClient,
    preset: &'static ModelPreset,
    request: &GenerationRequest,
    request_id: &str,
) -> Result<GenerationResult> {
    log::info!(
        "[req:{}] Generating {} image(s) with {} (size hint: {})",
        request_id,
        request.count,
        preset.label,
        request.image_size
    );

    let upload_timer = logger::timer(format!("[req:{}] Reference upload", request_id));
    let references = settle(upload_timer, ingest(client.upload(), &request.references).await)?;

    let built = build_prompt(
        &request.instruction,
        request.mood_intensity,
        request.product_preservation,
    );
    log::debug!("[req:{}] Prompt:\n{}", request_id, built.prompt);

    let job = GenerationJob {
        prompt: built.prompt,
        negative_prompt: built.negative_prompt,
        references,
        preset,
    };

    let batch_timer = logger::timer(format!("[req:{}] Batch generation", request_id));
    let result = settle(
        batch_timer,
        generate_batch(client.generation(), &job, request.count).await,
    )?;
    log::info!(
        "[req:{}] {}/{} images generated in {} round(s), estimated cost ${:.2}",
        request_id,
        result.count(),
        result.requested,
        result.rounds,
        preset.estimated_cost(result.count())
    );
    Ok(result)
}

/// Stops `timer` as completed or failed depending on `outcome`.
fn settle<T>(mut timer: logger::Timer, outcome: Result<T>) -> Result<T> {
    match &outcome {
        Ok(_) => timer.stop(),
        Err(_) => timer.fail(),
    };
    outcome
}

/// Full handling of a raw `POST /api/generate` body. Configuration is
/// checked first, then the body; no external call happens if either fails.
pub async fn process(
    config: &Config,
    http: &Client,
    raw_body: &[u8],
    request_id: &str,
) -> Result<(GenerationResult, &'static ModelPreset)> {
    let client = MoodShotClient::from_config(config, http.clone())?;
    let preset = config.preset()?;
    let body: GenerateBody = serde_json::from_slice(raw_body)
        .map_err(|e| MoodShotError::ValidationError(format!("invalid JSON body: {}", e)))?;
    let request = body.into_request()?;

    let result = run(&client, preset, &request, request_id).await?;
    Ok((result, preset))
}

/// Maps the outcome of [`process`] to an HTTP status and envelope.
pub fn respond(
    outcome: Result<(GenerationResult, &'static ModelPreset)>,
    request_id: &str,
) -> (u16, ResponseEnvelope) {
    match outcome {
        Ok((result, preset)) => (200, ResponseEnvelope::success(result, preset.label)),
        Err(err) => {
            if err.is_client_error() {
                log::warn!("[req:{}] Rejected request: {}", request_id, err);
            } else {
                log::error!("[req:{}] Request failed: {}", request_id, err);
            }
            (err.status_code(), ResponseEnvelope::failure(&err))
        }
    }
}
