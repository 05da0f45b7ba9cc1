use super::normalize;
use crate::{
    error::{MoodShotError, Result},
    models::{GenerationJob, ModelPreset},
};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::{json, Map, Value};
use std::time::{Duration, Instant};

/// One call to the generation provider. Implementations never fail: any
/// transport or provider error becomes `None`.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, job: &GenerationJob, seed: u32) -> Option<String>;
}

#[derive(Clone)]
pub struct GenerationClient {
    client: Client,
    api_base: String,
    api_token: String,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl GenerationClient {
    pub fn new(client: Client, api_base: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            api_token: api_token.into(),
            poll_interval: Duration::from_secs(1),
            poll_timeout: Duration::from_secs(120),
        }
    }

    pub fn with_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_timeout = timeout;
        self
    }

    fn predictions_endpoint(&self) -> String {
        format!("{}/predictions", self.api_base)
    }

    pub fn build_input(job: &GenerationJob, seed: u32) -> Value {
        let preset: &ModelPreset = job.preset;
        let mut input = Map::new();
        input.insert("prompt".into(), json!(job.prompt));
        if preset.supports_negative_prompt {
            input.insert("negative_prompt".into(), json!(job.negative_prompt));
        }
        input.insert(
            preset.reference_key.into(),
            json!(job.references.composition),
        );
        if let Some(strength) = preset.prompt_strength {
            input.insert("prompt_strength".into(), json!(strength));
        }
        input.insert(
            "num_inference_steps".into(),
            json!(preset.num_inference_steps),
        );
        if let Some(guidance) = preset.guidance_scale {
            input.insert("guidance_scale".into(), json!(guidance));
        }
        if let Some(quality) = preset.output_quality {
            input.insert("output_quality".into(), json!(quality));
        }
        if let Some(aspect_ratio) = preset.aspect_ratio {
            input.insert("aspect_ratio".into(), json!(aspect_ratio));
        }
        input.insert("output_format".into(), json!(preset.output_format));
        input.insert("seed".into(), json!(seed));
        Value::Object(input)
    }

    pub async fn try_generate(&self, job: &GenerationJob, seed: u32) -> Result<Option<String>> {
        let output = self
            .run(job.preset.model, Self::build_input(job, seed))
            .await?;
        Ok(normalize::first_url(&output))
    }

    async fn poll_prediction(&self, poll_url: &str) -> Result<Value> {
        let started = Instant::now();
        loop {
            tokio::time::sleep(self.poll_interval).await;
            let response = self
                .client
                .get(poll_url)
                .bearer_auth(&self.api_token)
                .send()
                .await
                .map_err(|e| {
                    MoodShotError::RequestError(format!("Replicate poll request failed: {}", e))
                })?;
            let prediction = response_json_or_error("Replicate poll", response).await?;
            match prediction_status(&prediction).as_str() {
                "succeeded" => return Ok(prediction),
                "failed" | "canceled" => {
                    return Err(MoodShotError::GenerationError(format!(
                        "Replicate prediction {}: {}",
                        prediction_status(&prediction),
                        prediction_error(&prediction)
                    )))
                }
                _ => {}
            }
            if started.elapsed() >= self.poll_timeout {
                return Err(MoodShotError::GenerationError(format!(
                    "Replicate polling timed out after {:.1}s",
                    self.poll_timeout.as_secs_f64()
                )));
            }
        }
    }

    /// Creates a prediction for `model` and returns its raw `output`, polling
    /// while the provider reports it as still running.
    pub async fn run(&self, model: &str, input: Value) -> Result<Value> {
        let payload = json!({ "model": model, "input": input });

        log::debug!("Creating prediction with model: {}", model);

        let response = self
            .client
            .post(self.predictions_endpoint())
            .bearer_auth(&self.api_token)
            .header("Prefer", "wait")
            .json(&payload)
            .send()
            .await
            .map_err(|e| MoodShotError::RequestError(format!("Replicate request failed: {}", e)))?;
        let mut prediction = response_json_or_error("Replicate", response).await?;

        match prediction_status(&prediction).as_str() {
            "succeeded" => {}
            "starting" | "processing" => {
                let poll_url = prediction
                    .get("urls")
                    .and_then(|urls| urls.get("get"))
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|url| !url.is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| {
                        MoodShotError::ResponseError("Replicate prediction missing poll URL".into())
                    })?;
                prediction = self.poll_prediction(&poll_url).await?;
            }
            // Synchronous deployments answer with a bare output and no status.
            "" if prediction.get("output").is_some() => {}
            status => {
                return Err(MoodShotError::GenerationError(format!(
                    "Replicate prediction {}: {}",
                    status,
                    prediction_error(&prediction)
                )))
            }
        }

        Ok(prediction.get("output").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl ImageGenerator for GenerationClient {
    async fn generate(&self, job: &GenerationJob, seed: u32) -> Option<String> {
        match self.try_generate(job, seed).await {
            Ok(Some(url)) => Some(url),
            Ok(None) => {
                log::warn!("Generation with seed {} returned no image URL", seed);
                None
            }
            Err(e) => {
                log::warn!("Generation with seed {} failed: {}", seed, e);
                None
            }
        }
    }
}

fn prediction_status(prediction: &Value) -> String {
    prediction
        .get("status")
        .and_then(Value::as_str)
        .map(|status| status.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

fn prediction_error(prediction: &Value) -> String {
    prediction
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("no error message")
        .to_string()
}

async fn response_json_or_error(provider: &str, response: Response) -> Result<Value> {
    let status = response.status();
    let body = response.text().await.map_err(|e| {
        MoodShotError::ResponseError(format!("{} response body read failed: {}", provider, e))
    })?;
    if !status.is_success() {
        let snippet: String = body.chars().take(512).collect();
        return Err(MoodShotError::GenerationError(format!(
            "{} request failed ({}): {}",
            provider,
            status.as_u16(),
            snippet
        )));
    }
    serde_json::from_str(&body).map_err(|e| {
        MoodShotError::ResponseError(format!("{} returned invalid JSON payload: {}", provider, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReferenceUrls;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn job() -> GenerationJob {
        GenerationJob {
            prompt: "a jar on linen".into(),
            negative_prompt: "blurry".into(),
            references: ReferenceUrls {
                background: "https://i.ibb.co/bg.png".into(),
                product: "https://i.ibb.co/product.png".into(),
                composition: "https://i.ibb.co/composition.png".into(),
            },
            preset: ModelPreset::default_preset(),
        }
    }

    fn client(server: &MockServer) -> GenerationClient {
        GenerationClient::new(Client::new(), server.uri(), "test-token")
            .with_polling(Duration::from_millis(10), Duration::from_secs(2))
    }

    #[test]
    fn test_build_input() {
        let input = GenerationClient::build_input(&job(), 1234);
        assert_eq!(input["prompt"], "a jar on linen");
        assert_eq!(input["negative_prompt"], "blurry");
        assert_eq!(input["image"], "https://i.ibb.co/composition.png");
        assert_eq!(input["seed"], 1234);
        assert_eq!(input["num_inference_steps"], 28);
        assert_eq!(input["aspect_ratio"], "1:1");
    }

    #[tokio::test]
    async fn test_generate_extracts_each_output_shape() {
        let shapes = [
            json!("http://x/a.png"),
            json!(["http://x/a.png"]),
            json!({"url": "http://x/a.png"}),
            json!({"output": ["http://x/a.png"]}),
        ];
        for output in shapes {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/predictions"))
                .and(header("authorization", "Bearer test-token"))
                .and(header("prefer", "wait"))
                .and(body_partial_json(json!({
                    "model": "black-forest-labs/flux-dev",
                    "input": { "seed": 7 }
                })))
                .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                    "id": "p1",
                    "status": "succeeded",
                    "output": output
                })))
                .expect(1)
                .mount(&server)
                .await;

            let url = client(&server).generate(&job(), 7).await;
            assert_eq!(url.as_deref(), Some("http://x/a.png"));
        }
    }

    #[tokio::test]
    async fn test_generate_polls_until_succeeded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predictions"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "p1",
                "status": "processing",
                "urls": { "get": format!("{}/predictions/p1", server.uri()) }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/predictions/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "p1",
                "status": "succeeded",
                "output": ["http://x/polled.png"]
            })))
            .mount(&server)
            .await;

        let url = client(&server).generate(&job(), 1).await;
        assert_eq!(url.as_deref(), Some("http://x/polled.png"));
    }

    #[tokio::test]
    async fn test_provider_errors_become_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predictions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = client(&server);
        assert!(client.try_generate(&job(), 1).await.is_err());
        assert_eq!(client.generate(&job(), 1).await, None);
    }

    #[tokio::test]
    async fn test_failed_prediction_becomes_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predictions"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "status": "failed",
                "error": "NSFW content detected"
            })))
            .mount(&server)
            .await;

        assert_eq!(client(&server).generate(&job(), 1).await, None);
    }

    #[tokio::test]
    async fn test_unrecognized_output_becomes_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predictions"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "status": "succeeded",
                "output": { "href": "http://x/a.png" }
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        assert_eq!(client.try_generate(&job(), 1).await.unwrap(), None);
        assert_eq!(client.generate(&job(), 1).await, None);
    }
}
