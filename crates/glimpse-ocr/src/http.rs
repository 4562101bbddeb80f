use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;

use crate::engine::{OcrEngine, OcrError};
use crate::snapshot::Snapshot;

/// Neural image-to-text model behind an HTTP inference endpoint.
///
/// The endpoint receives the encoded image as the request body and answers
/// in the Hugging Face inference shape, `[{"generated_text": "..."}]`.
pub struct HttpModelEngine {
    url: String,
    api_token: Option<String>,
    client: reqwest::Client,
    ready: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Batch(Vec<Generated>),
    Single(Generated),
}

#[derive(Deserialize)]
struct Generated {
    #[serde(alias = "text")]
    generated_text: String,
}

impl InferenceResponse {
    fn into_text(self) -> Result<String, OcrError> {
        match self {
            InferenceResponse::Single(g) => Ok(g.generated_text),
            InferenceResponse::Batch(batch) => batch
                .into_iter()
                .next()
                .map(|g| g.generated_text)
                .ok_or_else(|| OcrError::InvalidResponse("empty result list".to_string())),
        }
    }
}

impl HttpModelEngine {
    pub fn new(url: String, api_token: Option<String>) -> Self {
        Self {
            url,
            api_token,
            client: reqwest::Client::new(),
            ready: false,
        }
    }

    async fn infer(&self, snapshot: &Snapshot) -> Result<String, OcrError> {
        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, snapshot.mime_type())
            .body(snapshot.bytes().to_vec());

        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(OcrError::Backend(format!("{status}: {}", body.trim())));
        }

        parse_response(&body)
    }
}

#[async_trait::async_trait]
impl OcrEngine for HttpModelEngine {
    fn name(&self) -> &str {
        "http-model"
    }

    async fn initialize(&mut self) -> Result<(), OcrError> {
        // A blank frame forces the server to load the model
        let probe = Snapshot::from_rgba(1, 1, vec![255, 255, 255, 255])
            .map_err(|e| OcrError::Backend(e.to_string()))?;
        self.infer(&probe).await?;

        self.ready = true;
        tracing::info!("image-to-text model ready at {}", self.url);
        Ok(())
    }

    async fn recognize(&self, snapshot: &Snapshot) -> Result<String, OcrError> {
        if !self.ready {
            return Err(OcrError::NotInitialized);
        }
        self.infer(snapshot).await
    }
}

fn parse_response(body: &str) -> Result<String, OcrError> {
    let response: InferenceResponse = serde_json::from_str(body)
        .map_err(|e| OcrError::InvalidResponse(format!("{e}: {body}")))?;
    response.into_text()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_response_uses_first_entry() {
        let text = parse_response(r#"[{"generated_text": "STOP"}, {"generated_text": "SHOP"}]"#);
        assert_eq!(text.unwrap(), "STOP");
    }

    #[test]
    fn single_object_and_text_alias() {
        assert_eq!(parse_response(r#"{"generated_text": "EXIT"}"#).unwrap(), "EXIT");
        assert_eq!(parse_response(r#"{"text": "EXIT"}"#).unwrap(), "EXIT");
    }

    #[test]
    fn empty_batch_is_invalid() {
        assert!(matches!(
            parse_response("[]"),
            Err(OcrError::InvalidResponse(_))
        ));
    }

    #[test]
    fn loading_error_is_invalid() {
        let body = r#"{"error": "Model is currently loading", "estimated_time": 20.0}"#;
        assert!(matches!(
            parse_response(body),
            Err(OcrError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_initialization() {
        let mut engine = HttpModelEngine::new("http://127.0.0.1:9/infer".to_string(), None);
        assert!(engine.initialize().await.is_err());
        let probe = Snapshot::from_rgba(1, 1, vec![0, 0, 0, 255]).unwrap();
        assert!(matches!(
            engine.recognize(&probe).await,
            Err(OcrError::NotInitialized)
        ));
    }
}
