//! Perplexity Sonar provider implementation.

use std::time::Duration;

use async_trait::async_trait;
use prospektor_pipeline_models::LookupOutcome;
use serde::{Deserialize, Serialize};

use crate::parsing::parse_answer;
use crate::{LookupError, PhoneLookup};

/// Model used when `PPLX_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "sonar-pro";

const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Perplexity chat completions client.
pub struct SonarClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl SonarClient {
    /// Creates a new client with the default endpoint and timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: String, model: String) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        })
    }

    /// Creates a client from `PPLX_API_KEY` and `PPLX_MODEL`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Config`] if `PPLX_API_KEY` is not set.
    pub fn from_env() -> Result<Self, LookupError> {
        let api_key = std::env::var("PPLX_API_KEY").map_err(|_| LookupError::Config {
            message: "PPLX_API_KEY environment variable not set".to_string(),
        })?;
        let model = std::env::var("PPLX_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self::new(api_key, model)
    }

    /// Overrides the service endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

fn prompt(company: &str, person: &str) -> String {
    format!(
        "Hva er MOBILNUMMERET (8 sifre) til {person} som jobber i {company} i Norge?\n\
         Svar på to linjer:\n1) Kun åtte sifre\n2) Én URL-kilde\n"
    )
}

#[derive(Serialize)]
struct SonarRequest<'a> {
    model: &'a str,
    messages: Vec<SonarMessage<'a>>,
    temperature: f64,
}

#[derive(Serialize)]
struct SonarMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct SonarResponse {
    #[serde(default)]
    choices: Vec<SonarChoice>,
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Deserialize)]
struct SonarChoice {
    message: SonarResponseMessage,
}

#[derive(Deserialize)]
struct SonarResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct SonarError {
    error: SonarErrorDetail,
}

#[derive(Deserialize)]
struct SonarErrorDetail {
    message: String,
}

#[async_trait]
impl PhoneLookup for SonarClient {
    async fn lookup(&self, company: &str, person: &str) -> Result<LookupOutcome, LookupError> {
        let request = SonarRequest {
            model: &self.model,
            messages: vec![SonarMessage {
                role: "user",
                content: prompt(company, person),
            }],
            temperature: 0.4,
        };

        log::debug!("lookup request for {person} at {company}");

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let err: SonarError = serde_json::from_str(&body).unwrap_or_else(|_| SonarError {
                error: SonarErrorDetail {
                    message: format!("HTTP {status}: {body}"),
                },
            });
            return Err(LookupError::Service {
                message: err.error.message,
            });
        }

        let response: SonarResponse = serde_json::from_str(&body)?;
        let answer = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .unwrap_or_default();

        Ok(parse_answer(answer, &response.citations))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> SonarClient {
        SonarClient::new("test-key".to_string(), DEFAULT_MODEL.to_string())
            .unwrap()
            .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn successful_two_line_answer_is_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(
                json!({"model": "sonar-pro", "temperature": 0.4}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "91234567\nhttps://proff.no/person/ola"}}],
            })))
            .mount(&server)
            .await;

        let outcome = client_for(&server)
            .lookup("Fjellheim AS", "Ola Nordmann")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            LookupOutcome::Found {
                phone: "91234567".to_string(),
                source: "https://proff.no/person/ola".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn citations_fill_in_a_missing_source_line() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "Nummeret er 91 23 45 67"}}],
                "citations": ["https://proff.no/cite"],
            })))
            .mount(&server)
            .await;

        let outcome = client_for(&server)
            .lookup("Fjellheim AS", "Ola Nordmann")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            LookupOutcome::Found {
                phone: "91234567".to_string(),
                source: "https://proff.no/cite".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn answer_without_phone_is_absent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "Fant ikke noe mobilnummer."}}],
            })))
            .mount(&server)
            .await;

        let outcome = client_for(&server)
            .lookup("Fjellheim AS", "Ola Nordmann")
            .await
            .unwrap();
        assert_eq!(outcome, LookupOutcome::Absent);
    }

    #[tokio::test]
    async fn service_error_body_surfaces_its_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "rate limit exceeded"},
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .lookup("Fjellheim AS", "Ola Nordmann")
            .await
            .unwrap_err();
        match err {
            LookupError::Service { message } => assert_eq!(message, "rate limit exceeded"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn plain_text_error_body_is_tolerated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .lookup("Fjellheim AS", "Ola Nordmann")
            .await
            .unwrap_err();
        match err {
            LookupError::Service { message } => {
                assert!(message.contains("500"));
                assert!(message.contains("upstream exploded"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_are_treated_as_absent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let outcome = client_for(&server)
            .lookup("Fjellheim AS", "Ola Nordmann")
            .await
            .unwrap();
        assert_eq!(outcome, LookupOutcome::Absent);
    }
}
