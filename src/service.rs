use crate::matches::CheckResult;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

/// What is submitted for one check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckRequest {
    pub text: String,
    /// Language chosen on the page; `None` lets the server detect it.
    pub language: Option<String>,
    pub mother_tongue: Option<String>,
    pub preferred_variants: Vec<String>,
    pub meta_data: Value,
}

impl CheckRequest {
    /// Form fields for `POST /check`.
    pub fn form_fields(&self, user_agent: &str) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        match self.meta_data.as_object().filter(|m| !m.is_empty()) {
            Some(meta) => fields.push((
                "data",
                json!({"annotation": [{"text": self.text}], "meta": meta}).to_string(),
            )),
            None => fields.push(("text", self.text.clone())),
        }
        match &self.language {
            Some(language) => fields.push(("language", language.clone())),
            None => {
                fields.push(("language", "auto".to_string()));
                if !self.preferred_variants.is_empty() {
                    fields.push(("preferredVariants", self.preferred_variants.join(",")));
                }
            }
        }
        if let Some(mother_tongue) = &self.mother_tongue {
            fields.push(("motherTongue", mother_tongue.clone()));
        }
        fields.push(("useragent", user_agent.to_string()));
        fields
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Could not reach server: {0}")]
    Transport(String),
    #[error("Invalid server URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Unreadable check result: {0}")]
    InvalidBody(#[from] serde_json::Error),
}

impl ServiceError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Error text as shown to the user.
    pub fn message(&self) -> String {
        match self {
            Self::Http { message, .. } if !message.trim().is_empty() => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// The remote grammar/style checker.
#[allow(async_fn_in_trait)]
pub trait CheckService {
    async fn check(
        &self,
        server_url: &str,
        request: &CheckRequest,
    ) -> Result<CheckResult, ServiceError>;
}

pub struct LanguageToolClient {
    client: Client,
    user_agent: String,
}

impl LanguageToolClient {
    pub fn new(timeout_seconds: u64, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
        })
    }

    pub fn check_url(server_url: &str) -> Result<Url, ServiceError> {
        let url = format!("{}/check", server_url.trim_end_matches('/'));
        Url::parse(&url).map_err(|source| ServiceError::InvalidUrl { url, source })
    }
}

impl Default for LanguageToolClient {
    fn default() -> Self {
        Self::new(30, concat!("textcheck/", env!("CARGO_PKG_VERSION"))).unwrap_or_else(|_| Self {
            client: Client::new(),
            user_agent: concat!("textcheck/", env!("CARGO_PKG_VERSION")).to_string(),
        })
    }
}

impl CheckService for LanguageToolClient {
    async fn check(
        &self,
        server_url: &str,
        request: &CheckRequest,
    ) -> Result<CheckResult, ServiceError> {
        let url = Self::check_url(server_url)?;
        log::debug!("Submitting {} chars to {url}", request.text.chars().count());

        let response = self
            .client
            .post(url)
            .form(&request.form_fields(&self.user_agent))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            log::warn!("Check failed with HTTP {}", status.as_u16());
            return Err(ServiceError::Http {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(CheckResult::parse(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and hand back the raw request.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });
        (format!("http://{addr}/v2"), handle)
    }

    fn request() -> CheckRequest {
        CheckRequest {
            text: "This are a test.".to_string(),
            mother_tongue: Some("de".to_string()),
            preferred_variants: vec!["en-US".to_string(), "de-DE".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_form_fields_auto_language() {
        let fields = request().form_fields("ua");
        assert!(fields.contains(&("text", "This are a test.".to_string())));
        assert!(fields.contains(&("language", "auto".to_string())));
        assert!(fields.contains(&("preferredVariants", "en-US,de-DE".to_string())));
        assert!(fields.contains(&("motherTongue", "de".to_string())));
    }

    #[test]
    fn test_form_fields_manual_language_and_meta() {
        let req = CheckRequest {
            language: Some("en-GB".to_string()),
            meta_data: json!({"EmailToAddress": "a@b.c"}),
            ..request()
        };
        let fields = req.form_fields("ua");
        assert!(fields.contains(&("language", "en-GB".to_string())));
        assert!(!fields.iter().any(|(k, _)| *k == "preferredVariants"));
        assert!(!fields.iter().any(|(k, _)| *k == "text"));
        let data = fields.iter().find(|(k, _)| *k == "data").unwrap();
        let data: Value = serde_json::from_str(&data.1).unwrap();
        assert_eq!(data["meta"]["EmailToAddress"], "a@b.c");
        assert_eq!(data["annotation"][0]["text"], "This are a test.");
    }

    #[test]
    fn test_check_url() {
        assert_eq!(
            LanguageToolClient::check_url("https://api.languagetool.org/v2/")
                .unwrap()
                .as_str(),
            "https://api.languagetool.org/v2/check"
        );
        assert!(matches!(
            LanguageToolClient::check_url("not a url"),
            Err(ServiceError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_successful_check() {
        let (server, handle) = serve_once(
            "200 OK",
            r#"{"language":{"name":"English (US)","code":"en-US"},"matches":[{"offset":5,"length":3}]}"#,
        )
        .await;
        let client = LanguageToolClient::new(5, "textcheck-test").unwrap();

        let result = client.check(&server, &request()).await.unwrap();
        assert_eq!(result.language.code, "en-US");
        assert_eq!(result.matches.len(), 1);

        let raw_request = handle.await.unwrap();
        assert!(raw_request.starts_with("POST /v2/check"));
        assert!(raw_request.contains("language=auto"));
        assert!(raw_request.contains("useragent=textcheck-test"));
    }

    #[tokio::test]
    async fn test_http_error_keeps_status_and_body() {
        let (server, handle) = serve_once("401 Unauthorized", "login required").await;
        let client = LanguageToolClient::new(5, "textcheck-test").unwrap();

        let err = client.check(&server, &request()).await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.message(), "login required");
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_garbage_body_is_invalid() {
        let (server, handle) = serve_once("200 OK", "<html>oops</html>").await;
        let client = LanguageToolClient::new(5, "textcheck-test").unwrap();

        let err = client.check(&server, &request()).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidBody(_)));
        assert_eq!(err.status(), None);
        handle.await.unwrap();
    }
}
