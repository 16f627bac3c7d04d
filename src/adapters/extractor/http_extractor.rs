use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::types::ExtractorConfig;
use crate::domain::search_filter::PartialSearchFilter;
use crate::ports::field_extractor::FieldExtractor;

#[derive(Serialize)]
struct ExtractRequest<'a> {
    query: &'a str,
}

/// Posts the query to an extraction service and decodes whatever JSON object
/// it answers with. Any failure yields an empty filter.
pub struct HttpFieldExtractor {
    http: Client,
    endpoint: String,
}

impl HttpFieldExtractor {
    pub fn new(endpoint: String, timeout: Duration) -> std::result::Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, endpoint })
    }

    /// `None` when no endpoint is configured.
    pub fn from_config(
        config: &ExtractorConfig,
    ) -> std::result::Result<Option<Self>, reqwest::Error> {
        config
            .endpoint
            .clone()
            .map(|endpoint| Self::new(endpoint, Duration::from_secs(config.timeout_secs)))
            .transpose()
    }
}

#[async_trait]
impl FieldExtractor for HttpFieldExtractor {
    async fn extract(&self, query: &str) -> PartialSearchFilter {
        let response = match self
            .http
            .post(&self.endpoint)
            .json(&ExtractRequest { query })
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, endpoint = %self.endpoint, "Field extractor unreachable");
                return PartialSearchFilter::default();
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(%status, endpoint = %self.endpoint, "Field extractor returned an error status");
            return PartialSearchFilter::default();
        }

        match response.text().await {
            Ok(body) => {
                let partial = PartialSearchFilter::from_model_output(&body);
                debug!(?partial, "Field extractor proposal");
                partial
            }
            Err(e) => {
                warn!(error = %e, "Failed to read field extractor reply");
                PartialSearchFilter::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::property_type::TypeMention;
    use crate::domain::search_filter::Intent;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn extractor(server: &MockServer) -> HttpFieldExtractor {
        HttpFieldExtractor::new(format!("{}/extract", server.uri()), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn decodes_service_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/extract"))
            .and(body_json(serde_json::json!({"query": "cheap penthouse to buy"})))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "```json\n{\"intent\": \"sale\", \"property_types\": [\"penthouse\"]}\n```",
            ))
            .mount(&server)
            .await;

        let partial = extractor(&server).extract("cheap penthouse to buy").await;
        assert_eq!(partial.intent, Some(Intent::Sale));
        assert_eq!(partial.mentions, vec![TypeMention::Penthouse]);
    }

    #[tokio::test]
    async fn error_status_yields_empty_filter() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        assert!(extractor(&server).extract("villa").await.is_empty());
    }

    #[tokio::test]
    async fn unreachable_service_yields_empty_filter() {
        let e = HttpFieldExtractor::new("http://127.0.0.1:9/extract".into(), Duration::from_secs(1)).unwrap();
        assert!(e.extract("villa").await.is_empty());
    }

    #[test]
    fn no_endpoint_means_no_extractor() {
        let config = ExtractorConfig::default();
        assert!(HttpFieldExtractor::from_config(&config).unwrap().is_none());
    }
}
