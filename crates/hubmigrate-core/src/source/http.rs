//! HTTP client for the legacy endpoints.

use super::{parse_records, LegacySource};
use crate::config::{HttpMethod, LegacyEndpoints, MigrationConfig};
use crate::entities::Entity;
use crate::error::{MigrationError, Result};
use crate::record::LegacyRecord;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// Reads legacy records over HTTP.
///
/// No timeout is set unless configured; a hung endpoint stalls the run.
pub struct HttpLegacySource {
    client: Client,
    endpoints: LegacyEndpoints,
}

impl HttpLegacySource {
    pub fn new(config: &MigrationConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(MigrationConfig::USER_AGENT);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| MigrationError::Network {
            message: format!("Failed to create HTTP client: {}", e),
            source: Some(e),
        })?;

        Ok(Self {
            client,
            endpoints: config.endpoints.clone(),
        })
    }
}

#[async_trait]
impl LegacySource for HttpLegacySource {
    async fn fetch(&self, entity: Entity, email: Option<&str>) -> Result<Vec<LegacyRecord>> {
        let endpoint = self.endpoints.get(entity);
        let url = endpoint.url.as_str();
        let fetch_error = |status: Option<u16>, message: String| MigrationError::Fetch {
            entity,
            url: url.to_string(),
            status,
            message,
        };

        let mut request = match endpoint.method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
        };
        if let Some(email) = email {
            request = request.header(MigrationConfig::EMAIL_HEADER, email);
        }

        debug!("{:?} {} (scope: {:?})", endpoint.method, url, email);

        let response = request
            .send()
            .await
            .map_err(|e| fetch_error(None, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(
                Some(status.as_u16()),
                format!("HTTP {}", status.as_u16()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| fetch_error(Some(status.as_u16()), format!("failed to read body: {}", e)))?;

        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| fetch_error(Some(status.as_u16()), format!("invalid JSON body: {}", e)))?;

        parse_records(entity, value)
            .ok_or_else(|| fetch_error(Some(status.as_u16()), "expected a JSON array of records".into()))
    }

    fn describe(&self, entity: Entity) -> String {
        self.endpoints.get(entity).url.clone()
    }
}
