use std::time::Duration;

use log::debug;

use super::wire::{HealthResponse, SearchBody, SearchResponse, UpsertBody, UpsertResponse};
use super::{join_url, CollectionStatus, GatewayError, Hit, IndexGateway, Point, SearchRequest};

/// Default base URL of the service shell
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8000";

/// Gateway speaking the JSON service shell protocol:
///
/// - `POST /upsert` `{points: [...]}` -> `{status, result}`
/// - `POST /search` `{query, limit, with_payload}` -> `{hits: [...]}`
/// - `GET /health` -> `{status: "ok" | "degraded", collection}`
///
/// The service creates its collection itself, so [`IndexGateway::ensure_collection`]
/// only checks that the service answers.
pub struct ServiceGateway {
    agent: ureq::Agent,
    base_url: String,
}

impl ServiceGateway {
    /// Create a gateway for the service at `base_url`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            base_url: base_url.into(),
        }
    }

    /// Base URL of the service
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn health(&self) -> Result<HealthResponse, GatewayError> {
        let url = join_url(&self.base_url, "health");
        self.agent
            .get(&url)
            .call()?
            .into_json::<HealthResponse>()
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }
}

impl IndexGateway for ServiceGateway {
    fn ensure_collection(&mut self) -> Result<(), GatewayError> {
        let health = self.health()?;
        debug!("Service health: {} ({})", health.status, health.collection);
        Ok(())
    }

    fn upsert(&mut self, points: &[Point]) -> Result<(), GatewayError> {
        let url = join_url(&self.base_url, "upsert");
        let response = self.agent.post(&url).send_json(UpsertBody { points })?;

        // ureq reports >= 400 as errors; the service contract also treats 3xx as failure.
        if response.status() >= 300 {
            return Err(GatewayError::Status {
                status: response.status(),
                body: response.into_string().unwrap_or_default(),
            });
        }

        let body: UpsertResponse = response
            .into_json()
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        if body.status != "ok" {
            return Err(GatewayError::InvalidResponse(format!(
                "upsert status {:?}: {}",
                body.status, body.result
            )));
        }

        Ok(())
    }

    fn search(&self, request: &SearchRequest) -> Result<Vec<Hit>, GatewayError> {
        let url = join_url(&self.base_url, "search");
        let body = SearchBody {
            query: &request.vector,
            limit: request.limit,
            with_payload: request.with_payload,
        };

        let response: SearchResponse = self
            .agent
            .post(&url)
            .send_json(body)?
            .into_json()
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        Ok(response.hits)
    }

    fn get_collection(&self) -> Result<CollectionStatus, GatewayError> {
        let health = self.health()?;
        Ok(if health.status == "ok" {
            CollectionStatus::Ready
        } else {
            CollectionStatus::NotFound
        })
    }
}
