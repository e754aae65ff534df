use std::time::Duration;

use log::{debug, info};

use super::wire::{
    QdrantCreateCollection, QdrantNamedSparse, QdrantNamedVectors, QdrantPoint,
    QdrantResponse, QdrantScoredPoint, QdrantSearch, QdrantUpsert,
};
use super::{
    join_url, CollectionStatus, GatewayError, Hit, IndexGateway, Point, SearchRequest,
    SPARSE_VECTOR_NAME,
};
use crate::spectrum::PointId;

/// Default Qdrant REST endpoint
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6333";

/// Gateway talking to Qdrant's REST API directly.
///
/// The collection holds one named sparse vector ([`SPARSE_VECTOR_NAME`]) with
/// its inverted index on disk. Upserts wait for the write to be applied, so a
/// successful upsert is immediately searchable.
pub struct QdrantGateway {
    agent: ureq::Agent,
    base_url: String,
    collection: String,
}

impl QdrantGateway {
    /// Create a gateway for `collection` on the Qdrant instance at `base_url`
    pub fn new(base_url: impl Into<String>, collection: impl Into<String>, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            base_url: base_url.into(),
            collection: collection.into(),
        }
    }

    /// Collection name
    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn collection_url(&self, suffix: &str) -> String {
        let path = if suffix.is_empty() {
            format!("collections/{}", self.collection)
        } else {
            format!("collections/{}/{}", self.collection, suffix)
        };
        join_url(&self.base_url, &path)
    }
}

impl IndexGateway for QdrantGateway {
    fn ensure_collection(&mut self) -> Result<(), GatewayError> {
        if self.get_collection()? == CollectionStatus::Ready {
            return Ok(());
        }

        info!("Creating collection {}", self.collection);
        self.agent
            .put(&self.collection_url(""))
            .send_json(QdrantCreateCollection::default())?;
        Ok(())
    }

    fn upsert(&mut self, points: &[Point]) -> Result<(), GatewayError> {
        let body = QdrantUpsert {
            points: points
                .iter()
                .map(|p| QdrantPoint {
                    id: p.id.clone().unwrap_or_else(PointId::random),
                    vector: QdrantNamedVectors { sparse: &p.vector },
                    payload: &p.payload,
                })
                .collect(),
        };

        let url = format!("{}?wait=true", self.collection_url("points"));
        debug!("Upserting {} points into {}", points.len(), self.collection);
        self.agent.put(&url).send_json(body)?;
        Ok(())
    }

    fn search(&self, request: &SearchRequest) -> Result<Vec<Hit>, GatewayError> {
        let body = QdrantSearch {
            vector: QdrantNamedSparse {
                name: SPARSE_VECTOR_NAME,
                vector: &request.vector,
            },
            limit: request.limit,
            with_payload: request.with_payload,
        };

        let response: QdrantResponse<Vec<QdrantScoredPoint>> = self
            .agent
            .post(&self.collection_url("points/search"))
            .send_json(body)?
            .into_json()
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        Ok(response.result.into_iter().map(Hit::from).collect())
    }

    fn get_collection(&self) -> Result<CollectionStatus, GatewayError> {
        match self.agent.get(&self.collection_url("")).call() {
            Ok(_) => Ok(CollectionStatus::Ready),
            Err(ureq::Error::Status(404, _)) => Ok(CollectionStatus::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_urls() {
        let gateway = QdrantGateway::new("http://localhost:6333/", "ms_spectra", Duration::from_secs(1));
        assert_eq!(gateway.collection_url(""), "http://localhost:6333/collections/ms_spectra");
        assert_eq!(
            gateway.collection_url("points/search"),
            "http://localhost:6333/collections/ms_spectra/points/search"
        );
        assert_eq!(gateway.collection(), "ms_spectra");
    }
}
