//! JSON bodies exchanged with the service shell and with Qdrant.

use serde::{Deserialize, Serialize};

use super::{Hit, Payload, Point, SPARSE_VECTOR_NAME};
use crate::fingerprint::SparseVector;
use crate::spectrum::{Metadata, PointId};

/// `POST /upsert` request
#[derive(Debug, Serialize)]
pub struct UpsertBody<'a> {
    /// Points to store
    pub points: &'a [Point],
}

/// `POST /upsert` response
#[derive(Debug, Deserialize)]
pub struct UpsertResponse {
    /// `"ok"` on success
    pub status: String,
    /// Opaque index result
    #[serde(default)]
    pub result: serde_json::Value,
}

/// `POST /search` request
#[derive(Debug, Serialize)]
pub struct SearchBody<'a> {
    /// Query fingerprint
    pub query: &'a SparseVector,
    /// Maximum number of hits
    pub limit: usize,
    /// Whether to return payloads
    pub with_payload: bool,
}

/// `POST /search` response
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    /// Ranked hits
    #[serde(default)]
    pub hits: Vec<Hit>,
}

/// `GET /health` response
#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` or `"degraded"`
    pub status: String,
    /// Collection name
    #[serde(default)]
    pub collection: String,
}

/// Qdrant collection creation body with a single on-disk sparse vector
#[derive(Debug, Serialize)]
pub struct QdrantCreateCollection {
    /// Named sparse vector configurations
    pub sparse_vectors: std::collections::HashMap<&'static str, QdrantSparseParams>,
}

impl Default for QdrantCreateCollection {
    fn default() -> Self {
        let mut sparse_vectors = std::collections::HashMap::new();
        sparse_vectors.insert(
            SPARSE_VECTOR_NAME,
            QdrantSparseParams {
                index: QdrantSparseIndex { on_disk: true },
            },
        );
        Self { sparse_vectors }
    }
}

/// Sparse vector parameters
#[derive(Debug, Serialize)]
pub struct QdrantSparseParams {
    /// Index parameters
    pub index: QdrantSparseIndex,
}

/// Sparse index parameters
#[derive(Debug, Serialize)]
pub struct QdrantSparseIndex {
    /// Keep the inverted index on disk
    pub on_disk: bool,
}

/// Qdrant point; the id is mandatory in Qdrant
#[derive(Debug, Serialize)]
pub struct QdrantPoint<'a> {
    /// Point id
    pub id: PointId,
    /// Named vectors
    pub vector: QdrantNamedVectors<'a>,
    /// Payload
    pub payload: &'a Metadata,
}

/// Map holding the single named sparse vector
#[derive(Debug, Serialize)]
pub struct QdrantNamedVectors<'a> {
    /// The fingerprint, under [`SPARSE_VECTOR_NAME`]
    pub sparse: &'a SparseVector,
}

/// Qdrant upsert body
#[derive(Debug, Serialize)]
pub struct QdrantUpsert<'a> {
    /// Points to store
    pub points: Vec<QdrantPoint<'a>>,
}

/// Named sparse query vector
#[derive(Debug, Serialize)]
pub struct QdrantNamedSparse<'a> {
    /// Vector name
    pub name: &'static str,
    /// Query fingerprint
    pub vector: &'a SparseVector,
}

/// Qdrant search body
#[derive(Debug, Serialize)]
pub struct QdrantSearch<'a> {
    /// Named query vector
    pub vector: QdrantNamedSparse<'a>,
    /// Maximum number of hits
    pub limit: usize,
    /// Whether to return payloads
    pub with_payload: bool,
}

/// Qdrant response envelope
#[derive(Debug, Deserialize)]
pub struct QdrantResponse<T> {
    /// Operation result
    pub result: T,
    /// `"ok"` on success
    #[serde(default)]
    pub status: serde_json::Value,
}

/// Qdrant scored point
#[derive(Debug, Deserialize)]
pub struct QdrantScoredPoint {
    /// Point id
    pub id: PointId,
    /// Similarity score
    pub score: f64,
    /// Payload, when requested
    #[serde(default)]
    pub payload: Option<Payload>,
}

impl From<QdrantScoredPoint> for Hit {
    fn from(point: QdrantScoredPoint) -> Self {
        Hit {
            id: point.id,
            score: point.score,
            payload: point.payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_body_shape() {
        let query = SparseVector::try_new(vec![1, 7], vec![0.6, 0.8]).unwrap();
        let body = SearchBody {
            query: &query,
            limit: 10,
            with_payload: true,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"query": {"indices": [1, 7], "values": [0.6, 0.8]}, "limit": 10, "with_payload": true})
        );
    }

    #[test]
    fn test_qdrant_bodies() {
        assert_eq!(
            serde_json::to_value(QdrantCreateCollection::default()).unwrap(),
            json!({"sparse_vectors": {"sparse": {"index": {"on_disk": true}}}})
        );

        let vector = SparseVector::try_new(vec![2], vec![1.0]).unwrap();
        let payload = Metadata::new();
        let upsert = QdrantUpsert {
            points: vec![QdrantPoint {
                id: PointId::Num(9),
                vector: QdrantNamedVectors { sparse: &vector },
                payload: &payload,
            }],
        };
        assert_eq!(
            serde_json::to_value(&upsert).unwrap(),
            json!({"points": [{"id": 9, "vector": {"sparse": {"indices": [2], "values": [1.0]}}, "payload": {}}]})
        );

        let search = QdrantSearch {
            vector: QdrantNamedSparse {
                name: SPARSE_VECTOR_NAME,
                vector: &vector,
            },
            limit: 3,
            with_payload: false,
        };
        assert_eq!(
            serde_json::to_value(&search).unwrap(),
            json!({"vector": {"name": "sparse", "vector": {"indices": [2], "values": [1.0]}}, "limit": 3, "with_payload": false})
        );
    }

    #[test]
    fn test_qdrant_search_response() {
        let response: QdrantResponse<Vec<QdrantScoredPoint>> = serde_json::from_value(json!({
            "result": [
                {"id": "0b9c1a3e-8f43-4a8e-9d4b-0c2f6a1b7e11", "version": 2, "score": 0.91, "payload": {"NAME": "A"}},
                {"id": 4, "version": 2, "score": 0.5}
            ],
            "status": "ok",
            "time": 0.001
        }))
        .unwrap();
        let hits: Vec<Hit> = response.result.into_iter().map(Hit::from).collect();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].payload_str("NAME"), Some("A"));
        assert_eq!(hits[1].id, PointId::Num(4));
        assert!(hits[1].payload.is_none());
    }
}
