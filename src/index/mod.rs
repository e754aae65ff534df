//! Similarity index gateways.
//!
//! The similarity index itself (storage, ANN search, persistence) lives outside
//! this crate. [`IndexGateway`] is the narrow interface the pipeline needs from
//! it; three implementations are provided:
//!
//! - [`ServiceGateway`]: the JSON service shell (`/upsert`, `/search`, `/health`)
//! - [`QdrantGateway`]: the Qdrant REST API, addressed directly
//! - [`MemoryGateway`]: an in-process brute-force index for tests and offline use

use serde::{Deserialize, Serialize};

use crate::fingerprint::SparseVector;
use crate::spectrum::{Metadata, PointId};

mod memory;
mod qdrant;
mod service;
pub mod wire;

pub use memory::MemoryGateway;
pub use qdrant::{QdrantGateway, DEFAULT_QDRANT_URL};
pub use service::{ServiceGateway, DEFAULT_SERVICE_URL};

/// Default collection name
pub const DEFAULT_COLLECTION: &str = "ms_spectra";

/// Name of the sparse vector field inside each point
pub const SPARSE_VECTOR_NAME: &str = "sparse";

/// Hit payload as returned by the index (arbitrary JSON object)
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Errors reported by an index gateway
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The index could not be reached
    #[error("transport error: {0}")]
    Transport(String),

    /// The index answered with a non-success status
    #[error("request failed with status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body text
        body: String,
    },

    /// The response body could not be decoded
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The collection does not exist
    #[error("collection not found: {0}")]
    CollectionNotFound(String),
}

impl From<ureq::Error> for GatewayError {
    fn from(error: ureq::Error) -> Self {
        match error {
            ureq::Error::Status(status, response) => GatewayError::Status {
                status,
                body: response.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(transport) => GatewayError::Transport(transport.to_string()),
        }
    }
}

/// One spectrum fingerprint ready to be stored in the index.
///
/// Serializes to the service wire shape `{id?, sparse, metadata}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Identifier; the index assigns one if absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PointId>,
    /// Fingerprint
    #[serde(rename = "sparse")]
    pub vector: SparseVector,
    /// Metadata stored alongside the vector
    #[serde(rename = "metadata", default)]
    pub payload: Metadata,
}

impl Point {
    /// Create a point
    pub fn new(id: Option<PointId>, vector: SparseVector, payload: Metadata) -> Self {
        Self {
            id,
            vector,
            payload,
        }
    }
}

/// A ranked search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Identifier of the matched point
    pub id: PointId,
    /// Similarity score (higher is more similar)
    pub score: f64,
    /// Stored payload, when requested
    #[serde(default)]
    pub payload: Option<Payload>,
}

impl Hit {
    /// String value of a payload field, if present
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.as_ref()?.get(key)?.as_str()
    }
}

/// A nearest-neighbour query
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Query fingerprint
    pub vector: SparseVector,
    /// Maximum number of hits
    pub limit: usize,
    /// Whether hits should carry their payload
    pub with_payload: bool,
}

/// Result of a collection probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    /// Collection exists and accepts queries
    Ready,
    /// Collection does not exist (or the index reports itself degraded)
    NotFound,
}

/// Operations the pipeline needs from a similarity index.
pub trait IndexGateway {
    /// Create the sparse-vector collection if it does not exist. Idempotent.
    fn ensure_collection(&mut self) -> Result<(), GatewayError>;

    /// Store points. On success all points are queryable; on failure none of
    /// the batch should be assumed stored.
    fn upsert(&mut self, points: &[Point]) -> Result<(), GatewayError>;

    /// Ranked search, ordered by descending score.
    fn search(&self, request: &SearchRequest) -> Result<Vec<Hit>, GatewayError>;

    /// Probe the collection.
    fn get_collection(&self) -> Result<CollectionStatus, GatewayError>;
}

impl<G: IndexGateway + ?Sized> IndexGateway for &mut G {
    fn ensure_collection(&mut self) -> Result<(), GatewayError> {
        (**self).ensure_collection()
    }

    fn upsert(&mut self, points: &[Point]) -> Result<(), GatewayError> {
        (**self).upsert(points)
    }

    fn search(&self, request: &SearchRequest) -> Result<Vec<Hit>, GatewayError> {
        (**self).search(request)
    }

    fn get_collection(&self) -> Result<CollectionStatus, GatewayError> {
        (**self).get_collection()
    }
}

impl<G: IndexGateway + ?Sized> IndexGateway for Box<G> {
    fn ensure_collection(&mut self) -> Result<(), GatewayError> {
        (**self).ensure_collection()
    }

    fn upsert(&mut self, points: &[Point]) -> Result<(), GatewayError> {
        (**self).upsert(points)
    }

    fn search(&self, request: &SearchRequest) -> Result<Vec<Hit>, GatewayError> {
        (**self).search(request)
    }

    fn get_collection(&self) -> Result<CollectionStatus, GatewayError> {
        (**self).get_collection()
    }
}

/// Join a base URL and a path without doubling the slash.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
