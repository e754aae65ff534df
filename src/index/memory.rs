use std::collections::HashMap;

use super::{
    CollectionStatus, GatewayError, Hit, IndexGateway, Payload, Point, SearchRequest,
    DEFAULT_COLLECTION,
};
use crate::fingerprint::SparseVector;
use crate::spectrum::{Metadata, PointId};

#[derive(Debug, Clone)]
struct StoredPoint {
    id: PointId,
    vector: SparseVector,
    payload: Metadata,
}

/// In-process index scoring every stored point by sparse dot product.
///
/// Re-upserting an id replaces the stored point in place. Only points sharing
/// at least one bin with the query are returned; hits with equal scores keep
/// insertion order.
#[derive(Debug, Clone)]
pub struct MemoryGateway {
    name: String,
    created: bool,
    points: Vec<StoredPoint>,
    positions: HashMap<PointId, usize>,
    upsert_calls: usize,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new(DEFAULT_COLLECTION)
    }
}

impl MemoryGateway {
    /// Create a gateway whose collection does not exist yet
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created: false,
            points: Vec::new(),
            positions: HashMap::new(),
            upsert_calls: 0,
        }
    }

    /// Number of stored points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of successful upsert calls (i.e. flushed batches)
    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls
    }

    /// Look up a stored point
    pub fn get(&self, id: &PointId) -> Option<Point> {
        let stored = &self.points[*self.positions.get(id)?];
        Some(Point::new(
            Some(stored.id.clone()),
            stored.vector.clone(),
            stored.payload.clone(),
        ))
    }

    fn check_collection(&self) -> Result<(), GatewayError> {
        if self.created {
            Ok(())
        } else {
            Err(GatewayError::CollectionNotFound(self.name.clone()))
        }
    }
}

fn to_payload(metadata: &Metadata) -> Payload {
    metadata
        .iter()
        .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
        .collect()
}

impl IndexGateway for MemoryGateway {
    fn ensure_collection(&mut self) -> Result<(), GatewayError> {
        self.created = true;
        Ok(())
    }

    fn upsert(&mut self, points: &[Point]) -> Result<(), GatewayError> {
        self.check_collection()?;

        for point in points {
            let id = point.id.clone().unwrap_or_else(PointId::random);
            let stored = StoredPoint {
                id: id.clone(),
                vector: point.vector.clone(),
                payload: point.payload.clone(),
            };
            match self.positions.get(&id) {
                Some(&pos) => self.points[pos] = stored,
                None => {
                    self.positions.insert(id, self.points.len());
                    self.points.push(stored);
                }
            }
        }

        self.upsert_calls += 1;
        Ok(())
    }

    fn search(&self, request: &SearchRequest) -> Result<Vec<Hit>, GatewayError> {
        self.check_collection()?;

        let mut scored: Vec<(usize, f64)> = self
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| (i, p.vector.dot(&request.vector)))
            // Points sharing no bin with the query are not hits.
            .filter(|&(_, score)| score > 0.0)
            .collect();
        // Stable sort: equal scores stay in insertion order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(request.limit);

        Ok(scored
            .into_iter()
            .map(|(i, score)| {
                let stored = &self.points[i];
                Hit {
                    id: stored.id.clone(),
                    score,
                    payload: request.with_payload.then(|| to_payload(&stored.payload)),
                }
            })
            .collect())
    }

    fn get_collection(&self) -> Result<CollectionStatus, GatewayError> {
        Ok(if self.created {
            CollectionStatus::Ready
        } else {
            CollectionStatus::NotFound
        })
    }
}
