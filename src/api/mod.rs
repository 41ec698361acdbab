//! Client side of the geometry persistence API.

mod auth;
mod http;
#[cfg(test)]
pub(crate) mod mock;
mod request;

use crate::editor::{ShapeId, ShapeKind};
use crate::geometry::{Coordinate, LonLatBounds, Ring, RingError};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub use auth::AuthSession;
pub use http::{imagery_tiles_url, HttpShapeApi};
pub use request::{ApiCompletion, ApiRequest, UpdateItem};

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} responded with status {status}")]
    Status { endpoint: String, status: u16 },
    #[error("{endpoint} rejected the session token")]
    Unauthorized { endpoint: String },
    #[error("backend reported failure for {operation}")]
    Rejected {
        operation: &'static str,
        message: Option<String>,
    },
    #[error("malformed response from {endpoint}: {reason}")]
    Malformed { endpoint: String, reason: String },
    #[error("token endpoint returned no token")]
    MissingToken,
}

/// Persistence operations consumed by the editing session.
pub trait ShapeApi: Send + Sync {
    fn list_shapes(&self) -> ApiResult<Vec<ShapeRecord>>;
    fn count_shapes(&self) -> ApiResult<u64>;
    fn create_shape(&self, shape: &NewShape) -> ApiResult<ShapeId>;
    fn update_shape(&self, id: &ShapeId, ring: &Ring) -> ApiResult<()>;
    fn delete_shape(&self, id: &ShapeId) -> ApiResult<()>;
    fn delete_all_shapes(&self) -> ApiResult<()>;
}

/// Source of the imagery footprint used to frame the map on mount.
pub trait BoundsSource {
    /// `Ok(None)` when the source answered with something that is not a usable extent.
    fn imagery_bounds(&self) -> ApiResult<Option<LonLatBounds>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewShape {
    pub kind: ShapeKind,
    pub ring: Ring,
    pub user_id: Option<String>,
}

/// One stored shape as listed by `GET /shapes`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShapeRecord {
    #[serde(rename = "_id")]
    pub id: ShapeId,
    /// Unknown or missing kinds read as `None` and load as polygons.
    #[serde(rename = "type", default, deserialize_with = "lenient_kind")]
    pub kind: Option<ShapeKind>,
    #[serde(default)]
    pub coordinates: serde_json::Value,
}

impl ShapeRecord {
    pub fn new(id: ShapeId, kind: ShapeKind, ring: &Ring) -> Self {
        Self {
            id,
            kind: Some(kind),
            coordinates: serde_json::to_value(ring).unwrap_or_default(),
        }
    }

    /// Outer ring of the stored geometry. Accepts a bare ring or a polygon's ring list.
    pub fn ring(&self) -> Result<Ring, RingError> {
        let points = serde_json::from_value::<Vec<Coordinate>>(self.coordinates.clone())
            .or_else(|_| {
                serde_json::from_value::<Vec<Vec<Coordinate>>>(self.coordinates.clone())
                    .map(|rings| rings.into_iter().next().unwrap_or_default())
            })
            .map_err(|_| RingError::Malformed)?;
        Ring::try_from(points)
    }
}

fn lenient_kind<'de, D>(deserializer: D) -> Result<Option<ShapeKind>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let kind = raw.as_ref().and_then(serde_json::Value::as_str).and_then(|label| {
        let kind = ShapeKind::from_label(label);
        if kind.is_none() {
            tracing::debug!(label, "unknown shape type; treating as polygon");
        }
        kind
    });
    Ok(kind)
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateShapeBody<'a> {
    #[serde(rename = "type")]
    pub(crate) kind: ShapeKind,
    pub(crate) coordinates: &'a Ring,
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub(crate) user_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateShapeBody<'a> {
    pub(crate) coordinates: &'a Ring,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CountResponse {
    pub(crate) count: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedShape {
    #[serde(rename = "_id")]
    pub(crate) id: ShapeId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateResponse {
    pub(crate) success: bool,
    #[serde(default)]
    pub(crate) shape: Option<CreatedShape>,
    #[serde(default)]
    pub(crate) message: Option<String>,
}

impl CreateResponse {
    pub(crate) fn into_result(self, endpoint: &str) -> ApiResult<ShapeId> {
        if !self.success {
            return Err(ApiError::Rejected {
                operation: "create",
                message: self.message,
            });
        }
        self.shape
            .map(|shape| shape.id)
            .ok_or_else(|| ApiError::Malformed {
                endpoint: endpoint.to_string(),
                reason: "success without shape id".to_string(),
            })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AckResponse {
    pub(crate) success: bool,
    #[serde(default)]
    pub(crate) message: Option<String>,
}

impl AckResponse {
    pub(crate) fn into_result(self, operation: &'static str) -> ApiResult<()> {
        if self.success {
            Ok(())
        } else {
            Err(ApiError::Rejected {
                operation,
                message: self.message,
            })
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub(crate) token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BoundsResponse {
    #[serde(default)]
    pub(crate) bounds: serde_json::Value,
}

impl BoundsResponse {
    pub(crate) fn lon_lat(&self) -> Option<LonLatBounds> {
        let values = serde_json::from_value::<Vec<f64>>(self.bounds.clone()).ok()?;
        LonLatBounds::from_slice(&values)
    }
}
