use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;

use super::{
    AckResponse, ApiError, ApiResult, AuthSession, BoundsResponse, BoundsSource, CountResponse,
    CreateResponse, CreateShapeBody, NewShape, ShapeApi, ShapeRecord, UpdateShapeBody,
};
use crate::config::AppConfig;
use crate::editor::ShapeId;
use crate::geometry::{LonLatBounds, Ring};

/// `ShapeApi` over the REST backend, authenticated with a bearer token.
#[derive(Debug)]
pub struct HttpShapeApi {
    client: Client,
    shapes_url: String,
    bounds_url: Option<Url>,
    auth: AuthSession,
}

impl HttpShapeApi {
    pub fn new(config: &AppConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|source| ApiError::Transport {
                endpoint: config.api_base_url.clone(),
                source,
            })?;
        let base = config.api_base_url.trim_end_matches('/');
        Ok(Self {
            client,
            shapes_url: format!("{base}/shapes"),
            bounds_url: bounds_url(config),
            auth: AuthSession::new(format!("{base}/auth/token")),
        })
    }

    pub fn shapes_url(&self) -> &str {
        &self.shapes_url
    }

    fn shape_url(&self, id: &ShapeId) -> String {
        format!("{}/{}", self.shapes_url, id)
    }

    /// Sends with the session token, refreshing it and retrying once on 401.
    fn send_authorized<F>(&self, endpoint: &str, build: F) -> ApiResult<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let token = self.auth.token(&self.client)?;
        let response = send(endpoint, build(&self.client).bearer_auth(&token))?;
        let response = if response.status() == StatusCode::UNAUTHORIZED {
            tracing::info!(endpoint, "token rejected; refreshing and retrying once");
            self.auth.invalidate(&token);
            let token = self.auth.token(&self.client)?;
            let retried = send(endpoint, build(&self.client).bearer_auth(&token))?;
            if retried.status() == StatusCode::UNAUTHORIZED {
                return Err(ApiError::Unauthorized {
                    endpoint: endpoint.to_string(),
                });
            }
            retried
        } else {
            response
        };

        if !response.status().is_success() {
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }
}

fn send(endpoint: &str, request: RequestBuilder) -> ApiResult<Response> {
    tracing::debug!(endpoint, "sending request");
    request.send().map_err(|source| ApiError::Transport {
        endpoint: endpoint.to_string(),
        source,
    })
}

fn read_json<T: DeserializeOwned>(endpoint: &str, response: Response) -> ApiResult<T> {
    let body = response.bytes().map_err(|source| ApiError::Transport {
        endpoint: endpoint.to_string(),
        source,
    })?;
    serde_json::from_slice(&body).map_err(|err| ApiError::Malformed {
        endpoint: endpoint.to_string(),
        reason: err.to_string(),
    })
}

/// Bounds endpoint with the imagery source passed as its `url` query parameter.
fn bounds_url(config: &AppConfig) -> Option<Url> {
    with_imagery_source(config.bounds_url.as_deref()?, config.cog_url.as_deref())
}

/// Tile template for the imagery layer, carrying the same `url` parameter as the bounds call.
pub fn imagery_tiles_url(config: &AppConfig) -> Option<Url> {
    with_imagery_source(config.tiles_url.as_deref()?, config.cog_url.as_deref())
}

fn with_imagery_source(base: &str, cog: Option<&str>) -> Option<Url> {
    let parsed = match cog {
        Some(cog) => Url::parse_with_params(base, &[("url", cog)]),
        None => Url::parse(base),
    };
    match parsed {
        Ok(url) => Some(url),
        Err(err) => {
            tracing::warn!(?err, base, "invalid imagery url; layer disabled");
            None
        }
    }
}

impl ShapeApi for HttpShapeApi {
    fn list_shapes(&self) -> ApiResult<Vec<ShapeRecord>> {
        let endpoint = self.shapes_url.as_str();
        let response = self.send_authorized(endpoint, |client| client.get(endpoint))?;
        let items: Vec<serde_json::Value> = read_json(endpoint, response)?;

        let mut records = Vec::with_capacity(items.len());
        for item in items {
            match serde_json::from_value::<ShapeRecord>(item) {
                Ok(record) => records.push(record),
                Err(err) => tracing::warn!(?err, "skipping malformed shape record"),
            }
        }
        Ok(records)
    }

    fn count_shapes(&self) -> ApiResult<u64> {
        let endpoint = format!("{}/count", self.shapes_url);
        let response = self.send_authorized(&endpoint, |client| client.get(&endpoint))?;
        let body: CountResponse = read_json(&endpoint, response)?;
        Ok(body.count)
    }

    fn create_shape(&self, shape: &NewShape) -> ApiResult<ShapeId> {
        let endpoint = self.shapes_url.as_str();
        let body = CreateShapeBody {
            kind: shape.kind,
            coordinates: &shape.ring,
            user_id: shape.user_id.as_deref(),
        };
        let response = self.send_authorized(endpoint, |client| client.post(endpoint).json(&body))?;
        let parsed: CreateResponse = read_json(endpoint, response)?;
        parsed.into_result(endpoint)
    }

    fn update_shape(&self, id: &ShapeId, ring: &Ring) -> ApiResult<()> {
        let endpoint = self.shape_url(id);
        let body = UpdateShapeBody { coordinates: ring };
        let response =
            self.send_authorized(&endpoint, |client| client.put(&endpoint).json(&body))?;
        let parsed: AckResponse = read_json(&endpoint, response)?;
        parsed.into_result("update")
    }

    fn delete_shape(&self, id: &ShapeId) -> ApiResult<()> {
        let endpoint = self.shape_url(id);
        let response = self.send_authorized(&endpoint, |client| client.delete(&endpoint))?;
        let parsed: AckResponse = read_json(&endpoint, response)?;
        parsed.into_result("delete")
    }

    fn delete_all_shapes(&self) -> ApiResult<()> {
        let endpoint = self.shapes_url.as_str();
        let response = self.send_authorized(endpoint, |client| client.delete(endpoint))?;
        let parsed: AckResponse = read_json(endpoint, response)?;
        parsed.into_result("delete all")
    }
}

impl BoundsSource for HttpShapeApi {
    fn imagery_bounds(&self) -> ApiResult<Option<LonLatBounds>> {
        let Some(url) = self.bounds_url.clone() else {
            return Ok(None);
        };
        let endpoint = url.to_string();
        let response = send(&endpoint, self.client.get(url))?;
        if !response.status().is_success() {
            return Err(ApiError::Status {
                endpoint,
                status: response.status().as_u16(),
            });
        }
        match read_json::<BoundsResponse>(&endpoint, response) {
            Ok(body) => Ok(body.lon_lat()),
            Err(err) => {
                tracing::warn!(%err, "ignoring malformed bounds response");
                Ok(None)
            }
        }
    }
}
