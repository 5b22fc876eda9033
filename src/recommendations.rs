use axum::{
    body::{to_bytes, Body},
    extract::{Path, State},
    http::{header, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::time::Duration;
use tracing::{debug, error};

use crate::config::RecommendationsConfig;
use crate::movies::ErrorBody;
use crate::server::AppState;

// Hop-by-hop headers that should be removed when proxying
const HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

const MAX_BODY: usize = 4 * 1024 * 1024;

/// Forwards unmatched `/api/*` requests to the recommendation service.
pub struct RecommendationProxy {
    client: reqwest::Client,
    base_url: String,
}

impl RecommendationProxy {
    pub fn new(config: &RecommendationsConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    pub fn target_url(&self, path: &str, query: Option<&str>) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .map(|s| urlencoding::encode(s).to_string())
            .collect();
        let mut url = format!("{}/{}", self.base_url, encoded.join("/"));
        if let Some(q) = query {
            url.push('?');
            url.push_str(q);
        }
        url
    }

    async fn forward(&self, path: &str, req: Request<Body>) -> Result<Response, StatusCode> {
        let target_url = self.target_url(path, req.uri().query());
        let method = reqwest::Method::from_bytes(req.method().as_str().as_bytes())
            .map_err(|_| StatusCode::METHOD_NOT_ALLOWED)?;

        // Copy headers from original request, excluding hop-by-hop headers
        let mut proxy_headers = reqwest::header::HeaderMap::new();
        for (name, value) in req.headers().iter() {
            let name_str = name.as_str();
            if HOP_HEADERS.contains(&name_str) || name_str == "host" {
                continue;
            }
            if let (Ok(header_name), Ok(header_value)) = (
                reqwest::header::HeaderName::from_bytes(name_str.as_bytes()),
                reqwest::header::HeaderValue::from_bytes(value.as_bytes()),
            ) {
                proxy_headers.append(header_name, header_value);
            }
        }

        let body = to_bytes(req.into_body(), MAX_BODY)
            .await
            .map_err(|_| StatusCode::PAYLOAD_TOO_LARGE)?;

        debug!("Proxying {} {}", method, target_url);

        let proxy_response = self
            .client
            .request(method, &target_url)
            .headers(proxy_headers)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                error!("Recommendation service unreachable: {}", e);
                StatusCode::BAD_GATEWAY
            })?;

        let status_code = proxy_response.status();
        let mut response_headers = HeaderMap::new();

        // Copy response headers, excluding hop-by-hop headers
        for (name, value) in proxy_response.headers().iter() {
            let name_str = name.as_str();
            if HOP_HEADERS.contains(&name_str) || name_str == "content-length" {
                continue;
            }
            if let (Ok(header_name), Ok(header_value)) = (
                header::HeaderName::from_bytes(name_str.as_bytes()),
                header::HeaderValue::from_bytes(value.as_bytes()),
            ) {
                response_headers.append(header_name, header_value);
            }
        }

        let body_bytes = proxy_response
            .bytes()
            .await
            .map_err(|_| StatusCode::BAD_GATEWAY)?;

        let mut response = Response::new(Body::from(body_bytes));
        *response.status_mut() =
            StatusCode::from_u16(status_code.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
        *response.headers_mut() = response_headers;

        Ok(response)
    }
}

pub async fn proxy(
    State(state): State<AppState>,
    Path(path): Path<String>,
    req: Request<Body>,
) -> Response {
    let Some(proxy) = state.recommendations.as_ref() else {
        return error_response(StatusCode::NOT_FOUND, "Not found");
    };

    match proxy.forward(&path, req).await {
        Ok(response) => response,
        Err(status) if status == StatusCode::BAD_GATEWAY => {
            error_response(status, "Recommendation service unavailable")
        }
        Err(status) => error_response(status, status.canonical_reason().unwrap_or("Error")),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    let body = ErrorBody {
        error: message.to_string(),
    };
    (status, Json(body)).into_response()
}
