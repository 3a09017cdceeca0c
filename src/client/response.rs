//! Mapping a proxy answer onto the caller-facing result.

use axum::body::Bytes;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, StatusCode};
use serde_json::Value;

use crate::client::error::ApiError;
use crate::proxy::error::{ErrorBody, NOT_AUTHENTICATED, UPSTREAM_UNREACHABLE};
use crate::proxy::forward::is_auth_redirect;
use crate::proxy::{Payload, ODATA_ENTITY_ID, ODATA_VERSION};

/// A successful (2xx) API call.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    /// `OData-EntityId`, set on record creation.
    pub entity_id: Option<String>,
    pub odata_version: Option<String>,
    pub payload: Payload,
}

impl ApiResponse {
    pub fn json(&self) -> Option<&Value> {
        self.payload.as_json()
    }

    /// Key of the record named by the entity-id header, e.g. `42` for
    /// `.../items(42)`.
    pub fn record_id(&self) -> Option<&str> {
        let entity_id = self.entity_id.as_deref()?.trim_end();
        let inner = entity_id.strip_suffix(')')?;
        let open = inner.rfind('(')?;
        Some(&inner[open + 1..]).filter(|id| !id.is_empty())
    }
}

pub(crate) fn classify_response(
    status: StatusCode,
    headers: &HeaderMap,
    bytes: Bytes,
) -> Result<ApiResponse, ApiError> {
    if is_auth_redirect(status) {
        return Err(ApiError::NotAuthenticated);
    }

    let payload = Payload::classify(headers.get(CONTENT_TYPE), bytes.clone()).unwrap_or(Payload::Raw(bytes));

    if status.is_success() {
        return Ok(ApiResponse {
            status,
            entity_id: header_string(headers, &ODATA_ENTITY_ID),
            odata_version: header_string(headers, &ODATA_VERSION),
            payload,
        });
    }

    let local = payload
        .as_json()
        .and_then(|v| serde_json::from_value::<ErrorBody>(v.clone()).ok());

    match local {
        Some(body) if status == StatusCode::UNAUTHORIZED && body.error == NOT_AUTHENTICATED => {
            Err(ApiError::NotAuthenticated)
        }
        Some(body) if status == StatusCode::BAD_GATEWAY && body.error == UPSTREAM_UNREACHABLE => {
            Err(ApiError::UpstreamUnreachable { cause: body.cause })
        }
        _ => Err(ApiError::UpstreamError { status, payload }),
    }
}

fn header_string(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "application/json".parse().unwrap());
        headers
    }

    fn body(value: Value) -> Bytes {
        Bytes::from(serde_json::to_vec(&value).unwrap())
    }

    #[test]
    fn test_success_with_entity_id() {
        let mut headers = HeaderMap::new();
        headers.insert(ODATA_ENTITY_ID, "https://portal.example.com/_api/items(42)".parse().unwrap());
        headers.insert(ODATA_VERSION, "4.0".parse().unwrap());

        let response = classify_response(StatusCode::NO_CONTENT, &headers, Bytes::new()).unwrap();
        assert_eq!(response.record_id(), Some("42"));
        assert_eq!(response.odata_version.as_deref(), Some("4.0"));
        assert!(response.payload.is_empty());
    }

    #[test]
    fn test_record_id_absent_or_malformed() {
        let mut response = classify_response(StatusCode::OK, &HeaderMap::new(), Bytes::new()).unwrap();
        assert_eq!(response.record_id(), None);

        response.entity_id = Some("https://portal.example.com/_api/items".into());
        assert_eq!(response.record_id(), None);

        response.entity_id = Some("items()".into());
        assert_eq!(response.record_id(), None);
    }

    #[test]
    fn test_redirect_is_not_authenticated() {
        let err = classify_response(StatusCode::FOUND, &HeaderMap::new(), Bytes::new()).unwrap_err();
        assert!(err.is_not_authenticated());
    }

    #[test]
    fn test_tagged_401_is_not_authenticated() {
        let bytes = body(json!({"error": "NotAuthenticated", "cause": "session expired"}));
        let err = classify_response(StatusCode::UNAUTHORIZED, &json_headers(), bytes).unwrap_err();
        assert!(err.is_not_authenticated());
    }

    #[test]
    fn test_tagged_502_is_unreachable() {
        let bytes = body(json!({"error": "UpstreamUnreachable", "cause": "connection refused"}));
        let err = classify_response(StatusCode::BAD_GATEWAY, &json_headers(), bytes).unwrap_err();
        assert!(matches!(err, ApiError::UpstreamUnreachable { cause } if cause == "connection refused"));
    }

    #[test]
    fn test_upstream_odata_error_relayed() {
        let upstream = json!({"error": {"code": "0x80040217", "message": "Record not found"}});
        let err = classify_response(StatusCode::NOT_FOUND, &json_headers(), body(upstream.clone())).unwrap_err();
        match err {
            ApiError::UpstreamError { status, payload } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(payload.as_json(), Some(&upstream));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_upstream_own_502_is_not_local() {
        let upstream = json!({"error": {"code": "gateway", "message": "bad"}});
        let err = classify_response(StatusCode::BAD_GATEWAY, &json_headers(), body(upstream)).unwrap_err();
        assert!(matches!(err, ApiError::UpstreamError { status, .. } if status == StatusCode::BAD_GATEWAY));
    }
}
