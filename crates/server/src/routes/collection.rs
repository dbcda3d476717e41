use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use service::{Revision, ServiceError, Versioned};
use tracing::info;

use super::AppState;
use crate::errors::JsonApiError;
use crate::metrics;

/// Fetch the whole collection document. The body is the stored bytes,
/// already checked to be JSON by the store.
pub async fn fetch_collection(State(state): State<AppState>) -> Result<Response, JsonApiError> {
    let Versioned { raw, revision, .. } = state
        .store
        .load_versioned()
        .await
        .map_err(record_failure)?;
    metrics::LOADS_TOTAL.inc();
    let headers = [
        (header::CONTENT_TYPE, "application/json".to_string()),
        (header::ETAG, etag(&revision)),
    ];
    Ok((headers, raw).into_response())
}

/// Replace the whole collection document with the request body.
/// Serves both `POST` and `PUT`.
pub async fn replace_collection(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(document): Json<Value>,
) -> Result<Response, JsonApiError> {
    let expected = if_match(&headers);
    let revision = state
        .store
        .replace_matching(expected.as_deref(), &document)
        .await
        .map_err(record_failure)?;
    metrics::REPLACES_TOTAL.inc();
    info!(event = "collection_replaced", revision = %revision, conditional = expected.is_some(), "collection replaced");
    Ok((StatusCode::NO_CONTENT, [(header::ETAG, etag(&revision))]).into_response())
}

fn record_failure(e: ServiceError) -> JsonApiError {
    match &e {
        ServiceError::StorageUnavailable(_) => metrics::STORAGE_ERRORS_TOTAL.inc(),
        ServiceError::RevisionMismatch { .. } => metrics::CONFLICTS_TOTAL.inc(),
    }
    JsonApiError::from(e)
}

fn etag(revision: &Revision) -> String {
    format!("\"{revision}\"")
}

/// Parse `If-Match` into the revisions a replace may overwrite.
///
/// `None` (no header, or `*`) means unconditional. Weak tags never pass a
/// strong comparison and are dropped, so a header holding only weak tags
/// yields an empty list that nothing matches.
pub fn if_match(headers: &HeaderMap) -> Option<Vec<Revision>> {
    let values: Vec<&str> = headers
        .get_all(header::IF_MATCH)
        .iter()
        .filter_map(|v: &HeaderValue| v.to_str().ok())
        .collect();
    if values.is_empty() {
        return None;
    }
    let mut accepted = Vec::new();
    for tag in values.iter().flat_map(|v| v.split(',')).map(str::trim) {
        if tag == "*" {
            return None;
        }
        if tag.is_empty() || tag.starts_with("W/") {
            continue;
        }
        let opaque = tag.trim_matches('"');
        if !opaque.is_empty() {
            accepted.push(Revision::from_token(opaque));
        }
    }
    Some(accepted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::IF_MATCH, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn if_match_parsing() {
        assert_eq!(if_match(&HeaderMap::new()), None);
        assert_eq!(if_match(&headers_with("*")), None);
        assert_eq!(if_match(&headers_with("\"abc\"")), Some(vec![Revision::from_token("abc")]));
        assert_eq!(
            if_match(&headers_with("\"abc\", \"def\"")),
            Some(vec![Revision::from_token("abc"), Revision::from_token("def")])
        );
    }

    #[test]
    fn weak_tags_never_match() {
        assert_eq!(
            if_match(&headers_with("W/\"abc\", \"def\"")),
            Some(vec![Revision::from_token("def")])
        );
        assert_eq!(if_match(&headers_with("W/\"abc\"")), Some(vec![]));
    }

    #[test]
    fn repeated_if_match_headers_are_combined() {
        let mut h = headers_with("\"abc\"");
        h.append(header::IF_MATCH, HeaderValue::from_static("\"def\""));
        assert_eq!(
            if_match(&h),
            Some(vec![Revision::from_token("abc"), Revision::from_token("def")])
        );
    }

    #[test]
    fn etag_is_quoted() {
        assert_eq!(etag(&Revision::from_token("0011")), "\"0011\"");
    }
}
