//! SigV4 authentication middleware
//!
//! Runs ahead of every S3 route. Resolves the caller's identity from either
//! a header `Authorization: AWS4-HMAC-SHA256 ...` or a presigned query
//! string, and stashes a [`RequestContext`] in the request extensions for
//! handlers and the authorization layer to read. A request with neither
//! form of credentials is let through as anonymous; it's up to bucket
//! policy/ACL evaluation downstream to decide whether that's enough.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use silo_auth::{
    extract_access_key_from_presigned, is_presigned_request, verify_presigned_url,
    verify_signature_v4, SignatureV4,
};
use silo_core::{context::RequestContext, types::Owner, utils::generate_request_id, Error};
use std::collections::BTreeMap;
use tracing::warn;

use crate::server::AppState;

fn error_response(err: Error, request_id: &str) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let s3_error = silo_core::error::S3Error::from(err).with_request_id(request_id);

    Response::builder()
        .status(status)
        .header("Content-Type", "application/xml")
        .header("x-amz-request-id", request_id)
        .body(Body::from(s3_error.to_xml()))
        .unwrap()
}

/// Authenticate the request and attach a [`RequestContext`] to it.
pub async fn s3_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let request_id = generate_request_id();

    match authenticate(&state, &request, &request_id).await {
        Ok(ctx) => {
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        Err(e) => {
            warn!("authentication failed: {}", e);
            error_response(e, &request_id)
        }
    }
}

async fn authenticate(
    state: &AppState,
    request: &Request<Body>,
    request_id: &str,
) -> Result<RequestContext, Error> {
    let method = request.method().as_str().to_string();
    let path = request.uri().path().to_string();
    let query_string = request.uri().query().unwrap_or("").to_string();

    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in request.headers() {
        let value = value.to_str().unwrap_or_default().to_string();
        headers
            .entry(name.as_str().to_lowercase())
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    let header_auth = headers.get("authorization").cloned();
    let query_auth = is_presigned_request(&query_string);

    if header_auth.is_some() && query_auth {
        return Err(Error::InvalidRequest(
            "Request must not be signed with both header and query authentication".into(),
        ));
    }

    if let Some(auth_header) = header_auth {
        if !auth_header.starts_with("AWS4-HMAC-SHA256 ") {
            return Err(Error::InvalidRequest("Unsupported authorization scheme".into()));
        }

        let sig = SignatureV4::parse(&auth_header)?;
        let user = state
            .metadata
            .get_user_by_access_key(&sig.access_key)
            .await
            .map_err(|_| Error::InternalError("metadata lookup failed".into()))?
            .ok_or(Error::SignatureDoesNotMatch)?;

        let payload_hash = headers
            .get("x-amz-content-sha256")
            .cloned()
            .unwrap_or_else(|| "UNSIGNED-PAYLOAD".to_string());

        let ok = verify_signature_v4(&method, &path, &query_string, &headers, &payload_hash, &user.secret_key, &sig)?;
        if !ok {
            return Err(Error::SignatureDoesNotMatch);
        }

        let owner = Owner::with_name(&user.id, &user.display_name.clone().unwrap_or_else(|| user.access_key.clone()));
        return Ok(RequestContext::authenticated(
            request_id.to_string(),
            user.access_key,
            owner,
            user.is_admin,
        ));
    }

    if query_auth {
        let access_key = extract_access_key_from_presigned(&query_string)?;
        let user = state
            .metadata
            .get_user_by_access_key(&access_key)
            .await
            .map_err(|_| Error::InternalError("metadata lookup failed".into()))?
            .ok_or(Error::SignatureDoesNotMatch)?;

        let ok = verify_presigned_url(
            &method,
            &path,
            &query_string,
            &headers,
            &user.secret_key,
            &state.config.auth.region,
        )?;
        if !ok {
            return Err(Error::SignatureDoesNotMatch);
        }

        let owner = Owner::with_name(&user.id, &user.display_name.clone().unwrap_or_else(|| user.access_key.clone()));
        return Ok(RequestContext::authenticated(
            request_id.to_string(),
            user.access_key,
            owner,
            user.is_admin,
        ));
    }

    Ok(RequestContext::anonymous(request_id.to_string()))
}
