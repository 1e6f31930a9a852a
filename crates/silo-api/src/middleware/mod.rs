//! Request middleware: authentication and authorization

pub mod auth;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use silo_core::{context::RequestContext, error::S3Error, utils::generate_request_id, Error};
use tracing::warn;

use crate::authz::{action_for, authorize};
use crate::server::AppState;

pub use auth::s3_auth;

fn error_response(err: Error, request_id: &str) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let s3_error = S3Error::from(err).with_request_id(request_id);

    Response::builder()
        .status(status)
        .header("Content-Type", "application/xml")
        .header("x-amz-request-id", request_id)
        .body(Body::from(s3_error.to_xml()))
        .unwrap()
}

/// Runs after [`s3_auth`]. Parses `/bucket[/key]` from the path and checks
/// the resolved principal against bucket policy and ACL before the request
/// reaches a handler. The service-level `GET /` (list buckets) has no
/// bucket to check against and always passes through.
pub async fn s3_authz(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_else(generate_request_id);

    let path = request.uri().path().to_string();
    let mut segments = path.trim_start_matches('/').splitn(2, '/');
    let bucket = segments.next().filter(|s| !s.is_empty());
    let key = segments.next().filter(|s| !s.is_empty());

    let Some(bucket) = bucket else {
        return next.run(request).await;
    };

    let ctx = match request.extensions().get::<RequestContext>() {
        Some(ctx) => ctx.clone(),
        None => RequestContext::anonymous(request_id.clone()),
    };

    let query = request.uri().query().unwrap_or("");
    let (action, permission) = action_for(request.method().as_str(), key, query);

    match authorize(&state, &ctx, bucket, key, action, permission).await {
        Ok(()) => next.run(request).await,
        Err(Error::NoSuchBucketNamed(_)) => {
            // Let the handler produce the precise NoSuchBucket response.
            next.run(request).await
        }
        Err(e) => {
            warn!("authorization denied: {} {} -> {}", action, path, e);
            error_response(e, &request_id)
        }
    }
}
