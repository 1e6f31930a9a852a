//! Bucket Policy and ACL handlers
//!
//! S3-compatible policy and ACL management endpoints.

use axum::{
    body::Body,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use silo_core::{
    types::{
        AccessControlPolicy, AclHeaders, CannedAcl, Owner,
        PolicyDocument,
    },
    utils::generate_request_id,
    Error,
};
use tracing::{debug, error, info};

use crate::server::AppState;

// ============================================================================
// Response Helpers
// ============================================================================

fn error_response(err: Error, request_id: &str) -> Response {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let s3_error = silo_core::error::S3Error::from(err).with_request_id(request_id);

    Response::builder()
        .status(status)
        .header("Content-Type", "application/xml")
        .header("x-amz-request-id", request_id)
        .body(Body::from(s3_error.to_xml()))
        .unwrap()
}

fn success_response(status: StatusCode, body: String, request_id: &str) -> Response {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/xml")
        .header("x-amz-request-id", request_id)
        .body(Body::from(body))
        .unwrap()
}

fn success_response_json(status: StatusCode, body: String, request_id: &str) -> Response {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("x-amz-request-id", request_id)
        .body(Body::from(body))
        .unwrap()
}

fn no_content_response(request_id: &str) -> Response {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("x-amz-request-id", request_id)
        .body(Body::empty())
        .unwrap()
}

/// ACLs are stored in the metadata store as JSON (the internal
/// representation); only the wire format at the HTTP boundary is XML.
pub fn acl_to_storage(acl: &AccessControlPolicy) -> Result<String, Error> {
    serde_json::to_string(acl).map_err(|e| Error::InternalError(e.to_string()))
}

pub fn acl_from_storage(stored: &str) -> Result<AccessControlPolicy, Error> {
    serde_json::from_str(stored).map_err(|e| Error::InternalError(e.to_string()))
}

// ============================================================================
// Bucket Policy Handlers
// ============================================================================

/// GET /{bucket}?policy - Get bucket policy
pub async fn get_bucket_policy(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
) -> impl IntoResponse {
    let request_id = generate_request_id();
    debug!("GetBucketPolicy bucket={} request_id={}", bucket, request_id);

    match state.metadata.get_bucket(&bucket).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(Error::NoSuchBucketNamed(bucket), &request_id);
        }
        Err(e) => {
            error!("Error checking bucket: {}", e);
            return error_response(e, &request_id);
        }
    }

    match state.metadata.get_bucket_policy(&bucket).await {
        Ok(Some(policy_json)) => {
            success_response_json(StatusCode::OK, policy_json, &request_id)
        }
        Ok(None) => {
            error_response(Error::NoSuchBucketPolicy, &request_id)
        }
        Err(e) => {
            error!("Error getting bucket policy: {}", e);
            error_response(e, &request_id)
        }
    }
}

/// PUT /{bucket}?policy - Put bucket policy
pub async fn put_bucket_policy(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    let request_id = generate_request_id();
    debug!("PutBucketPolicy bucket={} request_id={}", bucket, request_id);

    match state.metadata.get_bucket(&bucket).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(Error::NoSuchBucketNamed(bucket), &request_id);
        }
        Err(e) => {
            error!("Error checking bucket: {}", e);
            return error_response(e, &request_id);
        }
    }

    let policy_json = match String::from_utf8(body.to_vec()) {
        Ok(s) => s,
        Err(_) => {
            return error_response(
                Error::MalformedPolicy("Invalid UTF-8 in policy document".into()),
                &request_id,
            );
        }
    };

    match serde_json::from_str::<PolicyDocument>(&policy_json) {
        Ok(policy) => {
            if policy.statement.is_empty() {
                return error_response(
                    Error::MalformedPolicy("Policy must contain at least one statement".into()),
                    &request_id,
                );
            }
            info!("Valid policy with {} statements", policy.statement.len());
        }
        Err(e) => {
            return error_response(
                Error::MalformedPolicy(format!("Invalid policy JSON: {}", e)),
                &request_id,
            );
        }
    }

    match state.metadata.put_bucket_policy(&bucket, &policy_json).await {
        Ok(_) => {
            info!("Bucket policy set for {}", bucket);
            no_content_response(&request_id)
        }
        Err(e) => {
            error!("Error setting bucket policy: {}", e);
            error_response(e, &request_id)
        }
    }
}

/// DELETE /{bucket}?policy - Delete bucket policy
pub async fn delete_bucket_policy(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
) -> impl IntoResponse {
    let request_id = generate_request_id();
    debug!("DeleteBucketPolicy bucket={} request_id={}", bucket, request_id);

    match state.metadata.get_bucket(&bucket).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(Error::NoSuchBucketNamed(bucket), &request_id);
        }
        Err(e) => {
            error!("Error checking bucket: {}", e);
            return error_response(e, &request_id);
        }
    }

    match state.metadata.delete_bucket_policy(&bucket).await {
        Ok(_) => {
            info!("Bucket policy deleted for {}", bucket);
            no_content_response(&request_id)
        }
        Err(e) => {
            error!("Error deleting bucket policy: {}", e);
            error_response(e, &request_id)
        }
    }
}

// ============================================================================
// Bucket ACL Handlers
// ============================================================================

/// GET /{bucket}?acl - Get bucket ACL
pub async fn get_bucket_acl(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
) -> impl IntoResponse {
    let request_id = generate_request_id();
    debug!("GetBucketAcl bucket={} request_id={}", bucket, request_id);

    let bucket_info = match state.metadata.get_bucket(&bucket).await {
        Ok(Some(b)) => b,
        Ok(None) => {
            return error_response(Error::NoSuchBucketNamed(bucket), &request_id);
        }
        Err(e) => {
            error!("Error checking bucket: {}", e);
            return error_response(e, &request_id);
        }
    };

    let acl = match state.metadata.get_bucket_acl(&bucket).await {
        Ok(Some(stored)) => match acl_from_storage(&stored) {
            Ok(acl) => acl,
            Err(e) => return error_response(e, &request_id),
        },
        Ok(None) => {
            let owner = Owner::new(&bucket_info.owner_id);
            AccessControlPolicy::from_canned(owner, CannedAcl::Private)
        }
        Err(e) => {
            error!("Error getting bucket ACL: {}", e);
            return error_response(e, &request_id);
        }
    };

    success_response(StatusCode::OK, acl.to_xml(), &request_id)
}

/// PUT /{bucket}?acl - Put bucket ACL
pub async fn put_bucket_acl(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
    headers: axum::http::HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let request_id = generate_request_id();
    debug!("PutBucketAcl bucket={} request_id={}", bucket, request_id);

    let bucket_info = match state.metadata.get_bucket(&bucket).await {
        Ok(Some(b)) => b,
        Ok(None) => {
            return error_response(Error::NoSuchBucketNamed(bucket), &request_id);
        }
        Err(e) => {
            error!("Error checking bucket: {}", e);
            return error_response(e, &request_id);
        }
    };

    let owner = Owner::new(&bucket_info.owner_id);

    let acl = match build_acl_from_request(owner, &headers, &body) {
        Ok(acl) => acl,
        Err(e) => return error_response(e, &request_id),
    };

    let stored = match acl_to_storage(&acl) {
        Ok(s) => s,
        Err(e) => return error_response(e, &request_id),
    };

    match state.metadata.put_bucket_acl(&bucket, &stored).await {
        Ok(_) => {
            info!("Bucket ACL set for {}", bucket);
            no_content_response(&request_id)
        }
        Err(e) => {
            error!("Error setting bucket ACL: {}", e);
            error_response(e, &request_id)
        }
    }
}

// ============================================================================
// Object ACL Handlers
// ============================================================================

/// GET /{bucket}/{key}?acl - Get object ACL
pub async fn get_object_acl(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    version_id: Option<String>,
) -> impl IntoResponse {
    let request_id = generate_request_id();
    debug!("GetObjectAcl bucket={} key={} request_id={}", bucket, key, request_id);

    let bucket_info = match state.metadata.get_bucket(&bucket).await {
        Ok(Some(b)) => b,
        Ok(None) => {
            return error_response(Error::NoSuchBucketNamed(bucket), &request_id);
        }
        Err(e) => {
            error!("Error checking bucket: {}", e);
            return error_response(e, &request_id);
        }
    };

    let object = match state.metadata.get_object_version(&bucket, &key, version_id.as_deref()).await {
        Ok(Some(obj)) => obj,
        Ok(None) => {
            return error_response(Error::NoSuchKeyNamed(key), &request_id);
        }
        Err(e) => {
            error!("Error checking object: {}", e);
            return error_response(e, &request_id);
        }
    };

    let acl = match state.metadata.get_object_acl(&bucket, &key, version_id.as_deref()).await {
        Ok(Some(stored)) => match acl_from_storage(&stored) {
            Ok(acl) => acl,
            Err(e) => return error_response(e, &request_id),
        },
        Ok(None) => {
            let owner = object.owner.clone().unwrap_or_else(|| Owner::new(&bucket_info.owner_id));
            AccessControlPolicy::from_canned(owner, CannedAcl::Private)
        }
        Err(e) => {
            error!("Error getting object ACL: {}", e);
            return error_response(e, &request_id);
        }
    };

    success_response(StatusCode::OK, acl.to_xml(), &request_id)
}

/// PUT /{bucket}/{key}?acl - Put object ACL
pub async fn put_object_acl(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    headers: axum::http::HeaderMap,
    version_id: Option<String>,
    body: Bytes,
) -> impl IntoResponse {
    let request_id = generate_request_id();
    debug!("PutObjectAcl bucket={} key={} request_id={}", bucket, key, request_id);

    let bucket_info = match state.metadata.get_bucket(&bucket).await {
        Ok(Some(b)) => b,
        Ok(None) => {
            return error_response(Error::NoSuchBucketNamed(bucket), &request_id);
        }
        Err(e) => {
            error!("Error checking bucket: {}", e);
            return error_response(e, &request_id);
        }
    };

    let object = match state.metadata.get_object_version(&bucket, &key, version_id.as_deref()).await {
        Ok(Some(obj)) => obj,
        Ok(None) => {
            return error_response(Error::NoSuchKeyNamed(key), &request_id);
        }
        Err(e) => {
            error!("Error checking object: {}", e);
            return error_response(e, &request_id);
        }
    };

    let owner = object.owner.unwrap_or_else(|| Owner::new(&bucket_info.owner_id));

    let acl = match build_acl_from_request(owner, &headers, &body) {
        Ok(acl) => acl,
        Err(e) => return error_response(e, &request_id),
    };

    let stored = match acl_to_storage(&acl) {
        Ok(s) => s,
        Err(e) => return error_response(e, &request_id),
    };

    match state.metadata.put_object_acl(&bucket, &key, version_id.as_deref(), &stored).await {
        Ok(_) => {
            info!("Object ACL set for {}/{}", bucket, key);
            no_content_response(&request_id)
        }
        Err(e) => {
            error!("Error setting object ACL: {}", e);
            error_response(e, &request_id)
        }
    }
}

/// Build an ACL from a PutXAcl request: canned ACL header, grant headers, or
/// an `<AccessControlPolicy>` XML body, in that precedence order.
fn build_acl_from_request(
    owner: Owner,
    headers: &axum::http::HeaderMap,
    body: &Bytes,
) -> Result<AccessControlPolicy, Error> {
    if let Some(canned) = headers
        .get("x-amz-acl")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<CannedAcl>().ok())
    {
        return Ok(AccessControlPolicy::from_canned(owner, canned));
    }

    let acl_headers = AclHeaders {
        canned_acl: None,
        grant_read: headers
            .get("x-amz-grant-read")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        grant_write: headers
            .get("x-amz-grant-write")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        grant_read_acp: headers
            .get("x-amz-grant-read-acp")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        grant_write_acp: headers
            .get("x-amz-grant-write-acp")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        grant_full_control: headers
            .get("x-amz-grant-full-control")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
    };

    if acl_headers.has_acl_headers() {
        return Ok(acl_headers.build_acl(owner));
    }

    if !body.is_empty() {
        let acl_str = String::from_utf8(body.to_vec())
            .map_err(|_| Error::MalformedACL("Invalid UTF-8 in ACL document".into()))?;
        return AccessControlPolicy::from_xml(&acl_str);
    }

    Ok(AccessControlPolicy::from_canned(owner, CannedAcl::Private))
}
