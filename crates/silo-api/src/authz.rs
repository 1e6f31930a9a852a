//! Authorization: bucket policy and ACL evaluation
//!
//! Applies the same precedence S3 itself uses: bucket owner can always act,
//! an explicit policy `Deny` always wins, an explicit policy `Allow` grants
//! access outright, and otherwise the ACL decides. Anything not covered by
//! either is an implicit deny.

use silo_core::{
    context::RequestContext,
    types::{AccessControlPolicy, CannedAcl, Owner, Permission, PolicyDecision, PolicyDocument, PolicyRequest},
    Error,
};

use crate::routes::policy::acl_from_storage;
use crate::server::AppState;

/// Checks whether `ctx` may perform `action` on `bucket`/`key` (key is
/// `None` for bucket-level operations such as ListBucket).
pub async fn authorize(
    state: &AppState,
    ctx: &RequestContext,
    bucket: &str,
    key: Option<&str>,
    action: &str,
    permission: Permission,
) -> Result<(), Error> {
    if ctx.is_admin() {
        return Ok(());
    }

    let bucket_info = state
        .metadata
        .get_bucket(bucket)
        .await
        .map_err(|_| Error::InternalError("metadata lookup failed".into()))?
        .ok_or_else(|| Error::NoSuchBucketNamed(bucket.to_string()))?;

    if let Some(owner) = ctx.owner() {
        if owner.id == bucket_info.owner_id {
            return Ok(());
        }
    }

    let principal = ctx.access_key().unwrap_or("*");
    let resource = match key {
        Some(k) => format!("arn:aws:s3:::{}/{}", bucket, k),
        None => format!("arn:aws:s3:::{}", bucket),
    };
    let policy_request = PolicyRequest::new(action, resource, principal);

    if let Some(policy_json) = state
        .metadata
        .get_bucket_policy(bucket)
        .await
        .map_err(|_| Error::InternalError("metadata lookup failed".into()))?
    {
        if let Ok(policy) = serde_json::from_str::<PolicyDocument>(&policy_json) {
            match policy.evaluate_detailed(&policy_request) {
                PolicyDecision::ExplicitDeny => return Err(Error::AccessDenied),
                PolicyDecision::Allow => return Ok(()),
                PolicyDecision::NotSpecified => {}
            }
        }
    }

    let acl = resolve_acl(state, bucket, key, &bucket_info.owner_id).await?;

    let allowed = match ctx.owner() {
        Some(owner) => acl.has_permission(&owner.id, permission, true),
        None => acl.allows_anonymous(permission),
    };

    if allowed {
        Ok(())
    } else {
        Err(Error::AccessDenied)
    }
}

async fn resolve_acl(
    state: &AppState,
    bucket: &str,
    key: Option<&str>,
    bucket_owner_id: &str,
) -> Result<AccessControlPolicy, Error> {
    let stored = match key {
        Some(k) => state
            .metadata
            .get_object_acl(bucket, k, None)
            .await
            .map_err(|_| Error::InternalError("metadata lookup failed".into()))?,
        None => state
            .metadata
            .get_bucket_acl(bucket)
            .await
            .map_err(|_| Error::InternalError("metadata lookup failed".into()))?,
    };

    match stored {
        Some(raw) => acl_from_storage(&raw),
        None => Ok(AccessControlPolicy::from_canned(
            Owner::new(bucket_owner_id),
            CannedAcl::Private,
        )),
    }
}

/// Maps an HTTP method plus the subresource query parameters present on a
/// request to a coarse S3 action name, for policy evaluation purposes.
pub fn action_for(method: &str, key: Option<&str>, query: &str) -> (&'static str, Permission) {
    let has = |name: &str| query.split('&').any(|p| p == name || p.starts_with(&format!("{}=", name)));

    match (method, key.is_some()) {
        ("GET", false) if has("acl") => ("s3:GetBucketAcl", Permission::ReadAcp),
        ("GET", false) if has("policy") => ("s3:GetBucketPolicy", Permission::Read),
        ("GET", false) if has("versioning") => ("s3:GetBucketVersioning", Permission::Read),
        ("GET", false) if has("lifecycle") => ("s3:GetLifecycleConfiguration", Permission::Read),
        ("GET", false) if has("uploads") => ("s3:ListMultipartUploadParts", Permission::Read),
        ("GET", false) if has("versions") => ("s3:ListBucketVersions", Permission::Read),
        ("GET", false) => ("s3:ListBucket", Permission::Read),
        ("PUT", false) if has("acl") => ("s3:PutBucketAcl", Permission::WriteAcp),
        ("PUT", false) if has("policy") => ("s3:PutBucketPolicy", Permission::Write),
        ("PUT", false) if has("versioning") => ("s3:PutBucketVersioning", Permission::Write),
        ("PUT", false) if has("lifecycle") => ("s3:PutLifecycleConfiguration", Permission::Write),
        ("PUT", false) => ("s3:CreateBucket", Permission::Write),
        ("DELETE", false) if has("policy") => ("s3:DeleteBucketPolicy", Permission::Write),
        ("DELETE", false) if has("lifecycle") => ("s3:DeleteLifecycleConfiguration", Permission::Write),
        ("DELETE", false) => ("s3:DeleteBucket", Permission::Write),
        ("POST", false) => ("s3:DeleteObject", Permission::Write),

        ("GET", true) if has("acl") => ("s3:GetObjectAcl", Permission::ReadAcp),
        ("GET", true) if has("tagging") => ("s3:GetObjectTagging", Permission::Read),
        ("GET", true) => ("s3:GetObject", Permission::Read),
        ("HEAD", _) => ("s3:GetObject", Permission::Read),
        ("PUT", true) if has("acl") => ("s3:PutObjectAcl", Permission::WriteAcp),
        ("PUT", true) if has("tagging") => ("s3:PutObjectTagging", Permission::Write),
        ("PUT", true) => ("s3:PutObject", Permission::Write),
        ("DELETE", true) if has("tagging") => ("s3:DeleteObjectTagging", Permission::Write),
        ("DELETE", true) => ("s3:DeleteObject", Permission::Write),
        ("POST", true) => ("s3:PutObject", Permission::Write),

        _ => ("s3:GetObject", Permission::Read),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silo_core::config::SiloConfig;
    use silo_core::types::{Bucket, Principal as PolicyPrincipal, PolicyDocument, Statement, StringOrArray};
    use std::collections::HashMap;
    use silo_metadata::MetadataStore;
    use silo_storage::LocalStorage;
    use std::sync::Arc;
    use std::time::Instant;
    use tempfile::tempdir;

    async fn state_with_bucket(owner_id: &str) -> (AppState, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        storage.init().await.unwrap();
        let db_url = format!("sqlite://{}/metadata.sqlite?mode=rwc", dir.path().display());
        let metadata = MetadataStore::new(&db_url).await.unwrap();
        metadata
            .create_bucket(&Bucket::new("b".into(), owner_id.into()))
            .await
            .unwrap();
        storage.create_bucket("b").await.unwrap();

        let state = AppState {
            config: Arc::new(SiloConfig::default()),
            storage: Arc::new(storage),
            metadata: Arc::new(metadata),
            start_time: Instant::now(),
        };
        (state, dir)
    }

    fn ctx_for(access_key: &str, owner_id: &str) -> RequestContext {
        RequestContext::authenticated(
            "req-1".into(),
            access_key.into(),
            Owner::new(owner_id),
            false,
        )
    }

    #[tokio::test]
    async fn owner_bypasses_policy_and_acl() {
        let (state, _dir) = state_with_bucket("owner-1").await;
        let ctx = ctx_for("owner-key", "owner-1");

        let result = authorize(&state, &ctx, "b", None, "s3:PutObject", Permission::Write).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn explicit_deny_beats_allow() {
        let (state, _dir) = state_with_bucket("owner-1").await;

        let policy = PolicyDocument::new()
            .add_statement(
                Statement::allow()
                    .with_actions(vec!["s3:*".to_string()])
                    .with_resources(vec!["arn:aws:s3:::b/*".to_string()]),
            )
            .add_statement({
                let mut deny = Statement::deny()
                    .with_actions(vec!["s3:PutObject".to_string()])
                    .with_resources(vec!["arn:aws:s3:::b/*".to_string()]);
                let mut aws = HashMap::new();
                aws.insert("AWS".to_string(), StringOrArray::String("bob".to_string()));
                deny.principal = Some(PolicyPrincipal::Specific(aws));
                deny
            });
        state
            .metadata
            .put_bucket_policy("b", &serde_json::to_string(&policy).unwrap())
            .await
            .unwrap();

        let bob = ctx_for("bob", "bob");
        let result = authorize(&state, &bob, "b", Some("k"), "s3:PutObject", Permission::Write).await;
        assert!(matches!(result, Err(Error::AccessDenied)));

        let alice = ctx_for("alice", "alice");
        let result = authorize(&state, &alice, "b", Some("k"), "s3:PutObject", Permission::Write).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn implicit_deny_falls_back_to_private_acl() {
        let (state, _dir) = state_with_bucket("owner-1").await;

        let stranger = ctx_for("stranger", "stranger");
        let result = authorize(&state, &stranger, "b", Some("k"), "s3:GetObject", Permission::Read).await;
        assert!(matches!(result, Err(Error::AccessDenied)));
    }

    #[test]
    fn action_for_recognizes_subresource_markers() {
        assert_eq!(action_for("GET", None, "acl").0, "s3:GetBucketAcl");
        assert_eq!(action_for("PUT", Some("k"), "tagging").0, "s3:PutObjectTagging");
        assert_eq!(action_for("GET", Some("k"), "").0, "s3:GetObject");
        assert_eq!(action_for("HEAD", None, "").0, "s3:GetObject");
    }
}
