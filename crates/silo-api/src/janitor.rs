//! Background sweep that applies per-bucket lifecycle rules.
//!
//! Runs on its own task, independent of request handling. A tick visits
//! every bucket with a lifecycle configuration and, for each enabled rule,
//! expires current versions past their `Expiration.Days` and hard-deletes
//! noncurrent versions past their `NoncurrentVersionExpiration.NoncurrentDays`
//! (keeping `NewerNoncurrentVersions` of the latter regardless of age).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use silo_core::config::LifecycleWorkerConfig;
use silo_core::types::{Bucket, LifecycleFilter, LifecycleRule, NoncurrentVersionExpiration, RuleStatus};
use silo_core::Result;
use silo_metadata::repository::ObjectWithTags;
use silo_metadata::MetadataStore;
use silo_storage::{LocalStorage, StorageEngine};
use tracing::{info, warn};

use crate::routes::storage_key_for;

/// Upper bound on versions pulled per bucket/rule in one sweep. A bucket with
/// more live objects than this under a rule's prefix finishes expiring them
/// over several ticks rather than in one pass.
const SWEEP_PAGE_SIZE: i32 = 10_000;

pub struct LifecycleJanitor {
    metadata: Arc<MetadataStore>,
    storage: Arc<LocalStorage>,
    config: LifecycleWorkerConfig,
}

impl LifecycleJanitor {
    pub fn new(
        metadata: Arc<MetadataStore>,
        storage: Arc<LocalStorage>,
        config: LifecycleWorkerConfig,
    ) -> Self {
        Self {
            metadata,
            storage,
            config,
        }
    }

    /// Spawn the periodic sweep loop. Returns immediately if lifecycle
    /// processing is disabled in config.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            if !self.config.enabled {
                info!("lifecycle janitor disabled by configuration");
                return;
            }

            let period = Duration::from_secs(self.config.scan_interval_secs.max(1));
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                self.sweep_once().await;
            }
        })
    }

    /// Run a single sweep across every bucket with a lifecycle configuration.
    pub async fn sweep_once(&self) {
        let buckets = match self.metadata.get_buckets_with_lifecycle().await {
            Ok(b) => b,
            Err(e) => {
                warn!("janitor: failed to list lifecycle buckets: {}", e);
                return;
            }
        };

        let mut expired_total = 0usize;
        for bucket in &buckets {
            match self.sweep_bucket(bucket).await {
                Ok(n) => expired_total += n,
                Err(e) => warn!("janitor: sweep of bucket {} failed: {}", bucket, e),
            }
        }

        info!(
            "lifecycle janitor sweep complete: {} buckets visited, {} versions expired",
            buckets.len(),
            expired_total
        );
    }

    async fn sweep_bucket(&self, bucket: &str) -> Result<usize> {
        let lifecycle = match self.metadata.get_bucket_lifecycle(bucket).await? {
            Some(c) => c,
            None => return Ok(0),
        };
        let bucket_info = match self.metadata.get_bucket(bucket).await? {
            Some(b) => b,
            // Bucket was deleted concurrently; nothing left to sweep.
            None => return Ok(0),
        };

        let mut expired = 0usize;
        for rule in &lifecycle.rules {
            if rule.status != RuleStatus::Enabled {
                continue;
            }

            let prefix = rule_prefix(rule);
            let objects = self
                .metadata
                .get_objects_for_lifecycle(bucket, prefix.as_deref(), SWEEP_PAGE_SIZE)
                .await?;

            if let Some(expiration) = &rule.expiration {
                for obj in objects.iter().filter(|o| o.is_latest && !o.is_delete_marker) {
                    if !rule.filter.matches(&obj.key, &obj.tags.tags) {
                        continue;
                    }
                    if !expiration.should_expire(&obj.last_modified) {
                        continue;
                    }
                    match self.expire_current_version(&bucket_info, bucket, obj).await {
                        Ok(()) => expired += 1,
                        Err(e) => warn!(
                            "janitor: failed to expire {}/{} (rule {}): {}",
                            bucket, obj.key, rule.id, e
                        ),
                    }
                }
            }

            if let Some(nc_exp) = &rule.noncurrent_version_expiration {
                expired += self.expire_noncurrent(bucket, &objects, rule, nc_exp).await;
            }
        }

        Ok(expired)
    }

    /// Expire a rule's current version: delete marker on an ever-versioned
    /// bucket, hard delete otherwise. Mirrors the route handler's no-version-id
    /// DELETE semantics so the janitor and a manual delete behave identically.
    async fn expire_current_version(
        &self,
        bucket_info: &Bucket,
        bucket: &str,
        obj: &ObjectWithTags,
    ) -> Result<()> {
        if bucket_info.versioning.was_ever_enabled() {
            self.metadata.create_delete_marker(bucket, &obj.key).await?;
        } else {
            let storage_key = storage_key_for(&obj.key, &obj.version_id);
            self.storage.delete(bucket, &storage_key).await?;
            self.metadata.delete_object(bucket, &obj.key).await?;
        }
        Ok(())
    }

    /// Hard-delete noncurrent versions past their retention window, keeping
    /// the `NewerNoncurrentVersions` most recent noncurrent versions per key
    /// regardless of age.
    async fn expire_noncurrent(
        &self,
        bucket: &str,
        objects: &[ObjectWithTags],
        rule: &LifecycleRule,
        nc_exp: &NoncurrentVersionExpiration,
    ) -> usize {
        let mut by_key: HashMap<&str, Vec<&ObjectWithTags>> = HashMap::new();
        for obj in objects.iter().filter(|o| !o.is_latest && !o.is_delete_marker) {
            if !rule.filter.matches(&obj.key, &obj.tags.tags) {
                continue;
            }
            by_key.entry(obj.key.as_str()).or_default().push(obj);
        }

        let keep = nc_exp.newer_noncurrent_versions.unwrap_or(0) as usize;
        let mut expired = 0usize;

        for versions in by_key.into_values() {
            let mut versions = versions;
            versions.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));

            for obj in versions.into_iter().skip(keep) {
                if !nc_exp.should_expire(&obj.last_modified) {
                    continue;
                }

                let storage_key = storage_key_for(&obj.key, &obj.version_id);
                if let Err(e) = self.storage.delete(bucket, &storage_key).await {
                    warn!(
                        "janitor: failed to delete blob {}/{}@{}: {}",
                        bucket, obj.key, obj.version_id, e
                    );
                    continue;
                }

                match self
                    .metadata
                    .delete_object_version(bucket, &obj.key, &obj.version_id)
                    .await
                {
                    Ok(_) => expired += 1,
                    Err(e) => warn!(
                        "janitor: failed to delete version {}/{}@{}: {}",
                        bucket, obj.key, obj.version_id, e
                    ),
                }
            }
        }

        expired
    }
}

fn rule_prefix(rule: &LifecycleRule) -> Option<String> {
    match &rule.filter {
        LifecycleFilter::Prefix(p) => Some(p.clone()),
        LifecycleFilter::And { prefix, .. } => prefix.clone(),
        LifecycleFilter::All | LifecycleFilter::Tag(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silo_core::types::{Expiration, LifecycleConfiguration};
    use tempfile::tempdir;

    async fn fixtures() -> (Arc<MetadataStore>, Arc<LocalStorage>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        storage.init().await.unwrap();
        let db_url = format!("sqlite://{}/metadata.sqlite?mode=rwc", dir.path().display());
        let metadata = MetadataStore::new(&db_url).await.unwrap();
        (Arc::new(metadata), Arc::new(storage), dir)
    }

    #[tokio::test]
    async fn expires_current_versions_past_their_rule() {
        let (metadata, storage, _dir) = fixtures().await;
        metadata
            .create_bucket(&Bucket::new("b".into(), "owner".into()))
            .await
            .unwrap();
        storage.create_bucket("b").await.unwrap();

        let (etag, size) = storage
            .put("b", "old.txt", bytes::Bytes::from_static(b"hi"), None)
            .await
            .unwrap();
        let mut object = silo_core::types::Object::new(
            "b".into(),
            "old.txt".into(),
            size,
            etag,
            "text/plain".into(),
        );
        object.last_modified = chrono::Utc::now() - chrono::Duration::days(10);
        metadata.put_object(&object).await.unwrap();

        let mut config = LifecycleConfiguration::new();
        config
            .add_rule(
                LifecycleRule::new("expire-old")
                    .with_prefix_filter("")
                    .with_expiration_days(1),
            )
            .unwrap();
        metadata.put_bucket_lifecycle("b", &config).await.unwrap();

        let janitor = LifecycleJanitor::new(metadata.clone(), storage, LifecycleWorkerConfig::default());
        janitor.sweep_once().await;

        let remaining = metadata.get_object("b", "old.txt").await.unwrap();
        assert!(remaining.is_none() || remaining.unwrap().is_delete_marker);
    }

    #[test]
    fn rule_prefix_reads_and_prefix_only() {
        let all = LifecycleRule::new("r").with_expiration_days(1);
        assert_eq!(rule_prefix(&all), None);

        let prefixed = LifecycleRule::new("r")
            .with_prefix_filter("logs/")
            .with_expiration_days(1);
        assert_eq!(rule_prefix(&prefixed), Some("logs/".to_string()));
    }
}
