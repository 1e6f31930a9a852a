//! Filesystem-backed blob storage.
//!
//! Each committed object version is written through a scratch temp file and
//! atomically renamed into its final path, so a crash mid-write never leaves
//! partial bytes visible under a path a reader can reach (spec invariant:
//! "partial writes never appear under a committed path"). Multipart parts
//! are staged the same way under a per-upload `.mpu/<uploadId>/` directory
//! and concatenated into the final blob when the upload completes.

use async_trait::async_trait;
use bytes::Bytes;
use silo_core::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info};

/// Storage engine trait: streaming byte storage keyed by (bucket, key).
/// Callers are responsible for folding versionId into `key` so that no two
/// versions of an object collide on disk (see `storage_key_for` in
/// silo-api's routes module).
#[async_trait]
pub trait StorageEngine: Send + Sync {
    /// Write `data` to `bucket/key`, verifying it against `expected_sha256`
    /// (if present) before the rename commits it. Returns (hex sha256, size).
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        expected_sha256: Option<&str>,
    ) -> Result<(String, i64)>;

    /// Retrieve the full object body.
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes>;

    /// Retrieve `[start, end]` inclusive. `start` and `end` must already be
    /// validated against the object's recorded size by the caller; this
    /// layer re-validates against the blob's actual size as a last line of
    /// defense and fails `InvalidRange` (416) if `start` is out of bounds.
    async fn get_range(&self, bucket: &str, key: &str, start: i64, end: i64) -> Result<Bytes>;

    /// Delete is idempotent: deleting a path that doesn't exist is not an error.
    async fn delete(&self, bucket: &str, key: &str) -> Result<()>;

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool>;

    async fn size(&self, bucket: &str, key: &str) -> Result<i64>;

    async fn create_bucket(&self, bucket: &str) -> Result<()>;

    /// Fails `BucketNotEmpty` if any committed blob remains under the bucket.
    async fn delete_bucket(&self, bucket: &str) -> Result<()>;

    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    /// Stage one multipart part under the upload's scratch directory.
    /// Restaging the same part number overwrites the prior staged bytes.
    async fn stage_part(
        &self,
        bucket: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
        expected_sha256: Option<&str>,
    ) -> Result<(String, i64)>;

    /// Concatenate the given staged parts, in order, into the final object
    /// at `bucket/key` and release the scratch directory. Returns the total
    /// byte size of the assembled object.
    async fn complete_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_numbers: &[i32],
    ) -> Result<i64>;

    /// Release all scratch state for an upload. Idempotent.
    async fn abort_multipart(&self, bucket: &str, upload_id: &str) -> Result<()>;
}

/// Local filesystem storage engine.
pub struct LocalStorage {
    data_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir).await?;
        info!("Storage initialized at {:?}", self.data_dir);
        Ok(())
    }

    /// Objects live under a two-level hash-of-key prefix so a bucket with
    /// many keys never puts too many files in one directory; `key` already
    /// encodes the versionId (see `storage_key_for`), so distinct versions
    /// never collide on this path.
    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        let hash = silo_crypto::sha256_hash(key.as_bytes());
        let prefix = &hash[..2];
        self.data_dir
            .join(bucket)
            .join("objects")
            .join(prefix)
            .join(&hash)
    }

    fn bucket_path(&self, bucket: &str) -> PathBuf {
        self.data_dir.join(bucket)
    }

    fn tmp_dir(&self, bucket: &str) -> PathBuf {
        self.bucket_path(bucket).join(".tmp")
    }

    fn mpu_dir(&self, bucket: &str, upload_id: &str) -> PathBuf {
        self.bucket_path(bucket).join(".mpu").join(upload_id)
    }

    fn part_path(&self, bucket: &str, upload_id: &str, part_number: i32) -> PathBuf {
        self.mpu_dir(bucket, upload_id).join(part_number.to_string())
    }

    fn temp_path(&self, bucket: &str) -> PathBuf {
        self.tmp_dir(bucket).join(uuid::Uuid::new_v4().to_string())
    }

    /// Write `data` to a scratch temp file, hashing it incrementally, then
    /// atomically rename it into `dest`. On a checksum mismatch the temp
    /// file is removed and the final path is never touched.
    async fn write_checked(
        &self,
        bucket: &str,
        dest: &Path,
        data: &Bytes,
        expected_sha256: Option<&str>,
    ) -> Result<String> {
        let tmp_dir = self.tmp_dir(bucket);
        fs::create_dir_all(&tmp_dir).await?;
        let tmp_path = self.temp_path(bucket);

        {
            let mut file = fs::File::create(&tmp_path).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
        }
        let computed = silo_crypto::sha256_hash(data.as_ref());

        if let Some(expected) = expected_sha256 {
            if !expected.eq_ignore_ascii_case(&computed) {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(Error::ContentSha256Mismatch);
            }
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(&tmp_path, dest).await?;
        Ok(computed)
    }

    /// Health check - verify storage is accessible.
    pub async fn health_check(&self) -> Result<()> {
        if !self.data_dir.exists() {
            return Err(Error::InternalError("Data directory does not exist".to_string()));
        }

        let test_file = self.data_dir.join(".health_check");
        match fs::write(&test_file, "ok").await {
            Ok(_) => {
                let _ = fs::remove_file(&test_file).await;
                Ok(())
            }
            Err(e) => Err(Error::InternalError(format!("Storage not writable: {}", e))),
        }
    }
}

#[async_trait]
impl StorageEngine for LocalStorage {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        expected_sha256: Option<&str>,
    ) -> Result<(String, i64)> {
        let path = self.object_path(bucket, key);
        let len = data.len() as i64;
        let etag = self.write_checked(bucket, &path, &data, expected_sha256).await?;
        debug!("Stored object {}/{} ({} bytes)", bucket, key, len);
        Ok((etag, len))
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let path = self.object_path(bucket, key);

        if !path.exists() {
            return Err(Error::NoSuchKey);
        }

        let data = fs::read(&path).await?;
        debug!("Retrieved object {}/{} ({} bytes)", bucket, key, data.len());

        Ok(Bytes::from(data))
    }

    async fn get_range(&self, bucket: &str, key: &str, start: i64, end: i64) -> Result<Bytes> {
        let path = self.object_path(bucket, key);

        let metadata = fs::metadata(&path).await.map_err(|_| Error::NoSuchKey)?;
        let size = metadata.len() as i64;

        if start < 0 || start >= size {
            return Err(Error::InvalidRange(
                "The requested range is not satisfiable".into(),
            ));
        }

        let end = end.min(size - 1);
        let len = (end - start + 1).max(0) as usize;

        let mut file = fs::File::open(&path).await?;
        file.seek(std::io::SeekFrom::Start(start as u64)).await?;

        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer).await?;

        Ok(Bytes::from(buffer))
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        let path = self.object_path(bucket, key);

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Deleted object {}/{}", bucket, key);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        Ok(())
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        let path = self.object_path(bucket, key);
        Ok(path.exists())
    }

    async fn size(&self, bucket: &str, key: &str) -> Result<i64> {
        let path = self.object_path(bucket, key);

        let metadata = fs::metadata(&path).await.map_err(|_| Error::NoSuchKey)?;
        Ok(metadata.len() as i64)
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let path = self.bucket_path(bucket);
        fs::create_dir_all(path.join("objects")).await?;
        info!("Created bucket {}", bucket);
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let path = self.bucket_path(bucket);

        if path.exists() {
            if dir_has_entries(&path.join("objects")).await? {
                return Err(Error::BucketNotEmpty);
            }

            fs::remove_dir_all(&path).await?;
            info!("Deleted bucket {}", bucket);
        }

        Ok(())
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        let path = self.bucket_path(bucket);
        Ok(path.exists())
    }

    async fn stage_part(
        &self,
        bucket: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
        expected_sha256: Option<&str>,
    ) -> Result<(String, i64)> {
        fs::create_dir_all(self.mpu_dir(bucket, upload_id)).await?;
        let path = self.part_path(bucket, upload_id, part_number);
        let len = data.len() as i64;
        let etag = self.write_checked(bucket, &path, &data, expected_sha256).await?;
        debug!(
            "Staged part {} for upload {} ({} bytes)",
            part_number, upload_id, len
        );
        Ok((etag, len))
    }

    async fn complete_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_numbers: &[i32],
    ) -> Result<i64> {
        let tmp_dir = self.tmp_dir(bucket);
        fs::create_dir_all(&tmp_dir).await?;
        let tmp_path = self.temp_path(bucket);

        let mut total: i64 = 0;
        {
            let mut out = fs::File::create(&tmp_path).await?;
            for part_number in part_numbers {
                let part_path = self.part_path(bucket, upload_id, *part_number);
                let mut part_file = fs::File::open(&part_path)
                    .await
                    .map_err(|_| Error::InvalidPart(format!("missing staged part {}", part_number)))?;
                let mut buf = Vec::new();
                part_file.read_to_end(&mut buf).await?;
                out.write_all(&buf).await?;
                total += buf.len() as i64;
            }
            out.sync_all().await?;
        }

        let dest = self.object_path(bucket, key);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(&tmp_path, &dest).await?;

        self.abort_multipart(bucket, upload_id).await?;

        Ok(total)
    }

    async fn abort_multipart(&self, bucket: &str, upload_id: &str) -> Result<()> {
        let dir = self.mpu_dir(bucket, upload_id);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}

async fn dir_has_entries(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    let mut stack = vec![path.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                stack.push(entry.path());
            } else {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (LocalStorage, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        storage.init().await.unwrap();
        storage.create_bucket("b").await.unwrap();
        (storage, dir)
    }

    #[tokio::test]
    async fn round_trips_bytes_exactly() {
        let (storage, _dir) = store().await;
        let body = Bytes::from_static(b"Hello, Silo!");
        let (etag, size) = storage.put("b", "k", body.clone(), None).await.unwrap();
        assert_eq!(size, body.len() as i64);
        assert_eq!(etag, silo_crypto::sha256_hash(&body));

        let got = storage.get("b", "k").await.unwrap();
        assert_eq!(got, body);
    }

    #[tokio::test]
    async fn range_read_slices_correctly() {
        let (storage, _dir) = store().await;
        let body = Bytes::from_static(b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ");
        storage.put("b", "k", body.clone(), None).await.unwrap();

        let slice = storage.get_range("b", "k", 5, 15).await.unwrap();
        assert_eq!(slice, Bytes::from_static(b"56789ABCDEF"));
    }

    #[tokio::test]
    async fn range_out_of_bounds_is_rejected() {
        let (storage, _dir) = store().await;
        let body = Bytes::from_static(b"short");
        storage.put("b", "k", body, None).await.unwrap();

        let err = storage.get_range("b", "k", 100, 200).await.unwrap_err();
        assert_eq!(err.code(), "InvalidRange");
    }

    #[tokio::test]
    async fn checksum_mismatch_leaves_no_blob() {
        let (storage, _dir) = store().await;
        let body = Bytes::from_static(b"payload");
        let err = storage
            .put("b", "k", body, Some("deadbeef"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "XAmzContentSHA256Mismatch");
        assert!(!storage.exists("b", "k").await.unwrap());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (storage, _dir) = store().await;
        storage.delete("b", "missing").await.unwrap();
        storage.delete("b", "missing").await.unwrap();
    }

    #[tokio::test]
    async fn multipart_concatenates_parts_in_order() {
        let (storage, _dir) = store().await;
        storage
            .stage_part("b", "u1", 1, Bytes::from_static(b"Part 1 Data "), None)
            .await
            .unwrap();
        storage
            .stage_part("b", "u1", 2, Bytes::from_static(b"Part 2 Data"), None)
            .await
            .unwrap();

        let total = storage
            .complete_multipart("b", "m", "u1", &[1, 2])
            .await
            .unwrap();
        assert_eq!(total, "Part 1 Data Part 2 Data".len() as i64);

        let data = storage.get("b", "m").await.unwrap();
        assert_eq!(data, Bytes::from_static(b"Part 1 Data Part 2 Data"));
    }

    #[tokio::test]
    async fn abort_multipart_is_idempotent_and_releases_scratch() {
        let (storage, _dir) = store().await;
        storage
            .stage_part("b", "u2", 1, Bytes::from_static(b"data"), None)
            .await
            .unwrap();
        storage.abort_multipart("b", "u2").await.unwrap();
        storage.abort_multipart("b", "u2").await.unwrap();
    }

    #[tokio::test]
    async fn delete_bucket_refuses_when_not_empty() {
        let (storage, _dir) = store().await;
        storage
            .put("b", "k", Bytes::from_static(b"x"), None)
            .await
            .unwrap();

        let err = storage.delete_bucket("b").await.unwrap_err();
        assert_eq!(err.code(), "BucketNotEmpty");

        storage.delete("b", "k").await.unwrap();
        storage.delete_bucket("b").await.unwrap();
        assert!(!storage.bucket_exists("b").await.unwrap());
    }
}
