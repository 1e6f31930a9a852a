//! S3 Server implementation

use axum::{
    middleware,
    routing::{delete, get, head, post, put},
    Router,
};
use silo_core::{config::SiloConfig, Result};
use silo_metadata::MetadataStore;
use silo_storage::LocalStorage;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::info;

use crate::janitor::LifecycleJanitor;
use crate::middleware::{s3_auth, s3_authz};
use crate::routes;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SiloConfig>,
    pub storage: Arc<LocalStorage>,
    pub metadata: Arc<MetadataStore>,
    pub start_time: Instant,
}

/// S3 Server
pub struct S3Server {
    config: SiloConfig,
}

impl S3Server {
    pub fn new(config: SiloConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<()> {
        let start_time = Instant::now();

        // Initialize storage
        let storage = LocalStorage::new(&self.config.storage.data_dir);
        storage.init().await?;

        // Initialize metadata store
        let metadata = MetadataStore::new(&self.config.database.url).await?;

        // Create root user if not exists
        let root_user = silo_core::types::User::root(
            self.config.auth.root_access_key.clone(),
            self.config.auth.root_secret_key.clone(),
        );
        if metadata
            .get_user_by_access_key(&root_user.access_key)
            .await?
            .is_none()
        {
            metadata.create_user(&root_user).await?;
            info!(
                "Created root user with access key: {}",
                root_user.access_key
            );
        }

        let storage = Arc::new(storage);
        let metadata = Arc::new(metadata);

        let janitor = LifecycleJanitor::new(
            metadata.clone(),
            storage.clone(),
            self.config.lifecycle.clone(),
        );
        let _janitor_handle = janitor.spawn();

        let state = AppState {
            config: Arc::new(self.config.clone()),
            storage,
            metadata,
            start_time,
        };

        let app = Self::create_router(state);
        let addr = format!(
            "{}:{}",
            self.config.server.bind_address, self.config.server.port
        );

        self.run_http(app, &addr).await
    }

    async fn run_http(self, app: Router, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;

        info!("Silo S3 API server listening on http://{}", addr);
        info!("Access Key: {}", self.config.auth.root_access_key);

        axum::serve(listener, app).await?;
        Ok(())
    }

    /// Build the axum router over a given [`AppState`]. Exposed so integration
    /// tests can drive the full middleware stack with `tower::ServiceExt::oneshot`
    /// instead of binding a real socket.
    pub fn create_router(state: AppState) -> Router {
        Router::new()
            // Service operations
            .route("/", get(routes::list_buckets))
            // Bucket operations
            .route("/{bucket}", head(routes::head_bucket))
            .route("/{bucket}", get(routes::bucket_get_handler)) // ListObjects, ListObjectVersions, GetBucketVersioning, GetBucketLifecycle, ListMultipartUploads
            .route("/{bucket}", put(routes::bucket_put_handler)) // CreateBucket, PutBucketVersioning, or PutBucketLifecycle
            .route("/{bucket}", delete(routes::bucket_delete_handler)) // DeleteBucket or DeleteBucketLifecycle
            .route("/{bucket}", post(routes::bucket_post_handler)) // DeleteObjects
            // Object operations (including multipart, versioning, and tagging)
            .route("/{bucket}/{*key}", head(routes::head_object))
            .route("/{bucket}/{*key}", get(routes::object_get_handler)) // GetObject, ListParts, or GetObjectTagging
            .route("/{bucket}/{*key}", put(routes::object_put_handler)) // PutObject, CopyObject, UploadPart, or PutObjectTagging
            .route("/{bucket}/{*key}", delete(routes::object_delete_handler)) // DeleteObject, AbortMultipart, or DeleteObjectTagging
            .route("/{bucket}/{*key}", post(routes::object_post_handler)) // CreateMultipart or CompleteMultipart
            .layer(middleware::from_fn_with_state(state.clone(), s3_authz))
            .layer(middleware::from_fn_with_state(state.clone(), s3_auth))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::default().include_headers(true)),
            )
            .layer(CorsLayer::permissive())
            .with_state(state)
    }
}
