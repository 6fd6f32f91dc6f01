//! Object storage abstraction.
//!
//! The pipeline only needs four operations: paginated listing under a
//! prefix, metadata probes, whole-object text download (manifests and
//! checkpoints are small), and server-side copy into the target bucket.
//! [`S3Store`] backs production; [`InMemoryStore`] backs tests and can
//! inject listing failures per prefix to exercise event isolation.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::error::CloudError;

/// One listed object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSummary {
    pub key: String,
    pub size_bytes: Option<i64>,
}

/// Metadata from a head probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectMeta {
    pub key: String,
    pub size_bytes: Option<i64>,
    pub media_type: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every object under `prefix`, following pagination. Keys that
    /// are bare "directory" placeholders (trailing slash) are skipped.
    async fn list_prefix(&self, prefix: &str) -> Result<Vec<ObjectSummary>, CloudError>;

    /// Probe one object's metadata; `Ok(None)` when it does not exist.
    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>, CloudError>;

    /// Download one object as UTF-8 text.
    async fn get_text(&self, key: &str) -> Result<String, CloudError>;

    /// Server-side copy within/between buckets.
    async fn copy(
        &self,
        source_key: &str,
        target_bucket: &str,
        target_key: &str,
    ) -> Result<(), CloudError>;
}

// ---------------------------------------------------------------------------
// S3
// ---------------------------------------------------------------------------

/// S3-backed store rooted at one source bucket.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Store {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client from the ambient AWS environment. An endpoint
    /// override (for localstack/minio) switches on path-style addressing.
    pub async fn from_env(bucket: impl Into<String>) -> Result<Self, CloudError> {
        let cfg = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let endpoint_url = std::env::var("ARKIVO_S3_ENDPOINT_URL").ok();

        let mut builder = aws_sdk_s3::config::Builder::from(&cfg);
        if let Some(url) = &endpoint_url {
            builder = builder.endpoint_url(url).force_path_style(true);
        }
        Ok(Self::new(
            aws_sdk_s3::Client::from_conf(builder.build()),
            bucket,
        ))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_prefix(&self, prefix: &str) -> Result<Vec<ObjectSummary>, CloudError> {
        let mut summaries = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut req = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);
            if let Some(t) = token.as_deref() {
                req = req.continuation_token(t);
            }
            let resp = req
                .send()
                .await
                .map_err(|e| CloudError::Storage(format!("list_objects_v2 {prefix}: {e}")))?;

            if let Some(contents) = resp.contents {
                for obj in contents {
                    let Some(key) = obj.key else { continue };
                    if key.ends_with('/') {
                        continue;
                    }
                    summaries.push(ObjectSummary {
                        key,
                        size_bytes: obj.size,
                    });
                }
            }
            match resp.next_continuation_token {
                Some(t) => token = Some(t),
                None => break,
            }
        }
        debug!(prefix, objects = summaries.len(), "listed prefix");
        Ok(summaries)
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>, CloudError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(out) => Ok(Some(ObjectMeta {
                key: key.to_string(),
                size_bytes: out.content_length,
                media_type: out.content_type,
            })),
            Err(err) => {
                let service = err.as_service_error();
                if service.map(|e| e.is_not_found()).unwrap_or(false) {
                    Ok(None)
                } else {
                    Err(CloudError::Storage(format!("head_object {key}: {err}")))
                }
            }
        }
    }

    async fn get_text(&self, key: &str) -> Result<String, CloudError> {
        let obj = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| CloudError::Storage(format!("get_object {key}: {e}")))?;
        let bytes = obj
            .body
            .collect()
            .await
            .map_err(|e| CloudError::Storage(format!("collect {key}: {e}")))?
            .into_bytes();
        String::from_utf8(bytes.to_vec())
            .map_err(|_| CloudError::Storage(format!("{key} is not valid UTF-8")))
    }

    async fn copy(
        &self,
        source_key: &str,
        target_bucket: &str,
        target_key: &str,
    ) -> Result<(), CloudError> {
        self.client
            .copy_object()
            .copy_source(format!("{}/{}", self.bucket, source_key))
            .bucket(target_bucket)
            .key(target_key)
            .send()
            .await
            .map_err(|e| {
                CloudError::Storage(format!("copy {source_key} -> {target_key}: {e}"))
            })?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory fake
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct InMemoryState {
    /// key -> (body, media type)
    objects: BTreeMap<String, (Vec<u8>, Option<String>)>,
    /// Prefixes whose listing fails, for failure-isolation tests.
    failing_prefixes: Vec<String>,
    /// (source_key, target_bucket, target_key) copies, in order.
    copies: Vec<(String, String, String)>,
}

/// In-memory [`ObjectStore`] used by pipeline tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<InMemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: &str, body: &[u8], media_type: Option<&str>) {
        self.state
            .lock()
            .expect("store lock")
            .objects
            .insert(key.to_string(), (body.to_vec(), media_type.map(String::from)));
    }

    pub fn put_text(&self, key: &str, body: &str) {
        self.put(key, body.as_bytes(), Some("text/plain"));
    }

    /// Make every `list_prefix` under `prefix` fail.
    pub fn fail_listing(&self, prefix: &str) {
        self.state
            .lock()
            .expect("store lock")
            .failing_prefixes
            .push(prefix.to_string());
    }

    /// Copies performed so far, in order.
    pub fn copies(&self) -> Vec<(String, String, String)> {
        self.state.lock().expect("store lock").copies.clone()
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn list_prefix(&self, prefix: &str) -> Result<Vec<ObjectSummary>, CloudError> {
        let state = self.state.lock().expect("store lock");
        if state.failing_prefixes.iter().any(|p| prefix.starts_with(p)) {
            return Err(CloudError::Storage(format!("injected failure for {prefix}")));
        }
        Ok(state
            .objects
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, (body, _))| ObjectSummary {
                key: k.clone(),
                size_bytes: Some(body.len() as i64),
            })
            .collect())
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>, CloudError> {
        let state = self.state.lock().expect("store lock");
        Ok(state.objects.get(key).map(|(body, media_type)| ObjectMeta {
            key: key.to_string(),
            size_bytes: Some(body.len() as i64),
            media_type: media_type.clone(),
        }))
    }

    async fn get_text(&self, key: &str) -> Result<String, CloudError> {
        let state = self.state.lock().expect("store lock");
        let (body, _) = state
            .objects
            .get(key)
            .ok_or_else(|| CloudError::NotFound(key.to_string()))?;
        String::from_utf8(body.clone())
            .map_err(|_| CloudError::Storage(format!("{key} is not valid UTF-8")))
    }

    async fn copy(
        &self,
        source_key: &str,
        target_bucket: &str,
        target_key: &str,
    ) -> Result<(), CloudError> {
        let mut state = self.state.lock().expect("store lock");
        let (body, media_type) = state
            .objects
            .get(source_key)
            .cloned()
            .ok_or_else(|| CloudError::NotFound(source_key.to_string()))?;
        // The fake is bucket-blind: target keys land in the same namespace,
        // which lets one instance stand in for both staging and target.
        state
            .objects
            .insert(target_key.to_string(), (body, media_type));
        state.copies.push((
            source_key.to_string(),
            target_bucket.to_string(),
            target_key.to_string(),
        ));
        Ok(())
    }
}
