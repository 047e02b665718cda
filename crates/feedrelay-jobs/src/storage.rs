//! Object storage client
//!
//! Thin wrapper over the S3 SDK shared by the contacts, relay and apiexport
//! jobs. Credentials and region come from the default provider chain; the
//! bucket is passed per call because two of the jobs span a source and a
//! destination bucket in the same run.

use aws_config::BehaviorVersion;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use feedrelay_common::{FeedError, Result};
use tracing::{debug, info};

#[derive(Clone)]
pub struct Storage {
    client: Client,
}

impl Storage {
    /// Build a client from the ambient AWS environment
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self {
            client: Client::new(&config),
        }
    }

    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// List every key under a prefix, following pagination; an optional
    /// suffix filter is applied per key.
    pub async fn list_keys(
        &self,
        bucket: &str,
        prefix: &str,
        suffix: Option<&str>,
    ) -> Result<Vec<String>> {
        debug!("Listing objects in s3://{}/{}", bucket, prefix);

        let mut keys = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| FeedError::storage(DisplayErrorContext(e)))?;
            for object in page.contents() {
                let Some(key) = object.key() else { continue };
                if suffix.is_none_or(|s| key.ends_with(s)) {
                    keys.push(key.to_string());
                }
            }
        }

        debug!("Found {} keys under s3://{}/{}", keys.len(), bucket, prefix);
        Ok(keys)
    }

    pub async fn download(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        debug!("Downloading s3://{}/{}", bucket, key);

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| FeedError::storage(DisplayErrorContext(e)))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(FeedError::storage)?
            .into_bytes()
            .to_vec();

        debug!("Downloaded {} bytes from s3://{}/{}", data.len(), bucket, key);
        Ok(data)
    }

    pub async fn upload(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<()> {
        debug!("Uploading {} bytes to s3://{}/{}", data.len(), bucket, key);

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| FeedError::storage(DisplayErrorContext(e)))?;

        info!("Uploaded s3://{}/{}", bucket, key);
        Ok(())
    }

    pub async fn copy(&self, bucket: &str, source_key: &str, dest_key: &str) -> Result<()> {
        self.client
            .copy_object()
            .bucket(bucket)
            .copy_source(format!("{}/{}", bucket, source_key))
            .key(dest_key)
            .send()
            .await
            .map_err(|e| FeedError::storage(DisplayErrorContext(e)))?;

        debug!("Copied s3://{}/{} to {}", bucket, source_key, dest_key);
        Ok(())
    }

    pub async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| FeedError::storage(DisplayErrorContext(e)))?;

        debug!("Deleted s3://{}/{}", bucket, key);
        Ok(())
    }
}
