//! Where raw RISE responses come from.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rise_protocol::ParameterMetadataMap;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Access to RISE responses, fetched or cached.
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// A single response body, e.g. `/rise/api/location/1`.
    async fn get_or_fetch(&self, url: &str) -> Result<Value>;

    /// Every page of a paged endpoint as `(page_key, body)`, in page order.
    async fn get_or_fetch_all_pages(&self, endpoint: &str) -> Result<Vec<(String, Value)>>;

    /// Parameter metadata keyed by parameter id.
    async fn get_or_fetch_parameters(&self) -> Result<ParameterMetadataMap>;
}

/// Reads a snapshot directory laid out as:
///
/// ```text
/// <root>/<endpoint>/pages/page-<n>.json
/// <root>/<endpoint>/<id>.json
/// <root>/parameters.json
/// ```
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a RISE url or path to its snapshot file.
    ///
    /// `https://data.usbr.gov/rise/api/location/7?include=x` and `location/7`
    /// both map to `<root>/location/7.json`.
    pub fn path_for(&self, url: &str) -> Result<PathBuf> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let path = path.split("/rise/api/").last().unwrap_or(path);
        let mut segments = path
            .trim_matches('/')
            .rsplitn(2, '/')
            .filter(|s| !s.is_empty());

        match (segments.next(), segments.next()) {
            (Some(id), Some(endpoint)) => Ok(self.root.join(endpoint).join(format!("{}.json", id))),
            _ => Err(anyhow!("Cannot map '{}' to a snapshot file", url)),
        }
    }

    async fn read_json(path: &Path) -> Result<Value> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read snapshot file: {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot file: {:?}", path))
    }
}

/// `page-12.json` -> 12.
fn page_number(path: &Path) -> Option<u64> {
    let stem = path.file_stem()?.to_str()?;
    let digits: String = stem.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

#[async_trait]
impl LocationSource for FileSource {
    async fn get_or_fetch(&self, url: &str) -> Result<Value> {
        let path = self.path_for(url)?;
        tracing::debug!("Reading {} from {:?}", url, path);
        Self::read_json(&path).await
    }

    async fn get_or_fetch_all_pages(&self, endpoint: &str) -> Result<Vec<(String, Value)>> {
        let dir = self.root.join(endpoint.trim_matches('/')).join("pages");
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .with_context(|| format!("Failed to read page directory: {:?}", dir))?;

        let mut numbered = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            match page_number(&path) {
                Some(page) => numbered.push((page, path)),
                None => tracing::warn!("Ignoring page file without a page number: {:?}", path),
            }
        }
        numbered.sort_by_key(|(page, _)| *page);

        let mut pages = Vec::with_capacity(numbered.len());
        for (page, path) in numbered {
            pages.push((format!("page={}", page), Self::read_json(&path).await?));
        }

        tracing::info!("Loaded {} pages of {} from {:?}", pages.len(), endpoint, dir);
        Ok(pages)
    }

    async fn get_or_fetch_parameters(&self) -> Result<ParameterMetadataMap> {
        let path = self.root.join("parameters.json");
        let value = Self::read_json(&path).await?;
        serde_json::from_value(value)
            .with_context(|| format!("Invalid parameter metadata in {:?}", path))
    }
}
