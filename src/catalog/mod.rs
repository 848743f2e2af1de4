// Catalog integration - turns a free-text query into playable tracks
// Searches go through yt-dlp's flat search so we never scrape pages ourselves.

use crate::audio::Track;
use crate::config::CatalogConfig;
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog tool '{0}' was not found on PATH")]
    ToolMissing(String),

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to run catalog tool: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<Track>, CatalogError>;
}

/// Search that never fails: an unavailable catalog is logged and yields no results
pub async fn search_tracks(catalog: &dyn Catalog, query: &str) -> Vec<Track> {
    match catalog.search(query).await {
        Ok(tracks) => {
            info!("Search '{}' returned {} tracks", query, tracks.len());
            tracks
        }
        Err(e) => {
            error!("Error searching tracks for '{}': {}", query, e);
            Vec::new()
        }
    }
}

pub struct YtDlpCatalog {
    binary: String,
    max_results: usize,
}

impl YtDlpCatalog {
    /// Make sure the search tool is there before the menu starts
    pub async fn initialize(config: &CatalogConfig) -> Result<Self, CatalogError> {
        which::which(&config.binary).map_err(|_| CatalogError::ToolMissing(config.binary.clone()))?;

        let output = Command::new(&config.binary).arg("--version").output().await?;
        if !output.status.success() {
            return Err(CatalogError::Unavailable(format!(
                "{} --version exited with {}",
                config.binary, output.status
            )));
        }
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!("Catalog client ready: {} {}", config.binary, version);

        Ok(Self {
            binary: config.binary.clone(),
            max_results: config.max_results.max(1),
        })
    }

    fn search_args(&self, query: &str) -> Vec<String> {
        vec![
            "--flat-playlist".to_string(),
            "--dump-json".to_string(),
            "--no-warnings".to_string(),
            "--ignore-config".to_string(),
            format!("ytsearch{}:{}", self.max_results, query),
        ]
    }
}

#[async_trait]
impl Catalog for YtDlpCatalog {
    async fn search(&self, query: &str) -> Result<Vec<Track>, CatalogError> {
        debug!("Searching catalog for '{}'", query);
        let output = Command::new(&self.binary)
            .args(self.search_args(query))
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("no error output")
                .to_string();
            return Err(CatalogError::Unavailable(format!("{} ({})", reason, output.status)));
        }

        Ok(parse_search_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

#[derive(Debug, Deserialize)]
struct SearchEntry {
    id: Option<String>,
    title: Option<String>,
    channel: Option<String>,
    uploader: Option<String>,
    duration: Option<f64>,
    ie_key: Option<String>,
    #[serde(default)]
    thumbnails: Vec<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

impl SearchEntry {
    // Channels and playlists come back from the same search under other extractors
    fn is_playable(&self) -> bool {
        let has_id = self.id.as_deref().is_some_and(|id| !id.trim().is_empty());
        let is_video = self.ie_key.as_deref().map_or(true, |key| key == "Youtube");
        has_id && is_video
    }

    fn into_track(self) -> Option<Track> {
        let id = self.id?;
        let duration = self
            .duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| d as u64);

        Some(Track::new(
            id,
            self.title.unwrap_or_else(|| "Untitled".to_string()),
            self.channel.or(self.uploader),
            duration,
            self.thumbnails.into_iter().next().map(|t| t.url),
        ))
    }
}

/// One JSON object per line, in result order
pub fn parse_search_output(stdout: &str) -> Vec<Track> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<SearchEntry>(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable search entry: {}", e);
                None
            }
        })
        .filter(SearchEntry::is_playable)
        .filter_map(SearchEntry::into_track)
        .collect()
}
