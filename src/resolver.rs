use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};

use crate::error::{Result, TranscriptError};
use crate::{CaptionFragment, VideoRef, join_fragments, resolve_video_reference};

/// Where caption fragments come from
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// Fetch the caption fragments for a video, in playback order
    async fn fetch_fragments(&self, video: &VideoRef) -> Result<Vec<CaptionFragment>>;
}

/// Turns a video URL into one block of transcript text
#[derive(Clone)]
pub struct TranscriptResolver {
    source: Arc<dyn CaptionSource>,
    timeout: Duration,
}

impl TranscriptResolver {
    pub fn new(source: Arc<dyn CaptionSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Fetch the captions for `video` and join them with single spaces
    pub async fn fetch_transcript(&self, video: &VideoRef) -> Result<String> {
        debug!("Fetching transcript for video ID: {video}");

        let fragments = tokio::time::timeout(self.timeout, self.source.fetch_fragments(video))
            .await
            .map_err(|_| {
                TranscriptError::UpstreamUnavailable(format!(
                    "caption source did not answer within {:?}",
                    self.timeout
                ))
            })??;

        info!("Transcript fetched for {video}: {} fragments", fragments.len());
        Ok(join_fragments(&fragments))
    }

    /// Resolve `url` to a video id, then fetch its transcript
    pub async fn get_video_transcript(&self, url: &str) -> Result<String> {
        let video = resolve_video_reference(url)?;
        self.fetch_transcript(&video).await
    }
}
