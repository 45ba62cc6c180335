use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use regex::Regex;
use serde::Deserialize;

use crate::error::{Result, TranscriptError};
use crate::resolver::CaptionSource;
use crate::{CaptionFragment, VideoRef};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

#[derive(Debug, Deserialize)]
struct InnerTubePlayerResponse {
    #[serde(rename = "playabilityStatus")]
    playability_status: Option<PlayabilityStatus>,
    captions: Option<CaptionsData>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaptionsData {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    player_captions_tracklist_renderer: Option<CaptionTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
struct CaptionTracklistRenderer {
    #[serde(rename = "captionTracks")]
    caption_tracks: Option<Vec<CaptionTrack>>,
}

#[derive(Debug, Deserialize)]
struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
}

/// Where the watch page and InnerTube API live
const DEFAULT_BASE_URL: &str = "https://www.youtube.com";

/// Caption source backed by YouTube's watch page and InnerTube player API
pub struct YouTubeCaptions {
    client: reqwest::Client,
    base_url: String,
    languages: Vec<String>,
    fallback_to_any_language: bool,
}

impl YouTubeCaptions {
    pub fn new(languages: Vec<String>, fallback_to_any_language: bool, connect_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            languages,
            fallback_to_any_language,
        })
    }

    /// Point the watch page and player requests at another host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn fetch_player_response(&self, video: &VideoRef) -> Result<InnerTubePlayerResponse> {
        // Step 1: Fetch the watch page to get the InnerTube API key
        let watch_url = format!("{}/watch", self.base_url);
        debug!("Fetching watch page: {watch_url}?v={video}");

        let page_html = self
            .client
            .get(&watch_url)
            .query(&[("v", video.as_str())])
            .header("Accept-Language", "en-US")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let api_key = extract_api_key(&page_html)?;
        debug!("Extracted InnerTube API key: {api_key}");

        // Step 2: Call InnerTube player endpoint
        let player_url = format!("{}/youtubei/v1/player", self.base_url);

        let hl = self.languages.first().map(String::as_str).unwrap_or("en");
        let body = serde_json::json!({
            "context": {
                "client": {
                    "hl": hl,
                    "gl": "US",
                    "clientName": "WEB",
                    "clientVersion": "2.20241126.01.00"
                }
            },
            "videoId": video.as_str()
        });

        let resp = self
            .client
            .post(&player_url)
            .query(&[("key", api_key.as_str()), ("prettyPrint", "false")])
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(resp)
    }
}

#[async_trait]
impl CaptionSource for YouTubeCaptions {
    async fn fetch_fragments(&self, video: &VideoRef) -> Result<Vec<CaptionFragment>> {
        let resp = self.fetch_player_response(video).await?;
        let track = select_track(&resp, video, &self.languages, self.fallback_to_any_language)?;
        debug!("Using caption track: lang={}", track.language_code);

        // Step 3: Fetch the caption XML
        let caption_url = track.base_url.replace("&fmt=srv3", "");
        let caption_xml = self
            .client
            .get(&caption_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_caption_xml(&caption_xml)
    }
}

/// Pick the caption track to download, or say why there is none
fn select_track<'a>(
    resp: &'a InnerTubePlayerResponse,
    video: &VideoRef,
    languages: &[String],
    fallback_to_any_language: bool,
) -> Result<&'a CaptionTrack> {
    if let Some(status) = &resp.playability_status {
        if matches!(status.status.as_deref(), Some("ERROR") | Some("UNPLAYABLE")) {
            debug!(
                "Video {video} is not playable: {}",
                status.reason.as_deref().unwrap_or("no reason given")
            );
            return Err(TranscriptError::TranscriptNotFound(video.clone()));
        }
    }

    let tracks = resp
        .captions
        .as_ref()
        .and_then(|c| c.player_captions_tracklist_renderer.as_ref())
        .ok_or_else(|| TranscriptError::TranscriptsDisabled(video.clone()))?
        .caption_tracks
        .as_deref()
        .unwrap_or_default();

    // Preferred languages in order, then optionally whatever comes first
    languages
        .iter()
        .find_map(|lang| tracks.iter().find(|t| &t.language_code == lang))
        .or_else(|| if fallback_to_any_language { tracks.first() } else { None })
        .ok_or_else(|| TranscriptError::TranscriptNotFound(video.clone()))
}

fn extract_api_key(html: &str) -> Result<String> {
    let patterns = [r#""INNERTUBE_API_KEY"\s*:\s*"([^"]+)""#, r#"innertubeApiKey\s*[=:]\s*"([^"]+)""#];

    for pattern in patterns {
        let re = Regex::new(pattern).map_err(|e| TranscriptError::Unexpected(e.to_string()))?;
        if let Some(caps) = re.captures(html) {
            return Ok(caps[1].to_string());
        }
    }

    Err(TranscriptError::Unexpected(
        "could not extract InnerTube API key from watch page".to_string(),
    ))
}

fn parse_caption_xml(xml: &str) -> Result<Vec<CaptionFragment>> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut fragments = Vec::new();
    // (start, duration, text so far) of the cue being read
    let mut current: Option<(f64, f64, String)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                let mut start = 0.0;
                let mut dur = 0.0;
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value);
                    match attr.key.as_ref() {
                        b"start" => start = value.parse::<f64>().unwrap_or(0.0),
                        // Some tracks omit dur on the last cue
                        b"dur" => dur = value.parse::<f64>().unwrap_or(0.0),
                        _ => {}
                    }
                }
                current = Some((start, dur, String::new()));
            }
            Ok(Event::Text(ref e)) => {
                // Inline markup like <font> splits a cue into several text events
                if let Some((_, _, text)) = current.as_mut() {
                    text.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"text" => {
                if let Some((start, duration, raw_text)) = current.take() {
                    let text = html_escape::decode_html_entities(&raw_text).to_string();
                    if !text.trim().is_empty() {
                        fragments.push(CaptionFragment { text, start, duration });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(TranscriptError::Unexpected(format!("error parsing caption XML: {e}")));
            }
            _ => {}
        }
    }

    Ok(fragments)
}
