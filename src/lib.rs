pub mod config;
pub mod error;
pub mod ratelimit;
pub mod resolver;
pub mod server;
pub mod youtube;

use url::Url;

pub use error::{Result, TranscriptError};
pub use resolver::{CaptionSource, TranscriptResolver};

const SHORT_LINK_DOMAIN: &str = "youtu.be";
const MAIN_DOMAIN: &str = "youtube.com";

/// Path prefixes on the main domain whose next segment is the video id
const ID_PATH_PREFIXES: &[&str] = &["embed", "shorts", "live", "v"];

/// Opaque, non-empty YouTube video identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoRef(String);

impl VideoRef {
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.is_empty() { None } else { Some(Self(id)) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VideoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single timed caption unit
#[derive(Debug, Clone)]
pub struct CaptionFragment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// Join caption texts with single spaces, keeping source order
pub fn join_fragments(fragments: &[CaptionFragment]) -> String {
    fragments
        .iter()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract the video id from a YouTube URL.
///
/// `youtu.be` links use the first non-empty path segment. `youtube.com` links use
/// the `v` query parameter, falling back to `/embed/ID`, `/shorts/ID`, `/live/ID`
/// and `/v/ID` paths. A missing scheme is treated as `https://`.
pub fn resolve_video_reference(input: &str) -> Result<VideoRef> {
    let input = input.trim();
    let invalid = || TranscriptError::InvalidUrl(input.to_string());

    let url = parse_url(input).ok_or_else(invalid)?;
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();

    let id = if host_matches(&host, SHORT_LINK_DOMAIN) {
        url.path_segments()
            .and_then(|mut segments| segments.find(|s| !s.is_empty()))
            .map(str::to_string)
    } else if host_matches(&host, MAIN_DOMAIN) {
        query_video_id(&url).or_else(|| path_video_id(&url))
    } else {
        return Err(invalid());
    };

    id.and_then(VideoRef::new).ok_or_else(invalid)
}

fn parse_url(input: &str) -> Option<Url> {
    match Url::parse(input) {
        Ok(url) => Some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("https://{input}")).ok(),
        Err(_) => None,
    }
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.strip_suffix(domain).is_some_and(|rest| rest.ends_with('.'))
}

fn query_video_id(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, value)| key == "v" && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

fn path_video_id(url: &Url) -> Option<String> {
    let segments: Vec<&str> = url.path_segments()?.collect();
    match segments.as_slice() {
        [prefix, id, ..] if ID_PATH_PREFIXES.contains(prefix) && !id.is_empty() => Some(id.to_string()),
        _ => None,
    }
}
