use crate::data_structures::CaptionFragment;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_YOUTUBE_BASE_URL: &str = "https://www.youtube.com";

const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

static API_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).unwrap());

static TEXT_ELEMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<text\b([^>]*?)(?:/>|>(.*?)</text>)").unwrap());

static ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"(\w+)="([^"]*)""#).unwrap());

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("YouTube responded with status {0}")]
    Status(u16),
    #[error("invalid video id {0:?}: a video id is required, not a URL")]
    InvalidVideoId(String),
    #[error("the video {0} is no longer available")]
    VideoUnavailable(String),
    #[error("the video {video_id} is unplayable: {reason}")]
    Unplayable { video_id: String, reason: String },
    #[error("YouTube requires cookie consent before serving video {0}")]
    ConsentRequired(String),
    #[error("YouTube is blocking requests from this IP (too many requests)")]
    RequestBlocked,
    #[error("subtitles are disabled for video {0}")]
    TranscriptsDisabled(String),
    #[error("no transcript found for video {video_id} in languages {requested:?}; available: {available:?}")]
    NoTranscriptFound {
        video_id: String,
        requested: Vec<String>,
        available: Vec<String>,
    },
    #[error("invalid YouTube response: {0}")]
    InvalidResponse(String),
}

/// Captioning source returning the fragments of one video's caption track.
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    async fn fetch_transcript(&self, video_id: &str) -> Result<Vec<CaptionFragment>, TranscriptError>;
}

/// Everything after the last `v=`, cut at the first `&`.
///
/// Deliberately a plain substring rule: URLs without `v=` (e.g. `youtu.be/<id>`)
/// come back whole, which the caption provider then rejects.
pub fn extract_video_id(video_url: &str) -> String {
    let after_marker = video_url.rsplit("v=").next().unwrap_or(video_url);
    after_marker.split('&').next().unwrap_or(after_marker).to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    captions: Option<PlayerCaptions>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: String,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerCaptions {
    player_captions_tracklist_renderer: Option<CaptionTracklist>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTracklist {
    #[serde(default)]
    caption_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    pub kind: Option<String>,
}

impl CaptionTrack {
    pub fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

pub struct YoutubeClient {
    client: Client,
    base_url: String,
    languages: Vec<String>,
}

impl YoutubeClient {
    pub fn new(languages: Vec<String>, timeout: Option<Duration>) -> Result<Self, TranscriptError> {
        let mut builder = Client::builder().gzip(true);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let languages = if languages.is_empty() {
            vec!["en".to_string()]
        } else {
            languages
        };

        Ok(Self {
            client: builder.build()?,
            base_url: DEFAULT_YOUTUBE_BASE_URL.to_string(),
            languages,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    async fn fetch_watch_page(&self, video_id: &str) -> Result<String, TranscriptError> {
        debug!(video_id, base_url = %self.base_url, "Fetching watch page");

        let resp = self
            .client
            .get(format!("{}/watch", self.base_url))
            .query(&[("v", video_id)])
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(TranscriptError::Status(resp.status().as_u16()));
        }
        Ok(resp.text().await?)
    }

    async fn fetch_player(&self, video_id: &str, api_key: &str) -> Result<PlayerResponse, TranscriptError> {
        let body = serde_json::json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION
                }
            },
            "videoId": video_id
        });

        let resp = self
            .client
            .post(format!("{}/youtubei/v1/player", self.base_url))
            .query(&[("key", api_key)])
            .header("Accept-Language", "en-US,en;q=0.9")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(TranscriptError::RequestBlocked);
        }
        if !status.is_success() {
            return Err(TranscriptError::Status(status.as_u16()));
        }

        resp.json::<PlayerResponse>()
            .await
            .map_err(|e| TranscriptError::InvalidResponse(e.to_string()))
    }

    async fn fetch_timedtext(&self, track: &CaptionTrack) -> Result<String, TranscriptError> {
        let url = track.base_url.replace("&fmt=srv3", "");
        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(TranscriptError::Status(resp.status().as_u16()));
        }
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl CaptionProvider for YoutubeClient {
    async fn fetch_transcript(&self, video_id: &str) -> Result<Vec<CaptionFragment>, TranscriptError> {
        validate_video_id(video_id)?;

        let html = self.fetch_watch_page(video_id).await?;
        let api_key = extract_api_key(video_id, &html)?;

        let player = self.fetch_player(video_id, &api_key).await?;
        let tracks = caption_tracks(video_id, player)?;
        let track = select_track(&tracks, &self.languages).ok_or_else(|| {
            TranscriptError::NoTranscriptFound {
                video_id: video_id.to_string(),
                requested: self.languages.clone(),
                available: tracks.iter().map(|t| t.language_code.clone()).collect(),
            }
        })?;
        debug!(video_id, language = %track.language_code, generated = track.is_generated(), "Selected caption track");

        let xml = self.fetch_timedtext(track).await?;
        let fragments = parse_timedtext(&xml);
        if fragments.is_empty() {
            warn!(video_id, "Caption track contained no text fragments");
        }

        info!(video_id, fragments = fragments.len(), "Fetched transcript");
        Ok(fragments)
    }
}

fn validate_video_id(video_id: &str) -> Result<(), TranscriptError> {
    if video_id.is_empty() || video_id.starts_with("http://") || video_id.starts_with("https://") {
        return Err(TranscriptError::InvalidVideoId(video_id.to_string()));
    }
    Ok(())
}

fn extract_api_key(video_id: &str, html: &str) -> Result<String, TranscriptError> {
    if let Some(caps) = API_KEY_RE.captures(html) {
        return Ok(caps[1].to_string());
    }
    if html.contains("action=\"https://consent.youtube.com/s\"") {
        return Err(TranscriptError::ConsentRequired(video_id.to_string()));
    }
    if html.contains("class=\"g-recaptcha\"") {
        return Err(TranscriptError::RequestBlocked);
    }
    Err(TranscriptError::VideoUnavailable(video_id.to_string()))
}

fn caption_tracks(video_id: &str, player: PlayerResponse) -> Result<Vec<CaptionTrack>, TranscriptError> {
    if let Some(playability) = player.playability_status {
        match playability.status.as_str() {
            "OK" => {}
            "ERROR" => return Err(TranscriptError::VideoUnavailable(video_id.to_string())),
            "LOGIN_REQUIRED"
                if playability
                    .reason
                    .as_deref()
                    .is_some_and(|r| r.contains("not a bot")) =>
            {
                return Err(TranscriptError::RequestBlocked);
            }
            other => {
                return Err(TranscriptError::Unplayable {
                    video_id: video_id.to_string(),
                    reason: playability.reason.unwrap_or_else(|| other.to_string()),
                });
            }
        }
    }

    let tracks = player
        .captions
        .and_then(|c| c.player_captions_tracklist_renderer)
        .map(|r| r.caption_tracks)
        .unwrap_or_default();

    if tracks.is_empty() {
        return Err(TranscriptError::TranscriptsDisabled(video_id.to_string()));
    }
    Ok(tracks)
}

/// Per language in preference order, a manual track wins over an auto-generated one.
pub fn select_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Option<&'a CaptionTrack> {
    languages.iter().find_map(|lang| {
        let mut candidates = tracks.iter().filter(|t| &t.language_code == lang);
        let manual = candidates.clone().find(|t| !t.is_generated());
        manual.or_else(|| candidates.find(|t| t.is_generated()))
    })
}

pub fn parse_timedtext(xml: &str) -> Vec<CaptionFragment> {
    TEXT_ELEMENT_RE
        .captures_iter(xml)
        .filter_map(|caps| {
            let attrs = caps.get(1).map_or("", |m| m.as_str());
            let raw = caps.get(2).map_or("", |m| m.as_str());

            // Text is XML-escaped HTML, so decode twice before dropping markup
            let decoded = html_escape::decode_html_entities(&html_escape::decode_html_entities(raw)).into_owned();
            let text = TAG_RE.replace_all(&decoded, "").trim().to_string();
            if text.is_empty() {
                return None;
            }

            let mut start = 0.0;
            let mut duration = 0.0;
            for attr in ATTRIBUTE_RE.captures_iter(attrs) {
                match &attr[1] {
                    "start" => start = attr[2].parse().unwrap_or(0.0),
                    "dur" => duration = attr[2].parse().unwrap_or(0.0),
                    _ => {}
                }
            }

            Some(CaptionFragment { text, start, duration })
        })
        .collect()
}
