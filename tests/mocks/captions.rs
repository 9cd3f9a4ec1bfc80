use async_trait::async_trait;
use groq_briefs::data_structures::CaptionFragment;
use groq_briefs::youtube::{CaptionProvider, TranscriptError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct MockCaptionProvider {
    pub tracks: HashMap<String, Vec<CaptionFragment>>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockCaptionProvider {
    pub fn with_track(mut self, video_id: &str, texts: &[&str]) -> Self {
        let fragments = texts
            .iter()
            .enumerate()
            .map(|(i, text)| CaptionFragment {
                text: text.to_string(),
                start: i as f64 * 2.0,
                duration: 2.0,
            })
            .collect();
        self.tracks.insert(video_id.to_string(), fragments);
        self
    }
}

#[async_trait]
impl CaptionProvider for MockCaptionProvider {
    async fn fetch_transcript(&self, video_id: &str) -> Result<Vec<CaptionFragment>, TranscriptError> {
        self.calls.lock().unwrap().push(video_id.to_string());
        self.tracks
            .get(video_id)
            .cloned()
            .ok_or_else(|| TranscriptError::TranscriptsDisabled(video_id.to_string()))
    }
}
