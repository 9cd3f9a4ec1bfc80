use async_trait::async_trait;
use groq_briefs::groq::{CompletionChoice, CompletionMessage, CompletionProvider, CompletionResponse, GroqError};
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedCall {
    pub model: String,
    pub prompt: String,
}

#[derive(Clone)]
pub struct MockCompletionProvider {
    pub reply: Option<String>,
    pub fail_with: Option<(u16, String)>,
    pub calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockCompletionProvider {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            fail_with: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn without_choices() -> Self {
        Self {
            reply: None,
            fail_with: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(status: u16, msg: &str) -> Self {
        Self {
            reply: None,
            fail_with: Some((status, msg.to_string())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    async fn complete(&self, model: &str, prompt: &str) -> Result<CompletionResponse, GroqError> {
        self.calls.lock().unwrap().push(RecordedCall {
            model: model.to_string(),
            prompt: prompt.to_string(),
        });

        if let Some((status, message)) = &self.fail_with {
            return Err(GroqError::Api {
                status: *status,
                message: message.clone(),
            });
        }

        let choices = self
            .reply
            .iter()
            .map(|text| CompletionChoice {
                index: 0,
                message: CompletionMessage {
                    role: "assistant".to_string(),
                    content: Some(text.clone()),
                },
                finish_reason: Some("stop".to_string()),
            })
            .collect();

        Ok(CompletionResponse {
            id: Some("chatcmpl-mock".to_string()),
            choices,
        })
    }
}
