//! Gemini API client
//!
//! Implements the chat-stream and speech-synthesis collaborators against
//! the Generative Language API. Chat replies arrive as SSE-framed JSON
//! chunks; synthesized speech arrives as base64 PCM inline data.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::config::VoiceConfig;
use crate::providers::{ChatStream, ReplyStream, SpeechSynthesizer};
use crate::{Error, Result};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// One conversation entry in API wire format
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: &str, text: &str) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![Part {
                text: Some(text.to_string()),
                inline_data: None,
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: Option<String>,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: &'a [Content],
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
    speech_config: SpeechConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceSelection,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection {
    prebuilt_voice_config: PrebuiltVoice,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoice {
    voice_name: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GenerateResponse {
    /// First part of the first candidate, if any
    fn into_first_part(self) -> Option<Part> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
    }
}

/// Client for the hosted generative AI API
///
/// Keeps the multi-turn chat history internally, so each
/// [`stream_reply`](ChatStream::stream_reply) call continues the same
/// conversation.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    chat_model: String,
    tts_model: String,
    tts_voice: String,
    history: Arc<Mutex<Vec<Content>>>,
}

impl GeminiClient {
    /// Create a client for the given API key and model selection
    #[must_use]
    pub fn new(api_key: String, voice: &VoiceConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            chat_model: voice.chat_model.clone(),
            tts_model: voice.tts_model.clone(),
            tts_voice: voice.tts_voice.clone(),
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiClient {
    async fn synthesize(&self, text: &str) -> Result<Option<String>> {
        tracing::debug!(chars = text.len(), "starting speech synthesis");

        let contents = vec![Content::text("user", text)];
        let request = GenerateRequest {
            contents: &contents,
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: SpeechConfig {
                    voice_config: VoiceSelection {
                        prebuilt_voice_config: PrebuiltVoice {
                            voice_name: self.tts_voice.clone(),
                        },
                    },
                },
            }),
        };

        let url = format!("{API_BASE}/models/{}:generateContent", self.tts_model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "TTS API error");
            return Err(Error::Synthesis(format!("TTS API error {status}: {body}")));
        }

        let result: GenerateResponse = response.json().await?;
        let payload = result
            .into_first_part()
            .and_then(|p| p.inline_data)
            .map(|d| d.data);

        tracing::debug!(has_audio = payload.is_some(), "synthesis complete");
        Ok(payload)
    }
}

#[async_trait]
impl ChatStream for GeminiClient {
    async fn stream_reply(&self, text: &str) -> Result<ReplyStream> {
        // The user message joins the history up front; the model reply is
        // appended once the stream has been fully consumed
        let contents = {
            let mut history = self.history.lock().unwrap();
            history.push(Content::text("user", text));
            history.clone()
        };

        let request = GenerateRequest {
            contents: &contents,
            generation_config: None,
        };

        let url = format!(
            "{API_BASE}/models/{}:streamGenerateContent?alt=sse",
            self.chat_model
        );
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat API error");
            return Err(Error::Stream(format!("chat API error {status}: {body}")));
        }

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let history = Arc::clone(&self.history);

        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();
            let mut reply = String::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ = tx.send(Err(Error::Stream(e.to_string())));
                        return;
                    }
                };

                buffer.extend_from_slice(&chunk);
                while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&line);
                    let Some(data) = line.trim().strip_prefix("data:") else {
                        continue;
                    };

                    let data = data.trim();
                    if data.is_empty() || data == "[DONE]" {
                        continue;
                    }

                    match serde_json::from_str::<GenerateResponse>(data) {
                        Ok(parsed) => {
                            if let Some(text) = parsed.into_first_part().and_then(|p| p.text) {
                                reply.push_str(&text);
                                if tx.send(Ok(text)).is_err() {
                                    return;
                                }
                            }
                        }
                        Err(e) => {
                            let _ =
                                tx.send(Err(Error::Stream(format!("malformed stream chunk: {e}"))));
                            return;
                        }
                    }
                }
            }

            if !reply.is_empty() {
                history.lock().unwrap().push(Content::text("model", &reply));
            }
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}
