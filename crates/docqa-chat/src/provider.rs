//! OpenAI-compatible chat completions with server-sent event streaming.
//!
//! The rendered prompt is sent as a single user message with `stream: true`;
//! each `data:` event carries a delta whose content becomes one fragment.
//! The stream ends at `data: [DONE]`.

use std::io::{BufRead, BufReader};
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use docqa_core::config::GenerationSettings;
use docqa_core::traits::{FragmentStream, Synthesizer};
use docqa_core::GenerationError;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 1],
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<Choice>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Delta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// One parsed server-sent event line.
#[derive(Debug, PartialEq)]
pub enum Event {
    /// Text to append to the answer.
    Fragment(String),
    /// The model reported a finish reason.
    Finished,
    Done,
    /// Blank lines, comments and events without content.
    Skip,
}

pub fn parse_event(line: &str) -> Result<Event, GenerationError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(data) = line.strip_prefix("data:") else { return Ok(Event::Skip) };
    let data = data.trim_start();
    if data == "[DONE]" { return Ok(Event::Done); }
    let chunk: ChatChunk = serde_json::from_str(data).map_err(|e| GenerationError::Decode(format!("{e}: {data}")))?;
    if let Some(err) = chunk.error { return Err(GenerationError::Stream(err.message)); }
    let mut text = String::new();
    let mut finished = false;
    for choice in chunk.choices {
        if let Some(c) = choice.delta.content { text.push_str(&c); }
        finished |= choice.finish_reason.is_some();
    }
    Ok(match (text.is_empty(), finished) {
        (false, _) => Event::Fragment(text),
        (true, true) => Event::Finished,
        (true, false) => Event::Skip,
    })
}

/// Fragments read lazily from an event stream. Terminal after `[DONE]` or the first error.
pub struct SseFragments<R> {
    reader: R,
    line: String,
    finished: bool,
    done: bool,
}

impl<R: BufRead> SseFragments<R> {
    pub fn new(reader: R) -> Self { Self { reader, line: String::new(), finished: false, done: false } }

    fn fail(&mut self, e: GenerationError) -> Option<Result<String, GenerationError>> {
        self.done = true;
        Some(Err(e))
    }
}

impl<R: BufRead> Iterator for SseFragments<R> {
    type Item = Result<String, GenerationError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => {
                    self.done = true;
                    if !self.finished { return Some(Err(GenerationError::Stream("stream ended before completion".to_string()))); }
                }
                Ok(_) => match parse_event(&self.line) {
                    Ok(Event::Fragment(text)) => return Some(Ok(text)),
                    Ok(Event::Finished) => self.finished = true,
                    Ok(Event::Done) => {
                        self.finished = true;
                        self.done = true;
                    }
                    Ok(Event::Skip) => {}
                    Err(e) => return self.fail(e),
                },
                Err(e) => return self.fail(GenerationError::Transport(e.to_string())),
            }
        }
        None
    }
}

/// Chat completions client for Groq and other OpenAI-compatible endpoints.
pub struct OpenAiCompatible {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    api_key: String,
}

impl OpenAiCompatible {
    pub fn new(settings: &GenerationSettings, api_key: String) -> Result<Self, GenerationError> {
        if !settings.endpoint.starts_with("http://") && !settings.endpoint.starts_with("https://") {
            return Err(GenerationError::Transport(format!("endpoint must start with http:// or https://, got {}", settings.endpoint)));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        info!(model = %settings.model_id, endpoint = %settings.endpoint, "generation provider ready");
        Ok(Self { client, endpoint: settings.endpoint.clone(), model: settings.model_id.clone(), temperature: settings.temperature, api_key })
    }
}

impl Synthesizer for OpenAiCompatible {
    fn stream(&self, prompt: &str) -> Result<FragmentStream, GenerationError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [Message { role: "user", content: prompt }],
            temperature: self.temperature,
            stream: true,
        };
        let response = self.client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Status { status: status.as_u16(), body: response.text().unwrap_or_default() });
        }
        debug!(model = %self.model, prompt_chars = prompt.len(), "generation stream opened");
        Ok(Box::new(SseFragments::new(BufReader::new(response))))
    }
}
