use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{ReflectError, Result};

/// Token usage statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    pub fn new(input: u64, output: u64) -> Self {
        Self {
            input_tokens: input,
            output_tokens: output,
            total_tokens: input + output,
        }
    }

    /// Accumulate usage from another instance
    pub fn add(&mut self, other: &Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// Wire role understood by chat-completion APIs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        f.write_str(s)
    }
}

/// Participant that produced a message.
///
/// The chat API only knows three roles, but a reflection loop has a
/// generator and a critic talking to each other. Each author maps onto a
/// fixed wire role: the critic speaks as `user` so the generator reads its
/// critique as feedback to address.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    Instruction,
    Human,
    Generator,
    Critic,
}

impl Author {
    /// Role this author speaks as on the wire
    pub fn role(self) -> Role {
        match self {
            Author::Instruction => Role::System,
            Author::Human | Author::Critic => Role::User,
            Author::Generator => Role::Assistant,
        }
    }
}

/// Role-tagged chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub author: Author,
    pub content: String,
}

impl Message {
    pub fn new(author: Author, content: impl Into<String>) -> Self {
        Self {
            role: author.role(),
            author,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Author::Instruction, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Author::Human, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Author::Generator, content)
    }

    /// Critique fed back into the conversation as user feedback
    pub fn critique(content: impl Into<String>) -> Self {
        Self::new(Author::Critic, content)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.role, self.content)
    }
}

/// Append-only conversation threaded through a run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a transcript from a single seed message
    pub fn seeded(seed: Message) -> Self {
        Self {
            messages: vec![seed],
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

impl From<Message> for Transcript {
    fn from(seed: Message) -> Self {
        Self::seeded(seed)
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for msg in &self.messages {
            writeln!(f, "{}", msg)?;
        }
        Ok(())
    }
}

/// Outcome of a generate/reflect run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub transcript: Transcript,
    /// Number of generation steps executed
    pub rounds: u32,
    pub usage: Usage,
    #[serde(with = "humantime_serde")]
    pub execution_time: Duration,
}

/// Configuration for the remote chat model
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Base URL for API (optional, for OpenAI-compatible endpoints)
    pub base_url: Option<String>,
    /// API key, required by the OpenAI adapter
    pub api_key: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4-turbo".to_string(),
            temperature: 0.7,
            max_tokens: None,
            base_url: None,
            api_key: None,
        }
    }
}

impl ModelConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Build a config from the process environment.
    ///
    /// Loads `.env` if present, then reads `OPENAI_API_KEY`,
    /// `OPENAI_BASE_URL` and `OPENAI_MODEL`.
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }

        let mut config = Self::default();
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            config.model = model;
        }
        config.base_url = std::env::var("OPENAI_BASE_URL").ok();
        config.api_key = std::env::var("OPENAI_API_KEY").ok();
        config
    }

    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }

    pub fn with_max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(ReflectError::Config("model name is empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ReflectError::Config(format!(
                "temperature {} outside 0.0..=2.0",
                self.temperature
            )));
        }
        if self.max_tokens == Some(0) {
            return Err(ReflectError::Config("max_tokens must be positive".to_string()));
        }
        Ok(())
    }
}

/// Configuration for the generate/reflect loop
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Stop once the transcript holds more than this many messages
    pub max_messages: usize,
    /// Hard cap on generation steps, whatever the stop condition says
    pub max_rounds: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_messages: 6,
            max_rounds: 10,
        }
    }
}

impl LoopConfig {
    /// Set the message threshold, raising the round cap so it can be reached
    pub fn with_max_messages(mut self, n: usize) -> Self {
        self.max_messages = n;
        let needed = u32::try_from(n.div_ceil(2)).unwrap_or(u32::MAX);
        self.max_rounds = self.max_rounds.max(needed);
        self
    }

    pub fn with_max_rounds(mut self, n: u32) -> Self {
        self.max_rounds = n;
        self
    }
}

/// humantime_serde module for Duration serialization
pub(crate) mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}s", duration.as_secs_f64()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.trim_end_matches('s');
        let secs: f64 = s.parse().map_err(serde::de::Error::custom)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
