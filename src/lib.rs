//! # Reflect - reflection agents over chat-completion APIs
//!
//! Two agent patterns built on a blocking [`ChatModel`]:
//! a generate/reflect loop that keeps revising a draft against a critic,
//! and a single-shot actor that answers, critiques itself and proposes
//! search queries through a forced function call.

pub mod actor;
pub mod error;
pub mod graph;
pub mod model;
pub mod schema;
pub mod types;

pub mod prompts;
mod reflection;

// Re-exports
pub use actor::{parse_answer, ActorReport, StructuredActor};
pub use error::{ReflectError, Result};
pub use graph::{Graph, LoopState, MaxMessages, StopCondition};
pub use model::{ChatModel, Completion, OpenAiChat, ToolCall, ToolSpec};
pub use reflection::ReflectionAgent;
pub use schema::{answer_tool, Reflection, StructuredAnswer, ANSWER_TOOL};
pub use types::{Author, LoopConfig, Message, ModelConfig, Role, RunReport, Transcript, Usage};
