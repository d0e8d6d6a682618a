use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::error::{ReflectError, Result};
use crate::model::{ChatModel, Completion};
use crate::prompts::{build_actor_format_reminder, build_actor_system_prompt, FIRST_INSTRUCTION};
use crate::schema::{answer_tool, StructuredAnswer, ANSWER_TOOL};
use crate::types::{humantime_serde, Message, Transcript, Usage};

/// Final actor result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorReport {
    pub answer: StructuredAnswer,
    pub usage: Usage,
    #[serde(with = "humantime_serde")]
    pub execution_time: Duration,
}

/// Extract the `AnswerQuestion` call from a completion and parse it
pub fn parse_answer(completion: &Completion) -> Result<StructuredAnswer> {
    let call = completion
        .tool_call(ANSWER_TOOL)
        .ok_or_else(|| ReflectError::MissingToolCall(ANSWER_TOOL.to_string()))?;
    let answer: StructuredAnswer = serde_json::from_str(&call.arguments)?;
    answer.validate()?;
    Ok(answer)
}

/// Single-shot responder: answer, self-critique and search queries in one call
pub struct StructuredActor<M> {
    model: M,
    first_instruction: String,
}

impl<M: ChatModel> StructuredActor<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            first_instruction: FIRST_INSTRUCTION.to_string(),
        }
    }

    /// Replace the answer-length directive
    pub fn with_first_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.first_instruction = instruction.into();
        self
    }

    /// Messages sent for `transcript` at time `now`
    pub fn prompt(&self, transcript: &Transcript, now: NaiveDateTime) -> Vec<Message> {
        let time = now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string();

        let mut messages = Vec::with_capacity(transcript.len() + 2);
        messages.push(Message::system(build_actor_system_prompt(
            &time,
            &self.first_instruction,
        )));
        messages.extend(transcript.iter().cloned());
        messages.push(Message::system(build_actor_format_reminder()));
        messages
    }

    /// Answer the question in `transcript` using the current local time
    pub fn respond(&self, transcript: &Transcript) -> Result<ActorReport> {
        self.respond_at(transcript, Local::now().naive_local())
    }

    pub fn respond_at(&self, transcript: &Transcript, now: NaiveDateTime) -> Result<ActorReport> {
        if transcript.is_empty() {
            return Err(ReflectError::EmptyTranscript);
        }
        tracing::info!("Answering question");
        let start = Instant::now();

        let messages = self.prompt(transcript, now);
        let tool = answer_tool();
        let completion = self.model.complete(&messages, Some(&tool))?;
        let answer = parse_answer(&completion)?;

        tracing::debug!(
            search_queries = answer.search_queries.len(),
            total_tokens = completion.usage.total_tokens,
            "Structured answer parsed"
        );

        Ok(ActorReport {
            answer,
            usage: completion.usage,
            execution_time: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::ScriptedModel;
    use crate::model::ToolCall;
    use crate::types::Role;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn tool_reply(arguments: &str) -> Completion {
        let mut completion = Completion::text("").with_usage(Usage::new(120, 80));
        completion.tool_calls.push(ToolCall {
            id: "call_abc".to_string(),
            name: ANSWER_TOOL.to_string(),
            arguments: arguments.to_string(),
        });
        completion
    }

    const VALID_ARGS: &str = r#"{
        "answer": "Autonomous SOC platforms automate alert triage.",
        "reflection": {"missing": "Funding amounts.", "superfluous": "SIEM history."},
        "search_queries": ["autonomous SOC startups", "AI SOC series A 2024"]
    }"#;

    #[test]
    fn test_prompt_layout() {
        let model = ScriptedModel::default();
        let actor = StructuredActor::new(&model);
        let transcript = Transcript::seeded(Message::user("What is an autonomous SOC?"));

        let messages = actor.prompt(&transcript, noon());

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0]
            .content
            .contains("Current time: 2024-05-01T12:00:00.000000"));
        assert!(messages[0].content.contains(FIRST_INSTRUCTION));
        assert_eq!(messages[1].content, "What is an autonomous SOC?");
        assert_eq!(messages[2].role, Role::System);
        assert_eq!(messages[2].content, build_actor_format_reminder());
    }

    #[test]
    fn test_respond_parses_structured_answer() {
        let model = ScriptedModel::new([Ok(tool_reply(VALID_ARGS))]);
        let actor = StructuredActor::new(&model);
        let transcript = Transcript::seeded(Message::user("What is an autonomous SOC?"));

        let report = actor.respond_at(&transcript, noon()).unwrap();

        assert!(!report.answer.answer.is_empty());
        assert_eq!(report.answer.reflection.missing, "Funding amounts.");
        assert_eq!(report.answer.search_queries.len(), 2);
        assert_eq!(report.usage, Usage::new(120, 80));

        let requests = model.requests.borrow();
        let tool = requests[0].1.as_ref().unwrap();
        assert_eq!(tool.name, ANSWER_TOOL);
    }

    #[test]
    fn test_custom_first_instruction() {
        let model = ScriptedModel::default();
        let actor = StructuredActor::new(&model).with_first_instruction("Answer in one line.");
        let transcript = Transcript::seeded(Message::user("q"));

        let messages = actor.prompt(&transcript, noon());
        assert!(messages[0].content.contains("1. Answer in one line."));
    }

    #[test]
    fn test_missing_tool_call_is_error() {
        let model = ScriptedModel::texts(["I'd rather just chat."]);
        let actor = StructuredActor::new(&model);
        let transcript = Transcript::seeded(Message::user("q"));

        let result = actor.respond_at(&transcript, noon());
        assert!(matches!(result, Err(ReflectError::MissingToolCall(name)) if name == ANSWER_TOOL));
    }

    #[test]
    fn test_malformed_arguments_are_error() {
        let model = ScriptedModel::new([Ok(tool_reply(r#"{"answer": "partial"}"#))]);
        let actor = StructuredActor::new(&model);
        let transcript = Transcript::seeded(Message::user("q"));

        let result = actor.respond_at(&transcript, noon());
        assert!(matches!(result, Err(ReflectError::Json(_))));
    }

    #[test]
    fn test_too_many_queries_is_error() {
        let args = r#"{
            "answer": "a",
            "reflection": {"missing": "m", "superfluous": "s"},
            "search_queries": ["1", "2", "3", "4"]
        }"#;
        let model = ScriptedModel::new([Ok(tool_reply(args))]);
        let actor = StructuredActor::new(&model);
        let transcript = Transcript::seeded(Message::user("q"));

        let result = actor.respond_at(&transcript, noon());
        assert!(matches!(result, Err(ReflectError::Schema(_))));
    }

    #[test]
    fn test_empty_transcript_is_error() {
        let model = ScriptedModel::default();
        let actor = StructuredActor::new(&model);

        let result = actor.respond_at(&Transcript::new(), noon());
        assert!(matches!(result, Err(ReflectError::EmptyTranscript)));
        assert_eq!(model.calls(), 0);
    }
}
