use std::time::Instant;

use crate::error::{ReflectError, Result};
use crate::graph::{LoopState, MaxMessages, StopCondition};
use crate::model::ChatModel;
use crate::prompts::{generation_system_prompt, reflection_system_prompt};
use crate::types::{LoopConfig, Message, RunReport, Transcript, Usage};

/// Prefix a transcript with a system instruction
fn with_system_prompt(system: String, transcript: &Transcript) -> Vec<Message> {
    let mut messages = Vec::with_capacity(transcript.len() + 1);
    messages.push(Message::system(system));
    messages.extend(transcript.iter().cloned());
    messages
}

/// Generate/reflect loop that iteratively improves a draft
pub struct ReflectionAgent<M> {
    model: M,
    config: LoopConfig,
    stop: Box<dyn StopCondition>,
}

impl<M: ChatModel> ReflectionAgent<M> {
    /// Create an agent that stops after `config.max_messages` messages
    pub fn new(model: M, config: LoopConfig) -> Self {
        let stop = Box::new(MaxMessages(config.max_messages));
        Self { model, config, stop }
    }

    /// Replace the default message-count stop condition
    pub fn with_stop_condition(mut self, stop: impl StopCondition + 'static) -> Self {
        self.stop = Box::new(stop);
        self
    }

    /// Produce a new draft, or a revision addressing the latest critique
    pub fn generate(&self, transcript: &Transcript) -> Result<(Message, Usage)> {
        if transcript.is_empty() {
            return Err(ReflectError::EmptyTranscript);
        }
        tracing::info!("Generating tweet");

        let messages = with_system_prompt(generation_system_prompt(), transcript);
        let completion = self.model.complete(&messages, None)?;
        Ok((Message::assistant(completion.content), completion.usage))
    }

    /// Critique the latest draft.
    ///
    /// The critique comes back as a user message whatever role the model
    /// replied with, so the next generation step treats it as feedback.
    pub fn reflect(&self, transcript: &Transcript) -> Result<(Message, Usage)> {
        if transcript.is_empty() {
            return Err(ReflectError::EmptyTranscript);
        }
        tracing::info!("Reflecting on tweet");

        let messages = with_system_prompt(reflection_system_prompt(), transcript);
        let completion = self.model.complete(&messages, None)?;
        Ok((Message::critique(completion.content), completion.usage))
    }

    /// Run the loop from a single seed message until the stop condition holds
    pub fn run(&self, seed: Message) -> Result<RunReport> {
        let start = Instant::now();
        let mut transcript = Transcript::seeded(seed);
        let mut state = LoopState::Generate;
        let mut rounds = 0u32;
        let mut usage = Usage::default();

        loop {
            let next = state.next(&*self.stop, &transcript, rounds);
            if next == LoopState::Terminated {
                break;
            }

            match state {
                LoopState::Generate => {
                    if rounds >= self.config.max_rounds {
                        return Err(ReflectError::RoundLimitReached(self.config.max_rounds));
                    }
                    let (draft, step_usage) = self.generate(&transcript)?;
                    usage.add(&step_usage);
                    transcript.push(draft);
                    rounds += 1;
                }
                LoopState::Reflect => {
                    let (critique, step_usage) = self.reflect(&transcript)?;
                    usage.add(&step_usage);
                    transcript.push(critique);
                }
                LoopState::Terminated => break,
            }

            tracing::debug!(
                from = state.node_name(),
                to = next.node_name(),
                messages = transcript.len(),
                rounds,
                "Loop transition"
            );
            state = next;
        }

        tracing::debug!(
            rounds,
            messages = transcript.len(),
            total_tokens = usage.total_tokens,
            "Reflection loop finished"
        );

        Ok(RunReport {
            transcript,
            rounds,
            usage,
            execution_time: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::ScriptedModel;
    use crate::model::Completion;
    use crate::types::{Author, Role};

    fn scripted_rounds(n: usize) -> ScriptedModel {
        let mut texts = Vec::new();
        for i in 1..=n {
            texts.push(format!("draft {}", i));
            texts.push(format!("critique {}", i));
        }
        ScriptedModel::texts(texts)
    }

    #[test]
    fn test_default_run_stops_at_seven_messages() {
        let model = scripted_rounds(5);
        let agent = ReflectionAgent::new(&model, LoopConfig::default());

        let report = agent.run(Message::user("Make this tweet better: ...")).unwrap();

        assert_eq!(report.transcript.len(), 7);
        assert_eq!(report.rounds, 3);
        assert_eq!(model.calls(), 6);

        let roles: Vec<Role> = report.transcript.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::User,
                Role::Assistant,
                Role::User,
                Role::Assistant,
                Role::User,
                Role::Assistant,
                Role::User,
            ]
        );
        assert_eq!(report.transcript.messages()[5].content, "draft 3");
        assert_eq!(report.transcript.messages()[6].author, Author::Critic);
    }

    #[test]
    fn test_transcript_grows_two_per_round() {
        for max_messages in [1usize, 3, 5] {
            let model = scripted_rounds(5);
            let config = LoopConfig::default().with_max_messages(max_messages);
            let report = ReflectionAgent::new(&model, config)
                .run(Message::user("seed"))
                .unwrap();

            assert_eq!(report.transcript.len(), 1 + 2 * report.rounds as usize);
            assert_eq!(report.transcript.len(), max_messages + 2);
        }
    }

    #[test]
    fn test_large_threshold_finishes_under_round_cap() {
        let model = scripted_rounds(20);
        let config = LoopConfig::default().with_max_messages(25);
        let report = ReflectionAgent::new(&model, config)
            .run(Message::user("seed"))
            .unwrap();

        assert_eq!(report.rounds, 13);
        assert_eq!(report.transcript.len(), 27);
    }

    #[test]
    fn test_generation_request_layout() {
        let model = ScriptedModel::texts(["first draft"]);
        let agent = ReflectionAgent::new(&model, LoopConfig::default());
        let transcript = Transcript::seeded(Message::user("tweet about Rust"));

        let (draft, _) = agent.generate(&transcript).unwrap();

        assert_eq!(draft, Message::assistant("first draft"));
        let requests = model.requests.borrow();
        let (messages, tool) = &requests[0];
        assert!(tool.is_none());
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, generation_system_prompt());
        assert_eq!(messages[1].content, "tweet about Rust");
    }

    #[test]
    fn test_reflection_relabels_reply_as_user() {
        let mut reply = Completion::text("Needs a stronger hook.");
        reply.role = Role::System;
        let model = ScriptedModel::new([Ok(reply)]);
        let agent = ReflectionAgent::new(&model, LoopConfig::default());

        let mut transcript = Transcript::seeded(Message::user("seed"));
        transcript.push(Message::assistant("draft"));
        let (critique, _) = agent.reflect(&transcript).unwrap();

        assert_eq!(critique.role, Role::User);
        assert_eq!(critique.author, Author::Critic);
        assert_eq!(critique.content, "Needs a stronger hook.");
        let requests = model.requests.borrow();
        assert_eq!(requests[0].0[0].content, reflection_system_prompt());
    }

    #[test]
    fn test_steps_reject_empty_transcript() {
        let model = ScriptedModel::texts(["unused"]);
        let agent = ReflectionAgent::new(&model, LoopConfig::default());

        assert!(matches!(
            agent.generate(&Transcript::new()),
            Err(ReflectError::EmptyTranscript)
        ));
        assert!(matches!(
            agent.reflect(&Transcript::new()),
            Err(ReflectError::EmptyTranscript)
        ));
        assert_eq!(model.calls(), 0);
    }

    #[test]
    fn test_remote_failure_propagates() {
        let model = ScriptedModel::new([
            Ok(Completion::text("draft")),
            Err(ReflectError::Config("rate limited".to_string())),
        ]);
        let agent = ReflectionAgent::new(&model, LoopConfig::default());

        let result = agent.run(Message::user("seed"));
        assert!(matches!(result, Err(ReflectError::Config(_))));
        assert_eq!(model.calls(), 2);
    }

    #[test]
    fn test_custom_stop_condition() {
        let model = scripted_rounds(5);
        let agent = ReflectionAgent::new(&model, LoopConfig::default())
            .with_stop_condition(|_: &Transcript, rounds: u32| rounds >= 1);

        let report = agent.run(Message::user("seed")).unwrap();
        assert_eq!(report.rounds, 1);
        assert_eq!(report.transcript.len(), 3);
    }

    #[test]
    fn test_round_limit() {
        let model = scripted_rounds(10);
        let config = LoopConfig::default().with_max_rounds(2);
        let agent = ReflectionAgent::new(&model, config)
            .with_stop_condition(|_: &Transcript, _: u32| false);

        let result = agent.run(Message::user("seed"));
        assert!(matches!(result, Err(ReflectError::RoundLimitReached(2))));
        assert_eq!(model.calls(), 4);
    }

    #[test]
    fn test_usage_accumulates() {
        let replies = (0..6)
            .map(|i| Ok(Completion::text(format!("reply {}", i)).with_usage(Usage::new(10, 2))));
        let model = ScriptedModel::new(replies);
        let report = ReflectionAgent::new(&model, LoopConfig::default())
            .run(Message::user("seed"))
            .unwrap();

        assert_eq!(report.usage, Usage::new(60, 12));
    }
}
