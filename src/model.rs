use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionNamedToolChoice, ChatCompletionRequestAssistantMessageArgs,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionToolArgs,
        ChatCompletionToolChoiceOption, ChatCompletionToolType, CreateChatCompletionRequestArgs,
        FunctionName, FunctionObjectArgs, Role as WireRole,
    },
    Client,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio::runtime::Runtime;

use crate::error::{ReflectError, Result};
use crate::types::{Message, ModelConfig, Role, Usage};

/// Function tool offered to the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema of the function arguments
    pub parameters: serde_json::Value,
}

/// Tool call requested by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw JSON arguments as returned by the API
    pub arguments: String,
}

/// Result of a single chat completion call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// Role the service attributed to its reply
    pub role: Role,
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Usage,
}

impl Completion {
    /// Plain-text reply with no tool calls
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
            usage: Usage::default(),
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }

    /// First tool call with the given name
    pub fn tool_call(&self, name: &str) -> Option<&ToolCall> {
        self.tool_calls.iter().find(|c| c.name == name)
    }
}

/// Blocking chat-completion backend.
///
/// One call is one round trip to the remote service. When `tool` is given
/// the backend must force the model to call it.
pub trait ChatModel {
    fn complete(&self, messages: &[Message], tool: Option<&ToolSpec>) -> Result<Completion>;
}

impl<M: ChatModel + ?Sized> ChatModel for &M {
    fn complete(&self, messages: &[Message], tool: Option<&ToolSpec>) -> Result<Completion> {
        (**self).complete(messages, tool)
    }
}

impl<M: ChatModel + ?Sized> ChatModel for Box<M> {
    fn complete(&self, messages: &[Message], tool: Option<&ToolSpec>) -> Result<Completion> {
        (**self).complete(messages, tool)
    }
}

/// OpenAI Chat Completions backend
pub struct OpenAiChat {
    config: ModelConfig,
    client: Client<OpenAIConfig>,
    runtime: Runtime,
}

impl OpenAiChat {
    /// Create a client from explicit configuration
    ///
    /// Fails with [`ReflectError::MissingApiKey`] when the config has no key.
    pub fn new(config: ModelConfig) -> Result<Self> {
        config.validate()?;
        let api_key = config
            .api_key
            .as_deref()
            .ok_or(ReflectError::MissingApiKey)?;

        let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(ref url) = config.base_url {
            openai_config = openai_config.with_api_base(url);
        }

        let client = Client::with_config(openai_config);
        let runtime = Runtime::new()?;
        Ok(Self {
            config,
            client,
            runtime,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }
}

impl ChatModel for OpenAiChat {
    fn complete(&self, messages: &[Message], tool: Option<&ToolSpec>) -> Result<Completion> {
        let start = Instant::now();
        let request_messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let mut request_builder = CreateChatCompletionRequestArgs::default();
        request_builder
            .model(&self.config.model)
            .messages(request_messages)
            .temperature(self.config.temperature);

        if let Some(max_tokens) = self.config.max_tokens {
            #[allow(deprecated)]
            request_builder.max_tokens(max_tokens);
        }

        if let Some(tool) = tool {
            let function = FunctionObjectArgs::default()
                .name(tool.name.clone())
                .description(tool.description.clone())
                .parameters(tool.parameters.clone())
                .build()?;
            let chat_tool = ChatCompletionToolArgs::default()
                .r#type(ChatCompletionToolType::Function)
                .function(function)
                .build()?;

            request_builder
                .tools(vec![chat_tool])
                .tool_choice(ChatCompletionToolChoiceOption::Named(
                    ChatCompletionNamedToolChoice {
                        r#type: ChatCompletionToolType::Function,
                        function: FunctionName {
                            name: tool.name.clone(),
                        },
                    },
                ));
        }

        let request = request_builder.build()?;

        let response = self
            .runtime
            .block_on(async { self.client.chat().create(request).await })?;

        let usage = response
            .usage
            .map(|u| Usage::new(u.prompt_tokens as u64, u.completion_tokens as u64))
            .unwrap_or_default();

        let completion = match response.choices.into_iter().next() {
            Some(choice) => Completion {
                role: from_wire_role(choice.message.role),
                content: choice.message.content.unwrap_or_default(),
                tool_calls: choice
                    .message
                    .tool_calls
                    .unwrap_or_default()
                    .into_iter()
                    .map(|call| ToolCall {
                        id: call.id,
                        name: call.function.name,
                        arguments: call.function.arguments,
                    })
                    .collect(),
                usage,
            },
            None => {
                return Err(ReflectError::MalformedResponse(
                    "response had no choices".to_string(),
                ))
            }
        };

        tracing::debug!(
            model = %self.config.model,
            messages = messages.len(),
            input_tokens = completion.usage.input_tokens,
            output_tokens = completion.usage.output_tokens,
            elapsed = ?start.elapsed(),
            "Chat completion finished"
        );

        Ok(completion)
    }
}

fn to_request_message(m: &Message) -> Result<ChatCompletionRequestMessage> {
    let message = match m.role {
        Role::System => ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(m.content.clone())
                .build()?,
        ),
        Role::User => ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(m.content.clone())
                .build()?,
        ),
        Role::Assistant => ChatCompletionRequestMessage::Assistant(
            ChatCompletionRequestAssistantMessageArgs::default()
                .content(m.content.clone())
                .build()?,
        ),
    };
    Ok(message)
}

fn from_wire_role(role: WireRole) -> Role {
    match role {
        WireRole::System => Role::System,
        WireRole::User => Role::User,
        _ => Role::Assistant,
    }
}
