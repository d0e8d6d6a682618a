use schemars::generate::SchemaSettings;
use schemars::{JsonSchema, SchemaGenerator};
use serde::{Deserialize, Serialize};

use crate::error::{ReflectError, Result};
use crate::model::ToolSpec;

/// Name of the function tool the actor is forced to call
pub const ANSWER_TOOL: &str = "AnswerQuestion";

const ANSWER_TOOL_DESCRIPTION: &str = "Answer the user's question.";

/// Self-critique of an answer
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Reflection {
    /// Critique of what is missing.
    pub missing: String,
    /// Critique of what is superfluous.
    pub superfluous: String,
}

/// Answer, critique and follow-up research queries
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct StructuredAnswer {
    /// ~250 word detailed answer to the question.
    pub answer: String,
    /// Your reflection on the initial answer.
    pub reflection: Reflection,
    /// 1-3 search queries for researching improvements to address the critique of your current answer.
    pub search_queries: Vec<String>,
}

impl StructuredAnswer {
    pub const MAX_SEARCH_QUERIES: usize = 3;

    /// Check the bounds the schema states but JSON Schema alone does not enforce
    pub fn validate(&self) -> Result<()> {
        if self.answer.trim().is_empty() {
            return Err(ReflectError::Schema("answer is empty".to_string()));
        }
        if self.reflection.missing.trim().is_empty() {
            return Err(ReflectError::Schema("reflection.missing is empty".to_string()));
        }
        if self.reflection.superfluous.trim().is_empty() {
            return Err(ReflectError::Schema(
                "reflection.superfluous is empty".to_string(),
            ));
        }

        let count = self.search_queries.len();
        if count == 0 || count > Self::MAX_SEARCH_QUERIES {
            return Err(ReflectError::Schema(format!(
                "expected 1-{} search queries, got {}",
                Self::MAX_SEARCH_QUERIES,
                count
            )));
        }
        if self.search_queries.iter().any(|q| q.trim().is_empty()) {
            return Err(ReflectError::Schema("empty search query".to_string()));
        }
        Ok(())
    }
}

/// Tool spec whose parameters are the schema of `T`, nested types inlined
pub fn tool_spec_for<T: JsonSchema>(name: &str, description: &str) -> ToolSpec {
    let generator = SchemaGenerator::new(SchemaSettings::default().with(|s| {
        s.inline_subschemas = true;
    }));
    let mut parameters = generator.into_root_schema_for::<T>().to_value();
    if let Some(obj) = parameters.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
        obj.remove("description");
    }

    ToolSpec {
        name: name.to_string(),
        description: description.to_string(),
        parameters,
    }
}

/// The `AnswerQuestion` tool
pub fn answer_tool() -> ToolSpec {
    tool_spec_for::<StructuredAnswer>(ANSWER_TOOL, ANSWER_TOOL_DESCRIPTION)
}
