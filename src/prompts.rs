/// System prompt for the critic grading a tweet draft
pub fn reflection_system_prompt() -> String {
    "You are a viral twitter influencer grading a tweet. Generate critique and recommendations for the user's tweet. \
Always provide detailed recommendations, including requests for length, virality, style, etc."
        .to_string()
}

/// System prompt for the generator drafting and revising tweets
pub fn generation_system_prompt() -> String {
    "You are a twitter techie influencer assistant tasked with generating excellent twitter posts. \
Generate the best twitter post possible for the user's request. \
If the user provides critique, respond with a revised version of your previous attempts. \
Do not include any explanations - just the tweet text."
        .to_string()
}

/// Answer-length directive for the first responder
pub const FIRST_INSTRUCTION: &str = "Provide a detailed ~250 words answer.";

/// Build the actor's system prompt
///
/// `time` is rendered into the prompt so the model can reason about recency.
pub fn build_actor_system_prompt(time: &str, first_instruction: &str) -> String {
    format!(
        r#"You are expert researcher.
Current time: {time}

1. {first_instruction}
2. Reflect and critique your answer. Be severe to maximize improvement.
3. Recommend search queries to research information and improve your answer.

Your response MUST include both an answer and search queries."#,
        time = time,
        first_instruction = first_instruction
    )
}

/// Trailing reminder placed after the conversation
pub fn build_actor_format_reminder() -> String {
    "Answer the user's question above using the required format.".to_string()
}

/// Seed request for the tweet demo
pub fn default_tweet_request() -> String {
    r#"Make this tweet better:

ChatBots are overrated use of RAG. You can create a completely automated RAG powered workflow.
If you have an army of BPOs doing repetitive processes, you can set up a workflow to repeatedly call a RAG flow
and then have this continuously running operations.
This idea can save you or generate you millions of dollars."#
        .to_string()
}

/// Seed question for the actor demo
pub fn default_research_question() -> String {
    "Write about AI-powered SOC / autonomous SOC problem domain, list startups that do that and raised capital."
        .to_string()
}
