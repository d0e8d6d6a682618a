//! Reflexion Actor - structured first-responder demo
//!
//! Asks the model a research question and forces it to reply through the
//! `AnswerQuestion` tool: an answer, a self-critique and search queries.

use clap::Parser;
use reflect::{
    prompts, Graph, Message, ModelConfig, OpenAiChat, StructuredActor, Transcript,
};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "reflexion_actor")]
#[command(about = "Answer a question with self-critique and search queries")]
struct Args {
    /// Model to use (defaults to OPENAI_MODEL or gpt-4-turbo)
    #[arg(short, long)]
    model: Option<String>,

    /// Backend API URL (for OpenAI-compatible servers)
    #[arg(short = 'u', long)]
    backend_url: Option<String>,

    /// API key (or use OPENAI_API_KEY)
    #[arg(short = 'k', long)]
    backend_key: Option<String>,

    /// Temperature for sampling
    #[arg(short, long)]
    temperature: Option<f32>,

    /// Question to answer (defaults to the built-in demo question)
    #[arg(short = 'q', long)]
    question: Option<String>,

    /// Answer-length directive placed first in the instructions
    #[arg(long)]
    first_instruction: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = model_config(&args);
    let model = match OpenAiChat::new(config) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Failed to create model client: {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", Graph::actor().draw_ascii());

    let mut actor = StructuredActor::new(model);
    if let Some(ref instruction) = args.first_instruction {
        actor = actor.with_first_instruction(instruction.clone());
    }

    let question = args.question.unwrap_or_else(prompts::default_research_question);
    let transcript = Transcript::seeded(Message::user(question));

    let report = match actor.respond(&transcript) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        total_tokens = report.usage.total_tokens,
        elapsed = ?report.execution_time,
        "Answer complete"
    );

    match serde_json::to_string_pretty(&report.answer) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize answer: {}", e);
            std::process::exit(1);
        }
    }
}

fn model_config(args: &Args) -> ModelConfig {
    let mut config = ModelConfig::from_env();
    if let Some(ref model) = args.model {
        config.model = model.clone();
    }
    if let Some(ref url) = args.backend_url {
        config = config.with_base_url(url);
    }
    if let Some(ref key) = args.backend_key {
        config = config.with_api_key(key);
    }
    if let Some(t) = args.temperature {
        config = config.with_temperature(t);
    }
    config
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::registry()
        .with(level)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
