//! Reflect Tweet - generate/reflect loop demo
//!
//! A generator drafts a tweet, a critic grades it, and the critique is fed
//! back as user feedback until the transcript is long enough.

use clap::Parser;
use reflect::{prompts, Graph, LoopConfig, Message, ModelConfig, OpenAiChat, ReflectionAgent};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "reflect_tweet")]
#[command(about = "Improve a tweet with a generate/reflect loop")]
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

    /// Stop once the transcript holds more than this many messages
    #[arg(long, default_value = "6")]
    max_messages: usize,

    /// Tweet request (defaults to the built-in demo request)
    #[arg(short = 'r', long)]
    request: Option<String>,

    /// Print the run report as JSON instead of plain responses
    #[arg(long)]
    json: bool,

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

    println!("{}", Graph::reflection().draw_ascii());

    let agent = ReflectionAgent::new(
        model,
        LoopConfig::default().with_max_messages(args.max_messages),
    );
    let request = args.request.unwrap_or_else(prompts::default_tweet_request);

    let report = match agent.run(Message::user(request)) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        rounds = report.rounds,
        total_tokens = report.usage.total_tokens,
        elapsed = ?report.execution_time,
        "Run complete"
    );

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialize report: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    for msg in &report.transcript {
        println!("RESPONSE: {}", msg.content);
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
