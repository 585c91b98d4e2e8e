use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;

use palaver::core::config::Config;
use palaver::core::service::{GenerateClient, API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL};
use palaver::core::session::ChatSession;
use palaver::logging;
use palaver::ui::chat_loop;

#[derive(Parser)]
#[command(name = "palaver")]
#[command(about = "A terminal chat interface for a hosted generative AI model")]
#[command(long_about = "Palaver is a full-screen terminal chat interface that sends your \
messages to a hosted generative AI model and renders its replies as markdown. \
The model may answer with generated code and its execution result.\n\n\
Environment Variables:\n\
  GEMINI_API_KEY    API key for the model service (required)\n\
  RUST_LOG          Log filter when --log is given (optional)\n\n\
Controls:\n\
  Type              Enter your message in the input field\n\
  Enter             Send the message\n\
  Shift+Enter       Insert a newline (Alt+Enter on terminals that eat Shift)\n\
  Up/Down/Mouse     Scroll through chat history\n\
  Ctrl+C            Quit the application")]
struct Args {
    #[arg(short, long, help = "Model to use for replies (overrides config)")]
    model: Option<String>,

    #[arg(long, value_name = "FILE", help = "Write diagnostic logs to FILE")]
    log: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    logging::init(args.log.as_deref())?;

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let api_key = match env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => key,
        _ => {
            eprintln!(
                "Error: {API_KEY_ENV} environment variable not set\n\n\
                 Please set your API key:\n\
                 export {API_KEY_ENV}=\"your-api-key-here\""
            );
            std::process::exit(1);
        }
    };

    let model = args
        .model
        .or(config.default_model)
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let base_url = config
        .base_url
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let markdown = config.markdown.unwrap_or(true);

    let service = Arc::new(GenerateClient::new(&base_url, &api_key, &model));
    let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
    let session = ChatSession::new(service, outcome_tx);

    chat_loop::run(session, outcome_rx, markdown).await
}
