use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use xiaoi::consts::{DEFAULT_QUEUE_CAPACITY, DEFAULT_TIMEOUT_SECS, DEFAULT_WORKERS, REQ_URL};
use xiaoi::{BodyEncoding, Dispatcher, Message, Parameters, Shutdown};

#[derive(Parser)]
#[command(name = "xiaoi", version, about = "Ask the xiaoi.com robot, in parallel.")]
struct Cli {
    /// Questions to ask
    #[arg(required = true)]
    questions: Vec<String>,

    /// Application key
    #[arg(long, env = "XIAOI_APP_KEY", hide_env_values = true)]
    key: String,

    /// Application secret
    #[arg(long, env = "XIAOI_APP_SECRET", hide_env_values = true)]
    secret: String,

    /// Requester identity sent as userId
    #[arg(short, long, default_value = "xiaoi-cli")]
    user: String,

    /// Number of concurrent workers
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Queue capacity
    #[arg(short, long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    capacity: usize,

    /// Per-request timeout in seconds
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Seconds to wait for workers on shutdown
    #[arg(long, default_value_t = 5)]
    close_timeout: u64,

    /// Endpoint URL
    #[arg(long, default_value = REQ_URL)]
    endpoint: String,

    /// Percent-encode userId and question in the request body
    #[arg(long, default_value_t = false)]
    url_encode: bool,

    /// Print each message as a JSON line
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let params = Parameters {
        app_key: cli.key,
        app_secret: cli.secret,
        workers: cli.workers,
        queue_capacity: cli.capacity,
        timeout: Duration::from_secs(cli.timeout),
        endpoint: cli.endpoint,
        body_encoding: if cli.url_encode {
            BodyEncoding::UrlEncoded
        } else {
            BodyEncoding::Raw
        },
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let dispatcher = Dispatcher::open(
        params,
        Arc::new(move |msg: Message| {
            let _ = tx.send(msg);
        }),
    )?;

    let mut posted = 0;
    for question in &cli.questions {
        match dispatcher.post(&cli.user, question) {
            Ok(_) => posted += 1,
            Err(e) => eprintln!("error: {question:?}: {e}"),
        }
    }

    for _ in 0..posted {
        let Some(msg) = rx.recv().await else { break };
        if cli.json {
            println!("{}", serde_json::to_string(&msg)?);
        } else if let Some(failure) = &msg.failure {
            println!("[{}] {} => error: {}", msg.id, msg.question, failure);
        } else {
            println!("[{}] {} => {}", msg.id, msg.question, msg.answer);
        }
    }

    let close_timeout = Duration::from_secs(cli.close_timeout);
    if let Shutdown::TimedOut { remaining } = dispatcher.close(close_timeout).await? {
        eprintln!("warning: {remaining} worker(s) abandoned on shutdown");
    }
    Ok(())
}
