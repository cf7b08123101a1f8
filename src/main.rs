//! PhishGuard CLI
//!
//! Usage:
//!   phishguard --script session.json                      # Replay a page session
//!   phishguard --script session.json --token "$TOKEN"     # Explicit bearer token
//!   phishguard --script session.json --json               # JSON panel updates
//!   phishguard --script session.json --config pg.json     # Config file

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use clap::Parser;
use colored::Colorize;
use tokio::sync::{broadcast, oneshot};
use tracing::{error, warn};

use phishguard::config::PipelineConfig;
use phishguard::core::{
    drain_until_quiet, score_channel, Controller, CredentialedRequester, EnvTokenProvider,
    InProcessInjector, ReplayDriver, ReplayScript, StaticTokenProvider, TokenProvider,
};
use phishguard::telemetry::init_tracing;
use phishguard::types::{PanelPhase, PanelUpdate};
use phishguard::{TOKEN_ENV_VAR, VERSION};

#[derive(Parser, Debug)]
#[command(
    name = "phishguard",
    version = VERSION,
    about = "PhishGuard - live phishing risk scoring for webmail pages",
    long_about = "PhishGuard watches the open email of a webmail page, sends its body\n\
                  to a remote classifier and shows a risk panel.\n\n\
                  This binary replays a scripted page session (toggle, open_email,\n\
                  close_email, noise, wait, expand, reload) against the real pipeline\n\
                  and prints every panel transition.\n\n\
                  Risk bands:\n  \
                  HIGH    - probability > 0.85\n  \
                  MEDIUM  - probability > 0.50\n  \
                  LOW     - otherwise"
)]
struct Args {
    /// Replay script (JSON)
    #[arg(short, long)]
    script: String,

    /// Config file (JSON); flags below override it
    #[arg(short, long)]
    config: Option<String>,

    /// Classification endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Bearer token (default: read PHISHGUARD_TOKEN on every request)
    #[arg(long)]
    token: Option<String>,

    /// Debounce quiet period in milliseconds
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Print panel updates as JSON lines
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// After the last step, keep printing until the panel is quiet this long
    #[arg(long, default_value = "1000")]
    settle_ms: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args.log, args.log_json);

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "replay failed");
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn build_config(args: &Args) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(endpoint) = &args.endpoint {
        config.classifier_endpoint = endpoint.clone();
    }
    if let Some(ms) = args.debounce_ms {
        config.debounce_ms = ms;
    }
    config.validate()?;
    Ok(config)
}

async fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(args)?;
    let script = ReplayScript::load(&args.script)?;

    let tokens: Arc<dyn TokenProvider> = match &args.token {
        Some(token) => Arc::new(StaticTokenProvider::granting(token.clone())),
        None => Arc::new(EnvTokenProvider::new(TOKEN_ENV_VAR)),
    };
    let requester = CredentialedRequester::new(
        config.classifier_endpoint.clone(),
        config.request_name.clone(),
        config.interactive_consent,
        tokens,
    );

    let injector = Arc::new(InProcessInjector::new(config.clone()));
    let (client, inbox) = score_channel(32);
    let controller = Arc::new(Controller::new(requester, injector.clone(), client));
    tokio::spawn(Arc::clone(&controller).serve(inbox));

    let (done_tx, done_rx) = oneshot::channel();
    let settle = Duration::from_millis(args.settle_ms);
    let printer = tokio::spawn(print_updates(
        injector.subscribe(),
        done_rx,
        settle,
        args.json,
        args.no_color,
    ));

    print_header(&config, args.no_color);
    let mut driver = ReplayDriver::new(Arc::clone(&controller), Arc::clone(&injector), script.tab);
    driver.run(&script).await?;

    if done_tx.send(()).is_err() {
        warn!("update printer exited before the script finished");
    }
    if let Err(e) = printer.await {
        error!(error = %e, "update printer failed");
    }
    Ok(())
}

fn print_header(config: &PipelineConfig, no_color: bool) {
    let title = format!("PhishGuard v{} - replay", VERSION);
    if no_color {
        println!("========================================");
        println!("  {}", title);
        println!("========================================");
    } else {
        println!("{}", "========================================".bold());
        println!("  {}", title.bold());
        println!("{}", "========================================".bold());
    }
    println!("  endpoint: {}", config.classifier_endpoint);
    println!("  debounce: {}ms", config.debounce_ms);
    println!();
}

/// Print updates until `done` fires, then keep printing until the panel
/// has been quiet for `settle`
async fn print_updates(
    mut rx: broadcast::Receiver<PanelUpdate>,
    mut done: oneshot::Receiver<()>,
    settle: Duration,
    json: bool,
    no_color: bool,
) {
    loop {
        tokio::select! {
            biased;
            msg = rx.recv() => match msg {
                Ok(update) => print_update(&update, json, no_color),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    eprintln!("  ({} panel updates dropped)", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = &mut done => {
                drain_until_quiet(&mut rx, settle, |update| {
                    print_update(&update, json, no_color)
                })
                .await;
                break;
            }
        }
    }
}

fn print_update(update: &PanelUpdate, json: bool, no_color: bool) {
    if json {
        match serde_json::to_string(update) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("cannot serialize update: {}", e),
        }
    } else if no_color {
        println!("{}", update.to_parseable_string());
    } else {
        println!("{}", update.to_terminal_string());
        if let PanelPhase::Resulted { probability, .. } = update.phase {
            if probability > phishguard::RISK_THRESHOLD_HIGH {
                println!("{}", "  ⚠ Likely phishing - do not click links or reply".red().bold());
            }
        }
    }
}
