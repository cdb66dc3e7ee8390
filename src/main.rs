mod cli;
mod client;
mod config;
mod error;
mod machine;
mod server;
mod ui;

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tokio::time::sleep;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use cli::{Cli, Command};
use client::MachineClient;
use config::CoffeeConfig;
use machine::Product;
use ui::BrewProgress;

/// How often `brew` re-polls once the job should be ready.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CoffeeConfig::load(cli.config.as_deref())?;

    init_tracing(&cli, &config);
    let server_url = cli.server.clone().unwrap_or_else(|| config.server_url.clone());

    match cli.command {
        Command::Serve { port, bind } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(bind) = bind {
                config.bind_address = bind;
            }
            info!(
                min_brew_seconds = config.min_brew_seconds,
                max_brew_seconds = config.max_brew_seconds,
                fixed_brew_millis = ?config.fixed_brew_millis,
                "starting coffee machine"
            );
            server::serve(config.listen_addr(), config.build_machine()).await?;
        }
        Command::Products => {
            for product in Product::ALL {
                println!("{product}");
            }
        }
        Command::Start { product, job_id } => {
            let job = connect(&server_url)?.start_job(&product, job_id.as_deref()).await?;
            ui::print_job(&job);
        }
        Command::Retrieve { job_id } => {
            let job = connect(&server_url)?.retrieve_job(&job_id).await?;
            ui::print_job(&job);
        }
        Command::Status => {
            let report = connect(&server_url)?.status().await?;
            ui::print_state(report.state);
        }
        Command::History => {
            let jobs = connect(&server_url)?.history().await?;
            ui::print_history(&jobs);
        }
        Command::Brew { product, job_id } => {
            brew(&connect(&server_url)?, &product, job_id.as_deref()).await?;
        }
        Command::Health => {
            let client = connect(&server_url)?;
            client.health().await?;
            ui::print_healthy(client.base_url());
        }
    }
    Ok(())
}

// Logs go to stderr; client subcommands stay quiet unless --verbose.
fn init_tracing(cli: &Cli, config: &CoffeeConfig) {
    let default_level = match (&cli.command, cli.verbose) {
        (_, true) => "debug",
        (Command::Serve { .. }, false) => config.log_level.as_str(),
        _ => "warn",
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn connect(url: &str) -> Result<MachineClient> {
    let client = MachineClient::new(url)?;
    debug!(server = client.base_url(), "using coffee machine server");
    Ok(client)
}

/// Submit a job, wait out the brew and retrieve it.
async fn brew(client: &MachineClient, product: &str, job_id: Option<&str>) -> Result<()> {
    let progress = BrewProgress::start(product);

    let job = match client.start_job(product, job_id).await {
        Ok(job) => job,
        Err(e) => {
            progress.fail(&e.to_string());
            return Err(e.into());
        }
    };

    loop {
        let now = Utc::now();
        progress.brewing(&job, now);

        if let Ok(remaining) = (job.job_ready - now).to_std() {
            sleep(remaining.min(POLL_INTERVAL)).await;
            continue;
        }

        match client.retrieve_job(&job.job_id).await {
            Ok(done) => {
                progress.complete(&done);
                ui::print_job(&done);
                return Ok(());
            }
            Err(e) if e.is_retryable() => {
                progress.waiting(&e.to_string());
                sleep(POLL_INTERVAL).await;
            }
            Err(e) => {
                progress.fail(&e.to_string());
                return Err(e.into());
            }
        }
    }
}
