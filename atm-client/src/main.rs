use anyhow::Result;
use atm_client::shell::{self, SharedInput, TerminalConsent};
use atm_client::view::View;
use atm_client::wallet::{AutoApprove, ConsentPrompt};
use atm_client::{AtmApp, CliArgs, ClientConfig};
use clap::Parser;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy()
        .add_directive("alloy=warn".parse()?)
        .add_directive("atm_client=info".parse()?)
        .add_directive("atm_contract_clients=info".parse()?);

    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(true).with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Load configuration
    let cli_args = CliArgs::parse();
    let config = ClientConfig::load(cli_args)?;

    let input: SharedInput<BufReader<Stdin>> =
        Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines()));
    let consent: Arc<dyn ConsentPrompt> = if config.auto_approve {
        Arc::new(AutoApprove)
    } else {
        Arc::new(TerminalConsent::new(input.clone()))
    };

    let app = Arc::new(AtmApp::from_config(&config, consent)?);
    if let Some(account) = app.startup().await {
        info!(account = %account, "Resumed authorized account");
    }

    // Re-draw the wallet panel whenever it changes
    let mut updates = app.subscribe();
    tokio::spawn(async move {
        let mut shown = View::from_snapshot(&updates.borrow_and_update()).wallet;
        while updates.changed().await.is_ok() {
            let view = View::from_snapshot(&updates.borrow_and_update());
            if view.wallet != shown {
                println!("{}", view.render_wallet());
                shown = view.wallet;
            }
        }
    });

    tokio::select! {
        result = shell::run(app.clone(), input) => {
            if let Err(e) = result {
                error!(error = %e, "Shell stopped");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received (Ctrl+C)");
        }
    }

    if let Some(notice) = shell::pending_notice(&app.snapshot()) {
        warn!("{notice}");
    }

    info!("Goodbye");
    Ok(())
}
