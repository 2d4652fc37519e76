mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use pfwarden_api::Client;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a console connection
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "pfwarden", &mut std::io::stdout());
            Ok(())
        }

        // All other commands require a logged-in session
        cmd => {
            let (profile_name, options) = config::client_options(&cli.global)?;
            tracing::debug!(profile = %profile_name, url = %options.url, "resolved console");

            let cancel = CancellationToken::new();
            spawn_interrupt_handler(cancel.clone());

            let client = Client::new(options)?.with_cancellation(cancel);
            client
                .login()
                .await
                .map_err(|e| CliError::from(e).with_profile(&profile_name))?;

            tracing::debug!(command = ?cmd, "dispatching command");
            let result = commands::dispatch(cmd, &client, &cli.global)
                .await
                .map_err(|e| e.with_profile(&profile_name));

            if let Err(e) = client.logout().await {
                tracing::warn!(error = %e, "logout failed");
            }
            result
        }
    }
}

/// Cancel in-flight requests on Ctrl-C. Lock waits and retries observe it too.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling");
            cancel.cancel();
        }
    });
}
