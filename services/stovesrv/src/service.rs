//! Service entry points
//!
//! `execute` dispatches one CLI command. `run` wires the poll loop and the
//! HTTP API together and blocks until Ctrl+C or SIGTERM.

use std::sync::Arc;

use common::wait_for_shutdown;
use duepi_evo::simulator::{SimulatorHandle, StoveSimulator};
use duepi_evo::{DuepiClient, StoveClient};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::api::{create_router, AppState};
use crate::bootstrap::{self, Args, Command};
use crate::config::StoveSrvConfig;
use crate::error::{ErrorExt, Result, StoveSrvError};
use crate::poller::StoveCoordinator;

pub async fn execute(args: Args) -> Result<()> {
    let mut config = StoveSrvConfig::load(args.service.config.as_deref())?;
    bootstrap::initialize_logging(&args.service, &config.logging)?;

    let command = args.command();
    if command == Command::Validate {
        info!("Configuration is valid");
        return Ok(());
    }

    let simulator = if args.simulate {
        Some(start_simulator(&mut config).await?)
    } else {
        None
    };

    info!(
        "Stove {}:{} device {}, poll every {}s",
        config.stove.host, config.stove.port, config.stove.device_code, config.polling.interval_secs
    );

    let client = Arc::new(DuepiClient::new(config.connection_params()));
    let result = match command {
        Command::Run => run(&config, client).await,
        other => run_once(other, client.as_ref()).await,
    };

    if let Some(simulator) = simulator {
        simulator.stop().await;
    }
    result
}

async fn start_simulator(config: &mut StoveSrvConfig) -> Result<SimulatorHandle> {
    let simulator = StoveSimulator::new()
        .start()
        .await
        .io_error("Failed to start stove simulator")?;

    warn!("Simulation mode: stove simulator on {}", simulator.addr());
    config.stove.host = simulator.addr().ip().to_string();
    config.stove.port = simulator.port();
    Ok(simulator)
}

/// One-shot commands: a single exchange, then disconnect
async fn run_once(command: Command, client: &DuepiClient) -> Result<()> {
    let result = match command {
        Command::Status => match client.get_stove_data().await {
            Ok(snapshot) => serde_json::to_string_pretty(&snapshot)
                .context("Failed to serialize snapshot")
                .map(|json| println!("{}", json)),
            Err(e) => Err(e.into()),
        },
        Command::TestConnection => {
            if client.test_connection().await {
                println!("Connection OK");
                Ok(())
            } else {
                Err(StoveSrvError::update_failed("Connection test failed"))
            }
        },
        Command::PowerOn => client.power_on().await.map_err(Into::into),
        Command::PowerOff => client.power_off().await.map_err(Into::into),
        Command::SetPower { level } => client.set_power_level(level).await.map_err(Into::into),
        Command::SetTemp { temp } => client
            .set_target_temperature(temp)
            .await
            .map_err(Into::into),
        Command::ResetError => client.reset_error().await.map_err(Into::into),
        Command::Run | Command::Validate => Err(StoveSrvError::internal(format!(
            "{:?} is not a one-shot command",
            command
        ))),
    };

    client.disconnect().await;
    result
}

/// Poll loop plus HTTP API until a shutdown signal arrives
pub async fn run(config: &StoveSrvConfig, client: Arc<dyn StoveClient>) -> Result<()> {
    let coordinator = Arc::new(
        StoveCoordinator::new(client, config.poll_interval())
            .with_poll_timeout(config.poll_timeout()),
    );
    let shutdown_token = CancellationToken::new();

    let listener = if config.api.enabled {
        let addr = config.api_bind_address()?;
        let listener = TcpListener::bind(addr)
            .await
            .io_error(&format!("Failed to bind to {}", addr))?;
        info!("API server listening on http://{}", addr);
        info!("Health check: http://{}/health", addr);
        Some(listener)
    } else {
        info!("HTTP API disabled");
        None
    };

    let poll_handle = tokio::spawn(Arc::clone(&coordinator).run(shutdown_token.clone()));

    let server_handle = listener.map(|listener| {
        let app = create_router(AppState::new(
            Arc::clone(&coordinator),
            &config.stove.device_code,
        ));
        let server_token = shutdown_token.clone();
        tokio::spawn(async move {
            let shutdown = async move { server_token.cancelled().await };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("Server error: {}", e);
            }
        })
    });

    wait_for_shutdown().await;
    info!("Shutdown signal received, stopping");
    shutdown_token.cancel();

    if let Some(handle) = server_handle {
        handle.await.context("API server task failed")?;
    }
    poll_handle.await.context("Poll task failed")?;

    info!("Service stopped");
    Ok(())
}
