// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use ledgerbackend::{
    blob_store::{BlobStore, MemoryBlobStore, PgBlobStore},
    settings::DatabaseSettings,
};
use ledgerserver::{
    ServerRunParams,
    args::{Args, Command},
    configurations::get_configuration,
    logging::init_logging,
    run,
    user_command::run_users_command,
};
use tokio::{net::TcpListener, time};
use tracing::{info, warn};

/// Connects to postgres, retrying for a while in case the server is still
/// coming up.
async fn connect_database(settings: &DatabaseSettings) -> anyhow::Result<PgBlobStore> {
    let mut counter = 0;
    loop {
        match PgBlobStore::connect(settings).await {
            Ok(store) => return Ok(store),
            Err(error) if counter < 10 => {
                info!(%error, "Failed to connect to postgres server");
                counter += 1;
                time::sleep(Duration::from_secs(1)).await;
            }
            Err(error) => {
                return Err(error).context("Database not ready after 10 seconds");
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_format)?;

    let configuration =
        get_configuration(&args.config_dir).context("Could not load configuration")?;

    let blobs: Arc<dyn BlobStore> = match &configuration.database {
        Some(database) => {
            info!(host = %database.host, "Connecting to postgres server");
            Arc::new(connect_database(database).await?)
        }
        None => {
            warn!("No database configured, records are kept in memory only");
            Arc::new(MemoryBlobStore::default())
        }
    };

    match args.cmd.unwrap_or_default() {
        Command::Run => (),
        Command::Users(users_args) => {
            return run_users_command(users_args, blobs).await;
        }
    }

    // Port binding
    let listener = TcpListener::bind(configuration.application.listen)
        .await
        .context("Failed to bind")?;
    let metrics_listener = TcpListener::bind(configuration.application.listen_metrics)
        .await
        .context("Failed to bind metrics listener")?;

    // Start the server
    let server = run(ServerRunParams {
        listener,
        metrics_listener: Some(metrics_listener),
        blobs,
        auth: configuration.auth,
        rate_limits: configuration.ratelimits,
    })
    .await?;

    server.await?;
    Ok(())
}
