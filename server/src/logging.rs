// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use tracing::{metadata::LevelFilter, subscriber::set_global_default};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt};

/// How log lines are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// One bunyan JSON object per line, for log collectors
    #[default]
    Json,
    /// Human readable lines, for local development
    Pretty,
}

/// Installs the global logger. Filtered through `RUST_LOG`, which defaults to
/// `info`.
///
/// Records of crates logging through `log` (e.g. sqlx) are forwarded.
pub fn init_logging(format: LogFormat) -> anyhow::Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    LogTracer::init()?;
    match format {
        LogFormat::Json => {
            let formatting_layer =
                BunyanFormattingLayer::new(env!("CARGO_PKG_NAME").into(), std::io::stdout);
            let subscriber = Registry::default()
                .with(env_filter)
                .with(JsonStorageLayer)
                .with(formatting_layer);
            set_global_default(subscriber)?;
        }
        LogFormat::Pretty => {
            let subscriber = Registry::default()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_target(false));
            set_global_default(subscriber)?;
        }
    }
    Ok(())
}
