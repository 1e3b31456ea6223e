// SPDX-FileCopyrightText: 2024 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use serde::Deserialize;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Configuration for the server.
#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    /// If this isn't present, records are only kept in memory.
    pub database: Option<DatabaseSettings>,
    pub auth: AuthSettings,
    #[serde(default)]
    pub ratelimits: RateLimitsSettings,
}

/// Configuration for the application.
#[derive(Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    /// The address to listen for incoming requests
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// The address to serve metrics on
    ///
    /// Note: This is not the same address as the address for the incoming request, because the
    /// metrics *must not* be exposed to the outside world.
    #[serde(default = "default_listen_metrics")]
    pub listen_metrics: SocketAddr,
}

fn default_listen() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8080)
}

fn default_listen_metrics() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 9090)
}

/// Postgres database holding the blobs.
#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub name: String,
    /// CA certificate to verify the server with. Without it, TLS is not
    /// enforced.
    pub cacertpath: Option<String>,
}

impl DatabaseSettings {
    /// Options for the maintenance connection, used before the database
    /// exists.
    pub fn server_options(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password);
        match &self.cacertpath {
            Some(path) => options
                .ssl_mode(PgSslMode::VerifyCa)
                .ssl_root_cert(path.as_str()),
            None => {
                tracing::warn!(host = %self.host, "No CA certificate configured, TLS is disabled");
                options.ssl_mode(PgSslMode::Prefer)
            }
        }
    }

    pub fn database_options(&self) -> PgConnectOptions {
        self.server_options().database(&self.name)
    }
}

/// Session settings.
#[derive(Deserialize, Clone, Debug)]
pub struct AuthSettings {
    /// Secret used to sign session tokens
    pub jwt_secret: JwtSecret,
    /// Lifetime of a session
    ///
    /// Default is one day.
    #[serde(default = "default_one_day", with = "duration_seconds")]
    pub session_ttl: Duration,
}

#[derive(Deserialize, Clone, Zeroize, ZeroizeOnDrop)]
pub struct JwtSecret(String);

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JwtSecret(..)")
    }
}

impl AsRef<[u8]> for JwtSecret {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl From<String> for JwtSecret {
    fn from(secret: String) -> Self {
        Self(secret)
    }
}

/// Every `period`, allow bursts of up to `burst`-many requests, and replenish one element after
/// the `period`.
#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitsSettings {
    #[serde(with = "duration_millis", default = "default_500ms")]
    pub period: Duration,
    #[serde(default = "default_burst")]
    pub burst: u32,
}

impl Default for RateLimitsSettings {
    fn default() -> Self {
        Self {
            period: default_500ms(),
            burst: default_burst(),
        }
    }
}

fn default_one_day() -> Duration {
    Duration::from_secs(60 * 60 * 24)
}

fn default_500ms() -> Duration {
    Duration::from_millis(500)
}

fn default_burst() -> u32 {
    100
}

mod duration_seconds {
    use serde::de;

    use std::time::Duration;

    pub fn deserialize<'de, D>(d: D) -> Result<Duration, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        let seconds: u64 = serde::Deserialize::deserialize(d)?;
        Ok(Duration::from_secs(seconds))
    }
}

mod duration_millis {
    use serde::de;

    use std::time::Duration;

    pub fn deserialize<'de, D>(d: D) -> Result<Duration, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        let millis: u64 = serde::Deserialize::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}
