// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::Path;

use config::{Config, ConfigError, Environment, File, FileFormat};
use ledgerbackend::settings::Settings;

/// Loads `configuration/base.yaml` and `configuration/{environment}.yaml`
/// below `prefix`, then applies `LEDGER_*` environment variables.
///
/// The environment is taken from `LEDGER_ENVIRONMENT` and defaults to `local`.
pub fn get_configuration(prefix: impl AsRef<Path>) -> Result<Settings, ConfigError> {
    let configuration_directory = prefix.as_ref().join("configuration");
    let environment = std::env::var("LEDGER_ENVIRONMENT").unwrap_or_else(|_| "local".into());

    let settings = Config::builder()
        .add_source(File::from(configuration_directory.join("base.yaml")).required(true))
        .add_source(
            File::from(configuration_directory.join(format!("{environment}.yaml")))
                .required(false),
        )
        .add_source(environment_source())
        .build()?;
    settings.try_deserialize()
}

/// Same as [`get_configuration`] but with the files given as strings.
pub fn get_configuration_from_str(base: &str, environment: &str) -> Result<Settings, ConfigError> {
    let settings = Config::builder()
        .add_source(File::from_str(base, FileFormat::Yaml))
        .add_source(File::from_str(environment, FileFormat::Yaml))
        .add_source(environment_source())
        .build()?;
    settings.try_deserialize()
}

fn environment_source() -> Environment {
    Environment::with_prefix("LEDGER")
        .prefix_separator("_")
        .separator("__")
}
