// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::PathBuf;

use crate::logging::LogFormat;

#[derive(clap::Parser)]
#[command(version, about = "REST server for transactions and debts")]
pub struct Args {
    /// Directory containing the `configuration` folder
    #[arg(long, default_value = "server/")]
    pub config_dir: PathBuf,
    #[arg(long, value_enum, default_value_t)]
    pub log_format: LogFormat,
    #[command(subcommand)]
    pub cmd: Option<Command>,
}

#[derive(Default, clap::Subcommand)]
pub enum Command {
    /// Serve the REST API (default)
    #[default]
    Run,
    /// Inspect registered users
    Users(UsersArgs),
}

#[derive(clap::Args)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub cmd: Option<UsersCommand>,
}

#[derive(Default, clap::Subcommand)]
pub enum UsersCommand {
    /// Count users and users owning records (default)
    #[default]
    Stats,
    /// Print usernames
    List {
        /// Maximum number of users
        #[arg(default_value_t = 1000)]
        n: usize,
        /// Also print full names and mobile numbers
        #[arg(long)]
        details: bool,
    },
}
