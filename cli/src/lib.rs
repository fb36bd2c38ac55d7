//! `cic`: command line access to CIC/TMS and wave update timing.

pub mod cic_cmd;
pub mod wave_cmd;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::cic_cmd::{
    CicOnlyArgs, LandscapesArgs, MembersArgs, PrivilegeArgs, SystemCli, TenantCli,
};
use crate::wave_cmd::WaveCli;

#[derive(Debug, Parser)]
#[command(name = "cic", version, about = "CIC/TMS access and wave update timing")]
pub struct Cli {
    /// Log progress at info level (RUST_LOG takes precedence).
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Look up and change systems.
    System(SystemCli),
    /// Look up, change and create tenants.
    Tenant(TenantCli),
    /// List every instance with its update group.
    Instances(CicOnlyArgs),
    /// Check whether the logged-in user holds a privilege.
    Privilege(PrivilegeArgs),
    /// List members of a CIC access group by role.
    Members(MembersArgs),
    /// Show landscapes assigned to a CIC group.
    Landscapes(LandscapesArgs),
    /// Wave update timing from Jenkins build histories.
    Wave(WaveCli),
}

impl Cli {
    pub async fn run(&self) -> anyhow::Result<()> {
        match &self.command {
            Command::System(cli) => cli.run().await,
            Command::Tenant(cli) => cli.run().await,
            Command::Instances(args) => cic_cmd::run_instances(args).await,
            Command::Privilege(args) => cic_cmd::run_privilege(args).await,
            Command::Members(args) => cic_cmd::run_members(args).await,
            Command::Landscapes(args) => cic_cmd::run_landscapes(args).await,
            Command::Wave(cli) => cli.run().await,
        }
    }
}

/// Log to stderr; stdout carries command output only.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
