//! Shared `--cic-*` command line arguments.

use clap::Args;

use crate::session::{CicConfig, DEFAULT_CIC_URL};

/// Credentials and location of the CIC instance.
#[derive(Debug, Clone, Args)]
pub struct CicArgs {
    /// CIC user id (your D/I number).
    #[arg(long = "cic-user", env = "CIC_USER")]
    pub user: String,

    /// CIC password.
    #[arg(long = "cic-password", env = "CIC_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// CIC URL.
    #[arg(long = "cic-url", env = "CIC_URL", default_value = DEFAULT_CIC_URL)]
    pub url: String,
}

impl CicArgs {
    pub fn to_config(&self) -> CicConfig {
        CicConfig::new(self.user.clone(), self.password.clone()).with_base_url(self.url.clone())
    }
}
