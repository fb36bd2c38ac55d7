//! `cic wave` subcommands.

use std::path::PathBuf;

use anyhow::Context;
use cic_client::{CicClient, CicConfig};
use cic_wave::{Analysis, ConfigLoader, Credentials, JenkinsClient, WaveConfig, WavePipeline};
use clap::{Args, Parser, Subcommand};

use crate::print_json;

#[derive(Debug, Parser)]
pub struct WaveCli {
    #[command(subcommand)]
    pub command: WaveSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum WaveSubcommand {
    /// Fetch both job histories and store sanitized snapshots.
    Fetch(WaveArgs),
    /// Rebuild the deployment group file from CIC.
    Groups(WaveArgs),
    /// Measure wave times from stored snapshots.
    Analyze(AnalyzeArgs),
    /// Fetch, rebuild groups and analyze.
    Run(AnalyzeArgs),
}

#[derive(Debug, Args)]
pub struct WaveArgs {
    /// Configuration file (defaults to ./cic-wave.toml, then the user
    /// config directory).
    #[arg(long = "config", short = 'c')]
    pub config: Option<PathBuf>,

    /// Override the snapshot directory.
    #[arg(long = "snapshot-dir")]
    pub snapshot_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub wave: WaveArgs,

    /// Print reports as JSON instead of text lines.
    #[arg(long = "json", short = 'j')]
    pub json: bool,
}

impl WaveArgs {
    fn load(&self) -> anyhow::Result<WaveConfig> {
        let mut config = ConfigLoader::load_from(self.config.as_deref())?;
        if let Some(dir) = &self.snapshot_dir {
            config.snapshot_dir = dir.clone();
        }
        tracing::debug!("wave configuration: {config:?}");
        Ok(config)
    }
}

fn credentials(config: &WaveConfig) -> anyhow::Result<Credentials> {
    Credentials::from_file(&config.credentials_file).with_context(|| {
        format!(
            "credentials are read from {}",
            config.credentials_file.display()
        )
    })
}

fn report(analysis: &Analysis, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(&analysis.reports)?;
    } else {
        for report in &analysis.reports {
            println!("{report}");
        }
    }
    for failure in &analysis.failures {
        eprintln!("{}: {}", failure.selector, failure.error);
    }
    if !analysis.is_complete() {
        anyhow::bail!(
            "{} of {} selectors could not be measured",
            analysis.failures.len(),
            analysis.failures.len() + analysis.reports.len()
        );
    }
    Ok(())
}

impl WaveCli {
    pub async fn run(&self) -> anyhow::Result<()> {
        match &self.command {
            WaveSubcommand::Fetch(args) => {
                let config = args.load()?;
                let jenkins = JenkinsClient::new(&config.jenkins_url, credentials(&config)?)?;
                let pipeline = WavePipeline::new(config)?;
                let summary = pipeline.fetch(&jenkins).await?;
                print_json(&summary)
            }
            WaveSubcommand::Groups(args) => {
                let config = args.load()?;
                let account = credentials(&config)?;
                let cic_config =
                    CicConfig::new(account.user, account.password).with_base_url(&config.cic_url);
                let cic = CicClient::connect(&cic_config).await?;
                let pipeline = WavePipeline::new(config)?;
                print_json(&pipeline.build_groups(&cic).await?)
            }
            WaveSubcommand::Analyze(args) => {
                let pipeline = WavePipeline::new(args.wave.load()?)?;
                report(&pipeline.analyze()?, args.json)
            }
            WaveSubcommand::Run(args) => {
                let config = args.wave.load()?;
                let account = credentials(&config)?;
                let pipeline = WavePipeline::new(config)?;
                report(&pipeline.run(&account).await?, args.json)
            }
        }
    }
}
