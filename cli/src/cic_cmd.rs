//! CIC/TMS accessor subcommands.
//!
//! Every command logs in with the `--cic-*` arguments, runs one accessor
//! call and prints the result as JSON on stdout.

use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use cic_client::{CicArgs, CicClient, MemberList, cloud_host};
use clap::{ArgGroup, Args, Parser, Subcommand};
use serde_json::{Value, json};

use crate::print_json;

// ─────────────────────────────────────────────────────────────────────────────
// Systems
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
pub struct SystemCli {
    #[command(subcommand)]
    pub command: SystemSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum SystemSubcommand {
    /// Show one system record.
    Get(SystemGetArgs),
    /// Print the uuid of a system.
    Uid(SystemNameArgs),
    /// Print the cloud host a system is deployed on.
    CloudHost(SystemNameArgs),
    /// List systems, optionally filtered.
    List(ListArgs),
    /// Change one metadata field of a system.
    Set(SystemSetArgs),
    /// Register a new system from a JSON file.
    Add(PayloadArgs),
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("target").required(true).args(["uid", "name"])))]
pub struct SystemGetArgs {
    #[command(flatten)]
    pub cic: CicArgs,

    /// System uuid.
    #[arg(long)]
    pub uid: Option<String>,

    /// System name, e.g. epmprod81.
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Debug, Args)]
pub struct SystemNameArgs {
    #[command(flatten)]
    pub cic: CicArgs,

    /// System name.
    pub name: String,
}

#[derive(Debug, Args)]
pub struct SystemSetArgs {
    #[command(flatten)]
    pub cic: CicArgs,

    /// System name.
    pub name: String,

    /// Metadata field, e.g. underMaintenance.
    pub field: String,

    /// New value.
    pub value: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tenants
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
pub struct TenantCli {
    #[command(subcommand)]
    pub command: TenantSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum TenantSubcommand {
    /// Show one tenant record.
    Get(TenantGetArgs),
    /// List tenants, optionally filtered.
    List(ListArgs),
    /// List every tenant with its consumer account.
    All(CicOnlyArgs),
    /// Change metadata fields of a tenant.
    Set(TenantSetArgs),
    /// Create a tenant from a JSON file.
    Create(PayloadArgs),
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("target").required(true).args(["uid", "instance"])))]
pub struct TenantGetArgs {
    #[command(flatten)]
    pub cic: CicArgs,

    /// Tenant uuid.
    #[arg(long)]
    pub uid: Option<String>,

    /// Instance the tenant lives on.
    #[arg(long, requires = "description")]
    pub instance: Option<String>,

    /// Tenant description (carries the tenant id).
    #[arg(long, requires = "instance")]
    pub description: Option<String>,
}

#[derive(Debug, Args)]
pub struct TenantSetArgs {
    #[command(flatten)]
    pub cic: CicArgs,

    /// Instance the tenant lives on.
    pub instance: String,

    /// Tenant description.
    pub description: String,

    /// Fields to change, as FIELD=VALUE.
    #[arg(required = true, value_parser = parse_key_value)]
    pub fields: Vec<(String, String)>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared and top-level argument sets
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CicOnlyArgs {
    #[command(flatten)]
    pub cic: CicArgs,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub cic: CicArgs,

    /// Query filter as KEY=VALUE; repeatable.
    #[arg(long = "filter", value_parser = parse_key_value)]
    pub filters: Vec<(String, String)>,

    /// Detail field to include; repeatable.
    #[arg(long = "detail")]
    pub details: Vec<String>,
}

#[derive(Debug, Args)]
pub struct PayloadArgs {
    #[command(flatten)]
    pub cic: CicArgs,

    /// JSON file holding the record to send.
    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct PrivilegeArgs {
    #[command(flatten)]
    pub cic: CicArgs,

    /// Privilege name.
    pub privilege: String,

    /// Restrict the check to a CIC user group.
    #[arg(long = "group-id")]
    pub group_id: Option<u32>,
}

#[derive(Debug, Args)]
pub struct MembersArgs {
    #[command(flatten)]
    pub cic: CicArgs,

    /// CIC access group.
    pub group: String,

    /// Role to match; repeatable.
    #[arg(long = "role", required = true)]
    pub roles: Vec<String>,

    /// Only print this field of each member.
    #[arg(long)]
    pub select: Option<String>,
}

#[derive(Debug, Args)]
pub struct LandscapesArgs {
    #[command(flatten)]
    pub cic: CicArgs,

    /// CIC group.
    pub group: String,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

async fn connect(args: &CicArgs) -> anyhow::Result<CicClient> {
    CicClient::connect(&args.to_config())
        .await
        .with_context(|| format!("failed to log in to {}", args.url))
}

fn read_payload(path: &Path) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatch
// ─────────────────────────────────────────────────────────────────────────────

impl SystemCli {
    pub async fn run(&self) -> anyhow::Result<()> {
        match &self.command {
            SystemSubcommand::Get(args) => {
                let client = connect(&args.cic).await?;
                let system = match (&args.uid, &args.name) {
                    (Some(uid), _) => client.system_by_uid(uid).await?,
                    (None, Some(name)) => client.system_by_name(name).await?,
                    (None, None) => anyhow::bail!("either --uid or --name is required"),
                };
                print_json(&system)
            }
            SystemSubcommand::Uid(args) => {
                let client = connect(&args.cic).await?;
                let uid = client.system_uid_by_name(&args.name).await?;
                print_json(&uid)
            }
            SystemSubcommand::CloudHost(args) => {
                let client = connect(&args.cic).await?;
                let system = client.system_by_name(&args.name).await?;
                print_json(&cloud_host(&system)?)
            }
            SystemSubcommand::List(args) => {
                let client = connect(&args.cic).await?;
                print_json(&client.systems_by_filter(&args.filters, &args.details).await?)
            }
            SystemSubcommand::Set(args) => {
                let client = connect(&args.cic).await?;
                let updated = client
                    .change_system_metadata(&args.name, &args.field, &args.value)
                    .await?;
                tracing::info!("{} set to {} on {}", args.field, args.value, args.name);
                print_json(&updated)
            }
            SystemSubcommand::Add(args) => {
                let payload = read_payload(&args.file)?;
                let client = connect(&args.cic).await?;
                print_json(&client.add_system(&payload).await?)
            }
        }
    }
}

impl TenantCli {
    pub async fn run(&self) -> anyhow::Result<()> {
        match &self.command {
            TenantSubcommand::Get(args) => {
                let client = connect(&args.cic).await?;
                let tenant = match (&args.uid, &args.instance, &args.description) {
                    (Some(uid), _, _) => client.tenant_by_uid(uid).await?,
                    (None, Some(instance), Some(description)) => {
                        client.tenant_by_name(instance, description).await?
                    }
                    _ => anyhow::bail!("either --uid or --instance with --description is required"),
                };
                print_json(&tenant)
            }
            TenantSubcommand::List(args) => {
                let client = connect(&args.cic).await?;
                print_json(&client.tenants_by_filter(&args.filters, &args.details).await?)
            }
            TenantSubcommand::All(args) => {
                let client = connect(&args.cic).await?;
                print_json(&client.all_tenants().await?)
            }
            TenantSubcommand::Set(args) => {
                let client = connect(&args.cic).await?;
                let updated = client
                    .change_tenant_metadata_fields(&args.instance, &args.description, &args.fields)
                    .await?;
                print_json(&updated)
            }
            TenantSubcommand::Create(args) => {
                let payload = read_payload(&args.file)?;
                let client = connect(&args.cic).await?;
                let creation = client.create_tenant(&payload).await?;
                if !creation.triggered() {
                    tracing::warn!("tenant creation answered HTTP {}", creation.status);
                }
                print_json(&json!({"status": creation.status, "body": creation.body}))
            }
        }
    }
}

pub async fn run_instances(args: &CicOnlyArgs) -> anyhow::Result<()> {
    let client = connect(&args.cic).await?;
    print_json(&client.instance_list().await?)
}

pub async fn run_privilege(args: &PrivilegeArgs) -> anyhow::Result<()> {
    let client = connect(&args.cic).await?;
    let granted = client.has_privilege(&args.privilege, args.group_id).await?;
    print_json(&granted)
}

pub async fn run_members(args: &MembersArgs) -> anyhow::Result<()> {
    let client = connect(&args.cic).await?;
    let members = client
        .member_list(&args.group, &args.roles, args.select.as_deref())
        .await?;
    match members {
        MemberList::Field(values) => print_json(&values),
        MemberList::Records(payload) => print_json(&payload),
        MemberList::Empty => print_json(&Value::Array(Vec::new())),
    }
}

pub async fn run_landscapes(args: &LandscapesArgs) -> anyhow::Result<()> {
    let client = connect(&args.cic).await?;
    print_json(&client.landscapes_by_group(&args.group).await?)
}
