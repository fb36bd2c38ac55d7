//! Data-access layer for the CIC tenant management service (TMS).
//!
//! ```no_run
//! # async fn demo() -> cic_client::CicResult<()> {
//! use cic_client::{CicClient, CicConfig};
//!
//! let client = CicClient::connect(&CicConfig::new("D012345", "secret")).await?;
//! let system = client.system_by_name("epmprod81").await?;
//! println!("{}", system["uuid"]);
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "cli")]
mod args;
mod client;
mod error;
pub mod query;
mod session;
mod validate;

#[cfg(feature = "cli")]
pub use args::CicArgs;
pub use client::{
    CicClient, InstanceSummary, MemberList, TenantCreation, cloud_host, parse_instance_list,
    record_str, remove_prefix,
};
pub use error::{Access, CicError, CicResult, HttpFailure, Resource, is_genuinely_absent};
pub use session::{CicConfig, CicRequest, CicResponse, DEFAULT_CIC_URL, DEPTH_HEADER, Payload, Session};
pub use validate::{FieldCheck, check_field, check_fields};
