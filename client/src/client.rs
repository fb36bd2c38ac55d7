//! Typed operations over TMS systems and tenants.
//!
//! Every operation goes through one [`Session`]. Lookups translate 404 and
//! 403 into [`CicError::NotFound`] and [`CicError::PermissionDenied`];
//! any other failure propagates as the session reported it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Access, CicError, CicResult, Resource, is_genuinely_absent};
use crate::query::{
    Endpoint, PRIVILEGE_ENDPOINT, SYSTEM_ENDPOINT, TENANT_ENDPOINT, filtered_listing,
    landscapes_endpoint, members_endpoint,
};
use crate::session::{CicConfig, CicRequest, Session};
use crate::validate::{check_fields, form_value};

/// Depth requested on metadata updates.
const METADATA_DEPTH: &str = "metadata";

/// One entry of the instance listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSummary {
    pub name: String,
    #[serde(rename = "updateGroup")]
    pub update_group: String,
}

/// Result of an OData member query.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberList {
    /// Values of the selected field, technical users without one skipped.
    Field(Vec<String>),
    /// Full payload when no field was selected.
    Records(Value),
    /// The query matched nothing (or was malformed).
    Empty,
}

/// Outcome of a tenant creation request.
#[derive(Debug, Clone, PartialEq)]
pub struct TenantCreation {
    pub status: u16,
    pub body: Value,
}

impl TenantCreation {
    /// TMS creates tenants asynchronously and answers 202 once triggered.
    pub fn triggered(&self) -> bool {
        self.status == 202
    }
}

/// Data-access object for CIC/TMS.
pub struct CicClient {
    session: Session,
}

impl CicClient {
    /// Log in and return a ready client.
    pub async fn connect(config: &CicConfig) -> CicResult<Self> {
        let session = Session::login(config).await?;
        Ok(Self { session })
    }

    pub fn from_session(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn permission_denied(
        &self,
        access: Access,
        resource: Resource,
        target: &str,
        body: String,
    ) -> CicError {
        CicError::PermissionDenied {
            user: self.session.user().to_string(),
            url: self.session.base_url().to_string(),
            access,
            resource,
            target: target.to_string(),
            body,
        }
    }

    /// GET a record and map 404/403 to typed errors.
    async fn lookup(&self, resource: Resource, endpoint: Endpoint, identifier: &str) -> CicResult<Value> {
        match self.session.send(CicRequest::get(endpoint)).await {
            Ok(response) => response.json(),
            Err(CicError::Http(failure)) if failure.status == 404 => {
                tracing::debug!("Response code: 404, response body: {}", failure.body);
                Err(CicError::NotFound {
                    resource,
                    identifier: identifier.to_string(),
                    body: failure.body,
                })
            }
            Err(CicError::Http(failure)) if failure.status == 403 => {
                tracing::debug!("Response code: 403, response body: {}", failure.body);
                Err(self.permission_denied(Access::Lookup, resource, identifier, failure.body))
            }
            Err(err) => Err(err),
        }
    }

    /// GET a listing; only 403 carries meaning.
    async fn listing(&self, resource: Resource, endpoint: Endpoint) -> CicResult<Value> {
        match self.session.send(CicRequest::get(endpoint)).await {
            Ok(response) => response.json(),
            Err(CicError::Http(failure)) if failure.status == 403 => {
                tracing::debug!("Response code: 403, response body: {}", failure.body);
                Err(self.permission_denied(Access::Lookup, resource, "*", failure.body))
            }
            Err(err) => Err(err),
        }
    }

    /// Whether the logged-in user holds `privilege`, optionally within a
    /// CIC user group.
    pub async fn has_privilege(&self, privilege: &str, group_id: Option<u32>) -> CicResult<bool> {
        let group_id = group_id.map(|id| id.to_string());
        let mut params = vec![("privilege", privilege)];
        if let Some(id) = group_id.as_deref() {
            params.push(("groupid", id));
        }
        let endpoint = Endpoint::with_params(PRIVILEGE_ENDPOINT, params);

        match self.session.send(CicRequest::get(endpoint)).await {
            Ok(response) if response.status == 200 => Ok(true),
            Ok(response) => Err(CicError::UnexpectedStatus {
                status: response.status,
                url: response.url,
            }),
            Err(CicError::Http(failure)) if failure.status == 403 => {
                tracing::debug!("Response code: 403, response body: {}", failure.body);
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Members of a CIC access group holding one of `roles`.
    pub async fn member_list(
        &self,
        group: &str,
        roles: &[String],
        select: Option<&str>,
    ) -> CicResult<MemberList> {
        if roles.is_empty() {
            return Err(CicError::InvalidArgument(
                "at least one role is required for a member query".to_string(),
            ));
        }
        let endpoint = members_endpoint(group, roles, select);
        let response = self.session.send(CicRequest::get(endpoint)).await?;
        let payload = response.json()?;

        let entries = match payload.get("value").and_then(Value::as_array) {
            Some(entries) if !entries.is_empty() => entries,
            _ => {
                tracing::debug!(
                    "CIC OData query returned an empty result-set. Check used parameters"
                );
                return Ok(MemberList::Empty);
            }
        };

        let Some(field) = select else {
            return Ok(MemberList::Records(payload.clone()));
        };
        Ok(MemberList::Field(
            entries
                .iter()
                .filter_map(|item| item.get(field).and_then(Value::as_str))
                .map(str::to_string)
                .collect(),
        ))
    }

    pub async fn system_by_uid(&self, uid: &str) -> CicResult<Value> {
        tracing::debug!("Call to system_by_uid - uid: {uid}");
        let endpoint = Endpoint::with_params(SYSTEM_ENDPOINT, [("uuid", uid)]);
        self.lookup(Resource::System, endpoint, uid).await
    }

    /// Look up a system by its unique name.
    ///
    /// A 404 is split by body: [`CicError::NotFound`] when TMS reports the
    /// system as absent, [`CicError::Unreachable`] when the lookup failed
    /// on the way.
    pub async fn system_by_name(&self, name: &str) -> CicResult<Value> {
        tracing::debug!("Call to system_by_name - name: {name}");
        let endpoint = Endpoint::with_params(SYSTEM_ENDPOINT, [("name", name)]);
        match self.lookup(Resource::System, endpoint, name).await {
            Err(CicError::NotFound {
                resource,
                identifier,
                body,
            }) if !is_genuinely_absent(&body) => Err(CicError::Unreachable {
                resource,
                identifier,
                body,
            }),
            other => other,
        }
    }

    pub async fn system_uid_by_name(&self, name: &str) -> CicResult<String> {
        let system = self.system_by_name(name).await?;
        record_str(&system, Resource::System, "uuid")
    }

    pub async fn tenant_by_uid(&self, uid: &str) -> CicResult<Value> {
        tracing::debug!("Call to tenant_by_uid - uid: {uid}");
        let endpoint = Endpoint::with_params(TENANT_ENDPOINT, [("uuid", uid)]);
        self.lookup(Resource::Tenant, endpoint, uid).await
    }

    /// Exactly one tenant, identified by the instance it lives on and its
    /// description (which carries the tenant id).
    pub async fn tenant_by_name(&self, instance_name: &str, description: &str) -> CicResult<Value> {
        let endpoint = Endpoint::with_params(
            TENANT_ENDPOINT,
            [("instanceName", instance_name), ("description", description)],
        );
        tracing::debug!("Calling url {}", endpoint.path_and_query());
        let identifier = format!("{instance_name}/{description}");
        self.lookup(Resource::Tenant, endpoint, &identifier).await
    }

    /// Landscapes assigned to a CIC group (OData).
    pub async fn landscapes_by_group(&self, group: &str) -> CicResult<Value> {
        tracing::debug!("Call to landscapes_by_group - group: {group}");
        let response = self
            .session
            .send(CicRequest::get(landscapes_endpoint(group)))
            .await?;
        response.json()
    }

    /// Every system with its name and update group.
    pub async fn instance_list(&self) -> CicResult<Vec<InstanceSummary>> {
        tracing::debug!("Call to instance_list");
        let details = ["name".to_string(), "updateGroup".to_string()];
        let payload = self
            .listing(Resource::System, filtered_listing(SYSTEM_ENDPOINT, &[], &details))
            .await?;
        Ok(parse_instance_list(&payload))
    }

    pub async fn all_tenants(&self) -> CicResult<Value> {
        tracing::debug!("Call to all_tenants");
        let details = ["consumerAccountDisplayName".to_string()];
        self.listing(Resource::Tenant, filtered_listing(TENANT_ENDPOINT, &[], &details))
            .await
    }

    pub async fn systems_by_filter(
        &self,
        filters: &[(String, String)],
        details: &[String],
    ) -> CicResult<Value> {
        tracing::debug!("Call to systems_by_filter");
        self.listing(Resource::System, filtered_listing(SYSTEM_ENDPOINT, filters, details))
            .await
    }

    pub async fn tenants_by_filter(
        &self,
        filters: &[(String, String)],
        details: &[String],
    ) -> CicResult<Value> {
        tracing::debug!("Call to tenants_by_filter");
        self.listing(Resource::Tenant, filtered_listing(TENANT_ENDPOINT, filters, details))
            .await
    }

    /// PATCH a metadata payload and validate the echoed fields.
    async fn patch_metadata(
        &self,
        resource: Resource,
        endpoint: Endpoint,
        target: &str,
        mut payload: Vec<(String, String)>,
        fields: &[(String, String)],
    ) -> CicResult<Value> {
        payload.extend(fields.iter().cloned());
        tracing::debug!(
            "Metadata payload for {resource} '{target}': {:?}",
            payload.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>()
        );

        let request = CicRequest::patch(endpoint, payload).with_depth(METADATA_DEPTH);
        let response = match self.session.send(request).await {
            Ok(response) => response,
            Err(CicError::Http(failure)) if failure.status == 403 => {
                tracing::debug!("Response code: 403, response body: {}", failure.body);
                return Err(self.permission_denied(Access::Update, resource, target, failure.body));
            }
            Err(err) => return Err(err),
        };

        let updated = response.json()?;
        tracing::debug!("Return dict is: {updated}");
        check_fields(&updated, fields, resource)?;
        Ok(updated)
    }

    /// Change one metadata field of a system, e.g. `underMaintenance`.
    pub async fn change_system_metadata(
        &self,
        system_name: &str,
        field: &str,
        value: &str,
    ) -> CicResult<Value> {
        tracing::debug!(
            "Call to change_system_metadata - system: {system_name} parameter: {field} value: {value}"
        );
        let system = self.system_by_name(system_name).await?;
        let payload = vec![
            version_pair(&system, Resource::System)?,
            uuid_pair(&system, Resource::System)?,
            (
                "landscape".to_string(),
                record_str(&system, Resource::System, "landscape")?,
            ),
        ];
        let fields = [(field.to_string(), value.to_string())];
        self.patch_metadata(
            Resource::System,
            Endpoint::new(SYSTEM_ENDPOINT),
            system_name,
            payload,
            &fields,
        )
        .await
    }

    /// Change one metadata field of a tenant.
    pub async fn change_tenant_metadata(
        &self,
        system_name: &str,
        description: &str,
        field: &str,
        value: &str,
    ) -> CicResult<Value> {
        tracing::debug!(
            "Call to change_tenant_metadata - system: {system_name} tenant description: {description} parameter: {field} value: {value}"
        );
        let tenant = self.tenant_by_name(system_name, description).await?;
        let payload = vec![
            version_pair(&tenant, Resource::Tenant)?,
            uuid_pair(&tenant, Resource::Tenant)?,
        ];
        let fields = [(field.to_string(), value.to_string())];
        let target = format!("{system_name}/{description}");
        self.patch_metadata(
            Resource::Tenant,
            Endpoint::new(TENANT_ENDPOINT),
            &target,
            payload,
            &fields,
        )
        .await
    }

    /// Change several tenant metadata fields in one PATCH.
    pub async fn change_tenant_metadata_fields(
        &self,
        system_name: &str,
        description: &str,
        fields: &[(String, String)],
    ) -> CicResult<Value> {
        let tenant = self.tenant_by_name(system_name, description).await?;
        let uuid = uuid_pair(&tenant, Resource::Tenant)?;
        let endpoint = Endpoint::with_params(TENANT_ENDPOINT, [("uuid", uuid.1.as_str())]);
        let payload = vec![version_pair(&tenant, Resource::Tenant)?, uuid];
        let target = format!("{system_name}/{description}");
        self.patch_metadata(Resource::Tenant, endpoint, &target, payload, fields)
            .await
    }

    /// Register a new system. The payload's `name` must not be taken yet.
    pub async fn add_system(&self, payload: &Value) -> CicResult<Value> {
        if is_empty_payload(payload) {
            return Err(CicError::EmptyPayload {
                resource: Resource::System,
            });
        }
        let name = record_str(payload, Resource::System, "name")?;
        match self.system_by_name(&name).await {
            Ok(_) => {
                return Err(CicError::AlreadyExists {
                    resource: Resource::System,
                    identifier: name,
                });
            }
            Err(CicError::NotFound { .. }) => {}
            Err(err) => return Err(err),
        }

        tracing::debug!("Sending POST request to {SYSTEM_ENDPOINT}, payload: {payload}");
        let response = self
            .session
            .send(CicRequest::post(Endpoint::new(SYSTEM_ENDPOINT), payload.clone()))
            .await?;
        match response.status {
            200..=202 => response.json(),
            status => Err(CicError::UnexpectedStatus {
                status,
                url: response.url,
            }),
        }
    }

    /// Create a tenant on the system referenced by `payload.system` (a
    /// system uuid).
    ///
    /// The system name and the upper-cased `description` identify a tenant.
    /// Any record found under that pair refuses the request; only a 404 or
    /// an empty answer lets the POST through.
    pub async fn create_tenant(&self, payload: &Value) -> CicResult<TenantCreation> {
        if is_empty_payload(payload) {
            return Err(CicError::EmptyPayload {
                resource: Resource::Tenant,
            });
        }
        let system_uid = record_str(payload, Resource::Tenant, "system")?;
        let description = record_str(payload, Resource::Tenant, "description")?.to_uppercase();
        let system = self.system_by_uid(&system_uid).await?;
        let system_name = record_str(&system, Resource::System, "name")?;

        let existing = match self.tenant_by_name(&system_name, &description).await {
            Ok(tenant) => tenant,
            Err(CicError::NotFound { .. }) => Value::Null,
            Err(err) => return Err(err),
        };
        if !is_empty_payload(&existing) {
            tracing::debug!("Tenant already present: {existing}");
            return Err(CicError::AlreadyExists {
                resource: Resource::Tenant,
                identifier: format!("{system_name}/{description}"),
            });
        }

        tracing::info!("Starting tenant creation on {system_name} for {description}");
        let response = self
            .session
            .send(CicRequest::post(Endpoint::new(TENANT_ENDPOINT), payload.clone()))
            .await?;
        let creation = TenantCreation {
            status: response.status,
            body: response.json()?,
        };
        if creation.triggered() {
            tracing::info!("Tenant creation successfully triggered");
        }
        Ok(creation)
    }
}

fn is_empty_payload(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// String form of a record field, as sent in a form body.
pub fn record_str(record: &Value, resource: Resource, field: &str) -> CicResult<String> {
    match record.get(field) {
        Some(Value::Null) | None => Err(CicError::MissingField {
            resource,
            field: field.to_string(),
        }),
        Some(value) => Ok(form_value(value)),
    }
}

fn version_pair(record: &Value, resource: Resource) -> CicResult<(String, String)> {
    Ok((
        "versionUuid".to_string(),
        record_str(record, resource, "versionUuid")?,
    ))
}

fn uuid_pair(record: &Value, resource: Resource) -> CicResult<(String, String)> {
    Ok(("uuid".to_string(), record_str(record, resource, "uuid")?))
}

/// Read the `{"details": {"name", "updateGroup"}}` entries of an instance
/// listing. Entries without both fields are skipped.
pub fn parse_instance_list(payload: &Value) -> Vec<InstanceSummary> {
    let Some(entries) = payload.as_array() else {
        tracing::warn!("instance listing is not an array");
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let details = entry.get("details")?;
            let summary = serde_json::from_value::<InstanceSummary>(details.clone()).ok();
            if summary.is_none() {
                tracing::debug!("skipping instance entry without name/updateGroup: {entry}");
            }
            summary
        })
        .collect()
}

/// Strip `prefix` from `text` if present.
pub fn remove_prefix<'a>(text: &'a str, prefix: &str) -> &'a str {
    text.strip_prefix(prefix).unwrap_or(text)
}

/// Cloud host of a system: its `rootUrl` without the
/// `https://<name><hcpAccount>.` prefix.
pub fn cloud_host(system: &Value) -> CicResult<String> {
    let name = record_str(system, Resource::System, "name")?;
    let account = record_str(system, Resource::System, "hcpAccount")?;
    let root_url = record_str(system, Resource::System, "rootUrl")?;
    let prefix = format!("https://{name}{account}.");
    Ok(remove_prefix(&root_url, &prefix).to_string())
}
