//! Endpoint paths and query-string construction.
//!
//! TMS endpoints take standard form-urlencoded parameters (repeated
//! `details[]` keys for field selection); the OData endpoints take a
//! percent-encoded `$filter` expression.

use url::form_urlencoded;

pub const LOGIN_ENDPOINT: &str = "/login";
pub const SYSTEM_ENDPOINT: &str = "/TMS/systems";
pub const TENANT_ENDPOINT: &str = "/TMS/tenants";
pub const USERS_ENDPOINT: &str = "/odata/Users";
pub const LANDSCAPES_ENDPOINT: &str = "/odata/Landscapes";
pub const PRIVILEGE_ENDPOINT: &str = "/hasPrivilege";

const DETAILS_KEY: &str = "details[]";
const COMPLETE_RESULTS_KEY: &str = "enforce_complete_results";

/// A path relative to the CIC base URL plus an already-encoded query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    path: String,
    query: Option<String>,
}

impl Endpoint {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: None,
        }
    }

    /// Endpoint with form-urlencoded parameters, in the given order.
    pub fn with_params<'a, I>(path: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in params {
            serializer.append_pair(key, value);
        }
        let query = serializer.finish();
        Self {
            path: path.into(),
            query: (!query.is_empty()).then_some(query),
        }
    }

    /// Endpoint with a query string the caller has encoded itself.
    pub fn with_raw_query(path: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Some(query.into()),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{query}", self.path),
            None => self.path.clone(),
        }
    }
}

/// Listing endpoint with attribute filters and `details[]` selectors.
///
/// Without any parameter the bare endpoint is returned; otherwise
/// `enforce_complete_results=true` is appended so TMS does not truncate.
pub fn filtered_listing(path: &str, filters: &[(String, String)], details: &[String]) -> Endpoint {
    if filters.is_empty() && details.is_empty() {
        return Endpoint::new(path);
    }
    let params = filters
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .chain(details.iter().map(|name| (DETAILS_KEY, name.as_str())))
        .chain(std::iter::once((COMPLETE_RESULTS_KEY, "true")));
    Endpoint::with_params(path, params)
}

/// OData filter selecting the members of `group` holding any of `roles`.
pub fn member_filter(group: &str, roles: &[String]) -> String {
    roles
        .iter()
        .map(|role| format!("groupname eq '{group}' and role eq '{role}'"))
        .collect::<Vec<_>>()
        .join(" or ")
}

pub fn members_endpoint(group: &str, roles: &[String], select: Option<&str>) -> Endpoint {
    let mut query = format!("$filter={}", urlencoding::encode(&member_filter(group, roles)));
    if let Some(field) = select {
        query.push_str("&$select=");
        query.push_str(field);
    }
    Endpoint::with_raw_query(USERS_ENDPOINT, query)
}

pub fn landscapes_endpoint(group: &str) -> Endpoint {
    let filter = format!("groupname eq '{group}'");
    Endpoint::with_raw_query(
        LANDSCAPES_ENDPOINT,
        format!("$filter={}&$select=landscape", urlencoding::encode(&filter)),
    )
}
