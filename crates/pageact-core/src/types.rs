use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeSet;
use std::fmt;

/// Timeout applied to an execution whose configuration does not set one
pub const DEFAULT_ACTION_EXECUTION_TIMEOUT_MS: u64 = 10_000;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

record_id!(
    /// Stable identity of an action record
    ActionId
);
record_id!(
    /// Stable identity of a shared datasource
    DatasourceId
);
record_id!(PluginId);
record_id!(PageId);
record_id!(OrganizationId);
record_id!(ApplicationId);

/// Key/value pair used for headers, query parameters and plugin settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl Property {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: Some(key.into()), value: Some(value.into()) }
    }

    /// True when the key is absent or empty
    pub fn has_empty_key(&self) -> bool {
        self.key.as_deref().map(str::is_empty).unwrap_or(true)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaginationType {
    #[default]
    None,
    PageNo,
    Url,
}

/// Direction requested by the caller for a URL-paginated action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaginationField {
    Next,
    Prev,
}

/// Backend-agnostic execution parameters of an action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_in_millisecond: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub headers: Vec<Property>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_parameters: Option<Vec<Property>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_form_data: Option<Vec<Property>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_specified_templates: Option<Vec<Property>>,
    #[serde(default)]
    pub pagination_type: PaginationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    /// Backend-specific fields the engine does not interpret
    #[serde(default, flatten)]
    pub extra: Map<String, JsonValue>,
}

impl ActionConfiguration {
    /// Effective execution timeout, falling back to `default_ms` when unset or zero
    pub fn timeout_ms_or(&self, default_ms: u64) -> u64 {
        match self.timeout_in_millisecond {
            Some(ms) if ms > 0 => ms,
            _ => default_ms,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authentication {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// Connection parameters of a datasource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasourceConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<Authentication>,
    #[serde(default)]
    pub headers: Vec<Property>,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default, flatten)]
    pub extra: Map<String, JsonValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AclPermission {
    ReadPages,
    ManagePages,
    ReadActions,
    ManageActions,
    ExecuteActions,
    ManageDatasources,
    ExecuteDatasources,
}

/// Grants one permission to a set of users
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Policy {
    pub permission: AclPermission,
    #[serde(default)]
    pub users: BTreeSet<String>,
}

impl Policy {
    pub fn new<I, S>(permission: AclPermission, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { permission, users: users.into_iter().map(Into::into).collect() }
    }
}

/// True when any policy in the set grants `permission`
pub fn grants(policies: &BTreeSet<Policy>, permission: AclPermission) -> bool {
    policies.iter().any(|p| p.permission == permission)
}

/// Named or embedded set of connection parameters.
///
/// A datasource without an `id` is embedded in its action and has no persisted
/// identity; it is validated on every execution and never shares a cached
/// connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Datasource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DatasourceId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_id: Option<PluginId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<OrganizationId>,
    #[serde(default)]
    pub datasource_configuration: DatasourceConfiguration,
    #[serde(default)]
    pub invalids: BTreeSet<String>,
    #[serde(default)]
    pub is_auto_generated: bool,
    #[serde(default)]
    pub policies: BTreeSet<Policy>,
}

impl Datasource {
    pub fn is_embedded(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PluginType {
    Db,
    Api,
    /// Executed in the client only; there is no server-side executor
    Js,
    Saas,
}

impl PluginType {
    pub fn is_client_side(&self) -> bool {
        matches!(self, PluginType::Js)
    }
}

/// Backend connector type; `package_name` keys the executor registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plugin {
    pub id: Option<PluginId>,
    pub name: String,
    #[serde(rename = "type")]
    pub plugin_type: PluginType,
    pub package_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: Option<PageId>,
    pub application_id: Option<ApplicationId>,
    pub name: String,
    #[serde(default)]
    pub policies: BTreeSet<Policy>,
}

/// Selects the draft or the last published snapshot of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewMode {
    Draft,
    Published,
}

impl ViewMode {
    pub fn from_flag(published: bool) -> Self {
        if published {
            ViewMode::Published
        } else {
            ViewMode::Draft
        }
    }
}

/// One state (draft or published) of an action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSnapshot {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub page_id: Option<PageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(default)]
    pub datasource: Option<Datasource>,
    #[serde(default)]
    pub action_configuration: Option<ActionConfiguration>,
    #[serde(default)]
    pub execute_on_load: Option<bool>,
    #[serde(default)]
    pub is_valid: Option<bool>,
    #[serde(default)]
    pub invalids: BTreeSet<String>,
    #[serde(default)]
    pub json_path_keys: BTreeSet<String>,
    #[serde(default)]
    pub cache_response: Option<String>,
    #[serde(default)]
    pub user_set_on_load: Option<bool>,
    #[serde(default)]
    pub confirm_before_execute: Option<bool>,
}

impl ActionSnapshot {
    /// An unset validity flag counts as valid
    pub fn is_valid(&self) -> bool {
        self.is_valid != Some(false)
    }
}

/// Persisted action entity owning the draft and published snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub id: Option<ActionId>,
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
    #[serde(default)]
    pub application_id: Option<ApplicationId>,
    #[serde(default)]
    pub plugin_type: Option<PluginType>,
    #[serde(default)]
    pub plugin_id: Option<PluginId>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub documentation: Option<String>,
    #[serde(default)]
    pub policies: BTreeSet<Policy>,
    pub unpublished_action: ActionSnapshot,
    #[serde(default)]
    pub published_action: Option<ActionSnapshot>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ActionRecord {
    pub fn new(unpublished_action: ActionSnapshot) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            organization_id: None,
            application_id: None,
            plugin_type: None,
            plugin_id: None,
            template_id: None,
            provider_id: None,
            documentation: None,
            policies: BTreeSet::new(),
            unpublished_action,
            published_action: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The snapshot live for `mode`; `None` when the action was never published
    pub fn snapshot(&self, mode: ViewMode) -> Option<&ActionSnapshot> {
        match mode {
            ViewMode::Draft => Some(&self.unpublished_action),
            ViewMode::Published => self.published_action.as_ref(),
        }
    }

    /// Flattened view of the snapshot live for `mode`
    pub fn view(&self, mode: ViewMode) -> Option<Action> {
        let snapshot = self.snapshot(mode)?.clone();
        Some(Action {
            id: self.id.clone(),
            organization_id: self.organization_id.clone(),
            application_id: self.application_id.clone(),
            plugin_type: self.plugin_type,
            plugin_id: self.plugin_id.clone(),
            template_id: self.template_id.clone(),
            provider_id: self.provider_id.clone(),
            documentation: self.documentation.clone(),
            policies: self.policies.clone(),
            snapshot,
        })
    }

    /// Copy the record-level fields of an action view onto this record
    pub fn apply_common_fields(&mut self, action: &Action) {
        self.organization_id = action.organization_id.clone();
        self.plugin_type = action.plugin_type;
        self.plugin_id = action.plugin_id.clone();
        self.template_id = action.template_id.clone();
        self.provider_id = action.provider_id.clone();
        self.documentation = action.documentation.clone();
    }
}

/// An action as seen through one view mode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    #[serde(default)]
    pub id: Option<ActionId>,
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
    #[serde(default)]
    pub application_id: Option<ApplicationId>,
    #[serde(default)]
    pub plugin_type: Option<PluginType>,
    #[serde(default)]
    pub plugin_id: Option<PluginId>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub documentation: Option<String>,
    #[serde(default)]
    pub policies: BTreeSet<Policy>,
    #[serde(flatten)]
    pub snapshot: ActionSnapshot,
}

/// Caller-supplied template parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl Param {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: Some(value.into()) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    pub action_id: ActionId,
    /// `true` executes the published snapshot
    #[serde(default)]
    pub view_mode: bool,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub pagination_field: Option<PaginationField>,
}

impl ExecuteRequest {
    pub fn new(action_id: ActionId) -> Self {
        Self { action_id, view_mode: false, params: Vec::new(), pagination_field: None }
    }

    pub fn published(mut self) -> Self {
        self.view_mode = true;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push(Param::new(key, value));
        self
    }

    pub fn with_pagination(mut self, field: PaginationField) -> Self {
        self.pagination_field = Some(field);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStatistics {
    pub duration_ms: u64,
    /// Backend invocations made, including the stale-connection retry
    pub attempts: u32,
}

/// Normalized outcome of an execution, successful or not
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub is_execution_success: bool,
    #[serde(default)]
    pub body: Option<JsonValue>,
    #[serde(default)]
    pub status_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<ExecutionStatistics>,
}

impl ExecutionResult {
    pub fn success(body: JsonValue) -> Self {
        Self { is_execution_success: true, body: Some(body), ..Default::default() }
    }

    pub fn failure(status_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            is_execution_success: false,
            body: Some(JsonValue::String(message.into())),
            status_code: Some(status_code.into()),
            ..Default::default()
        }
    }

    pub fn with_status_code(mut self, status_code: impl Into<String>) -> Self {
        self.status_code = Some(status_code.into());
        self
    }

    pub fn with_headers(mut self, headers: JsonValue) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Text form of the body used for the response cache; `None` when there is
    /// nothing worth caching
    pub fn cacheable_body(&self) -> Option<String> {
        match self.body.as_ref()? {
            JsonValue::Null => None,
            JsonValue::String(s) if s.is_empty() => None,
            JsonValue::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}
