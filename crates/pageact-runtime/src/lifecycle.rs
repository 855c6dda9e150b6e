//! Creation, validation and persistence of action records

use crate::error::RuntimeResult;
use crate::stores::Stores;
use crate::validator::DatasourceValidator;
use once_cell::sync::Lazy;
use pageact_core::{
    error::reasons, template, AclPermission, Action, ActionConfiguration, ActionId, ActionRecord,
    ActionSnapshot, CoreError, DefaultPolicyGenerator, DocumentKind, PageId, PluginType,
    PolicyGenerator, ViewMode,
};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::Arc;

static ACTION_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Java keywords and literals, which cannot name an action
const RESERVED_NAMES: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class",
    "const", "continue", "default", "do", "double", "else", "enum", "extends", "false",
    "final", "finally", "float", "for", "goto", "if", "implements", "import", "instanceof",
    "int", "interface", "long", "native", "new", "null", "package", "private", "protected",
    "public", "return", "short", "static", "strictfp", "super", "switch", "synchronized",
    "this", "throw", "throws", "transient", "true", "try", "void", "volatile", "while",
];

/// True when `name` can be used as an action name
pub fn is_valid_action_name(name: &str) -> bool {
    ACTION_NAME.is_match(name) && !RESERVED_NAMES.contains(&name)
}

/// Template keys referenced by an action configuration
pub fn extract_template_keys(configuration: Option<&ActionConfiguration>) -> BTreeSet<String> {
    configuration.map(template::extract_keys).unwrap_or_default()
}

/// Overlay the set fields of `incoming` onto `stored`.
///
/// Option fields are copied only when `Some`; set-valued fields only when
/// non-empty.
pub fn merge_snapshot(stored: &mut ActionSnapshot, incoming: ActionSnapshot) {
    fn overlay<T>(target: &mut Option<T>, value: Option<T>) {
        if value.is_some() {
            *target = value;
        }
    }

    overlay(&mut stored.name, incoming.name);
    overlay(&mut stored.page_id, incoming.page_id);
    overlay(&mut stored.collection_id, incoming.collection_id);
    overlay(&mut stored.datasource, incoming.datasource);
    overlay(&mut stored.action_configuration, incoming.action_configuration);
    overlay(&mut stored.execute_on_load, incoming.execute_on_load);
    overlay(&mut stored.is_valid, incoming.is_valid);
    overlay(&mut stored.cache_response, incoming.cache_response);
    overlay(&mut stored.user_set_on_load, incoming.user_set_on_load);
    overlay(&mut stored.confirm_before_execute, incoming.confirm_before_execute);
    if !incoming.invalids.is_empty() {
        stored.invalids = incoming.invalids;
    }
    if !incoming.json_path_keys.is_empty() {
        stored.json_path_keys = incoming.json_path_keys;
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |s| s.trim().is_empty())
}

fn page_id_is_blank(page_id: Option<&PageId>) -> bool {
    is_blank(page_id.map(PageId::as_str))
}

/// Action lifecycle operations over the stores
pub struct ActionService {
    stores: Stores,
    validator: Arc<dyn DatasourceValidator>,
    policy_generator: Arc<dyn PolicyGenerator>,
}

impl ActionService {
    pub fn new(stores: Stores, validator: Arc<dyn DatasourceValidator>) -> Self {
        Self { stores, validator, policy_generator: Arc::new(DefaultPolicyGenerator) }
    }

    pub fn with_policy_generator(mut self, generator: Arc<dyn PolicyGenerator>) -> Self {
        self.policy_generator = generator;
        self
    }

    /// Create a new action on a page; the draft is validated before saving
    pub async fn create_action(&self, action: Action) -> RuntimeResult<Action> {
        if action.id.is_some() {
            return Err(CoreError::invalid_parameter("id").into());
        }
        let Some(page_id) = action.snapshot.page_id.clone().filter(|id| !page_id_is_blank(Some(id)))
        else {
            return Err(CoreError::invalid_parameter("pageId").into());
        };

        let page = self
            .stores
            .pages
            .find_by_id(&page_id, Some(AclPermission::ReadPages))
            .await?
            .ok_or_else(|| CoreError::not_found("page", &page_id))?;

        let mut action = action;
        // An embedded datasource has no stored owner to inherit from
        if let Some(datasource) = action.snapshot.datasource.as_ref().filter(|ds| ds.is_embedded()) {
            let Some(organization_id) = datasource.organization_id.clone() else {
                return Err(CoreError::invalid_parameter("organizationId").into());
            };
            action.organization_id = Some(organization_id);
        }

        let mut record = ActionRecord::new(action.snapshot.clone());
        record.apply_common_fields(&action);
        record.application_id = page.application_id.clone();
        record.policies = self.policy_generator.derive_policies(
            &page.policies,
            DocumentKind::Page,
            DocumentKind::Action,
        );

        tracing::info!(page_id = %page_id, name = ?action.snapshot.name, "Creating action");
        self.validate_and_save(record).await
    }

    /// Validate the draft snapshot and persist the record.
    ///
    /// Blank name or page id rejects the save. Any other defect marks the draft
    /// invalid and is recorded in its invalid reasons, but the record is still
    /// saved so the draft is not lost.
    pub async fn validate_and_save(&self, mut record: ActionRecord) -> RuntimeResult<Action> {
        let mut invalids = BTreeSet::new();
        let draft = &record.unpublished_action;

        let name = match draft.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => return Err(CoreError::invalid_parameter("name").into()),
        };
        if page_id_is_blank(draft.page_id.as_ref()) {
            return Err(CoreError::invalid_parameter("pageId").into());
        }

        if !is_valid_action_name(&name) {
            invalids.insert(reasons::INVALID_ACTION_NAME.to_string());
        }
        if draft.action_configuration.is_none() {
            invalids.insert(reasons::NO_CONFIGURATION_FOUND_IN_ACTION.to_string());
        }

        let datasource = draft.datasource.clone().filter(|ds| !ds.is_auto_generated);
        let Some(mut datasource) = datasource else {
            if record.plugin_type != Some(PluginType::Js) {
                invalids.insert(reasons::DATASOURCE_NOT_GIVEN.to_string());
            }
            return self.save_validated(record, invalids).await;
        };

        match datasource.id.clone() {
            None => {
                let defects = self.validator.validate(&datasource).await;
                datasource.invalids = defects.into_iter().collect();
            }
            Some(id) => {
                let found = self
                    .stores
                    .datasources
                    .find_by_id(&id, Some(AclPermission::ManageDatasources))
                    .await?;
                match found {
                    Some(found) => {
                        record.organization_id = found.organization_id.clone();
                        datasource = found;
                    }
                    None => {
                        invalids.insert(reasons::no_resource_found("datasource", id.as_str()));
                    }
                }
            }
        }

        let plugin_id = datasource.plugin_id.clone().ok_or(CoreError::PluginIdNotGiven)?;
        match self.stores.plugins.find_by_id(&plugin_id).await? {
            Some(plugin) => {
                record.plugin_type = Some(plugin.plugin_type);
                record.plugin_id = plugin.id;
            }
            None => {
                invalids.insert(reasons::no_resource_found("plugin", plugin_id.as_str()));
                record.plugin_type = None;
                record.plugin_id = None;
            }
        }

        let mut keys = extract_template_keys(record.unpublished_action.action_configuration.as_ref());
        keys.extend(template::extract_keys(&datasource.datasource_configuration));
        record.unpublished_action.json_path_keys = keys;
        record.unpublished_action.datasource = Some(datasource);

        self.save_validated(record, invalids).await
    }

    async fn save_validated(
        &self,
        mut record: ActionRecord,
        invalids: BTreeSet<String>,
    ) -> RuntimeResult<Action> {
        let draft = &mut record.unpublished_action;
        draft.is_valid = Some(invalids.is_empty());
        draft.invalids = invalids;

        if !draft.is_valid() {
            tracing::debug!(name = ?draft.name, invalids = ?draft.invalids, "Saving invalid action draft");
        }

        let saved = self.stores.actions.save(record).await?;
        let view = saved.view(ViewMode::Draft).ok_or(CoreError::RepositorySaveFailed)?;
        Ok(view)
    }

    /// Merge the set fields of `action` into the stored draft, then revalidate
    pub async fn update_unpublished_action(
        &self,
        id: Option<&ActionId>,
        action: Action,
    ) -> RuntimeResult<Action> {
        let id = id.ok_or_else(|| CoreError::invalid_parameter("id"))?;
        let mut record = self.find_record(id, AclPermission::ManageActions).await?;

        merge_snapshot(&mut record.unpublished_action, action.snapshot);
        tracing::info!(action_id = %id, "Updating action draft");
        self.validate_and_save(record).await
    }

    /// Replace the stored draft wholesale without revalidating
    pub async fn save_action(&self, action: Action) -> RuntimeResult<Action> {
        let id = action.id.clone().ok_or_else(|| CoreError::invalid_parameter("id"))?;
        let mut record = self.find_record(&id, AclPermission::ManageActions).await?;

        record.unpublished_action = action.snapshot;
        let saved = self.stores.actions.save(record).await?;
        Ok(saved.view(ViewMode::Draft).ok_or(CoreError::RepositorySaveFailed)?)
    }

    /// Copy the draft into the published snapshot
    pub async fn publish_action(&self, id: &ActionId) -> RuntimeResult<Action> {
        let mut record = self.find_record(id, AclPermission::ManageActions).await?;

        record.published_action = Some(record.unpublished_action.clone());
        let saved = self.stores.actions.save(record).await?;
        tracing::info!(action_id = %id, "Published action");
        Ok(saved.view(ViewMode::Published).ok_or(CoreError::RepositorySaveFailed)?)
    }

    pub async fn get_action(
        &self,
        id: &ActionId,
        view_mode: ViewMode,
        permission: Option<AclPermission>,
    ) -> RuntimeResult<Action> {
        let record = self
            .stores
            .actions
            .find_by_id(id, permission)
            .await?
            .ok_or_else(|| CoreError::not_found("action", id))?;
        Ok(record.view(view_mode).ok_or_else(|| CoreError::not_found("action", id))?)
    }

    pub async fn find_by_unpublished_name_and_page_id(
        &self,
        name: &str,
        page_id: &PageId,
        permission: Option<AclPermission>,
    ) -> RuntimeResult<Option<Action>> {
        let record = self
            .stores
            .actions
            .find_by_unpublished_name_and_page_id(name, page_id, permission)
            .await?;
        Ok(record.and_then(|r| r.view(ViewMode::Draft)))
    }

    async fn find_record(
        &self,
        id: &ActionId,
        permission: AclPermission,
    ) -> RuntimeResult<ActionRecord> {
        let record = self
            .stores
            .actions
            .find_by_id(id, Some(permission))
            .await?
            .ok_or_else(|| CoreError::not_found("action", id))?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_name_grammar() {
        for good in ["getUsers", "_private", "Query1", "fetch_all_2"] {
            assert!(is_valid_action_name(good), "{good}");
        }
        for bad in ["1query", "get-users", "-get", "get users", "", "null", "class", "get$"] {
            assert!(!is_valid_action_name(bad), "{bad}");
        }
    }

    #[test]
    fn only_java_keywords_are_reserved() {
        let script_words = [
            "delete", "function", "eval", "arguments", "typeof", "let", "var", "in", "with",
            "yield", "await", "debugger", "export",
        ];
        for name in script_words {
            assert!(is_valid_action_name(name), "{name}");
        }
        for name in ["strictfp", "assert", "true", "false", "synchronized"] {
            assert!(!is_valid_action_name(name), "{name}");
        }
    }

    #[test]
    fn merge_keeps_stored_values_for_unset_fields() {
        let mut stored = ActionSnapshot {
            name: Some("getUsers".into()),
            page_id: Some(PageId::new("p1")),
            execute_on_load: Some(true),
            action_configuration: Some(ActionConfiguration {
                body: Some("select 1".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let incoming = ActionSnapshot {
            action_configuration: Some(ActionConfiguration {
                body: Some("select 2".into()),
                ..Default::default()
            }),
            execute_on_load: Some(false),
            ..Default::default()
        };

        merge_snapshot(&mut stored, incoming);
        assert_eq!(stored.name.as_deref(), Some("getUsers"));
        assert_eq!(stored.page_id, Some(PageId::new("p1")));
        assert_eq!(stored.execute_on_load, Some(false));
        assert_eq!(
            stored.action_configuration.unwrap().body.as_deref(),
            Some("select 2")
        );
    }

    #[test]
    fn template_keys_of_missing_configuration_are_empty() {
        assert!(extract_template_keys(None).is_empty());

        let config = ActionConfiguration {
            path: Some("/users/{{ Table1.selectedRow.id }}".into()),
            ..Default::default()
        };
        assert_eq!(
            extract_template_keys(Some(&config)).into_iter().collect::<Vec<_>>(),
            vec!["Table1.selectedRow.id".to_string()]
        );
    }
}
