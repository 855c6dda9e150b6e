mod common;

use common::{draft, embedded_draft, Harness};
use pageact_core::{
    error::reasons, store::ActionRepository, AclPermission, ActionConfiguration, ActionId,
    ActionSnapshot, ApplicationId, Datasource, DatasourceId, DocumentKind, OrganizationId, PageId,
    PluginId, PluginType, Policy, PolicyGenerator, ViewMode,
};
use pageact_runtime::{ActionService, PluginDatasourceValidator};
use std::collections::BTreeSet;
use std::sync::Arc;

fn keys(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn created_action_inherits_from_page_datasource_and_plugin() {
    let h = Harness::new().await;

    let action = h.service.create_action(draft("getUsers")).await.unwrap();

    assert!(action.id.is_some());
    assert_eq!(action.application_id, Some(ApplicationId::new("app-1")));
    assert_eq!(action.organization_id, Some(OrganizationId::new("org-1")));
    assert_eq!(action.plugin_type, Some(PluginType::Db));
    assert_eq!(action.plugin_id, Some(PluginId::new("pg")));

    let permissions: BTreeSet<_> = action.policies.iter().map(|p| p.permission).collect();
    assert_eq!(
        permissions,
        BTreeSet::from([
            AclPermission::ManageActions,
            AclPermission::ReadActions,
            AclPermission::ExecuteActions
        ])
    );

    assert_eq!(action.snapshot.is_valid, Some(true));
    assert!(action.snapshot.invalids.is_empty());
    assert_eq!(action.snapshot.json_path_keys, keys(&["dbName", "id"]));
    // The stored datasource replaces the reference on the draft
    let datasource = action.snapshot.datasource.unwrap();
    assert_eq!(datasource.name.as_deref(), Some("Users DB"));
}

/// Grants execution only, to whoever can read the parent page
struct ExecuteOnly;

impl PolicyGenerator for ExecuteOnly {
    fn derive_policies(
        &self,
        parent_policies: &BTreeSet<Policy>,
        parent_kind: DocumentKind,
        child_kind: DocumentKind,
    ) -> BTreeSet<Policy> {
        assert_eq!((parent_kind, child_kind), (DocumentKind::Page, DocumentKind::Action));
        parent_policies
            .iter()
            .filter(|p| p.permission == AclPermission::ReadPages)
            .map(|p| Policy::new(AclPermission::ExecuteActions, p.users.iter().cloned()))
            .collect()
    }
}

#[tokio::test]
async fn custom_policy_generator_decides_action_permissions() {
    let h = Harness::new().await;
    let validator =
        Arc::new(PluginDatasourceValidator::new(h.registry.clone(), h.stores.plugins.clone()));
    let service =
        ActionService::new(h.stores.clone(), validator).with_policy_generator(Arc::new(ExecuteOnly));

    let action = service.create_action(draft("getUsers")).await.unwrap();

    let expected = BTreeSet::from([Policy::new(AclPermission::ExecuteActions, ["dev"])]);
    assert_eq!(action.policies, expected);
    let id = action.id.unwrap();
    assert!(h.actions.find_by_id(&id, Some(AclPermission::ExecuteActions)).await.unwrap().is_some());
    assert!(h.actions.find_by_id(&id, Some(AclPermission::ManageActions)).await.unwrap().is_none());
}

#[tokio::test]
async fn create_rejects_preassigned_id_and_blank_page() {
    let h = Harness::new().await;

    let mut with_id = draft("getUsers");
    with_id.id = Some(ActionId::new("a1"));
    let err = h.service.create_action(with_id).await.unwrap_err();
    assert_eq!(err.code(), "4000");
    assert_eq!(err.to_string(), "Please enter a valid parameter id.");

    let mut blank_page = draft("getUsers");
    blank_page.snapshot.page_id = Some(PageId::new("  "));
    let err = h.service.create_action(blank_page).await.unwrap_err();
    assert_eq!(err.to_string(), "Please enter a valid parameter pageId.");

    assert_eq!(h.actions.write_count(), 0);
}

#[tokio::test]
async fn create_on_unknown_page_is_not_found() {
    let h = Harness::new().await;
    let mut action = draft("getUsers");
    action.snapshot.page_id = Some(PageId::new("missing"));

    let err = h.service.create_action(action).await.unwrap_err();

    assert_eq!(err.code(), "4028");
    assert_eq!(err.to_string(), "Unable to find page missing");
}

#[tokio::test]
async fn embedded_datasource_without_organization_is_rejected_before_saving() {
    let h = Harness::new().await;
    let mut action = embedded_draft("inline", Some("postgres://inline/app"));
    if let Some(datasource) = action.snapshot.datasource.as_mut() {
        datasource.organization_id = None;
    }

    let err = h.service.create_action(action).await.unwrap_err();

    assert_eq!(err.to_string(), "Please enter a valid parameter organizationId.");
    assert_eq!(h.actions.write_count(), 0);
}

#[tokio::test]
async fn embedded_datasource_organization_is_copied_to_action() {
    let h = Harness::new().await;
    let action = h
        .service
        .create_action(embedded_draft("inline", Some("postgres://inline/app")))
        .await
        .unwrap();

    assert_eq!(action.organization_id, Some(OrganizationId::new("org-1")));
    assert_eq!(action.snapshot.is_valid, Some(true));
}

#[tokio::test]
async fn embedded_datasource_defects_are_recorded_on_the_datasource() {
    let h = Harness::new().await;
    let action = h.service.create_action(embedded_draft("inline", None)).await.unwrap();

    let datasource = action.snapshot.datasource.unwrap();
    assert_eq!(datasource.invalids, keys(&["Missing URL."]));
    // The action itself stays valid; execution rejects it instead
    assert_eq!(action.snapshot.is_valid, Some(true));
}

#[tokio::test]
async fn bad_name_is_saved_as_invalid_draft() {
    let h = Harness::new().await;
    let action = h.service.create_action(draft("get users")).await.unwrap();

    assert_eq!(action.snapshot.is_valid, Some(false));
    assert_eq!(action.snapshot.invalids, keys(&[reasons::INVALID_ACTION_NAME]));
    assert_eq!(h.actions.len().await, 1);
}

#[tokio::test]
async fn blank_name_is_a_hard_error() {
    let h = Harness::new().await;

    let err = h.service.create_action(draft(" ")).await.unwrap_err();

    assert_eq!(err.to_string(), "Please enter a valid parameter name.");
    assert!(h.actions.is_empty().await);
}

#[tokio::test]
async fn missing_configuration_and_datasource_are_reasons() {
    let h = Harness::new().await;
    let mut action = draft("getUsers");
    action.snapshot.action_configuration = None;
    action.snapshot.datasource = None;

    let saved = h.service.create_action(action).await.unwrap();

    assert_eq!(saved.snapshot.is_valid, Some(false));
    assert_eq!(
        saved.snapshot.invalids,
        keys(&[reasons::NO_CONFIGURATION_FOUND_IN_ACTION, reasons::DATASOURCE_NOT_GIVEN])
    );
}

#[tokio::test]
async fn client_side_actions_need_no_datasource() {
    let h = Harness::new().await;
    let mut action = draft("formatRows");
    action.snapshot.datasource = None;
    action.plugin_type = Some(PluginType::Js);

    let saved = h.service.create_action(action).await.unwrap();

    assert_eq!(saved.snapshot.is_valid, Some(true));
}

#[tokio::test]
async fn auto_generated_datasource_counts_as_missing() {
    let h = Harness::new().await;
    let mut action = draft("getUsers");
    if let Some(datasource) = action.snapshot.datasource.as_mut() {
        datasource.is_auto_generated = true;
    }

    let saved = h.service.create_action(action).await.unwrap();

    assert_eq!(saved.snapshot.invalids, keys(&[reasons::DATASOURCE_NOT_GIVEN]));
}

#[tokio::test]
async fn missing_stored_datasource_is_a_reason() {
    let h = Harness::new().await;
    let mut action = draft("getUsers");
    action.snapshot.datasource = Some(Datasource {
        id: Some(DatasourceId::new("ds-gone")),
        plugin_id: Some(PluginId::new("pg")),
        ..Default::default()
    });

    let saved = h.service.create_action(action).await.unwrap();

    assert_eq!(saved.snapshot.is_valid, Some(false));
    assert_eq!(saved.snapshot.invalids, keys(&["Unable to find datasource ds-gone"]));
}

#[tokio::test]
async fn datasource_without_plugin_is_a_hard_error() {
    let h = Harness::new().await;
    let mut action = embedded_draft("inline", Some("postgres://inline/app"));
    if let Some(datasource) = action.snapshot.datasource.as_mut() {
        datasource.plugin_id = None;
    }

    let err = h.service.create_action(action).await.unwrap_err();

    assert_eq!(err.code(), "4009");
}

#[tokio::test]
async fn unknown_plugin_is_a_reason_and_clears_plugin_fields() {
    let h = Harness::new().await;
    let mut action = embedded_draft("inline", Some("mongodb://inline/app"));
    if let Some(datasource) = action.snapshot.datasource.as_mut() {
        datasource.plugin_id = Some(PluginId::new("mongo"));
    }

    let saved = h.service.create_action(action).await.unwrap();

    assert_eq!(saved.snapshot.is_valid, Some(false));
    assert!(saved.snapshot.invalids.contains("Unable to find plugin mongo"));
    assert_eq!(saved.plugin_type, None);
    assert_eq!(saved.plugin_id, None);
}

#[tokio::test]
async fn update_merges_set_fields_and_revalidates() {
    let h = Harness::new().await;
    let id = h.create(draft("get users")).await;

    let patch = pageact_core::Action {
        snapshot: ActionSnapshot {
            name: Some("getUsers".into()),
            action_configuration: Some(ActionConfiguration {
                body: Some("select * from users limit {{ limit }}".into()),
                ..Default::default()
            }),
            ..Default::default()
        },
        ..Default::default()
    };
    let updated = h.service.update_unpublished_action(Some(&id), patch).await.unwrap();

    assert_eq!(updated.snapshot.name.as_deref(), Some("getUsers"));
    assert_eq!(updated.snapshot.page_id, Some(PageId::new("p1")));
    assert_eq!(updated.snapshot.is_valid, Some(true));
    assert!(updated.snapshot.invalids.is_empty());
    assert_eq!(updated.snapshot.json_path_keys, keys(&["dbName", "limit"]));
}

#[tokio::test]
async fn update_replaces_fixed_embedded_datasource_defects() {
    let h = Harness::new().await;
    let created = h.service.create_action(embedded_draft("inline", None)).await.unwrap();
    let mut datasource = created.snapshot.datasource.clone().unwrap();
    assert_eq!(datasource.invalids, keys(&["Missing URL."]));

    // Editors send the datasource back as they last saw it, defects included
    datasource.datasource_configuration.url = Some("postgres://inline/app".into());
    let patch = pageact_core::Action {
        snapshot: ActionSnapshot { datasource: Some(datasource), ..Default::default() },
        ..Default::default()
    };
    let updated = h
        .service
        .update_unpublished_action(created.id.as_ref(), patch)
        .await
        .unwrap();

    let datasource = updated.snapshot.datasource.unwrap();
    assert!(datasource.invalids.is_empty(), "{:?}", datasource.invalids);
    let stored = h.actions.find_by_id(created.id.as_ref().unwrap(), None).await.unwrap().unwrap();
    assert!(stored.unpublished_action.datasource.unwrap().invalids.is_empty());
}

#[tokio::test]
async fn update_requires_an_id() {
    let h = Harness::new().await;

    let err = h
        .service
        .update_unpublished_action(None, draft("getUsers"))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "4000");
}

#[tokio::test]
async fn save_action_replaces_draft_without_validation() {
    let h = Harness::new().await;
    let id = h.create(draft("getUsers")).await;

    let mut action = h.service.get_action(&id, ViewMode::Draft, None).await.unwrap();
    action.snapshot.name = Some("not a name".into());
    action.snapshot.execute_on_load = Some(true);
    h.service.save_action(action).await.unwrap();

    let stored = h.actions.find_by_id(&id, None).await.unwrap().unwrap();
    assert_eq!(stored.unpublished_action.name.as_deref(), Some("not a name"));
    assert_eq!(stored.unpublished_action.execute_on_load, Some(true));
    assert_eq!(stored.unpublished_action.is_valid, Some(true));
}

#[tokio::test]
async fn publish_copies_draft_and_views_diverge() {
    let h = Harness::new().await;
    let id = h.create(draft("getUsers")).await;

    let err = h.service.get_action(&id, ViewMode::Published, None).await.unwrap_err();
    assert_eq!(err.code(), "4028");

    h.service.publish_action(&id).await.unwrap();

    let mut edit = h.service.get_action(&id, ViewMode::Draft, None).await.unwrap();
    edit.snapshot.execute_on_load = Some(true);
    h.service.save_action(edit).await.unwrap();

    let published = h.service.get_action(&id, ViewMode::Published, None).await.unwrap();
    let draft_view = h.service.get_action(&id, ViewMode::Draft, None).await.unwrap();
    assert_eq!(published.snapshot.execute_on_load, None);
    assert_eq!(draft_view.snapshot.execute_on_load, Some(true));
}

#[tokio::test]
async fn lookup_by_draft_name_respects_permissions() {
    let h = Harness::new().await;
    h.create(draft("getUsers")).await;
    let page = PageId::new("p1");

    let found = h
        .service
        .find_by_unpublished_name_and_page_id("getUsers", &page, Some(AclPermission::ReadActions))
        .await
        .unwrap();
    assert_eq!(found.unwrap().snapshot.name.as_deref(), Some("getUsers"));

    let missing = h
        .service
        .find_by_unpublished_name_and_page_id("getOrders", &page, None)
        .await
        .unwrap();
    assert!(missing.is_none());

    let denied = h
        .service
        .find_by_unpublished_name_and_page_id("getUsers", &page, Some(AclPermission::ManagePages))
        .await
        .unwrap();
    assert!(denied.is_none());
}
