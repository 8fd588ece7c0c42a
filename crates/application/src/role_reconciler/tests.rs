use std::collections::BTreeSet;
use std::sync::Arc;

use iamsync_core::{AppError, AppResult, OrganizationId};
use iamsync_domain::{CustomRoleDefinition, CustomRoleDefinitionInput, RemoteRole};

use crate::test_support::{FakeIdentityProvider, ProviderCall};

use super::{RoleReconcileOutcome, RoleReconciler};

fn organization() -> AppResult<OrganizationId> {
    OrganizationId::new("123")
}

fn definition(
    included: &[&str],
    base_roles: &[&str],
    excluded: &[&str],
) -> AppResult<CustomRoleDefinition> {
    let strings = |values: &[&str]| -> Vec<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    };
    CustomRoleDefinition::new(CustomRoleDefinitionInput {
        id: "viewer-x".to_owned(),
        title: "Viewer X".to_owned(),
        description: "Reads things".to_owned(),
        role_type: Some("Regular".to_owned()),
        included_permissions: strings(included),
        excluded_permissions: strings(excluded),
        base_roles: strings(base_roles),
        stage: None,
        ..CustomRoleDefinitionInput::default()
    })
}

fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

#[tokio::test]
async fn creates_role_when_absent() -> AppResult<()> {
    let provider = Arc::new(FakeIdentityProvider::default());
    let reconciler = RoleReconciler::new(provider.clone());

    let outcome = reconciler
        .reconcile(&definition(&["a.get", "b.get"], &[], &[])?, &organization()?)
        .await?;

    let RoleReconcileOutcome::Created { role } = outcome else {
        return Err(AppError::Internal(format!("expected Created, got {outcome:?}")));
    };
    assert!(role.description.starts_with("Access Level: Regular."));
    assert_eq!(role.included_permissions, set(&["a.get", "b.get"]));
    assert_eq!(
        provider.calls().await,
        vec![
            ProviderCall::GetOrgCustomRole("organizations/123/roles/viewer-x".to_owned()),
            ProviderCall::CreateOrgCustomRole("organizations/123/roles/viewer-x".to_owned()),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn second_run_is_unchanged_without_writes() -> AppResult<()> {
    let provider = Arc::new(FakeIdentityProvider::default());
    let reconciler = RoleReconciler::new(provider.clone());
    let definition = definition(&["a.get", "b.get"], &[], &[])?;

    reconciler.reconcile(&definition, &organization()?).await?;
    let second = reconciler.reconcile(&definition, &organization()?).await?;

    assert!(matches!(second, RoleReconcileOutcome::Unchanged { .. }));
    assert_eq!(provider.write_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn patches_role_and_reports_delta() -> AppResult<()> {
    let provider = Arc::new(
        FakeIdentityProvider::default()
            .with_custom_role(
                "organizations/123/roles/viewer-x",
                RemoteRole {
                    name: "organizations/123/roles/viewer-x".to_owned(),
                    title: "Viewer X".to_owned(),
                    description: "Access Level: Regular. Reads things".to_owned(),
                    included_permissions: set(&["a.get"]),
                    ..RemoteRole::default()
                },
            )
            .await,
    );
    let reconciler = RoleReconciler::new(provider.clone());

    let outcome = reconciler
        .reconcile(&definition(&["a.get", "b.get"], &[], &[])?, &organization()?)
        .await?;

    let RoleReconcileOutcome::Updated { delta, .. } = outcome else {
        return Err(AppError::Internal(format!("expected Updated, got {outcome:?}")));
    };
    assert_eq!(delta.added_permissions, set(&["b.get"]));
    assert!(delta.removed_permissions.is_empty());
    assert!(provider.calls().await.contains(&ProviderCall::PatchOrgCustomRole(
        "organizations/123/roles/viewer-x".to_owned(),
        vec![
            "title".to_owned(),
            "description".to_owned(),
            "includedPermissions".to_owned(),
        ],
    )));
    Ok(())
}

#[tokio::test]
async fn description_change_alone_triggers_patch() -> AppResult<()> {
    let provider = Arc::new(
        FakeIdentityProvider::default()
            .with_custom_role(
                "organizations/123/roles/viewer-x",
                RemoteRole {
                    title: "Viewer X".to_owned(),
                    description: "Reads things".to_owned(),
                    included_permissions: set(&["a.get"]),
                    ..RemoteRole::default()
                },
            )
            .await,
    );
    let reconciler = RoleReconciler::new(provider.clone());

    let outcome = reconciler
        .reconcile(&definition(&["a.get"], &[], &[])?, &organization()?)
        .await?;

    let RoleReconcileOutcome::Updated { delta, .. } = outcome else {
        return Err(AppError::Internal(format!("expected Updated, got {outcome:?}")));
    };
    assert!(delta.description_changed);
    assert!(!delta.title_changed);
    Ok(())
}

#[tokio::test]
async fn base_roles_are_expanded_and_excluded_last() -> AppResult<()> {
    let provider = Arc::new(
        FakeIdentityProvider::default()
            .with_base_role("roles/viewer", &["b.get", "c.delete"])
            .await
            .with_base_role("organizations/9/roles/auditor", &["d.list"])
            .await,
    );
    let reconciler = RoleReconciler::new(provider.clone());

    let permissions = reconciler
        .resolve_permissions(&definition(
            &["a.get"],
            &["roles/viewer", "organizations/9/roles/auditor"],
            &["c.delete"],
        )?)
        .await?;

    assert_eq!(permissions, set(&["a.get", "b.get", "d.list"]));
    assert_eq!(
        provider.calls().await,
        vec![
            ProviderCall::GetPredefinedRole("roles/viewer".to_owned()),
            ProviderCall::GetCustomRole("organizations/9/roles/auditor".to_owned()),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn unresolvable_base_roles_are_skipped() -> AppResult<()> {
    let provider = Arc::new(
        FakeIdentityProvider::default()
            .with_base_role("roles/viewer", &["b.get"])
            .await,
    );
    provider
        .failing_base_roles
        .lock()
        .await
        .insert("roles/broken".to_owned());
    let reconciler = RoleReconciler::new(provider.clone());

    let permissions = reconciler
        .resolve_permissions(&definition(
            &["a.get"],
            &["roles/missing", "roles/broken", "roles/viewer"],
            &[],
        )?)
        .await?;

    assert_eq!(permissions, set(&["a.get", "b.get"]));
    Ok(())
}

#[tokio::test]
async fn fully_excluded_definition_fails_without_writes() -> AppResult<()> {
    let provider = Arc::new(
        FakeIdentityProvider::default()
            .with_base_role("roles/viewer", &["b.get"])
            .await,
    );
    let reconciler = RoleReconciler::new(provider.clone());

    let result = reconciler
        .reconcile(
            &definition(&["a.get"], &["roles/viewer"], &["a.get", "b.get"])?,
            &organization()?,
        )
        .await;

    assert!(matches!(result, Err(AppError::EmptyPermissionSet(_))));
    assert_eq!(provider.write_count().await, 0);
    assert!(
        !provider
            .calls()
            .await
            .iter()
            .any(|call| matches!(call, ProviderCall::GetOrgCustomRole(_)))
    );
    Ok(())
}

#[tokio::test]
async fn lookup_failure_is_fatal_and_does_not_create() -> AppResult<()> {
    let provider = Arc::new(FakeIdentityProvider::default());
    *provider.fail_role_lookup.lock().await = true;
    let reconciler = RoleReconciler::new(provider.clone());

    let result = reconciler
        .reconcile(&definition(&["a.get"], &[], &[])?, &organization()?)
        .await;

    assert!(matches!(result, Err(AppError::Transport(_))));
    assert_eq!(provider.write_count().await, 0);
    Ok(())
}
