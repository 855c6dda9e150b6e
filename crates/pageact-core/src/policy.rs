//! Derivation of child-document policies from a parent document

use crate::types::{AclPermission, Policy};
use std::collections::{BTreeMap, BTreeSet};

/// Kinds of documents that carry policies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Page,
    Action,
    Datasource,
}

/// Generates the policies a child document inherits from its parent
pub trait PolicyGenerator: Send + Sync {
    fn derive_policies(
        &self,
        parent_policies: &BTreeSet<Policy>,
        parent_kind: DocumentKind,
        child_kind: DocumentKind,
    ) -> BTreeSet<Policy>;
}

/// Fixed permission lattice: page read grants action execution, page management
/// grants action management and read.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicyGenerator;

impl DefaultPolicyGenerator {
    fn child_permissions(
        permission: AclPermission,
        parent_kind: DocumentKind,
        child_kind: DocumentKind,
    ) -> &'static [AclPermission] {
        match (parent_kind, child_kind, permission) {
            (DocumentKind::Page, DocumentKind::Action, AclPermission::ReadPages) => {
                &[AclPermission::ExecuteActions]
            }
            (DocumentKind::Page, DocumentKind::Action, AclPermission::ManagePages) => {
                &[AclPermission::ManageActions, AclPermission::ReadActions]
            }
            _ => &[],
        }
    }
}

impl PolicyGenerator for DefaultPolicyGenerator {
    fn derive_policies(
        &self,
        parent_policies: &BTreeSet<Policy>,
        parent_kind: DocumentKind,
        child_kind: DocumentKind,
    ) -> BTreeSet<Policy> {
        // Users granted the same child permission through several parent
        // permissions are merged into one policy.
        let mut merged: BTreeMap<AclPermission, BTreeSet<String>> = BTreeMap::new();
        for policy in parent_policies {
            for child in Self::child_permissions(policy.permission, parent_kind, child_kind) {
                merged.entry(*child).or_default().extend(policy.users.iter().cloned());
            }
        }
        merged.into_iter().map(|(permission, users)| Policy { permission, users }).collect()
    }
}
