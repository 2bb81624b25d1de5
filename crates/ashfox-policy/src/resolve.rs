//! The permission-on-folder resolution algorithm.

use ashfox_core::ids::RoleId;
use ashfox_storage::{AclEffect, AclRule};
use std::collections::BTreeSet;

/// A resolved `(read, write)` tristate at one folder level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Channel {
    read: AclEffect,
    write: AclEffect,
}

impl Channel {
    const fn inherited() -> Self {
        Self {
            read: AclEffect::Inherit,
            write: AclEffect::Inherit,
        }
    }

    /// Apply one folder level's resolved effect over the parent's carried
    /// effect. The level's own effect wins outright — a deeper `Allow`
    /// restores access under a denied parent, and a deeper `Deny` overrides
    /// an allowed parent; `Inherit` carries the parent's effect forward.
    fn apply_level(self, level_read: AclEffect, level_write: AclEffect) -> Self {
        Self {
            read: apply_over_parent(self.read, level_read),
            write: apply_over_parent(self.write, level_write),
        }
    }
}

fn apply_over_parent(parent: AclEffect, level: AclEffect) -> AclEffect {
    match level {
        AclEffect::Deny => AclEffect::Deny,
        AclEffect::Allow => AclEffect::Allow,
        AclEffect::Inherit => parent,
    }
}

/// Combine two rules' effects at the *same* folder level. Unlike
/// [`apply_over_parent`], this is order-independent: `Deny` always wins over
/// `Allow` regardless of which rule was unioned in first, since both rules
/// apply at the same folder and neither is "deeper" than the other.
fn combine_same_level(a: AclEffect, b: AclEffect) -> AclEffect {
    match (a, b) {
        (AclEffect::Deny, _) | (_, AclEffect::Deny) => AclEffect::Deny,
        (AclEffect::Allow, _) | (_, AclEffect::Allow) => AclEffect::Allow,
        (AclEffect::Inherit, AclEffect::Inherit) => AclEffect::Inherit,
    }
}

fn union_rule_effects(rules: &[&AclRule], held_roles: &BTreeSet<RoleId>) -> (AclEffect, AclEffect) {
    let mut read = AclEffect::Inherit;
    let mut write = AclEffect::Inherit;
    for rule in rules {
        if !rule.role_ids.iter().any(|r| held_roles.contains(r)) {
            continue;
        }
        read = combine_same_level(read, rule.read);
        write = combine_same_level(write, rule.write);
    }
    (read, write)
}

/// The outcome of resolving folder permissions for one actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FolderPermissions {
    /// Whether the actor may read content under this folder.
    pub read: bool,
    /// Whether the actor may write content under this folder.
    pub write: bool,
}

/// Resolve `(read, write)` for `held_roles` walking `folder_path` from root
/// (`folder_path[0]`) to the target folder.
///
/// `folder_path` entries are folder ids; `None` denotes the workspace root.
/// ACL rules with `folder_id` matching a path entry are unioned across the
/// actor's held roles at that level, deny-overrides-once-reached.
#[must_use]
pub fn resolve_folder_permissions(
    held_roles: &BTreeSet<RoleId>,
    acl_rules: &[AclRule],
    folder_path: &[Option<String>],
) -> FolderPermissions {
    let mut channel = Channel::inherited();
    for folder_id in folder_path {
        let level_rules: Vec<&AclRule> = acl_rules
            .iter()
            .filter(|rule| rule.folder_id.as_deref() == folder_id.as_deref())
            .collect();
        let (level_read, level_write) = union_rule_effects(&level_rules, held_roles);
        channel = channel.apply_level(level_read, level_write);
    }
    FolderPermissions {
        read: channel.read == AclEffect::Allow,
        write: channel.write == AclEffect::Allow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ashfox_core::ids::WorkspaceId;

    fn role_id(s: &str) -> RoleId {
        RoleId::from(s)
    }

    fn rule(folder: Option<&str>, roles: &[&str], read: AclEffect, write: AclEffect) -> AclRule {
        AclRule {
            workspace_id: WorkspaceId::from("ws-1"),
            rule_id: format!("rule-{folder:?}-{roles:?}"),
            folder_id: folder.map(str::to_string),
            role_ids: roles.iter().map(|r| role_id(r)).collect(),
            read,
            write,
            locked: false,
        }
    }

    #[test]
    fn no_rules_means_no_access() {
        let held: BTreeSet<RoleId> = [role_id("editor")].into_iter().collect();
        let perms = resolve_folder_permissions(&held, &[], &[None]);
        assert!(!perms.read);
        assert!(!perms.write);
    }

    #[test]
    fn allow_at_root_grants_descendants() {
        let held: BTreeSet<RoleId> = [role_id("editor")].into_iter().collect();
        let rules = vec![rule(None, &["editor"], AclEffect::Allow, AclEffect::Allow)];
        let perms = resolve_folder_permissions(&held, &rules, &[None, Some("sub".to_string())]);
        assert!(perms.read);
        assert!(perms.write);
    }

    #[test]
    fn deny_at_deeper_level_overrides_inherited_allow() {
        let held: BTreeSet<RoleId> = [role_id("editor")].into_iter().collect();
        let rules = vec![
            rule(None, &["editor"], AclEffect::Allow, AclEffect::Allow),
            rule(Some("sub"), &["editor"], AclEffect::Inherit, AclEffect::Deny),
        ];
        let perms = resolve_folder_permissions(&held, &rules, &[None, Some("sub".to_string())]);
        assert!(perms.read);
        assert!(!perms.write);
    }

    #[test]
    fn allow_at_deeper_level_restores_denied_parent() {
        let held: BTreeSet<RoleId> = [role_id("editor")].into_iter().collect();
        let rules = vec![
            rule(None, &["editor"], AclEffect::Allow, AclEffect::Allow),
            rule(Some("restrictedChild"), &["editor"], AclEffect::Inherit, AclEffect::Deny),
            rule(Some("restoredChild"), &["editor"], AclEffect::Inherit, AclEffect::Allow),
        ];
        let perms = resolve_folder_permissions(
            &held,
            &rules,
            &[None, Some("restrictedChild".to_string()), Some("restoredChild".to_string())],
        );
        assert!(perms.read);
        assert!(perms.write);
    }

    #[test]
    fn rules_for_unheld_roles_are_ignored() {
        let held: BTreeSet<RoleId> = [role_id("viewer")].into_iter().collect();
        let rules = vec![rule(None, &["editor"], AclEffect::Allow, AclEffect::Allow)];
        let perms = resolve_folder_permissions(&held, &rules, &[None]);
        assert!(!perms.read);
        assert!(!perms.write);
    }

    #[test]
    fn deny_overrides_allow_at_the_same_level() {
        let held: BTreeSet<RoleId> = [role_id("editor"), role_id("restricted")].into_iter().collect();
        let rules = vec![
            rule(None, &["editor"], AclEffect::Allow, AclEffect::Allow),
            rule(None, &["restricted"], AclEffect::Deny, AclEffect::Deny),
        ];
        let perms = resolve_folder_permissions(&held, &rules, &[None]);
        assert!(!perms.read);
        assert!(!perms.write);
    }
}
