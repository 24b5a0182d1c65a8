//! The authorization core.
//!
//! Pure decision functions over already-loaded facts: the caller gathers
//! accounts, role sets, and edge existence; the functions here decide.
//! Nothing in this module touches a store or a clock.

use uuid::Uuid;

use crate::role::{Role, RoleSet};
use crate::task::{Project, Task};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// A denied decision, split the way the HTTP layer reports it: a privilege
/// problem (403) or a field-scoped input problem (422).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deny {
  Forbidden(String),
  Invalid { field: &'static str, message: String },
}

impl Deny {
  fn forbidden(msg: &str) -> Self { Deny::Forbidden(msg.to_string()) }

  fn invalid(field: &'static str, message: &str) -> Self {
    Deny::Invalid { field, message: message.to_string() }
  }
}

pub type Decision<T = ()> = Result<T, Deny>;

/// The authenticated caller: identity plus eagerly loaded roles.
#[derive(Debug, Clone)]
pub struct Actor {
  pub id:    Uuid,
  pub roles: RoleSet,
}

impl Actor {
  pub fn is_admin(&self) -> bool { self.roles.has(Role::Admin) }

  pub fn is_manager(&self) -> bool { self.roles.has(Role::Manager) }
}

// ─── Self-protection ─────────────────────────────────────────────────────────

/// Mutations an account may never aim at itself through the admin paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectedAction {
  Suspend,
  Delete,
  /// A role sync whose result drops `admin`. Rejected on self even when
  /// other active admins exist.
  DowngradeRole,
}

/// Reject self-targeting for suspend, delete, and admin-role removal.
pub fn check_self_preservation(
  actor_id:  Uuid,
  target_id: Uuid,
  action:    ProtectedAction,
) -> Decision {
  if actor_id != target_id {
    return Ok(());
  }
  Err(match action {
    ProtectedAction::Suspend => {
      Deny::invalid("user", "You cannot suspend your own account.")
    }
    ProtectedAction::Delete => {
      Deny::invalid("user", "You cannot delete your own account.")
    }
    ProtectedAction::DowngradeRole => {
      Deny::invalid("role", "You cannot remove your own admin access.")
    }
  })
}

// ─── Last-admin protection ───────────────────────────────────────────────────

/// The admin floor: an operation that takes an active admin out of play
/// (suspend, downgrade, delete) is rejected when that admin is the last one.
///
/// `active_admin_count` must be computed in the same transaction as the
/// mutation this guards.
pub fn check_admin_remains(
  target_roles:               &RoleSet,
  target_currently_suspended: bool,
  active_admin_count:         i64,
  field:                      &'static str,
) -> Decision {
  if target_roles.has(Role::Admin)
    && !target_currently_suspended
    && active_admin_count <= 1
  {
    return Err(Deny::invalid(
      field,
      "At least one active admin must remain in the system.",
    ));
  }
  Ok(())
}

// ─── Task & project access ───────────────────────────────────────────────────

/// Admins see everything; everyone else must own or create the project.
pub fn can_access_project(actor: &Actor, project: &Project) -> bool {
  actor.is_admin()
    || project.created_by == actor.id
    || project.user_id == actor.id
}

/// Task visibility/mutation: creator, assignee, or project owner/creator.
pub fn can_access_task(
  actor:   &Actor,
  task:    &Task,
  project: Option<&Project>,
) -> bool {
  if actor.is_admin() {
    return true;
  }
  task.created_by == actor.id
    || task.assigned_to == Some(actor.id)
    || project.is_some_and(|p| {
      p.created_by == actor.id || p.user_id == actor.id
    })
}

// ─── Team visibility ─────────────────────────────────────────────────────────

/// Which accounts a caller may list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamScope {
  /// Admin: every account.
  All,
  /// Manager: self plus accounts reachable via outgoing edges.
  ManagerOwn,
  /// Everyone else: self only.
  SelfOnly,
}

pub fn team_scope(roles: &RoleSet) -> TeamScope {
  if roles.has(Role::Admin) {
    TeamScope::All
  } else if roles.has(Role::Manager) {
    TeamScope::ManagerOwn
  } else {
    TeamScope::SelfOnly
  }
}

// ─── Assignee resolution ─────────────────────────────────────────────────────

/// Loaded facts about a requested assignee, gathered by the caller before
/// the decision is made.
#[derive(Debug, Clone)]
pub struct AssigneeCandidate {
  pub id:                  Uuid,
  pub roles:               RoleSet,
  pub currently_suspended: bool,
  /// An edge (actor → candidate) exists in the delegation graph.
  pub mapped_to_actor:     bool,
}

/// Resolve the assignee for a task create/update.
///
/// `candidate` carries the loaded facts for `requested` when it names an
/// existing account; `None` with a `Some(requested)` means lookup failed.
pub fn resolve_assignee(
  actor:     &Actor,
  requested: Option<Uuid>,
  candidate: Option<&AssigneeCandidate>,
) -> Decision<Option<Uuid>> {
  if actor.is_admin() {
    // Admins assign anyone, or leave the task unassigned; no defaulting.
    let Some(id) = requested else { return Ok(None) };
    let candidate = candidate
      .filter(|c| c.id == id)
      .ok_or_else(|| Deny::invalid("assigned_to", "The selected assignee does not exist."))?;
    check_candidate_active(candidate)?;
    return Ok(Some(id));
  }

  if actor.is_manager() {
    let target = requested.unwrap_or(actor.id);
    if target == actor.id {
      return Ok(Some(actor.id));
    }
    let candidate = candidate
      .filter(|c| c.id == target)
      .ok_or_else(|| Deny::invalid("assigned_to", "The selected assignee does not exist."))?;
    if !candidate.mapped_to_actor || !candidate.roles.is_assignable_staff() {
      return Err(Deny::forbidden("Managers can assign tasks only to staff users."));
    }
    check_candidate_active(candidate)?;
    return Ok(Some(target));
  }

  let target = requested.unwrap_or(actor.id);
  if target != actor.id {
    return Err(Deny::forbidden("You can only assign tasks to yourself."));
  }
  Ok(Some(actor.id))
}

fn check_candidate_active(candidate: &AssigneeCandidate) -> Decision {
  if candidate.currently_suspended {
    return Err(Deny::invalid(
      "assigned_to",
      "Cannot assign tasks to a suspended user.",
    ));
  }
  Ok(())
}

// ─── Edge mutations ──────────────────────────────────────────────────────────

/// Loaded facts about an explicitly requested manager account.
#[derive(Debug, Clone)]
pub struct EdgeManager {
  pub id:    Uuid,
  pub roles: RoleSet,
}

/// Decide, for an edge add/remove, which manager the mutation applies to.
///
/// Admins must name a manager (who must hold `manager` or `admin`);
/// managers may only act on their own edges.
pub fn resolve_edge_manager(
  actor:     &Actor,
  requested: Option<Uuid>,
  loaded:    Option<&EdgeManager>,
) -> Decision<Uuid> {
  if actor.is_admin() {
    let Some(id) = requested else {
      return Err(Deny::invalid(
        "manager_id",
        "manager_id is required for admin actions.",
      ));
    };
    let manager = loaded
      .filter(|m| m.id == id)
      .ok_or_else(|| Deny::invalid("manager_id", "The selected manager does not exist."))?;
    if !manager.roles.has_any(&[Role::Manager, Role::Admin]) {
      return Err(Deny::invalid(
        "manager_id",
        "manager_id must belong to a manager or admin user.",
      ));
    }
    return Ok(id);
  }

  if !actor.is_manager() {
    return Err(Deny::forbidden("Forbidden"));
  }
  if requested.is_some_and(|id| id != actor.id) {
    return Err(Deny::forbidden(
      "Managers can only manage their own subordinate mappings.",
    ));
  }
  Ok(actor.id)
}

/// Edge-creation checks on the subordinate side: no self-loops, and the
/// subordinate must not hold `admin` or `manager` at assignment time.
pub fn check_subordinate_eligible(
  manager_id:        Uuid,
  subordinate_id:    Uuid,
  subordinate_roles: &RoleSet,
) -> Decision {
  if manager_id == subordinate_id {
    return Err(Deny::invalid(
      "subordinate_id",
      "Manager cannot be their own subordinate.",
    ));
  }
  if !subordinate_roles.is_assignable_staff() {
    return Err(Deny::invalid(
      "subordinate_id",
      "Only staff users can be assigned as subordinates.",
    ));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::task::TaskStatus;

  fn actor(roles: &[Role]) -> Actor {
    Actor { id: Uuid::new_v4(), roles: RoleSet::new(roles.to_vec()) }
  }

  fn project(user_id: Uuid, created_by: Uuid) -> Project {
    let now = Utc::now();
    Project {
      id: Uuid::new_v4(),
      name: "p".into(),
      description: None,
      user_id,
      created_by,
      created_at: now,
      updated_at: now,
    }
  }

  fn task(project_id: Uuid, created_by: Uuid, assigned_to: Option<Uuid>) -> Task {
    let now = Utc::now();
    Task {
      id: Uuid::new_v4(),
      project_id,
      title: "t".into(),
      description: None,
      status: TaskStatus::Pending,
      due_date: None,
      assigned_to,
      user_id: created_by,
      created_by,
      updated_by: created_by,
      created_at: now,
      updated_at: now,
    }
  }

  fn candidate(
    id: Uuid,
    roles: &[Role],
    suspended: bool,
    mapped: bool,
  ) -> AssigneeCandidate {
    AssigneeCandidate {
      id,
      roles: RoleSet::new(roles.to_vec()),
      currently_suspended: suspended,
      mapped_to_actor: mapped,
    }
  }

  // ── Self-protection ───────────────────────────────────────────────────────

  #[test]
  fn self_target_rejected_for_all_protected_actions() {
    let id = Uuid::new_v4();
    for action in [
      ProtectedAction::Suspend,
      ProtectedAction::Delete,
      ProtectedAction::DowngradeRole,
    ] {
      let denied = check_self_preservation(id, id, action).unwrap_err();
      assert!(matches!(denied, Deny::Invalid { .. }));
    }
    assert!(check_self_preservation(id, Uuid::new_v4(), ProtectedAction::Delete).is_ok());
  }

  // ── Last-admin floor ──────────────────────────────────────────────────────

  #[test]
  fn floor_blocks_last_active_admin() {
    let admin_roles = RoleSet::new(vec![Role::Admin]);
    assert!(check_admin_remains(&admin_roles, false, 1, "user").is_err());
    assert!(check_admin_remains(&admin_roles, false, 2, "user").is_ok());
    // An already-suspended admin is not counted as in play.
    assert!(check_admin_remains(&admin_roles, true, 1, "user").is_ok());
    // Non-admin targets never trip the floor.
    let staff = RoleSet::new(vec![Role::User]);
    assert!(check_admin_remains(&staff, false, 1, "user").is_ok());
  }

  // ── Task access ───────────────────────────────────────────────────────────

  #[test]
  fn task_access_for_creator_assignee_owner_admin() {
    let creator = actor(&[Role::User]);
    let assignee = actor(&[Role::User]);
    let owner = actor(&[Role::User]);
    let stranger = actor(&[Role::User]);
    let admin = actor(&[Role::Admin]);

    let p = project(owner.id, owner.id);
    let t = task(p.id, creator.id, Some(assignee.id));

    assert!(can_access_task(&creator, &t, Some(&p)));
    assert!(can_access_task(&assignee, &t, Some(&p)));
    assert!(can_access_task(&owner, &t, Some(&p)));
    assert!(can_access_task(&admin, &t, Some(&p)));
    assert!(!can_access_task(&stranger, &t, Some(&p)));
  }

  // ── Team scope ────────────────────────────────────────────────────────────

  #[test]
  fn team_scope_by_role() {
    assert_eq!(team_scope(&RoleSet::new(vec![Role::Admin])), TeamScope::All);
    assert_eq!(
      team_scope(&RoleSet::new(vec![Role::User, Role::Manager])),
      TeamScope::ManagerOwn
    );
    assert_eq!(
      team_scope(&RoleSet::new(vec![Role::User, Role::Chef])),
      TeamScope::SelfOnly
    );
  }

  // ── Assignee resolution ───────────────────────────────────────────────────

  #[test]
  fn admin_assigns_anyone_active_or_leaves_unassigned() {
    let admin = actor(&[Role::Admin]);
    assert_eq!(resolve_assignee(&admin, None, None).unwrap(), None);

    let target = Uuid::new_v4();
    let c = candidate(target, &[Role::User], false, false);
    assert_eq!(
      resolve_assignee(&admin, Some(target), Some(&c)).unwrap(),
      Some(target)
    );

    let suspended = candidate(target, &[Role::User], true, false);
    let denied = resolve_assignee(&admin, Some(target), Some(&suspended)).unwrap_err();
    assert!(matches!(denied, Deny::Invalid { field: "assigned_to", .. }));

    let denied = resolve_assignee(&admin, Some(target), None).unwrap_err();
    assert!(matches!(denied, Deny::Invalid { field: "assigned_to", .. }));
  }

  #[test]
  fn manager_defaults_to_self_and_needs_an_edge_otherwise() {
    let manager = actor(&[Role::User, Role::Manager]);
    assert_eq!(resolve_assignee(&manager, None, None).unwrap(), Some(manager.id));
    assert_eq!(
      resolve_assignee(&manager, Some(manager.id), None).unwrap(),
      Some(manager.id)
    );

    let sub = Uuid::new_v4();
    let mapped = candidate(sub, &[Role::User, Role::Staff], false, true);
    assert_eq!(
      resolve_assignee(&manager, Some(sub), Some(&mapped)).unwrap(),
      Some(sub)
    );

    let unmapped = candidate(sub, &[Role::User, Role::Staff], false, false);
    assert!(matches!(
      resolve_assignee(&manager, Some(sub), Some(&unmapped)).unwrap_err(),
      Deny::Forbidden(_)
    ));

    // A mapped account that has since become a manager is off-limits.
    let promoted = candidate(sub, &[Role::User, Role::Manager], false, true);
    assert!(matches!(
      resolve_assignee(&manager, Some(sub), Some(&promoted)).unwrap_err(),
      Deny::Forbidden(_)
    ));

    let suspended = candidate(sub, &[Role::User], true, true);
    assert!(matches!(
      resolve_assignee(&manager, Some(sub), Some(&suspended)).unwrap_err(),
      Deny::Invalid { field: "assigned_to", .. }
    ));
  }

  #[test]
  fn others_may_only_self_assign() {
    let staff = actor(&[Role::User, Role::Staff]);
    assert_eq!(resolve_assignee(&staff, None, None).unwrap(), Some(staff.id));
    assert_eq!(
      resolve_assignee(&staff, Some(staff.id), None).unwrap(),
      Some(staff.id)
    );

    let other = Uuid::new_v4();
    let c = candidate(other, &[Role::User], false, false);
    assert!(matches!(
      resolve_assignee(&staff, Some(other), Some(&c)).unwrap_err(),
      Deny::Forbidden(_)
    ));
  }

  // ── Edge mutations ────────────────────────────────────────────────────────

  #[test]
  fn admin_edge_mutation_requires_a_named_manager() {
    let admin = actor(&[Role::Admin]);
    assert!(matches!(
      resolve_edge_manager(&admin, None, None).unwrap_err(),
      Deny::Invalid { field: "manager_id", .. }
    ));

    let mgr_id = Uuid::new_v4();
    let mgr = EdgeManager { id: mgr_id, roles: RoleSet::new(vec![Role::Manager]) };
    assert_eq!(resolve_edge_manager(&admin, Some(mgr_id), Some(&mgr)).unwrap(), mgr_id);

    let plain = EdgeManager { id: mgr_id, roles: RoleSet::new(vec![Role::User]) };
    assert!(matches!(
      resolve_edge_manager(&admin, Some(mgr_id), Some(&plain)).unwrap_err(),
      Deny::Invalid { field: "manager_id", .. }
    ));
  }

  #[test]
  fn manager_edge_mutation_is_scoped_to_self() {
    let manager = actor(&[Role::User, Role::Manager]);
    assert_eq!(resolve_edge_manager(&manager, None, None).unwrap(), manager.id);
    assert_eq!(
      resolve_edge_manager(&manager, Some(manager.id), None).unwrap(),
      manager.id
    );
    assert!(matches!(
      resolve_edge_manager(&manager, Some(Uuid::new_v4()), None).unwrap_err(),
      Deny::Forbidden(_)
    ));

    let staff = actor(&[Role::User]);
    assert!(matches!(
      resolve_edge_manager(&staff, None, None).unwrap_err(),
      Deny::Forbidden(_)
    ));
  }

  #[test]
  fn subordinate_eligibility() {
    let mgr = Uuid::new_v4();
    let sub = Uuid::new_v4();
    let staff = RoleSet::new(vec![Role::User, Role::Staff]);
    assert!(check_subordinate_eligible(mgr, sub, &staff).is_ok());
    assert!(check_subordinate_eligible(mgr, mgr, &staff).is_err());
    let admin = RoleSet::new(vec![Role::Admin]);
    assert!(check_subordinate_eligible(mgr, sub, &admin).is_err());
  }
}
