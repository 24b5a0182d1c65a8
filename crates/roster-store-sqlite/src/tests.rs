//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, Utc};
use roster_core::{
  Error as CoreError,
  account::NewAccount,
  broadcast::{AnnouncementKind, NewAnnouncement, NewTheme, TargetScope},
  role::Role,
  store::{AccountQuery, DirectoryStore, StatusFilter, TaskQuery},
  task::{NewTask, TaskPatch, TaskStatus},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn department(s: &SqliteStore) -> Uuid {
  s.ensure_department("Staff".to_string()).await.unwrap().id
}

async fn account(s: &SqliteStore, name: &str, roles: &[Role]) -> Uuid {
  let dept = department(s).await;
  let created = s
    .create_account(NewAccount {
      name:          name.to_string(),
      email:         format!("{name}@example.com"),
      password_hash: "$argon2id$stub".to_string(),
      department_id: dept,
    })
    .await
    .unwrap();
  s.sync_roles(created.id, roles.to_vec(), Utc::now()).await.unwrap();
  created.id
}

// ─── Departments & accounts ──────────────────────────────────────────────────

#[tokio::test]
async fn ensure_department_is_idempotent_by_name() {
  let s = store().await;
  let first = s.ensure_department("Kitchen".to_string()).await.unwrap();
  let second = s.ensure_department("Kitchen".to_string()).await.unwrap();
  assert_eq!(first.id, second.id);
  assert_eq!(s.list_departments().await.unwrap().len(), 1);
}

#[tokio::test]
async fn create_account_enforces_uniqueness_and_department() {
  let s = store().await;
  let dept = department(&s).await;

  let input = NewAccount {
    name:          "alice".to_string(),
    email:         "alice@example.com".to_string(),
    password_hash: "hash".to_string(),
    department_id: dept,
  };
  s.create_account(input.clone()).await.unwrap();

  let dup_name = NewAccount {
    email: "other@example.com".to_string(),
    ..input.clone()
  };
  assert!(matches!(
    s.create_account(dup_name).await.unwrap_err(),
    CoreError::NameTaken(_)
  ));

  let dup_email = NewAccount { name: "bob".to_string(), ..input.clone() };
  assert!(matches!(
    s.create_account(dup_email).await.unwrap_err(),
    CoreError::EmailTaken(_)
  ));

  let bad_dept = NewAccount {
    name:          "carol".to_string(),
    email:         "carol@example.com".to_string(),
    department_id: Uuid::new_v4(),
    ..input
  };
  assert!(matches!(
    s.create_account(bad_dept).await.unwrap_err(),
    CoreError::DepartmentNotFound(_)
  ));
}

#[tokio::test]
async fn list_accounts_filters_by_status_with_the_authoritative_predicate() {
  let s = store().await;
  let now = Utc::now();
  let active = account(&s, "active", &[Role::User]).await;
  let locked = account(&s, "locked", &[Role::User]).await;
  let expired = account(&s, "expired", &[Role::User]).await;

  s.suspend_account(locked, None, None, now).await.unwrap();
  s.suspend_account(expired, Some(now - Duration::hours(1)), None, now)
    .await
    .unwrap();

  let suspended = s
    .list_accounts(
      AccountQuery { status: StatusFilter::Suspended, ..Default::default() },
      now,
    )
    .await
    .unwrap();
  assert_eq!(suspended.len(), 1);
  assert_eq!(suspended[0].id, locked);

  // An expired suspension counts as active even before normalisation.
  let actives = s
    .list_accounts(
      AccountQuery { status: StatusFilter::Active, ..Default::default() },
      now,
    )
    .await
    .unwrap();
  let ids: Vec<Uuid> = actives.iter().map(|a| a.id).collect();
  assert!(ids.contains(&active));
  assert!(ids.contains(&expired));
  assert!(!ids.contains(&locked));
}

#[tokio::test]
async fn search_filter_matches_name_and_email_case_insensitively() {
  let s = store().await;
  account(&s, "Night-Watch", &[Role::User]).await;
  account(&s, "daychef", &[Role::User]).await;

  let hits = s
    .list_accounts(
      AccountQuery { search: Some("WATCH".to_string()), ..Default::default() },
      Utc::now(),
    )
    .await
    .unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].name, "Night-Watch");
}

// ─── Suspension lifecycle ────────────────────────────────────────────────────

#[tokio::test]
async fn suspend_sets_fields_and_revokes_tokens() {
  let s = store().await;
  let now = Utc::now();
  account(&s, "admin", &[Role::Admin]).await;
  let target = account(&s, "staff", &[Role::User]).await;

  let token = s
    .insert_access_token(target, "digest".to_string())
    .await
    .unwrap();
  assert!(s.find_access_token("digest".to_string()).await.unwrap().is_some());

  let until = now + Duration::days(3);
  let suspended = s
    .suspend_account(target, Some(until), Some("policy".to_string()), now)
    .await
    .unwrap();
  assert!(suspended.is_suspended);
  assert_eq!(suspended.suspended_until, Some(until));
  assert_eq!(suspended.suspension_reason.as_deref(), Some("policy"));

  assert!(s.find_access_token("digest".to_string()).await.unwrap().is_none());
  // Individual revocation of a gone token is a no-op.
  s.delete_access_token(token.id).await.unwrap();
}

#[tokio::test]
async fn suspending_the_last_active_admin_is_rejected() {
  let s = store().await;
  let now = Utc::now();
  let admin = account(&s, "admin", &[Role::Admin]).await;

  assert!(matches!(
    s.suspend_account(admin, None, None, now).await.unwrap_err(),
    CoreError::LastActiveAdmin
  ));

  // A second active admin lifts the floor.
  account(&s, "admin2", &[Role::Admin]).await;
  s.suspend_account(admin, None, None, now).await.unwrap();
}

#[tokio::test]
async fn clear_suspension_reactivates() {
  let s = store().await;
  let now = Utc::now();
  account(&s, "admin", &[Role::Admin]).await;
  let target = account(&s, "staff", &[Role::User]).await;

  s.suspend_account(target, None, Some("r".to_string()), now).await.unwrap();
  let cleared = s.clear_suspension(target).await.unwrap();
  assert!(!cleared.is_suspended);
  assert!(cleared.suspended_until.is_none());
  assert!(cleared.suspension_reason.is_none());
}

#[tokio::test]
async fn active_admin_count_ignores_expired_suspensions() {
  let s = store().await;
  let now = Utc::now();
  let admin = account(&s, "admin", &[Role::Admin]).await;
  account(&s, "admin2", &[Role::Admin]).await;

  assert_eq!(s.active_admin_count(now).await.unwrap(), 2);

  s.suspend_account(admin, Some(now + Duration::days(1)), None, now)
    .await
    .unwrap();
  assert_eq!(s.active_admin_count(now).await.unwrap(), 1);

  // Once the window passes, the admin counts as active again even though
  // the raw flag has not been normalised yet.
  assert_eq!(
    s.active_admin_count(now + Duration::days(2)).await.unwrap(),
    2
  );
}

// ─── Role sync & the admin floor ─────────────────────────────────────────────

#[tokio::test]
async fn demoting_the_last_active_admin_is_rejected() {
  let s = store().await;
  let now = Utc::now();
  let admin = account(&s, "admin", &[Role::Admin]).await;

  assert!(matches!(
    s.sync_roles(admin, vec![Role::User], now).await.unwrap_err(),
    CoreError::LastActiveAdmin
  ));

  // Keeping admin in the new set passes the floor.
  s.sync_roles(admin, vec![Role::Admin], now).await.unwrap();

  account(&s, "admin2", &[Role::Admin]).await;
  s.sync_roles(admin, vec![Role::User, Role::Chef], now).await.unwrap();
  let roles = s.roles_of(admin).await.unwrap();
  assert!(roles.has(Role::Chef) && !roles.has(Role::Admin));
}

#[tokio::test]
async fn revoke_admin_role_honours_the_floor_and_grant_is_idempotent() {
  let s = store().await;
  let now = Utc::now();
  let admin = account(&s, "admin", &[Role::Admin]).await;

  assert!(matches!(
    s.revoke_role(admin, Role::Admin, now).await.unwrap_err(),
    CoreError::LastActiveAdmin
  ));

  s.grant_role(admin, Role::Chef).await.unwrap();
  s.grant_role(admin, Role::Chef).await.unwrap();
  let roles = s.roles_of(admin).await.unwrap();
  assert_eq!(roles.iter().count(), 2);

  s.revoke_role(admin, Role::Chef, now).await.unwrap();
  // Revoking a role that is not held is a no-op.
  s.revoke_role(admin, Role::Chef, now).await.unwrap();
  assert!(!s.roles_of(admin).await.unwrap().has(Role::Chef));
}

// ─── Deletion ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn deleting_the_last_active_admin_is_rejected() {
  let s = store().await;
  let now = Utc::now();
  let admin = account(&s, "admin", &[Role::Admin]).await;

  assert!(matches!(
    s.delete_account(admin, now).await.unwrap_err(),
    CoreError::LastActiveAdmin
  ));
}

#[tokio::test]
async fn delete_cascades_tokens_edges_and_owned_projects() {
  let s = store().await;
  let now = Utc::now();
  account(&s, "admin", &[Role::Admin]).await;
  let manager = account(&s, "manager", &[Role::User, Role::Manager]).await;
  let staff = account(&s, "staff", &[Role::User]).await;

  s.insert_access_token(staff, "digest".to_string()).await.unwrap();
  s.add_edge(manager, staff).await.unwrap();
  let project = s.personal_workspace(staff).await.unwrap();
  s.create_task(NewTask {
    project_id:  project.id,
    title:       "own task".to_string(),
    description: None,
    status:      TaskStatus::Pending,
    due_date:    None,
    assigned_to: Some(staff),
    actor_id:    staff,
  })
  .await
  .unwrap();

  s.delete_account(staff, now).await.unwrap();

  assert!(s.get_account(staff).await.unwrap().is_none());
  assert!(s.find_access_token("digest".to_string()).await.unwrap().is_none());
  assert!(!s.edge_exists(manager, staff).await.unwrap());
  assert!(s.get_project(project.id).await.unwrap().is_none());
  let page = s
    .list_tasks(TaskQuery {
      viewer:      None,
      status:      None,
      project_id:  Some(project.id),
      assigned_to: None,
      page:        1,
      per_page:    15,
    })
    .await
    .unwrap();
  assert_eq!(page.total, 0);
}

// ─── Hierarchy ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn edges_are_idempotent_and_removal_is_silent() {
  let s = store().await;
  let manager = account(&s, "manager", &[Role::User, Role::Manager]).await;
  let staff = account(&s, "staff", &[Role::User]).await;

  s.add_edge(manager, staff).await.unwrap();
  s.add_edge(manager, staff).await.unwrap();
  assert_eq!(s.list_edges(Some(manager)).await.unwrap().len(), 1);
  assert_eq!(s.subordinate_ids(manager).await.unwrap(), vec![staff]);
  assert_eq!(s.manager_ids(staff).await.unwrap(), vec![manager]);

  s.remove_edge(manager, staff).await.unwrap();
  s.remove_edge(manager, staff).await.unwrap();
  assert!(!s.edge_exists(manager, staff).await.unwrap());
  assert!(s.subordinate_ids(manager).await.unwrap().is_empty());
}

// ─── Projects & tasks ────────────────────────────────────────────────────────

#[tokio::test]
async fn personal_workspace_is_created_once_per_account() {
  let s = store().await;
  let owner = account(&s, "owner", &[Role::User]).await;

  let first = s.personal_workspace(owner).await.unwrap();
  let second = s.personal_workspace(owner).await.unwrap();
  assert_eq!(first.id, second.id);
  assert_eq!(first.name, "Personal Workspace");
  assert_eq!(first.user_id, owner);
}

#[tokio::test]
async fn task_patch_distinguishes_absent_from_null() {
  let s = store().await;
  let owner = account(&s, "owner", &[Role::User]).await;
  let project = s.personal_workspace(owner).await.unwrap();

  let task = s
    .create_task(NewTask {
      project_id:  project.id,
      title:       "initial".to_string(),
      description: Some("desc".to_string()),
      status:      TaskStatus::Pending,
      due_date:    None,
      assigned_to: Some(owner),
      actor_id:    owner,
    })
    .await
    .unwrap();

  // Absent fields stay untouched.
  let updated = s
    .update_task(task.id, TaskPatch {
      status: Some(TaskStatus::InProgress),
      actor_id: owner,
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(updated.status, TaskStatus::InProgress);
  assert_eq!(updated.assigned_to, Some(owner));
  assert_eq!(updated.description.as_deref(), Some("desc"));

  // Explicit null clears.
  let cleared = s
    .update_task(task.id, TaskPatch {
      assigned_to: Some(None),
      description: Some(None),
      actor_id: owner,
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(cleared.assigned_to, None);
  assert_eq!(cleared.description, None);
}

#[tokio::test]
async fn list_tasks_scopes_to_the_viewer_and_paginates() {
  let s = store().await;
  let owner = account(&s, "owner", &[Role::User]).await;
  let stranger = account(&s, "stranger", &[Role::User]).await;
  let project = s.personal_workspace(owner).await.unwrap();

  for i in 0..4 {
    s.create_task(NewTask {
      project_id:  project.id,
      title:       format!("task {i}"),
      description: None,
      status:      TaskStatus::Pending,
      due_date:    None,
      assigned_to: None,
      actor_id:    owner,
    })
    .await
    .unwrap();
  }

  let visible = s
    .list_tasks(TaskQuery {
      viewer:      Some(owner),
      status:      None,
      project_id:  None,
      assigned_to: None,
      page:        1,
      per_page:    3,
    })
    .await
    .unwrap();
  assert_eq!(visible.total, 4);
  assert_eq!(visible.tasks.len(), 3);
  assert_eq!(visible.page, 1);

  let second_page = s
    .list_tasks(TaskQuery {
      viewer:      Some(owner),
      status:      None,
      project_id:  None,
      assigned_to: None,
      page:        2,
      per_page:    3,
    })
    .await
    .unwrap();
  assert_eq!(second_page.tasks.len(), 1);

  let hidden = s
    .list_tasks(TaskQuery {
      viewer:      Some(stranger),
      status:      None,
      project_id:  None,
      assigned_to: None,
      page:        1,
      per_page:    15,
    })
    .await
    .unwrap();
  assert_eq!(hidden.total, 0);
}

#[tokio::test]
async fn delete_task_records_the_deleter_and_removes_the_row() {
  let s = store().await;
  let owner = account(&s, "owner", &[Role::User]).await;
  let project = s.personal_workspace(owner).await.unwrap();
  let task = s
    .create_task(NewTask {
      project_id:  project.id,
      title:       "doomed".to_string(),
      description: None,
      status:      TaskStatus::Pending,
      due_date:    None,
      assigned_to: None,
      actor_id:    owner,
    })
    .await
    .unwrap();

  s.delete_task(task.id, owner).await.unwrap();
  assert!(s.get_task(task.id).await.unwrap().is_none());
  assert!(matches!(
    s.delete_task(task.id, owner).await.unwrap_err(),
    CoreError::TaskNotFound(_)
  ));
}

// ─── Announcements ───────────────────────────────────────────────────────────

#[tokio::test]
async fn active_announcements_respect_flag_window_and_pinning() {
  let s = store().await;
  let now = Utc::now();
  let admin = account(&s, "admin", &[Role::Admin]).await;

  let base = NewAnnouncement {
    title:                "plain".to_string(),
    message:              "m".to_string(),
    kind:                 AnnouncementKind::Info,
    target_scope:         TargetScope::All,
    target_role:          None,
    target_department_id: None,
    is_pinned:            false,
    is_active:            true,
    starts_at:            None,
    ends_at:              None,
    created_by:           admin,
  };

  s.create_announcement(base.clone()).await.unwrap();
  s.create_announcement(NewAnnouncement {
    title: "pinned".to_string(),
    is_pinned: true,
    ..base.clone()
  })
  .await
  .unwrap();
  s.create_announcement(NewAnnouncement {
    title: "inactive".to_string(),
    is_active: false,
    ..base.clone()
  })
  .await
  .unwrap();
  s.create_announcement(NewAnnouncement {
    title: "ended".to_string(),
    ends_at: Some(now - Duration::hours(1)),
    ..base
  })
  .await
  .unwrap();

  let active = s.list_active_announcements(now).await.unwrap();
  let titles: Vec<&str> = active.iter().map(|a| a.title.as_str()).collect();
  assert_eq!(titles.first().copied(), Some("pinned"));
  assert!(titles.contains(&"plain"));
  assert!(!titles.contains(&"inactive"));
  assert!(!titles.contains(&"ended"));
}

// ─── Themes ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn exactly_one_theme_is_active_after_activation() {
  let s = store().await;
  let now = Utc::now();
  let admin = account(&s, "admin", &[Role::Admin]).await;

  let base = NewTheme {
    name:           "one".to_string(),
    tagline:        None,
    banner_message: None,
    primary_color:  "#0f172a".to_string(),
    accent_color:   "#2563eb".to_string(),
    surface_color:  "#ffffff".to_string(),
    is_active:      true,
    starts_at:      None,
    ends_at:        None,
    meta:           None,
    created_by:     admin,
  };

  let first = s.create_theme(base.clone()).await.unwrap();
  let second = s
    .create_theme(NewTheme { name: "two".to_string(), ..base })
    .await
    .unwrap();

  // Creating the second active theme deactivated the first.
  let active = s.active_theme(now).await.unwrap().unwrap();
  assert_eq!(active.id, second.id);

  let activated = s.activate_theme(first.id, now).await.unwrap();
  assert!(activated.is_active);
  let themes = s.list_themes(50).await.unwrap();
  assert_eq!(themes.iter().filter(|t| t.is_active).count(), 1);
  assert_eq!(s.active_theme(now).await.unwrap().unwrap().id, first.id);

  // Re-activating the same theme is idempotent.
  s.activate_theme(first.id, now).await.unwrap();
  let themes = s.list_themes(50).await.unwrap();
  assert_eq!(themes.iter().filter(|t| t.is_active).count(), 1);

  assert!(matches!(
    s.activate_theme(Uuid::new_v4(), now).await.unwrap_err(),
    CoreError::ThemeNotFound(_)
  ));
}

// ─── Credentials ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn reset_tokens_are_replaced_per_email() {
  let s = store().await;
  let now = Utc::now();
  account(&s, "alice", &[Role::User]).await;

  s.upsert_reset_token("alice@example.com".to_string(), "first".to_string(), now)
    .await
    .unwrap();
  s.upsert_reset_token("alice@example.com".to_string(), "second".to_string(), now)
    .await
    .unwrap();

  let token = s
    .find_reset_token("alice@example.com".to_string())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(token.token_hash, "second");

  s.delete_reset_token("alice@example.com".to_string()).await.unwrap();
  assert!(
    s.find_reset_token("alice@example.com".to_string())
      .await
      .unwrap()
      .is_none()
  );
}
