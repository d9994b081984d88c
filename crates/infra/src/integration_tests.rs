//! End-to-end tests for the resource services over the in-memory store.
//!
//! Verifies:
//! - Registration, login and the project quota walk-through
//! - Tenant isolation for reads and writes
//! - super_admin sessions never mutate tenant content
//! - The quota ceiling holds under concurrent creation
//! - Task status changes respect the assignee
//! - Every successful mutation leaves exactly one audit entry

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::thread::ThreadId;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use workhive_auth::{
        AuthError, CredentialVerifier, Credentials, DenyReason, IssuedToken, Role, SessionClaims,
        SessionContext,
    };
    use workhive_core::{TenantId, UserId};
    use workhive_tenancy::{
        AuditAction, AuditFilter, AuditLogEntry, EntityType, NewProject, NewTask, NewUser, Page, ProjectFilter,
        ProjectPatch, ResourceKind, TaskFilter, TaskPatch, TaskPriority, TaskStatus, TenantPatch,
        TenantStatus, UserFilter, UserPatch,
    };

    use crate::audit::{AuditRecorder, AuditSink, AuditSinkError, StoreAuditSink};
    use crate::services::{
        LoginOutcome, LoginRequest, RegisterTenant, Registration, ServiceError, WorkspaceServices,
    };
    use crate::store::{InMemoryWorkspaceStore, WorkspaceStore};

    const SECRET: &str = "integration-test-secret";

    /// Real tokens, but passwords stored as-is so tests skip Argon2 cost.
    struct PlainCredentials {
        tokens: Credentials,
    }

    impl CredentialVerifier for PlainCredentials {
        fn hash_password(&self, plaintext: &str) -> Result<String, AuthError> {
            Ok(format!("plain${plaintext}"))
        }

        fn verify_password(&self, plaintext: &str, hash: &str) -> Result<bool, AuthError> {
            Ok(hash.strip_prefix("plain$") == Some(plaintext))
        }

        fn issue_token(
            &self,
            actor_id: UserId,
            tenant_id: Option<TenantId>,
            role: Role,
            now: DateTime<Utc>,
        ) -> Result<IssuedToken, AuthError> {
            self.tokens.issue_token(actor_id, tenant_id, role, now)
        }

        fn decode_token(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, AuthError> {
            self.tokens.decode_token(token, now)
        }
    }

    /// Plain credentials that remember which thread did the password work.
    struct ThreadRecordingCredentials {
        inner: PlainCredentials,
        threads: Mutex<Vec<ThreadId>>,
    }

    impl ThreadRecordingCredentials {
        fn note(&self) {
            self.threads.lock().unwrap().push(std::thread::current().id());
        }
    }

    impl CredentialVerifier for ThreadRecordingCredentials {
        fn hash_password(&self, plaintext: &str) -> Result<String, AuthError> {
            self.note();
            self.inner.hash_password(plaintext)
        }

        fn verify_password(&self, plaintext: &str, hash: &str) -> Result<bool, AuthError> {
            self.note();
            self.inner.verify_password(plaintext, hash)
        }

        fn issue_token(
            &self,
            actor_id: UserId,
            tenant_id: Option<TenantId>,
            role: Role,
            now: DateTime<Utc>,
        ) -> Result<IssuedToken, AuthError> {
            self.inner.issue_token(actor_id, tenant_id, role, now)
        }

        fn decode_token(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, AuthError> {
            self.inner.decode_token(token, now)
        }
    }

    struct FailingSink;

    #[async_trait]
    impl AuditSink for FailingSink {
        async fn append(&self, _entry: AuditLogEntry) -> Result<(), AuditSinkError> {
            Err(AuditSinkError("audit table unavailable".into()))
        }
    }

    type Services = WorkspaceServices<Arc<InMemoryWorkspaceStore>>;

    fn credentials() -> Arc<dyn CredentialVerifier> {
        Arc::new(PlainCredentials { tokens: Credentials::new(SECRET, Credentials::DEFAULT_TTL_SECS) })
    }

    fn setup() -> Services {
        let store = Arc::new(InMemoryWorkspaceStore::new());
        let audit = AuditRecorder::inline(Arc::new(StoreAuditSink::new(store.clone())));
        WorkspaceServices::new(store, credentials(), audit)
    }

    fn setup_with_failing_audit() -> Services {
        let store = Arc::new(InMemoryWorkspaceStore::new());
        WorkspaceServices::new(store, credentials(), AuditRecorder::inline(Arc::new(FailingSink)))
    }

    fn registration(subdomain: &str) -> RegisterTenant {
        RegisterTenant {
            tenant_name: format!("{subdomain} corp"),
            subdomain: subdomain.to_string(),
            admin_email: format!("admin@{subdomain}.test"),
            admin_password: "correct-horse".to_string(),
            admin_full_name: "Ada Admin".to_string(),
        }
    }

    async fn register(services: &Services, subdomain: &str) -> (Registration, SessionContext) {
        let reg = services.register_tenant(registration(subdomain)).await.unwrap();
        let ctx = SessionContext::new(reg.admin.id, Some(reg.tenant.id), Role::TenantAdmin).unwrap();
        (reg, ctx)
    }

    async fn member(services: &Services, admin: &SessionContext, email: &str) -> SessionContext {
        let tenant = admin.tenant_id().unwrap();
        let user = services
            .add_user(
                admin,
                tenant,
                NewUser {
                    email: email.to_string(),
                    password: "member-pass".to_string(),
                    full_name: "Mo Member".to_string(),
                    role: None,
                },
            )
            .await
            .unwrap();
        SessionContext::new(user.id, Some(tenant), Role::User).unwrap()
    }

    async fn login_as_admin(services: &Services, subdomain: &str) -> Result<LoginOutcome, ServiceError> {
        services
            .login(LoginRequest {
                email: format!("admin@{subdomain}.test"),
                password: "correct-horse".into(),
                subdomain: Some(subdomain.into()),
            })
            .await
    }

    fn super_admin() -> SessionContext {
        SessionContext::new(UserId::new(), None, Role::SuperAdmin).unwrap()
    }

    fn project(name: &str) -> NewProject {
        NewProject { name: name.to_string(), description: None, status: None }
    }

    fn task(title: &str, assigned_to: Option<UserId>) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: None,
            assigned_to,
            priority: None,
            due_date: None,
        }
    }

    fn page() -> Page {
        Page::new(None, None, 50)
    }

    async fn audit_trail(services: &Services, tenant: TenantId) -> Vec<AuditLogEntry> {
        services
            .store()
            .list_audit_entries(workhive_auth::TenantScope::Only(tenant), &AuditFilter::default(), Page::new(None, Some(100), 100))
            .await
            .unwrap()
            .items
    }

    fn denied(result: Result<impl std::fmt::Debug, ServiceError>) -> DenyReason {
        match result {
            Err(ServiceError::Denied(reason)) => reason,
            other => panic!("expected denial, got {other:?}"),
        }
    }

    // ── walk-through ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn register_login_and_fill_the_project_quota() {
        let services = setup();
        let (reg, _) = register(&services, "acme").await;

        let dup = services.register_tenant(registration("acme")).await;
        assert!(matches!(dup, Err(ServiceError::Conflict(_))));

        let outcome = services
            .login(LoginRequest {
                email: "ADMIN@acme.test".to_string(),
                password: "correct-horse".to_string(),
                subdomain: Some("acme".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(outcome.tenant.as_ref().map(|t| t.id), Some(reg.tenant.id));

        let ctx = services.session_from_token(&outcome.token.token).unwrap();
        assert_eq!(ctx.tenant_id(), Some(reg.tenant.id));
        assert_eq!(ctx.role(), Role::TenantAdmin);

        for name in ["alpha", "beta", "gamma"] {
            services.create_project(&ctx, project(name)).await.unwrap();
        }
        let fourth = services.create_project(&ctx, project("delta")).await;
        assert_eq!(
            fourth.unwrap_err(),
            ServiceError::LimitReached { kind: ResourceKind::Project, limit: 3 }
        );

        let details = services.get_tenant(&ctx, reg.tenant.id).await.unwrap();
        assert_eq!(details.stats.total_projects, 3);
        assert_eq!(details.stats.total_users, 1);
    }

    #[tokio::test]
    async fn login_failures_do_not_leak_which_part_was_wrong() {
        let services = setup();
        register(&services, "acme").await;

        let wrong_password = services
            .login(LoginRequest {
                email: "admin@acme.test".into(),
                password: "nope-nope".into(),
                subdomain: Some("acme".into()),
            })
            .await
            .unwrap_err();
        let unknown_email = services
            .login(LoginRequest {
                email: "ghost@acme.test".into(),
                password: "correct-horse".into(),
                subdomain: Some("acme".into()),
            })
            .await
            .unwrap_err();
        assert_eq!(wrong_password, unknown_email);
        assert!(matches!(wrong_password, ServiceError::Unauthenticated(_)));

        let unknown_tenant = services
            .login(LoginRequest {
                email: "admin@acme.test".into(),
                password: "correct-horse".into(),
                subdomain: Some("nowhere".into()),
            })
            .await;
        assert!(matches!(unknown_tenant, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn only_active_tenants_can_log_in() {
        let services = setup();
        let (reg, _) = register(&services, "acme").await;

        for status in [TenantStatus::Trial, TenantStatus::Suspended] {
            services
                .update_tenant(
                    &super_admin(),
                    reg.tenant.id,
                    TenantPatch { status: Some(status), ..TenantPatch::default() },
                )
                .await
                .unwrap();
            match login_as_admin(&services, "acme").await {
                Err(ServiceError::Unauthenticated(msg)) => assert_eq!(msg, format!("tenant is {}", status.as_str())),
                other => panic!("{status:?} tenant logged in: {other:?}"),
            }
        }

        services
            .update_tenant(
                &super_admin(),
                reg.tenant.id,
                TenantPatch { status: Some(TenantStatus::Active), ..TenantPatch::default() },
            )
            .await
            .unwrap();
        assert!(login_as_admin(&services, "acme").await.is_ok());
    }

    #[tokio::test]
    async fn password_work_runs_off_the_async_worker() {
        let recorder = Arc::new(ThreadRecordingCredentials {
            inner: PlainCredentials { tokens: Credentials::new(SECRET, Credentials::DEFAULT_TTL_SECS) },
            threads: Mutex::new(Vec::new()),
        });
        let store = Arc::new(InMemoryWorkspaceStore::new());
        let audit = AuditRecorder::inline(Arc::new(StoreAuditSink::new(store.clone())));
        let services: Services = WorkspaceServices::new(store, recorder.clone(), audit);

        register(&services, "acme").await;
        login_as_admin(&services, "acme").await.unwrap();

        let worker = std::thread::current().id();
        let threads = recorder.threads.lock().unwrap().clone();
        assert_eq!(threads.len(), 2);
        assert!(threads.iter().all(|t| *t != worker));
    }

    #[tokio::test]
    async fn bootstrapped_super_admin_logs_in_without_subdomain() {
        let services = setup();
        assert!(services.bootstrap_super_admin("root@workhive.test", "root-password", "Root").await.unwrap());
        assert!(!services.bootstrap_super_admin("root@workhive.test", "root-password", "Root").await.unwrap());

        let outcome = services
            .login(LoginRequest {
                email: "root@workhive.test".into(),
                password: "root-password".into(),
                subdomain: Some("  ".into()),
            })
            .await
            .unwrap();
        assert_eq!(outcome.user.role, Role::SuperAdmin);
        assert!(outcome.tenant.is_none());

        let ctx = services.session_from_token(&outcome.token.token).unwrap();
        let profile = services.current_user(&ctx).await.unwrap();
        assert_eq!(profile.user.email, "root@workhive.test");
    }

    // ── isolation ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn tenants_cannot_see_or_touch_each_other() {
        let services = setup();
        let (acme, acme_admin) = register(&services, "acme").await;
        let (_, globex_admin) = register(&services, "globex").await;

        let secret = services.create_project(&acme_admin, project("secret")).await.unwrap();
        services.create_task(&acme_admin, secret.id, task("hidden", None)).await.unwrap();

        let visible = services
            .list_projects(&globex_admin, &ProjectFilter::default(), page())
            .await
            .unwrap();
        assert_eq!(visible.total, 0);

        assert_eq!(
            denied(services.get_tenant(&globex_admin, acme.tenant.id).await),
            DenyReason::CrossTenantAccess
        );
        assert_eq!(
            denied(services.list_tasks(&globex_admin, secret.id, &TaskFilter::default(), page()).await),
            DenyReason::CrossTenantAccess
        );
        assert_eq!(
            denied(
                services
                    .update_project(
                        &globex_admin,
                        secret.id,
                        ProjectPatch { name: Some("stolen".into()), ..ProjectPatch::default() },
                    )
                    .await
            ),
            DenyReason::CrossTenantAccess
        );
        assert_eq!(
            denied(services.delete_user(&globex_admin, acme.admin.id).await),
            DenyReason::CrossTenantAccess
        );
        assert_eq!(
            denied(services.list_users(&globex_admin, Some(acme.tenant.id), &UserFilter::default(), page()).await),
            DenyReason::CrossTenantAccess
        );

        let unchanged = services.get_project(&acme_admin, secret.id).await.unwrap();
        assert_eq!(unchanged.name, "secret");
    }

    #[tokio::test]
    async fn tasks_cannot_be_assigned_across_tenants() {
        let services = setup();
        let (_, acme_admin) = register(&services, "acme").await;
        let (globex, _) = register(&services, "globex").await;

        let p = services.create_project(&acme_admin, project("p")).await.unwrap();
        let result = services.create_task(&acme_admin, p.id, task("t", Some(globex.admin.id))).await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    // ── super_admin ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn super_admin_reads_everything_but_mutates_nothing() {
        let services = setup();
        let (acme, acme_admin) = register(&services, "acme").await;
        let p = services.create_project(&acme_admin, project("p")).await.unwrap();
        let root = super_admin();

        let before = audit_trail(&services, acme.tenant.id).await.len();

        assert_eq!(denied(services.create_project(&root, project("x")).await), DenyReason::ReadOnlyRole);
        assert_eq!(
            denied(
                services
                    .update_project(&root, p.id, ProjectPatch { name: Some("x".into()), ..ProjectPatch::default() })
                    .await
            ),
            DenyReason::ReadOnlyRole
        );
        assert_eq!(denied(services.delete_project(&root, p.id).await), DenyReason::ReadOnlyRole);
        assert_eq!(
            denied(services.create_task(&root, p.id, task("t", None)).await),
            DenyReason::ReadOnlyRole
        );
        assert_eq!(
            denied(
                services
                    .add_user(
                        &root,
                        acme.tenant.id,
                        NewUser {
                            email: "x@acme.test".into(),
                            password: "password1".into(),
                            full_name: "X".into(),
                            role: None,
                        },
                    )
                    .await
            ),
            DenyReason::ReadOnlyRole
        );
        assert_eq!(
            denied(
                services
                    .update_tenant(
                        &root,
                        acme.tenant.id,
                        TenantPatch { name: Some("renamed".into()), ..TenantPatch::default() },
                    )
                    .await
            ),
            DenyReason::ReadOnlyRole
        );

        assert_eq!(audit_trail(&services, acme.tenant.id).await.len(), before);
        let all = services.list_projects(&root, &ProjectFilter::default(), page()).await.unwrap();
        assert_eq!(all.total, 1);
        assert_eq!(all.items[0].project.name, "p");
    }

    #[tokio::test]
    async fn subscription_changes_need_super_admin() {
        let services = setup();
        let (acme, acme_admin) = register(&services, "acme").await;

        let raise = TenantPatch { max_projects: Some(10), ..TenantPatch::default() };
        assert_eq!(
            denied(services.update_tenant(&acme_admin, acme.tenant.id, raise.clone()).await),
            DenyReason::FieldRequiresSuperAdmin
        );

        let updated = services.update_tenant(&super_admin(), acme.tenant.id, raise).await.unwrap();
        assert_eq!(updated.max_projects, 10);

        let renamed = services
            .update_tenant(
                &acme_admin,
                acme.tenant.id,
                TenantPatch { name: Some("Acme Rockets".into()), ..TenantPatch::default() },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Acme Rockets");

        let actions: Vec<_> = audit_trail(&services, acme.tenant.id).await.iter().map(|e| e.action).collect();
        assert!(actions.contains(&AuditAction::UpdateTenantSubscription));
        assert!(actions.contains(&AuditAction::UpdateTenant));
    }

    // ── quota under concurrency ──────────────────────────────────────────

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn full_quota_rejects_every_concurrent_create() {
        let services = Arc::new(setup());
        let (_, ctx) = register(&services, "acme").await;
        for i in 0..3 {
            services.create_project(&ctx, project(&format!("seed-{i}"))).await.unwrap();
        }

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let services = services.clone();
                tokio::spawn(async move { services.create_project(&ctx, project(&format!("racer-{i}"))).await })
            })
            .collect();

        let mut rejected = 0;
        for h in handles {
            match h.await.unwrap() {
                Err(ServiceError::LimitReached { kind: ResourceKind::Project, limit: 3 }) => rejected += 1,
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
        assert_eq!(rejected, 8);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_fill_exactly_the_remaining_quota() {
        let services = Arc::new(setup());
        let (_, ctx) = register(&services, "acme").await;
        services.create_project(&ctx, project("seed")).await.unwrap();

        let handles: Vec<_> = (0..5)
            .map(|i| {
                let services = services.clone();
                tokio::spawn(async move { services.create_project(&ctx, project(&format!("racer-{i}"))).await })
            })
            .collect();

        let mut ok = 0;
        let mut limited = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(ServiceError::LimitReached { .. }) => limited += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!((ok, limited), (2, 3));

        let listed = services.list_projects(&ctx, &ProjectFilter::default(), page()).await.unwrap();
        assert_eq!(listed.total, 3);
    }

    #[tokio::test]
    async fn user_quota_counts_the_admin() {
        let services = setup();
        let (_, admin) = register(&services, "acme").await;
        for i in 0..4 {
            member(&services, &admin, &format!("m{i}@acme.test")).await;
        }
        let sixth = services
            .add_user(
                &admin,
                admin.tenant_id().unwrap(),
                NewUser {
                    email: "m5@acme.test".into(),
                    password: "member-pass".into(),
                    full_name: "Five".into(),
                    role: None,
                },
            )
            .await;
        assert_eq!(sixth.unwrap_err(), ServiceError::LimitReached { kind: ResourceKind::User, limit: 5 });
    }

    // ── members ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn members_move_only_their_own_or_unassigned_tasks() {
        let services = setup();
        let (_, admin) = register(&services, "acme").await;
        let alice = member(&services, &admin, "alice@acme.test").await;
        let bob = member(&services, &admin, "bob@acme.test").await;

        let p = services.create_project(&admin, project("p")).await.unwrap();
        let bobs = services.create_task(&admin, p.id, task("bob's", Some(bob.actor_id()))).await.unwrap();
        let open = services.create_task(&admin, p.id, task("open", None)).await.unwrap();

        assert_eq!(
            denied(services.update_task_status(&alice, bobs.id, TaskStatus::Completed).await),
            DenyReason::NotAssignee
        );
        let listed = services.list_tasks(&alice, p.id, &TaskFilter::default(), page()).await.unwrap();
        let still = listed.items.iter().find(|t| t.id == bobs.id).unwrap();
        assert_eq!(still.status, TaskStatus::Todo);

        let moved = services.update_task_status(&bob, bobs.id, TaskStatus::InProgress).await.unwrap();
        assert_eq!(moved.status, TaskStatus::InProgress);
        let moved = services.update_task_status(&alice, open.id, TaskStatus::Completed).await.unwrap();
        assert_eq!(moved.status, TaskStatus::Completed);

        assert_eq!(
            denied(
                services
                    .update_task(&alice, open.id, TaskPatch { priority: Some(TaskPriority::High), ..TaskPatch::default() })
                    .await
            ),
            DenyReason::InsufficientRole
        );
        assert_eq!(denied(services.delete_task(&alice, open.id).await), DenyReason::InsufficientRole);
    }

    #[tokio::test]
    async fn members_may_rename_only_themselves() {
        let services = setup();
        let (reg, admin) = register(&services, "acme").await;
        let alice = member(&services, &admin, "alice@acme.test").await;

        let renamed = services
            .update_user(&alice, alice.actor_id(), UserPatch { full_name: Some("Alice A.".into()), ..UserPatch::default() })
            .await
            .unwrap();
        assert_eq!(renamed.full_name, "Alice A.");

        assert_eq!(
            denied(
                services
                    .update_user(&alice, alice.actor_id(), UserPatch { role: Some(Role::TenantAdmin), ..UserPatch::default() })
                    .await
            ),
            DenyReason::InsufficientRole
        );
        assert_eq!(
            denied(
                services
                    .update_user(&alice, reg.admin.id, UserPatch { full_name: Some("x".into()), ..UserPatch::default() })
                    .await
            ),
            DenyReason::InsufficientRole
        );
        assert_eq!(
            denied(services.list_audit_logs(&alice, &AuditFilter::default(), page()).await),
            DenyReason::InsufficientRole
        );
    }

    #[tokio::test]
    async fn admins_cannot_delete_themselves() {
        let services = setup();
        let (reg, admin) = register(&services, "acme").await;

        assert_eq!(
            denied(services.delete_user(&admin, reg.admin.id).await),
            DenyReason::CannotDeleteSelf
        );
        let users = services.list_users(&admin, None, &UserFilter::default(), page()).await.unwrap();
        assert_eq!(users.total, 1);
    }

    #[tokio::test]
    async fn deleting_a_user_hands_projects_to_the_caller() {
        let services = setup();
        let (_, admin) = register(&services, "acme").await;
        let second = services
            .add_user(
                &admin,
                admin.tenant_id().unwrap(),
                NewUser {
                    email: "second@acme.test".into(),
                    password: "second-pass".into(),
                    full_name: "Second Admin".into(),
                    role: Some(Role::TenantAdmin),
                },
            )
            .await
            .unwrap();
        let second_ctx = SessionContext::new(second.id, admin.tenant_id(), Role::TenantAdmin).unwrap();
        let p = services.create_project(&second_ctx, project("theirs")).await.unwrap();
        let t = services.create_task(&second_ctx, p.id, task("t", Some(second.id))).await.unwrap();

        services.delete_user(&admin, second.id).await.unwrap();

        let project = services.get_project(&admin, p.id).await.unwrap();
        assert_eq!(project.created_by, admin.actor_id());
        let tasks = services.list_tasks(&admin, p.id, &TaskFilter::default(), page()).await.unwrap();
        let task = tasks.items.iter().find(|x| x.id == t.id).unwrap();
        assert_eq!(task.assigned_to, None);
    }

    // ── audit ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn every_mutation_leaves_exactly_one_entry() {
        let services = setup();
        let (reg, admin) = register(&services, "acme").await;
        let tenant = reg.tenant.id;
        let root = super_admin();
        let me = admin.actor_id();

        services
            .update_tenant(&admin, tenant, TenantPatch { name: Some("Acme Two".into()), ..TenantPatch::default() })
            .await
            .unwrap();
        services
            .update_tenant(&root, tenant, TenantPatch { max_projects: Some(5), ..TenantPatch::default() })
            .await
            .unwrap();

        let bob = services
            .add_user(
                &admin,
                tenant,
                NewUser {
                    email: "bob@acme.test".into(),
                    password: "member-pass".into(),
                    full_name: "Bob".into(),
                    role: None,
                },
            )
            .await
            .unwrap();
        services
            .update_user(&admin, bob.id, UserPatch { full_name: Some("Bobby".into()), ..UserPatch::default() })
            .await
            .unwrap();

        let p = services.create_project(&admin, project("p")).await.unwrap();
        services
            .update_project(&admin, p.id, ProjectPatch { name: Some("p2".into()), ..ProjectPatch::default() })
            .await
            .unwrap();
        let t = services.create_task(&admin, p.id, task("t", None)).await.unwrap();
        services.update_task_status(&admin, t.id, TaskStatus::InProgress).await.unwrap();
        services
            .update_task(&admin, t.id, TaskPatch { title: Some("t2".into()), ..TaskPatch::default() })
            .await
            .unwrap();
        services.delete_task(&admin, t.id).await.unwrap();
        services.delete_project(&admin, p.id).await.unwrap();
        services.delete_user(&admin, bob.id).await.unwrap();

        // failures record nothing
        let _ = services.update_task(&admin, t.id, TaskPatch::default()).await;
        let _ = services.delete_user(&admin, me).await;

        let tenant_uuid = *tenant.as_uuid();
        let bob_uuid = *bob.id.as_uuid();
        let project_uuid = *p.id.as_uuid();
        let task_uuid = *t.id.as_uuid();
        let expected = vec![
            (AuditAction::TenantRegistration, me, EntityType::Tenant, tenant_uuid),
            (AuditAction::UpdateTenant, me, EntityType::Tenant, tenant_uuid),
            (AuditAction::UpdateTenantSubscription, root.actor_id(), EntityType::Tenant, tenant_uuid),
            (AuditAction::CreateUser, me, EntityType::User, bob_uuid),
            (AuditAction::UpdateUser, me, EntityType::User, bob_uuid),
            (AuditAction::CreateProject, me, EntityType::Project, project_uuid),
            (AuditAction::UpdateProject, me, EntityType::Project, project_uuid),
            (AuditAction::CreateTask, me, EntityType::Task, task_uuid),
            (AuditAction::UpdateTaskStatus, me, EntityType::Task, task_uuid),
            (AuditAction::UpdateTask, me, EntityType::Task, task_uuid),
            (AuditAction::DeleteTask, me, EntityType::Task, task_uuid),
            (AuditAction::DeleteProject, me, EntityType::Project, project_uuid),
            (AuditAction::DeleteUser, me, EntityType::User, bob_uuid),
        ];

        let mut trail = audit_trail(&services, tenant).await;
        trail.reverse();
        assert!(trail.iter().all(|e| e.tenant_id == Some(tenant)));
        let recorded: Vec<_> = trail
            .iter()
            .map(|e| (e.action, e.actor_user_id, e.entity_type, e.entity_id))
            .collect();
        assert_eq!(recorded, expected);

        let visible = services.list_audit_logs(&admin, &AuditFilter::default(), page()).await.unwrap();
        assert_eq!(visible.total, expected.len() as u64);
    }

    #[tokio::test]
    async fn login_and_logout_are_audited() {
        let services = setup();
        let (reg, _) = register(&services, "acme").await;

        let outcome = services
            .login(LoginRequest {
                email: "admin@acme.test".into(),
                password: "correct-horse".into(),
                subdomain: Some("acme".into()),
            })
            .await
            .unwrap();
        let ctx = services.session_from_token(&outcome.token.token).unwrap();
        services.logout(&ctx).await.unwrap();

        let trail = audit_trail(&services, reg.tenant.id).await;
        assert_eq!(trail[0].action, AuditAction::Logout);
        assert_eq!(trail[1].action, AuditAction::Login);
        assert_eq!(trail[0].actor_user_id, reg.admin.id);
    }

    #[tokio::test]
    async fn failing_audit_sink_leaves_results_untouched() {
        let services = setup_with_failing_audit();
        let (_, admin) = register(&services, "acme").await;

        let p = services.create_project(&admin, project("p")).await.unwrap();
        let listed = services.list_projects(&admin, &ProjectFilter::default(), page()).await.unwrap();
        assert_eq!(listed.items[0].project.id, p.id);
    }
}
