use axum::{
    routing::{get, patch, post, put},
    Router,
};

pub mod audit;
pub mod auth;
pub mod projects;
pub mod system;
pub mod tasks;
pub mod tenants;
pub mod users;

/// Endpoints reachable without a session.
pub fn public_router() -> Router {
    Router::new()
        .route("/api/auth/register-tenant", post(auth::register_tenant))
        .route("/api/auth/login", post(auth::login))
}

/// Endpoints that require a verified `SessionContext`.
pub fn router() -> Router {
    Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/tenants", get(tenants::list_tenants))
        .route("/api/tenants/:id", get(tenants::get_tenant).put(tenants::update_tenant))
        .route("/api/tenants/:id/users", post(users::add_user).get(users::list_tenant_users))
        .route("/api/users", get(users::list_users))
        .route("/api/users/:id", put(users::update_user).delete(users::delete_user))
        .route("/api/projects", post(projects::create_project).get(projects::list_projects))
        .route("/api/projects/:id", put(projects::update_project).delete(projects::delete_project))
        .route("/api/projects/:id/tasks", post(tasks::create_task).get(tasks::list_tasks))
        .route("/api/tasks/:id/status", patch(tasks::update_task_status))
        .route("/api/tasks/:id", put(tasks::update_task).delete(tasks::delete_task))
        .route("/api/audit-logs", get(audit::list_audit_logs))
}
