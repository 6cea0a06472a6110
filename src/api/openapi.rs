//! OpenAPI document for the service, served through Swagger UI.

use utoipa::OpenApi;

use crate::api::handlers::{auth, health, projects, root, tasks, workspaces};

#[derive(OpenApi)]
#[openapi(
    paths(
        root::root,
        health::health,
        auth::signup::register,
        auth::login::login,
        auth::verification::verify_email,
        auth::reset::reset_password_request,
        auth::reset::reset_password,
        workspaces::create_workspace,
        workspaces::list_workspaces,
        projects::create_project,
        projects::get_project,
        projects::get_project_tasks,
        tasks::create_task,
        tasks::update_task_status,
        tasks::archive_task,
    ),
    components(schemas(
        health::Health,
        auth::types::MessageResponse,
        auth::types::RegisterRequest,
        auth::types::LoginRequest,
        auth::types::LoginResponse,
        auth::types::UserResponse,
        auth::types::VerifyEmailRequest,
        auth::types::ResetPasswordRequestRequest,
        auth::types::ResetPasswordRequest,
        workspaces::CreateWorkspaceRequest,
        workspaces::WorkspaceResponse,
        projects::CreateProjectRequest,
        projects::MemberResponse,
        projects::ProjectResponse,
        projects::ProjectTasksResponse,
        projects::status::ProjectStatus,
        projects::status::TaskStatus,
        tasks::CreateTaskRequest,
        tasks::UpdateTaskStatusRequest,
        tasks::TaskResponse,
    )),
    tags(
        (name = "root", description = "Service banner"),
        (name = "health", description = "Liveness and database health"),
        (name = "auth", description = "Account lifecycle: register, verify, login, reset"),
        (name = "workspaces", description = "Workspaces and member rosters"),
        (name = "projects", description = "Projects with snapshotted member lists"),
        (name = "tasks", description = "Tasks feeding the project status aggregate"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::openapi;

    #[test]
    fn openapi_lists_the_auth_routes() {
        let doc = openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/auth/register"));
        assert!(paths.contains_key("/auth/login"));
        assert!(paths.contains_key("/auth/verify-email"));
        assert!(paths.contains_key("/auth/reset-password-request"));
        assert!(paths.contains_key("/auth/reset-password"));
    }

    #[test]
    fn openapi_lists_the_project_routes() {
        let doc = openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/workspaces"));
        assert!(paths.contains_key("/workspaces/{workspace_id}/projects"));
        assert!(paths.contains_key("/projects/{project_id}"));
        assert!(paths.contains_key("/projects/{project_id}/tasks"));
        assert!(paths.contains_key("/tasks/{task_id}/status"));
        assert!(paths.contains_key("/tasks/{task_id}/archive"));
    }
}
