use std::sync::Arc;

use lambda_http::http::header::{HeaderValue, VARY};
use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, Response,
};
use taskmaster_atoms::{response, tasks, users};
use taskmaster_shared::{auth, AppState};

fn with_cors_headers(mut resp: Response<Body>, allowed_origin: &str) -> Response<Body> {
    let headers = resp.headers_mut();
    headers.insert(
        "Access-Control-Allow-Origin",
        HeaderValue::from_str(allowed_origin).unwrap_or_else(|_| HeaderValue::from_static("*")),
    );
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET,POST,PUT,DELETE,OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type,Authorization"),
    );
    if allowed_origin != "*" {
        headers.append(VARY, HeaderValue::from_static("Origin"));
    }
    resp
}

fn finalize_response(
    resp: Result<Response<Body>, Error>,
    state: &AppState,
) -> Result<Response<Body>, Error> {
    resp.map(|r| with_cors_headers(r, &state.cors_origin))
}

/// Main Lambda handler - authenticates and routes `/api/*` requests
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    let body = event.body();
    tracing::info!("TaskMaster API invoked - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if method == Method::OPTIONS {
        let resp = Response::builder()
            .status(StatusCode::OK)
            .body(Body::Empty)
            .map_err(Box::new)?;
        return Ok(with_cors_headers(resp, &state.cors_origin));
    }

    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let known_route = matches!(
        parts.as_slice(),
        ["api", "tasks"] | ["api", "tasks", _] | ["api", "users"] | ["api", "users", "me"]
    );
    if !known_route {
        return finalize_response(response::not_found(), &state);
    }

    // Every known route requires a verified bearer token
    let identity = match auth::authenticate(state.identity.as_ref(), event.headers()).await {
        Ok(identity) => identity,
        Err(e) => return finalize_response(auth::auth_error_response(&e), &state),
    };
    let owner_id = identity.owner_id.as_str();

    let resp = match (method, parts.as_slice()) {
        // --- TASKS ---
        // GET /api/tasks - list the caller's tasks
        (&Method::GET, ["api", "tasks"]) => tasks::http::list_tasks(state.tasks.as_ref(), owner_id).await,
        // POST /api/tasks - create task
        (&Method::POST, ["api", "tasks"]) => {
            tasks::http::create_task(state.tasks.as_ref(), owner_id, body).await
        }
        // GET /api/tasks/{id} - get task
        (&Method::GET, ["api", "tasks", task_id]) => {
            tasks::http::get_task(state.tasks.as_ref(), owner_id, task_id).await
        }
        // PUT /api/tasks/{id} - partial update
        (&Method::PUT, ["api", "tasks", task_id]) => {
            tasks::http::update_task(state.tasks.as_ref(), owner_id, task_id, body).await
        }
        // DELETE /api/tasks/{id} - delete task
        (&Method::DELETE, ["api", "tasks", task_id]) => {
            tasks::http::delete_task(state.tasks.as_ref(), owner_id, task_id).await
        }

        // --- USERS ---
        // POST /api/users - register the caller's profile
        (&Method::POST, ["api", "users"]) => {
            users::http::register_user(state.users.as_ref(), owner_id, identity.claims(), body).await
        }
        // GET /api/users/me - the caller's profile
        (&Method::GET, ["api", "users", "me"]) => {
            users::http::get_me(state.users.as_ref(), owner_id).await
        }

        _ => response::method_not_allowed(),
    };

    finalize_response(resp, &state)
}
