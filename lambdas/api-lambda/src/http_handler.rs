use blog_shared::{
    auth,
    error::ServiceError,
    gate::{self, CallerIdentity},
    posts::{self, PostDraft},
    responses::{error_response, method_not_allowed, not_found, preflight, respond},
    types::{CreatePostRequest, LoginRequest, RegisterRequest, UpdatePostRequest},
    AppState,
};
use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, Response,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Main Lambda handler - routes requests to post or auth endpoints
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    tracing::info!("Blog API invoked - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if *method == Method::OPTIONS {
        return preflight();
    }

    let path = path.strip_prefix("/api").unwrap_or(path);
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match (method, parts.as_slice()) {
        // --- POSTS ---
        // GET /posts - list all posts, newest first
        (&Method::GET, ["posts"]) => respond(StatusCode::OK, posts::list_posts(&state).await),
        // POST /posts - create post (requires auth)
        (&Method::POST, ["posts"]) => {
            let outcome = async {
                let caller = caller(&state, &event).await?;
                let draft = PostDraft::try_from(parse_body::<CreatePostRequest>(event.body())?)?;
                posts::create_post(&state, &caller, draft).await
            }
            .await;
            respond(StatusCode::CREATED, outcome)
        }
        // GET /posts/{id} - single post
        (&Method::GET, ["posts", post_id]) => {
            respond(StatusCode::OK, posts::get_post(&state, post_id).await)
        }
        // PUT /posts/{id} - update own post
        (&Method::PUT, ["posts", post_id]) => {
            let outcome = async {
                let caller = caller(&state, &event).await?;
                let draft = PostDraft::try_from(parse_body::<UpdatePostRequest>(event.body())?)?;
                posts::update_post(&state, post_id, &caller, draft).await
            }
            .await;
            respond(StatusCode::OK, outcome)
        }
        // DELETE /posts/{id} - delete own post
        (&Method::DELETE, ["posts", post_id]) => {
            let outcome = async {
                let caller = caller(&state, &event).await?;
                posts::delete_post(&state, post_id, &caller).await
            }
            .await;
            respond(StatusCode::OK, outcome)
        }

        // --- AUTH ---
        (&Method::POST, ["auth", "register"]) => match parse_body::<RegisterRequest>(event.body()) {
            Ok(req) => respond(StatusCode::CREATED, auth::register(&state, req).await),
            Err(err) => error_response(&err),
        },
        (&Method::POST, ["auth", "login"]) => match parse_body::<LoginRequest>(event.body()) {
            Ok(req) => respond(StatusCode::OK, auth::login(&state, req).await),
            Err(err) => error_response(&err),
        },
        (&Method::GET, ["auth", "me"]) => {
            let outcome = async {
                let caller = caller(&state, &event).await?;
                auth::current_user(&state, &caller).await
            }
            .await;
            respond(StatusCode::OK, outcome)
        }

        (_, ["posts"] | ["posts", _] | ["auth", "register" | "login" | "me"]) => {
            tracing::warn!("Method {} not allowed on {}", method, path);
            method_not_allowed()
        }
        _ => {
            tracing::warn!("No route for {} {}", method, path);
            not_found()
        }
    }
}

async fn caller(state: &AppState, event: &Request) -> Result<CallerIdentity, ServiceError> {
    gate::authorize(state.identity.as_ref(), event.headers()).await
}

/// Deserialize a JSON request body. An empty body reads as `{}` so that
/// missing fields surface as validation errors instead of parse errors.
fn parse_body<T: DeserializeOwned>(body: &Body) -> Result<T, ServiceError> {
    let bytes: &[u8] = body;
    let bytes = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        bytes
    };
    serde_json::from_slice(bytes).map_err(|e| {
        tracing::info!("Unparseable request body: {}", e);
        ServiceError::InvalidInput("Invalid request body".to_string())
    })
}
