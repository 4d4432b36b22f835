use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use ukuvi_core::{App, Event, Invocation, Outcome, Trigger};
use uuid::Uuid;

use crate::connection::Shared;

type RouteError = (StatusCode, String);

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct AppSummary {
    pub app_id: String,
    pub functions: Vec<FunctionSummary>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FunctionSummary {
    pub id: String,
    pub triggers: Vec<Trigger>,
}

impl From<&App> for AppSummary {
    fn from(app: &App) -> Self {
        AppSummary {
            app_id: app.app_id().to_owned(),
            functions: app
                .functions()
                .iter()
                .map(|function| FunctionSummary {
                    id: function.id().to_owned(),
                    triggers: vec![function.trigger().clone()],
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct Introspection {
    apps: Vec<AppSummary>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InvokeRequest {
    pub event: Event,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub ctx: Option<RunContext>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RunContext {
    pub run_id: String,
    #[serde(default)]
    pub attempt: u32,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct InvokeResponse {
    pub invocation_id: Uuid,
    pub outcomes: Vec<Outcome>,
}

impl InvokeRequest {
    fn into_invocation(self, app_id: Option<String>, function_id: Option<String>) -> Invocation {
        let mut invocation = Invocation::for_event(self.event);

        invocation.app_id = app_id;
        invocation.function_id = function_id;
        invocation.events = self.events;

        if let Some(ctx) = self.ctx {
            invocation.run_id = ctx.run_id;
            invocation.attempt = ctx.attempt;
        }

        invocation
    }
}

pub(crate) fn router(shared: Arc<Shared>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/introspect", get(introspect))
        .route("/api/events", post(deliver_event))
        .route(
            "/api/apps/:app_id/functions/:function_id",
            post(invoke_function),
        )
        .layer(Extension(shared))
        .layer(TraceLayer::new_for_http())
}

#[tracing::instrument(name = "http::health")]
async fn health() -> Html<&'static str> {
    Html("ok")
}

#[tracing::instrument(name = "http::introspect", skip_all)]
async fn introspect(
    Extension(shared): Extension<Arc<Shared>>,
) -> Result<Json<Introspection>, RouteError> {
    let apps = shared.apps().map_err(internal_error)?;

    Ok(Json(Introspection { apps }))
}

#[tracing::instrument(name = "http::deliver_event", skip_all)]
async fn deliver_event(
    Extension(shared): Extension<Arc<Shared>>,
    headers: HeaderMap,
    Json(request): Json<InvokeRequest>,
) -> Result<Json<InvokeResponse>, RouteError> {
    authorize(&shared, &headers)?;

    let invocation = request.into_invocation(None, None);
    let invocation_id = invocation.id;

    let outcomes = shared.deliver(invocation).await.map_err(internal_error)?;

    Ok(Json(InvokeResponse {
        invocation_id,
        outcomes,
    }))
}

#[tracing::instrument(name = "http::invoke_function", skip_all)]
async fn invoke_function(
    Extension(shared): Extension<Arc<Shared>>,
    headers: HeaderMap,
    Path((app_id, function_id)): Path<(String, String)>,
    Json(request): Json<InvokeRequest>,
) -> Result<(StatusCode, Json<InvokeResponse>), RouteError> {
    authorize(&shared, &headers)?;

    let invocation = request.into_invocation(Some(app_id.clone()), Some(function_id.clone()));
    let invocation_id = invocation.id;

    let outcomes = shared.deliver(invocation).await.map_err(internal_error)?;

    let status = match outcomes.first() {
        None => {
            return Err((
                StatusCode::NOT_FOUND,
                format!("function '{}' not found in app '{}'", function_id, app_id),
            ))
        }
        Some(outcome) if outcome.is_completed() => StatusCode::OK,
        Some(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    Ok((
        status,
        Json(InvokeResponse {
            invocation_id,
            outcomes,
        }),
    ))
}

fn authorize(shared: &Shared, headers: &HeaderMap) -> Result<(), RouteError> {
    let signing_key = match shared.signing_key() {
        Some(signing_key) => signing_key,
        None => return Ok(()),
    };

    let auth_header = match headers.get("authorization") {
        Some(auth_header) => auth_header,
        None => {
            return Err((
                StatusCode::UNAUTHORIZED,
                "missing authorization header".to_owned(),
            ))
        }
    };

    let auth_header = match auth_header.to_str() {
        Ok(auth_header) => auth_header,
        Err(_) => {
            return Err((
                StatusCode::BAD_REQUEST,
                "authorization header malformed".to_owned(),
            ))
        }
    };

    match auth_header.strip_prefix("Bearer ") {
        Some(token) if constant_time_eq(token.as_bytes(), signing_key.as_bytes()) => Ok(()),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            "invalid signing key".to_owned(),
        )),
    }
}

// Compares every byte so the time taken does not reveal the matching prefix.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b.iter()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn internal_error(err: anyhow::Error) -> RouteError {
    tracing::error!("request failed: {:#}", err);

    (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", err))
}
