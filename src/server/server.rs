use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tracing::{error, info, warn};

use super::session::{Session, COOKIE_SESSION_TOKEN_KEY};
use super::{log_requests, state::*, ServerConfig};
use crate::account::{AccountManager, AccountStore, AuthTokenValue};
use crate::backend_store::MediaStore;
use crate::error::{ErrorBody, TrackerError, TrackerResult};
use crate::media::{CollectionFilter, FilterQuery, MediaDraft, MediaUpdate, SeasonUpdate};

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let status = match &self {
            TrackerError::Validation(_) => StatusCode::BAD_REQUEST,
            TrackerError::Auth(_) => StatusCode::UNAUTHORIZED,
            TrackerError::NotFound(_) => StatusCode::NOT_FOUND,
            TrackerError::Remote(_) => StatusCode::BAD_GATEWAY,
            TrackerError::Storage(err) => {
                error!("Storage failure: {:#}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorBody::from(&self))).into_response()
    }
}

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Serialize, Debug)]
pub struct RegisterBody {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct RegisterResponse {
    pub account_id: i64,
}

#[derive(Deserialize, Serialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LoginSuccessResponse {
    pub token: String,
    pub account_id: i64,
    pub email: String,
    pub username: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub account_id: i64,
    pub email: String,
    pub username: Option<String>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct AdjustEpisodesBody {
    pub delta: i32,
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    Json(ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
    })
}

async fn register(
    State(account_manager): State<GuardedAccountManager>,
    Json(body): Json<RegisterBody>,
) -> TrackerResult<Response> {
    let account_id =
        account_manager.register(&body.email, &body.password, body.username.as_deref())?;
    Ok((StatusCode::CREATED, Json(RegisterResponse { account_id })).into_response())
}

async fn login(
    State(account_manager): State<GuardedAccountManager>,
    Json(body): Json<LoginBody>,
) -> TrackerResult<Response> {
    let (token, account) = account_manager.login(&body.email, &body.password)?;
    let cookie = Cookie::build((COOKIE_SESSION_TOKEN_KEY, token.value.0.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    let response_body = LoginSuccessResponse {
        token: token.value.0,
        account_id: account.id,
        email: account.email,
        username: account.username,
    };
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie.to_string())],
        Json(response_body),
    )
        .into_response())
}

async fn logout(
    State(account_manager): State<GuardedAccountManager>,
    session: Session,
) -> TrackerResult<Response> {
    account_manager.logout(&AuthTokenValue(session.token))?;
    let cookie = Cookie::build((COOKIE_SESSION_TOKEN_KEY, ""))
        .path("/")
        .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1))
        .same_site(SameSite::Lax)
        .build();
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())]).into_response())
}

async fn get_session(
    State(account_manager): State<GuardedAccountManager>,
    session: Session,
) -> TrackerResult<Json<SessionView>> {
    let account = account_manager.get_account(session.account_id)?;
    Ok(Json(SessionView {
        account_id: account.id,
        email: account.email,
        username: account.username,
    }))
}

async fn list_entries(
    session: Session,
    State(store): State<GuardedMediaStore>,
    Query(query): Query<FilterQuery>,
) -> TrackerResult<Response> {
    let filter = CollectionFilter::try_from(query)?;
    let entries = store.list_entries(session.account_id, &filter)?;
    Ok(Json(entries).into_response())
}

async fn post_entry(
    session: Session,
    State(store): State<GuardedMediaStore>,
    Json(draft): Json<MediaDraft>,
) -> TrackerResult<Response> {
    let entry = store.create_entry(session.account_id, &draft)?;
    Ok((StatusCode::CREATED, Json(entry)).into_response())
}

async fn get_entry(
    session: Session,
    State(store): State<GuardedMediaStore>,
    Path(id): Path<String>,
) -> TrackerResult<Response> {
    Ok(Json(store.get_entry(session.account_id, &id)?).into_response())
}

async fn patch_entry(
    session: Session,
    State(store): State<GuardedMediaStore>,
    Path(id): Path<String>,
    Json(update): Json<MediaUpdate>,
) -> TrackerResult<Response> {
    Ok(Json(store.update_entry(session.account_id, &id, &update)?).into_response())
}

async fn delete_entry(
    session: Session,
    State(store): State<GuardedMediaStore>,
    Path(id): Path<String>,
) -> TrackerResult<StatusCode> {
    store.delete_entry(session.account_id, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn adjust_season(
    session: Session,
    State(store): State<GuardedMediaStore>,
    Path(id): Path<String>,
    Json(body): Json<AdjustEpisodesBody>,
) -> TrackerResult<Response> {
    let season = store.adjust_season_episodes(session.account_id, &id, body.delta)?;
    Ok(Json(season).into_response())
}

async fn patch_season(
    session: Session,
    State(store): State<GuardedMediaStore>,
    Path(id): Path<String>,
    Json(update): Json<SeasonUpdate>,
) -> TrackerResult<Response> {
    Ok(Json(store.update_season(session.account_id, &id, &update)?).into_response())
}

impl ServerState {
    fn new(
        config: ServerConfig,
        account_store: Arc<dyn AccountStore>,
        media_store: Arc<dyn MediaStore>,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            account_manager: Arc::new(AccountManager::new(account_store)),
            media_store,
        }
    }
}

pub fn make_app(
    config: ServerConfig,
    account_store: Arc<dyn AccountStore>,
    media_store: Arc<dyn MediaStore>,
) -> Router {
    let state = ServerState::new(config.clone(), account_store, media_store);

    let auth_routes: Router = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/session", get(get_session))
        .with_state(state.clone());

    let collection_routes: Router = Router::new()
        .route("/entries", get(list_entries).post(post_entry))
        .route(
            "/entries/{id}",
            get(get_entry).patch(patch_entry).delete(delete_entry),
        )
        .route("/seasons/{id}", patch(patch_season))
        .route("/seasons/{id}/adjust", post(adjust_season))
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new().route("/", get(home)).with_state(state.clone()),
    };

    home_router
        .nest("/v1/auth", auth_routes)
        .nest("/v1", collection_routes)
        .layer(middleware::from_fn_with_state(
            config.requests_logging_level,
            log_requests,
        ))
}

pub async fn run_server(
    config: ServerConfig,
    account_store: Arc<dyn AccountStore>,
    media_store: Arc<dyn MediaStore>,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, account_store, media_store);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", err);
                std::future::pending::<()>().await;
            }
            info!("Shutting down");
        })
        .await?;
    Ok(())
}
