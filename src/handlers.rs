use crate::errors::AppError;
use crate::identity::UserId;
use crate::models::{
    mood_key, BlockView, Manifest, MoodView, SessionResponse, ToggleRequest, TrackerView,
};
use crate::session::TrackerSession;
use crate::state::AppState;
use crate::ui::render_index;
use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use tracing::{error, info};

pub const SESSION_COOKIE: &str = "habit_uid";

pub async fn index(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Some(user) = current_user(&state, &jar) {
        return Html(render_index(&state.layout, Some(&user))).into_response();
    }

    match state.identity.sign_in_anonymously() {
        Ok(user) => {
            info!(user = %user, "signed in anonymously");
            let page = Html(render_index(&state.layout, Some(&user)));
            (remember(jar, &user), page).into_response()
        }
        Err(err) => {
            error!("anonymous sign-in failed: {err}");
            Html(render_index(&state.layout, None)).into_response()
        }
    }
}

pub async fn create_session(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SessionResponse>), AppError> {
    let user = state.identity.sign_in_anonymously().map_err(|err| {
        error!("anonymous sign-in failed: {err}");
        AppError::from(err)
    })?;
    info!(user = %user, "signed in anonymously");

    let jar = remember(jar, &user);
    Ok((jar, Json(SessionResponse { user_id: user })))
}

pub async fn get_tracker(State(state): State<AppState>, jar: CookieJar) -> Json<TrackerView> {
    let session = resolve_session(&state, &jar).await;
    let blocks = session.snapshot().await;
    Json(TrackerView::build(
        session.layout(),
        session.user().cloned(),
        session.is_persisting(),
        &blocks,
    ))
}

pub async fn toggle(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<ToggleRequest>,
) -> Result<Json<BlockView>, AppError> {
    let user =
        current_user(&state, &jar).ok_or_else(|| AppError::unauthorized("not authenticated"))?;
    let session = state.session_for(&user).await;

    let spec = session
        .layout()
        .block(&payload.label)
        .ok_or_else(|| AppError::not_found(format!("unknown block '{}'", payload.label)))?;
    let toggled = session.toggle(&payload.label, payload.index).await?;
    // The next request may open a fresh session, so let the write land first.
    // A failure is already logged by the writer and the change is kept locally.
    let _ = toggled.write.outcome().await;

    Ok(Json(BlockView::build(spec, &toggled.current)))
}

pub async fn get_moods() -> Json<Vec<MoodView>> {
    Json(mood_key())
}

pub async fn manifest(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "application/manifest+json")],
        Json(Manifest::for_layout(&state.layout)),
    )
        .into_response()
}

async fn resolve_session(state: &AppState, jar: &CookieJar) -> Arc<TrackerSession> {
    match current_user(state, jar) {
        Some(user) => state.session_for(&user).await,
        None => Arc::clone(&state.detached),
    }
}

fn current_user(state: &AppState, jar: &CookieJar) -> Option<UserId> {
    let cookie = jar.get(SESSION_COOKIE)?;
    state.identity.resume(cookie.value().trim_matches('"'))
}

fn remember(jar: CookieJar, user: &UserId) -> CookieJar {
    let cookie = Cookie::build((SESSION_COOKIE, user.to_string()))
        .path("/")
        .max_age(time::Duration::days(365))
        .same_site(SameSite::Lax)
        .http_only(true);
    jar.add(cookie)
}
