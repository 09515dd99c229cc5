use std::sync::Arc;
use std::time::Duration;

use axum::{
    Form, Json, Router,
    extract::{
        DefaultBodyLimit, Path, Query, Request, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Deserializer, Serialize};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::audio::{PlaybackState, ToggleOutcome};
use crate::backend::{ChatIntentResponse, HttpBackend, MandalaIndex};
use crate::config::AppConfig;
use crate::content::{self, QUOTE_ROTATION, Quote, THEMES, Theme};
use crate::error::AppError;
use crate::explorer::{Direction, LocatedVerse, current_step};
use crate::reference::VerseRef;
use crate::search::{RANDOM_INTENT, SearchSession};
use crate::security::rate_limit_middleware;
use crate::session::Session;
use crate::ui::{self, pages};

/// Cookie carrying the visitor's session id.
pub const SESSION_COOKIE: &str = "veda_session";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const BODY_LIMIT: usize = 1024 * 1024;
const SWEEP_PERIOD: Duration = Duration::from_secs(60);

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let backend = HttpBackend::with_timeout(
        &config.backend.api_base,
        config.backend.api_key.clone(),
        config.backend.timeout(),
    )?;

    info!(
        name: "backend.config.loaded",
        base_url = %backend.base_url(),
        api_key_set = config.backend.api_key.is_some(),
        polarity = ?config.search.score_polarity,
        "Backend configuration loaded"
    );

    let state = AppState::new(Arc::clone(&config), Arc::new(backend));
    state.sessions.spawn_sweeper(SWEEP_PERIOD);

    let limiter = Arc::clone(&state.rate_limiter);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_PERIOD);
        loop {
            ticker.tick().await;
            limiter.prune();
        }
    });

    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    // A very long timeout stands in for "disabled" so the layer stack keeps one type.
    let timeout_duration = if state.config.resilience.timeout_disabled {
        Duration::from_secs(365 * 24 * 60 * 60)
    } else {
        REQUEST_TIMEOUT
    };

    Router::new()
        // HTML pages
        .route("/", get(home_page))
        .route("/search", get(search_page))
        .route("/chat", get(chat_page).post(chat_submit))
        .route("/explorer", get(explorer_page))
        .route("/credits", get(credits_page))
        .route("/privacy", get(privacy_page))
        .route("/partials/quote", get(quote_partial))
        .route("/audio/toggle", post(audio_toggle))
        .route("/audio/finished", post(audio_finished))
        // JSON API
        .route("/api/search", post(api_search))
        .route("/api/search/random", get(api_random))
        .route("/api/themes", get(api_themes))
        .route("/api/quotes", get(api_quote))
        .route("/api/explorer/index/{mandala}", get(api_mandala_index))
        .route("/api/explorer/verse/{mandala}/{hymn}/{stanza}", get(api_verse))
        .route("/api/explorer/quick", post(api_quick_lookup))
        .route("/api/explorer/step", get(api_step))
        .route("/api/chat", post(api_chat))
        .route("/api/sessions/{id}/messages", get(api_get_messages))
        .route("/api/audio/toggle", post(api_audio_toggle))
        .route("/api/audio/finished", post(api_audio_finished))
        .route("/api/audio/{mandala}/{hymn}/{stanza}", get(api_audio_stream))
        .route("/health", get(health))
        // Static assets
        .nest_service("/static", ServeDir::new("static"))
        .fallback(not_found_page)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| async move {
                match tokio::time::timeout(timeout_duration, next.run(req)).await {
                    Ok(res) => res,
                    Err(_elapsed) => {
                        AppError::new(StatusCode::REQUEST_TIMEOUT, "Request timed out")
                            .into_response()
                    }
                }
            },
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────────────────────────────────────

/// The caller's session, plus a cookie to set when it was just created.
struct Visitor {
    session: Session,
    set_cookie: Option<HeaderValue>,
}

fn cookie_session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
}

/// Resolve the session from an explicit id, then the cookie; otherwise start
/// a new one. Ids the store did not issue (or has expired) are ignored.
fn visitor(state: &AppState, explicit: Option<&str>, headers: &HeaderMap) -> Visitor {
    let known = explicit
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .and_then(|id| state.sessions.get(id))
        .or_else(|| cookie_session_id(headers).and_then(|id| state.sessions.get(&id)));

    if let Some(session) = known {
        session.touch();
        return Visitor {
            session,
            set_cookie: None,
        };
    }

    let session = state.sessions.create();
    info!(name: "session.created", session_id = %session.id(), "Session created");
    let cookie = format!(
        "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        session.id(),
        crate::session::DEFAULT_SESSION_TIMEOUT.as_secs()
    );
    Visitor {
        session,
        set_cookie: HeaderValue::from_str(&cookie).ok(),
    }
}

fn with_cookie(response: impl IntoResponse, visitor: &Visitor) -> Response {
    let mut response = response.into_response();
    if let Some(cookie) = &visitor.set_cookie {
        response
            .headers_mut()
            .insert(header::SET_COOKIE, cookie.clone());
    }
    response
}

/// A full page load replaces the player, so nothing keeps playing.
async fn reset_playback(visitor: &Visitor) {
    visitor.session.playback().await.stop_all();
}

fn page(title: &str, content: &str) -> Html<String> {
    Html(ui::html_shell(title, content))
}

/// Query values from HTML forms arrive as empty strings when unset.
fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.trim().parse().ok()))
}

// ─────────────────────────────────────────────────────────────────────────────
// HTML Page Handlers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct QuoteQuery {
    #[serde(default)]
    index: usize,
}

async fn home_page() -> impl IntoResponse {
    page("Home", &pages::home(0))
}

async fn quote_partial(Query(q): Query<QuoteQuery>) -> impl IntoResponse {
    Html(pages::quote_fragment(q.index))
}

#[derive(Debug, Deserialize)]
struct SearchPageQuery {
    #[serde(default)]
    q: Option<String>,
    #[serde(default)]
    random: Option<String>,
}

/// GET /search - search form, `?q=` runs a search, `?random=1` surprises.
async fn search_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<SearchPageQuery>,
) -> Response {
    let visitor = visitor(&state, None, &headers);
    reset_playback(&visitor).await;
    let query = q.q.unwrap_or_default();
    let random = q.random.is_some_and(|r| !r.is_empty() && r != "0");

    let outcome = if random {
        Some(state.search.surprise_me().await)
    } else if query.is_empty() {
        None
    } else {
        Some(state.search.search(&query).await)
    };

    let (results, error) = match outcome {
        Some(Ok(session)) => {
            visitor.session.set_search(session.clone());
            (Some(session), None)
        }
        Some(Err(e)) => (None, Some(e.to_string())),
        None => (visitor.session.last_search(), None),
    };

    // A random draw has no query to put back in the box.
    let shown_query = if query.is_empty() {
        results
            .as_ref()
            .filter(|s| s.intent != RANDOM_INTENT)
            .map(|s| s.query.clone())
            .unwrap_or_default()
    } else {
        query.clone()
    };
    let body = pages::search(&shown_query, results.as_ref(), error.as_deref());
    with_cookie(page("Search", &body), &visitor)
}

async fn chat_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let visitor = visitor(&state, None, &headers);
    reset_playback(&visitor).await;
    let body = pages::chat(&visitor.session.chat_messages(), None);
    with_cookie(page("Sacred Guide", &body), &visitor)
}

#[derive(Debug, Deserialize)]
struct ChatForm {
    #[serde(default)]
    message: String,
}

/// POST /chat - form submission; re-renders the transcript.
async fn chat_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ChatForm>,
) -> Response {
    let visitor = visitor(&state, None, &headers);
    reset_playback(&visitor).await;
    let error = state
        .chat
        .send(&visitor.session, &form.message)
        .await
        .err()
        .map(|e| e.to_string());
    let body = pages::chat(&visitor.session.chat_messages(), error.as_deref());
    with_cookie(page("Sacred Guide", &body), &visitor)
}

#[derive(Debug, Default, Deserialize)]
struct ExplorerQuery {
    #[serde(default, deserialize_with = "lenient_u32")]
    mandala: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    hymn: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    stanza: Option<u32>,
    #[serde(default, rename = "ref")]
    reference: Option<String>,
    #[serde(default)]
    step: Option<String>,
    #[serde(default)]
    hymn_filter: Option<String>,
    #[serde(default)]
    stanza_filter: Option<String>,
    #[serde(default)]
    fetch: Option<String>,
}

/// GET /explorer - the four-step wizard, shorthand lookup and prev/next.
async fn explorer_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<ExplorerQuery>,
) -> Response {
    let visitor = visitor(&state, None, &headers);
    reset_playback(&visitor).await;
    let nav = &state.navigator;
    let (mut mandala, mut hymn, mut stanza) = (q.mandala, q.hymn, q.stanza);
    let quick = q.reference.clone().unwrap_or_default();
    let mut error: Option<String> = None;
    let mut verse: Option<LocatedVerse> = None;

    if !quick.trim().is_empty() {
        match nav.quick_lookup(&quick).await {
            Ok(found) => verse = Some(found),
            Err(e) => error = Some(e.to_string()),
        }
    } else if let (Some(step), Some(m), Some(h), Some(s)) = (q.step.as_deref(), mandala, hymn, stanza)
    {
        let current = VerseRef::new(m, h, s);
        let stepped = match step.parse::<Direction>() {
            Ok(direction) => nav.step(current, direction).await,
            Err(e) => Err(e),
        };
        match stepped {
            Ok(found) => verse = Some(found),
            Err(e) => {
                error = Some(e.to_string());
                // Keep showing the verse the visitor was on.
                verse = nav.lookup(current).await.ok();
            }
        }
    } else if q.fetch.is_some() || (mandala.is_some() && hymn.is_some() && stanza.is_some()) {
        match nav.lookup_selection(mandala, hymn, stanza).await {
            Ok(found) => verse = Some(found),
            Err(e) => error = Some(e.to_string()),
        }
    }

    if let Some(found) = &verse {
        mandala = Some(found.reference.mandala);
        hymn = Some(found.reference.hymn);
        stanza = Some(found.reference.stanza);
    }

    let index: Option<MandalaIndex> = match mandala {
        Some(m) => match nav.select_mandala(m).await {
            Ok(index) => Some(index),
            Err(e) => {
                error.get_or_insert_with(|| e.to_string());
                None
            }
        },
        None => None,
    };
    let stanza_count = match (index.as_ref(), mandala, hymn) {
        (Some(_), Some(m), Some(h)) => match nav.mantra_range(m, h).await {
            Ok(range) => Some(*range.end()),
            Err(e) => {
                error.get_or_insert_with(|| e.to_string());
                None
            }
        },
        _ => None,
    };

    let view = pages::ExplorerView {
        mandala,
        hymn,
        stanza,
        index: index.as_ref(),
        stanza_count,
        hymn_filter: q.hymn_filter.as_deref().unwrap_or_default(),
        stanza_filter: q.stanza_filter.as_deref().unwrap_or_default(),
        quick: &quick,
        verse: verse.as_ref(),
        step: current_step(mandala, hymn, stanza),
        error: error.as_deref(),
    };
    with_cookie(page("Explorer", &pages::explorer(&view)), &visitor)
}

#[derive(Debug, Deserialize)]
struct AudioForm {
    #[serde(default)]
    location: String,
}

/// POST /audio/toggle - swap in the player and restyle the affected buttons.
async fn audio_toggle(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<AudioForm>,
) -> Response {
    let visitor = visitor(&state, None, &headers);
    let target = VerseRef::from_location(&form.location);

    let mut playback = visitor.session.playback().await;
    let previous = playback.playing();
    let outcome = playback
        .toggle(&form.location, state.audio_loader.as_ref())
        .await;
    let now = playback.playing();
    drop(playback);

    let mut html = match &outcome {
        Ok(toggled) => {
            info!(
                name: "audio.toggled",
                session_id = %visitor.session.id(),
                location = %form.location,
                state = ?toggled,
                "Audio toggled"
            );
            ui::player(now)
        }
        Err(e) => ui::player_error(&e.to_string()),
    };
    if let Some(prev) = previous.filter(|p| Some(*p) != target) {
        html.push_str(&ui::play_button_oob(prev, PlaybackState::Paused));
    }
    if let Some(verse) = target {
        let shown = if now == Some(verse) {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        };
        html.push_str(&ui::play_button_oob(verse, shown));
    }
    with_cookie(Html(html), &visitor)
}

/// POST /audio/finished - the page player reached the end of its clip.
async fn audio_finished(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<AudioForm>,
) -> Response {
    let visitor = visitor(&state, None, &headers);
    let mut playback = visitor.session.playback().await;
    playback.finished(&form.location);
    let now = playback.playing();
    drop(playback);

    let mut html = ui::player(now);
    if let Some(verse) = VerseRef::from_location(&form.location) {
        html.push_str(&ui::play_button_oob(verse, PlaybackState::Paused));
    }
    with_cookie(Html(html), &visitor)
}

async fn credits_page() -> impl IntoResponse {
    page("Credits", &pages::credits())
}

async fn privacy_page() -> impl IntoResponse {
    page("Privacy Policy", &pages::privacy())
}

async fn not_found_page() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, page("Not Found", pages::not_found()))
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Request body for search API.
#[derive(Debug, Deserialize)]
struct SearchRequest {
    #[serde(default)]
    query: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct SearchReply {
    session_id: String,
    search: SearchSession,
}

/// POST /api/search - filtered semantic search.
async fn api_search(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload?;
    let visitor = visitor(&state, req.session_id.as_deref(), &headers);
    let search = state.search.search(&req.query).await?;
    // Concurrent searches race; whichever finishes last is kept.
    visitor.session.set_search(search.clone());
    let reply = SearchReply {
        session_id: visitor.session.id().to_string(),
        search,
    };
    Ok(with_cookie(Json(reply), &visitor))
}

/// GET /api/search/random - "Surprise Me".
async fn api_random(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<SessionQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(q) = query?;
    let visitor = visitor(&state, q.session_id.as_deref(), &headers);
    let search = state.search.surprise_me().await?;
    visitor.session.set_search(search.clone());
    let reply = SearchReply {
        session_id: visitor.session.id().to_string(),
        search,
    };
    Ok(with_cookie(Json(reply), &visitor))
}

async fn api_themes() -> Json<&'static [Theme]> {
    Json(&THEMES)
}

#[derive(Debug, Serialize)]
struct QuoteReply {
    index: usize,
    total: usize,
    rotation_secs: u64,
    quote: &'static Quote,
}

/// GET /api/quotes?index= - carousel slide, wrapping around.
async fn api_quote(
    query: Result<Query<QuoteQuery>, QueryRejection>,
) -> Result<Json<QuoteReply>, AppError> {
    let Query(q) = query?;
    let (index, quote) = content::quote_at(q.index);
    Ok(Json(QuoteReply {
        index,
        total: content::QUOTES.len(),
        rotation_secs: QUOTE_ROTATION.as_secs(),
        quote,
    }))
}

/// GET /api/explorer/index/{mandala} - hymn index (cached).
async fn api_mandala_index(
    State(state): State<AppState>,
    path: Result<Path<u32>, PathRejection>,
) -> Result<Json<MandalaIndex>, AppError> {
    let Path(mandala) = path?;
    Ok(Json(state.navigator.select_mandala(mandala).await?))
}

/// GET /api/explorer/verse/{m}/{h}/{s}
async fn api_verse(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<(u32, u32, u32)>, PathRejection>,
) -> Result<Json<LocatedVerse>, AppError> {
    let Path((mandala, hymn, stanza)) = path?;
    let found = state
        .navigator
        .lookup(VerseRef::new(mandala, hymn, stanza))
        .await?;
    stop_playback(&state, &headers).await;
    Ok(Json(found))
}

#[derive(Debug, Deserialize)]
struct QuickRequest {
    #[serde(default)]
    reference: String,
}

/// POST /api/explorer/quick - `M.H.S` shorthand lookup.
async fn api_quick_lookup(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<QuickRequest>, JsonRejection>,
) -> Result<Json<LocatedVerse>, AppError> {
    let Json(req) = payload?;
    let found = state.navigator.quick_lookup(&req.reference).await?;
    stop_playback(&state, &headers).await;
    Ok(Json(found))
}

#[derive(Debug, Deserialize)]
struct StepQuery {
    mandala: u32,
    hymn: u32,
    stanza: u32,
    direction: String,
}

/// GET /api/explorer/step - neighbouring mantra within the sukta.
async fn api_step(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<StepQuery>, QueryRejection>,
) -> Result<Json<LocatedVerse>, AppError> {
    let Query(q) = query?;
    let direction: Direction = q.direction.parse()?;
    let found = state
        .navigator
        .step(VerseRef::new(q.mandala, q.hymn, q.stanza), direction)
        .await?;
    stop_playback(&state, &headers).await;
    Ok(Json(found))
}

/// A fresh verse silences whatever the visitor was listening to.
async fn stop_playback(state: &AppState, headers: &HeaderMap) {
    if let Some(session) = cookie_session_id(headers).and_then(|id| state.sessions.get(&id)) {
        session.playback().await.stop_all();
    }
}

/// Request body for chat API.
#[derive(Debug, Deserialize)]
struct ChatRequest {
    /// User message content.
    #[serde(default)]
    message: String,
    /// Optional session ID (creates new if not provided).
    #[serde(default)]
    session_id: Option<String>,
}

/// Response from chat API.
#[derive(Debug, Serialize)]
struct ChatResponse {
    session_id: String,
    reply: ChatIntentResponse,
}

/// POST /api/chat - one chat turn.
async fn api_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload?;
    let visitor = visitor(&state, req.session_id.as_deref(), &headers);
    tracing::info!(
        session_id = %visitor.session.id(),
        chars = req.message.len(),
        "Received chat request"
    );
    let reply = state.chat.send(&visitor.session, &req.message).await?;
    let body = ChatResponse {
        session_id: visitor.session.id().to_string(),
        reply,
    };
    Ok(with_cookie(Json(body), &visitor))
}

/// GET /api/sessions/{id}/messages - chat transcript.
async fn api_get_messages(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Vec<crate::chat::ChatMessage>>, AppError> {
    let Path(id) = path?;
    state
        .sessions
        .get(&id)
        .map(|session| Json(session.chat_messages()))
        .ok_or_else(|| AppError::not_found("Session not found"))
}

#[derive(Debug, Deserialize)]
struct AudioRequest {
    location: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct AudioToggleReply {
    session_id: String,
    location: String,
    state: ToggleOutcome,
}

#[derive(Debug, Serialize)]
struct AudioStatusReply {
    session_id: String,
    playing: Option<String>,
}

/// POST /api/audio/toggle - play or pause a verse recitation.
async fn api_audio_toggle(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<AudioRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload?;
    let visitor = visitor(&state, req.session_id.as_deref(), &headers);
    let outcome = visitor
        .session
        .playback()
        .await
        .toggle(&req.location, state.audio_loader.as_ref())
        .await?;
    info!(
        name: "audio.toggled",
        session_id = %visitor.session.id(),
        location = %req.location,
        state = ?outcome,
        "Audio toggled"
    );
    let reply = AudioToggleReply {
        session_id: visitor.session.id().to_string(),
        location: req.location,
        state: outcome,
    };
    Ok(with_cookie(Json(reply), &visitor))
}

/// POST /api/audio/finished - the clip ran to its end.
async fn api_audio_finished(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<AudioRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload?;
    let visitor = visitor(&state, req.session_id.as_deref(), &headers);
    let mut playback = visitor.session.playback().await;
    playback.finished(&req.location);
    let reply = AudioStatusReply {
        session_id: visitor.session.id().to_string(),
        playing: playback.playing().map(|v| v.to_string()),
    };
    drop(playback);
    Ok(with_cookie(Json(reply), &visitor))
}

/// GET /api/audio/{m}/{h}/{s} - recitation bytes, from the visitor's
/// registry when already loaded.
async fn api_audio_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<(u32, u32, u32)>, PathRejection>,
) -> Result<Response, AppError> {
    let Path((mandala, hymn, stanza)) = path?;
    let verse = VerseRef::new(mandala, hymn, stanza);

    let cached = match cookie_session_id(&headers).and_then(|id| state.sessions.get(&id)) {
        Some(session) => {
            let playback = session.playback().await;
            playback.handle(verse).map(|h| h.clip.clone())
        }
        None => None,
    };

    let clip = match cached {
        Some(clip) => clip,
        None => state.backend.audio(verse).await.map_err(|e| {
            tracing::warn!(verse = %verse, error = %e, "Audio fetch failed");
            AppError::new(
                StatusCode::NOT_FOUND,
                format!("Audio not available for {verse}"),
            )
        })?,
    };

    let content_type = HeaderValue::from_str(&clip.content_type)
        .unwrap_or_else(|_invalid| HeaderValue::from_static("audio/mpeg"));
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, HeaderValue::from_static("public, max-age=86400")),
        ],
        clip.data,
    )
        .into_response())
}
