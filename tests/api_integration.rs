use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use serde_json::{Value, json};
use tower::ServiceExt;

use veda_explorer::AppState;
use veda_explorer::backend::{InMemoryBackend, Verse};
use veda_explorer::config::AppConfig;
use veda_explorer::reference::VerseRef;
use veda_explorer::server::{SESSION_COOKIE, router};

fn scored(location: &str, score: f64) -> Verse {
    Verse {
        location: location.to_string(),
        translation: format!("Translation of {location}"),
        similarity_score: Some(score),
        ..Verse::default()
    }
}

fn backend() -> InMemoryBackend {
    InMemoryBackend::new()
        .with_mandala(1, &[3, 2])
        .with_verse(VerseRef::new(1, 1, 1))
        .with_verse(VerseRef::new(1, 1, 2))
        .with_verse(VerseRef::new(1, 1, 3))
        .with_audio(VerseRef::new(1, 1, 1))
        .with_search_results(vec![
            scored("1.1.1", 0.91),
            scored("1.1.2", 0.88),
            scored("1.1.3", 0.86),
            scored("1.2.1", 0.84),
            scored("1.2.2", 0.82),
            scored("2.1.1", 0.40),
        ])
        .with_random_results(vec![scored("3.62.10", 0.0), scored("10.129.1", 0.0)])
}

fn app_with(backend: Arc<InMemoryBackend>) -> Router {
    let config = AppConfig::load_from_args(["veda-explorer", "--rate-limit-enabled", "false"])
        .expect("Failed to load config");
    router(AppState::new(Arc::new(config), backend))
}

fn app() -> Router {
    app_with(Arc::new(backend()))
}

async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.expect("request failed")
}

async fn get(app: Router, uri: &str) -> Response {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post_json(app: Router, uri: &str, body: Value) -> Response {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn get_with_cookie(app: Router, uri: &str, cookie: &str) -> Response {
    let request = Request::get(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

async fn post_form(app: Router, uri: &str, body: &str, cookie: Option<&str>) -> Response {
    let mut request = Request::post(uri).header(
        header::CONTENT_TYPE,
        "application/x-www-form-urlencoded",
    );
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    send(app, request.body(Body::from(body.to_string())).unwrap()).await
}

fn session_cookie(response: &Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .expect("no session cookie")
        .to_string()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).expect("response is not JSON")
}

async fn text_body(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let response = get(app(), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_themes_and_quotes() {
    let themes = json_body(get(app(), "/api/themes").await).await;
    assert_eq!(themes.as_array().unwrap().len(), 6);
    assert!(themes[0]["query"].is_string());

    // Six quotes: index 7 wraps to 1.
    let quote = json_body(get(app(), "/api/quotes?index=7").await).await;
    assert_eq!(quote["index"], 1);
    assert_eq!(quote["total"], 6);
    assert_eq!(quote["rotation_secs"], 5);
}

#[tokio::test]
async fn test_empty_search_is_rejected_without_backend_call() {
    let backend = Arc::new(backend());
    let response = post_json(
        app_with(Arc::clone(&backend)),
        "/api/search",
        json!({ "query": "   " }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "Please enter a search query" })
    );
    assert_eq!(backend.search_calls(), 0);
}

#[tokio::test]
async fn test_search_returns_session_and_sets_cookie() {
    let response = post_json(app(), "/api/search", json!({ "query": "hymns to agni" })).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with(&format!("{SESSION_COOKIE}=")));
    assert!(cookie.contains("HttpOnly"));

    let body = json_body(response).await;
    assert!(body["session_id"].is_string());
    assert_eq!(body["search"]["intent"], "semantic_search");
    assert_eq!(body["search"]["verses"][0]["location"], "1.1.1");
    assert!(body["search"]["verses"].as_array().unwrap().len() >= 5);
}

#[tokio::test]
async fn test_search_backend_error_is_reported() {
    let backend = Arc::new(backend());
    backend.fail_with("Vector index offline");

    let response = post_json(
        app_with(backend),
        "/api/search",
        json!({ "query": "dawn" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(response).await["error"], "Vector index offline");
}

#[tokio::test]
async fn test_random_search() {
    let response = get(app(), "/api/search/random").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["search"]["intent"], "random_exploration");
    assert_eq!(body["search"]["verses"][0]["confidence"], 1.0);
}

#[tokio::test]
async fn test_mandala_index_is_cached() {
    let backend = Arc::new(backend());
    let app = app_with(Arc::clone(&backend));

    let first = get(app.clone(), "/api/explorer/index/1").await;
    assert_eq!(first.status(), StatusCode::OK);
    let index = json_body(first).await;
    assert_eq!(index["total_hymns"], 2);

    let second = get(app, "/api/explorer/index/1").await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(backend.index_calls(), 1);
}

#[tokio::test]
async fn test_invalid_mandala_is_bad_request() {
    let response = get(app(), "/api/explorer/index/11").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "Mandala must be between 1-10"
    );
}

#[tokio::test]
async fn test_verse_lookup() {
    let response = get(app(), "/api/explorer/verse/1/1/2").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["verse"]["translation"], "Translation of 1.1.2");

    let missing = get(app(), "/api/explorer/verse/1/2/9").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(missing).await["error"], "Failed to fetch");
}

#[tokio::test]
async fn test_quick_lookup_validates_format() {
    let response = post_json(
        app(),
        "/api/explorer/quick",
        json!({ "reference": "1.10" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "Invalid format. Use: Mandala.Sukta.Mantra (e.g., 1.10.129)"
    );

    let ok = post_json(
        app(),
        "/api/explorer/quick",
        json!({ "reference": " 1.1.3 " }),
    )
    .await;
    assert_eq!(ok.status(), StatusCode::OK);
    assert_eq!(json_body(ok).await["verse"]["location"], "1.1.3");
}

#[tokio::test]
async fn test_step_within_sukta() {
    let next = get(
        app(),
        "/api/explorer/step?mandala=1&hymn=1&stanza=1&direction=next",
    )
    .await;
    assert_eq!(next.status(), StatusCode::OK);
    assert_eq!(json_body(next).await["verse"]["location"], "1.1.2");

    let past_end = get(
        app(),
        "/api/explorer/step?mandala=1&hymn=1&stanza=3&direction=next",
    )
    .await;
    assert_eq!(past_end.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(past_end).await["error"],
        "This is the last mantra in this sukta"
    );

    let before_start = get(
        app(),
        "/api/explorer/step?mandala=1&hymn=1&stanza=1&direction=prev",
    )
    .await;
    assert_eq!(before_start.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(before_start).await["error"],
        "This is the first mantra in this sukta"
    );

    let unknown = get(
        app(),
        "/api/explorer/step?mandala=1&hymn=9&stanza=1&direction=next",
    )
    .await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_chat_turn_and_transcript() {
    let app = app();

    let empty = post_json(app.clone(), "/api/chat", json!({ "message": "  " })).await;
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(empty).await["error"],
        "Please enter a message"
    );

    let response = post_json(app.clone(), "/api/chat", json!({ "message": "Who is Agni?" })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let session_id = body["session_id"].as_str().unwrap().to_string();
    assert_eq!(body["reply"]["answer"]["summary"], "You asked: Who is Agni?");

    let transcript = get(app, &format!("/api/sessions/{session_id}/messages")).await;
    assert_eq!(transcript.status(), StatusCode::OK);
    let messages = json_body(transcript).await;
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["text"], "Who is Agni?");
    assert_eq!(messages[1]["role"], "assistant");
}

#[tokio::test]
async fn test_unknown_session_transcript() {
    let response = get(app(), "/api/sessions/nope/messages").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "Session not found");
}

#[tokio::test]
async fn test_audio_toggle_and_finished() {
    let backend = Arc::new(backend());
    let app = app_with(Arc::clone(&backend));

    let played = post_json(
        app.clone(),
        "/api/audio/toggle",
        json!({ "location": "1.1.1" }),
    )
    .await;
    assert_eq!(played.status(), StatusCode::OK);
    let body = json_body(played).await;
    assert_eq!(body["state"], "playing");
    let session_id = body["session_id"].as_str().unwrap().to_string();

    let paused = post_json(
        app.clone(),
        "/api/audio/toggle",
        json!({ "location": "1.1.1", "session_id": session_id }),
    )
    .await;
    assert_eq!(json_body(paused).await["state"], "paused");
    assert_eq!(backend.audio_calls(), 1);

    post_json(
        app.clone(),
        "/api/audio/toggle",
        json!({ "location": "1.1.1", "session_id": session_id }),
    )
    .await;
    let finished = post_json(
        app,
        "/api/audio/finished",
        json!({ "location": "1.1.1", "session_id": session_id }),
    )
    .await;
    assert_eq!(json_body(finished).await["playing"], Value::Null);
}

#[tokio::test]
async fn test_audio_unavailable() {
    let response = post_json(
        app(),
        "/api/audio/toggle",
        json!({ "location": "1.1.2" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(response).await["error"],
        "Failed to load audio for 1.1.2"
    );

    let stream = get(app(), "/api/audio/1/1/2").await;
    assert_eq!(stream.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(stream).await["error"],
        "Audio not available for 1.1.2"
    );
}

#[tokio::test]
async fn test_audio_stream() {
    let response = get(app(), "/api/audio/1/1/1").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "audio/mpeg"
    );
    assert_eq!(text_body(response).await, "ID3 1.1.1");
}

#[tokio::test]
async fn test_pages_render() {
    for (uri, heading) in [
        ("/", "<h1>"),
        ("/search", "Semantic Search"),
        ("/chat", "Sacred Wisdom Guide"),
        ("/explorer", "Veda Explorer"),
        ("/credits", "Credits &amp; Acknowledgments"),
        ("/privacy", "Privacy Policy"),
    ] {
        let response = get(app(), uri).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert!(text_body(response).await.contains(heading), "{uri}");
    }
}

#[tokio::test]
async fn test_explorer_page_shows_boundary_error_with_current_verse() {
    let response = get(
        app(),
        "/explorer?mandala=1&hymn=1&stanza=3&step=next",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = text_body(response).await;
    assert!(html.contains("This is the last mantra in this sukta"));
    assert!(html.contains("Translation of 1.1.3"));
}

#[tokio::test]
async fn test_search_page_reuses_session_cookie() {
    let app = app();
    let first = get(app.clone(), "/search?q=agni").await;
    let cookie = first
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .unwrap()
        .to_string();

    let second = send(
        app,
        Request::get("/search")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert!(second.headers().get(header::SET_COOKIE).is_none());
    let html = text_body(second).await;
    assert!(html.contains("Translation of 1.1.1"));
    assert!(html.contains("agni"));
}

#[tokio::test]
async fn test_unknown_route_renders_not_found_page() {
    let response = get(app(), "/no/such/page").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(text_body(response).await.contains("404"));
}

#[tokio::test]
async fn test_malformed_requests_get_json_errors() {
    let step = get(
        app(),
        "/api/explorer/step?mandala=1&hymn=1&stanza=x&direction=next",
    )
    .await;
    assert_eq!(step.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(step).await["error"].is_string());

    let verse = get(app(), "/api/explorer/verse/1/1/abc").await;
    assert_eq!(verse.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(verse).await["error"].is_string());

    let request = Request::post("/api/search")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let search = send(app(), request).await;
    assert!(search.status().is_client_error());
    assert!(json_body(search).await["error"].is_string());

    let request = Request::post("/api/chat")
        .body(Body::from(r#"{"message":"hi"}"#))
        .unwrap();
    let chat = send(app(), request).await;
    assert_eq!(chat.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(json_body(chat).await["error"].is_string());
}

#[tokio::test]
async fn test_chat_http_failure_is_generic() {
    let backend = Arc::new(backend());
    backend.fail_with_status(500, "Traceback (most recent call last)");

    let response = post_json(
        app_with(backend),
        "/api/chat",
        json!({ "message": "Who is Agni?" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        json_body(response).await["error"],
        "Failed to get response from chat API. Please try again."
    );
}

#[tokio::test]
async fn test_unknown_session_id_is_not_adopted() {
    let app = app();
    let guessed = "6f1c1d36-3c7e-4bb4-9a59-2b1f0f6b8a11";

    let response = post_json(
        app.clone(),
        "/api/chat",
        json!({ "message": "Who is Agni?", "session_id": guessed }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_some());
    let body = json_body(response).await;
    assert_ne!(body["session_id"], guessed);

    let transcript = get(app, &format!("/api/sessions/{guessed}/messages")).await;
    assert_eq!(transcript.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_session_id_falls_back_to_cookie() {
    let app = app();
    let first = post_json(app.clone(), "/api/chat", json!({ "message": "first" })).await;
    let cookie = session_cookie(&first);
    let session_id = json_body(first).await["session_id"]
        .as_str()
        .unwrap()
        .to_string();

    let request = Request::post("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, cookie)
        .body(Body::from(
            json!({ "message": "second", "session_id": "not-issued" }).to_string(),
        ))
        .unwrap();
    let second = send(app.clone(), request).await;
    assert!(second.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(json_body(second).await["session_id"], session_id.as_str());

    let transcript = get(app, &format!("/api/sessions/{session_id}/messages")).await;
    assert_eq!(json_body(transcript).await.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_explorer_fetch_requires_every_field() {
    let response = get(app(), "/explorer?mandala=1&hymn=1&fetch=1").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = text_body(response).await;
    assert!(html.contains("Please fill all fields"));
    assert!(html.contains("Mantra (3 stanzas)"));
}

#[tokio::test]
async fn test_explorer_unknown_hymn_is_reported() {
    let response = get(app(), "/explorer?mandala=1&hymn=9").await;
    let html = text_body(response).await;
    assert!(html.contains("Sukta 9 not found in Mandala 1"));
}

#[tokio::test]
async fn test_search_page_shares_one_player() {
    let backend = Arc::new(backend().with_audio(VerseRef::new(1, 1, 2)));
    let app = app_with(Arc::clone(&backend));

    let page = get(app.clone(), "/search?q=agni").await;
    let cookie = session_cookie(&page);
    let html = text_body(page).await;
    assert_eq!(html.matches("<audio").count(), 0);
    assert_eq!(html.matches(r#"id="player""#).count(), 1);
    assert!(html.contains(r#"id="play-1-1-1""#));
    assert!(html.contains(r#"id="play-1-1-2""#));

    let first = post_form(app.clone(), "/audio/toggle", "location=1.1.1", Some(cookie.as_str())).await;
    assert_eq!(first.status(), StatusCode::OK);
    let html = text_body(first).await;
    assert_eq!(html.matches("<audio").count(), 1);
    assert!(html.contains(r#"src="/api/audio/1/1/1""#));
    assert!(html.contains(
        r#"id="play-1-1-1" class="button play active" hx-swap-oob="true""#
    ));

    let second = post_form(app.clone(), "/audio/toggle", "location=1.1.2", Some(cookie.as_str())).await;
    let html = text_body(second).await;
    assert_eq!(html.matches("<audio").count(), 1);
    assert!(html.contains(r#"src="/api/audio/1/1/2""#));
    assert!(!html.contains("/api/audio/1/1/1"));
    assert!(html.contains(r#"id="play-1-1-1" class="button play" hx-swap-oob="true""#));
    assert!(html.contains(
        r#"id="play-1-1-2" class="button play active" hx-swap-oob="true""#
    ));

    let finished = post_form(app.clone(), "/audio/finished", "location=1.1.2", Some(cookie.as_str())).await;
    let html = text_body(finished).await;
    assert!(!html.contains("<audio"));
    assert!(html.contains(r#"id="play-1-1-2" class="button play" hx-swap-oob="true""#));
    assert_eq!(backend.audio_calls(), 2);
}

#[tokio::test]
async fn test_page_load_stops_playback() {
    let app = app();
    let page = get(app.clone(), "/search").await;
    let cookie = session_cookie(&page);

    let played = post_form(app.clone(), "/audio/toggle", "location=1.1.1", Some(cookie.as_str())).await;
    assert!(text_body(played).await.contains("Now playing Rig Veda 1.1.1"));

    get_with_cookie(app.clone(), "/chat", &cookie).await;

    // Nothing is playing, so the next toggle starts 1.1.1 again.
    let again = post_form(app, "/audio/toggle", "location=1.1.1", Some(cookie.as_str())).await;
    assert!(text_body(again).await.contains("Now playing Rig Veda 1.1.1"));
}

#[tokio::test]
async fn test_audio_toggle_failure_renders_in_player() {
    let response = post_form(app(), "/audio/toggle", "location=1.1.3", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = text_body(response).await;
    assert!(html.contains("Failed to load audio for 1.1.3"));
    assert!(html.contains(r#"id="play-1-1-3" class="button play" hx-swap-oob="true""#));
}
