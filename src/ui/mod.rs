//! Server-rendered HTML.
//!
//! Pages are plain `format!` templates inside one shell; HTMX boosts the
//! navigation links and refreshes the quote carousel.
//!
//! - [`pages`]: one function per page
//! - [`escape`] / [`encode_query`]: output encoding helpers

pub mod pages;

use std::fmt::Write as _;

use crate::audio::PlaybackState;
use crate::backend::Verse;
use crate::reference::VerseRef;

/// Escape text for HTML bodies and quoted attributes.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Percent-encode a query string value.
pub fn encode_query(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Generate the HTML shell for the application.
pub fn html_shell(title: &str, content: &str) -> String {
    let title = escape(title);
    let player = player(None);
    format!(r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="Search, read and listen to the hymns of the Rig Veda">
    <title>{title} - Rig Veda Explorer</title>
    <script src="https://unpkg.com/htmx.org@2.0.8"></script>
    <link rel="stylesheet" href="/static/app.css">
</head>
<body>
    <header class="site">
        <a href="/" class="brand">🪷 Rig Veda Explorer</a>
        <nav hx-boost="true">
            <a href="/search">Search</a>
            <a href="/chat">Sacred Guide</a>
            <a href="/explorer">Explorer</a>
        </nav>
    </header>

    <main id="app">
        {player}
        {content}
    </main>

    <footer class="site">
        <span>Texts from VedaWeb. Recitations from the rv-audio archive.</span>
        <nav hx-boost="true">
            <a href="/credits">Credits</a>
            <a href="/privacy">Privacy</a>
        </nav>
    </footer>
</body>
</html>"#)
}

/// Percentage label for a confidence in `[0, 1]`.
pub fn confidence_label(confidence: f64) -> String {
    format!("{:.0}% match", (confidence * 100.0).clamp(0.0, 100.0))
}

// ─────────────────────────────────────────────────────────────────────────────
// Recitation
// ─────────────────────────────────────────────────────────────────────────────

fn play_button_html(verse: VerseRef, state: PlaybackState, oob: bool) -> String {
    let (class, label) = match state {
        PlaybackState::Playing => ("button play active", "⏸ Pause"),
        PlaybackState::Paused => ("button play", "▶ Play"),
    };
    let oob = if oob { r#" hx-swap-oob="true""# } else { "" };
    format!(
        r##"<button type="button" id="play-{m}-{h}-{s}" class="{class}"{oob} hx-post="/audio/toggle" hx-vals='{{"location":"{verse}"}}' hx-target="#player" hx-swap="outerHTML">{label}</button>"##,
        m = verse.mandala,
        h = verse.hymn,
        s = verse.stanza,
    )
}

/// Play/pause control for one verse. Toggling swaps the page's player.
pub fn play_button(verse: VerseRef, state: PlaybackState) -> String {
    play_button_html(verse, state, false)
}

/// Out-of-band copy of [`play_button`], swapped in place by HTMX.
pub fn play_button_oob(verse: VerseRef, state: PlaybackState) -> String {
    play_button_html(verse, state, true)
}

/// The single page-wide player; idle when `now` is `None`.
///
/// Every toggle replaces it, so at most one recitation is audible.
pub fn player(now: Option<VerseRef>) -> String {
    match now {
        Some(verse) => format!(
            r##"<div id="player" class="player" aria-live="polite">
    <span class="meta">Now playing Rig Veda {verse}</span>
    <audio autoplay controls src="/api/audio/{m}/{h}/{s}" hx-post="/audio/finished" hx-trigger="ended" hx-vals='{{"location":"{verse}"}}' hx-target="#player" hx-swap="outerHTML"></audio>
</div>"##,
            m = verse.mandala,
            h = verse.hymn,
            s = verse.stanza,
        ),
        None => r#"<div id="player" class="player" aria-live="polite"></div>"#.to_string(),
    }
}

/// Idle player carrying a load failure.
pub fn player_error(message: &str) -> String {
    format!(
        r#"<div id="player" class="player" aria-live="polite"><p class="error" role="alert">{}</p></div>"#,
        escape(message)
    )
}

/// One verse with its translations and play control.
pub fn verse_card(verse: &Verse) -> String {
    let mut html = String::from(r#"<article class="card verse">"#);

    let _ = write!(
        html,
        r#"<div class="meta">Rig Veda {}"#,
        escape(&verse.location)
    );
    if let Some(confidence) = verse.confidence {
        let _ = write!(
            html,
            r#" <span class="badge">{}</span>"#,
            confidence_label(confidence)
        );
    }
    html.push_str("</div>");

    if !verse.sanskrit.is_empty() {
        let _ = write!(html, r#"<p class="sanskrit">{}</p>"#, escape(&verse.sanskrit));
    }
    if !verse.transliteration.is_empty() {
        let _ = write!(html, "<p><em>{}</em></p>", escape(&verse.transliteration));
    }
    if !verse.translation.is_empty() {
        let _ = write!(html, "<p>{}</p>", escape(&verse.translation));
    }

    let alternatives: Vec<_> = verse.alternative_translations().collect();
    if !alternatives.is_empty() {
        html.push_str("<details><summary>Other translations</summary>");
        for (name, text) in alternatives {
            let _ = write!(
                html,
                r#"<p><span class="meta">{}</span><br>{}</p>"#,
                escape(name),
                escape(text)
            );
        }
        html.push_str("</details>");
    }

    if !verse.padas.is_empty() {
        html.push_str(r#"<details><summary>Word by word</summary><ul>"#);
        for pada in &verse.padas {
            let _ = write!(
                html,
                "<li><strong>{}</strong> ({})</li>",
                escape(&pada.form),
                escape(&pada.lemma)
            );
        }
        html.push_str("</ul></details>");
    }

    match VerseRef::from_location(&verse.location) {
        Some(r) => html.push_str(&play_button(r, PlaybackState::Paused)),
        None => {
            let _ = write!(
                html,
                r#"<p class="meta">Audio not available for {}</p>"#,
                escape(&verse.location)
            );
        }
    }

    html.push_str("</article>");
    html
}
