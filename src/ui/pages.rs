//! Page bodies, rendered into [`super::html_shell`].

use std::fmt::Write as _;

use super::{encode_query, escape, verse_card};
use crate::backend::MandalaIndex;
use crate::chat::{ChatMessage, ReplyView};
use crate::content::{self, CREDITS, PRIVACY_POLICY, QUOTE_ROTATION, THEMES};
use crate::explorer::{LocatedVerse, filter_hymns, filter_stanzas};
use crate::reference::MANDALA_COUNT;
use crate::search::SearchSession;

fn error_line(error: Option<&str>) -> String {
    error.map_or_else(String::new, |e| {
        format!(r#"<p class="error" role="alert">{}</p>"#, escape(e))
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Home
// ─────────────────────────────────────────────────────────────────────────────

/// One carousel slide; polls for the next one.
pub fn quote_fragment(index: usize) -> String {
    let (i, quote) = content::quote_at(index);
    format!(
        r#"<figure class="card quote" hx-get="/partials/quote?index={next}" hx-trigger="every {secs}s" hx-swap="outerHTML">
    <p class="sanskrit">{sanskrit}</p>
    <p><em>{transliteration}</em></p>
    <blockquote>{meaning}</blockquote>
    <figcaption class="source">{source}</figcaption>
</figure>"#,
        next = i + 1,
        secs = QUOTE_ROTATION.as_secs(),
        sanskrit = escape(quote.sanskrit),
        transliteration = escape(quote.transliteration),
        meaning = escape(quote.meaning),
        source = escape(quote.source),
    )
}

pub fn home(quote_index: usize) -> String {
    format!(
        r#"<section class="hero">
    <h1>{title}</h1>
    <p>{subtitle}</p>
    <p class="themes" hx-boost="true">
        <a class="button primary" href="/search">Semantic Search</a>
        <a class="button" href="/chat">Ask the Sacred Guide</a>
        <a class="button" href="/explorer">Browse by Reference</a>
    </p>
</section>
{quote}"#,
        title = escape(content::HERO_TITLE),
        subtitle = escape(content::HERO_SUBTITLE),
        quote = quote_fragment(quote_index),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Search
// ─────────────────────────────────────────────────────────────────────────────

pub fn search(query: &str, results: Option<&SearchSession>, error: Option<&str>) -> String {
    let mut html = format!(
        r#"<section class="card">
    <h1>Semantic Search</h1>
    <form method="get" action="/search" hx-boost="true">
        <input type="search" name="q" value="{query}" placeholder="Search by meaning, e.g. hymns to the dawn" aria-label="Search query">
        <button type="submit" class="primary">Search</button>
        <a class="button" href="/search?random=1">✨ Surprise Me</a>
    </form>
    <div class="themes" hx-boost="true">"#,
        query = escape(query)
    );
    for theme in &THEMES {
        let _ = write!(
            html,
            r#"<a class="button" href="/search?q={}">{} {}</a>"#,
            encode_query(theme.query),
            theme.icon,
            escape(theme.title)
        );
    }
    html.push_str("</div>");
    html.push_str(&error_line(error));
    html.push_str("</section>");

    if let Some(session) = results {
        let _ = write!(
            html,
            r#"<section><p class="notice">{}</p>"#,
            escape(&session.summary)
        );
        if let Some(meta) = &session.metadata {
            let _ = write!(
                html,
                r#"<p class="meta">Showing {} of {} fetched · {} high confidence · average {:.0}%</p>"#,
                meta.display_count,
                meta.total_fetched,
                meta.high_confidence_count,
                meta.average_confidence * 100.0
            );
        }
        for verse in &session.verses {
            html.push_str(&verse_card(verse));
        }
        html.push_str("</section>");
    }
    html
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat
// ─────────────────────────────────────────────────────────────────────────────

fn assistant_reply(reply: &crate::backend::ChatIntentResponse) -> String {
    let view = ReplyView::new(reply);
    let mut html = format!(r#"<span class="badge">{}</span>"#, view.title);

    if !reply.slokas.is_empty() {
        let _ = write!(html, "<h3>🪷 Sacred Verses ({})</h3>", reply.slokas.len());
        for verse in view.inline {
            html.push_str(&verse_card(verse));
        }
        if let Some(note) = view.more_note() {
            let _ = write!(html, r#"<p class="meta">✨ {}</p>"#, escape(&note));
        }
    }

    let answer = &reply.answer;
    for (heading, text) in [
        ("Sacred Summary", &answer.summary),
        ("Divine Interpretation", &answer.interpretation),
        ("Cosmic Reflection", &answer.reflection),
    ] {
        if let Some(text) = text.as_deref().filter(|t| !t.trim().is_empty()) {
            let _ = write!(html, "<h4>{heading}</h4><p>{}</p>", escape(text));
        }
    }
    html
}

pub fn chat(messages: &[ChatMessage], error: Option<&str>) -> String {
    let mut html = String::from(
        r#"<section class="card">
    <h1>Sacred Wisdom Guide</h1>
    <p class="meta">Discover the eternal wisdom of the Rig Veda through conversation</p>
    <div id="transcript">"#,
    );

    if messages.is_empty() {
        html.push_str(
            r#"<div class="card"><strong>Welcome, Seeker of Wisdom</strong>
<p>Ask about sacred hymns, cosmic themes, or divine concepts.<br><em>"Give me slokas about life" · "Explain the hymn 10.12.9"</em></p></div>"#,
        );
    }

    for message in messages {
        match message {
            ChatMessage::User { text } => {
                let _ = write!(
                    html,
                    r#"<div class="message user"><div class="bubble">{}</div></div>"#,
                    escape(text)
                );
            }
            ChatMessage::Assistant { reply } => {
                let _ = write!(
                    html,
                    r#"<div class="message assistant"><div class="bubble">{}</div></div>"#,
                    assistant_reply(reply)
                );
            }
        }
    }

    html.push_str("</div>");
    html.push_str(&error_line(error));
    html.push_str(
        r#"<form method="post" action="/chat" hx-boost="true">
        <textarea name="message" rows="2" placeholder="Ask about hymns, themes, or cosmic concepts..." aria-label="Message"></textarea>
        <button type="submit" class="primary">Send</button>
    </form>
</section>"#,
    );
    html
}

// ─────────────────────────────────────────────────────────────────────────────
// Explorer
// ─────────────────────────────────────────────────────────────────────────────

/// Everything the explorer page shows.
#[derive(Debug, Default)]
pub struct ExplorerView<'a> {
    pub mandala: Option<u32>,
    pub hymn: Option<u32>,
    pub stanza: Option<u32>,
    pub index: Option<&'a MandalaIndex>,
    pub stanza_count: Option<u32>,
    pub hymn_filter: &'a str,
    pub stanza_filter: &'a str,
    pub quick: &'a str,
    pub verse: Option<&'a LocatedVerse>,
    pub step: u8,
    pub error: Option<&'a str>,
}

fn step_indicator(current: u8) -> String {
    let mut html = String::from(r#"<ol class="steps">"#);
    for (n, label) in (1u8..).zip(["Mandala", "Sukta", "Mantra", "Read"]) {
        let class = match n.cmp(&current) {
            std::cmp::Ordering::Less => "step done",
            std::cmp::Ordering::Equal => "step current",
            std::cmp::Ordering::Greater => "step",
        };
        let _ = write!(html, r#"<li class="button {class}">{n}. {label}</li>"#);
    }
    html.push_str("</ol>");
    html
}

pub fn explorer(view: &ExplorerView<'_>) -> String {
    let mut html = format!(
        r#"<section class="card">
    <h1>Veda Explorer</h1>
    {steps}
    <form method="get" action="/explorer" hx-boost="true">
        <label>Quick reference
            <input type="text" name="ref" value="{quick}" placeholder="Mandala.Sukta.Mantra (e.g., 1.10.129)">
        </label>
        <button type="submit" class="primary">Go</button>
    </form>
    <div class="mandalas" hx-boost="true">"#,
        steps = step_indicator(view.step),
        quick = escape(view.quick),
    );

    for m in 1..=MANDALA_COUNT {
        let active = if view.mandala == Some(m) { " active" } else { "" };
        let _ = write!(
            html,
            r#"<a class="button{active}" href="/explorer?mandala={m}">Mandala {m}</a>"#
        );
    }
    html.push_str("</div>");

    if let (Some(mandala), Some(index)) = (view.mandala, view.index) {
        let _ = write!(
            html,
            r#"<form method="get" action="/explorer" hx-boost="true">
        <input type="hidden" name="mandala" value="{mandala}">
        <label>Sukta ({total} hymns)
            <input type="search" name="hymn_filter" value="{filter}" placeholder="Filter">
            <select name="hymn">"#,
            total = index.total_hymns,
            filter = escape(view.hymn_filter),
        );
        for h in filter_hymns(index, view.hymn_filter) {
            let selected = if view.hymn == Some(h) { " selected" } else { "" };
            let _ = write!(html, r#"<option value="{h}"{selected}>{h}</option>"#);
        }
        html.push_str("</select></label>");

        if let (Some(_), Some(count)) = (view.hymn, view.stanza_count) {
            let _ = write!(
                html,
                r#"<label>Mantra ({count} stanzas)
            <input type="search" name="stanza_filter" value="{}" placeholder="Filter">
            <select name="stanza">"#,
                escape(view.stanza_filter)
            );
            for s in filter_stanzas(count, view.stanza_filter) {
                let selected = if view.stanza == Some(s) { " selected" } else { "" };
                let _ = write!(html, r#"<option value="{s}"{selected}>{s}</option>"#);
            }
            html.push_str("</select></label>");
            html.push_str(
                r#"<button type="submit" name="fetch" value="1" class="primary">Fetch verse</button>"#,
            );
        }
        html.push_str(r#"<button type="submit">Next</button></form>"#);
    }

    html.push_str(&error_line(view.error));
    html.push_str("</section>");

    if let Some(found) = view.verse {
        let r = found.reference;
        html.push_str(&verse_card(&found.verse));
        let _ = write!(
            html,
            r#"<p class="themes" hx-boost="true">
    <a class="button" href="/explorer?mandala={m}&hymn={h}&stanza={s}&step=prev">← Previous mantra</a>
    <a class="button" href="/explorer?mandala={m}&hymn={h}&stanza={s}&step=next">Next mantra →</a>
</p>"#,
            m = r.mandala,
            h = r.hymn,
            s = r.stanza,
        );
    }
    html
}

// ─────────────────────────────────────────────────────────────────────────────
// Static pages
// ─────────────────────────────────────────────────────────────────────────────

pub fn credits() -> String {
    let mut html = String::from(r#"<section class="card"><h1>Credits &amp; Acknowledgments</h1>"#);
    for section in &CREDITS {
        let _ = write!(html, "<h2>{}</h2><ul>", escape(section.title));
        for item in section.items {
            let name = match item.link {
                Some(link) => format!(
                    r#"<a href="{}" rel="noopener">{}</a>"#,
                    escape(link),
                    escape(item.name)
                ),
                None => escape(item.name),
            };
            let _ = write!(html, "<li><strong>{name}</strong>: {}</li>", escape(item.description));
        }
        html.push_str("</ul>");
    }
    html.push_str("</section>");
    html
}

pub fn privacy() -> String {
    let mut html = String::from(r#"<section class="card"><h1>Privacy Policy</h1>"#);
    for (heading, paragraphs) in PRIVACY_POLICY {
        let _ = write!(html, "<h2>{}</h2>", escape(heading));
        for p in *paragraphs {
            let _ = write!(html, "<p>{}</p>", escape(p));
        }
    }
    html.push_str("</section>");
    html
}

pub fn not_found() -> &'static str {
    r#"<section class="card">
    <h1>404</h1>
    <p>Page not found</p>
    <a class="button primary" href="/">Go Home</a>
</section>"#
}
