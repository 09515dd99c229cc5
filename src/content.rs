//! Static page content: hero, quote carousel, themed searches, credits and
//! privacy policy.

use std::time::Duration;

use serde::Serialize;

/// How long each quote stays on screen.
pub const QUOTE_ROTATION: Duration = Duration::from_secs(5);

pub const HERO_TITLE: &str = "Rig Veda Explorer";
pub const HERO_SUBTITLE: &str = "Explore ancient hymns with modern AI: search by meaning, ask questions, and listen to recitations.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub sanskrit: &'static str,
    pub transliteration: &'static str,
    pub meaning: &'static str,
    pub source: &'static str,
}

pub const QUOTES: [Quote; 6] = [
    Quote {
        sanskrit: "एकं सद्विप्रा बहुधा वदन्ति",
        transliteration: "Ekam sad vipra bahudha vadanti",
        meaning: "Truth is one, the wise call it by many names",
        source: "Rig Veda 1.164.46",
    },
    Quote {
        sanskrit: "असतो मा सद्गमय",
        transliteration: "Asato ma sadgamaya",
        meaning: "Lead me from the unreal to the real",
        source: "Rig Veda 1.89.16",
    },
    Quote {
        sanskrit: "यत्र विश्वं भवत्येकनीडम्",
        transliteration: "Yatra visvam bhavatyeka nidam",
        meaning: "Where the entire universe becomes one nest",
        source: "Rig Veda 10.121.1",
    },
    Quote {
        sanskrit: "अग्निमीळे पुरोहितं",
        transliteration: "Agnim ile purohitam",
        meaning: "I praise Agni, the chosen priest, god, minister of sacrifice",
        source: "Rig Veda 1.1.1",
    },
    Quote {
        sanskrit: "सं गच्छध्वं सं वदध्वम्",
        transliteration: "Sam gacchadhvam sam vadadhvam",
        meaning: "Move together, speak together, let your minds be in harmony",
        source: "Rig Veda 10.191.2",
    },
    Quote {
        sanskrit: "सत्यं वद धर्मं चर",
        transliteration: "Satyam vada dharmam chara",
        meaning: "Speak the truth, practice righteousness",
        source: "Rig Veda 4.33.11",
    },
];

/// Quote shown at carousel position `index`; wraps around.
pub fn quote_at(index: usize) -> (usize, &'static Quote) {
    let i = index % QUOTES.len();
    (i, &QUOTES[i])
}

/// A one-click example search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Theme {
    pub title: &'static str,
    pub icon: &'static str,
    pub query: &'static str,
}

pub const THEMES: [Theme; 6] = [
    Theme {
        title: "Fire & Sacred Rituals",
        icon: "🔥",
        query: "fire sacrifice agni sacred ritual offerings",
    },
    Theme {
        title: "Dawn Goddess & Light",
        icon: "🌅",
        query: "dawn goddess ushas light morning radiance",
    },
    Theme {
        title: "Thunder God Indra",
        icon: "⚡",
        query: "indra thunder storm lightning vajra warrior",
    },
    Theme {
        title: "Cosmic Creation & Universe",
        icon: "🌌",
        query: "creation universe cosmic order rita primordial",
    },
    Theme {
        title: "Divine Wisdom & Knowledge",
        icon: "📖",
        query: "wisdom knowledge divine truth enlightenment",
    },
    Theme {
        title: "Water & Purification",
        icon: "💧",
        query: "water purification sacred rivers streams flowing",
    },
];

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Credit {
    pub name: &'static str,
    pub description: &'static str,
    pub link: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CreditSection {
    pub title: &'static str,
    pub items: &'static [Credit],
}

pub const CREDITS: [CreditSection; 2] = [
    CreditSection {
        title: "Sacred Texts & Audio",
        items: &[
            Credit {
                name: "Veda Web",
                description: "Original Sanskrit texts from ancient Vedic manuscripts",
                link: Some("https://vedaweb.uni-koeln.de/rigveda/"),
            },
            Credit {
                name: "Vedic Audio Recordings",
                description: "Authentic recitations by traditional Vedic scholars",
                link: Some("https://github.com/aasi-archive/rv-audio"),
            },
        ],
    },
    CreditSection {
        title: "Development Team",
        items: &[
            Credit {
                name: "Project Creator",
                description: "Eternal Veda development team",
                link: None,
            },
            Credit {
                name: "GitHub Contributors",
                description: "Open-source contributors who helped improve the platform",
                link: Some("https://github.com/"),
            },
            Credit {
                name: "Beta Testers",
                description: "Community members who provided valuable feedback",
                link: None,
            },
        ],
    },
];

/// Privacy policy as (heading, paragraphs) pairs.
pub const PRIVACY_POLICY: &[(&str, &[&str])] = &[
    (
        "Introduction",
        &["We are committed to protecting your privacy while you explore the sacred texts of the Rig Veda. This policy explains what is collected and how it is used."],
    ),
    (
        "Information We Process",
        &[
            "Search queries, verse selections and questions asked to the Sacred Guide are forwarded to the verse service to answer them.",
            "Basic request details such as browser type and timing appear in server logs.",
        ],
    ),
    (
        "How We Use It",
        &[
            "To answer your searches and questions.",
            "To fix bugs, improve performance and keep the service available.",
        ],
    ),
    (
        "Third-Party Services",
        &[
            "Chat interactions are processed through secure AI services.",
            "Verse recitations are streamed from the audio archive.",
        ],
    ),
    (
        "Cookies",
        &["A single session cookie keeps your chat and latest search together for 30 minutes of inactivity. Nothing is kept after the session expires or the server restarts."],
    ),
];
