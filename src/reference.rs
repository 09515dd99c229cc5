//! Verse references in `Mandala.Sukta.Mantra` shorthand.
//!
//! The Rig Veda is indexed by mandala (book, 1-10), sukta (hymn) and
//! mantra (stanza). `1.10.129` names mandala 1, hymn 10, stanza 129.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of mandalas in the Rig Veda.
pub const MANDALA_COUNT: u32 = 10;

static SHORTHAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.(\d+)\.(\d+)$").unwrap());

/// Rejected shorthand input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// Not three dot-separated numbers.
    #[error("Invalid format. Use: Mandala.Sukta.Mantra (e.g., 1.10.129)")]
    Format,

    /// Mandala outside 1-10.
    #[error("Mandala must be between 1-10")]
    MandalaOutOfRange(u32),

    /// Sukta or mantra of zero.
    #[error("Sukta and Mantra numbers start at 1")]
    ZeroIndex,
}

/// A fully qualified verse reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VerseRef {
    pub mandala: u32,
    pub hymn: u32,
    pub stanza: u32,
}

impl VerseRef {
    #[must_use]
    pub const fn new(mandala: u32, hymn: u32, stanza: u32) -> Self {
        Self {
            mandala,
            hymn,
            stanza,
        }
    }

    /// Parse user input such as `1.10.129`.
    ///
    /// Surrounding whitespace is ignored; anything else that is not exactly
    /// three dot-separated numbers is a [`ReferenceError::Format`].
    pub fn parse(input: &str) -> Result<Self, ReferenceError> {
        let caps = SHORTHAND
            .captures(input.trim())
            .ok_or(ReferenceError::Format)?;
        let number = |i: usize| -> Result<u32, ReferenceError> {
            caps[i].parse().map_err(|_e| ReferenceError::Format)
        };
        let reference = Self::new(number(1)?, number(2)?, number(3)?);
        reference.validate()?;
        Ok(reference)
    }

    /// Lenient parse of a backend `location` field.
    ///
    /// Used to derive audio URLs, so only the shape is checked.
    pub fn from_location(location: &str) -> Option<Self> {
        let mut parts = location.trim().split('.');
        let mandala = parts.next()?.trim().parse().ok()?;
        let hymn = parts.next()?.trim().parse().ok()?;
        let stanza = parts.next()?.trim().parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(mandala, hymn, stanza))
    }

    /// Check mandala range and one-based hymn/stanza numbers.
    pub fn validate(&self) -> Result<(), ReferenceError> {
        if !is_valid_mandala(self.mandala) {
            return Err(ReferenceError::MandalaOutOfRange(self.mandala));
        }
        if self.hymn == 0 || self.stanza == 0 {
            return Err(ReferenceError::ZeroIndex);
        }
        Ok(())
    }

    /// Same hymn, different stanza.
    #[must_use]
    pub const fn with_stanza(self, stanza: u32) -> Self {
        Self { stanza, ..self }
    }

    /// Backend path of the verse text.
    pub fn sloka_path(&self) -> String {
        format!("sloka/{}/{}/{}", self.mandala, self.hymn, self.stanza)
    }

    /// Backend path of the recitation.
    pub fn audio_path(&self) -> String {
        format!("audio/{}/{}/{}", self.mandala, self.hymn, self.stanza)
    }
}

impl fmt::Display for VerseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.mandala, self.hymn, self.stanza)
    }
}

impl std::str::FromStr for VerseRef {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Whether `mandala` is one of the ten books.
pub const fn is_valid_mandala(mandala: u32) -> bool {
    mandala >= 1 && mandala <= MANDALA_COUNT
}
