//! Fixed tag vocabularies for filtering.
//!
//! The index stores two tag sets per video: the constitutional amendments a
//! video is about, and the participant roles appearing in it. Both
//! vocabularies are closed. Search filters are intersected with these
//! vocabularies before they get anywhere near a query predicate, so unknown
//! or hostile values are dropped instead of being matched or interpolated.

use std::collections::HashSet;
use std::sync::OnceLock;

/// Constitutional amendment a video is tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Amendment {
    First,
    Second,
    Fourth,
    Fifth,
    Sixth,
    Eighth,
    Fourteenth,
}

impl Amendment {
    pub const ALL: [Amendment; 7] = [
        Amendment::First,
        Amendment::Second,
        Amendment::Fourth,
        Amendment::Fifth,
        Amendment::Sixth,
        Amendment::Eighth,
        Amendment::Fourteenth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Amendment::First => "FIRST",
            Amendment::Second => "SECOND",
            Amendment::Fourth => "FOURTH",
            Amendment::Fifth => "FIFTH",
            Amendment::Sixth => "SIXTH",
            Amendment::Eighth => "EIGHTH",
            Amendment::Fourteenth => "FOURTEENTH",
        }
    }

    /// The valid tag strings, built once and shared by all search calls.
    pub fn valid_set() -> &'static HashSet<&'static str> {
        static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
        SET.get_or_init(|| Amendment::ALL.iter().map(Amendment::as_str).collect())
    }

    /// Intersect caller-supplied values with the vocabulary.
    ///
    /// Returns `None` when the input or the intersection is empty: an
    /// all-invalid filter degrades to "no restriction", never to
    /// "match nothing".
    pub fn sanitize<'a, I>(values: I) -> Option<Vec<String>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        sanitize_against(values, Self::valid_set())
    }
}

/// Participant role appearing in a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Participant {
    Police,
    Sheriff,
    Federal,
    Security,
    Government,
    Citizen,
    Journalist,
}

impl Participant {
    pub const ALL: [Participant; 7] = [
        Participant::Police,
        Participant::Sheriff,
        Participant::Federal,
        Participant::Security,
        Participant::Government,
        Participant::Citizen,
        Participant::Journalist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Participant::Police => "POLICE",
            Participant::Sheriff => "SHERIFF",
            Participant::Federal => "FEDERAL",
            Participant::Security => "SECURITY",
            Participant::Government => "GOVERNMENT",
            Participant::Citizen => "CITIZEN",
            Participant::Journalist => "JOURNALIST",
        }
    }

    pub fn valid_set() -> &'static HashSet<&'static str> {
        static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
        SET.get_or_init(|| Participant::ALL.iter().map(Participant::as_str).collect())
    }

    /// See [`Amendment::sanitize`].
    pub fn sanitize<'a, I>(values: I) -> Option<Vec<String>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        sanitize_against(values, Self::valid_set())
    }
}

fn sanitize_against<'a, I>(values: I, valid: &HashSet<&'static str>) -> Option<Vec<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut kept: Vec<String> = values
        .into_iter()
        .filter(|v| valid.contains(v))
        .map(str::to_owned)
        .collect();
    if kept.is_empty() {
        return None;
    }
    kept.sort_unstable();
    kept.dedup();
    Some(kept)
}
