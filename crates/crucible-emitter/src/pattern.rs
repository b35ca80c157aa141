//! Event name patterns.
//!
//! A [`Pattern`] is either a literal event name or a compiled regular
//! expression. Every pattern has a canonical key which identifies its slot in
//! the emitter's registry:
//!
//! - a literal's key is the literal itself (`"note:created"`)
//! - a regex's key is `/source/flags` (`"/match (some)(thing)/i"`)
//!
//! Two regexes with the same source and flags share a key, so registering the
//! "same" expression twice accumulates listeners under one slot.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Flags accepted in a delimited pattern, in canonical key order.
///
/// The ECMAScript flags in their `RegExp.prototype.flags` order, plus `x`.
const FLAG_ORDER: &str = "dgimsuvxy";

/// Errors raised while building a [`Pattern`].
#[derive(Error, Debug)]
pub enum PatternError {
    /// The expression failed to compile
    #[error("invalid regular expression: {0}")]
    InvalidRegex(#[from] regex::Error),

    /// The delimited form was not `/source/flags`
    #[error("malformed delimited pattern: {0}")]
    Malformed(String),

    /// A flag outside `dgimsuvxy`
    #[error("unknown pattern flag '{0}'")]
    UnknownFlag(char),
}

/// A pattern an emitted event name is tested against.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Matches an event name exactly
    Literal(String),

    /// Matches when the expression finds a match anywhere in the event name
    Regex {
        /// Compiled expression
        regex: Regex,
        /// Canonical `/source/flags` key
        key: String,
    },
}

impl Pattern {
    /// Compile a regex pattern without flags.
    pub fn regex(source: &str) -> Result<Self, PatternError> {
        Ok(Self::from(Regex::new(source)?))
    }

    /// Parse a delimited pattern such as `/^GET (.*)$/i`.
    ///
    /// `i`, `m`, `s` and `x` configure the compiled expression. `x` is not an
    /// ECMAScript flag; it maps to [`RegexBuilder::ignore_whitespace`]. `d`,
    /// `g`, `u`, `v` and `y` are accepted and kept in the key but do not change
    /// matching: the expression is always Unicode-aware, finds its first match
    /// anywhere in the name and keeps no state between tests.
    ///
    /// Flags are deduplicated and sorted into `dgimsuvxy` order for the key.
    pub fn parse_delimited(text: &str) -> Result<Self, PatternError> {
        let body = text
            .strip_prefix('/')
            .ok_or_else(|| PatternError::Malformed(text.to_string()))?;
        let end = body
            .rfind('/')
            .ok_or_else(|| PatternError::Malformed(text.to_string()))?;
        let (source, flags) = (&body[..end], &body[end + 1..]);

        let mut builder = RegexBuilder::new(source);
        for flag in flags.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'x' => builder.ignore_whitespace(true),
                'd' | 'g' | 'u' | 'v' | 'y' => &mut builder,
                other => return Err(PatternError::UnknownFlag(other)),
            };
        }

        Ok(Self::Regex {
            regex: builder.build()?,
            key: format!("/{}/{}", source, canonical_flags(flags)),
        })
    }

    /// Canonical registry key.
    pub fn key(&self) -> &str {
        match self {
            Self::Literal(name) => name,
            Self::Regex { key, .. } => key,
        }
    }

    /// Whether this is a regex pattern.
    pub fn is_regex(&self) -> bool {
        matches!(self, Self::Regex { .. })
    }

    /// Test `event` against this pattern.
    ///
    /// Literal patterns yield no parameters. Regex patterns yield capture
    /// groups `1..n` of the first match, `None` where a group did not take
    /// part in the match.
    pub fn matches(&self, event: &str) -> Option<Match> {
        match self {
            Self::Literal(name) => (name == event).then(|| Match {
                pattern: name.clone(),
                parameters: Vec::new(),
            }),
            Self::Regex { regex, key } => {
                let captures = regex.captures(event)?;
                let parameters = captures
                    .iter()
                    .skip(1)
                    .map(|group| group.map(|m| m.as_str().to_string()))
                    .collect();
                Some(Match {
                    pattern: key.clone(),
                    parameters,
                })
            }
        }
    }
}

/// Sort and dedupe flags into `dgimsuvxy` order.
fn canonical_flags(flags: &str) -> String {
    FLAG_ORDER.chars().filter(|f| flags.contains(*f)).collect()
}

impl From<&str> for Pattern {
    fn from(name: &str) -> Self {
        Self::Literal(name.to_string())
    }
}

impl From<String> for Pattern {
    fn from(name: String) -> Self {
        Self::Literal(name)
    }
}

impl From<&String> for Pattern {
    fn from(name: &String) -> Self {
        Self::Literal(name.clone())
    }
}

impl From<Regex> for Pattern {
    fn from(regex: Regex) -> Self {
        let key = format!("/{}/", regex.as_str());
        Self::Regex { regex, key }
    }
}

impl From<&Regex> for Pattern {
    fn from(regex: &Regex) -> Self {
        Self::from(regex.clone())
    }
}

impl From<&Pattern> for Pattern {
    fn from(pattern: &Pattern) -> Self {
        pattern.clone()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A successful pattern test against an event name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Key of the pattern that matched
    pub pattern: String,

    /// Captured groups, in order
    pub parameters: Vec<Option<String>>,
}

impl Match {
    /// Captured group `index` (0-based, i.e. regex group `index + 1`).
    pub fn parameter(&self, index: usize) -> Option<&str> {
        self.parameters.get(index).and_then(|p| p.as_deref())
    }
}
