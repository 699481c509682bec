//! Reusable pattern library for tweet text.
//!
//! These patterns are referenced from a rules file as library keywords
//! (`{ library = "emoticon" }`) and are only valid in regex keyword mode.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Western emoticons such as `:)`, `;-P`, `(:` and `<3`, delimited by whitespace
/// or the ends of the text.
pub const EMOTICON_REGEX: &str = r"(\s|\A)(?:[<>]?[:;=8][\-o*']?[)\](\[dDpP/:}{@|\\]|[)\](\[dDpP/:}{@|\\][\-o*']?[:;=8][<>]?|<3)(\s|\z)";

pub const URL_REGEX: &str = r"https?://\S+\b|www\.(\w+\.)+\S*";

pub const USERNAME_REGEX: &str = r"(?:@[\w_]+)";

/// Generic tokenizer: runs of word characters, or runs of punctuation.
pub const WORD_OR_PUNCT_REGEX: &str = r"\w+|[^\w\s]+";

static EMOTICON: Lazy<Regex> = Lazy::new(|| compile(EMOTICON_REGEX));
static URL: Lazy<Regex> = Lazy::new(|| compile(URL_REGEX));
static USERNAME: Lazy<Regex> = Lazy::new(|| compile(USERNAME_REGEX));
static WORD_OR_PUNCT: Lazy<Regex> = Lazy::new(|| compile(WORD_OR_PUNCT_REGEX));

// The library patterns are constants; a failure here is a bug in this file.
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("library pattern {pattern:?} is invalid: {e}"))
}

/// A named entry of the pattern library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryPattern {
    Emoticon,
    Url,
    Username,
    WordOrPunct,
}

impl LibraryPattern {
    pub const ALL: [LibraryPattern; 4] = [
        LibraryPattern::Emoticon,
        LibraryPattern::Url,
        LibraryPattern::Username,
        LibraryPattern::WordOrPunct,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Emoticon => "emoticon",
            Self::Url => "url",
            Self::Username => "username",
            Self::WordOrPunct => "word_or_punct",
        }
    }

    /// Raw pattern source.
    pub fn pattern(self) -> &'static str {
        match self {
            Self::Emoticon => EMOTICON_REGEX,
            Self::Url => URL_REGEX,
            Self::Username => USERNAME_REGEX,
            Self::WordOrPunct => WORD_OR_PUNCT_REGEX,
        }
    }

    pub fn regex(self) -> &'static Regex {
        match self {
            Self::Emoticon => &*EMOTICON,
            Self::Url => &*URL,
            Self::Username => &*USERNAME,
            Self::WordOrPunct => &*WORD_OR_PUNCT,
        }
    }
}

impl std::fmt::Display for LibraryPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Split text into word and punctuation tokens.
pub fn tokenize(text: &str) -> Vec<&str> {
    WORD_OR_PUNCT.find_iter(text).map(|m| m.as_str()).collect()
}
