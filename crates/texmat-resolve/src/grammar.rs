//! Filename grammar for texture archive members
//!
//! Archive members are named `«prefix»_«token»[_«n»k].«ext»`. The prefix is
//! ignored, `«token»` names the map kind and the optional `_«n»k` suffix gives
//! the resolution in multiples of 1024 pixels.

use crate::map_kind::MapKind;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Which naming convention to accept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilenameGrammar {
    /// Resolution suffix optional. Accepts both conventions.
    #[default]
    Combined,
    /// Resolution suffix required (`rock_diff_2k.jpg`)
    Sized,
    /// No resolution suffix (`rock_diff.jpg`), as in older archives
    Bare,
}

impl FilenameGrammar {
    fn pattern(self) -> &'static Regex {
        static COMBINED: OnceLock<Regex> = OnceLock::new();
        static SIZED: OnceLock<Regex> = OnceLock::new();
        static BARE: OnceLock<Regex> = OnceLock::new();

        let (cell, source) = match self {
            FilenameGrammar::Combined => (&COMBINED, r"^.+_([A-Za-z]+)(?:_([0-9]+)k)?\.[^.]+$"),
            FilenameGrammar::Sized => (&SIZED, r"^.+_([A-Za-z]+)_([0-9]+)k\.[^.]+$"),
            FilenameGrammar::Bare => (&BARE, r"^.+_([A-Za-z]+)\.[^.]+$"),
        };
        cell.get_or_init(|| Regex::new(source).expect("filename grammar is a valid regex"))
    }
}

impl fmt::Display for FilenameGrammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilenameGrammar::Combined => "combined",
            FilenameGrammar::Sized => "sized",
            FilenameGrammar::Bare => "bare",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for FilenameGrammar {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "combined" => Ok(FilenameGrammar::Combined),
            "sized" => Ok(FilenameGrammar::Sized),
            "bare" => Ok(FilenameGrammar::Bare),
            _ => Err(format!(
                "unknown filename grammar '{}'; valid values: combined, sized, bare",
                s
            )),
        }
    }
}

/// A file name recognised as a map component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub kind: MapKind,
    /// The matched token, lower-cased
    pub token: String,
    /// Pixel resolution from the `_«n»k` suffix
    pub resolution: Option<u32>,
}

/// Classify one file name. Returns `None` for names outside the grammar or
/// with a token no map kind claims.
pub fn classify(file_name: &str, grammar: FilenameGrammar) -> Option<Classified> {
    let captures = grammar.pattern().captures(file_name)?;
    let token = captures.get(1)?.as_str().to_ascii_lowercase();
    let kind = MapKind::from_token(&token)?;

    let resolution = match captures.get(2) {
        Some(digits) => {
            let pixels = digits
                .as_str()
                .parse::<u32>()
                .ok()
                .and_then(|n| n.checked_mul(1024));
            match pixels {
                Some(p) => Some(p),
                None => {
                    tracing::warn!(file = file_name, "resolution suffix out of range, ignoring file");
                    return None;
                }
            }
        }
        None => None,
    };

    Some(Classified {
        kind,
        token,
        resolution,
    })
}
