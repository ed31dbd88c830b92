//! Response Recoverer: rebuilds the screenplay JSON object from the model's raw
//! continuation and normalizes it into the canonical `Screenplay`.
//!
//! The prompt primes the assistant turn with `{`, so the reply usually starts
//! after the opening brace and may carry commentary after the closing one.
//!
//! # Algorithm
//! 1. Drop a leading markdown fence, if any.
//! 2. Restore the opening `{` unless the reply already starts with one.
//! 3. Scan with a bracket-balance counter that understands JSON strings and
//!    escapes; the object ends where depth returns to zero. Everything after it
//!    is discarded. Unterminated strings and unclosed objects are rejected.
//! 4. Parse with serde into a permissive wire shape, then normalize once:
//!    spoken lines become a list, prop fields become labelled groups, and
//!    numbers given as strings become integers. Keys the model left out stay
//!    absent; whether they are needed is decided when the screenplay is rendered.

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::screenplay::models::{PropGroup, PropSource, Scene, Screenplay, Shot};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecoveryError {
    /// The text could not be turned into a JSON object. Carries the raw model
    /// output for diagnosis.
    #[error("{reason}")]
    Parse { reason: String, raw_text: String },
}

impl RecoveryError {
    fn parse(reason: impl Into<String>, raw_text: &str) -> Self {
        RecoveryError::Parse {
            reason: reason.into(),
            raw_text: raw_text.to_string(),
        }
    }
}

/// Recovers a `Screenplay` from the raw text returned by the generation service.
pub fn recover_screenplay(raw_text: &str) -> Result<Screenplay, RecoveryError> {
    let json = reconstruct_object(raw_text)?;
    let wire: WireScreenplay = serde_json::from_str(&json)
        .map_err(|e| RecoveryError::parse(format!("recovered text is not valid JSON: {e}"), raw_text))?;
    Ok(wire.normalize())
}

/// Steps 1-3: returns the JSON object text, opening brace restored and
/// trailing prose removed.
pub fn reconstruct_object(raw_text: &str) -> Result<String, RecoveryError> {
    let body = strip_leading_fence(raw_text);

    if !body.contains('}') {
        return Err(RecoveryError::parse("no closing brace in model output", raw_text));
    }

    let mut candidate = String::with_capacity(body.len() + 1);
    if !body.starts_with('{') {
        candidate.push('{');
    }
    candidate.push_str(body);

    match scan_object_end(&candidate) {
        Ok(end) => {
            candidate.truncate(end);
            Ok(candidate)
        }
        Err(e) => Err(RecoveryError::parse(e.to_string(), raw_text)),
    }
}

/// Strips a leading ```json or ``` fence. A trailing fence is removed later
/// with the rest of the text after the object.
fn strip_leading_fence(text: &str) -> &str {
    let text = text.trim_start();
    text.strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .map(str::trim_start)
        .unwrap_or(text)
}

#[derive(Debug, Error, PartialEq, Eq)]
enum ScanError {
    #[error("closing bracket at byte {0} has no matching opener")]
    UnexpectedClose(usize),
    #[error("unbalanced quotes: a string is never terminated")]
    UnterminatedString,
    #[error("JSON object is never closed ({0} bracket(s) still open); output was probably truncated")]
    Unclosed(usize),
}

/// Returns the byte offset just past the bracket that closes the first value.
/// `text` must start with the opening bracket.
fn scan_object_end(text: &str) -> Result<usize, ScanError> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                if depth == 0 {
                    return Err(ScanError::UnexpectedClose(i));
                }
                depth -= 1;
                if depth == 0 {
                    return Ok(i + ch.len_utf8());
                }
            }
            _ => {}
        }
    }

    if in_string {
        Err(ScanError::UnterminatedString)
    } else {
        Err(ScanError::Unclosed(depth))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire shape (permissive) and normalization
// ────────────────────────────────────────────────────────────────────────────

/// A field the model may emit either as one string or as a list of strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextOrList {
    Text(String),
    List(Vec<String>),
}

impl TextOrList {
    /// Individual lines. A list is kept entry for entry; a single string
    /// (legacy schema) is split on newlines with blank lines dropped.
    fn into_lines(self) -> Vec<String> {
        match self {
            TextOrList::List(items) => items,
            TextOrList::Text(text) => text
                .lines()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    fn into_text(self, separator: &str) -> String {
        match self {
            TextOrList::Text(text) => text.trim().to_string(),
            TextOrList::List(items) => items.join(separator),
        }
    }

    fn into_props(self, source: PropSource) -> PropGroup {
        match self {
            TextOrList::Text(text) => PropGroup::from_comma_list(source, &text),
            TextOrList::List(items) => PropGroup {
                source,
                items: items
                    .into_iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
        }
    }
}

/// Scene and shot numbers as the model writes them. Anything that is not a
/// positive integer (`0`, `-1`, `2.5`, `true`) reads as absent.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Integer(u64),
    Float(f64),
    Text(String),
    Other(serde_json::Value),
}

impl NumberOrText {
    fn to_positive(&self) -> Option<u32> {
        let n = match self {
            NumberOrText::Integer(n) => u32::try_from(*n).ok()?,
            NumberOrText::Float(f) if f.fract() == 0.0 && *f >= 1.0 && *f <= f64::from(u32::MAX) => {
                *f as u32
            }
            NumberOrText::Float(_) => return None,
            NumberOrText::Other(value) => {
                debug!("Ignoring non-numeric scene/shot number {value}");
                return None;
            }
            // "3", "Scene 3", "3 (of 5)" all read as 3
            NumberOrText::Text(s) => s
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(char::is_ascii_digit)
                .collect::<String>()
                .parse()
                .ok()?,
        };
        (n > 0).then_some(n)
    }
}

#[derive(Debug, Deserialize)]
struct WireScreenplay {
    title: Option<TextOrList>,
    synopsis: Option<TextOrList>,
    characters: Option<TextOrList>,
    suggested_props_wardrobe: Option<TextOrList>,
    custom_props: Option<TextOrList>,
    included_props: Option<TextOrList>,
    suggested_props: Option<TextOrList>,
    scenes: Option<Vec<WireScene>>,
}

#[derive(Debug, Deserialize)]
struct WireScene {
    scene_number: Option<NumberOrText>,
    scene_breakdown: Option<TextOrList>,
    scene_props: Option<TextOrList>,
    shots: Option<Vec<WireShot>>,
}

#[derive(Debug, Deserialize)]
struct WireShot {
    shot_number: Option<NumberOrText>,
    shot_description: Option<TextOrList>,
    spoken_lines: Option<TextOrList>,
}

impl WireScreenplay {
    fn normalize(self) -> Screenplay {
        // Current schema wins when both key sets are present.
        let props = if self.suggested_props_wardrobe.is_some() || self.custom_props.is_some() {
            vec![
                prop_group(self.suggested_props_wardrobe, PropSource::Suggested),
                prop_group(self.custom_props, PropSource::Provided),
            ]
        } else if self.included_props.is_some() || self.suggested_props.is_some() {
            vec![
                prop_group(self.included_props, PropSource::Included),
                prop_group(self.suggested_props, PropSource::Suggested),
            ]
        } else {
            Vec::new()
        };

        Screenplay {
            title: self
                .title
                .map(|t| t.into_text(" "))
                .filter(|t| !t.is_empty()),
            synopsis: self.synopsis.map(|s| s.into_text(" ")).unwrap_or_default(),
            characters: self.characters.map(|c| c.into_text("\n")).unwrap_or_default(),
            props,
            scenes: self
                .scenes
                .unwrap_or_default()
                .into_iter()
                .map(WireScene::normalize)
                .collect(),
        }
    }
}

fn prop_group(field: Option<TextOrList>, source: PropSource) -> PropGroup {
    field
        .map(|f| f.into_props(source))
        .unwrap_or(PropGroup {
            source,
            items: Vec::new(),
        })
}

impl WireScene {
    fn normalize(self) -> Scene {
        Scene {
            scene_number: self.scene_number.as_ref().and_then(NumberOrText::to_positive),
            scene_breakdown: self.scene_breakdown.map(|b| b.into_text("\n")),
            scene_props: self
                .scene_props
                .map(|p| p.into_text(", "))
                .filter(|p| !p.is_empty()),
            shots: self
                .shots
                .unwrap_or_default()
                .into_iter()
                .map(WireShot::normalize)
                .collect(),
        }
    }
}

impl WireShot {
    fn normalize(self) -> Shot {
        Shot {
            shot_number: self.shot_number.as_ref().and_then(NumberOrText::to_positive),
            shot_description: self.shot_description.map(|d| d.into_text(" ")),
            spoken_lines: self.spoken_lines.map(TextOrList::into_lines).unwrap_or_default(),
        }
    }
}
