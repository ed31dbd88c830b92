//! Screenplay data model: the form input and the canonical recovered screenplay.
//!
//! Shape differences between prompt schema variants (spoken lines as a string
//! or a list, `included/suggested` vs `suggested_props_wardrobe/custom_props`)
//! are resolved once in `recovery`; everything downstream sees only these types.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

// ────────────────────────────────────────────────────────────────────────────
// Input
// ────────────────────────────────────────────────────────────────────────────

/// The structured form input a screenplay is generated from.
/// Absent fields deserialize as blank so `validate` can report them together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenplayRequest {
    pub theme: String,
    pub story_summary: String,
    pub number_of_characters: Option<u32>,
    pub characters: String,
    pub props: String,
    pub vfx: bool,
    pub drones: bool,
    pub location: String,
}

impl ScreenplayRequest {
    /// Presence check only. Theme, story summary and location must be non-blank;
    /// characters and props may legitimately be left empty.
    pub fn validate(&self) -> Result<(), AppError> {
        let missing: Vec<&str> = [
            ("theme", &self.theme),
            ("story_summary", &self.story_summary),
            ("location", &self.location),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::InputIncomplete(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )))
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Canonical screenplay
// ────────────────────────────────────────────────────────────────────────────

/// The recovered screenplay. Keys the model left out stay absent here; whether
/// the screenplay is complete enough to render is decided by `missing_fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screenplay {
    pub title: Option<String>,
    pub synopsis: String,
    pub characters: String,
    /// Prop blocks in presentation order, one per prop source.
    pub props: Vec<PropGroup>,
    /// In the order the generation service emitted them. Never renumbered.
    /// Empty when the model sent no scenes.
    pub scenes: Vec<Scene>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// `None` when absent or not a positive integer.
    pub scene_number: Option<u32>,
    pub scene_breakdown: Option<String>,
    pub scene_props: Option<String>,
    pub shots: Vec<Shot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shot {
    pub shot_number: Option<u32>,
    pub shot_description: Option<String>,
    /// One entry per speaking line, in presentation order.
    pub spoken_lines: Vec<String>,
}

/// Where a block of props comes from. The label is what the props table shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropSource {
    /// Legacy schema: props the screenplay uses.
    Included,
    /// Props suggested by the model.
    Suggested,
    /// Props the family said they already have.
    Provided,
}

impl PropSource {
    pub fn label(self) -> &'static str {
        match self {
            PropSource::Included => "Included",
            PropSource::Suggested => "Suggested",
            PropSource::Provided => "Provided",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropGroup {
    pub source: PropSource,
    pub items: Vec<String>,
}

impl PropGroup {
    /// Splits a comma-separated prop list, trimming names and dropping empties.
    pub fn from_comma_list(source: PropSource, list: &str) -> Self {
        Self {
            source,
            items: list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

impl Screenplay {
    pub fn prop_group(&self, source: PropSource) -> Option<&PropGroup> {
        self.props.iter().find(|g| g.source == source)
    }

    pub fn shot_count(&self) -> usize {
        self.scenes.iter().map(|s| s.shots.len()).sum()
    }

    /// Title for logs and summaries; empty when the model gave none.
    pub fn title_or_default(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    /// Paths of the fields the document cannot be rendered without, in
    /// document order. Empty means the screenplay is renderable.
    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
            missing.push("title".to_string());
        }
        if self.scenes.is_empty() {
            missing.push("scenes".to_string());
        }
        for (i, scene) in self.scenes.iter().enumerate() {
            if scene.scene_number.is_none() {
                missing.push(format!("scenes[{i}].scene_number"));
            }
            if scene.scene_breakdown.is_none() {
                missing.push(format!("scenes[{i}].scene_breakdown"));
            }
            for (j, shot) in scene.shots.iter().enumerate() {
                if shot.shot_number.is_none() {
                    missing.push(format!("scenes[{i}].shots[{j}].shot_number"));
                }
                if shot.shot_description.is_none() {
                    missing.push(format!("scenes[{i}].shots[{j}].shot_description"));
                }
            }
        }
        missing
    }
}
