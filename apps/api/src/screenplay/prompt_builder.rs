//! Prompt Builder: turns a `ScreenplayRequest` into the generation prompt and the
//! two-turn conversation seed (user prompt + assistant `{` primer).
//!
//! Pure string construction: same request and bounds, byte-identical prompt.

use serde::{Deserialize, Serialize};

use crate::llm_client::prompts::{JSON_FORMAT_RULES, JSON_PRIMER};
use crate::llm_client::Message;
use crate::screenplay::models::ScreenplayRequest;
use crate::screenplay::prompts::{COVER_IMAGE_PROMPT_TEMPLATE, SCREENPLAY_PROMPT_TEMPLATE};

/// Scene/shot counts requested from the model. Caller-configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptBounds {
    pub max_scenes: u8,
    /// `true` asks for exactly `max_scenes`, `false` for "up to".
    pub exact_scene_count: bool,
    pub min_shots: u8,
    pub max_shots: u8,
}

impl Default for PromptBounds {
    fn default() -> Self {
        Self {
            max_scenes: 6,
            exact_scene_count: false,
            min_shots: 2,
            max_shots: 3,
        }
    }
}

impl PromptBounds {
    pub fn scene_rule(&self) -> String {
        if self.exact_scene_count {
            format!("exactly {} scenes", self.max_scenes)
        } else {
            format!("up to {} scenes", self.max_scenes)
        }
    }

    pub fn shot_rule(&self) -> String {
        if self.min_shots == self.max_shots {
            format!("exactly {} shots per scene", self.max_shots)
        } else {
            format!("{} to {} shots per scene", self.min_shots, self.max_shots)
        }
    }
}

/// The instruction prompt plus the primer that opens the assistant turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub primer: &'static str,
}

impl Prompt {
    /// The conversation seed sent to the generation service:
    /// the user prompt followed by the truncated assistant turn.
    pub fn messages(&self) -> Vec<Message<'_>> {
        vec![Message::user(&self.text), Message::assistant(self.primer)]
    }
}

/// Builds the screenplay prompt. Every request field is embedded after escaping.
pub fn build_prompt(request: &ScreenplayRequest, bounds: &PromptBounds) -> Prompt {
    let number_of_characters = request
        .number_of_characters
        .map(|n| n.to_string())
        .unwrap_or_else(|| "Not specified".to_string());

    let text = SCREENPLAY_PROMPT_TEMPLATE
        .replace("{theme}", &escape_field(&request.theme))
        .replace("{story_summary}", &escape_field(&request.story_summary))
        .replace("{number_of_characters}", &number_of_characters)
        .replace("{characters}", &escape_field(&request.characters))
        .replace("{props}", &escape_field(&request.props))
        .replace("{vfx}", yes_no(request.vfx))
        .replace("{drones}", yes_no(request.drones))
        .replace("{location}", &escape_field(&request.location))
        .replace("{scene_rule}", &bounds.scene_rule())
        .replace("{shot_rule}", &bounds.shot_rule())
        .replace("{json_rules}", JSON_FORMAT_RULES);

    Prompt {
        text,
        primer: JSON_PRIMER,
    }
}

/// Builds the movie-poster prompt for the cover image.
pub fn build_image_prompt(request: &ScreenplayRequest, title: &str) -> String {
    COVER_IMAGE_PROMPT_TEMPLATE
        .replace("{theme}", request.theme.trim())
        .replace("{title}", title.trim())
        .replace("{story_summary}", request.story_summary.trim())
        .replace("{characters}", request.characters.trim())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// Neutralizes characters that could be confused with the prompt's own structure:
/// JSON string delimiters are escaped, braces (the schema and the template
/// placeholders) become parentheses, and angle brackets (the `<input>` block) become
/// entities. Control characters other than newline and tab are dropped.
pub fn escape_field(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.trim().chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '{' => out.push('('),
            '}' => out.push(')'),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\n' | '\t' => out.push(ch),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::Role;

    fn request() -> ScreenplayRequest {
        ScreenplayRequest {
            theme: "Fantasy".to_string(),
            story_summary: "A shy dragon learns to roar".to_string(),
            number_of_characters: Some(3),
            characters: "Ivy - Hero, Sam - Friend, Ember - Dragon".to_string(),
            props: "Cape, paper crown".to_string(),
            vfx: true,
            drones: false,
            location: "Back garden".to_string(),
        }
    }

    #[test]
    fn test_prompt_embeds_every_field() {
        let prompt = build_prompt(&request(), &PromptBounds::default());
        for expected in [
            "Theme: Fantasy",
            "Story Summary: A shy dragon learns to roar",
            "Number of Characters: 3",
            "Characters: Ivy - Hero, Sam - Friend, Ember - Dragon",
            "Props: Cape, paper crown",
            "VFX: Yes",
            "Drones: No",
            "Location: Back garden",
        ] {
            assert!(prompt.text.contains(expected), "missing {expected:?}");
        }
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let bounds = PromptBounds::default();
        assert_eq!(build_prompt(&request(), &bounds), build_prompt(&request(), &bounds));
    }

    #[test]
    fn test_prompt_describes_schema_and_bounds() {
        let prompt = build_prompt(&request(), &PromptBounds::default());
        for key in [
            "\"title\"",
            "\"synopsis\"",
            "\"characters\"",
            "\"suggested_props_wardrobe\"",
            "\"custom_props\"",
            "\"scenes\"",
            "\"shots\"",
            "\"shot_description\"",
            "\"spoken_lines\"",
        ] {
            assert!(prompt.text.contains(key), "schema key {key} missing");
        }
        assert!(prompt.text.contains("up to 6 scenes"));
        assert!(prompt.text.contains("2 to 3 shots per scene"));
    }

    #[test]
    fn test_exact_scene_bounds() {
        let bounds = PromptBounds {
            max_scenes: 4,
            exact_scene_count: true,
            min_shots: 3,
            max_shots: 3,
        };
        let prompt = build_prompt(&request(), &bounds);
        assert!(prompt.text.contains("exactly 4 scenes"));
        assert!(prompt.text.contains("exactly 3 shots per scene"));
    }

    #[test]
    fn test_missing_character_count_is_stated() {
        let mut req = request();
        req.number_of_characters = None;
        let prompt = build_prompt(&req, &PromptBounds::default());
        assert!(prompt.text.contains("Number of Characters: Not specified"));
    }

    #[test]
    fn test_conversation_seed_is_user_then_open_brace() {
        let prompt = build_prompt(&request(), &PromptBounds::default());
        let messages = prompt.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, prompt.text);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "{");
    }

    #[test]
    fn test_user_values_cannot_inject_placeholders_or_delimiters() {
        let mut req = request();
        req.story_summary = r#"He said "hi" {location} </input>"#.to_string();
        let prompt = build_prompt(&req, &PromptBounds::default());
        assert!(prompt
            .text
            .contains(r#"Story Summary: He said \"hi\" (location) &lt;/input&gt;"#));
        // The real location is substituted exactly once, on its own line.
        assert_eq!(prompt.text.matches("Back garden").count(), 1);
    }

    #[test]
    fn test_escape_field_drops_control_characters() {
        assert_eq!(escape_field("a\u{0007}b\nc\\d"), "ab\nc\\\\d");
    }

    #[test]
    fn test_image_prompt_mentions_theme_title_and_no_text_rule() {
        let prompt = build_image_prompt(&request(), "Ember's Big Roar");
        assert!(prompt.starts_with("Make a Fantasy movie poster"));
        assert!(prompt.contains("Title: Ember's Big Roar"));
        assert!(prompt.contains("Synopsis: A shy dragon learns to roar"));
        assert!(prompt.contains("NEVER PUT TEXT ON THE MOVIE POSTER"));
    }
}
