//! Screenplay generation pipeline.
//!
//! Flow: validate → build_prompt → text service → recover_screenplay →
//!       bounds check → preview → (optional) cover image.
//!
//! Every stage depends on the previous one, so the pipeline runs strictly in
//! sequence. Any failure aborts the run; callers keep whatever they had before.

use std::collections::HashSet;

use bytes::Bytes;
use tracing::{info, warn};

use crate::document::CoverImage;
use crate::errors::AppError;
use crate::image_client::ImageGenerator;
use crate::llm_client::TextGenerator;
use crate::screenplay::models::{Screenplay, ScreenplayRequest};
use crate::screenplay::preview::screenplay_text;
use crate::screenplay::prompt_builder::build_image_prompt;
use crate::screenplay::{build_prompt, recover_screenplay, PromptBounds};

const DEFAULT_DOCUMENT_NAME: &str = "screenplay";

/// Everything one successful generation run produces.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub request: ScreenplayRequest,
    pub screenplay: Screenplay,
    pub preview: String,
    /// Kept so the cover can be regenerated without rebuilding it.
    pub image_prompt: String,
    /// Decoded cover images in service order. Empty unless a cover was requested.
    pub covers: Vec<CoverImage>,
}

/// Runs the full pipeline for one request.
pub async fn generate_screenplay(
    llm: &dyn TextGenerator,
    images: &dyn ImageGenerator,
    bounds: &PromptBounds,
    request: ScreenplayRequest,
    with_cover: bool,
) -> Result<GenerationOutcome, AppError> {
    request.validate()?;

    let prompt = build_prompt(&request, bounds);
    let raw_text = llm.complete(&prompt.messages()).await?;

    let screenplay = recover_screenplay(&raw_text)?;
    let missing = screenplay.missing_fields();
    if !missing.is_empty() {
        return Err(AppError::Schema(format!(
            "screenplay is missing required field(s): {}",
            missing.join(", ")
        )));
    }
    check_bounds(&screenplay, bounds);
    info!(
        "Recovered '{}' ({} scenes, {} shots)",
        screenplay.title_or_default(),
        screenplay.scenes.len(),
        screenplay.shot_count()
    );

    let preview = screenplay_text(&screenplay);
    let image_prompt = build_image_prompt(&request, screenplay.title_or_default());

    let covers = if with_cover {
        generate_covers(images, &image_prompt).await?
    } else {
        Vec::new()
    };

    Ok(GenerationOutcome {
        request,
        screenplay,
        preview,
        image_prompt,
        covers,
    })
}

/// Requests cover images for `image_prompt` and decodes each one.
/// Always returns at least one image on success.
pub async fn generate_covers(
    images: &dyn ImageGenerator,
    image_prompt: &str,
) -> Result<Vec<CoverImage>, AppError> {
    let blobs = images.generate(image_prompt).await?;
    if blobs.is_empty() {
        return Err(AppError::Upstream(
            "image generation returned no images".to_string(),
        ));
    }

    blobs.into_iter().map(decode_cover).collect()
}

fn decode_cover(bytes: Bytes) -> Result<CoverImage, AppError> {
    CoverImage::from_bytes(bytes).map_err(|e| {
        AppError::Upstream(format!("image service returned an unusable image: {e}"))
    })
}

/// Screenplays outside the prompt bounds are still accepted; the deviation is logged.
fn check_bounds(screenplay: &Screenplay, bounds: &PromptBounds) {
    let scene_count = screenplay.scenes.len();
    let max_scenes = usize::from(bounds.max_scenes);
    if scene_count > max_scenes || (bounds.exact_scene_count && scene_count != max_scenes) {
        warn!(
            "'{}' has {scene_count} scenes, asked for {}",
            screenplay.title_or_default(),
            bounds.scene_rule()
        );
    }

    let shot_range = usize::from(bounds.min_shots)..=usize::from(bounds.max_shots);
    for scene in &screenplay.scenes {
        if !shot_range.contains(&scene.shots.len()) {
            warn!(
                "Scene {} has {} shots, asked for {}",
                scene.scene_number.unwrap_or_default(),
                scene.shots.len(),
                bounds.shot_rule()
            );
        }
    }

    let mut seen = HashSet::new();
    for scene in &screenplay.scenes {
        if !seen.insert(scene.scene_number) {
            warn!(
                "Duplicate scene number {} kept as given",
                scene.scene_number.unwrap_or_default()
            );
        }
    }
}

/// Download name for the rendered document. Path separators and quotes are
/// stripped; `.docx` is appended when missing; blank names get a default.
pub fn document_file_name(requested: Option<&str>) -> String {
    let cleaned: String = requested
        .unwrap_or_default()
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '"' | '\'') && !c.is_control())
        .collect();
    let cleaned = cleaned.trim();

    let stem = if cleaned.is_empty() {
        DEFAULT_DOCUMENT_NAME
    } else {
        cleaned
    };

    if stem.to_ascii_lowercase().ends_with(".docx") {
        stem.to_string()
    } else {
        format!("{stem}.docx")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::document::image::png_bytes;
    use crate::image_client::ImageError;
    use crate::llm_client::{LlmError, Message, Role};

    pub(crate) const CONTINUATION: &str = r#""title": "The Crown Quest",
  "synopsis": "Mia and Leo search the house for a stolen crown.",
  "characters": ["Mia - Hero", "Leo - Sidekick"],
  "suggested_props_wardrobe": "Cape, Crown",
  "custom_props": "Toy dragon",
  "scenes": [
    {
      "scene_number": 1,
      "scene_breakdown": "INT. LIVING ROOM - DAY. A pillow fort castle.",
      "scene_props": "Crown",
      "shots": [
        {"shot_number": 1, "shot_description": "Wide shot of the fort", "spoken_lines": ["Mia: The crown is gone!"]},
        {"shot_number": 2, "shot_description": "Close-up on Leo", "spoken_lines": ["Leo: Not again!"]}
      ]
    }
  ]
}
Hope you enjoy the screenplay!"#;

    /// Replies with a fixed continuation and records the last prompt it saw.
    pub(crate) struct ScriptedText {
        pub reply: Result<String, u64>,
        pub last_prompt: std::sync::Mutex<Option<String>>,
    }

    impl ScriptedText {
        pub(crate) fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                last_prompt: std::sync::Mutex::new(None),
            }
        }

        pub(crate) fn timing_out(secs: u64) -> Self {
            Self {
                reply: Err(secs),
                last_prompt: std::sync::Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedText {
        async fn complete(&self, messages: &[Message<'_>]) -> Result<String, LlmError> {
            assert_eq!(messages.len(), 2);
            assert_eq!(messages[1].role, Role::Assistant);
            *self.last_prompt.lock().unwrap() = Some(messages[0].content.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(secs) => Err(LlmError::Timeout { secs: *secs }),
            }
        }
    }

    /// Returns one PNG per call, each a different width so covers are distinguishable.
    pub(crate) struct CountingImages {
        pub calls: AtomicUsize,
        pub per_call: usize,
    }

    impl CountingImages {
        pub(crate) fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                per_call: 1,
            }
        }
    }

    #[async_trait]
    impl ImageGenerator for CountingImages {
        async fn generate(&self, _prompt: &str) -> Result<Vec<Bytes>, ImageError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) as u32;
            Ok((0..self.per_call as u32)
                .map(|i| Bytes::from(png_bytes(10 + call * 10 + i, 5)))
                .collect())
        }
    }

    struct BrokenImages;

    #[async_trait]
    impl ImageGenerator for BrokenImages {
        async fn generate(&self, _prompt: &str) -> Result<Vec<Bytes>, ImageError> {
            Ok(vec![Bytes::from_static(b"<html>rate limited</html>")])
        }
    }

    pub(crate) fn request() -> ScreenplayRequest {
        ScreenplayRequest {
            theme: "Medieval".to_string(),
            story_summary: "Two knights search for a stolen crown".to_string(),
            number_of_characters: Some(2),
            characters: "Mia - Hero, Leo - Sidekick".to_string(),
            props: "Toy dragon".to_string(),
            vfx: false,
            drones: false,
            location: "Living room".to_string(),
        }
    }

    #[tokio::test]
    async fn test_pipeline_produces_screenplay_and_preview() {
        let llm = ScriptedText::replying(CONTINUATION);
        let images = CountingImages::new();
        let outcome = generate_screenplay(&llm, &images, &PromptBounds::default(), request(), false)
            .await
            .unwrap();

        assert_eq!(outcome.screenplay.title.as_deref(), Some("The Crown Quest"));
        assert_eq!(outcome.screenplay.characters, "Mia - Hero\nLeo - Sidekick");
        assert!(outcome.preview.contains("Scene Number: 1"));
        assert!(outcome.image_prompt.contains("The Crown Quest"));
        assert!(outcome.covers.is_empty());
        assert_eq!(images.calls.load(Ordering::SeqCst), 0);

        let prompt = llm.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("Living room"));
    }

    #[tokio::test]
    async fn test_cover_is_decoded_when_requested() {
        let llm = ScriptedText::replying(CONTINUATION);
        let images = CountingImages::new();
        let outcome = generate_screenplay(&llm, &images, &PromptBounds::default(), request(), true)
            .await
            .unwrap();
        assert_eq!(outcome.covers.len(), 1);
        assert_eq!(outcome.covers[0].width_px, 10);
    }

    #[tokio::test]
    async fn test_incomplete_request_never_reaches_the_service() {
        let llm = ScriptedText::replying(CONTINUATION);
        let mut req = request();
        req.location = "  ".to_string();
        let err = generate_screenplay(&llm, &CountingImages::new(), &PromptBounds::default(), req, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InputIncomplete(_)));
        assert!(llm.last_prompt.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_timeout_is_an_upstream_failure() {
        let llm = ScriptedText::timing_out(120);
        let err = generate_screenplay(&llm, &CountingImages::new(), &PromptBounds::default(), request(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(msg) if msg.contains("120s")));
    }

    #[tokio::test]
    async fn test_unrecoverable_reply_keeps_raw_text() {
        let llm = ScriptedText::replying("Sorry, I can't help with that.");
        let err = generate_screenplay(&llm, &CountingImages::new(), &PromptBounds::default(), request(), false)
            .await
            .unwrap_err();
        match err {
            AppError::Parse { raw_text, .. } => {
                assert_eq!(raw_text, "Sorry, I can't help with that.")
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reply_without_scenes_is_a_schema_error() {
        let llm = ScriptedText::replying(r#""title":"Title","synopsis":"X"}trailing junk"#);
        let images = CountingImages::new();
        let err = generate_screenplay(&llm, &images, &PromptBounds::default(), request(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Schema(msg) if msg.ends_with("field(s): scenes")));
        assert_eq!(images.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_out_of_bounds_screenplay_is_still_accepted() {
        let llm = ScriptedText::replying(CONTINUATION);
        let bounds = PromptBounds {
            max_scenes: 3,
            exact_scene_count: true,
            min_shots: 3,
            max_shots: 3,
        };
        let outcome = generate_screenplay(&llm, &CountingImages::new(), &bounds, request(), false)
            .await
            .unwrap();
        assert_eq!(outcome.screenplay.scenes.len(), 1);
    }

    #[tokio::test]
    async fn test_every_returned_image_is_decoded() {
        let images = CountingImages {
            calls: AtomicUsize::new(0),
            per_call: 2,
        };
        let covers = generate_covers(&images, "poster").await.unwrap();
        let widths: Vec<u32> = covers.iter().map(|c| c.width_px).collect();
        assert_eq!(widths, vec![10, 11]);
    }

    #[tokio::test]
    async fn test_unusable_image_bytes_are_an_upstream_failure() {
        let err = generate_covers(&BrokenImages, "poster").await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(msg) if msg.contains("unusable image")));
    }

    #[test]
    fn test_document_file_name() {
        assert_eq!(document_file_name(None), "screenplay.docx");
        assert_eq!(document_file_name(Some("   ")), "screenplay.docx");
        assert_eq!(document_file_name(Some("Crown Quest")), "Crown Quest.docx");
        assert_eq!(document_file_name(Some("final.DOCX")), "final.DOCX");
        assert_eq!(
            document_file_name(Some("../etc/\"passwd\"")),
            "..etcpasswd.docx"
        );
    }
}
