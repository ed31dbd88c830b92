// Fixed copy for the instructional pages. Not derived from the screenplay.
// `**text**` marks a bold lead phrase; see `emphasized_runs`.

use crate::document::model::Run;

pub const WELCOME_HEADING: &str = "Welcome to your Personalized KidVentures Video";

pub const WELCOME_LEAD: &str = "Thank you for choosing KidVenture Studios! ";

pub const WELCOME_BODY: &str = "🎬✨ We're thrilled to bring your vision to life with a script \
designed especially for YOU. Follow the steps below to ensure a stress-free and fun-filled \
experience, packed with action, drama, or maybe a few dino-roars 🦖 (we won't judge). So grab \
your camera, call in your co-stars (even if it's just the family dog 🐾), and get ready to \
shout, \"Action!\"";

pub const HOW_TO_USE_HEADING: &str = "How to Use";

pub const HOW_TO_USE_BODY: &str = "Use this script as a guide from top-to-bottom for your \
children's adventure film. Encourage improvisation and let the kids add their own ideas. Focus \
on capturing the fun and imagination rather than perfect line delivery.";

pub const TIPS_HEADING: &str = "Helpful Tips";

pub const FILMING_TIPS: &[&str] = &[
    "**Use a SMARTPHONE** in LANDSCAPE mode for filming",
    "**Use natural light** - film outdoors or near windows whenever possible",
    "**Steady your shots** - keep your camera still with steady movement and avoid shake",
    "**Clean your lens** - remove any unintended debris or dirt",
    "**Mind your sound** - minimize background noise and speak lines clearly",
    "**Frame subject** - ensure the person or item of importance is within shot, not cut off",
    "**Save each clip** with scene and shot number, ie- SCENE1_SHOT1",
];

pub const NO_IMAGE_PLACEHOLDER: &str = "No image";

pub const NO_PROPS_PLACEHOLDER: &str = "No props listed.";

pub const DEFAULT_SCENE_PROPS: &str = "No specific props listed.";

pub const POSTER_HEADING: &str = "Photos for Your Movie Poster";

pub const POSTER_INTRO: &str = "Your finished film comes with a custom movie poster. Send us a \
few photos of your stars and we'll do the rest. For the best results:";

pub const POSTER_PHOTO_GUIDELINES: &[&str] = &[
    "**One star per photo** - take a separate photo of each character",
    "**Full costume** - shoot in the wardrobe and props used in the film",
    "**Plain background** - stand in front of a wall or door without clutter",
    "**Good light** - face a window or shoot outdoors in the shade",
    "**Hold the phone upright** - portrait mode, with a little space above the head",
    "**Show some attitude** - heroic poses and big expressions make the best posters",
    "**No filters** - send the original, unedited photos at full resolution",
];

/// Splits `**bold**` markup into runs. Odd segments are bold.
pub fn emphasized_runs(text: &str) -> Vec<Run> {
    text.split("**")
        .enumerate()
        .filter(|(_, part)| !part.is_empty())
        .map(|(i, part)| {
            if i % 2 == 1 {
                Run::bold(part)
            } else {
                Run::plain(part)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lead_phrase_is_bold() {
        let runs = emphasized_runs("**Clean your lens** - remove any debris");
        assert_eq!(
            runs,
            vec![Run::bold("Clean your lens"), Run::plain(" - remove any debris")]
        );
    }

    #[test]
    fn test_text_without_markup_is_one_plain_run() {
        assert_eq!(emphasized_runs("plain"), vec![Run::plain("plain")]);
    }

    #[test]
    fn test_every_tip_has_a_bold_lead() {
        for tip in FILMING_TIPS.iter().chain(POSTER_PHOTO_GUIDELINES) {
            let runs = emphasized_runs(tip);
            assert!(
                matches!(runs.first(), Some(Run::Text { bold: true, .. })),
                "tip without bold lead: {tip}"
            );
        }
    }
}
