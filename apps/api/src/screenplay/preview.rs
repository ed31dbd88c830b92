//! Plain-text preview of a screenplay, shown next to the form before download.
//! Every value gets its own paragraph; scene and shot numbers are labelled.
//! Absent values are skipped.

use crate::screenplay::models::Screenplay;

pub fn screenplay_text(screenplay: &Screenplay) -> String {
    let mut parts: Vec<String> = vec![
        screenplay.title.clone().unwrap_or_default(),
        screenplay.synopsis.clone(),
        screenplay.characters.clone(),
    ];

    for scene in &screenplay.scenes {
        if let Some(number) = scene.scene_number {
            parts.push(format!("Scene Number: {number}"));
        }
        parts.extend(scene.scene_breakdown.iter().cloned());
        parts.extend(scene.scene_props.iter().cloned());
        for shot in &scene.shots {
            if let Some(number) = shot.shot_number {
                parts.push(format!("Shot Number: {number}"));
            }
            parts.extend(shot.shot_description.iter().cloned());
            parts.extend(shot.spoken_lines.iter().cloned());
        }
    }

    for group in screenplay.props.iter().filter(|g| !g.items.is_empty()) {
        parts.push(format!("{} props: {}", group.source.label(), group.items.join(", ")));
    }

    parts.retain(|p| !p.trim().is_empty());
    parts.join("\n\n")
}
