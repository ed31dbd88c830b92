//! Document Assembler: maps a `Screenplay` onto the fixed section layout:
//!
//! 1. Cover page: title, cover image or a placeholder line
//! 2. Welcome, how-to-use and filming tips (fixed copy)
//! 3. Your Story: synopsis, characters, props table
//! 4. Scenes: one heading per scene, indented shots with their spoken lines
//! 5. Poster photo guidelines (fixed copy)
//!
//! Output depends only on the screenplay and the image; no timestamps.

use tracing::debug;

use crate::document::boilerplate::{
    emphasized_runs, DEFAULT_SCENE_PROPS, FILMING_TIPS, HOW_TO_USE_BODY, HOW_TO_USE_HEADING,
    NO_IMAGE_PLACEHOLDER, NO_PROPS_PLACEHOLDER, POSTER_HEADING, POSTER_INTRO,
    POSTER_PHOTO_GUIDELINES, TIPS_HEADING, WELCOME_BODY, WELCOME_HEADING, WELCOME_LEAD,
};
use crate::document::image::CoverImage;
use crate::document::model::{Document, Paragraph, ParagraphStyle, Run, Table, TableCell};
use crate::document::package::write_docx;
use crate::document::RenderError;
use crate::screenplay::models::{PropGroup, Scene, Screenplay};

const COVER_IMAGE_WIDTH_INCHES: f32 = 6.0;
const SHOT_INDENT_INCHES: f32 = 0.5;
/// Label column 1.5", prop column 5".
const PROP_TABLE_COLUMNS_TWIPS: [u32; 2] = [2_160, 7_200];

/// Renders the screenplay as `.docx` bytes.
pub fn render_document(
    screenplay: &Screenplay,
    cover: Option<&CoverImage>,
) -> Result<Vec<u8>, RenderError> {
    let doc = assemble_document(screenplay, cover)?;
    let bytes = write_docx(&doc)?;
    debug!(
        "Rendered '{}' ({} blocks, {} bytes)",
        screenplay.title_or_default(),
        doc.blocks.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// Builds the document tree without packaging it.
pub fn assemble_document(
    screenplay: &Screenplay,
    cover: Option<&CoverImage>,
) -> Result<Document, RenderError> {
    let missing = screenplay.missing_fields();
    if !missing.is_empty() {
        return Err(RenderError::MissingField(missing.join(", ")));
    }

    let mut doc = Document::new();
    add_cover_page(&mut doc, screenplay.title_or_default(), cover);
    add_front_matter(&mut doc);
    add_story_section(&mut doc, screenplay);
    add_scenes(&mut doc, &screenplay.scenes);
    add_poster_checklist(&mut doc);
    Ok(doc)
}

fn add_cover_page(doc: &mut Document, title: &str, cover: Option<&CoverImage>) {
    doc.add_heading(title, 0);
    match cover {
        Some(image) => doc.add_picture(image.clone(), COVER_IMAGE_WIDTH_INCHES),
        None => {
            doc.add_paragraph(NO_IMAGE_PLACEHOLDER);
        }
    }
    doc.add_page_break();
}

fn add_front_matter(doc: &mut Document) {
    doc.add_heading(WELCOME_HEADING, 1);
    doc.push_paragraph(
        Paragraph::new(ParagraphStyle::Normal)
            .with_run(Run::bold(WELCOME_LEAD))
            .with_run(Run::plain(WELCOME_BODY)),
    );

    doc.add_heading(HOW_TO_USE_HEADING, 1);
    doc.add_paragraph(HOW_TO_USE_BODY);

    doc.add_heading(TIPS_HEADING, 1);
    add_bullets(doc, FILMING_TIPS);
    doc.add_page_break();
}

fn add_story_section(doc: &mut Document, screenplay: &Screenplay) {
    doc.add_heading("Your Story", 1);
    doc.add_heading("Synopsis", 1);
    doc.add_paragraph(screenplay.synopsis.as_str());
    doc.add_heading("Characters", 1);
    doc.add_paragraph(screenplay.characters.as_str());

    doc.add_heading("Props", 1);
    match props_table(&screenplay.props) {
        Some(table) => doc.add_table(table),
        None => {
            doc.add_paragraph(NO_PROPS_PLACEHOLDER);
        }
    }
    doc.add_page_break();
}

/// One contiguous block of rows per non-empty prop group. The first column of a
/// block is a single vertically merged cell carrying the group's label.
/// Returns `None` when there is nothing to list.
fn props_table(groups: &[PropGroup]) -> Option<Table> {
    let mut rows = Vec::new();
    for group in groups.iter().filter(|g| !g.items.is_empty()) {
        for (i, item) in group.items.iter().enumerate() {
            let label = if i == 0 {
                TableCell::merge_start(group.source.label())
            } else {
                TableCell::merge_continue()
            };
            rows.push(vec![label, TableCell::text(item.as_str())]);
        }
    }

    (!rows.is_empty()).then(|| Table {
        column_widths_twips: PROP_TABLE_COLUMNS_TWIPS.to_vec(),
        rows,
    })
}

fn add_scenes(doc: &mut Document, scenes: &[Scene]) {
    doc.add_heading("Scenes", 1);
    for scene in scenes {
        doc.add_heading(format!("Scene {}", scene.scene_number.unwrap_or_default()), 2);
        doc.add_paragraph(scene.scene_breakdown.as_deref().unwrap_or_default());

        let props = scene.scene_props.as_deref().unwrap_or(DEFAULT_SCENE_PROPS);
        doc.push_paragraph(
            Paragraph::new(ParagraphStyle::Normal)
                .with_run(Run::bold("Props needed:\n"))
                .with_run(Run::plain(props)),
        );

        for shot in &scene.shots {
            doc.push_paragraph(
                Paragraph::new(ParagraphStyle::Heading(3))
                    .indented(SHOT_INDENT_INCHES)
                    .with_run(Run::plain(format!(
                        "Shot {}",
                        shot.shot_number.unwrap_or_default()
                    ))),
            );
            doc.push_paragraph(
                Paragraph::new(ParagraphStyle::Normal)
                    .indented(SHOT_INDENT_INCHES)
                    .with_run(Run::plain(shot.shot_description.as_deref().unwrap_or_default())),
            );
            if !shot.spoken_lines.is_empty() {
                doc.push_paragraph(
                    Paragraph::new(ParagraphStyle::Quote)
                        .indented(SHOT_INDENT_INCHES)
                        .with_run(Run::plain(shot.spoken_lines.join("\n"))),
                );
            }
        }
    }
}

fn add_poster_checklist(doc: &mut Document) {
    doc.add_page_break();
    doc.add_heading(POSTER_HEADING, 1);
    doc.add_paragraph(POSTER_INTRO);
    add_bullets(doc, POSTER_PHOTO_GUIDELINES);
}

fn add_bullets(doc: &mut Document, items: &[&str]) {
    for item in items {
        let mut paragraph = Paragraph::new(ParagraphStyle::ListBullet);
        paragraph.runs = emphasized_runs(item);
        doc.push_paragraph(paragraph);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::model::{Block, CellMerge};
    use crate::document::package::tests::read_part;
    use crate::screenplay::models::{PropSource, Shot};
    use crate::screenplay::recover_screenplay;

    fn shot(number: u32, description: &str, lines: &[&str]) -> Shot {
        Shot {
            shot_number: Some(number),
            shot_description: Some(description.to_string()),
            spoken_lines: lines.iter().map(|l| l.to_string()).collect(),
        }
    }

    fn screenplay() -> Screenplay {
        Screenplay {
            title: Some("The Crown Quest".to_string()),
            synopsis: "Two knights search the castle for a stolen crown.".to_string(),
            characters: "Mia - Hero\nLeo - Sidekick".to_string(),
            props: vec![
                PropGroup::from_comma_list(PropSource::Suggested, "Cape, Crown, Shield"),
                PropGroup::from_comma_list(PropSource::Provided, "Toy dragon, Blanket"),
            ],
            scenes: vec![
                Scene {
                    scene_number: Some(1),
                    scene_breakdown: Some("INT. LIVING ROOM - DAY. A cardboard castle.".to_string()),
                    scene_props: Some("Cape, Crown".to_string()),
                    shots: vec![
                        shot(1, "Wide shot of the castle", &["A: hi", "B: hi back"]),
                        shot(2, "Close-up on the pillow", &["Mia: The crown is gone!"]),
                    ],
                },
                Scene {
                    scene_number: Some(2),
                    scene_breakdown: Some("EXT. GARDEN - DAY. The dragon sleeps.".to_string()),
                    scene_props: None,
                    shots: vec![shot(1, "Low angle on the dragon", &["Leo: Shh!"])],
                },
            ],
        }
    }

    fn paragraph_texts(doc: &Document) -> Vec<String> {
        doc.paragraphs().map(Paragraph::text).collect()
    }

    fn headings(doc: &Document, style: ParagraphStyle) -> Vec<String> {
        doc.paragraphs()
            .filter(|p| p.style == style)
            .map(Paragraph::text)
            .collect()
    }

    fn tables(doc: &Document) -> Vec<&Table> {
        doc.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Table(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_sections_appear_in_fixed_order() {
        let doc = assemble_document(&screenplay(), None).unwrap();
        assert_eq!(headings(&doc, ParagraphStyle::Title), vec!["The Crown Quest"]);
        assert_eq!(
            headings(&doc, ParagraphStyle::Heading(1)),
            vec![
                WELCOME_HEADING,
                HOW_TO_USE_HEADING,
                TIPS_HEADING,
                "Your Story",
                "Synopsis",
                "Characters",
                "Props",
                "Scenes",
                POSTER_HEADING,
            ]
        );
        assert_eq!(headings(&doc, ParagraphStyle::Heading(2)), vec!["Scene 1", "Scene 2"]);
        assert_eq!(
            headings(&doc, ParagraphStyle::Heading(3)),
            vec!["Shot 1", "Shot 2", "Shot 1"]
        );
        let page_breaks = doc.blocks.iter().filter(|b| **b == Block::PageBreak).count();
        assert_eq!(page_breaks, 4);
    }

    #[test]
    fn test_missing_image_renders_placeholder() {
        let doc = assemble_document(&screenplay(), None).unwrap();
        assert_eq!(paragraph_texts(&doc)[1], NO_IMAGE_PLACEHOLDER);
        assert!(doc.images.is_empty());
    }

    #[test]
    fn test_cover_image_is_embedded_after_title() {
        let image = CoverImage::test_png(40, 20);
        let doc = assemble_document(&screenplay(), Some(&image)).unwrap();
        assert_eq!(doc.images.len(), 1);
        let second = doc.paragraphs().nth(1).unwrap();
        assert!(matches!(second.runs[0], Run::Picture { image: 0, .. }));
        assert!(!paragraph_texts(&doc).contains(&NO_IMAGE_PLACEHOLDER.to_string()));
    }

    #[test]
    fn test_props_table_has_one_merged_block_per_source() {
        let doc = assemble_document(&screenplay(), None).unwrap();
        let tables = tables(&doc);
        assert_eq!(tables.len(), 1);
        let table = tables[0];
        assert_eq!(table.rows.len(), 5);

        let labels: Vec<(&str, CellMerge)> = table
            .rows
            .iter()
            .map(|row| (row[0].text.as_str(), row[0].merge))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("Suggested", CellMerge::Restart),
                ("", CellMerge::Continue),
                ("", CellMerge::Continue),
                ("Provided", CellMerge::Restart),
                ("", CellMerge::Continue),
            ]
        );
        let names: Vec<&str> = table.rows.iter().map(|row| row[1].text.as_str()).collect();
        assert_eq!(names, vec!["Cape", "Crown", "Shield", "Toy dragon", "Blanket"]);
    }

    #[test]
    fn test_empty_custom_props_omits_provided_block() {
        let mut sp = screenplay();
        sp.props[1] = PropGroup::from_comma_list(PropSource::Provided, "");
        let doc = assemble_document(&sp, None).unwrap();
        let table = tables(&doc)[0];
        assert_eq!(table.rows.len(), 3);
        assert!(table.rows.iter().all(|row| row[0].text != "Provided"));
        assert!(render_document(&sp, None).is_ok());
    }

    #[test]
    fn test_no_props_at_all_replaces_table_with_placeholder() {
        let mut sp = screenplay();
        sp.props = vec![
            PropGroup::from_comma_list(PropSource::Suggested, " , "),
            PropGroup::from_comma_list(PropSource::Provided, ""),
        ];
        let doc = assemble_document(&sp, None).unwrap();
        assert!(tables(&doc).is_empty());
        assert!(paragraph_texts(&doc).contains(&NO_PROPS_PLACEHOLDER.to_string()));
    }

    #[test]
    fn test_single_prop_block_is_a_one_row_merge() {
        let table = props_table(&[PropGroup::from_comma_list(PropSource::Included, "Sword")]).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][0], TableCell::merge_start("Included"));
    }

    #[test]
    fn test_spoken_lines_share_one_indented_quote_block() {
        let doc = assemble_document(&screenplay(), None).unwrap();
        let quote = doc
            .paragraphs()
            .find(|p| p.style == ParagraphStyle::Quote)
            .unwrap();
        assert_eq!(quote.text(), "A: hi\nB: hi back");
        assert_eq!(quote.left_indent_twips, 720);
    }

    #[test]
    fn test_shot_heading_and_description_are_indented() {
        let doc = assemble_document(&screenplay(), None).unwrap();
        let shot_heading = doc
            .paragraphs()
            .find(|p| p.style == ParagraphStyle::Heading(3))
            .unwrap();
        assert_eq!(shot_heading.left_indent_twips, 720);
        let description = doc
            .paragraphs()
            .find(|p| p.text() == "Wide shot of the castle")
            .unwrap();
        assert_eq!(description.left_indent_twips, 720);
    }

    #[test]
    fn test_absent_scene_props_use_default_text() {
        let doc = assemble_document(&screenplay(), None).unwrap();
        let props_paragraphs: Vec<String> = paragraph_texts(&doc)
            .into_iter()
            .filter(|t| t.starts_with("Props needed:"))
            .collect();
        assert_eq!(
            props_paragraphs,
            vec![
                "Props needed:\nCape, Crown".to_string(),
                format!("Props needed:\n{DEFAULT_SCENE_PROPS}"),
            ]
        );
    }

    #[test]
    fn test_scene_numbers_are_rendered_as_given() {
        let mut sp = screenplay();
        sp.scenes[0].scene_number = Some(4);
        let doc = assemble_document(&sp, None).unwrap();
        assert_eq!(headings(&doc, ParagraphStyle::Heading(2)), vec!["Scene 4", "Scene 2"]);
    }

    #[test]
    fn test_every_breakdown_and_line_survives_in_order() {
        let sp = screenplay();
        let bytes = render_document(&sp, None).unwrap();
        let xml = read_part(&bytes, "word/document.xml");

        let mut expected: Vec<&str> = Vec::new();
        for scene in &sp.scenes {
            expected.push(scene.scene_breakdown.as_deref().unwrap());
            for shot in &scene.shots {
                expected.extend(shot.spoken_lines.iter().map(String::as_str));
            }
        }

        let mut cursor = 0;
        for text in expected {
            let found = xml[cursor..]
                .find(text)
                .unwrap_or_else(|| panic!("{text:?} missing or out of order"));
            cursor += found + text.len();
        }
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let image = CoverImage::test_png(16, 9);
        let first = render_document(&screenplay(), Some(&image)).unwrap();
        let second = render_document(&screenplay(), Some(&image)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_title_or_scenes_is_a_render_error() {
        let mut sp = screenplay();
        sp.title = Some("  ".to_string());
        assert!(matches!(
            assemble_document(&sp, None),
            Err(RenderError::MissingField(f)) if f == "title"
        ));

        let mut sp = screenplay();
        sp.scenes.clear();
        assert!(matches!(
            assemble_document(&sp, None),
            Err(RenderError::MissingField(f)) if f == "scenes"
        ));
    }

    #[test]
    fn test_absent_scene_and_shot_fields_are_named() {
        let mut sp = screenplay();
        sp.scenes[1].scene_breakdown = None;
        sp.scenes[0].shots[1].shot_description = None;
        match render_document(&sp, None) {
            Err(RenderError::MissingField(fields)) => assert_eq!(
                fields,
                "scenes[0].shots[1].shot_description, scenes[1].scene_breakdown"
            ),
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn test_recovered_object_without_scenes_cannot_be_rendered() {
        let sp = recover_screenplay(r#""title":"Title","synopsis":"X"}trailing junk"#).unwrap();
        assert_eq!(sp.synopsis, "X");
        assert!(matches!(
            render_document(&sp, None),
            Err(RenderError::MissingField(f)) if f == "scenes"
        ));
    }

    #[test]
    fn test_tips_are_bullets_with_bold_leads() {
        let doc = assemble_document(&screenplay(), None).unwrap();
        let bullets: Vec<&Paragraph> = doc
            .paragraphs()
            .filter(|p| p.style == ParagraphStyle::ListBullet)
            .collect();
        assert_eq!(bullets.len(), FILMING_TIPS.len() + POSTER_PHOTO_GUIDELINES.len());
        assert_eq!(bullets[0].runs[0], Run::bold("Use a SMARTPHONE"));
    }
}
