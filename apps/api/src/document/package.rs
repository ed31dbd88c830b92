//! Office Open XML packaging: serializes a `Document` into `.docx` bytes.
//!
//! The package holds only the parts the document uses (main document, styles,
//! bullet numbering, media). No `docProps/core.xml` is written and every zip
//! entry carries the same fixed timestamp, so identical documents produce
//! identical bytes. All markup goes through `XmlWriter`.

use std::collections::BTreeSet;
use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::document::model::{Block, CellMerge, Document, Paragraph, Run, Table, TWIPS_PER_INCH};
use crate::document::xml::{XmlResult, XmlWriter};
use crate::document::RenderError;

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const NS_PACKAGE_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Relationship ids 1 and 2 are styles and numbering; images follow.
const FIRST_IMAGE_REL: usize = 3;

/// US Letter, 1" margins, footer 0.1" from the edge.
const PAGE_WIDTH_TWIPS: u32 = 12_240;
const PAGE_HEIGHT_TWIPS: u32 = 15_840;
const MARGIN_TWIPS: u32 = TWIPS_PER_INCH;
const HEADER_DISTANCE_TWIPS: u32 = TWIPS_PER_INCH / 2;
const FOOTER_DISTANCE_TWIPS: u32 = TWIPS_PER_INCH / 10;

const BODY_FONT: &str = "Calibri";
/// Half-points.
const BODY_FONT_SIZE: u32 = 22;
/// Bullet indent shared by the ListBullet style and the numbering level.
const BULLET_INDENT: [(&str, &str); 2] = [("w:left", "720"), ("w:hanging", "360")];

pub fn write_docx(doc: &Document) -> Result<Vec<u8>, RenderError> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut parts: Vec<(String, Vec<u8>)> = vec![
        ("[Content_Types].xml".to_string(), content_types_xml(doc)?),
        ("_rels/.rels".to_string(), package_rels_xml()?),
        ("word/document.xml".to_string(), document_xml(doc)?),
        ("word/_rels/document.xml.rels".to_string(), document_rels_xml(doc)?),
        ("word/styles.xml".to_string(), styles_xml()?),
        ("word/numbering.xml".to_string(), numbering_xml()?),
    ];
    for (i, image) in doc.images.iter().enumerate() {
        parts.push((format!("word/{}", media_path(i, image.format.extension())), image.bytes.to_vec()));
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in parts {
        zip.start_file(name, options.clone())?;
        zip.write_all(&data)?;
    }
    Ok(zip.finish()?.into_inner())
}

fn media_path(index: usize, extension: &str) -> String {
    format!("media/image{}.{extension}", index + 1)
}

fn rel_type(kind: &str) -> String {
    format!("{NS_R}/{kind}")
}

// ────────────────────────────────────────────────────────────────────────────
// Package parts
// ────────────────────────────────────────────────────────────────────────────

type Part = Result<Vec<u8>, quick_xml::Error>;

fn content_types_xml(doc: &Document) -> Part {
    let image_defaults: BTreeSet<(&str, &str)> = doc
        .images
        .iter()
        .map(|img| (img.format.extension(), img.format.content_type()))
        .collect();
    let main_type = format!("{DOCX_CONTENT_TYPE}.main+xml");

    let mut w = XmlWriter::new()?;
    w.element("Types", &[("xmlns", NS_CONTENT_TYPES)], |w| {
        w.empty(
            "Default",
            &[
                ("Extension", "rels"),
                ("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
            ],
        )?;
        w.empty("Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;
        for (ext, content_type) in image_defaults {
            w.empty("Default", &[("Extension", ext), ("ContentType", content_type)])?;
        }
        w.empty(
            "Override",
            &[("PartName", "/word/document.xml"), ("ContentType", main_type.as_str())],
        )?;
        w.empty(
            "Override",
            &[
                ("PartName", "/word/styles.xml"),
                ("ContentType", "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"),
            ],
        )?;
        w.empty(
            "Override",
            &[
                ("PartName", "/word/numbering.xml"),
                ("ContentType", "application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"),
            ],
        )
    })?;
    Ok(w.finish())
}

fn relationships(rels: &[(String, String, String)]) -> Part {
    let mut w = XmlWriter::new()?;
    w.element("Relationships", &[("xmlns", NS_PACKAGE_RELS)], |w| {
        for (id, kind, target) in rels {
            w.empty("Relationship", &[("Id", id.as_str()), ("Type", kind.as_str()), ("Target", target.as_str())])?;
        }
        Ok(())
    })?;
    Ok(w.finish())
}

fn package_rels_xml() -> Part {
    relationships(&[(
        "rId1".to_string(),
        rel_type("officeDocument"),
        "word/document.xml".to_string(),
    )])
}

fn document_rels_xml(doc: &Document) -> Part {
    let mut rels = vec![
        ("rId1".to_string(), rel_type("styles"), "styles.xml".to_string()),
        ("rId2".to_string(), rel_type("numbering"), "numbering.xml".to_string()),
    ];
    for (i, image) in doc.images.iter().enumerate() {
        rels.push((
            format!("rId{}", i + FIRST_IMAGE_REL),
            rel_type("image"),
            media_path(i, image.format.extension()),
        ));
    }
    relationships(&rels)
}

fn document_xml(doc: &Document) -> Part {
    let namespaces = [
        ("xmlns:w", NS_W),
        ("xmlns:r", NS_R),
        ("xmlns:wp", NS_WP),
        ("xmlns:a", NS_A),
        ("xmlns:pic", NS_PIC),
    ];
    let mut w = XmlWriter::new()?;
    w.element("w:document", &namespaces, |w| {
        w.element("w:body", &[], |w| {
            for block in &doc.blocks {
                match block {
                    Block::Paragraph(p) => write_paragraph(w, p, doc)?,
                    Block::Table(t) => write_table(w, t)?,
                    Block::PageBreak => w.element("w:p", &[], |w| {
                        w.element("w:r", &[], |w| w.empty("w:br", &[("w:type", "page")]))
                    })?,
                }
            }
            write_section(w)
        })
    })?;
    Ok(w.finish())
}

fn write_section(w: &mut XmlWriter) -> XmlResult {
    let margin = MARGIN_TWIPS.to_string();
    w.element("w:sectPr", &[], |w| {
        w.empty(
            "w:pgSz",
            &[
                ("w:w", PAGE_WIDTH_TWIPS.to_string().as_str()),
                ("w:h", PAGE_HEIGHT_TWIPS.to_string().as_str()),
            ],
        )?;
        w.empty(
            "w:pgMar",
            &[
                ("w:top", margin.as_str()),
                ("w:right", margin.as_str()),
                ("w:bottom", margin.as_str()),
                ("w:left", margin.as_str()),
                ("w:header", HEADER_DISTANCE_TWIPS.to_string().as_str()),
                ("w:footer", FOOTER_DISTANCE_TWIPS.to_string().as_str()),
                ("w:gutter", "0"),
            ],
        )
    })
}

fn write_paragraph(w: &mut XmlWriter, p: &Paragraph, doc: &Document) -> XmlResult {
    w.element("w:p", &[], |w| {
        let style = p.style.style_id();
        if style.is_some() || p.left_indent_twips > 0 {
            w.element("w:pPr", &[], |w| {
                if let Some(id) = style {
                    w.empty("w:pStyle", &[("w:val", &id)])?;
                }
                if p.left_indent_twips > 0 {
                    w.empty("w:ind", &[("w:left", p.left_indent_twips.to_string().as_str())])?;
                }
                Ok(())
            })?;
        }
        for run in &p.runs {
            match run {
                Run::Text { text, bold } => write_text_run(w, text, *bold)?,
                Run::Picture {
                    image,
                    width_emu,
                    height_emu,
                } => write_picture_run(w, *image, *width_emu, *height_emu, doc)?,
            }
        }
        Ok(())
    })
}

fn write_text_run(w: &mut XmlWriter, text: &str, bold: bool) -> XmlResult {
    w.element("w:r", &[], |w| {
        if bold {
            w.element("w:rPr", &[], |w| w.empty("w:b", &[]))?;
        }
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                w.empty("w:br", &[])?;
            }
            if !line.is_empty() {
                w.element("w:t", &[("xml:space", "preserve")], |w| w.text(line))?;
            }
        }
        Ok(())
    })
}

fn write_picture_run(w: &mut XmlWriter, image: usize, cx: u64, cy: u64, doc: &Document) -> XmlResult {
    let id = (image + 1).to_string();
    let embed = format!("rId{}", image + FIRST_IMAGE_REL);
    let ext = doc
        .images
        .get(image)
        .map(|img| img.format.extension())
        .unwrap_or("png");
    let picture_name = format!("Picture {id}");
    let file_name = format!("image{id}.{ext}");
    let extent = [("cx", cx.to_string()), ("cy", cy.to_string())];
    let extent: Vec<(&str, &str)> = extent.iter().map(|(k, v)| (*k, v.as_str())).collect();

    w.element("w:r", &[], |w| {
        w.element("w:drawing", &[], |w| {
            w.element(
                "wp:inline",
                &[("distT", "0"), ("distB", "0"), ("distL", "0"), ("distR", "0")],
                |w| {
                    w.empty("wp:extent", &extent)?;
                    w.empty("wp:docPr", &[("id", id.as_str()), ("name", picture_name.as_str())])?;
                    w.element("wp:cNvGraphicFramePr", &[], |w| {
                        w.empty("a:graphicFrameLocks", &[("noChangeAspect", "1")])
                    })?;
                    w.element("a:graphic", &[], |w| {
                        w.element("a:graphicData", &[("uri", NS_PIC)], |w| {
                            w.element("pic:pic", &[], |w| {
                                w.element("pic:nvPicPr", &[], |w| {
                                    w.empty("pic:cNvPr", &[("id", id.as_str()), ("name", file_name.as_str())])?;
                                    w.empty("pic:cNvPicPr", &[])
                                })?;
                                w.element("pic:blipFill", &[], |w| {
                                    w.empty("a:blip", &[("r:embed", embed.as_str())])?;
                                    w.element("a:stretch", &[], |w| w.empty("a:fillRect", &[]))
                                })?;
                                w.element("pic:spPr", &[], |w| {
                                    w.element("a:xfrm", &[], |w| {
                                        w.empty("a:off", &[("x", "0"), ("y", "0")])?;
                                        w.empty("a:ext", &extent)
                                    })?;
                                    w.element("a:prstGeom", &[("prst", "rect")], |w| {
                                        w.empty("a:avLst", &[])
                                    })
                                })
                            })
                        })
                    })
                },
            )
        })
    })
}

fn write_table(w: &mut XmlWriter, table: &Table) -> XmlResult {
    w.element("w:tbl", &[], |w| {
        w.element("w:tblPr", &[], |w| {
            w.empty("w:tblStyle", &[("w:val", "TableGrid")])?;
            w.empty("w:tblW", &[("w:w", "0"), ("w:type", "auto")])?;
            w.empty("w:tblLook", &[("w:val", "04A0")])
        })?;
        w.element("w:tblGrid", &[], |w| {
            for width in &table.column_widths_twips {
                w.empty("w:gridCol", &[("w:w", width.to_string().as_str())])?;
            }
            Ok(())
        })?;

        for row in &table.rows {
            w.element("w:tr", &[], |w| {
                for (col, cell) in row.iter().enumerate() {
                    let width = table.column_widths_twips.get(col).copied().unwrap_or(0);
                    w.element("w:tc", &[], |w| {
                        w.element("w:tcPr", &[], |w| {
                            w.empty("w:tcW", &[("w:w", width.to_string().as_str()), ("w:type", "dxa")])?;
                            match cell.merge {
                                CellMerge::None => Ok(()),
                                CellMerge::Restart => w.empty("w:vMerge", &[("w:val", "restart")]),
                                CellMerge::Continue => w.empty("w:vMerge", &[]),
                            }
                        })?;
                        w.element("w:p", &[], |w| {
                            if cell.text.is_empty() {
                                Ok(())
                            } else {
                                write_text_run(w, &cell.text, false)
                            }
                        })
                    })?;
                }
                Ok(())
            })?;
        }
        Ok(())
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Styles and bullet numbering
// ────────────────────────────────────────────────────────────────────────────

/// A paragraph style derived from Normal.
struct StyleDef {
    id: &'static str,
    name: &'static str,
    spacing: &'static [(&'static str, &'static str)],
    /// Headings keep with the next paragraph and appear in the outline.
    outline_level: Option<&'static str>,
    bold: bool,
    italic: bool,
    color: &'static str,
    size: Option<&'static str>,
}

const PARAGRAPH_STYLES: [StyleDef; 5] = [
    StyleDef {
        id: "Title",
        name: "Title",
        spacing: &[("w:after", "240")],
        outline_level: None,
        bold: false,
        italic: false,
        color: "17365D",
        size: Some("56"),
    },
    StyleDef {
        id: "Heading1",
        name: "heading 1",
        spacing: &[("w:before", "480"), ("w:after", "120")],
        outline_level: Some("0"),
        bold: true,
        italic: false,
        color: "365F91",
        size: Some("28"),
    },
    StyleDef {
        id: "Heading2",
        name: "heading 2",
        spacing: &[("w:before", "200"), ("w:after", "80")],
        outline_level: Some("1"),
        bold: true,
        italic: false,
        color: "4F81BD",
        size: Some("26"),
    },
    StyleDef {
        id: "Heading3",
        name: "heading 3",
        spacing: &[("w:before", "200"), ("w:after", "60")],
        outline_level: Some("2"),
        bold: true,
        italic: false,
        color: "4F81BD",
        size: None,
    },
    StyleDef {
        id: "Quote",
        name: "Quote",
        spacing: &[],
        outline_level: None,
        bold: false,
        italic: true,
        color: "404040",
        size: None,
    },
];

fn write_font_size(w: &mut XmlWriter, half_points: &str) -> XmlResult {
    w.empty("w:sz", &[("w:val", half_points)])?;
    w.empty("w:szCs", &[("w:val", half_points)])
}

fn write_paragraph_style(w: &mut XmlWriter, style: &StyleDef) -> XmlResult {
    w.element(
        "w:style",
        &[("w:type", "paragraph"), ("w:styleId", style.id)],
        |w| {
            w.empty("w:name", &[("w:val", style.name)])?;
            w.empty("w:basedOn", &[("w:val", "Normal")])?;
            w.empty("w:next", &[("w:val", "Normal")])?;
            w.empty("w:qFormat", &[])?;
            if !style.spacing.is_empty() || style.outline_level.is_some() {
                w.element("w:pPr", &[], |w| {
                    if style.outline_level.is_some() {
                        w.empty("w:keepNext", &[])?;
                    }
                    if !style.spacing.is_empty() {
                        w.empty("w:spacing", style.spacing)?;
                    }
                    match style.outline_level {
                        Some(level) => w.empty("w:outlineLvl", &[("w:val", level)]),
                        None => Ok(()),
                    }
                })?;
            }
            w.element("w:rPr", &[], |w| {
                if style.bold {
                    w.empty("w:b", &[])?;
                }
                if style.italic {
                    w.empty("w:i", &[])?;
                }
                w.empty("w:color", &[("w:val", style.color)])?;
                match style.size {
                    Some(size) => write_font_size(w, size),
                    None => Ok(()),
                }
            })
        },
    )
}

fn styles_xml() -> Part {
    let mut w = XmlWriter::new()?;
    w.element("w:styles", &[("xmlns:w", NS_W)], |w| {
        w.element("w:docDefaults", &[], |w| {
            w.element("w:rPrDefault", &[], |w| {
                w.element("w:rPr", &[], |w| {
                    w.empty(
                        "w:rFonts",
                        &[
                            ("w:ascii", BODY_FONT),
                            ("w:hAnsi", BODY_FONT),
                            ("w:eastAsia", BODY_FONT),
                            ("w:cs", BODY_FONT),
                        ],
                    )?;
                    write_font_size(w, &BODY_FONT_SIZE.to_string())?;
                    w.empty("w:lang", &[("w:val", "en-US")])
                })
            })?;
            w.element("w:pPrDefault", &[], |w| {
                w.element("w:pPr", &[], |w| {
                    w.empty(
                        "w:spacing",
                        &[("w:after", "160"), ("w:line", "259"), ("w:lineRule", "auto")],
                    )
                })
            })
        })?;

        w.element(
            "w:style",
            &[("w:type", "paragraph"), ("w:default", "1"), ("w:styleId", "Normal")],
            |w| {
                w.empty("w:name", &[("w:val", "Normal")])?;
                w.empty("w:qFormat", &[])
            },
        )?;
        for style in &PARAGRAPH_STYLES {
            write_paragraph_style(w, style)?;
        }

        w.element(
            "w:style",
            &[("w:type", "paragraph"), ("w:styleId", "ListBullet")],
            |w| {
                w.empty("w:name", &[("w:val", "List Bullet")])?;
                w.empty("w:basedOn", &[("w:val", "Normal")])?;
                w.element("w:pPr", &[], |w| {
                    w.element("w:numPr", &[], |w| w.empty("w:numId", &[("w:val", "1")]))?;
                    w.empty("w:ind", &BULLET_INDENT)
                })
            },
        )?;

        w.element(
            "w:style",
            &[("w:type", "table"), ("w:styleId", "TableGrid")],
            |w| {
                w.empty("w:name", &[("w:val", "Table Grid")])?;
                w.element("w:tblPr", &[], |w| {
                    w.element("w:tblBorders", &[], |w| {
                        for edge in ["w:top", "w:left", "w:bottom", "w:right", "w:insideH", "w:insideV"] {
                            w.empty(
                                edge,
                                &[
                                    ("w:val", "single"),
                                    ("w:sz", "4"),
                                    ("w:space", "0"),
                                    ("w:color", "auto"),
                                ],
                            )?;
                        }
                        Ok(())
                    })
                })
            },
        )
    })?;
    Ok(w.finish())
}

fn numbering_xml() -> Part {
    let mut w = XmlWriter::new()?;
    w.element("w:numbering", &[("xmlns:w", NS_W)], |w| {
        w.element("w:abstractNum", &[("w:abstractNumId", "0")], |w| {
            w.empty("w:multiLevelType", &[("w:val", "singleLevel")])?;
            w.element("w:lvl", &[("w:ilvl", "0")], |w| {
                w.empty("w:start", &[("w:val", "1")])?;
                w.empty("w:numFmt", &[("w:val", "bullet")])?;
                w.empty("w:lvlText", &[("w:val", "\u{2022}")])?;
                w.empty("w:lvlJc", &[("w:val", "left")])?;
                w.element("w:pPr", &[], |w| w.empty("w:ind", &BULLET_INDENT))
            })
        })?;
        w.element("w:num", &[("w:numId", "1")], |w| {
            w.empty("w:abstractNumId", &[("w:val", "0")])
        })
    })?;
    Ok(w.finish())
}
