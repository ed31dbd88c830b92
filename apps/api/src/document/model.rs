//! In-memory document tree. The assembler fills it; `package` serializes it.

use crate::document::image::CoverImage;

/// English Metric Units per inch (DrawingML).
pub const EMU_PER_INCH: u64 = 914_400;
/// Twentieths of a point per inch (WordprocessingML).
pub const TWIPS_PER_INCH: u32 = 1_440;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphStyle {
    Normal,
    Title,
    Heading(u8),
    Quote,
    ListBullet,
}

impl ParagraphStyle {
    /// Style id as declared in `styles.xml`; `None` for the default style.
    pub fn style_id(self) -> Option<String> {
        match self {
            ParagraphStyle::Normal => None,
            ParagraphStyle::Title => Some("Title".to_string()),
            ParagraphStyle::Heading(level) => Some(format!("Heading{}", level.clamp(1, 3))),
            ParagraphStyle::Quote => Some("Quote".to_string()),
            ParagraphStyle::ListBullet => Some("ListBullet".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Run {
    /// `\n` inside the text is a line break within the paragraph.
    Text { text: String, bold: bool },
    /// An inline picture; `image` indexes `Document::images`.
    Picture {
        image: usize,
        width_emu: u64,
        height_emu: u64,
    },
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Run::Text {
            text: text.into(),
            bold: false,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Run::Text {
            text: text.into(),
            bold: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub style: ParagraphStyle,
    pub left_indent_twips: u32,
    pub runs: Vec<Run>,
}

impl Paragraph {
    pub fn new(style: ParagraphStyle) -> Self {
        Self {
            style,
            left_indent_twips: 0,
            runs: Vec::new(),
        }
    }

    pub fn indented(mut self, inches: f32) -> Self {
        self.left_indent_twips = (inches * TWIPS_PER_INCH as f32).round() as u32;
        self
    }

    pub fn with_run(mut self, run: Run) -> Self {
        self.runs.push(run);
        self
    }

    /// Concatenated text of all text runs.
    pub fn text(&self) -> String {
        self.runs
            .iter()
            .filter_map(|r| match r {
                Run::Text { text, .. } => Some(text.as_str()),
                Run::Picture { .. } => None,
            })
            .collect()
    }
}

/// Vertical merge state of a table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellMerge {
    None,
    /// First cell of a merged range; carries the text.
    Restart,
    /// Covered by the `Restart` cell above.
    Continue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCell {
    pub text: String,
    pub merge: CellMerge,
}

impl TableCell {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            merge: CellMerge::None,
        }
    }

    pub fn merge_start(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            merge: CellMerge::Restart,
        }
    }

    pub fn merge_continue() -> Self {
        Self {
            text: String::new(),
            merge: CellMerge::Continue,
        }
    }
}

/// A bordered table. Every row has `column_widths_twips.len()` cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub column_widths_twips: Vec<u32>,
    pub rows: Vec<Vec<TableCell>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
    PageBreak,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
    pub images: Vec<CoverImage>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Level 0 is the document title; 1-3 are headings.
    pub fn add_heading(&mut self, text: impl Into<String>, level: u8) -> &mut Paragraph {
        let style = if level == 0 {
            ParagraphStyle::Title
        } else {
            ParagraphStyle::Heading(level)
        };
        self.push_paragraph(Paragraph::new(style).with_run(Run::plain(text)))
    }

    pub fn add_paragraph(&mut self, text: impl Into<String>) -> &mut Paragraph {
        self.push_paragraph(Paragraph::new(ParagraphStyle::Normal).with_run(Run::plain(text)))
    }

    pub fn push_paragraph(&mut self, paragraph: Paragraph) -> &mut Paragraph {
        self.blocks.push(Block::Paragraph(paragraph));
        match self.blocks.last_mut() {
            Some(Block::Paragraph(p)) => p,
            _ => unreachable!("a paragraph was just pushed"),
        }
    }

    pub fn add_table(&mut self, table: Table) {
        self.blocks.push(Block::Table(table));
    }

    pub fn add_page_break(&mut self) {
        self.blocks.push(Block::PageBreak);
    }

    /// Adds a paragraph holding `image` scaled to `width_inches`, aspect ratio kept.
    pub fn add_picture(&mut self, image: CoverImage, width_inches: f32) {
        let width_emu = (width_inches as f64 * EMU_PER_INCH as f64).round() as u64;
        let height_emu = width_emu * u64::from(image.height_px) / u64::from(image.width_px.max(1));
        self.images.push(image);
        let run = Run::Picture {
            image: self.images.len() - 1,
            width_emu,
            height_emu,
        };
        self.push_paragraph(Paragraph::new(ParagraphStyle::Normal).with_run(run));
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Paragraph(p) => Some(p),
            _ => None,
        })
    }
}
