// Document Assembler: screenplay (+ optional cover image) → downloadable .docx.
// Rendering is CPU-bound; handlers run it inside tokio::task::spawn_blocking.

pub mod assembler;
pub mod boilerplate;
pub mod image;
pub mod model;
pub mod package;
pub mod xml;

use thiserror::Error;

pub use assembler::render_document;
pub use image::CoverImage;
pub use package::DOCX_CONTENT_TYPE;

#[derive(Debug, Error)]
pub enum RenderError {
    /// Comma-separated paths of the absent fields, e.g. `title, scenes[0].scene_breakdown`.
    #[error("screenplay is missing required field(s): {0}")]
    MissingField(String),

    #[error("cover image: {0}")]
    Image(String),

    #[error("document markup failed: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("document packaging failed: {0}")]
    Package(#[from] zip::result::ZipError),

    #[error("document write failed: {0}")]
    Io(#[from] std::io::Error),
}
