//! File extension categories used for upload validation and size limits.

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "svg"];

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mpeg", "mpga"];

pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "wav", "webm", "amr"];

pub const DOCUMENT_EXTENSIONS: &[&str] = &[
    "txt", "markdown", "md", "mdx", "pdf", "html", "htm", "xlsx", "xls", "docx", "csv", "eml",
    "msg", "pptx", "xml", "epub",
];

/// Size-limit category of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Image,
    Video,
    Audio,
    Other,
}

impl FileCategory {
    /// Category for a lowercase extension without the leading dot.
    pub fn from_extension(extension: &str) -> Self {
        if IMAGE_EXTENSIONS.contains(&extension) {
            FileCategory::Image
        } else if VIDEO_EXTENSIONS.contains(&extension) {
            FileCategory::Video
        } else if AUDIO_EXTENSIONS.contains(&extension) {
            FileCategory::Audio
        } else {
            FileCategory::Other
        }
    }
}

pub fn is_document_extension(extension: &str) -> bool {
    DOCUMENT_EXTENSIONS.contains(&extension)
}

pub fn is_image_extension(extension: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&extension)
}
