use thiserror::Error;

/// All errors produced by vocable-core.
#[derive(Debug, Error)]
pub enum VocableError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{what} has {got} entries, expected {expected}")]
    AlignmentMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },

    #[error("language id {id} out of range ({n_languages} languages)")]
    UnknownLanguage { id: u32, n_languages: usize },

    #[error("class id {class_id} out of range for language {language_id} ({n_classes} classes)")]
    ClassOutOfRange {
        class_id: u32,
        language_id: u32,
        n_classes: usize,
    },

    #[error("{group} group is empty — average precision is undefined")]
    EmptyGroup { group: &'static str },

    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, VocableError>;
