use thiserror::Error;

/// Reasons a single input file is not patched.
#[derive(Error, Debug)]
pub enum FixError {
    /// The file uses the binary FBX encoding, which is never rewritten.
    #[error("binary FBX (version {version}) is not supported")]
    BinaryFbx { version: u32 },

    #[error("unsupported extension \"{0}\"")]
    UnsupportedExtension(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures when following a connection record from a model to its geometry.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no geometry is connected to model {model}")]
    NotFound { model: i64 },

    #[error("model {model} is connected to several geometries: {candidates:?}")]
    Ambiguous { model: i64, candidates: Vec<i64> },
}
