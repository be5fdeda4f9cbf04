//! Error kinds shared across the submission pipeline.
//!
//! Every variant is fatal to the run except where a caller explicitly
//! degrades (git metadata lookup). The CLI logs the error and exits 1.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No coverage file was configured for the run.
    #[error("no coverage file configured")]
    MissingCoveragePath,

    /// The coverage database references a file that no longer exists.
    #[error("coverage measured {path} but it no longer exists on disk")]
    MissingSource { path: PathBuf },

    /// A measured file falls outside the declared source root.
    #[error("coverage measured {path} which is outside source root {root}")]
    OutsideSourceRoot { path: PathBuf, root: PathBuf },

    /// The coverage database exists but measured nothing.
    #[error("{path} contains no file coverage records")]
    NoCoverage { path: PathBuf },

    /// A source reference token failed to decode.
    #[error("malformed source reference token: {token:?}")]
    MalformedToken { token: String },

    /// Serialization was asked to write an empty payload.
    #[error("refusing to serialize an empty payload")]
    EmptyPayload,

    /// Serialization was given no output path.
    #[error("refusing to serialize to an empty output path")]
    EmptyOutputPath,

    /// The output file already exists; existing files are never overwritten.
    #[error("output file {path} already exists")]
    OutputExists { path: PathBuf },

    /// The output file's parent directory does not exist.
    #[error("output directory {path} does not exist")]
    OutputDirMissing { path: PathBuf },

    /// The payload carries neither a repo token nor a service identity.
    #[error("payload needs either a repo token or a service name plus job id")]
    MissingCredentials,

    /// The Coveralls API returned a non-2xx response.
    #[error("coveralls API rejected the payload with HTTP {status}")]
    Submission { status: u16 },

    /// The POST never produced an HTTP response.
    #[error("failed to reach the coveralls API")]
    Transport(#[from] Box<ureq::Error>),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
