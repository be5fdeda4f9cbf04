//! Source reference tokens.
//!
//! A token stands in for a file's full text while the payload is assembled,
//! so the serializer can defer reading sources until it streams the final
//! document. The format is `PLACEHOLDER_<base64 of the absolute path>_`.
//! Standard base64 never contains `_`, quotes, backslashes, or control
//! characters, so a token is unambiguous to scan for and embeds verbatim in
//! a JSON string without escaping. Tokens are created during translation,
//! consumed exactly once during serialization, and never persisted.

use crate::error::Error;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::ffi::OsString;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

/// Marks the start of a token inside serialized payload text.
pub const PREFIX: &str = "PLACEHOLDER_";

/// Terminates a token; cannot occur inside the base64 body.
pub const SUFFIX: char = '_';

/// Encode an absolute path as an embeddable source reference token.
pub fn encode(path: &Path) -> String {
    format!("{PREFIX}{}{SUFFIX}", STANDARD.encode(path.as_os_str().as_bytes()))
}

/// Decode a token back into the path it references.
pub fn decode(token: &str) -> Result<PathBuf, Error> {
    let malformed = || Error::MalformedToken {
        token: token.to_string(),
    };
    let body = token
        .strip_prefix(PREFIX)
        .and_then(|rest| rest.strip_suffix(SUFFIX))
        .ok_or_else(malformed)?;
    let bytes = STANDARD.decode(body).map_err(|_| malformed())?;
    Ok(PathBuf::from(OsString::from_vec(bytes)))
}
