//! Two-phase payload serialization.
//!
//! Phase one renders the payload to a single JSON string in memory; that
//! text is small because every file's source is represented by a reference
//! token. Phase two streams the text to disk, replacing each token with the
//! JSON-escaped content of the file it names, read in fixed-size chunks.
//! Peak memory therefore stays proportional to the metadata, not to the
//! total size of the measured sources.
//!
//! The output is valid JSON provided the only token-pattern occurrences in
//! the metadata are the ones the translator inserted and every referenced
//! file is readable UTF-8 text. That constraint is documented rather than
//! re-checked per call.

use crate::error::Error;
use crate::token;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

const CHUNK_SIZE: usize = 64 * 1024;

/// Serialize `payload` to `target`, resolving source reference tokens.
///
/// Never overwrites: an existing `target` is an error, as is a missing
/// parent directory. Returns the byte size of the written file, queried
/// from the destination after the handle is closed.
pub fn dump_json_to_disk<T: Serialize>(payload: &T, target: &Path) -> Result<u64, Error> {
    if target.as_os_str().is_empty() {
        return Err(Error::EmptyOutputPath);
    }
    let text = serde_json::to_string(payload)?;
    if text == "null" || text == "{}" {
        return Err(Error::EmptyPayload);
    }
    if target.exists() {
        return Err(Error::OutputExists {
            path: target.to_path_buf(),
        });
    }
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    if !parent.is_dir() {
        return Err(Error::OutputDirMissing { path: parent });
    }

    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
        .map_err(|err| {
            if err.kind() == io::ErrorKind::AlreadyExists {
                Error::OutputExists {
                    path: target.to_path_buf(),
                }
            } else {
                Error::Io(err)
            }
        })?;
    let mut out = BufWriter::new(file);

    let mut rest = text.as_str();
    while let Some(start) = rest.find(token::PREFIX) {
        out.write_all(rest[..start].as_bytes())?;
        let tail = &rest[start..];
        let end = token_end(tail)?;
        let source_path = token::decode(&tail[..end])?;
        stream_escaped_file(&mut out, &source_path)?;
        rest = &tail[end..];
    }
    out.write_all(rest.as_bytes())?;
    out.flush()?;
    drop(out);

    Ok(fs::metadata(target)?.len())
}

/// Byte offset one past the token's closing delimiter.
fn token_end(tail: &str) -> Result<usize, Error> {
    tail[token::PREFIX.len()..]
        .find(token::SUFFIX)
        .map(|offset| token::PREFIX.len() + offset + token::SUFFIX.len_utf8())
        .ok_or_else(|| Error::MalformedToken {
            token: tail.chars().take(40).collect(),
        })
}

/// Copy a source file into the output as JSON string content.
fn stream_escaped_file(out: &mut BufWriter<File>, path: &Path) -> Result<(), Error> {
    let mut source = File::open(path)?;
    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        let read = source.read(&mut chunk)?;
        if read == 0 {
            return Ok(());
        }
        write_escaped(out, &chunk[..read])?;
    }
}

/// JSON string escaping, byte-for-byte equivalent to `serde_json`'s.
///
/// Multi-byte UTF-8 units are all >= 0x80 and pass through untouched, so
/// escaping chunk-by-chunk is safe regardless of where chunk boundaries
/// fall.
fn write_escaped(out: &mut impl Write, bytes: &[u8]) -> io::Result<()> {
    for &byte in bytes {
        match byte {
            b'"' => out.write_all(b"\\\"")?,
            b'\\' => out.write_all(b"\\\\")?,
            0x08 => out.write_all(b"\\b")?,
            0x0c => out.write_all(b"\\f")?,
            b'\n' => out.write_all(b"\\n")?,
            b'\r' => out.write_all(b"\\r")?,
            b'\t' => out.write_all(b"\\t")?,
            byte if byte < 0x20 => write!(out, "\\u{byte:04x}")?,
            byte => out.write_all(&[byte])?,
        }
    }
    Ok(())
}
