//! Coverage translation.
//!
//! Turns the raw LCOV line-hit sets into the per-file records the Coveralls
//! API expects: a source-root-relative name, one coverage entry per physical
//! line, and a deferred reference to the file's text.

use crate::error::Error;
use crate::lcov;
use crate::token;
use serde::ser::Serializer;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Coverage status of one physical source line.
///
/// Serializes to the Coveralls wire encoding: `null` for lines that carry no
/// instrumentable statement, `1` for executed lines, `0` for executable
/// lines that never ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCoverage {
    NotExecutable,
    Covered,
    NotCovered,
}

impl Serialize for LineCoverage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::NotExecutable => serializer.serialize_unit(),
            Self::Covered => serializer.serialize_u32(1),
            Self::NotCovered => serializer.serialize_u32(0),
        }
    }
}

/// One measured source file, shaped for the `source_files` payload array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    /// Path relative to the source root, forward slashes, no leading slash.
    pub name: String,
    /// Per-line statuses, one entry per physical line in file order.
    pub coverage: Vec<LineCoverage>,
    /// Source reference token, or `""` for a zero-byte file.
    pub source: String,
}

/// Translate an LCOV tracefile into Coveralls source file records.
///
/// Records are ordered by measured path, so the same tracefile and source
/// tree always produce the same sequence.
pub fn coverage_report(coverage_file: &Path, source_root: &Path) -> Result<Vec<SourceFile>, Error> {
    if coverage_file.as_os_str().is_empty() {
        return Err(Error::MissingCoveragePath);
    }
    let report = lcov::load(coverage_file)?;
    if report.is_empty() {
        return Err(Error::NoCoverage {
            path: coverage_file.to_path_buf(),
        });
    }

    let root = source_root.canonicalize()?;
    let mut source_files = Vec::with_capacity(report.len());
    for (path, hits) in &report {
        source_files.push(translate_file(path, hits, &root)?);
    }
    tracing::debug!(
        "translated {} measured files from {}",
        source_files.len(),
        coverage_file.display()
    );
    Ok(source_files)
}

fn translate_file(
    path: &Path,
    hits: &lcov::LineHits,
    root: &Path,
) -> Result<SourceFile, Error> {
    if !path.is_file() {
        return Err(Error::MissingSource {
            path: path.to_path_buf(),
        });
    }
    let absolute = path.canonicalize()?;
    let relative = absolute
        .strip_prefix(root)
        .map_err(|_| Error::OutsideSourceRoot {
            path: absolute.clone(),
            root: root.to_path_buf(),
        })?;
    let name = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    let content = fs::read_to_string(&absolute)?;
    let mut coverage = vec![LineCoverage::NotExecutable; line_count(&content)];
    // Executed status wins when a line number appears in both sets.
    for (line_numbers, status) in [
        (&hits.missed, LineCoverage::NotCovered),
        (&hits.executed, LineCoverage::Covered),
    ] {
        for &line_no in line_numbers {
            // LCOV line numbers are 1-based.
            let Some(slot) = (line_no as usize)
                .checked_sub(1)
                .and_then(|index| coverage.get_mut(index))
            else {
                tracing::warn!("{name} has no line {line_no}; tracefile may be stale");
                continue;
            };
            *slot = status;
        }
    }

    let source = if content.is_empty() {
        String::new()
    } else {
        token::encode(&absolute)
    };
    Ok(SourceFile {
        name,
        coverage,
        source,
    })
}

/// Number of physical lines, counting a final unterminated line but not the
/// empty string after a trailing newline.
fn line_count(content: &str) -> usize {
    if content.is_empty() {
        return 0;
    }
    let newlines = content.bytes().filter(|&byte| byte == b'\n').count();
    if content.ends_with('\n') {
        newlines
    } else {
        newlines + 1
    }
}
