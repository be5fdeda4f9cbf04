//! The Coveralls API payload document.

use crate::ci::CiConfig;
use crate::error::Error;
use crate::git::GitStats;
use crate::report::SourceFile;
use chrono::Utc;
use serde::Serialize;

/// Root JSON document POSTed to the Coveralls jobs endpoint.
///
/// Optional fields are omitted entirely when absent rather than serialized
/// as `null`.
#[derive(Debug, Serialize)]
pub struct Payload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_token: Option<String>,
    pub service_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_build_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_pull_request: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<GitStats>,
    /// UTC submission time, `YYYY-MM-DD HH:MM:SS +0000`.
    pub run_at: String,
    pub source_files: Vec<SourceFile>,
}

impl Payload {
    /// Merge the CI profile, git metadata, and coverage records, stamping
    /// the current UTC time.
    pub fn assemble(ci: CiConfig, git: Option<GitStats>, source_files: Vec<SourceFile>) -> Self {
        Self {
            repo_token: ci.repo_token,
            service_name: ci.service_name,
            service_job_id: ci.service_job_id,
            service_number: ci.service_number,
            service_build_url: ci.service_build_url,
            service_branch: ci.service_branch,
            service_pull_request: ci.service_pull_request,
            git,
            run_at: Utc::now().format("%Y-%m-%d %H:%M:%S +0000").to_string(),
            source_files,
        }
    }

    /// Coveralls accepts a payload only when it can attribute the build:
    /// an explicit repo token, or a service identity it can query itself.
    pub fn ensure_submittable(&self) -> Result<(), Error> {
        if self.repo_token.is_some() {
            return Ok(());
        }
        if !self.service_name.is_empty() && self.service_job_id.is_some() {
            return Ok(());
        }
        Err(Error::MissingCredentials)
    }
}
