//! CI provider detection.
//!
//! Selection is a pure function over an environment snapshot, so tests can
//! exercise every profile without mutating the process environment. Each
//! recognized provider is one row in a lookup table: a fixed service name, a
//! credential policy, and a match predicate over the snapshot.

use std::collections::BTreeMap;

/// Environment snapshot taken once at startup.
pub type EnvMap = BTreeMap<String, String>;

/// Default service name when no CI provider is detected.
pub const LOCAL_SERVICE_NAME: &str = "coveralls-multi-ci";

const REPO_TOKEN_VAR: &str = "COVERALLS_REPO_TOKEN";

/// How Coveralls authenticates a build from this provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credentials {
    /// Coveralls queries the provider itself given service name + job id;
    /// no repo token travels with the payload.
    ProviderQueried,
    /// The payload must carry an explicit repo token, and build metadata
    /// comes from the generic `CI_*` variables.
    RepoToken,
}

struct Provider {
    service_name: &'static str,
    credentials: Credentials,
    job_id_var: Option<&'static str>,
    matches: fn(&EnvMap) -> bool,
}

const PROVIDERS: &[Provider] = &[
    Provider {
        service_name: "travis-ci",
        credentials: Credentials::ProviderQueried,
        job_id_var: Some("TRAVIS_JOB_ID"),
        matches: |env| env.contains_key("CI") && env.contains_key("TRAVIS"),
    },
    Provider {
        service_name: "appveyor",
        credentials: Credentials::RepoToken,
        job_id_var: None,
        matches: |env| env.contains_key("CI") && env.contains_key("APPVEYOR"),
    },
    Provider {
        service_name: "circle-ci",
        credentials: Credentials::RepoToken,
        job_id_var: None,
        matches: |env| env.contains_key("CI") && env.contains_key("CIRCLECI"),
    },
    Provider {
        service_name: "semaphore",
        credentials: Credentials::RepoToken,
        job_id_var: None,
        matches: |env| env.contains_key("CI") && env.contains_key("SEMAPHORE"),
    },
    Provider {
        service_name: "jenkins-ci",
        credentials: Credentials::RepoToken,
        job_id_var: None,
        matches: |env| env.contains_key("JENKINS_URL"),
    },
    Provider {
        service_name: "codeship",
        credentials: Credentials::RepoToken,
        job_id_var: None,
        matches: |env| {
            env.contains_key("CI") && env.get("CI_NAME").is_some_and(|name| name == "codeship")
        },
    },
    Provider {
        service_name: "bamboo",
        credentials: Credentials::RepoToken,
        job_id_var: None,
        matches: |env| env.contains_key("bamboo.buildNumber"),
    },
];

/// Provider-specific payload fields resolved from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CiConfig {
    pub service_name: String,
    pub repo_token: Option<String>,
    pub service_job_id: Option<String>,
    pub service_number: Option<String>,
    pub service_build_url: Option<String>,
    pub service_branch: Option<String>,
    pub service_pull_request: Option<String>,
}

/// Pick the CI profile for this run.
///
/// First matching table row wins; otherwise `CI_NAME` selects a generic
/// profile, and with no CI markers at all the run is reported as local.
pub fn detect(env: &EnvMap) -> CiConfig {
    let repo_token = env.get(REPO_TOKEN_VAR).cloned();

    for provider in PROVIDERS {
        if !(provider.matches)(env) {
            continue;
        }
        tracing::debug!("detected CI provider {}", provider.service_name);
        let mut config = match provider.credentials {
            Credentials::ProviderQueried => CiConfig::default(),
            Credentials::RepoToken => CiConfig {
                repo_token: repo_token.clone(),
                ..generic_fields(env)
            },
        };
        config.service_name = provider.service_name.to_string();
        config.service_job_id = provider.job_id_var.and_then(|var| env.get(var).cloned());
        return config;
    }

    if let Some(name) = env.get("CI_NAME") {
        tracing::debug!("no officially supported CI detected; using generic profile {name}");
        return CiConfig {
            service_name: name.clone(),
            repo_token,
            ..generic_fields(env)
        };
    }

    tracing::warn!("no CI detected (CI_NAME unset); reporting as a local run");
    CiConfig {
        service_name: LOCAL_SERVICE_NAME.to_string(),
        repo_token,
        ..CiConfig::default()
    }
}

fn generic_fields(env: &EnvMap) -> CiConfig {
    CiConfig {
        service_number: env.get("CI_BUILD_NUMBER").cloned(),
        service_build_url: env.get("CI_BUILD_URL").cloned(),
        service_branch: env.get("CI_BRANCH").cloned(),
        service_pull_request: env.get("CI_PULL_REQUEST").cloned(),
        ..CiConfig::default()
    }
}
