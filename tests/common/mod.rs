//! Shared test infrastructure for integration tests.
//!
//! Provides a sample measured project, a one-shot loopback HTTP stub that
//! captures the upload, and a runner for the built binary with a scrubbed
//! CI environment.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

/// Environment variables that influence CI detection or submission; removed
/// from every binary invocation so the host environment cannot leak in.
const CI_VARS: &[&str] = &[
    "CI",
    "TRAVIS",
    "TRAVIS_JOB_ID",
    "APPVEYOR",
    "CIRCLECI",
    "SEMAPHORE",
    "JENKINS_URL",
    "bamboo.buildNumber",
    "CI_NAME",
    "CI_BUILD_NUMBER",
    "CI_BUILD_URL",
    "CI_BRANCH",
    "CI_PULL_REQUEST",
    "COVERALLS_REPO_TOKEN",
    "COVERALLS_ENDPOINT",
    "RUST_LOG",
];

/// A measured sample project with a matching LCOV tracefile.
pub struct Project {
    pub dir: TempDir,
    pub tracefile: PathBuf,
}

impl Project {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

/// Three-file project: `sub.rs` partially covered, `main.rs` fully covered,
/// `empty.rs` zero bytes.
pub fn sample_project() -> Project {
    let dir = tempfile::tempdir().expect("create project dir");
    let root = dir.path();

    let sub = root.join("sub.rs");
    fs::write(
        &sub,
        "fn sub(condition: bool) -> i32 {\n    if condition {\n        5 + 5\n    } else {\n        5 - 5\n    }\n}\n",
    )
    .expect("write sub.rs");
    let main = root.join("main.rs");
    fs::write(&main, "fn main() {\n    sub(true);\n}\n").expect("write main.rs");
    let empty = root.join("empty.rs");
    fs::write(&empty, "").expect("write empty.rs");

    let tracefile = root.join("lcov.info");
    let mut lcov = String::new();
    lcov.push_str(&format!("SF:{}\n", sub.display()));
    for (line, hits) in [(1, 1), (2, 1), (3, 1), (5, 0), (6, 0)] {
        lcov.push_str(&format!("DA:{line},{hits}\n"));
    }
    lcov.push_str("end_of_record\n");
    lcov.push_str(&format!("SF:{}\n", main.display()));
    for (line, hits) in [(1, 1), (2, 1)] {
        lcov.push_str(&format!("DA:{line},{hits}\n"));
    }
    lcov.push_str("end_of_record\n");
    lcov.push_str(&format!("SF:{}\nend_of_record\n", empty.display()));
    fs::write(&tracefile, lcov).expect("write tracefile");

    Project { dir, tracefile }
}

/// Turn the project directory into a git repository with one commit.
/// Returns false (and logs) when git is unavailable.
pub fn init_git_repo(root: &Path) -> bool {
    if Command::new("git").arg("--version").output().is_err() {
        eprintln!("Skipping git setup: git not available");
        return false;
    }
    let run = |args: &[&str]| {
        let output = Command::new("git")
            .args(args)
            .current_dir(root)
            .output()
            .expect("run git");
        assert!(output.status.success(), "git {args:?} failed");
    };
    run(&["init"]);
    // Pin the default branch name without requiring git >= 2.28.
    run(&["symbolic-ref", "HEAD", "refs/heads/master"]);
    run(&["remote", "add", "origin", "http://localhost/git.git"]);
    run(&["config", "--local", "user.name", "MrCommit"]);
    run(&["config", "--local", "user.email", "mc@aol.com"]);
    run(&["add", "."]);
    run(&["-c", "commit.gpgsign=false", "commit", "-m", "Measured sources."]);
    true
}

/// The one request the stub server captured.
pub struct CapturedRequest {
    pub head: String,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    /// Extract the `json_file` form part as parsed JSON.
    pub fn json_part(&self) -> serde_json::Value {
        let marker = b"\r\n\r\n";
        let start = find(&self.body, marker).expect("part header boundary") + marker.len();
        let end = find(&self.body[start..], b"\r\n--").expect("part terminator") + start;
        serde_json::from_slice(&self.body[start..end]).expect("payload part is JSON")
    }
}

/// One-shot HTTP server on a loopback port.
pub struct StubServer {
    pub endpoint: String,
    handle: thread::JoinHandle<CapturedRequest>,
}

impl StubServer {
    /// Wait for the captured request.
    pub fn finish(self) -> CapturedRequest {
        self.handle.join().expect("stub server thread")
    }
}

/// Accept exactly one request and answer it with `status_line`
/// (e.g. `"200 OK"`).
pub fn stub_server(status_line: &'static str) -> StubServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
    let endpoint = format!("http://{}", listener.local_addr().expect("local addr"));
    let handle = thread::spawn(move || serve_one(&listener, status_line));
    StubServer { endpoint, handle }
}

fn serve_one(listener: &TcpListener, status_line: &str) -> CapturedRequest {
    let (mut stream, _) = listener.accept().expect("accept");
    stream
        .set_read_timeout(Some(Duration::from_secs(30)))
        .expect("set timeout");

    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = find(&buffer, b"\r\n\r\n") {
            break pos + 4;
        }
        let read = stream.read(&mut chunk).expect("read request head");
        assert!(read > 0, "connection closed before request head");
        buffer.extend_from_slice(&chunk[..read]);
    };
    let head = String::from_utf8_lossy(&buffer[..head_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buffer[head_end..].to_vec();
    while body.len() < content_length {
        let read = stream.read(&mut chunk).expect("read request body");
        assert!(read > 0, "connection closed before request body");
        body.extend_from_slice(&chunk[..read]);
    }

    let response =
        format!("HTTP/1.1 {status_line}\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{{}}");
    stream
        .write_all(response.as_bytes())
        .expect("write response");
    stream.flush().expect("flush response");
    CapturedRequest { head, body }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Run `coveralls-multi-ci submit` against the project with a scrubbed CI
/// environment plus the given overrides.
pub fn run_submit(project: &Project, env: &[(&str, &str)], extra_args: &[&str]) -> Output {
    let output_path = project.root().join("coveralls_payload.json");
    let mut command = Command::new(env!("CARGO_BIN_EXE_coveralls-multi-ci"));
    command
        .arg("submit")
        .arg("--coverage")
        .arg(&project.tracefile)
        .arg("--source")
        .arg(project.root())
        .arg("--git")
        .arg(project.root())
        .arg("--output")
        .arg(&output_path)
        .args(extra_args);
    for var in CI_VARS {
        command.env_remove(var);
    }
    for (key, value) in env {
        command.env(key, value);
    }
    command.output().expect("run coveralls-multi-ci")
}

/// Default payload path `run_submit` writes to.
pub fn payload_path(project: &Project) -> PathBuf {
    project.root().join("coveralls_payload.json")
}
