//! Payload upload to the Coveralls API.
//!
//! One blocking POST of the assembled payload file as a multipart form
//! upload. No retries: a transport failure or non-2xx response is fatal.

use crate::error::Error;
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Production Coveralls jobs endpoint.
pub const API_URL: &str = "https://coveralls.io/api/v1/jobs";

/// Form field name the API expects the payload under.
const FORM_FIELD: &str = "json_file";

/// Filename reported in the form part.
const FORM_FILENAME: &str = "coveralls_payload.json";

/// POST the serialized payload file to the API.
pub fn post_to_api(payload_file: &Path, endpoint: &str) -> Result<(), Error> {
    let payload = fs::read(payload_file)?;
    let boundary = boundary();
    let body = multipart_body(&boundary, &payload);
    tracing::debug!("posting {} byte multipart body to {endpoint}", body.len());

    let response = ureq::post(endpoint)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .send(&body[..]);
    match response {
        Ok(response) => {
            tracing::info!(
                "coveralls accepted the payload with HTTP {}",
                response.status().as_u16()
            );
            Ok(())
        }
        Err(ureq::Error::StatusCode(status)) => Err(Error::Submission { status }),
        Err(err) => Err(Error::Transport(Box::new(err))),
    }
}

/// Wrap the payload bytes as a single-part `multipart/form-data` body.
fn multipart_body(boundary: &str, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(payload.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{FORM_FIELD}\"; filename=\"{FORM_FILENAME}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/json\r\n\r\n");
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

/// Per-run boundary; the payload is JSON text, so a long random-ish marker
/// not starting with `-` or `{` will not collide in practice.
fn boundary() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    format!("coveralls{nanos:032x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipart_body_frames_the_payload() {
        let body = multipart_body("coveralls00ff", b"{\"run_at\":\"now\"}");
        let text = String::from_utf8(body).unwrap();

        assert!(text.starts_with("--coveralls00ff\r\n"));
        assert!(text.contains(
            "Content-Disposition: form-data; name=\"json_file\"; filename=\"coveralls_payload.json\"\r\n"
        ));
        assert!(text.contains("\r\n\r\n{\"run_at\":\"now\"}\r\n"));
        assert!(text.ends_with("--coveralls00ff--\r\n"));
    }

    #[test]
    fn boundary_never_collides_with_json_text() {
        let boundary = boundary();
        assert!(boundary.starts_with("coveralls"));
        assert!(boundary.len() > 32);
        assert!(boundary.chars().all(|ch| ch.is_ascii_alphanumeric()));
    }
}
