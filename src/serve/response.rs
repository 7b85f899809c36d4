//! HTTP response handlers.

use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tiny_http::{Header, Method, Request, Response, StatusCode};

use super::inject::maybe_inject;
use crate::utils::mime::{self, types};

/// Fixed acknowledgement for the write-only endpoint.
pub const POST_ACK: &str = "POST received successfully";

/// Upper bound for accepted POST bodies.
pub const MAX_POST_BYTES: u64 = 10 * 1024 * 1024;

/// Respond with a static file, injecting the reload script into HTML.
pub fn respond_file(request: Request, path: &Path, script: &str) -> Result<()> {
    let content_type = mime::from_path(path);

    if is_head_request(&request) {
        return send_head(request, 200, content_type);
    }

    // Check for Range header (video/audio seeking)
    if !mime::is_html(content_type)
        && let Some(range) = get_header(&request, "range")
    {
        return respond_range(request, path, content_type, &range);
    }

    let body = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let body = maybe_inject(body, content_type, script);

    send_body(request, 200, content_type, body)
}

/// Handle Range request for media files (video/audio seeking).
fn respond_range(
    request: Request,
    path: &Path,
    content_type: &'static str,
    range: &str,
) -> Result<()> {
    use std::io::{Seek, SeekFrom};

    let file_size = fs::metadata(path)?.len();

    // Parse "bytes=start-end" format
    let range = range.strip_prefix("bytes=").unwrap_or(range);
    let Some((start, end)) = parse_range(range, file_size) else {
        let response = Response::empty(StatusCode(416))
            .with_header(header("Content-Range", &format!("bytes */{file_size}"))?);
        request.respond(response)?;
        return Ok(());
    };

    let length = end - start + 1;

    // Stream the requested range - no memory allocation for large ranges
    let mut file = fs::File::open(path)?;
    file.seek(SeekFrom::Start(start))?;
    let reader = file.take(length);

    let content_range = format!("bytes {start}-{end}/{file_size}");
    let response = Response::new(
        StatusCode(206),
        vec![
            header("Content-Type", content_type)?,
            header("Content-Range", &content_range)?,
            header("Accept-Ranges", "bytes")?,
        ],
        reader,
        usize::try_from(length).ok(),
        None,
    );

    request.respond(response)?;
    Ok(())
}

/// Parse Range header value "start-end" into inclusive (start, end) bytes.
///
/// Returns `None` when the range cannot be satisfied.
pub fn parse_range(range: &str, file_size: u64) -> Option<(u64, u64)> {
    let last = file_size.checked_sub(1)?;
    let (s, e) = range.trim().split_once('-')?;
    let (s, e) = (s.trim(), e.trim());

    let (start, end) = match (s.is_empty(), e.is_empty()) {
        // "0-499" - specific range
        (false, false) => (s.parse().ok()?, e.parse::<u64>().ok()?.min(last)),
        // "500-" - from start to end
        (false, true) => (s.parse().ok()?, last),
        // "-500" - last 500 bytes
        (true, false) => {
            let suffix: u64 = e.parse().ok()?;
            if suffix == 0 {
                return None;
            }
            (file_size.saturating_sub(suffix), last)
        }
        (true, true) => return None,
    };

    (start <= end).then_some((start, end))
}

/// Respond with a generated directory index.
pub fn respond_listing(request: Request, dir: &Path, script: &str) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, 200, types::HTML);
    }

    let url_path = request.url().split(['?', '#']).next().unwrap_or("/").to_string();
    let body = super::listing::render(dir, &url_path)
        .with_context(|| format!("Failed to list {}", dir.display()))?;
    let body = maybe_inject(body.into_bytes(), types::HTML, script);
    send_body(request, 200, types::HTML, body)
}

/// 301 to `location`, for directory URLs missing their trailing slash.
pub fn respond_redirect(request: Request, location: &str) -> Result<()> {
    let response = Response::from_data(Vec::new())
        .with_status_code(StatusCode(301))
        .with_header(header("Location", location)?)
        .with_header(header("Cache-Control", "no-store")?);
    request.respond(response)?;
    Ok(())
}

pub fn respond_not_found(request: Request) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, 404, types::PLAIN);
    }
    send_body(request, 404, types::PLAIN, b"404 Not Found".to_vec())
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_body(request, 503, types::PLAIN, b"503 Service Unavailable".to_vec())
}

pub fn respond_method_not_allowed(request: Request) -> Result<()> {
    let response = Response::from_data(b"405 Method Not Allowed".to_vec())
        .with_status_code(StatusCode(405))
        .with_header(header("Content-Type", types::PLAIN)?)
        .with_header(header("Allow", "GET, HEAD, POST")?);
    request.respond(response)?;
    Ok(())
}

/// Accept an arbitrary body, log it, and acknowledge.
///
/// Nothing is validated or stored.
pub fn respond_post(mut request: Request) -> Result<()> {
    let mut body = Vec::new();
    request
        .as_reader()
        .take(MAX_POST_BYTES + 1)
        .read_to_end(&mut body)
        .context("Failed to read request body")?;

    if body.len() as u64 > MAX_POST_BYTES {
        return send_body(request, 413, types::PLAIN, b"413 Payload Too Large".to_vec());
    }

    crate::log!("serve"; "POST {} ({} bytes): {}", request.url(), body.len(), String::from_utf8_lossy(&body));
    send_body(request, 200, types::PLAIN, POST_ACK.as_bytes().to_vec())
}

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

/// Extract a header value from the request, case-insensitively.
fn get_header(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case(name))
        .map(|h| h.value.to_string())
}

fn send_head(request: Request, status: u16, content_type: &'static str) -> Result<()> {
    let response = Response::empty(StatusCode(status))
        .with_header(header("Content-Type", content_type)?);
    request.respond(response)?;
    Ok(())
}

fn send_body(
    request: Request,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
) -> Result<()> {
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(header("Content-Type", content_type)?)
        .with_header(header("Cache-Control", "no-store")?);
    request.respond(response)?;
    Ok(())
}

fn header(field: &'static str, value: &str) -> Result<Header> {
    Header::from_bytes(field, value).map_err(|()| anyhow!("invalid header {field}: {value}"))
}
