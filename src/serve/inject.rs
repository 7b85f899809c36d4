//! Reload script injection into HTML responses.

use crate::utils::mime;

/// Inject `script` if the response is HTML, pass everything else through.
pub fn maybe_inject(body: Vec<u8>, content_type: &str, script: &str) -> Vec<u8> {
    if mime::is_html(content_type) {
        inject_script(&body, script)
    } else {
        body
    }
}

/// Inject script before the last `</body>` tag, or append when there is none.
pub fn inject_script(content: &[u8], script: &str) -> Vec<u8> {
    let script_bytes = script.as_bytes();

    // Byte pattern for </body> - most generators use lowercase
    const PATTERN: &[u8] = b"</body>";

    let mut result = Vec::with_capacity(content.len() + script_bytes.len());

    // Reverse search for </body> using byte windows
    if let Some(pos) = content
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
    {
        result.extend_from_slice(&content[..pos]);
        result.extend_from_slice(script_bytes);
        result.extend_from_slice(&content[pos..]);
        return result;
    }

    // No </body> found, append to end (browsers handle this gracefully)
    result.extend_from_slice(content);
    result.extend_from_slice(script_bytes);
    result
}
