//! Generated index page for directories without `index.html`.

use std::fs;
use std::io;
use std::path::Path;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::utils::html::{escape, escape_attr};

/// Characters escaped in a single path segment of an href.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

struct Entry {
    name: String,
    is_dir: bool,
}

/// Render a listing of `dir`, linked relative to `url_path`.
///
/// Directories first, then files, each alphabetically.
pub fn render(dir: &Path, url_path: &str) -> io::Result<String> {
    let mut entries: Vec<Entry> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| Entry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir: entry.file_type().is_ok_and(|t| t.is_dir()),
        })
        .collect();
    entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));

    let base = url_path.trim_end_matches('/');
    let title = format!("Index of {}/", base);

    let mut html = String::with_capacity(256 + entries.len() * 64);
    html.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>");
    html.push_str(&escape(&title));
    html.push_str("</title></head><body>\n<h1>");
    html.push_str(&escape(&title));
    html.push_str("</h1>\n<ul>\n");

    if !base.is_empty() {
        html.push_str("<li><a href=\"../\">../</a></li>\n");
    }

    for entry in &entries {
        let slash = if entry.is_dir { "/" } else { "" };
        let href = format!(
            "{}/{}{}",
            base,
            utf8_percent_encode(&entry.name, SEGMENT),
            slash
        );
        html.push_str(&format!(
            "<li><a href=\"{}\">{}{}</a></li>\n",
            escape_attr(&href),
            escape(&entry.name),
            slash
        ));
    }

    html.push_str("</ul>\n</body></html>\n");
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_first_and_links() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.css"), "").unwrap();
        fs::write(dir.path().join("a b.js"), "").unwrap();
        fs::create_dir(dir.path().join("z-img")).unwrap();

        let html = render(dir.path(), "/assets/").unwrap();

        assert!(html.contains("<title>Index of /assets/</title>"));
        assert!(html.contains("<a href=\"../\">"));
        let img = html.find("href=\"/assets/z-img/\"").unwrap();
        let script = html.find("href=\"/assets/a%20b.js\"").unwrap();
        let style = html.find("href=\"/assets/b.css\"").unwrap();
        assert!(img < script && script < style);
    }

    #[test]
    fn test_names_are_escaped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("<x>&.html"), "").unwrap();

        let html = render(dir.path(), "/").unwrap();
        assert!(html.contains("&lt;x&gt;&amp;.html</a>"));
        assert!(!html.contains("<x>"));
        // root listing has no parent link
        assert!(!html.contains("../"));
    }
}
