//! URL to filesystem path resolution.

use std::path::{Path, PathBuf};

/// What a request URL points at under the served root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    File(PathBuf),
    /// Directory without an `index.html`
    Directory(PathBuf),
    /// Directory requested without a trailing slash; holds the URL to
    /// redirect to so relative links resolve inside it.
    Redirect(String),
    NotFound,
}

/// Resolve URL to filesystem path, handling index.html for directories
pub fn resolve_path(url: &str, serve_root: &Path) -> Resolved {
    let clean = normalize_url(url);

    // Reject paths with suspicious patterns early
    if clean.split('/').any(|segment| segment == "..") {
        return Resolved::NotFound;
    }

    let local = serve_root.join(&clean);

    // Canonicalize to resolve symlinks and verify path is under serve_root
    let (Ok(canonical), Ok(root_canonical)) = (local.canonicalize(), serve_root.canonicalize())
    else {
        return Resolved::NotFound;
    };

    if !canonical.starts_with(&root_canonical) {
        return Resolved::NotFound;
    }

    if canonical.is_file() {
        return Resolved::File(canonical);
    }

    if canonical.is_dir() {
        let path_len = url.find(['?', '#']).unwrap_or(url.len());
        let (path, rest) = url.split_at(path_len);
        if !path.ends_with('/') {
            return Resolved::Redirect(format!("{path}/{rest}"));
        }

        let index = canonical.join("index.html");
        if index.is_file() {
            return Resolved::File(index);
        }
        return Resolved::Directory(canonical);
    }

    Resolved::NotFound
}

/// Normalize URL: decode, strip query string and fragment, trim slashes
pub fn normalize_url(url: &str) -> String {
    use percent_encoding::percent_decode_str;

    let path = url.split(['?', '#']).next().unwrap_or(url);
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();

    decoded.trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<body></body>").unwrap();
        fs::write(dir.path().join("my page.html"), "x").unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/index.html"), "docs").unwrap();
        fs::create_dir(dir.path().join("assets")).unwrap();
        fs::write(dir.path().join("assets/app.css"), "body{}").unwrap();
        dir
    }

    #[test]
    fn test_root_serves_index() {
        let dir = site();
        let root = dir.path().canonicalize().unwrap();
        assert_eq!(
            resolve_path("/", dir.path()),
            Resolved::File(root.join("index.html"))
        );
        assert_eq!(
            resolve_path("/docs/", dir.path()),
            Resolved::File(root.join("docs/index.html"))
        );
    }

    #[test]
    fn test_file_with_query_and_encoding() {
        let dir = site();
        let root = dir.path().canonicalize().unwrap();
        assert_eq!(
            resolve_path("/assets/app.css?v=3", dir.path()),
            Resolved::File(root.join("assets/app.css"))
        );
        assert_eq!(
            resolve_path("/my%20page.html", dir.path()),
            Resolved::File(root.join("my page.html"))
        );
    }

    #[test]
    fn test_directory_without_index() {
        let dir = site();
        let root = dir.path().canonicalize().unwrap();
        assert_eq!(
            resolve_path("/assets/", dir.path()),
            Resolved::Directory(root.join("assets"))
        );
    }

    #[test]
    fn test_directory_without_slash_redirects() {
        let dir = site();
        assert_eq!(
            resolve_path("/assets", dir.path()),
            Resolved::Redirect("/assets/".to_string())
        );
        assert_eq!(
            resolve_path("/docs?lang=en", dir.path()),
            Resolved::Redirect("/docs/?lang=en".to_string())
        );
    }

    #[test]
    fn test_missing_and_traversal() {
        let dir = site();
        assert_eq!(resolve_path("/nope.html", dir.path()), Resolved::NotFound);
        assert_eq!(resolve_path("/../etc/passwd", dir.path()), Resolved::NotFound);
        assert_eq!(resolve_path("/%2e%2e/etc/passwd", dir.path()), Resolved::NotFound);
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("/a/b/?x=1#top"), "a/b");
        assert_eq!(normalize_url("/caf%C3%A9"), "café");
        assert_eq!(normalize_url("/"), "");
    }
}
