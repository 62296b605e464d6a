//! Relative → absolute reference resolution shared by both rewriters.

use url::Url;

/// References left untouched: anything with a scheme (`https:`, `data:`, `mailto:` ...)
/// and protocol-relative `//host/...`.
pub fn is_absolute(reference: &str) -> bool {
    let r = reference.trim_start();
    r.starts_with("//") || has_scheme(r)
}

fn has_scheme(r: &str) -> bool {
    let Some(colon) = r.find(':') else {
        return false;
    };
    let scheme = &r[..colon];
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// `scheme://host[:port]` of `url`.
pub fn origin(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Resolve `reference` for a page whose base is `base`.
///
/// Root-relative references are prefixed with the origin; anything else is
/// joined against `base`. Absolute references come back unchanged.
pub fn resolve_reference(reference: &str, base: &Url) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    if is_absolute(reference) {
        return Some(reference.to_string());
    }
    if reference.starts_with('/') {
        return Some(format!("{}{}", origin(base), reference));
    }
    base.join(reference).ok().map(String::from)
}

/// The page URL truncated to its directory: `https://ex.com/a/b/page.html` → `https://ex.com/a/b/`.
pub fn directory_base(page: &Url) -> Url {
    let mut dir = page.clone();
    dir.set_query(None);
    dir.set_fragment(None);
    let path = page.path();
    let cut = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    dir.set_path(&path[..cut]);
    dir
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://ex.com/dir/p").unwrap()
    }

    #[test]
    fn test_root_relative() {
        assert_eq!(resolve_reference("/a.css", &page()).as_deref(), Some("https://ex.com/a.css"));
    }

    #[test]
    fn test_document_relative() {
        assert_eq!(resolve_reference("a.css", &page()).as_deref(), Some("https://ex.com/dir/a.css"));
        assert_eq!(resolve_reference("../up.png", &page()).as_deref(), Some("https://ex.com/up.png"));
    }

    #[test]
    fn test_absolute_untouched() {
        for r in [
            "https://cdn.test/x.js",
            "HTTP://cdn.test/x.js",
            "//cdn.test/x.js",
            "data:image/png;base64,AA",
            "mailto:someone@ex.com",
        ] {
            assert!(is_absolute(r), "{}", r);
            assert_eq!(resolve_reference(r, &page()).as_deref(), Some(r));
        }
    }

    #[test]
    fn test_colon_in_path_is_relative() {
        assert!(!is_absolute("img/a:b.png"));
        assert!(!is_absolute("/x:y"));
        assert!(!is_absolute("1abc:x"));
    }

    #[test]
    fn test_origin_keeps_port() {
        let url = Url::parse("http://ex.com:8080/x/y").unwrap();
        assert_eq!(origin(&url), "http://ex.com:8080");
    }

    #[test]
    fn test_directory_base() {
        let url = Url::parse("https://ex.com/a/b/page.html?x=1#top").unwrap();
        assert_eq!(directory_base(&url).as_str(), "https://ex.com/a/b/");
        let root = Url::parse("https://ex.com").unwrap();
        assert_eq!(directory_base(&root).as_str(), "https://ex.com/");
    }
}
