//! Server-side HTML rewriting for constrained embedding.
//!
//! [`rewrite`] turns every relative resource reference into an absolute one and
//! injects a permissive CSP plus a viewport meta. It performs no I/O and is
//! idempotent: absolute references are never touched again and the metas are
//! only injected when missing.

use once_cell::sync::Lazy;
use orb_core::{Error, Result};
use regex::{Captures, Regex};
use tracing::warn;
use url::Url;

use crate::resolve::{is_absolute, resolve_reference};

pub const CSP_CONTENT: &str = "default-src * 'unsafe-inline' 'unsafe-eval'; script-src * 'unsafe-inline' 'unsafe-eval'; connect-src * 'unsafe-inline'; img-src * data: blob: 'unsafe-inline'; frame-src *; style-src * 'unsafe-inline';";

pub const VIEWPORT_META: &str = r#"<meta name="viewport" content="width=device-width, initial-scale=1.0">"#;

static HEAD_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<head(?:\s[^>]*)?>").expect("head regex is valid"));

static CSS_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)@import\s+(?:url\(\s*)?["']?([^"')\s;]+)"#).expect("import regex is valid")
});

static LINK_HREF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<link\b[^>]*?\shref\s*=\s*["']([^"']+)["']"#).expect("link regex is valid")
});

static SCRIPT_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<script\b[^>]*?\ssrc\s*=\s*["']([^"']+)["']"#).expect("script regex is valid")
});

static IMG_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*?\ssrc\s*=\s*["']([^"']+)["']"#).expect("img regex is valid")
});

static STYLE_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\sstyle\s*=\s*("[^"]*"|'[^']*')"#).expect("style regex is valid")
});

pub(crate) static CSS_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)url\(\s*(["']?)([^"')]+)["']?\s*\)"#).expect("css url regex is valid")
});

/// Rewrite `html` fetched from `base_url`. Any failure yields the input unchanged.
pub fn rewrite(html: &str, base_url: &str) -> String {
    match try_rewrite(html, base_url) {
        Ok(out) => out,
        Err(e) => {
            warn!(error = %e, base = %base_url, "HTML rewrite failed, serving original");
            html.to_string()
        }
    }
}

pub fn try_rewrite(html: &str, base_url: &str) -> Result<String> {
    let base = Url::parse(base_url).map_err(|e| Error::Rewrite(format!("bad base URL {}: {}", base_url, e)))?;

    let out = replace_reference(&CSS_IMPORT, html, 1, |r| resolve_reference(r, &base));
    let out = replace_reference(&LINK_HREF, &out, 1, |r| {
        if r.starts_with('#') {
            None
        } else {
            resolve_reference(r, &base)
        }
    });
    let out = replace_reference(&SCRIPT_SRC, &out, 1, |r| resolve_reference(r, &base));
    let out = replace_reference(&IMG_SRC, &out, 1, |r| resolve_reference(r, &base));
    let out = rewrite_style_backgrounds(&out, &base);

    Ok(inject_head_metas(&out))
}

/// Replace capture `group` of every match of `re` with `resolve(reference)` when the
/// reference is relative and resolvable. Everything else in the match is kept verbatim.
pub(crate) fn replace_reference<F>(re: &Regex, html: &str, group: usize, resolve: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    re.replace_all(html, |caps: &Captures| {
        let whole = &caps[0];
        let Some(m) = caps.get(group) else {
            return whole.to_string();
        };
        let reference = m.as_str();
        if is_absolute(reference) {
            return whole.to_string();
        }
        match resolve(reference) {
            Some(full) => splice(caps, group, &full),
            None => whole.to_string(),
        }
    })
    .into_owned()
}

/// `caps[0]` with capture `group` replaced by `replacement`.
fn splice(caps: &Captures, group: usize, replacement: &str) -> String {
    let (Some(whole), Some(m)) = (caps.get(0), caps.get(group)) else {
        return caps[0].to_string();
    };
    let text = whole.as_str();
    let start = m.start() - whole.start();
    let end = m.end() - whole.start();
    format!("{}{}{}", &text[..start], replacement, &text[end..])
}

fn rewrite_style_backgrounds(html: &str, base: &Url) -> String {
    STYLE_ATTR
        .replace_all(html, |caps: &Captures| {
            let whole = &caps[0];
            if !whole.to_ascii_lowercase().contains("background") {
                return whole.to_string();
            }
            rewrite_css_urls(whole, |r| resolve_reference(r, base))
        })
        .into_owned()
}

/// Rewrite every relative `url(...)` in `css`, keeping the original quote character.
pub(crate) fn rewrite_css_urls<F>(css: &str, resolve: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    CSS_URL
        .replace_all(css, |caps: &Captures| {
            let quote = &caps[1];
            let reference = caps[2].trim();
            if is_absolute(reference) {
                return caps[0].to_string();
            }
            match resolve(reference) {
                Some(full) => format!("url({}{}{})", quote, full, quote),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Insert `snippet` right after the opening `<head>` tag. `None` when there is no head.
pub(crate) fn insert_after_head(html: &str, snippet: &str) -> Option<String> {
    let m = HEAD_OPEN.find(html)?;
    let mut out = String::with_capacity(html.len() + snippet.len() + 1);
    out.push_str(&html[..m.end()]);
    out.push('\n');
    out.push_str(snippet);
    out.push_str(&html[m.end()..]);
    Some(out)
}

fn inject_head_metas(html: &str) -> String {
    let has_csp = html.to_ascii_lowercase().contains("http-equiv=\"content-security-policy\"");
    let has_viewport = html.contains("viewport");

    let mut snippet = String::new();
    if !has_csp {
        snippet.push_str(&format!(
            r#"<meta http-equiv="Content-Security-Policy" content="{}">"#,
            CSP_CONTENT
        ));
    }
    if !has_viewport {
        if !snippet.is_empty() {
            snippet.push('\n');
        }
        snippet.push_str(VIEWPORT_META);
    }
    if snippet.is_empty() {
        return html.to_string();
    }
    insert_after_head(html, &snippet).unwrap_or_else(|| html.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://ex.com/dir/p";

    #[test]
    fn test_link_script_img() {
        let html = r#"<html><head><link rel="stylesheet" href="/a.css"></head><body><script src="app.js"></script><img class="x" src='img/logo.png' alt="l"></body></html>"#;
        let out = rewrite(html, BASE);
        assert!(out.contains(r#"<link rel="stylesheet" href="https://ex.com/a.css">"#));
        assert!(out.contains(r#"<script src="https://ex.com/dir/app.js">"#));
        assert!(out.contains(r#"<img class="x" src='https://ex.com/dir/img/logo.png' alt="l">"#));
    }

    #[test]
    fn test_absolute_and_fragment_untouched() {
        let html = r##"<head></head><link href="https://cdn.test/x.css"><link href="#main"><script src="//cdn.test/a.js"></script><img src="data:image/gif;base64,R0lG">"##;
        let out = rewrite(html, BASE);
        assert!(out.contains(r#"<link href="https://cdn.test/x.css">"#));
        assert!(out.contains(r##"<link href="#main">"##));
        assert!(out.contains(r#"<script src="//cdn.test/a.js">"#));
        assert!(out.contains(r#"<img src="data:image/gif;base64,R0lG">"#));
    }

    #[test]
    fn test_icon_link() {
        let html = r#"<head><link rel="icon" href="favicon.ico"></head>"#;
        assert!(rewrite(html, BASE).contains(r#"href="https://ex.com/dir/favicon.ico""#));
    }

    #[test]
    fn test_css_import() {
        let html = "<head><style>@import url('/theme.css'); @import \"print.css\";</style></head>";
        let out = rewrite(html, BASE);
        assert!(out.contains("@import url('https://ex.com/theme.css')"));
        assert!(out.contains("@import \"https://ex.com/dir/print.css\""));
    }

    #[test]
    fn test_inline_background() {
        let html = r#"<head></head><div style="color:red; background: url('bg/hero.jpg') no-repeat">x</div><div style="border: url(a.png)">y</div>"#;
        let out = rewrite(html, BASE);
        assert!(out.contains(r#"background: url('https://ex.com/dir/bg/hero.jpg') no-repeat"#));
        // Only background declarations are rewritten.
        assert!(out.contains("border: url(a.png)"));
    }

    #[test]
    fn test_csp_is_first_child_and_viewport_added() {
        let out = rewrite("<html><head><title>T</title></head></html>", BASE);
        let head = out.find("<head>").unwrap();
        let after = &out[head + "<head>".len()..];
        assert!(after.trim_start().starts_with(r#"<meta http-equiv="Content-Security-Policy""#));
        assert!(out.contains(VIEWPORT_META));
    }

    #[test]
    fn test_existing_viewport_kept() {
        let html = r#"<head><meta name="viewport" content="width=500"></head>"#;
        let out = rewrite(html, BASE);
        assert!(!out.contains(VIEWPORT_META));
        assert!(out.contains("Content-Security-Policy"));
    }

    #[test]
    fn test_head_with_attributes() {
        let out = rewrite(r#"<HEAD lang="en"></HEAD>"#, BASE);
        assert!(out.starts_with("<HEAD lang=\"en\">\n<meta http-equiv"));
    }

    #[test]
    fn test_idempotent() {
        let html = r#"<html><head><link href="/a.css" rel="stylesheet"></head><body><img src="x.png"><div style="background:url(/b.png)"></div></body></html>"#;
        let once = rewrite(html, BASE);
        let twice = rewrite(&once, BASE);
        assert_eq!(once, twice);
        assert!(!twice.contains("https://ex.comhttps://"));
    }

    #[test]
    fn test_bad_base_returns_original() {
        let html = r#"<head><link href="/a.css"></head>"#;
        assert_eq!(rewrite(html, "not a url"), html);
        assert!(matches!(try_rewrite(html, "not a url"), Err(Error::Rewrite(_))));
    }
}
