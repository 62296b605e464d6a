//! Embedding rewriter: prepares a fetched page for an enhanced-mode frame.
//!
//! References resolve against the page's directory, a `<base>` tag covers
//! anything the patterns miss, and the bridge script reports selections and
//! link clicks to the embedding host with `postMessage`.

use once_cell::sync::Lazy;
use orb_core::{Error, Result};
use regex::Regex;
use tracing::warn;
use url::Url;

use crate::resolve::{directory_base, origin, resolve_reference};
use crate::rewrite::{insert_after_head, replace_reference, rewrite_css_urls};

/// Marker attribute on the injected script tag.
pub const BRIDGE_MARKER: &str = "data-orb-bridge";

/// Selection/navigation bridge appended before `</body>`.
pub const BRIDGE_SCRIPT: &str = r#"<script data-orb-bridge>
(function () {
  document.addEventListener('mouseup', function () {
    var selection = window.getSelection();
    var text = selection ? selection.toString().trim() : '';
    if (text.length < 1 || text.length > 500) return;
    var r = selection.getRangeAt(0).getBoundingClientRect();
    parent.postMessage({
      type: 'highlight',
      text: text,
      rect: { left: r.left, top: r.top, width: r.width, height: r.height },
      devicePixelRatio: window.devicePixelRatio || 1
    }, '*');
  });

  document.addEventListener('click', function (e) {
    var a = e.target && e.target.closest ? e.target.closest('a') : null;
    if (a && a.href) {
      e.preventDefault();
      parent.postMessage({ type: 'navigate', url: a.href }, '*');
    }
  });

  var style = document.createElement('style');
  style.textContent =
    '::selection { background-color: rgba(147, 51, 234, 0.3) !important; color: inherit !important; }' +
    '::-moz-selection { background-color: rgba(147, 51, 234, 0.3) !important; color: inherit !important; }';
  (document.head || document.documentElement).appendChild(style);
})();
</script>
"#;

static CSS_HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\shref="([^"]+\.css[^"]*)""#).expect("css href regex is valid"));

static ANY_SRC: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\ssrc="([^"]+)""#).expect("src regex is valid"));

static BODY_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</body>").expect("body regex is valid"));

/// Rewrite `html` fetched from `page_url` for embedding. Failures return the input.
pub fn embed(html: &str, page_url: &str) -> String {
    match try_embed(html, page_url) {
        Ok(out) => out,
        Err(e) => {
            warn!(error = %e, page = %page_url, "Embedding rewrite failed, serving original");
            html.to_string()
        }
    }
}

pub fn try_embed(html: &str, page_url: &str) -> Result<String> {
    let page = Url::parse(page_url).map_err(|e| Error::Rewrite(format!("bad page URL {}: {}", page_url, e)))?;
    let dir = directory_base(&page);
    let resolve = |r: &str| {
        if r.starts_with('#') {
            None
        } else {
            resolve_reference(r, &dir)
        }
    };

    let out = replace_reference(&CSS_HREF, html, 1, resolve);
    let out = replace_reference(&ANY_SRC, &out, 1, resolve);
    let out = rewrite_css_urls(&out, resolve);

    let out = if out.contains("<base ") {
        out
    } else {
        let base_tag = format!(r#"<base href="{}{}">"#, origin(&dir), dir.path());
        insert_after_head(&out, &base_tag).unwrap_or(out)
    };

    Ok(append_bridge(&out))
}

fn append_bridge(html: &str) -> String {
    if html.contains(BRIDGE_MARKER) {
        return html.to_string();
    }
    match BODY_CLOSE.find(html) {
        Some(m) => format!("{}{}{}", &html[..m.start()], BRIDGE_SCRIPT, &html[m.start()..]),
        None => format!("{}{}", html, BRIDGE_SCRIPT),
    }
}
