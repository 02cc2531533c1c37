//! The `edit` query flag that switches a page into edit mode.
//!
//! Accepts absolute URLs and site-relative ones (`/?edit`, `index.html?edit=1`).

use url::{Position, Url};

const FLAG: &str = "edit";

fn parse(input: &str) -> Option<(Url, bool)> {
    match Url::parse(input) {
        Ok(url) => Some((url, true)),
        Err(_) => {
            let base = Url::parse("http://localhost/").ok()?;
            base.join(input).ok().map(|url| (url, false))
        }
    }
}

/// Whether the URL asks for edit mode. Any value except `false` and `0` counts.
pub fn edit_requested(input: &str) -> bool {
    let Some((url, _)) = parse(input) else {
        return false;
    };
    url.query_pairs()
        .any(|(key, value)| key == FLAG && value != "false" && value != "0")
}

/// The URL to navigate to when editing is cancelled: `edit` removed,
/// other query parameters and the fragment kept.
pub fn exit_url(input: &str) -> String {
    let Some((mut url, absolute)) = parse(input) else {
        return input.to_string();
    };
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != FLAG)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    if absolute {
        url.to_string()
    } else {
        url[Position::BeforePath..].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_forms() {
        assert!(edit_requested("https://example.org/?edit=true"));
        assert!(edit_requested("https://example.org/?edit"));
        assert!(edit_requested("/?lang=pt&edit=1"));
        assert!(!edit_requested("https://example.org/"));
        assert!(!edit_requested("https://example.org/?edit=false"));
        assert!(!edit_requested("https://example.org/?edit=0"));
        assert!(!edit_requested("https://example.org/?editor=true"));
    }

    #[test]
    fn exit_drops_only_the_flag() {
        assert_eq!(
            exit_url("https://example.org/?lang=pt&edit=true#contact"),
            "https://example.org/?lang=pt#contact"
        );
        assert_eq!(exit_url("https://example.org/page?edit=true"), "https://example.org/page");
    }

    #[test]
    fn exit_keeps_relative_urls_relative() {
        assert_eq!(exit_url("/index.html?edit"), "/index.html");
        assert_eq!(exit_url("/?edit=1&x=2"), "/?x=2");
    }
}
