//! Editable regions of a rendered page.
//!
//! Every element carrying a `data-content="field.path"` attribute is an
//! editable region: its text content maps back to that path of the content
//! document. The session only needs the region list and a way to change a
//! region's text, so the page is the [`EditablePage`] trait. [`HtmlPage`]
//! implements it over the built HTML, which is what the `edit` command and
//! the tests use.
//!
//! Regions are single-paragraph by contract: [`key_action`] suppresses a bare
//! Enter, and [`plain_paste`] drops whatever formatting the clipboard carried.

use thiserror::Error;

/// One `data-content` element and its current text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub path: String,
    pub text: String,
}

pub trait EditablePage {
    /// Make every region interactive. Idempotent.
    fn enable_editing(&mut self);

    fn is_editing(&self) -> bool;

    /// Regions in document order. Several regions may share a path.
    fn regions(&self) -> Vec<Region>;

    /// Replace the text of every region bound to `path`.
    ///
    /// Returns how many regions changed; always 0 before editing is enabled.
    fn set_text(&mut self, path: &str, text: &str) -> usize;

    /// Append clipboard content, as plain text, to the regions bound to `path`.
    fn paste(&mut self, path: &str, clipboard: &Clipboard) -> usize {
        let Some(current) = self.regions().into_iter().find(|r| r.path == path) else {
            return 0;
        };
        let text = format!("{}{}", current.text, plain_paste(clipboard));
        self.set_text(path, &text)
    }
}

#[derive(Debug, Error)]
pub enum PageError {
    #[error("cannot parse page: {0}")]
    Parse(String),
}

/// Regions parsed out of an HTML document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HtmlPage {
    regions: Vec<Region>,
    editing: bool,
}

impl HtmlPage {
    /// Find every `data-content` element in `html`.
    ///
    /// The region text is the element's text with nested tags stripped.
    /// Character references and whitespace stay as written, so an unedited
    /// region reads back exactly what the build rendered into it.
    /// `<script>` and `<style>` bodies are skipped.
    pub fn parse(html: &str) -> Result<Self, PageError> {
        let dom = tl::parse(html, tl::ParserOptions::default()).map_err(|e| PageError::Parse(e.to_string()))?;
        let mut regions = Vec::new();
        collect_regions(dom.children(), dom.parser(), &mut regions);
        Ok(Self {
            regions,
            editing: false,
        })
    }

    pub fn from_regions(regions: Vec<Region>) -> Self {
        Self {
            regions,
            editing: false,
        }
    }
}

impl EditablePage for HtmlPage {
    fn enable_editing(&mut self) {
        self.editing = true;
    }

    fn is_editing(&self) -> bool {
        self.editing
    }

    fn regions(&self) -> Vec<Region> {
        self.regions.clone()
    }

    fn set_text(&mut self, path: &str, text: &str) -> usize {
        if !self.editing {
            return 0;
        }
        let mut changed = 0;
        for region in self.regions.iter_mut().filter(|r| r.path == path) {
            region.text = text.to_string();
            changed += 1;
        }
        changed
    }
}

// ============================================================================
// Editing rules
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn any(self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Let the key through.
    Default,
    /// Swallow the key press.
    Suppress,
}

/// What a key press inside a region should do.
pub fn key_action(key: &str, modifiers: Modifiers) -> KeyAction {
    if key == "Enter" && !modifiers.any() {
        KeyAction::Suppress
    } else {
        KeyAction::Default
    }
}

/// The flavours a clipboard may offer on paste.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clipboard {
    pub plain: Option<String>,
    pub html: Option<String>,
}

/// The text inserted on paste: the plain flavour, else the HTML flavour's text.
pub fn plain_paste(clipboard: &Clipboard) -> String {
    match (&clipboard.plain, &clipboard.html) {
        (Some(plain), _) => plain.clone(),
        (None, Some(html)) => text_content(html),
        (None, None) => String::new(),
    }
}

// ============================================================================
// HTML walking
// ============================================================================

const RAW_TEXT: &[&str] = &["script", "style"];

/// Depth-first walk in document order, not descending into raw-text elements.
fn collect_regions(handles: &[tl::NodeHandle], parser: &tl::Parser, regions: &mut Vec<Region>) {
    for handle in handles {
        let Some(tag) = handle.get(parser).and_then(|node| node.as_tag()) else {
            continue;
        };
        let name = tag.name().as_utf8_str();
        if RAW_TEXT.iter().any(|raw| name.eq_ignore_ascii_case(*raw)) {
            continue;
        }
        if let Some(path) = tag.attributes().get("data-content").flatten() {
            regions.push(Region {
                path: path.as_utf8_str().into_owned(),
                text: tag.inner_text(parser).into_owned(),
            });
        }
        let children: Vec<tl::NodeHandle> = tag.children().top().iter().copied().collect();
        collect_regions(&children, parser, regions);
    }
}

/// Text of an HTML fragment with the tags stripped.
fn text_content(fragment: &str) -> String {
    let Ok(dom) = tl::parse(fragment, tl::ParserOptions::default()) else {
        return fragment.to_string();
    };
    let parser = dom.parser();
    dom.children()
        .iter()
        .filter_map(|handle| handle.get(parser))
        .map(|node| node.inner_text(parser))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> HtmlPage {
        HtmlPage::parse(html).unwrap()
    }

    fn paths(page: &HtmlPage) -> Vec<String> {
        page.regions().into_iter().map(|r| r.path).collect()
    }

    #[test]
    fn finds_regions_in_document_order() {
        let page = parse(
            r#"<h1 data-content="hero.headline">Olá</h1>
               <p class="lead" data-content='hero.sub'>Move <em>better</em></p>"#,
        );
        assert_eq!(
            page.regions(),
            vec![
                Region {
                    path: "hero.headline".into(),
                    text: "Olá".into()
                },
                Region {
                    path: "hero.sub".into(),
                    text: "Move better".into()
                },
            ]
        );
    }

    #[test]
    fn nested_same_tag_is_balanced() {
        let page = parse(r#"<div data-content="a"><div>x</div>y</div><div>z</div>"#);
        assert_eq!(page.regions()[0].text, "xy");
    }

    #[test]
    fn nested_regions_are_both_found() {
        let page = parse(r#"<div data-content="outer"><span data-content="inner">i</span>o</div>"#);
        assert_eq!(paths(&page), vec!["outer", "inner"]);
        assert_eq!(page.regions()[0].text, "io");
    }

    #[test]
    fn character_references_are_kept_as_written() {
        let page = parse(r#"<p data-content="t">Tom &amp; Jerry</p>"#);
        assert_eq!(page.regions()[0].text, "Tom &amp; Jerry");
    }

    #[test]
    fn trailing_slash_in_unquoted_attribute_keeps_text() {
        let page = parse(r#"<a data-content=contact.site href=https://example.org/>Visit us</a>"#);
        assert_eq!(
            page.regions(),
            vec![Region {
                path: "contact.site".into(),
                text: "Visit us".into()
            }]
        );
    }

    #[test]
    fn whitespace_is_preserved() {
        let page = parse("<p data-content=\"t\">\n  spaced  \n</p>");
        assert_eq!(page.regions()[0].text, "\n  spaced  \n");
    }

    #[test]
    fn scripts_and_comments_are_skipped() {
        let html = r#"<script>var s = '<p data-content="fake">x</p>';</script>
            <!-- <p data-content="commented">x</p> -->
            <p data-content="real">ok</p>"#;
        assert_eq!(paths(&parse(html)), vec!["real"]);
    }

    #[test]
    fn quoted_gt_inside_attribute() {
        let page = parse(r#"<a title="a > b" data-content="x">link</a>"#);
        assert_eq!(page.regions()[0].text, "link");
    }

    #[test]
    fn void_element_has_empty_text() {
        let page = parse(r#"<img data-content="photo.alt" src="a.png"><p>after</p>"#);
        assert_eq!(page.regions()[0].text, "");
    }

    #[test]
    fn set_text_requires_editing() {
        let mut page = parse(r#"<p data-content="a">1</p><p data-content="a">1</p>"#);
        assert_eq!(page.set_text("a", "2"), 0);
        page.enable_editing();
        assert_eq!(page.set_text("a", "2"), 2);
        assert_eq!(page.set_text("missing", "2"), 0);
        assert!(page.regions().iter().all(|r| r.text == "2"));
    }

    #[test]
    fn paste_appends_plain_text() {
        let mut page = HtmlPage::from_regions(vec![Region {
            path: "a".into(),
            text: "Hello ".into(),
        }]);
        page.enable_editing();
        let clipboard = Clipboard {
            plain: None,
            html: Some("<b>world</b>".into()),
        };
        assert_eq!(page.paste("a", &clipboard), 1);
        assert_eq!(page.regions()[0].text, "Hello world");
    }

    #[test]
    fn plain_paste_prefers_plain_flavour() {
        let clipboard = Clipboard {
            plain: Some("plain".into()),
            html: Some("<i>rich</i>".into()),
        };
        assert_eq!(plain_paste(&clipboard), "plain");
        assert_eq!(plain_paste(&Clipboard::default()), "");
    }

    #[test]
    fn enter_without_modifier_is_suppressed() {
        assert_eq!(key_action("Enter", Modifiers::default()), KeyAction::Suppress);
        let shift = Modifiers {
            shift: true,
            ..Modifiers::default()
        };
        assert_eq!(key_action("Enter", shift), KeyAction::Default);
        assert_eq!(key_action("a", Modifiers::default()), KeyAction::Default);
    }
}
