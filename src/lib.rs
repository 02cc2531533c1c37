//! # Simple Page
//!
//! A minimal static site generator for single-page profile sites, with
//! in-place editing of the page's text. One HTML template and one JSON
//! content document become one page; the owner edits the text on the page
//! itself and publishes it back to the content document in the site's
//! repository, which triggers the next build.
//!
//! # Architecture: Build and Edit
//!
//! ```text
//! build   template.html + content.json + site.toml  →  dist/index.html (+ assets)
//! edit    dist/index.html  →  data-content regions  →  content.json (remote, CAS)
//! ```
//!
//! The two halves share one convention: the **field path**. A placeholder
//! `{{services.items.0.title}}` reads the document at that path during the
//! build, and an element annotated `data-content="services.items.0.title"`
//! writes back to the same path when edited. [`path`] implements both
//! directions.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`path`] | Field-path resolve and assign over the content document |
//! | [`template`] | `{{…}}` template parser (typed AST) and renderer |
//! | [`structured_data`] | schema.org JSON-LD records injected into the page head |
//! | [`generate`] | The build: config, derived values, render, write, copy assets |
//! | [`config`] | `site.toml` loading, merging over stock defaults, validation |
//! | [`editor`] | Edit session state machine and its capabilities |
//! | [`reveal`] | Scroll-reveal of page sections |
//! | [`output`] | CLI output formatting for every command |
//!
//! # Design Decisions
//!
//! ## A Parsed Template, Not Repeated Substitution
//!
//! Templates are tokenized and parsed into an AST once. Nested `{{#each}}`
//! blocks are ordinary recursion, and unbalanced blocks are a parse error with
//! a byte offset instead of silently surviving into the output.
//!
//! ## Missing Data Renders Empty
//!
//! A placeholder whose path does not resolve renders as an empty string, and
//! a block over a missing list renders nothing. Removing a section of content
//! is done by removing its data; the template does not need to change.
//!
//! ## Compare-and-Swap Publishing
//!
//! Publishing re-reads the remote document, folds the edited regions into it,
//! and writes only if the remote revision is still the one just read. Another
//! editor's commit in between surfaces as a conflict; nothing is overwritten.
//! Only text is ever written back: a region whose original value is a number,
//! list or mapping is left alone even if its rendered text was changed.
//!
//! ## Capabilities as Traits
//!
//! The edit session and the scroll reveal depend on platform services
//! (storage, prompts, the remote store, the page, viewport intersection).
//! Each is a trait, so the CLI, the tests and a browser host each supply
//! their own.

pub mod config;
pub mod editor;
pub mod generate;
pub mod output;
pub mod path;
pub mod reveal;
pub mod structured_data;
pub mod template;

#[cfg(test)]
pub(crate) mod test_helpers;
