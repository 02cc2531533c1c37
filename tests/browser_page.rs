//! Browser tests for the built fixture page: structured data, editable
//! regions and scroll reveal.
//!
//! Run with: `cargo test --test browser_page -- --ignored`

use headless_chrome::{Browser, LaunchOptions, Tab};
use std::path::PathBuf;
use std::process::Command;
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Setup helpers
// ---------------------------------------------------------------------------

fn generated_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/browser/generated")
}

fn ensure_fixtures_built() {
    static BUILT: OnceLock<()> = OnceLock::new();
    BUILT.get_or_init(|| {
        let bin = env!("CARGO_BIN_EXE_simple-page");
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");

        let output_dir = generated_dir();
        if output_dir.exists() {
            std::fs::remove_dir_all(&output_dir).expect("failed to clean output dir");
        }

        let status = Command::new(bin)
            .args([
                "--source",
                root.join("src").to_str().unwrap(),
                "--root",
                root.to_str().unwrap(),
                "--output",
                output_dir.to_str().unwrap(),
                "build",
            ])
            .status()
            .expect("failed to run simple-page");
        assert!(status.success(), "fixture generation failed");
    });
}

fn browser() -> &'static Browser {
    static B: OnceLock<Browser> = OnceLock::new();
    B.get_or_init(|| {
        Browser::new(LaunchOptions {
            window_size: Some((1280, 800)),
            ..Default::default()
        })
        .expect("failed to launch Chrome")
    })
}

fn load_index() -> Arc<Tab> {
    ensure_fixtures_built();
    let tab = browser().new_tab().unwrap();
    let file = generated_dir().join("index.html");
    let url = format!("file://{}", file.display());
    tab.navigate_to(&url).unwrap().wait_until_navigated().unwrap();
    tab
}

fn eval_bool(tab: &Tab, js: &str) -> bool {
    tab.evaluate(js, false).unwrap().value.unwrap().as_bool().unwrap()
}

fn eval_u64(tab: &Tab, js: &str) -> u64 {
    tab.evaluate(js, false).unwrap().value.unwrap().as_u64().unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
#[ignore]
fn structured_data_blocks_parse() {
    let tab = load_index();
    let count = eval_u64(
        &tab,
        r#"Array.from(document.querySelectorAll('head script[type="application/ld+json"]'))
            .filter(s => { try { JSON.parse(s.textContent); return true; } catch (e) { return false; } })
            .length"#,
    );
    assert_eq!(count, 6);
}

#[test]
#[ignore]
fn every_region_is_annotated() {
    let tab = load_index();
    assert_eq!(eval_u64(&tab, "document.querySelectorAll('[data-content]').length"), 26);
    assert!(eval_bool(
        &tab,
        "document.querySelector('[data-content=\"services.items.1.title\"]').textContent === 'Surgical prehabilitation'"
    ));
}

#[test]
#[ignore]
fn sections_in_view_are_revealed() {
    let tab = load_index();
    thread::sleep(Duration::from_millis(300));
    assert!(eval_bool(
        &tab,
        "document.querySelector('.hero').classList.contains('section--visible')"
    ));
    assert!(eval_bool(
        &tab,
        "document.querySelector('.trust-bar').classList.contains('trust-bar--visible')"
    ));
}

#[test]
#[ignore]
fn scrolling_reveals_the_last_section() {
    let tab = load_index();
    tab.evaluate("window.scrollTo(0, document.body.scrollHeight)", false)
        .unwrap();
    thread::sleep(Duration::from_millis(300));
    assert!(eval_bool(
        &tab,
        "document.querySelector('.contact').classList.contains('section--visible')"
    ));
}
