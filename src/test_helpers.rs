//! Shared test utilities for the simple-page test suite.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let report = build(&tmp.path().join("src"), tmp.path(), &tmp.path().join("dist")).unwrap();
//! let page = read_output(&tmp, "index.html");
//! ```

use std::path::Path;
use tempfile::TempDir;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// The copy holds the project root (`robots.txt`) with the source directory
/// under `src/`. Tests get an isolated copy they can mutate without affecting
/// other tests or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Lookup helpers
// =========================================================================

/// Read a file from the `dist/` directory of a fixture copy.
pub fn read_output(tmp: &TempDir, relative: &str) -> String {
    let path = tmp.path().join("dist").join(relative);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
}

/// The fixture content document, parsed.
pub fn fixture_content(tmp: &TempDir) -> serde_json::Value {
    let text = std::fs::read_to_string(tmp.path().join("src/content.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}
