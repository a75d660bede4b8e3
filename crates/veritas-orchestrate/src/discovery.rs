//! Discovery (§4.2, scan step 3 "Discover"): walk a clone's working tree
//! and classify every entry into "goes to the Parser" or one of the
//! [`SkipReason`] buckets, before a single byte is parsed.
//!
//! Grounded on the teacher's `enforce_size_bound` in `hqe-git/src/lib.rs`
//! (`walkdir` run inside `spawn_blocking`, `.git` pruned via
//! `filter_entry`) — the same walk shape, generalized from a byte-sum
//! into a per-file classify/read/record loop.

use std::path::Path;

use veritas_core::coverage::{self, CoverageTracker, MAX_FILE_BYTES, SkipReason};

/// One file that survived classification and is ready for the Parser.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Path relative to the repository root, forward-slash separated
    pub path: String,
    /// Display language name (`"python"`, `"rust"`, …)
    pub language: String,
    /// Full file content
    pub content: String,
}

fn relative_slash_path(root: &Path, entry: &Path) -> String {
    entry
        .strip_prefix(root)
        .unwrap_or(entry)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Walk `root`, classify every regular file, and return the subset that
/// should be parsed. `max_files` caps the discoverable set by path order
/// so the rest are never even read off disk — a scan-request bound, not
/// a [`SkipReason`] in their own right.
pub async fn discover(root: &Path, coverage: &mut CoverageTracker, max_files: Option<usize>) -> Vec<DiscoveredFile> {
    let root_owned = root.to_path_buf();
    let mut paths = tokio::task::spawn_blocking(move || {
        walkdir::WalkDir::new(&root_owned)
            .into_iter()
            .filter_entry(|e| e.file_name() != ".git")
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().to_path_buf())
            .collect::<Vec<_>>()
    })
    .await
    .unwrap_or_default();

    paths.sort();
    if let Some(max) = max_files {
        paths.truncate(max);
    }

    let mut out = Vec::new();
    for path in paths {
        let rel = relative_slash_path(root, &path);
        let (_language, language_name) = veritas_parse::classify_language(&rel);

        if coverage::is_vendor_or_build_dir(&rel) {
            coverage.record_skip(rel, language_name, SkipReason::VendorOrBuildDir);
            continue;
        }
        if coverage::is_binary_extension(&rel) {
            coverage.record_skip(rel, language_name, SkipReason::Binary);
            continue;
        }

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(_) => continue,
        };
        if metadata.len() > MAX_FILE_BYTES {
            coverage.record_skip(rel, language_name, SkipReason::TooLarge);
            continue;
        }

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(_) => {
                coverage.record_skip(rel, language_name, SkipReason::Binary);
                continue;
            }
        };

        if coverage::looks_minified_or_bundle(&content) {
            coverage.record_skip(rel, language_name, SkipReason::MinifiedOrBundle);
            continue;
        }
        if language_name == "unknown" {
            coverage.record_skip(rel, language_name, SkipReason::UnsupportedLanguage);
            continue;
        }

        out.push(DiscoveredFile { path: rel, language: language_name.to_string(), content });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn discovers_source_files_and_skips_vendor_and_binary() {
        let temp = tempfile::TempDir::new().unwrap();
        tokio::fs::create_dir_all(temp.path().join("node_modules/x")).await.unwrap();
        tokio::fs::write(temp.path().join("node_modules/x/index.js"), "var x = 1;").await.unwrap();
        tokio::fs::write(temp.path().join("main.py"), "def main():\n    pass\n").await.unwrap();
        tokio::fs::write(temp.path().join("logo.png"), [0u8, 1, 2]).await.unwrap();

        let mut tracker = CoverageTracker::new(false);
        let files = discover(temp.path(), &mut tracker, None).await;

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "main.py");
        let summary = tracker.finish();
        assert!(summary.skipped.get("vendor_or_build_dir").is_some());
        assert!(summary.skipped.get("binary").is_some());
    }

    #[tokio::test]
    async fn max_files_truncates_the_discoverable_set_by_path_order() {
        let temp = tempfile::TempDir::new().unwrap();
        tokio::fs::write(temp.path().join("a.py"), "x = 1\n").await.unwrap();
        tokio::fs::write(temp.path().join("b.py"), "y = 1\n").await.unwrap();

        let mut tracker = CoverageTracker::new(false);
        let files = discover(temp.path(), &mut tracker, Some(1)).await;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "a.py");
    }

    #[tokio::test]
    async fn unrecognized_extension_is_skipped_as_unsupported_language() {
        let temp = tempfile::TempDir::new().unwrap();
        tokio::fs::write(temp.path().join("firmware.zig"), "const x = 1;\n").await.unwrap();

        let mut tracker = CoverageTracker::new(false);
        let files = discover(temp.path(), &mut tracker, None).await;
        assert!(files.is_empty());
        let summary = tracker.finish();
        assert!(summary.skipped.get("unsupported_language").is_some());
    }
}
