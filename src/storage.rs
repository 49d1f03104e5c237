//! Storage helpers for novel output folders on disk.
//!
//! Each archived novel owns one folder under the output directory:
//! `{output_dir}/{slug}/meta.json` plus `{output_dir}/{slug}/images/`.

use std::path::{Path, PathBuf};

/// Derive a folder slug for a novel from its title, falling back to the
/// source URL when no title is known yet.
///
/// Unicode letters and digits are kept (many sources carry non-ASCII
/// titles); everything else collapses to single dashes.
pub fn novel_slug(title: &str, url: &str) -> String {
    let base = if title.trim().is_empty() { url } else { title };
    let mut slug = String::with_capacity(base.len());
    let mut pending_dash = false;
    for ch in base.trim().to_lowercase().chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(ch);
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "novel".to_string()
    } else {
        slug
    }
}

/// Output folder for one novel.
pub fn novel_dir(output_dir: &Path, slug: &str) -> PathBuf {
    output_dir.join(slug)
}

/// Path of the serialized crawl session inside a novel folder.
pub fn meta_path(novel_dir: &Path) -> PathBuf {
    novel_dir.join("meta.json")
}

/// Image folder inside a novel folder.
pub fn images_dir(novel_dir: &Path) -> PathBuf {
    novel_dir.join("images")
}

/// Total size in bytes of a folder tree. Unreadable entries count as zero;
/// a missing folder has size zero.
pub fn folder_size(path: &Path) -> u64 {
    let entries = match std::fs::read_dir(path) {
        Ok(entries) => entries,
        Err(_) => return 0,
    };

    let mut total = 0u64;
    for entry in entries.flatten() {
        let meta = match entry.metadata() {
            Ok(meta) => meta,
            Err(_) => continue,
        };
        if meta.is_dir() {
            total += folder_size(&entry.path());
        } else {
            total += meta.len();
        }
    }
    total
}

/// Remove a folder tree, ignoring failures. Missing or unreadable folders
/// are not errors to the cleanup path that calls this.
pub fn remove_folder_best_effort(path: &Path) {
    if let Err(e) = std::fs::remove_dir_all(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::debug!("Could not remove {}: {}", path.display(), e);
        }
    }
}
