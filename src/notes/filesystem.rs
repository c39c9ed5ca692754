//! Filesystem-backed note store
//!
//! Notes are Markdown files named `<slug>--<article_id>.md` inside a single
//! directory. The article ID suffix keeps filenames unique across title
//! collisions and lets deletion work from IDs alone, without consulting the
//! database.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::models::{Article, Feed};
use crate::notes::{MaterializeFailure, MaterializeOutcome, MaterializedNote, NoteStore};

/// Longest slug prefix kept in a note filename
const MAX_SLUG_LEN: usize = 80;

/// Note store writing Markdown files into a flat directory
pub struct FilesystemNoteStore {
    dir: PathBuf,
}

impl FilesystemNoteStore {
    /// Create a store rooted at the given directory without touching disk
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create a store and ensure its directory exists
    pub async fn new_with_init(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();

        match fs::metadata(&dir).await {
            Ok(meta) if !meta.is_dir() => {
                return Err(StoreError::NotADirectory(dir.display().to_string()));
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fs::create_dir_all(&dir).await?;
                debug!(dir = %dir.display(), "Created note directory");
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Self { dir })
    }

    /// Filename for an article's note, `<slug>--<id>.md`
    fn note_filename(article: &Article) -> String {
        format!("{}--{}.md", slugify(&article.title), article.id)
    }

    /// Render the Markdown body for one article
    fn render_note(article: &Article, feed: Option<&Feed>) -> String {
        let mut note = String::new();

        note.push_str("---\n");
        note.push_str(&format!("title: \"{}\"\n", article.title.replace('"', "\\\"")));
        if let Some(feed) = feed {
            note.push_str(&format!("feed: \"{}\"\n", feed.name.replace('"', "\\\"")));
        }
        note.push_str(&format!("url: {}\n", article.url));
        note.push_str(&format!("published: {}\n", article.published_at.to_rfc3339()));
        note.push_str("---\n\n");

        note.push_str(&format!("# {}\n\n", article.title));

        if let Some(summary) = &article.summary {
            if !summary.is_empty() {
                note.push_str(summary);
                note.push_str("\n\n");
            }
        }

        note.push_str(&format!("[Read original]({})\n", article.url));
        note
    }
}

#[async_trait]
impl NoteStore for FilesystemNoteStore {
    async fn materialize_batch(
        &self,
        articles: &[Article],
        feeds: &HashMap<i64, Feed>,
    ) -> Result<MaterializeOutcome, StoreError> {
        // The directory may have been removed since init; failing to restore
        // it makes the whole batch unwritable.
        fs::create_dir_all(&self.dir).await?;

        let mut outcome = MaterializeOutcome::default();

        for article in articles {
            let filename = Self::note_filename(article);
            let path = self.dir.join(&filename);
            let path_str = path.display().to_string();

            match fs::metadata(&path).await {
                Ok(_) => {
                    debug!(
                        article_id = article.id,
                        path = %path_str,
                        "Note already exists, skipping"
                    );
                    outcome.skipped.push(MaterializedNote {
                        article_id: article.id,
                        path: path_str,
                    });
                    continue;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(article_id = article.id, error = %e, "Could not probe note path");
                    outcome.failed.push(MaterializeFailure {
                        article_id: article.id,
                        error: e.to_string(),
                    });
                    continue;
                }
            }

            let content = Self::render_note(article, feeds.get(&article.feed_id));

            match fs::write(&path, content).await {
                Ok(()) => {
                    debug!(article_id = article.id, path = %path_str, "Wrote note");
                    outcome.created.push(MaterializedNote {
                        article_id: article.id,
                        path: path_str,
                    });
                }
                Err(e) => {
                    warn!(article_id = article.id, error = %e, "Failed to write note");
                    outcome.failed.push(MaterializeFailure {
                        article_id: article.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(outcome)
    }

    async fn delete_by_article_ids(&self, article_ids: &[i64]) -> Result<u64, StoreError> {
        if article_ids.is_empty() {
            return Ok(0);
        }

        // Matching on the `--<id>.md` suffix is unambiguous because slugs
        // never contain consecutive dashes.
        let suffixes: Vec<String> = article_ids
            .iter()
            .map(|id| format!("--{}.md", id))
            .collect();

        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut deleted = 0u64;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let matches = path
                .file_name()
                .and_then(|name| name.to_str())
                .map(|name| suffixes.iter().any(|suffix| name.ends_with(suffix.as_str())))
                .unwrap_or(false);

            if matches {
                match fs::remove_file(&path).await {
                    Ok(()) => deleted += 1,
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failed to delete note")
                    }
                }
            }
        }

        debug!(deleted = deleted, "Deleted notes for expired articles");
        Ok(deleted)
    }
}

/// Reduce a title to a lowercase ASCII slug
fn slugify(title: &str) -> String {
    let mut slug = String::new();
    let mut last_was_dash = true;

    for c in title.chars() {
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }

    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "article".to_string()
    } else {
        slug.to_string()
    }
}
