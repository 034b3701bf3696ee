//! File writing handler
//!
//! All outcomes, including refusals, come back as readable text so the
//! calling model can report them.

use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use mcp_common::{text_success, CallToolResult, McpError};
use tokio::fs;

use crate::params::WriteFileParams;

pub async fn write_file(params: WriteFileParams) -> Result<CallToolResult, McpError> {
    let base = std::env::var("WRITE_BASE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("output"));
    Ok(text_success(write_file_at(&base, params).await))
}

/// Resolve `candidate` against `base`, collapsing `.`/`..` lexically.
/// Returns `None` when the result would land outside `base`.
fn resolve_in_base(base: &Path, candidate: &Path) -> Option<PathBuf> {
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::ParentDir => {
                if !normalized.pop() {
                    return None;
                }
            }
            Component::CurDir => {}
            other => normalized.push(other),
        }
    }

    normalized.starts_with(base).then_some(normalized)
}

pub(crate) async fn write_file_at(base: &Path, params: WriteFileParams) -> String {
    if let Err(e) = fs::create_dir_all(base).await {
        return format!(
            "Could not create base directory {}: {}",
            base.display(),
            e
        );
    }
    let base = match base.canonicalize() {
        Ok(base) => base,
        Err(e) => return format!("Could not resolve base directory: {}", e),
    };

    let target = match params.path.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                base.join(path)
            }
        }
        None => base.clone(),
    };

    // a trailing separator or an existing directory means "write into it"
    let treat_as_dir = params.path.is_none()
        || params
            .path
            .as_deref()
            .map(|p| p.ends_with('/'))
            .unwrap_or(false)
        || target.is_dir();

    let full_path = if treat_as_dir {
        let name = params
            .filename
            .clone()
            .unwrap_or_else(|| format!("write_{}.txt", Utc::now().format("%Y%m%d_%H%M%S")));
        target.join(name)
    } else {
        target
    };

    let Some(resolved) = resolve_in_base(&base, &full_path) else {
        return format!(
            "Refusing to write outside the base directory {}",
            base.display()
        );
    };

    if resolved.exists() && !params.overwrite {
        return format!(
            "File {} already exists; pass overwrite=true to replace it",
            resolved.display()
        );
    }

    if let Some(parent) = resolved.parent() {
        if let Err(e) = fs::create_dir_all(parent).await {
            return format!("Could not create directory {}: {}", parent.display(), e);
        }
    }

    match fs::write(&resolved, params.content.as_bytes()).await {
        Ok(()) => {
            tracing::debug!(path = %resolved.display(), "file written");
            format!(
                "File written successfully\n\
                 Path: {}\n\
                 Name: {}\n\
                 Size: {} bytes\n\
                 Written at: {}",
                resolved.display(),
                resolved
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
                params.content.len(),
                Utc::now().to_rfc3339(),
            )
        }
        Err(e) => format!("Write failed for {}: {}", resolved.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(content: &str) -> WriteFileParams {
        WriteFileParams {
            content: content.to_string(),
            path: None,
            filename: None,
            overwrite: false,
        }
    }

    #[tokio::test]
    async fn writes_with_generated_name() {
        let dir = tempfile::tempdir().unwrap();
        let result = write_file_at(dir.path(), params("hello")).await;

        assert!(result.contains("File written successfully"));
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn writes_to_named_file_in_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = params("nested content");
        p.path = Some("notes/today.txt".to_string());

        let result = write_file_at(dir.path(), p).await;
        assert!(result.contains("today.txt"));

        let written = std::fs::read_to_string(
            dir.path().canonicalize().unwrap().join("notes/today.txt"),
        )
        .unwrap();
        assert_eq!(written, "nested content");
    }

    #[tokio::test]
    async fn rejects_path_escape() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = params("evil");
        p.path = Some("../evil.txt".to_string());

        let result = write_file_at(dir.path(), p).await;
        assert!(result.contains("Refusing to write outside"));
        assert!(!dir.path().parent().unwrap().join("evil.txt").exists());
    }

    #[tokio::test]
    async fn refuses_overwrite_without_flag() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = params("one");
        first.path = Some("file.txt".to_string());
        write_file_at(dir.path(), first).await;

        let mut second = params("two");
        second.path = Some("file.txt".to_string());
        let result = write_file_at(dir.path(), second).await;
        assert!(result.contains("already exists"));

        let mut third = params("three");
        third.path = Some("file.txt".to_string());
        third.overwrite = true;
        let result = write_file_at(dir.path(), third).await;
        assert!(result.contains("File written successfully"));

        let content =
            std::fs::read_to_string(dir.path().canonicalize().unwrap().join("file.txt")).unwrap();
        assert_eq!(content, "three");
    }

    #[tokio::test]
    async fn trailing_separator_means_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = params("dir content");
        p.path = Some("reports/".to_string());
        p.filename = Some("summary.txt".to_string());

        let result = write_file_at(dir.path(), p).await;
        assert!(result.contains("summary.txt"));
        assert!(dir
            .path()
            .canonicalize()
            .unwrap()
            .join("reports/summary.txt")
            .exists());
    }
}
