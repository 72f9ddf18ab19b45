//! Best-effort removal of a job's output files, confined to the download dir.
//!
//! A job's filename comes from tool output, so it is treated as untrusted:
//! every path is normalized and checked to lie strictly inside the root
//! before anything is deleted. Sibling matching is a literal name-prefix
//! comparison, so glob metacharacters in a filename match nothing extra.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Sidecar suffixes the tool leaves next to a partial download.
const SIDECAR_SUFFIXES: &[&str] = &[".part", ".ytdl"];

/// Deletes `filename`, its sidecars and every file in the same directory whose
/// name starts with the filename's stem. Relative filenames are resolved
/// against `root`. Returns the paths actually removed; errors are logged and
/// swallowed.
pub async fn remove_artifacts(root: &Path, filename: &str) -> Vec<PathBuf> {
    let mut removed = Vec::new();
    if filename.trim().is_empty() {
        return removed;
    }
    let Some(root) = resolve_root(root).await else {
        tracing::warn!(root = %root.display(), "cannot resolve download dir; skipping artifact removal");
        return removed;
    };
    let candidate = Path::new(filename);
    let candidate = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };
    let Some(file) = resolve_inside(&root, &candidate).await else {
        tracing::warn!(filename, "artifact path escapes download dir; not removing");
        return removed;
    };
    let (Some(dir), Some(name)) = (file.parent(), file.file_name().and_then(|n| n.to_str()))
    else {
        return removed;
    };

    let mut targets = vec![file.clone()];
    targets.extend(SIDECAR_SUFFIXES.iter().map(|s| dir.join(format!("{name}{s}"))));
    for path in targets {
        if remove_file(&path).await {
            removed.push(path);
        }
    }

    let stem = file_stem(name);
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), "cannot list artifact dir: {}", e);
            return removed;
        }
    };
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(dir = %dir.display(), "artifact dir listing stopped: {}", e);
                break;
            }
        };
        let entry_name = entry.file_name();
        let Some(entry_name) = entry_name.to_str() else {
            continue;
        };
        if !entry_name.starts_with(stem) {
            continue;
        }
        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file() || t.is_symlink())
            .unwrap_or(false);
        let path = entry.path();
        if !is_file || !is_strictly_inside(&root, &path) {
            continue;
        }
        if remove_file(&path).await {
            removed.push(path);
        }
    }
    removed
}

async fn remove_file(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "deleted artifact");
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!(path = %path.display(), "could not delete artifact: {}", e);
            false
        }
    }
}

/// Name without its last extension; a leading dot is not an extension.
fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    }
}

/// Absolute, symlink-free form of the root (lexical form if it does not exist).
async fn resolve_root(root: &Path) -> Option<PathBuf> {
    let absolute = normalize(&std::path::absolute(root).ok()?);
    Some(tokio::fs::canonicalize(&absolute).await.unwrap_or(absolute))
}

/// Normalizes `candidate` and resolves its parent's symlinks, then checks
/// containment. The file itself may not exist.
async fn resolve_inside(root: &Path, candidate: &Path) -> Option<PathBuf> {
    let lexical = normalize(candidate);
    if !is_strictly_inside(root, &lexical) {
        return None;
    }
    let name = lexical.file_name()?.to_owned();
    let parent = lexical.parent()?;
    let parent = tokio::fs::canonicalize(parent)
        .await
        .unwrap_or_else(|_| parent.to_path_buf());
    let resolved = parent.join(name);
    is_strictly_inside(root, &resolved).then_some(resolved)
}

fn is_strictly_inside(root: &Path, path: &Path) -> bool {
    path != root && path.starts_with(root)
}

/// Resolves `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::write(path, b"x").unwrap();
    }

    #[tokio::test]
    async fn removes_file_sidecars_and_siblings() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path();
        for name in [
            "Clip [id].mkv",
            "Clip [id].mkv.part",
            "Clip [id].mkv.ytdl",
            "Clip [id].f137.mp4",
            "Clip [id].en.vtt",
            "Other.mkv",
        ] {
            touch(&dir.join(name));
        }
        let removed = remove_artifacts(dir, "Clip [id].mkv").await;
        assert_eq!(removed.len(), 5);
        let left: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(left, vec!["Other.mkv".to_string()]);
    }

    #[tokio::test]
    async fn absolute_filename_inside_root_is_removed() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("a.mp4");
        touch(&file);
        let removed = remove_artifacts(root.path(), file.to_str().unwrap()).await;
        assert_eq!(removed.len(), 1);
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn traversal_outside_root_is_rejected() {
        let outer = tempfile::tempdir().unwrap();
        let root = outer.path().join("downloads");
        fs::create_dir(&root).unwrap();
        let victim = outer.path().join("secret.txt");
        touch(&victim);

        assert!(remove_artifacts(&root, "../secret.txt").await.is_empty());
        assert!(remove_artifacts(&root, victim.to_str().unwrap()).await.is_empty());
        assert!(remove_artifacts(&root, "sub/../../secret.txt").await.is_empty());
        assert!(victim.exists());
    }

    #[tokio::test]
    async fn glob_metacharacters_match_literally() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path();
        touch(&dir.join("keep-me.mp4"));
        touch(&dir.join("*.mp4"));
        let removed = remove_artifacts(dir, "*.mp4").await;
        assert_eq!(removed, vec![dir.canonicalize().unwrap().join("*.mp4")]);
        assert!(dir.join("keep-me.mp4").exists());
    }

    #[tokio::test]
    async fn root_itself_and_empty_names_are_ignored() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("x.mp4"));
        assert!(remove_artifacts(root.path(), "").await.is_empty());
        assert!(remove_artifacts(root.path(), ".").await.is_empty());
        assert!(root.path().join("x.mp4").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinked_subdir_pointing_outside_is_rejected() {
        let outer = tempfile::tempdir().unwrap();
        let root = outer.path().join("downloads");
        let elsewhere = outer.path().join("elsewhere");
        fs::create_dir(&root).unwrap();
        fs::create_dir(&elsewhere).unwrap();
        touch(&elsewhere.join("data.bin"));
        std::os::unix::fs::symlink(&elsewhere, root.join("link")).unwrap();

        assert!(remove_artifacts(&root, "link/data.bin").await.is_empty());
        assert!(elsewhere.join("data.bin").exists());
    }

    #[test]
    fn normalize_resolves_parent_components() {
        assert_eq!(normalize(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
        assert_eq!(normalize(Path::new("/../x")), PathBuf::from("/x"));
    }
}
