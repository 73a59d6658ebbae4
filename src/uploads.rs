//! Task photo uploads and the public `/uploads` file route.

use std::path::{Component, Path, PathBuf};

pub const MAX_TASK_PHOTO_BYTES: usize = 10 * 1024 * 1024;

/// Extension for an accepted task photo content type.
pub fn task_photo_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Whether an uploaded file name carries an image extension a task photo may
/// have. Both this and the content type must agree before a file is kept.
pub fn has_task_photo_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .map_or(false, |e| matches!(e.as_str(), "jpg" | "jpeg" | "png" | "gif"))
}

/// `task-<millis>-<uuid>.<ext>`
pub fn task_photo_name(extension: &str) -> String {
    format!(
        "task-{}-{}.{}",
        chrono::Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4(),
        extension
    )
}

/// Resolves a request path inside `root`. Absolute paths and any `..`
/// component are refused.
pub fn resolve(root: &Path, requested: &str) -> Option<PathBuf> {
    let relative = Path::new(requested);
    if requested.is_empty() || requested.contains('\0') {
        return None;
    }
    let mut resolved = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(resolved)
}

/// Content type by file extension for served uploads.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_refuses_traversal() {
        let root = Path::new("/srv/uploads");
        assert_eq!(
            resolve(root, "employee_photos/E1.jpg"),
            Some(PathBuf::from("/srv/uploads/employee_photos/E1.jpg"))
        );
        assert_eq!(resolve(root, "../etc/passwd"), None);
        assert_eq!(resolve(root, "a/../../b"), None);
        assert_eq!(resolve(root, "/etc/passwd"), None);
        assert_eq!(resolve(root, ""), None);
    }

    #[test]
    fn test_task_photo_name() {
        let name = task_photo_name("png");
        assert!(name.starts_with("task-"));
        assert!(name.ends_with(".png"));
        // task, millis, and the five uuid groups
        assert_eq!(name.trim_end_matches(".png").split('-').count(), 7);
    }

    #[test]
    fn test_task_photo_file_names() {
        assert!(has_task_photo_extension("proof.JPG"));
        assert!(has_task_photo_extension("IMG_0001.jpeg"));
        assert!(has_task_photo_extension("ворота.png"));
        assert!(!has_task_photo_extension("proof.webp"));
        assert!(!has_task_photo_extension("proof.png.exe"));
        assert!(!has_task_photo_extension("blob"));
    }

    #[test]
    fn test_content_types() {
        assert_eq!(task_photo_extension("image/gif"), Some("gif"));
        assert_eq!(task_photo_extension("image/webp"), None);
        assert_eq!(content_type_for(Path::new("a/B.JPG")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("a/b.txt")), "application/octet-stream");
    }
}
