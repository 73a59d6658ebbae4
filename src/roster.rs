//! Employee roster: the `code;company;name;assignment` file that maps badge
//! codes to people, plus the badge photos kept next to the uploads.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::encoding::{decode_text, encode_cp1251};
use crate::error::AppError;

/// Extensions a badge photo may be stored with, in lookup order.
pub const PHOTO_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

/// Public URL prefix of badge photos.
pub const PHOTO_URL_PREFIX: &str = "/uploads/employee_photos";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct RosterRow {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub assignment: String,
    #[serde(default, skip_deserializing)]
    pub photo_url: Option<String>,
}

impl RosterRow {
    fn trimmed(self) -> Self {
        RosterRow {
            code: self.code.trim().to_string(),
            company: self.company.trim().to_string(),
            name: self.name.trim().to_string(),
            assignment: self.assignment.trim().to_string(),
            photo_url: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RosterBody {
    pub rows: Vec<RosterRow>,
}

/// Parses roster text. Blank lines are ignored and missing trailing fields
/// are empty.
pub fn parse(text: &str) -> Vec<RosterRow> {
    text.lines()
        .map(|line| line.trim_start_matches('\u{feff}'))
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let mut parts = line.split(';').map(|p| p.trim().to_string());
            RosterRow {
                code: parts.next().unwrap_or_default(),
                company: parts.next().unwrap_or_default(),
                name: parts.next().unwrap_or_default(),
                assignment: parts.next().unwrap_or_default(),
                photo_url: None,
            }
        })
        .collect()
}

/// Serializes rows as Windows-1251 with CRLF separators.
pub fn serialize(rows: &[RosterRow]) -> Vec<u8> {
    let text = rows
        .iter()
        .map(|r| {
            [
                r.code.as_str(),
                r.company.as_str(),
                r.name.as_str(),
                r.assignment.as_str(),
            ]
            .join(";")
        })
        .collect::<Vec<_>>()
        .join("\r\n");
    encode_cp1251(&text)
}

/// File stem for a badge code: anything outside `[A-Za-z0-9_-]` becomes `_`,
/// at most 80 characters.
pub fn safe_code(code: &str) -> String {
    code.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(80)
        .collect()
}

/// Extension for an uploaded photo's content type.
pub fn photo_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Roster file and photo directory on disk.
#[derive(Debug, Clone)]
pub struct RosterStore {
    csv_path: PathBuf,
    photos_dir: PathBuf,
}

impl RosterStore {
    pub fn new(csv_path: impl Into<PathBuf>, uploads_dir: impl AsRef<Path>) -> Self {
        RosterStore {
            csv_path: csv_path.into(),
            photos_dir: uploads_dir.as_ref().join("employee_photos"),
        }
    }

    /// Reads the roster. A missing file is an empty roster.
    pub async fn load(&self) -> Result<Vec<RosterRow>, AppError> {
        match fs::read(&self.csv_path).await {
            Ok(bytes) => Ok(parse(&decode_text(&bytes))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Reads the roster with each row's photo URL filled in.
    pub async fn load_with_photos(&self) -> Result<Vec<RosterRow>, AppError> {
        let photos = self.photo_files().await?;
        let mut rows = self.load().await?;
        for row in rows.iter_mut() {
            let stem = safe_code(&row.code);
            if stem.is_empty() {
                continue;
            }
            row.photo_url = PHOTO_EXTENSIONS
                .iter()
                .map(|ext| format!("{}.{}", stem, ext))
                .find(|file| photos.contains(file))
                .map(|file| format!("{}/{}", PHOTO_URL_PREFIX, file));
        }
        Ok(rows)
    }

    /// Case-insensitive lookup by badge code.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<RosterRow>, AppError> {
        let needle = code.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }
        Ok(self
            .load()
            .await?
            .into_iter()
            .find(|row| !row.code.is_empty() && row.code.to_lowercase() == needle))
    }

    /// Replaces the roster with `rows`, trimmed.
    pub async fn save(&self, rows: Vec<RosterRow>) -> Result<usize, AppError> {
        let rows: Vec<RosterRow> = rows.into_iter().map(RosterRow::trimmed).collect();
        self.write(&serialize(&rows)).await?;
        Ok(rows.len())
    }

    /// Stores an uploaded roster file, re-encoded for the reporting tool.
    pub async fn import(&self, bytes: &[u8]) -> Result<usize, AppError> {
        let rows = parse(&decode_text(bytes));
        self.write(&serialize(&rows)).await?;
        Ok(rows.len())
    }

    /// Stores a badge photo and removes the code's photos with other
    /// extensions. Returns the public URL.
    pub async fn save_photo(
        &self,
        code: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<String, AppError> {
        let stem = safe_code(code);
        if stem.is_empty() {
            return Err(AppError::BadRequest("Employee code required".into()));
        }
        fs::create_dir_all(&self.photos_dir).await?;

        for ext in PHOTO_EXTENSIONS.iter().filter(|e| **e != extension) {
            let stale = self.photos_dir.join(format!("{}.{}", stem, ext));
            if fs::try_exists(&stale).await.unwrap_or(false) {
                fs::remove_file(&stale).await?;
            }
        }

        let file = format!("{}.{}", stem, extension);
        fs::write(self.photos_dir.join(&file), bytes).await?;
        Ok(format!("{}/{}", PHOTO_URL_PREFIX, file))
    }

    async fn write(&self, bytes: &[u8]) -> Result<(), AppError> {
        if let Some(parent) = self.csv_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::write(&self.csv_path, bytes).await?;
        Ok(())
    }

    async fn photo_files(&self) -> Result<HashSet<String>, AppError> {
        let mut files = HashSet::new();
        let mut entries = match fs::read_dir(&self.photos_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                files.insert(name.to_string());
            }
        }
        Ok(files)
    }
}
