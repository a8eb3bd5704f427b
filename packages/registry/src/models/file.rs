use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entity::{file, global_file};

/// Input for [`FileRegistry::create`](crate::service::file::FileRegistry::create).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFileParams {
    /// Explicit id; generated when absent.
    pub id: Option<String>,
    pub name: String,
    pub url: String,
    pub size: i64,
    pub file_type: String,
    pub file_hash: Option<String>,
    pub knowledge_base_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
    /// Upsert the global file entry for `file_hash` from this record's own fields.
    #[serde(default)]
    pub insert_global_file: bool,
}

/// Metadata patch. Ownership and hash linkage are not part of it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFileParams {
    pub name: Option<String>,
    pub size: Option<i64>,
    pub file_type: Option<String>,
    pub url: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Input for [`GlobalFiles::insert`](crate::service::global_file::GlobalFiles::insert).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGlobalFile {
    pub hash_id: String,
    pub file_type: String,
    pub size: i64,
    pub url: String,
    pub metadata: Option<serde_json::Value>,
    pub creator: Option<String>,
}

/// Result of a hash lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HashCheck {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl HashCheck {
    pub fn missing() -> Self {
        Self {
            exists: false,
            file_type: None,
            size: None,
            url: None,
            metadata: None,
        }
    }
}

impl From<global_file::Model> for HashCheck {
    fn from(model: global_file::Model) -> Self {
        Self {
            exists: true,
            file_type: Some(model.file_type),
            size: Some(model.size),
            url: Some(model.url),
            metadata: model.metadata,
        }
    }
}

/// What a delete removed. Callers use `removed_global_files` to drop the
/// physical blobs behind the now-unreferenced URLs.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedFiles {
    pub files: Vec<file::Model>,
    pub removed_global_files: Vec<global_file::Model>,
}

impl DeletedFiles {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Logical file groups, each a set of MIME type prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    #[default]
    All,
    Documents,
    Images,
    #[serde(alias = "audio")]
    Audios,
    #[serde(alias = "video")]
    Videos,
}

impl FileCategory {
    /// MIME prefixes matched by this category. Empty means no filtering.
    pub fn mime_prefixes(self) -> &'static [&'static str] {
        match self {
            FileCategory::All => &[],
            FileCategory::Documents => &["application/", "text/"],
            FileCategory::Images => &["image/"],
            FileCategory::Audios => &["audio/"],
            FileCategory::Videos => &["video/"],
        }
    }
}

impl FromStr for FileCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "documents" | "document" => Ok(Self::Documents),
            "images" | "image" => Ok(Self::Images),
            "audios" | "audio" => Ok(Self::Audios),
            "videos" | "video" => Ok(Self::Videos),
            other => Err(format!(
                "unknown category '{other}', expected one of: all, documents, images, audios, videos"
            )),
        }
    }
}

/// Fields a query may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    Size,
    FileType,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    /// Recognize a sorter name. Unknown names yield `None`, never an error.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "name" => Some(Self::Name),
            "size" => Some(Self::Size),
            "fileType" | "file_type" => Some(Self::FileType),
            "createdAt" | "created_at" => Some(Self::CreatedAt),
            "updatedAt" | "updated_at" => Some(Self::UpdatedAt),
            _ => None,
        }
    }

    pub fn column(self) -> file::Column {
        match self {
            Self::Name => file::Column::Name,
            Self::Size => file::Column::Size,
            Self::FileType => file::Column::FileType,
            Self::CreatedAt => file::Column::CreatedAt,
            Self::UpdatedAt => file::Column::UpdatedAt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum SortOrder {
    #[serde(alias = "ascend")]
    #[serde(rename = "asc")]
    Asc,
    #[default]
    #[serde(alias = "descend")]
    #[serde(rename = "desc")]
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascend" => Ok(Self::Asc),
            "desc" | "descend" => Ok(Self::Desc),
            other => Err(format!("unknown sort order '{other}', expected asc or desc")),
        }
    }
}

/// Filters for [`FileRegistry::query`](crate::service::file::FileRegistry::query).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileQuery {
    /// Case-insensitive substring of the file name.
    pub q: Option<String>,
    pub category: Option<FileCategory>,
    pub knowledge_base_id: Option<String>,
    /// `Some(false)` hides every file linked to any knowledge base.
    pub show_files_in_knowledge_base: Option<bool>,
    pub sorter: Option<String>,
    pub sort_type: Option<SortOrder>,
}
