use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose, Engine as _};
use md5::{Digest, Md5};
use serde::Serialize;
use tracing::{info, warn};

use super::*;
use crate::content_type::content_type_for;
use crate::error::Error;

pub const BUCKET_OBJECT_TYPE: &str = "aws:s3/bucketObject:BucketObject";

/// s3 object keys are limited to 1024 bytes of utf-8.
const MAX_KEY_LEN: usize = 1024;

/// one file of the site, stored as one object in the bucket.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketObject {
    pub bucket: Output<String>,
    pub key: String,
    /// local path the content was read from.
    pub source: PathBuf,
    /// omitted when the extension isn't recognized. s3 then serves it as binary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// base64 md5 of the content, the way s3 expects it in `Content-MD5`
    pub content_md5: String,
    pub size: u64,
    #[serde(skip)]
    content: Vec<u8>,
}

impl BucketObject {
    pub fn new(bucket: &Output<String>, key: &str, source: &Path, content: Vec<u8>) -> Self {
        let content_md5 = general_purpose::STANDARD.encode(Md5::digest(&content));
        Self {
            bucket: bucket.clone(),
            key: key.to_string(),
            source: source.to_path_buf(),
            content_type: content_type_for(source).map(|m| m.to_string()),
            content_md5,
            size: content.len() as u64,
            content,
        }
    }

    /// reads `path` and keys the object by its file name.
    pub fn from_file(bucket: &Output<String>, path: &Path) -> crate::Result<Self> {
        let key = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::InvalidObjectKey { path: path.to_path_buf() })?;
        let content = std::fs::read(path).map_err(|source| Error::ReadContent {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(bucket, key, path, content))
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

impl Resource for BucketObject {
    fn type_token(&self) -> &'static str {
        BUCKET_OBJECT_TYPE
    }

    fn depends_on(&self) -> BTreeSet<String> {
        self.bucket.depends_on()
    }

    fn validate(&self) -> Result<(), String> {
        if self.key.is_empty() {
            return Err("Object key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LEN {
            return Err(format!("Object key {:?} is longer than {MAX_KEY_LEN} bytes", self.key));
        }
        Ok(())
    }
}

/// declares one object per regular file directly inside `dir`. Objects are
/// named and keyed by file name.
///
/// Subdirectories and other non-file entries are skipped. Any file that can't
/// be read fails the whole declaration, nothing is partially uploaded.
pub fn upload_directory(
    stack: &mut Stack<'_>,
    bucket: &Output<String>,
    dir: &Path,
) -> crate::Result<Vec<Registered>> {
    let dir_err = |source: std::io::Error| Error::ContentDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = vec![];
    for entry in std::fs::read_dir(dir).map_err(dir_err)? {
        let entry = entry.map_err(dir_err)?;
        paths.push(entry.path());
    }
    // read_dir order is platform dependent
    paths.sort();

    // read everything up front so a bad file leaves nothing declared
    let mut pending = vec![];
    for path in paths {
        // follows symlinks, a link to a file counts as a file
        let metadata = std::fs::metadata(&path).map_err(|source| Error::ReadContent {
            path: path.clone(),
            source,
        })?;
        if !metadata.is_file() {
            warn!(path = ?path, "skipping content entry that is not a regular file");
            continue;
        }
        pending.push(BucketObject::from_file(bucket, &path)?);
    }

    let mut objects = Vec::with_capacity(pending.len());
    for object in &pending {
        objects.push(stack.register(&object.key, object)?);
    }
    info!(dir = ?dir, objects = objects.len(), "declared site content");
    Ok(objects)
}
