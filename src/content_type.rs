use std::path::Path;

use mime::Mime;

/// looks up the content type of a file by its extension.
/// Returns `None` for files without an extension, or with one we don't know.
pub fn content_type_for(path: &Path) -> Option<Mime> {
    mime_guess::from_path(path).first()
}
