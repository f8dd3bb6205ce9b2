use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{NarravidError, NarravidResult};

/// Plain-text document formats the pipeline reads directly. Rich formats (pdf,
/// docx) need an external extraction tool and are rejected up front.
const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "md"];

/// Read the narration source text from a document file.
///
/// This is the boundary of the excluded extraction collaborator: unrecognized
/// extensions surface `UnsupportedFormat` as-is, with no stage annotation.
pub fn extract_text(path: &Path) -> NarravidResult<String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if !TEXT_EXTENSIONS.contains(&ext.as_str()) {
        return Err(NarravidError::unsupported_format(format!(
            "unsupported document format '{}' for '{}' (expected one of: {})",
            if ext.is_empty() { "<none>" } else { &ext },
            path.display(),
            TEXT_EXTENSIONS.join(", ")
        )));
    }

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read document '{}'", path.display()))?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_plain_text_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("story.txt");
        std::fs::write(&path, "Hello world. Goodbye now.").unwrap();
        assert_eq!(extract_text(&path).unwrap(), "Hello world. Goodbye now.");
    }

    #[test]
    fn rejects_unknown_extensions() {
        let err = extract_text(Path::new("report.pdf")).unwrap_err();
        assert!(matches!(err, NarravidError::UnsupportedFormat(_)));
        let err = extract_text(Path::new("no_extension")).unwrap_err();
        assert!(matches!(err, NarravidError::UnsupportedFormat(_)));
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("STORY.TXT");
        std::fs::write(&path, "x").unwrap();
        assert!(extract_text(&path).is_ok());
    }
}
