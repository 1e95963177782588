use std::{
    fs,
    path::{Path, PathBuf},
};

use log::info;
use thiserror::Error;

pub const EXPORT_SUFFIX: &str = "_poem";
pub const EXPORT_EXTENSION: &str = "txt";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No poem has been generated yet.")]
    NothingToSave,

    #[error("The original file name is missing.")]
    MissingFileName,

    #[error("Couldn't write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// `My Photo.JPG` -> `My_Photo_poem.txt`
///
/// Only the part before the first `.` is kept, every char outside
/// `[A-Za-z0-9_.-]` becomes `_`.
pub fn export_file_name(original_name: &str) -> String {
    let base = original_name.split('.').next().unwrap_or_default();
    let safe: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{safe}{EXPORT_SUFFIX}.{EXPORT_EXTENSION}")
}

pub fn to_crlf(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "\r\n")
}

pub fn write_poem(dir: &Path, original_name: &str, poem: &str) -> Result<PathBuf, ExportError> {
    let path = dir.join(export_file_name(original_name));
    fs::write(&path, to_crlf(poem).as_bytes()).map_err(|source| ExportError::Write {
        path: path.clone(),
        source,
    })?;
    info!("Exported poem to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_uses_sanitized_base_name() {
        assert_eq!(export_file_name("My Photo.JPG"), "My_Photo_poem.txt");
        assert_eq!(export_file_name("a/b*c?.png"), "a_b_c__poem.txt");
        assert_eq!(export_file_name("archive.tar.gz"), "archive_poem.txt");
        assert_eq!(export_file_name("no_extension-1"), "no_extension-1_poem.txt");
        assert_eq!(export_file_name(".hidden"), "_poem.txt");
        assert_eq!(export_file_name("café:ü.webp"), "caf____poem.txt");
    }

    #[test]
    fn sanitized_names_stay_inside_the_target_dir() {
        for name in ["../../etc/passwd", "C:\\x\\y.png", "a|b<c>d\"e.gif", "\0nul.png"] {
            let file = export_file_name(name);
            assert!(
                file.chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')),
                "{file}"
            );
            assert_eq!(Path::new(&file).components().count(), 1);
        }
    }

    #[test]
    fn line_endings_become_crlf_once() {
        assert_eq!(to_crlf("line one\nline two"), "line one\r\nline two");
        assert_eq!(to_crlf("a\r\nb\nc\n"), "a\r\nb\r\nc\r\n");
        assert_eq!(to_crlf("single"), "single");
    }

    #[test]
    fn writes_crlf_bytes_under_derived_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_poem(dir.path(), "My Photo.JPG", "line one\nline two").unwrap();

        assert_eq!(path, dir.path().join("My_Photo_poem.txt"));
        assert_eq!(fs::read(&path).unwrap(), b"line one\r\nline two");
    }

    #[test]
    fn missing_dir_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_poem(&dir.path().join("nope"), "x.png", "poem").unwrap_err();
        assert!(matches!(err, ExportError::Write { .. }));
    }
}
