use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::api::ImageBlob;
use super::tool::ToolMode;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("There is no result to download yet.")]
    NothingToSave,

    #[error("Could not save {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/svg+xml" => "svg",
        "image/avif" => "avif",
        _ => "png",
    }
}

/// `<stem>-<suffix>.<ext>`, e.g. `portrait-no-bg.png`.
pub fn suggested_name(tool: ToolMode, source_stem: &str, blob: &ImageBlob) -> String {
    let stem = sanitize(source_stem);
    let stem = if stem.is_empty() { "image" } else { stem.as_str() };
    format!(
        "{stem}-{}.{}",
        tool.download_suffix(),
        extension_for(&blob.mime)
    )
}

fn sanitize(stem: &str) -> String {
    stem.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_matches('.')
        .to_string()
}

/// Writes `blob` into `dir` as `name`, never replacing an existing file:
/// `name-1.ext`, `name-2.ext`, ... are tried in turn.
pub fn save_blob(blob: &ImageBlob, dir: &Path, name: &str) -> Result<PathBuf, DownloadError> {
    fs::create_dir_all(dir).map_err(|source| DownloadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let (stem, extension) = match name.rsplit_once('.') {
        Some((stem, extension)) => (stem, Some(extension)),
        None => (name, None),
    };

    let mut attempt = 0usize;
    loop {
        let file_name = match (attempt, extension) {
            (0, _) => name.to_string(),
            (n, Some(extension)) => format!("{stem}-{n}.{extension}"),
            (n, None) => format!("{stem}-{n}"),
        };
        let path = dir.join(file_name);

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => {
                write_or_remove(file, &path, &blob.bytes)?;
                tracing::info!(path = %path.display(), size = blob.size(), "saved result");
                return Ok(path);
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(source) => return Err(DownloadError::Io { path, source }),
        }
    }
}

/// A failed write would leave a truncated file under the chosen name.
fn write_or_remove(mut file: impl Write, path: &Path, bytes: &[u8]) -> Result<(), DownloadError> {
    let written = file.write_all(bytes).and_then(|_| file.flush());
    drop(file);
    written.map_err(|source| {
        if let Err(err) = fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %err, "could not remove partial file");
        }
        DownloadError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}
