//! Hand-off of the finished video to the caller.

use crate::error::{RedubError, Result};
use crate::media::MediaAsset;
use crate::remux::Container;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// The run's single output artifact, outside scratch storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deliverable {
    pub path: PathBuf,
    pub file_name: String,
    pub mime_type: String,
}

/// Copy `output` to `destination`.
///
/// A directory destination receives `<file_stem>.<container ext>`; any other
/// path is used as the file name. The copy lands under a temporary name and is
/// renamed into place, so the destination never holds a partial video.
#[instrument(skip(output), fields(output = %output.path.display()))]
pub async fn deliver(
    output: &MediaAsset,
    container: Container,
    destination: &Path,
    file_stem: &str,
) -> Result<Deliverable> {
    let default_name = format!("{}.{}", file_stem, container.extension());
    let target = if destination.is_dir() {
        destination.join(&default_name)
    } else {
        destination.to_path_buf()
    };

    let file_name = target
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_string())
        .ok_or_else(|| {
            RedubError::Delivery(format!("{} is not a file path", target.display()))
        })?;

    if crate::media::extension_of(&target).as_deref() != Some(container.extension()) {
        warn!(
            "Writing a .{} video to {}",
            container.extension(),
            target.display()
        );
    }

    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let partial = target.with_file_name(format!(".{}.partial", file_name));
    if let Err(e) = copy_into_place(&output.path, &partial, &target).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(RedubError::Delivery(e.to_string()));
    }

    info!("Delivered {}", target.display());

    Ok(Deliverable {
        path: target,
        file_name,
        mime_type: container.mime_type().to_string(),
    })
}

async fn copy_into_place(source: &Path, partial: &Path, target: &Path) -> std::io::Result<()> {
    tokio::fs::copy(source, partial).await?;
    tokio::fs::rename(partial, target).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaKind;

    fn output_in(dir: &Path) -> MediaAsset {
        let path = dir.join("output.mp4");
        std::fs::write(&path, b"remuxed").unwrap();
        MediaAsset::new(path, MediaKind::Video, 10.0)
    }

    #[tokio::test]
    async fn test_directory_destination_gets_default_name() {
        let scratch = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();

        let output = output_in(scratch.path());
        let delivered = deliver(&output, Container::Mp4, dest.path(), "processed_video")
            .await
            .unwrap();

        assert_eq!(delivered.file_name, "processed_video.mp4");
        assert_eq!(delivered.mime_type, "video/mp4");
        assert_eq!(std::fs::read(&delivered.path).unwrap(), b"remuxed");
        assert_eq!(std::fs::read_dir(dest.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_file_destination_is_used_verbatim() {
        let scratch = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let target = dest.path().join("nested").join("clip.mov");

        let output = output_in(scratch.path());
        let delivered = deliver(&output, Container::Mov, &target, "processed_video")
            .await
            .unwrap();

        assert_eq!(delivered.path, target);
        assert_eq!(delivered.file_name, "clip.mov");
        assert_eq!(delivered.mime_type, "video/quicktime");
    }

    #[tokio::test]
    async fn test_missing_source_leaves_nothing_behind() {
        let dest = tempfile::tempdir().unwrap();
        let ghost = MediaAsset::new(dest.path().join("gone.mp4"), MediaKind::Video, 1.0);
        let target = dest.path().join("out.mp4");

        let err = deliver(&ghost, Container::Mp4, &target, "processed_video")
            .await
            .unwrap_err();

        assert!(matches!(err, RedubError::Delivery(_)));
        assert_eq!(std::fs::read_dir(dest.path()).unwrap().count(), 0);
    }
}
