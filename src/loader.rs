//! Turning picked photos into [`Attachment`]s.
//!
//! Sources are read concurrently, at most `max_parallel` at a time, but the
//! results are always kept in input order: the attachment for source `i` is
//! named `photo<i>.<ext>` and appears at position `i` among the successes.
//! Sources that cannot be read or are not images are reported individually
//! instead of being dropped.

use crate::error::EncodingError;
use crate::multipart::Attachment;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use tracing::{debug, warn};

/// One picked photo.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Bytes already in memory (e.g. from a camera capture).
    Bytes(Vec<u8>),
    /// A file on disk.
    Path(PathBuf),
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Bytes(bytes)
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

/// Image formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Heic,
}

impl ImageKind {
    /// Identify a format from its leading magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageKind::Jpeg);
        }
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(ImageKind::Png);
        }
        if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
            let brand = &bytes[8..12];
            if [b"heic", b"heix", b"mif1", b"msf1"].iter().any(|b| brand == *b) {
                return Some(ImageKind::Heic);
            }
        }
        None
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Heic => "image/heic",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Heic => "heic",
        }
    }
}

/// Outcome of loading a batch of sources.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Successfully loaded attachments, in input order.
    pub attachments: Vec<Attachment>,
    /// One error per source that failed, in input order.
    pub failures: Vec<EncodingError>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// All attachments, or the first failure if any source failed.
    pub fn into_result(self) -> Result<Vec<Attachment>, EncodingError> {
        match self.failures.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.attachments),
        }
    }
}

async fn load_one(index: usize, source: ImageSource) -> Result<Attachment, EncodingError> {
    let bytes = match source {
        ImageSource::Bytes(bytes) => bytes,
        ImageSource::Path(path) => tokio::fs::read(&path).await.map_err(|e| EncodingError::Unreadable {
            index,
            message: format!("{}: {}", path.display(), e),
        })?,
    };
    let kind = ImageKind::sniff(&bytes).ok_or(EncodingError::UnsupportedImage { index })?;
    debug!(index, kind = ?kind, bytes = bytes.len(), "loaded image");
    Ok(Attachment::new(
        format!("photo{}.{}", index, kind.extension()),
        kind.mime_type(),
        bytes,
    ))
}

/// Load every source with at most `max_parallel` reads in flight.
///
/// Attachments are named `photo<index>.<ext>` after the sniffed format, so a
/// PNG becomes `photo0.png` and a HEIC photo `photo0.heic`; only JPEGs get the
/// `.jpg` name. Results keep input order.
pub async fn load_attachments(sources: Vec<ImageSource>, max_parallel: usize) -> LoadReport {
    let results: Vec<Result<Attachment, EncodingError>> = stream::iter(sources.into_iter().enumerate())
        .map(|(index, source)| load_one(index, source))
        .buffered(max_parallel.max(1))
        .collect()
        .await;

    let mut report = LoadReport::default();
    for result in results {
        match result {
            Ok(attachment) => report.attachments.push(attachment),
            Err(err) => {
                warn!(error = %err, "skipping unusable image");
                report.failures.push(err);
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00];

    #[test]
    fn test_sniff() {
        assert_eq!(ImageKind::sniff(JPEG), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::sniff(PNG), Some(ImageKind::Png));
        assert_eq!(
            ImageKind::sniff(b"\x00\x00\x00\x18ftypheic\x00\x00"),
            Some(ImageKind::Heic)
        );
        assert_eq!(ImageKind::sniff(b"GIF89a"), None);
        assert_eq!(ImageKind::sniff(&[]), None);
    }

    #[tokio::test]
    async fn test_order_and_names_follow_input() {
        let sources = vec![
            ImageSource::from(PNG.to_vec()),
            ImageSource::from(JPEG.to_vec()),
            ImageSource::from(JPEG.to_vec()),
        ];
        let report = load_attachments(sources, 2).await;
        assert!(report.is_complete());
        let names: Vec<&str> = report.attachments.iter().map(|a| a.filename()).collect();
        assert_eq!(names, vec!["photo0.png", "photo1.jpg", "photo2.jpg"]);
        assert_eq!(report.attachments[0].mime_type(), "image/png");
        assert_eq!(report.attachments[1].bytes(), JPEG);
    }

    #[tokio::test]
    async fn test_failures_are_collected_not_dropped() {
        let sources = vec![
            ImageSource::from(JPEG.to_vec()),
            ImageSource::from(b"not an image".to_vec()),
            ImageSource::from(PathBuf::from("/definitely/not/here.jpg")),
            ImageSource::from(JPEG.to_vec()),
        ];
        let report = load_attachments(sources, 4).await;

        assert_eq!(report.attachments.len(), 2);
        assert_eq!(report.attachments[1].filename(), "photo3.jpg");
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0], EncodingError::UnsupportedImage { index: 1 });
        assert!(matches!(report.failures[1], EncodingError::Unreadable { index: 2, .. }));

        let err = report.into_result().unwrap_err();
        assert_eq!(err, EncodingError::UnsupportedImage { index: 1 });
    }

    #[tokio::test]
    async fn test_reads_files_from_disk() {
        let dir = std::env::temp_dir().join(format!("recipe-jobs-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("dinner.jpg");
        tokio::fs::write(&path, JPEG).await.unwrap();

        let report = load_attachments(vec![ImageSource::Path(path)], 1).await;
        let attachments = report.into_result().unwrap();
        assert_eq!(attachments[0].filename(), "photo0.jpg");
        assert_eq!(attachments[0].bytes(), JPEG);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
