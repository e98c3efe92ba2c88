//! Image selection from a media library.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use roomshare_common::{RoomshareError, RoomshareResult};

use crate::asset::ImageAsset;

/// Device media library boundary.
///
/// The real device API asks the user for read access and opens a picker;
/// implementations decide what that means in their environment.
#[async_trait]
pub trait MediaLibrary: Send + Sync {
    /// Request read access to the library.
    async fn request_permission(&self) -> RoomshareResult<bool>;

    /// Let the user pick images; returns local handles in pick order.
    async fn pick_images(&self) -> RoomshareResult<Vec<PathBuf>>;
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Media library backed by a directory of image files.
///
/// Stands in for the device photo roll: "picking" selects every image file
/// under the root, in sorted path order.
pub struct FsMediaLibrary {
    root: PathBuf,
}

impl FsMediaLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn is_image(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }
}

#[async_trait]
impl MediaLibrary for FsMediaLibrary {
    async fn request_permission(&self) -> RoomshareResult<bool> {
        match tokio::fs::read_dir(&self.root).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => Ok(false),
            Err(e) => Err(RoomshareError::PermissionDenied(format!(
                "Cannot access {}: {}",
                self.root.display(),
                e
            ))),
        }
    }

    async fn pick_images(&self) -> RoomshareResult<Vec<PathBuf>> {
        // walkdir is synchronous; a photo directory listing is small enough
        // to run inline
        let mut picked: Vec<PathBuf> = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && Self::is_image(entry.path()))
            .map(|entry| entry.into_path())
            .collect();
        picked.sort();

        debug!(count = picked.len(), root = %self.root.display(), "Picked images");
        Ok(picked)
    }
}

/// Ordered in-memory image selection for one submission screen.
pub struct ImageSelector {
    selection: Vec<ImageAsset>,
    max_selection: usize,
}

impl ImageSelector {
    pub fn new(max_selection: usize) -> Self {
        Self {
            selection: Vec::new(),
            max_selection,
        }
    }

    /// Let the user pick images and append them to the selection.
    ///
    /// Fails with `PermissionDenied` when library access is refused and with
    /// `SelectionLimitExceeded` when the picked set would push the selection
    /// past the limit. The existing selection is untouched in both cases and
    /// the prospective images are discarded, never partially added.
    ///
    /// Returns the number of newly accepted images.
    pub async fn select(&mut self, library: &dyn MediaLibrary) -> RoomshareResult<usize> {
        if !library.request_permission().await? {
            return Err(RoomshareError::PermissionDenied(
                "Media library access was refused".to_string(),
            ));
        }

        let picked = library.pick_images().await?;
        if self.selection.len() + picked.len() > self.max_selection {
            return Err(RoomshareError::SelectionLimitExceeded {
                selected: self.selection.len(),
                attempted: picked.len(),
                max: self.max_selection,
            });
        }

        let accepted = picked.len();
        self.selection
            .extend(picked.into_iter().map(ImageAsset::selected));

        debug!(accepted, total = self.selection.len(), "Selection updated");
        Ok(accepted)
    }

    /// The current selection, in pick order.
    pub fn assets(&self) -> &[ImageAsset] {
        &self.selection
    }

    pub fn len(&self) -> usize {
        self.selection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selection.is_empty()
    }

    /// Copy the selection for a submission attempt, leaving it in place so a
    /// failed attempt can be retried as-is.
    pub fn snapshot(&self) -> Vec<ImageAsset> {
        self.selection.clone()
    }

    /// Drop the selection once a submission has persisted its record.
    pub fn clear(&mut self) {
        self.selection.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetState;
    use tempfile::TempDir;

    struct StubLibrary {
        granted: bool,
        picks: Vec<PathBuf>,
    }

    impl StubLibrary {
        fn picking<I: IntoIterator<Item = &'static str>>(picks: I) -> Self {
            Self {
                granted: true,
                picks: picks.into_iter().map(PathBuf::from).collect(),
            }
        }

        fn denied() -> Self {
            Self {
                granted: false,
                picks: vec![PathBuf::from("ignored.jpg")],
            }
        }
    }

    #[async_trait]
    impl MediaLibrary for StubLibrary {
        async fn request_permission(&self) -> RoomshareResult<bool> {
            Ok(self.granted)
        }

        async fn pick_images(&self) -> RoomshareResult<Vec<PathBuf>> {
            Ok(self.picks.clone())
        }
    }

    #[tokio::test]
    async fn test_select_appends_in_pick_order() {
        let mut selector = ImageSelector::new(5);

        let accepted = selector
            .select(&StubLibrary::picking(["a.jpg", "b.jpg", "c.jpg"]))
            .await
            .unwrap();
        assert_eq!(accepted, 3);

        let accepted = selector
            .select(&StubLibrary::picking(["d.jpg"]))
            .await
            .unwrap();
        assert_eq!(accepted, 1);

        let paths: Vec<_> = selector.assets().iter().map(|a| a.local.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("a.jpg"),
                PathBuf::from("b.jpg"),
                PathBuf::from("c.jpg"),
                PathBuf::from("d.jpg"),
            ]
        );
        assert!(selector
            .assets()
            .iter()
            .all(|a| a.state == AssetState::Selected));
    }

    #[tokio::test]
    async fn test_select_denied_leaves_selection_unmodified() {
        let mut selector = ImageSelector::new(5);
        selector
            .select(&StubLibrary::picking(["a.jpg"]))
            .await
            .unwrap();

        let result = selector.select(&StubLibrary::denied()).await;

        assert!(matches!(result, Err(RoomshareError::PermissionDenied(_))));
        assert_eq!(selector.len(), 1);
    }

    #[tokio::test]
    async fn test_select_over_limit_discards_prospective_images() {
        let mut selector = ImageSelector::new(5);
        selector
            .select(&StubLibrary::picking(["a.jpg", "b.jpg", "c.jpg", "d.jpg"]))
            .await
            .unwrap();

        // 4 + 2 > 5: reject the whole pick, not just the overflow
        let result = selector
            .select(&StubLibrary::picking(["e.jpg", "f.jpg"]))
            .await;

        assert!(matches!(
            result,
            Err(RoomshareError::SelectionLimitExceeded {
                selected: 4,
                attempted: 2,
                max: 5
            })
        ));
        assert_eq!(selector.len(), 4);
    }

    #[tokio::test]
    async fn test_select_exactly_at_limit_is_accepted() {
        let mut selector = ImageSelector::new(5);

        let accepted = selector
            .select(&StubLibrary::picking([
                "a.jpg", "b.jpg", "c.jpg", "d.jpg", "e.jpg",
            ]))
            .await
            .unwrap();

        assert_eq!(accepted, 5);
        assert_eq!(selector.len(), 5);
    }

    #[tokio::test]
    async fn test_fs_library_picks_sorted_image_files() {
        let tmp = TempDir::new().unwrap();
        for name in ["b.jpg", "a.png", "notes.txt", "c.JPEG"] {
            std::fs::write(tmp.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(tmp.path().join("nested")).unwrap();
        std::fs::write(tmp.path().join("nested/d.webp"), b"").unwrap();

        let library = FsMediaLibrary::new(tmp.path());
        assert!(library.request_permission().await.unwrap());

        let picked = library.pick_images().await.unwrap();
        let names: Vec<_> = picked
            .iter()
            .map(|p| p.strip_prefix(tmp.path()).unwrap().to_owned())
            .collect();

        assert_eq!(
            names,
            vec![
                PathBuf::from("a.png"),
                PathBuf::from("b.jpg"),
                PathBuf::from("c.JPEG"),
                PathBuf::from("nested/d.webp"),
            ]
        );
    }

    #[tokio::test]
    async fn test_fs_library_missing_root_is_permission_denied() {
        let library = FsMediaLibrary::new("/definitely/not/a/real/photo/roll");
        let result = library.request_permission().await;

        assert!(matches!(result, Err(RoomshareError::PermissionDenied(_))));
    }
}
