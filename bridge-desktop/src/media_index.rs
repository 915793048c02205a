//! Filesystem Media Index using walkdir

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    media::{GenerationOracle, MediaIndex, RawFileRef, RescanProgress},
};
use core_runtime::config::{CoreConfig, DEFAULT_AUDIO_EXTENSIONS, DEFAULT_RESCAN_BATCH_SIZE};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::UNIX_EPOCH;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// One indexed file with the attributes that feed the generation.
#[derive(Debug, Clone, PartialEq, Eq)]
struct IndexedFile {
    path: PathBuf,
    size: u64,
    modified_ms: i64,
}

impl IndexedFile {
    fn stat(path: PathBuf) -> Option<Self> {
        let metadata = std::fs::metadata(&path).ok()?;
        let modified_ms = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        Some(Self {
            path,
            size: metadata.len(),
            modified_ms,
        })
    }
}

#[derive(Debug, Default)]
struct Snapshot {
    /// Sorted by path
    files: Vec<IndexedFile>,
    generation: i64,
}

impl Snapshot {
    fn new(mut files: Vec<IndexedFile>) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files.dedup_by(|a, b| a.path == b.path);
        let generation = fingerprint(&files);
        Self { files, generation }
    }
}

/// First 8 bytes of a SHA-256 digest as a big-endian `i64`.
fn truncate_digest(hasher: Sha256) -> i64 {
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes)
}

fn fingerprint(files: &[IndexedFile]) -> i64 {
    let mut hasher = Sha256::new();
    for file in files {
        hasher.update(file.path.to_string_lossy().as_bytes());
        hasher.update([0u8]);
        hasher.update(file.size.to_le_bytes());
        hasher.update(file.modified_ms.to_le_bytes());
    }
    truncate_digest(hasher)
}

/// Stable, non-negative id derived from the path.
fn file_id(path: &Path) -> i64 {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    truncate_digest(hasher) & i64::MAX
}

/// Desktop media index backed by a directory walk.
///
/// The index keeps the file list of the last enumeration or rescan in memory.
/// Its generation is a fingerprint of that list and is `None` until the
/// first walk.
pub struct FilesystemMediaIndex {
    roots: Vec<PathBuf>,
    extensions: HashSet<String>,
    rescan_batch_size: usize,
    snapshot: RwLock<Option<Snapshot>>,
}

impl FilesystemMediaIndex {
    pub fn new<I, S>(roots: Vec<PathBuf>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
            .collect();

        Self {
            roots,
            extensions,
            rescan_batch_size: DEFAULT_RESCAN_BATCH_SIZE,
            snapshot: RwLock::new(None),
        }
    }

    /// Index over `roots` with the default audio extensions.
    pub fn with_default_extensions(roots: Vec<PathBuf>) -> Self {
        Self::new(roots, DEFAULT_AUDIO_EXTENSIONS.iter().copied())
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(config.music_roots.clone(), &config.audio_extensions)
            .with_rescan_batch_size(config.rescan_batch_size)
    }

    pub fn with_rescan_batch_size(mut self, size: usize) -> Self {
        self.rescan_batch_size = size.max(1);
        self
    }

    fn is_audio(extensions: &HashSet<String>, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.contains(&e.to_lowercase()))
    }

    /// Blocking. Audio file paths under `root`, unreadable entries skipped.
    fn walk(root: &Path, extensions: &HashSet<String>) -> Vec<PathBuf> {
        WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!(error = %e, "Skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|path| Self::is_audio(extensions, path))
            .collect()
    }

    async fn blocking<T, F>(task: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(task)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Index task failed: {e}")))
    }

    fn install(&self, snapshot: Snapshot) -> Vec<RawFileRef> {
        let refs = snapshot
            .files
            .iter()
            .map(|f| RawFileRef::new(file_id(&f.path), f.path.clone()))
            .collect();
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
        refs
    }

    /// Replace everything under `root` with `fresh`.
    fn merge_root(&self, root: &Path, fresh: Vec<IndexedFile>) {
        let mut guard = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        let mut files: Vec<IndexedFile> = guard
            .take()
            .map(|s| s.files)
            .unwrap_or_default()
            .into_iter()
            .filter(|f| !f.path.starts_with(root))
            .collect();
        files.extend(fresh);
        *guard = Some(Snapshot::new(files));
    }
}

#[async_trait]
impl GenerationOracle for FilesystemMediaIndex {
    async fn current_generation(&self) -> Option<i64> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.generation)
    }
}

#[async_trait]
impl MediaIndex for FilesystemMediaIndex {
    async fn enumerate_audio_files(&self) -> Result<Vec<RawFileRef>> {
        let roots = self.roots.clone();
        let extensions = self.extensions.clone();

        let files = Self::blocking(move || {
            roots
                .iter()
                .filter(|root| {
                    let exists = root.is_dir();
                    if !exists {
                        warn!(root = %root.display(), "Music root missing, skipping");
                    }
                    exists
                })
                .flat_map(|root| Self::walk(root, &extensions))
                .filter_map(IndexedFile::stat)
                .collect::<Vec<_>>()
        })
        .await?;

        let snapshot = Snapshot::new(files);
        info!(
            files = snapshot.files.len(),
            generation = snapshot.generation,
            "Enumerated music roots"
        );
        Ok(self.install(snapshot))
    }

    fn content_ref(&self, file: &RawFileRef) -> String {
        format!("file://{}", file.path.to_string_lossy())
    }

    fn roots(&self) -> Vec<PathBuf> {
        self.roots.clone()
    }

    async fn request_rescan(
        &self,
        root: &Path,
        progress: &(dyn Fn(RescanProgress) + Send + Sync),
    ) -> Result<()> {
        if !root.is_dir() {
            return Err(BridgeError::NotFound(format!(
                "Music root {}",
                root.display()
            )));
        }

        let walk_root = root.to_path_buf();
        let extensions = self.extensions.clone();
        let paths = Self::blocking(move || Self::walk(&walk_root, &extensions)).await?;

        let total = paths.len();
        progress(RescanProgress {
            completed: 0,
            total,
        });

        let mut fresh = Vec::with_capacity(total);
        let mut completed = 0;
        for batch in paths.chunks(self.rescan_batch_size) {
            let batch = batch.to_vec();
            completed += batch.len();
            let stats = Self::blocking(move || {
                batch
                    .into_iter()
                    .filter_map(IndexedFile::stat)
                    .collect::<Vec<_>>()
            })
            .await?;
            fresh.extend(stats);

            progress(RescanProgress { completed, total });
        }

        self.merge_root(root, fresh);
        debug!(root = %root.display(), files = total, "Rescan merged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;
    use std::sync::Mutex;

    struct TempTree(PathBuf);

    impl TempTree {
        fn new() -> Self {
            let root = env::temp_dir().join(format!("media-index-{}", uuid::Uuid::new_v4()));
            fs::create_dir_all(&root).unwrap();
            Self(root)
        }

        fn write(&self, relative: &str, contents: &[u8]) -> PathBuf {
            let path = self.0.join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, contents).unwrap();
            path
        }
    }

    impl Drop for TempTree {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    fn index(tree: &TempTree) -> FilesystemMediaIndex {
        FilesystemMediaIndex::with_default_extensions(vec![tree.0.clone()])
    }

    #[tokio::test]
    async fn test_enumerate_filters_extensions() {
        let tree = TempTree::new();
        tree.write("A/01.flac", b"one");
        tree.write("A/02.MP3", b"two");
        tree.write("A/cover.jpg", b"img");
        tree.write("B/notes.txt", b"txt");

        let files = index(&tree).enumerate_audio_files().await.unwrap();

        let names: Vec<String> = files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["01.flac", "02.MP3"]);
    }

    #[tokio::test]
    async fn test_ids_are_stable() {
        let tree = TempTree::new();
        tree.write("x.ogg", b"x");
        let index = index(&tree);

        let first = index.enumerate_audio_files().await.unwrap();
        let second = index.enumerate_audio_files().await.unwrap();
        assert_eq!(first, second);
        assert!(first[0].id >= 0);
    }

    #[tokio::test]
    async fn test_generation_tracks_file_set() {
        let tree = TempTree::new();
        tree.write("a.flac", b"a");
        let index = index(&tree);

        assert_eq!(index.current_generation().await, None);

        index.enumerate_audio_files().await.unwrap();
        let first = index.current_generation().await.unwrap();

        index.enumerate_audio_files().await.unwrap();
        assert_eq!(index.current_generation().await, Some(first));

        tree.write("b.flac", b"b");
        index.enumerate_audio_files().await.unwrap();
        assert_ne!(index.current_generation().await, Some(first));
    }

    #[tokio::test]
    async fn test_generation_changes_with_size() {
        let tree = TempTree::new();
        tree.write("a.flac", b"a");
        let index = index(&tree);
        index.enumerate_audio_files().await.unwrap();
        let before = index.current_generation().await;

        tree.write("a.flac", b"longer contents");
        index.enumerate_audio_files().await.unwrap();
        assert_ne!(index.current_generation().await, before);
    }

    #[tokio::test]
    async fn test_content_ref_is_file_uri() {
        let tree = TempTree::new();
        let path = tree.write("song.m4a", b"m");
        let index = index(&tree);
        let files = index.enumerate_audio_files().await.unwrap();

        assert_eq!(
            index.content_ref(&files[0]),
            format!("file://{}", path.display())
        );
    }

    #[tokio::test]
    async fn test_missing_root_is_skipped() {
        let tree = TempTree::new();
        tree.write("a.flac", b"a");
        let index = FilesystemMediaIndex::with_default_extensions(vec![
            tree.0.join("missing"),
            tree.0.clone(),
        ]);

        assert_eq!(index.enumerate_audio_files().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rescan_reports_batches() {
        let tree = TempTree::new();
        for i in 0..7 {
            tree.write(&format!("t{i}.flac"), b"t");
        }
        let index = index(&tree).with_rescan_batch_size(3);

        let reports = Mutex::new(Vec::new());
        index
            .request_rescan(&tree.0, &|p: RescanProgress| {
                reports.lock().unwrap().push((p.completed, p.total))
            })
            .await
            .unwrap();

        assert_eq!(
            reports.into_inner().unwrap(),
            vec![(0, 7), (3, 7), (6, 7), (7, 7)]
        );
        assert!(index.current_generation().await.is_some());
    }

    #[tokio::test]
    async fn test_rescan_empty_root() {
        let tree = TempTree::new();
        let index = index(&tree);

        let reports = Mutex::new(Vec::new());
        index
            .request_rescan(&tree.0, &|p: RescanProgress| {
                reports.lock().unwrap().push((p.completed, p.total))
            })
            .await
            .unwrap();

        assert_eq!(reports.into_inner().unwrap(), vec![(0, 0)]);
    }

    #[tokio::test]
    async fn test_rescan_matches_enumeration_generation() {
        let tree = TempTree::new();
        tree.write("a.flac", b"a");
        tree.write("sub/b.flac", b"b");

        let rescanned = index(&tree);
        rescanned.request_rescan(&tree.0, &|_: RescanProgress| {}).await.unwrap();

        let enumerated = index(&tree);
        enumerated.enumerate_audio_files().await.unwrap();

        assert_eq!(
            rescanned.current_generation().await,
            enumerated.current_generation().await
        );
    }

    #[tokio::test]
    async fn test_rescan_unknown_root_fails() {
        let tree = TempTree::new();
        let result = index(&tree)
            .request_rescan(&tree.0.join("nope"), &|_: RescanProgress| {})
            .await;
        assert!(matches!(result, Err(BridgeError::NotFound(_))));
    }
}
