//! Where frames, sheets, and metadata end up.
//!
//! Paths handed to a [`Storage`] are relative; the implementation decides
//! what they are relative to. [`FsStorage`] roots them at a directory on
//! disk, [`MemoryStorage`] keeps everything in maps.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{BatchError, BatchResult};
use crate::image::FrameImage;
use crate::png::{self, PngConfig};

/// Persistence used by the executor.
pub trait Storage {
    /// Writes an image as PNG, returning the BLAKE3 hash of the encoded bytes.
    fn write_image(&mut self, path: &Path, image: &FrameImage) -> BatchResult<String>;

    /// Writes a temporary frame that is read back once and then deleted.
    ///
    /// Defaults to [`Storage::write_image`]; implementations may trade size
    /// for speed here.
    fn write_temp_image(&mut self, path: &Path, image: &FrameImage) -> BatchResult<()> {
        self.write_image(path, image).map(|_| ())
    }

    /// Reads back an image written by [`Storage::write_image`] or
    /// [`Storage::write_temp_image`].
    fn read_image(&self, path: &Path) -> BatchResult<FrameImage>;

    /// Deletes a temporary file. Deleting a file that is already gone is not
    /// an error.
    fn delete_temp(&mut self, path: &Path) -> BatchResult<()>;

    /// Writes a UTF-8 text file.
    fn write_text(&mut self, path: &Path, contents: &str) -> BatchResult<()>;
}

/// Replaces characters that are unsafe in a file name with `_`.
///
/// Rig and clip ids come from the host scene and may contain separators.
pub fn file_safe(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        cleaned
    }
}

/// Filesystem storage rooted at a directory.
///
/// Sheets are encoded with `png`, temporary frames with `temp_png`
/// ([`PngConfig::fast`] unless changed).
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
    png: PngConfig,
    temp_png: PngConfig,
}

impl FsStorage {
    /// Creates storage rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            png: PngConfig::default(),
            temp_png: PngConfig::fast(),
        }
    }

    /// Sets the PNG settings used for sheets.
    pub fn with_png_config(mut self, config: PngConfig) -> Self {
        self.png = config;
        self
    }

    /// Sets the PNG settings used for temporary frames.
    pub fn with_temp_png_config(mut self, config: PngConfig) -> Self {
        self.temp_png = config;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a relative storage path.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    fn prepare_parent(&self, full: &Path) -> BatchResult<()> {
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|e| BatchError::storage(parent, e))?;
        }
        Ok(())
    }

    fn encode_to(&self, path: &Path, image: &FrameImage, config: &PngConfig) -> BatchResult<String> {
        let full = self.resolve(path);
        self.prepare_parent(&full)?;

        let (data, hash) = png::write_rgba_to_vec_with_hash(image, config).map_err(|e| {
            BatchError::Png {
                path: full.clone(),
                source: e,
            }
        })?;
        fs::write(&full, &data).map_err(|e| BatchError::storage(&full, e))?;

        debug!(path = %full.display(), bytes = data.len(), "wrote image");
        Ok(hash)
    }

    /// Removes now-empty directories between `full`'s parent and the root.
    fn prune_empty_dirs(&self, full: &Path) {
        let mut dir = full.parent();
        while let Some(current) = dir {
            if current == self.root || !current.starts_with(&self.root) {
                break;
            }
            if fs::remove_dir(current).is_err() {
                break;
            }
            dir = current.parent();
        }
    }
}

impl Storage for FsStorage {
    fn write_image(&mut self, path: &Path, image: &FrameImage) -> BatchResult<String> {
        self.encode_to(path, image, &self.png)
    }

    fn write_temp_image(&mut self, path: &Path, image: &FrameImage) -> BatchResult<()> {
        self.encode_to(path, image, &self.temp_png).map(|_| ())
    }

    fn read_image(&self, path: &Path) -> BatchResult<FrameImage> {
        let full = self.resolve(path);
        let file = fs::File::open(&full).map_err(|e| BatchError::storage(&full, e))?;
        png::read_rgba(std::io::BufReader::new(file)).map_err(|e| BatchError::Png {
            path: full,
            source: e,
        })
    }

    fn delete_temp(&mut self, path: &Path) -> BatchResult<()> {
        let full = self.resolve(path);
        match fs::remove_file(&full) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %full.display(), "temp file already gone");
            }
            Err(e) => return Err(BatchError::storage(&full, e)),
        }
        self.prune_empty_dirs(&full);
        Ok(())
    }

    fn write_text(&mut self, path: &Path, contents: &str) -> BatchResult<()> {
        let full = self.resolve(path);
        self.prepare_parent(&full)?;
        fs::write(&full, contents).map_err(|e| BatchError::storage(&full, e))?;
        debug!(path = %full.display(), "wrote text");
        Ok(())
    }
}

/// Storage that keeps images and text in memory.
///
/// Useful for hosts that upload sheets elsewhere, and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    images: BTreeMap<PathBuf, FrameImage>,
    texts: BTreeMap<PathBuf, String>,
    png: PngConfig,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image(&self, path: impl AsRef<Path>) -> Option<&FrameImage> {
        self.images.get(path.as_ref())
    }

    pub fn text(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.texts.get(path.as_ref()).map(String::as_str)
    }

    /// Paths of all stored images, sorted.
    pub fn image_paths(&self) -> impl Iterator<Item = &Path> {
        self.images.keys().map(PathBuf::as_path)
    }

    /// Paths of all stored text files, sorted.
    pub fn text_paths(&self) -> impl Iterator<Item = &Path> {
        self.texts.keys().map(PathBuf::as_path)
    }
}

impl Storage for MemoryStorage {
    fn write_image(&mut self, path: &Path, image: &FrameImage) -> BatchResult<String> {
        let (_, hash) =
            png::write_rgba_to_vec_with_hash(image, &self.png).map_err(|e| BatchError::Png {
                path: path.to_path_buf(),
                source: e,
            })?;
        self.images.insert(path.to_path_buf(), image.clone());
        Ok(hash)
    }

    fn read_image(&self, path: &Path) -> BatchResult<FrameImage> {
        self.images.get(path).cloned().ok_or_else(|| {
            BatchError::storage(path, std::io::Error::from(ErrorKind::NotFound))
        })
    }

    fn delete_temp(&mut self, path: &Path) -> BatchResult<()> {
        self.images.remove(path);
        Ok(())
    }

    fn write_text(&mut self, path: &Path, contents: &str) -> BatchResult<()> {
        self.texts.insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }
}
