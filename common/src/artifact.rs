use std::{
    fs,
    path::{Path, PathBuf},
};

use eyre::{Context, Result};
use tracing::{debug, info};

/// Publishes each chart to the results directory and the site images
/// directory under the same name
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    pub results_dir: PathBuf,
    pub images_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(results_dir: impl Into<PathBuf>, images_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
            images_dir: images_dir.into(),
        }
    }

    /// Renders once into the results directory, then copies the file so both
    /// destinations hold identical bytes. Existing files are overwritten.
    pub fn publish<F>(&self, name: &str, render: F) -> Result<[PathBuf; 2]>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        fs::create_dir_all(&self.results_dir)
            .wrap_err_with(|| format!("Create {}", self.results_dir.display()))?;
        fs::create_dir_all(&self.images_dir)
            .wrap_err_with(|| format!("Create {}", self.images_dir.display()))?;

        let primary = self.results_dir.join(name);
        render(&primary).wrap_err_with(|| format!("Render {name}"))?;
        info!("Saved: {}", primary.display());

        let copy = self.images_dir.join(name);
        if self.same_directory()? {
            debug!("Images directory is the results directory, not copying {name}");
        } else {
            fs::copy(&primary, &copy)
                .wrap_err_with(|| format!("Copy {} to {}", primary.display(), copy.display()))?;
        }
        info!("Saved: {}", copy.display());

        Ok([primary, copy])
    }

    /// Copying a file onto itself truncates it
    fn same_directory(&self) -> Result<bool> {
        let results = fs::canonicalize(&self.results_dir)
            .wrap_err_with(|| format!("Resolve {}", self.results_dir.display()))?;
        let images = fs::canonicalize(&self.images_dir)
            .wrap_err_with(|| format!("Resolve {}", self.images_dir.display()))?;
        Ok(results == images)
    }
}

/// PNG files in `dir`, sorted by name
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images = fs::read_dir(dir)
        .wrap_err_with(|| format!("Read {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
        .collect::<Vec<_>>();
    images.sort();
    Ok(images)
}
