use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::report::Report;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    /// Reports to generate, in order. All of them when not given
    pub reports: Option<Vec<Box<dyn Report>>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub results_dir: Option<PathBuf>,
    pub images_dir: Option<PathBuf>,
    /// TrueType font used for every chart label
    pub font: Option<PathBuf>,
}

pub const DEFAULT_RESULTS_DIR: &str = "results";

impl Settings {
    pub fn results_dir(&self) -> PathBuf {
        self.results_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_DIR))
    }

    /// The configured images directory, else `images` next to `results_dir`
    pub fn images_dir_for(&self, results_dir: &Path) -> PathBuf {
        match &self.images_dir {
            Some(dir) => dir.clone(),
            None => sibling_images_dir(results_dir),
        }
    }
}

fn sibling_images_dir(results_dir: &Path) -> PathBuf {
    results_dir
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join("images")
}
