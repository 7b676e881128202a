use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use kestrel::error;
use kestrel::error::{Chainable, Result};
use kestrel::value::{Format, Toml};

use crate::CONFIG_FILE;

/// Site settings, read from `config.toml` at the source root.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// The language of pages that don't name one.
    pub lang: Option<Arc<str>>,
    /// The file name of the template pages are wrapped in, looked up from
    /// the page's directory upwards.
    pub template: Arc<str>,
    /// Default content pipelines by source extension.
    pub pipelines: FxHashMap<String, String>,
    pub gallery: GalleryDefaults,
    pub tidy: TidySettings,
}

/// Defaults for `*.gallery` files.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GalleryDefaults {
    pub title: String,
    pub images_per_page: usize,
    /// The directory images are taken from, relative to the gallery file.
    pub images: String,
    pub extensions: Vec<String>,
    /// The `sort_info` of the first gallery page; each further page adds one.
    pub sort_info: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TidySettings {
    pub command: String,
    pub options: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            lang: None,
            template: "default.template".into(),
            pipelines: default_pipelines(),
            gallery: GalleryDefaults::default(),
            tidy: TidySettings::default(),
        }
    }
}

impl Default for GalleryDefaults {
    fn default() -> Self {
        GalleryDefaults {
            title: "Gallery".into(),
            images_per_page: 20,
            images: "images".into(),
            extensions: ["jpg", "jpeg", "png", "gif", "webp"].map(String::from).to_vec(),
            sort_info: 50,
        }
    }
}

impl Default for TidySettings {
    fn default() -> Self {
        TidySettings {
            command: "tidy".into(),
            options: vec!["-quiet".into(), "-raw".into()],
        }
    }
}

fn default_pipelines() -> FxHashMap<String, String> {
    let mut pipelines = FxHashMap::default();
    pipelines.insert("page".into(), "blocks,markdown".into());
    pipelines.insert("template".into(), "template,blocks".into());
    pipelines.insert("scss".into(), "sass".into());
    pipelines
}

impl Settings {
    /// Reads `config.toml` in `root`, if there is one. Pipelines the file
    /// doesn't mention keep their defaults.
    pub fn discover(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(Settings::default());
        }

        let mut settings: Settings = Toml::read(&*path).chain_with(|| error! {
            "failed to read site configuration",
            "path" => path.display(),
        })?;

        for (ext, pipeline) in default_pipelines() {
            settings.pipelines.entry(ext).or_insert(pipeline);
        }

        if settings.gallery.images_per_page == 0 {
            return kestrel::err!("gallery.images_per_page must be positive", "path" => path.display());
        }

        Ok(settings)
    }

    /// The default pipeline for sources with extension `ext`, if they are
    /// rendered at all.
    pub fn pipeline(&self, ext: &str) -> Option<&str> {
        self.pipelines.get(ext).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::discover(dir.path()).unwrap();
        assert_eq!(settings.pipeline("page"), Some("blocks,markdown"));
        assert_eq!(&*settings.template, "default.template");
        assert_eq!(settings.pipeline("png"), None);

        std::fs::write(dir.path().join(CONFIG_FILE), "lang = 'de'\n\
            [pipelines]\npage = 'blocks'\nhtml = 'template'\n\
            [gallery]\nimages_per_page = 4\n").unwrap();

        let settings = Settings::discover(dir.path()).unwrap();
        assert_eq!(settings.lang.as_deref(), Some("de"));
        assert_eq!(settings.pipeline("page"), Some("blocks"));
        assert_eq!(settings.pipeline("html"), Some("template"));
        assert_eq!(settings.pipeline("template"), Some("template,blocks"));
        assert_eq!(settings.gallery.images_per_page, 4);
        assert_eq!(settings.gallery.title, "Gallery");
        assert_eq!(settings.tidy.command, "tidy");

        std::fs::write(dir.path().join(CONFIG_FILE), "lang = [").unwrap();
        assert!(Settings::discover(dir.path()).is_err());
    }
}
