use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use rustc_hash::FxHashMap;

use kestrel::{error, Behavior, Blackboard, NodeId, Processors, SitePath, Tree};
use kestrel::error::{Chainable, Result};
use kestrel::page;
use kestrel::processors::Tidy;
use kestrel::value::{DestPath, Dict, Lang, MetaKey, NoOutput, Source, Template, Value};

use crate::{CONFIG_FILE, STAMP_FILE, Draft, SourcePath};
use crate::config::Settings;
use crate::gallery::Gallery;
use crate::util::{modified, ModifiedSince, StaleOutput};

#[derive(Debug)]
pub struct Wren {
    pub input: PathBuf,
    pub output: PathBuf,
    pub settings: Settings,
    pub processors: Processors,
    /// When the previous build finished, if its output can be reused.
    pub previous_build: Option<SystemTime>,
}

struct PendingGallery {
    parent: NodeId,
    source: PathBuf,
}

impl Wren {
    pub fn new<I: AsRef<Path>, O: AsRef<Path>>(input: I, output: O, force: bool) -> Result<Self> {
        let input = input.as_ref().to_path_buf();
        let output = output.as_ref().to_path_buf();
        if !input.is_dir() {
            return kestrel::err!("site source must be a directory", "path" => input.display());
        }

        let settings = Settings::discover(&input)?;
        let mut processors = Processors::with_defaults();
        processors.register("tidy", Tidy::new(&*settings.tidy.command, settings.tidy.options.clone()));

        // A changed configuration can affect every page.
        let previous_build = modified(&output.join(STAMP_FILE))
            .filter(|_| !force)
            .filter(|&stamp| modified(&input.join(CONFIG_FILE)).map_or(true, |config| config <= stamp));

        Ok(Wren { input, output, settings, processors, previous_build })
    }

    /// The observers a build reports node events to.
    pub fn blackboard(&self) -> Blackboard {
        let mut blackboard = Blackboard::new();
        blackboard.add_observer(StaleOutput { output: self.output.clone() });
        if let Some(since) = self.previous_build {
            blackboard.add_observer(ModifiedSince { since });
        }

        blackboard
    }

    /// Builds the node tree for every file under the input directory.
    ///
    /// Nodes whose output a previous build wrote are restored rather than
    /// created, so that only changed sources are rendered again. Pages
    /// marked as drafts are removed once the tree is complete.
    pub fn discover(&self, blackboard: &Blackboard) -> Result<Tree> {
        use jwalk::WalkDir;

        let mut tree = Tree::new();
        let root = self.insert(&mut tree, None, SitePath::new("/"), None, Behavior::Directory)?;
        let mut dirs: FxHashMap<PathBuf, NodeId> = FxHashMap::default();
        dirs.insert(self.input.clone(), root);

        let mut galleries = vec![];
        let walker = WalkDir::new(&self.input)
            .sort(true)
            .skip_hidden(true)
            .follow_links(true);

        for entry in walker {
            let entry = entry.map_err(|e| error!("failed to read site source", e))?;
            if entry.depth == 0 {
                continue;
            }

            let path = entry.path();
            let file_name = entry.file_name.to_string_lossy();
            let Some(&parent) = dirs.get(&*entry.parent_path) else {
                continue;
            };

            if entry.depth == 1 && file_name == CONFIG_FILE {
                continue;
            }

            if entry.file_type.is_dir() {
                let site_path = SitePath::new(format!("{file_name}/"));
                let id = self.insert(&mut tree, Some(parent), site_path, None, Behavior::Directory)?;
                dirs.insert(path, id);
                continue;
            }

            let parsed = SitePath::parse(&file_name);
            match parsed.ext.as_deref() {
                Some("gallery") => galleries.push(PendingGallery { parent, source: path }),
                Some(ext) if self.settings.pipeline(ext).is_some() => {
                    self.add_page(&mut tree, parent, &path).chain_with(|| error! {
                        "failed to add page",
                        "path" => path.display(),
                    })?;
                }
                _ => {
                    let site_path = SitePath::new(&*file_name)
                        .with_meta(source_meta(&path));

                    self.insert(&mut tree, Some(parent), site_path, None, Behavior::asset(&path))?;
                }
            }
        }

        for gallery in galleries {
            self.add_gallery(&mut tree, &gallery).chain_with(|| error! {
                "failed to create gallery",
                "path" => gallery.source.display(),
            })?;
        }

        let drafts: Vec<Arc<str>> = tree.iter()
            .filter(|node| matches!(node.meta().get(Draft), Some(Ok(true))))
            .map(|node| node.alcn().into())
            .collect();

        for alcn in drafts {
            tracing::info!(page = %alcn, "skipping draft");
            tree.delete_node(blackboard, &*alcn, false);
        }

        Ok(tree)
    }

    fn insert(
        &self,
        tree: &mut Tree,
        parent: Option<NodeId>,
        path: SitePath,
        cn: Option<&str>,
        behavior: Behavior,
    ) -> Result<NodeId> {
        match self.previous_build {
            Some(_) => tree.restore_node(parent, path, cn, behavior),
            None => tree.create_node(parent, path, cn, behavior),
        }
    }

    /// Adds the page in `file`. Its front matter becomes the node's meta
    /// info; the output name is derived from the file name, with `.page`
    /// sources becoming `.html` and stylesheets `.css`. A language in the
    /// file name stays in the output name: `about.de.page` is written to
    /// `about.de.html`.
    fn add_page(&self, tree: &mut Tree, parent: NodeId, file: &Path) -> Result<NodeId> {
        let file_name = file.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        let parsed = SitePath::parse(&file_name);
        let ext = parsed.ext.as_deref().unwrap_or_default();
        let source: Arc<str> = file.try_read()?;
        let (mut meta, _) = page::parse(&source)?;
        meta.extend(source_meta(file));

        let out_ext = match ext {
            "page" => "html",
            "scss" | "sass" => "css",
            ext => ext,
        };

        match ext {
            "template" => { meta.entry(NoOutput::KEY.into()).or_insert(true.into()); }
            "scss" | "sass" => { meta.entry(Template::KEY.into()).or_insert(false.into()); }
            _ => {}
        }

        let cn = parsed.canonical_name(Some(out_ext));
        let lang = meta.get(Lang::KEY).cloned()
            .or_else(|| parsed.lang.clone().map(Value::from))
            .or_else(|| (ext == "page").then(|| self.settings.lang.clone().map(Value::from)).flatten());

        let path = match meta.get(DestPath::KEY).and_then(Value::as_str) {
            Some(dest) => dest.to_string(),
            None => match &parsed.lang {
                Some(lang) => format!("{}.{lang}.{out_ext}", parsed.basename),
                None => cn.clone(),
            },
        };

        if let Some(lang) = lang {
            meta.insert(Lang::KEY.into(), lang);
        }

        self.set_default_pipeline(&mut meta, ext);
        let site_path = SitePath::new(path).with_meta(meta);
        self.insert(tree, Some(parent), site_path, Some(&cn), Behavior::Page { source })
    }

    /// Sets `blocks.default.pipeline` to the configured pipeline for `ext`
    /// unless the page sets one.
    fn set_default_pipeline(&self, meta: &mut Dict, ext: &str) {
        let Some(pipeline) = self.settings.pipeline(ext) else {
            return;
        };

        let blocks = match meta.get("blocks") {
            Some(Value::Dict(blocks)) => (**blocks).clone(),
            _ => Dict::new(),
        };

        let mut default = match blocks.get("default") {
            Some(Value::Dict(default)) => (**default).clone(),
            _ => Dict::new(),
        };

        if default.contains_key("pipeline") {
            return;
        }

        default.insert("pipeline".into(), pipeline.into());
        let mut blocks = blocks;
        blocks.insert("default".into(), default.into());
        meta.insert("blocks".into(), blocks.into());
    }

    /// Adds the pages of the gallery in `gallery.source`, next to it.
    fn add_gallery(&self, tree: &mut Tree, gallery: &PendingGallery) -> Result<()> {
        let source: Arc<str> = gallery.source.as_path().try_read()?;
        let file = Gallery::parse(&source)?;
        let defaults = &self.settings.gallery;

        let dir = &tree[gallery.parent];
        let prefix = dir.absolute_path().to_string();
        let images: Vec<String> = match tree.resolve(gallery.parent, file.images_dir(defaults), None) {
            Some(images_dir) => tree.iter_depth_first(images_dir).nodes()
                .filter(|node| node.is_file())
                .filter_map(|node| node.absolute_path().strip_prefix(&*prefix))
                .map(String::from)
                .collect(),
            None => vec![],
        };

        let pages = file.pages(defaults, &images);
        tracing::info!(gallery = %gallery.source.display(), images = images.len(), pages = pages.len(), "creating gallery");
        for generated in pages {
            let mut meta = generated.meta;
            meta.extend(source_meta(&gallery.source));
            if let Some(lang) = &self.settings.lang {
                meta.entry(Lang::KEY.into()).or_insert_with(|| lang.clone().into());
            }

            self.set_default_pipeline(&mut meta, "gallery");
            let site_path = SitePath::new(generated.name).with_meta(meta);
            self.insert(tree, Some(gallery.parent), site_path, None, Behavior::page(generated.content))?;
        }

        Ok(())
    }
}

/// Meta info recording where a node came from.
fn source_meta(path: &Path) -> Dict {
    let mut meta = Dict::new();
    meta.insert(SourcePath::KEY.into(), path.to_string_lossy().as_ref().into());
    meta
}
