use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use rustc_hash::FxHashMap;

use crate::error::{Error, Failure, Result};
use crate::node::{Behavior, Blackboard, Node, NodeId};
use crate::page::{self, Blocks};
use crate::path::{self, SitePath};
use crate::util::{is_absolute_url, LazyFallibleArc};
use crate::value::{Lang, Value};

/// Owns every node of one run.
///
/// The tree has a hidden dummy root whose only child is the real root: the
/// node created with no parent. The dummy root has no [`NodeId`], so it is
/// never returned by a traversal and can't be deleted.
#[derive(Debug, Default)]
pub struct Tree {
    nodes: Vec<Option<Node>>,
    root: Option<NodeId>,
    node_access: FxHashMap<Arc<str>, NodeId>,
    node_info: FxHashMap<Arc<str>, NodeInfo>,
}

/// Per-node processing state, keyed by ALCN.
#[derive(Debug, Default)]
pub struct NodeInfo {
    blocks: Option<LazyFallibleArc<Blocks, Error>>,
}

/// A node given either by id or by ALCN.
#[derive(Debug, Clone, Copy, derive_more::From)]
pub enum NodeRef<'a> {
    Id(NodeId),
    Alcn(&'a str),
}

impl Tree {
    pub fn new() -> Self {
        Tree::default()
    }

    /// Builds a node for `path` under `parent`, or as the root if `parent`
    /// is `None`. The canonical name defaults to the last segment of the
    /// path. A `lang` meta info entry is removed and becomes the node's
    /// language.
    pub fn create_node<P>(
        &mut self,
        parent: Option<NodeId>,
        path: P,
        cn: Option<&str>,
        behavior: Behavior,
    ) -> Result<NodeId>
        where P: Into<SitePath>
    {
        self.insert(parent, path.into(), cn, behavior, true)
    }

    /// Like [`Tree::create_node`] for a node carried over from a previous run:
    /// it is neither created nor dirty.
    pub fn restore_node<P>(
        &mut self,
        parent: Option<NodeId>,
        path: P,
        cn: Option<&str>,
        behavior: Behavior,
    ) -> Result<NodeId>
        where P: Into<SitePath>
    {
        self.insert(parent, path.into(), cn, behavior, false)
    }

    fn insert(
        &mut self,
        parent: Option<NodeId>,
        path: SitePath,
        cn: Option<&str>,
        behavior: Behavior,
        created: bool,
    ) -> Result<NodeId> {
        match parent {
            Some(parent) if self.get(parent).is_none() => {
                return err!("parent node does not exist", "path" => path, "parent" => format!("{parent:?}"));
            }
            None if self.root.is_some() => {
                return Err(Failure::DuplicateIdentity { alcn: "".into() }.into());
            }
            _ => {}
        }

        let cn: Arc<str> = match cn {
            Some(cn) => cn.strip_suffix('/').unwrap_or(cn).into(),
            None => default_cn(path.path()).into(),
        };

        if cn.contains('/') {
            return Err(Failure::InvalidCanonicalName { name: cn, path: path.path().into() }.into());
        }

        let meta = path.to_meta();
        let lang: Option<Arc<str>> = match meta.remove(Lang) {
            Some(Value::String(lang)) => Some(lang),
            Some(Value::Null) | None => None,
            Some(value) => return err! {
                "node language must be a string",
                "path" => path,
                "found" => value.kind(),
            },
        };

        let lcn: Arc<str> = path::lcn(&cn, lang.as_deref()).into();
        let path_str: Arc<str> = path.path().into();

        // Nested fragments hang off the nearest non-fragment ancestor.
        let mut logical_parent = parent;
        while path::is_fragment(&path_str) {
            match logical_parent {
                Some(id) if self[id].is_fragment() => logical_parent = self[id].parent,
                _ => break,
            }
        }

        let (absolute_path, alcn): (Arc<str>, Arc<str>) = match logical_parent {
            None => {
                (path_str.clone(), "".into())
            }
            Some(id) => {
                let lp = &self[id];
                let absolute_path = match is_absolute_url(&path_str) {
                    true => path_str.clone(),
                    false => format!("{}{}", lp.absolute_path, path_str).into(),
                };

                let separator = if lp.is_directory() { "/" } else { "" };
                (absolute_path, format!("{}{}{}", lp.alcn, separator, lcn).into())
            }
        };

        if self.node_access.contains_key(&alcn) {
            return Err(Failure::DuplicateIdentity { alcn }.into());
        }

        let id = NodeId(self.nodes.len());
        let info = NodeInfo {
            blocks: match &behavior {
                Behavior::Page { source } => {
                    let source = source.clone();
                    Some(LazyFallibleArc::new(move || page::parse(&source).map(|(_, blocks)| blocks)))
                }
                _ => None,
            },
        };

        tracing::debug!(alcn = %alcn, behavior = behavior.name(), created, "creating node");
        self.node_access.insert(alcn.clone(), id);
        self.node_info.insert(alcn.clone(), info);
        self.nodes.push(Some(Node {
            id,
            parent,
            children: vec![],
            path: path_str,
            cn,
            lang,
            lcn,
            absolute_path,
            alcn,
            meta,
            behavior,
            dirty: AtomicBool::new(created),
            created,
        }));

        match parent {
            Some(parent) => self[parent].children.push(id),
            None => self.root = Some(id),
        }

        Ok(id)
    }

    /// The real root: the dummy root's only child.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.node_access.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_access.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)?.as_ref()
    }

    /// The node with the absolute localized canonical name `alcn`.
    pub fn get_by_alcn(&self, alcn: &str) -> Option<&Node> {
        self.lookup(alcn).map(|id| &self[id])
    }

    pub fn lookup<'a, R: Into<NodeRef<'a>>>(&self, node: R) -> Option<NodeId> {
        match node.into() {
            NodeRef::Id(id) => self.get(id).map(|n| n.id),
            NodeRef::Alcn(alcn) => self.node_access.get(alcn).copied(),
        }
    }

    pub fn node_info(&self, id: NodeId) -> &NodeInfo {
        &self.node_info[&self[id].alcn]
    }

    /// The blocks of page `id`, parsed on first access.
    pub fn blocks(&self, id: NodeId) -> Result<&Blocks> {
        match &self.node_info(id).blocks {
            Some(blocks) => blocks.force().map_err(|e| e.clone()),
            None => Err(self[id].unsupported("blocks").into()),
        }
    }

    /// See [`Node::changed`].
    pub fn changed(&self, id: NodeId, blackboard: &Blackboard) -> bool {
        self[id].changed(self, blackboard)
    }

    /// Removes `node` and all of its descendants. Directories are only
    /// removed if `delete_dir` is set. Every removed node is announced to
    /// `blackboard` before it is unlinked, children before parents. Returns
    /// `true` if anything was removed.
    pub fn delete_node<'a, R>(&mut self, blackboard: &Blackboard, node: R, delete_dir: bool) -> bool
        where R: Into<NodeRef<'a>>
    {
        let Some(id) = self.lookup(node) else {
            return false;
        };

        if self[id].is_directory() && !delete_dir {
            return false;
        }

        self.delete_subtree(blackboard, id);
        true
    }

    fn delete_subtree(&mut self, blackboard: &Blackboard, id: NodeId) {
        for child in self[id].children.clone() {
            self.delete_subtree(blackboard, child);
        }

        blackboard.before_node_deleted(self, &self[id]);
        match self[id].parent {
            Some(parent) => self[parent].children.retain(|&c| c != id),
            None => self.root = None,
        }

        if let Some(node) = self.nodes[id.0].take() {
            tracing::debug!(alcn = %node.alcn, "deleting node");
            self.node_access.remove(&node.alcn);
            self.node_info.remove(&node.alcn);
        }
    }

    /// Every live node, in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter_map(|n| n.as_ref())
    }

    /// The parent of `id`, its parent, and so on up to the root.
    pub fn ancestors(&self, mut id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::from_fn(move || {
            let parent = self[id].parent?;
            id = parent;
            Some(parent)
        })
    }

    pub fn iter_breadth_first(&self, root: NodeId) -> Bfs<'_> {
        Bfs {
            tree: self,
            root: Some(root),
            stack: VecDeque::new(),
            progress: 0
        }
    }

    pub fn iter_depth_first(&self, root: NodeId) -> Dfs<'_> {
        Dfs {
            tree: self,
            stack: { let mut q = VecDeque::new(); q.push_back(root); q },
        }
    }

    /// The directory `id` is in, or `id` itself if it's a directory.
    fn directory_of(&self, id: NodeId) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&id| self[id].is_directory())
    }

    /// The nearest ancestor-or-self of `id` that isn't a fragment.
    fn file_of(&self, id: NodeId) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&id| !self[id].is_fragment())
    }

    /// Resolves `path` relative to node `from`.
    ///
    /// `path` may be absolute (`/dir/file.html`), relative with `.` and `..`
    /// segments, a fragment (`#frag`) of the page `from` is in, or a compound
    /// `file.html#frag`. The node localized in `lang` is preferred, then the
    /// unlocalized one. Absolute URLs never resolve.
    pub fn resolve(&self, from: NodeId, path: &str, lang: Option<&str>) -> Option<NodeId> {
        if is_absolute_url(path) {
            return None;
        }

        let (file, fragment) = match path.split_once('#') {
            Some((file, fragment)) => (file, Some(fragment)),
            None => (path, None),
        };

        let target = match file {
            "" => self.file_of(from)?,
            file => {
                let mut segments: Vec<&str> = vec![];
                if !file.starts_with('/') {
                    let dir = self.directory_of(from)?;
                    segments.extend(self[dir].alcn.split('/').filter(|s| !s.is_empty()));
                }

                for segment in file.split('/') {
                    match segment {
                        "" | "." => continue,
                        ".." => { segments.pop(); }
                        segment => segments.push(segment),
                    }
                }

                match segments.split_last() {
                    None => self.root?,
                    Some((name, dirs)) => {
                        let prefix: String = dirs.iter().flat_map(|d| ["/", *d]).collect();
                        let localized = lang.map(|lang| format!("{prefix}/{}", path::lcn(name, Some(lang))));
                        localized.and_then(|alcn| self.lookup(&*alcn))
                            .or_else(|| self.lookup(&*format!("{prefix}/{name}")))?
                    }
                }
            }
        };

        match fragment {
            Some(fragment) => self.lookup(&*format!("{}#{}", self[target].alcn, fragment)),
            None => Some(target),
        }
    }

    /// The URL of `to` relative to `from`.
    ///
    /// Nodes on the same page route to their fragment. Absolute URLs are
    /// returned as is.
    pub fn route(&self, from: NodeId, to: NodeId) -> String {
        let to_path = &*self[to].absolute_path;
        if is_absolute_url(to_path) {
            return to_path.to_string();
        }

        let from_path = &*self[from].absolute_path;
        let from_file = from_path.split('#').next().unwrap_or(from_path);
        let (to_file, to_fragment) = match to_path.split_once('#') {
            Some((file, fragment)) => (file, Some(fragment)),
            None => (to_path, None),
        };

        if to_file == from_file {
            if let Some(fragment) = to_fragment {
                return format!("#{fragment}");
            }
        }

        let from_dirs: Vec<&str> = match from_file.rfind('/') {
            Some(i) => from_file[..i].split('/').filter(|s| !s.is_empty()).collect(),
            None => vec![],
        };

        let (to_dirs, to_name): (Vec<&str>, &str) = match to_file.rsplit_once('/') {
            Some((dirs, name)) => (dirs.split('/').filter(|s| !s.is_empty()).collect(), name),
            None => (vec![], to_file),
        };

        let common = from_dirs.iter().zip(&to_dirs).take_while(|(a, b)| a == b).count();
        let mut url = "../".repeat(from_dirs.len() - common);
        for dir in &to_dirs[common..] {
            url.push_str(dir);
            url.push('/');
        }

        url.push_str(to_name);
        if let Some(fragment) = to_fragment {
            url.push('#');
            url.push_str(fragment);
        }

        if url.is_empty() {
            url.push_str("./");
        }

        url
    }
}

/// The last segment of `path`, without a trailing `/`.
fn default_cn(path: &str) -> &str {
    let path = path.strip_suffix('/').unwrap_or(path);
    path.rsplit('/').next().unwrap_or(path)
}

// Only stores visits that can yield further children, bounding `stack`.
pub struct Bfs<'a> {
    tree: &'a Tree,
    root: Option<NodeId>,
    stack: VecDeque<NodeId>,
    progress: usize,
}

impl Iterator for Bfs<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(root) = self.root.take() {
                self.stack.push_front(root);
                return Some(root);
            }

            let &parent = self.stack.front()?;
            let children = &self.tree[parent].children;
            if self.progress < children.len() {
                let node = children[self.progress];
                if !self.tree[node].children.is_empty() {
                    self.stack.push_back(node);
                }

                self.progress += 1;
                return Some(node)
            } else {
                self.stack.pop_front();
                self.progress = 0;
            }
        }
    }
}

impl<'a> Bfs<'a> {
    #[inline]
    pub fn nodes(self) -> impl Iterator<Item = &'a Node> {
        let tree = self.tree;
        self.map(move |id| &tree[id])
    }
}

pub struct Dfs<'a> {
    tree: &'a Tree,
    stack: VecDeque<NodeId>,
}

impl Iterator for Dfs<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop_front()?;
        for &child in self.tree[node].children.iter().rev() {
            self.stack.push_front(child);
        }

        Some(node)
    }
}

impl<'a> Dfs<'a> {
    #[inline]
    pub fn nodes(self) -> impl Iterator<Item = &'a Node> {
        let tree = self.tree;
        self.map(move |id| &tree[id])
    }
}

impl std::ops::Index<NodeId> for Tree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Self::Output {
        match self.get(id) {
            Some(node) => node,
            None => panic!("node {id:?} is not in the tree"),
        }
    }
}

impl std::ops::IndexMut<NodeId> for Tree {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        match self.nodes.get_mut(id.0).and_then(|n| n.as_mut()) {
            Some(node) => node,
            None => panic!("node {id:?} is not in the tree"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::node::Observer;

    fn file(path: &str) -> Behavior {
        Behavior::page(format!("content of {path}"))
    }

    /// `/`, `/dir/`, `/dir/file.html.en`, `/file.html.en`, `/file.html.en#nested`.
    fn sample() -> (Tree, [NodeId; 5]) {
        let mut tree = Tree::new();
        let root = tree.create_node(None, "/", None, Behavior::Directory).unwrap();
        let dir = tree.create_node(Some(root), "dir/", None, Behavior::Directory).unwrap();
        let dir_file = tree.create_node(Some(dir), SitePath::new("file.html").with_lang("en"),
            None, file("dir")).unwrap();
        let file_ = tree.create_node(Some(root), SitePath::new("file.html").with_lang("en"),
            None, file("root")).unwrap();
        let frag = tree.create_node(Some(file_), "#nested", None, Behavior::Asset { source: None }).unwrap();
        (tree, [root, dir, dir_file, file_, frag])
    }

    #[test]
    fn identities() {
        let (tree, [root, dir, dir_file, file_, frag]) = sample();
        assert_eq!(tree.root(), Some(root));
        assert_eq!(tree[root].alcn(), "");
        assert_eq!(tree[root].cn(), "");
        assert_eq!(tree[root].absolute_path(), "/");
        assert_eq!(tree[dir].alcn(), "/dir");
        assert_eq!(tree[dir].absolute_path(), "/dir/");
        assert_eq!(tree[dir_file].alcn(), "/dir/file.html.en");
        assert_eq!(tree[dir_file].lcn(), "file.html.en");
        assert_eq!(tree[dir_file].lang(), Some("en"));
        assert!(!tree[dir_file].meta().contains_key("lang"));
        assert_eq!(tree[file_].absolute_path(), "/file.html");
        assert_eq!(tree[frag].alcn(), "/file.html.en#nested");
        assert_eq!(tree[frag].absolute_path(), "/file.html#nested");
        assert_eq!(tree.get_by_alcn("/dir").map(|n| n.id()), Some(dir));
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn nested_fragments_flatten() {
        let (mut tree, [_, _, _, file_, frag]) = sample();
        let inner = tree.create_node(Some(frag), "#inner", None, Behavior::Asset { source: None }).unwrap();
        assert_eq!(tree[inner].alcn(), "/file.html.en#inner");
        assert_eq!(tree[inner].absolute_path(), "/file.html#inner");
        assert_eq!(tree[inner].parent(), Some(frag));
        assert_eq!(tree.ancestors(inner).collect::<Vec<_>>()[..2], [frag, file_]);
    }

    #[test]
    fn duplicate_and_invalid_names() {
        let (mut tree, [root, dir, ..]) = sample();
        let error = tree.create_node(Some(root), "dir/", None, Behavior::Directory).unwrap_err();
        assert!(matches!(error.failure(), Some(Failure::DuplicateIdentity { alcn }) if &**alcn == "/dir"));

        let error = tree.create_node(None, "/other/", None, Behavior::Directory).unwrap_err();
        assert!(matches!(error.failure(), Some(Failure::DuplicateIdentity { alcn }) if alcn.is_empty()));

        let error = tree.create_node(Some(dir), "b.html", Some("a/b.html"), file("x")).unwrap_err();
        assert!(matches!(error.failure(), Some(Failure::InvalidCanonicalName { .. })));
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn compound_paths_name_their_last_segment() {
        let (mut tree, [root, dir, ..]) = sample();
        let page = tree.create_node(Some(root), "dir/page.html", None, file("page")).unwrap();
        assert_eq!(tree[page].cn(), "page.html");
        assert_eq!(tree[page].alcn(), "/page.html");
        assert_eq!(tree[page].absolute_path(), "/dir/page.html");

        let frag = tree.create_node(Some(dir), "sub/other.html#top", None, file("top")).unwrap();
        assert_eq!(tree[frag].cn(), "other.html#top");
        assert_eq!(tree[frag].absolute_path(), "/dir/sub/other.html#top");

        let link = tree.create_node(Some(root), "http://example.com/news/", None, Behavior::Asset { source: None }).unwrap();
        assert_eq!(tree[link].cn(), "news");
    }

    #[test]
    fn absolute_urls_are_kept() {
        let (mut tree, [root, ..]) = sample();
        let link = tree.create_node(Some(root), "http://example.com/", Some("example"), Behavior::Asset { source: None }).unwrap();
        assert_eq!(tree[link].absolute_path(), "http://example.com/");
        assert_eq!(tree[link].alcn(), "/example");
    }

    #[test]
    fn deletion() {
        #[derive(Default)]
        struct Recorder(Mutex<Vec<String>>);

        impl Observer for Recorder {
            fn before_node_deleted(&self, tree: &Tree, node: &Node) {
                assert!(tree.get(node.id()).is_some());
                self.0.lock().unwrap().push(node.alcn().to_string());
            }
        }

        let recorder = Arc::new(Recorder::default());
        let mut blackboard = Blackboard::new();
        blackboard.add_shared(recorder.clone());

        let (mut tree, [root, dir, dir_file, file_, frag]) = sample();
        assert!(!tree.delete_node(&blackboard, "/nothing", false));
        assert!(!tree.delete_node(&blackboard, dir, false));
        assert!(!tree.delete_node(&blackboard, root, false));
        assert!(tree.get(dir).is_some());

        assert!(tree.delete_node(&blackboard, file_, false));
        assert!(tree.get(file_).is_none() && tree.get(frag).is_none());
        assert!(tree.get_by_alcn("/file.html.en#nested").is_none());
        assert_eq!(tree[root].children(), &[dir]);

        assert!(tree.delete_node(&blackboard, "/dir", true));
        assert!(tree.get(dir_file).is_none());
        assert_eq!(tree.len(), 1);
        assert!(!tree.delete_node(&blackboard, dir, true));

        let deleted = recorder.0.lock().unwrap().clone();
        assert_eq!(deleted, ["/file.html.en#nested", "/file.html.en", "/dir/file.html.en", "/dir"]);

        assert!(tree.delete_node(&blackboard, root, true));
        assert_eq!(tree.root(), None);
        assert!(tree.is_empty());
    }

    #[test]
    fn traversal_order() {
        let (tree, [root, dir, dir_file, file_, frag]) = sample();
        assert_eq!(tree.iter_breadth_first(root).collect::<Vec<_>>(), [root, dir, file_, dir_file, frag]);
        assert_eq!(tree.iter_depth_first(root).collect::<Vec<_>>(), [root, dir, dir_file, file_, frag]);
        assert_eq!(tree.iter_depth_first(dir).nodes().count(), 2);
        assert_eq!(tree.iter().count(), 5);
    }

    #[test]
    fn resolution() {
        let (mut tree, [root, dir, dir_file, file_, frag]) = sample();
        let plain = tree.create_node(Some(dir), "plain.html", None, file("plain")).unwrap();

        assert_eq!(tree.resolve(root, "/dir/file.html", Some("en")), Some(dir_file));
        assert_eq!(tree.resolve(root, "/dir/file.html", Some("de")), None);
        assert_eq!(tree.resolve(root, "/dir/file.html.en", None), Some(dir_file));
        assert_eq!(tree.resolve(dir_file, "plain.html", Some("en")), Some(plain));
        assert_eq!(tree.resolve(dir_file, "../file.html#nested", Some("en")), Some(frag));
        assert_eq!(tree.resolve(dir_file, "./../dir/", None), Some(dir));
        assert_eq!(tree.resolve(frag, "#nested", None), Some(frag));
        assert_eq!(tree.resolve(file_, "/", None), Some(root));
        assert_eq!(tree.resolve(file_, "http://example.com", None), None);
    }

    #[test]
    fn routes() {
        let (mut tree, [root, dir, dir_file, file_, frag]) = sample();
        let sub = tree.create_node(Some(dir), "sub/", None, Behavior::Directory).unwrap();
        let deep = tree.create_node(Some(sub), "deep.html", None, file("deep")).unwrap();

        assert_eq!(tree.route(file_, dir_file), "dir/file.html");
        assert_eq!(tree.route(dir_file, file_), "../file.html");
        assert_eq!(tree.route(dir_file, frag), "../file.html#nested");
        assert_eq!(tree.route(file_, frag), "#nested");
        assert_eq!(tree.route(deep, dir_file), "../file.html");
        assert_eq!(tree.route(dir_file, deep), "sub/deep.html");
        assert_eq!(tree.route(file_, dir), "dir/");
        assert_eq!(tree.route(dir_file, root), "../");
        assert_eq!(tree.route(dir, dir), "./");
    }

    #[test]
    fn lazily_parsed_blocks() {
        let mut tree = Tree::new();
        let root = tree.create_node(None, "/", None, Behavior::Directory).unwrap();
        let page = tree.create_node(Some(root), "a.html", None,
            Behavior::page("+++\ntitle = 'A'\n+++\nbody\n--- name:side\nside")).unwrap();

        let blocks = tree.blocks(page).unwrap();
        assert_eq!(&*blocks.get("content").unwrap().content, "body");
        assert!(blocks.contains("side"));
        assert!(std::ptr::eq(blocks, tree.blocks(page).unwrap()));

        let error = tree.blocks(root).unwrap_err();
        assert!(matches!(error.failure(), Some(Failure::UnsupportedOperation { operation: "blocks", .. })));
    }

    #[test]
    fn changed_is_monotonic() {
        let mut tree = Tree::new();
        let root = tree.restore_node(None, "/", None, Behavior::Directory).unwrap();
        let fresh = tree.create_node(Some(root), "new.html", None, file("new")).unwrap();
        assert!(!tree[root].is_created());
        assert!(tree[fresh].is_created());

        let mut quiet = Blackboard::new();
        quiet.add_observer(|_: &Tree, _: &Node| Some(false));
        assert!(tree.changed(fresh, &quiet));
        assert!(!tree.changed(root, &quiet));

        let mut loud = Blackboard::new();
        loud.add_observer(|_: &Tree, _: &Node| Some(false));
        loud.add_observer(|_: &Tree, _: &Node| Some(true));
        assert!(tree.changed(root, &loud));
        assert!(tree.changed(root, &quiet));
        assert!(tree.changed(root, &Blackboard::new()));
    }
}
