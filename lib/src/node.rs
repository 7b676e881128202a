use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Failure, Result};
use crate::value::Metadata;
use crate::tree::Tree;

/// Index of a node in its [`Tree`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// What a node is, and so which operations it supports.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Content rendered through blocks. The source is parsed into blocks on
    /// first access.
    Page { source: Arc<str> },
    Directory,
    /// Copied verbatim, from `source` if there is one.
    Asset { source: Option<Arc<Path>> },
}

impl Behavior {
    pub fn page<S: Into<Arc<str>>>(source: S) -> Self {
        Behavior::Page { source: source.into() }
    }

    pub fn asset<P: AsRef<Path>>(source: P) -> Self {
        Behavior::Asset { source: Some(source.as_ref().into()) }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Behavior::Page { .. } => "page",
            Behavior::Directory => "directory",
            Behavior::Asset { .. } => "asset",
        }
    }
}

/// One artifact in the output tree: a file, a directory or a fragment of
/// a page.
pub struct Node {
    pub(crate) id: NodeId,
    /// `None` for the root, whose parent is the tree's hidden dummy root.
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) path: Arc<str>,
    pub(crate) cn: Arc<str>,
    pub(crate) lang: Option<Arc<str>>,
    pub(crate) lcn: Arc<str>,
    pub(crate) absolute_path: Arc<str>,
    pub(crate) alcn: Arc<str>,
    pub(crate) meta: Metadata,
    pub(crate) behavior: Behavior,
    pub(crate) dirty: AtomicBool,
    pub(crate) created: bool,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// The path as authored, relative to the parent.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The canonical name: language-free, without a trailing `/`.
    pub fn cn(&self) -> &str {
        &self.cn
    }

    pub fn lang(&self) -> Option<&str> {
        self.lang.as_deref()
    }

    /// The localized canonical name.
    pub fn lcn(&self) -> &str {
        &self.lcn
    }

    pub fn absolute_path(&self) -> &str {
        &self.absolute_path
    }

    /// The absolute localized canonical name, unique within the tree.
    pub fn alcn(&self) -> &str {
        &self.alcn
    }

    pub(crate) fn alcn_arc(&self) -> Arc<str> {
        self.alcn.clone()
    }

    pub fn meta(&self) -> &Metadata {
        &self.meta
    }

    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    pub fn is_directory(&self) -> bool {
        crate::path::is_directory(&self.path)
    }

    pub fn is_fragment(&self) -> bool {
        crate::path::is_fragment(&self.path)
    }

    pub fn is_file(&self) -> bool {
        crate::path::is_file(&self.path)
    }

    /// `true` if the node was built during this run rather than restored.
    pub fn is_created(&self) -> bool {
        self.created
    }

    /// `true` if the node changed since the last run. A node that isn't
    /// already dirty asks the observers in `blackboard`; a positive answer
    /// makes it dirty for the rest of the run.
    pub fn changed(&self, tree: &Tree, blackboard: &Blackboard) -> bool {
        if self.dirty.load(Ordering::Acquire) {
            return true;
        }

        if blackboard.node_changed(tree, self) == Some(true) {
            self.mark_dirty();
        }

        self.dirty.load(Ordering::Acquire)
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// The source text of a page.
    pub fn page_source(&self) -> Result<&Arc<str>> {
        match &self.behavior {
            Behavior::Page { source } => Ok(source),
            _ => Err(self.unsupported("page_source").into()),
        }
    }

    /// The file an asset is copied from.
    pub fn asset_source(&self) -> Result<Option<&Arc<Path>>> {
        match &self.behavior {
            Behavior::Asset { source } => Ok(source.as_ref()),
            _ => Err(self.unsupported("asset_source").into()),
        }
    }

    pub(crate) fn unsupported(&self, operation: &'static str) -> Failure {
        Failure::UnsupportedOperation {
            alcn: self.alcn.clone(),
            behavior: self.behavior.name(),
            operation,
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("alcn", &self.alcn)
            .field("behavior", &self.behavior.name())
            .finish()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.alcn)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Listens to node life-cycle events.
pub trait Observer: Send + Sync {
    /// Called before `node` is unlinked from `tree`.
    fn before_node_deleted(&self, _tree: &Tree, _node: &Node) { }

    /// Whether `node` changed since the last run, if this observer knows.
    fn node_changed(&self, _tree: &Tree, _node: &Node) -> Option<bool> {
        None
    }
}

/// Dispatches node events to every registered [`Observer`].
#[derive(Default, Clone)]
pub struct Blackboard {
    observers: Vec<Arc<dyn Observer>>,
}

impl Blackboard {
    pub fn new() -> Self {
        Blackboard::default()
    }

    pub fn add_observer<O: Observer + 'static>(&mut self, observer: O) -> &mut Self {
        self.observers.push(Arc::new(observer));
        self
    }

    pub fn add_shared(&mut self, observer: Arc<dyn Observer>) -> &mut Self {
        self.observers.push(observer);
        self
    }

    pub fn before_node_deleted(&self, tree: &Tree, node: &Node) {
        for observer in &self.observers {
            observer.before_node_deleted(tree, node);
        }
    }

    /// `Some(true)` if any observer considers `node` changed, `Some(false)` if
    /// at least one answered and none did, `None` otherwise.
    pub fn node_changed(&self, tree: &Tree, node: &Node) -> Option<bool> {
        self.observers.iter()
            .filter_map(|o| o.node_changed(tree, node))
            .reduce(|a, b| a || b)
    }
}

impl fmt::Debug for Blackboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blackboard")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl<F> Observer for F
    where F: Fn(&Tree, &Node) -> Option<bool> + Send + Sync
{
    fn node_changed(&self, tree: &Tree, node: &Node) -> Option<bool> {
        self(tree, node)
    }
}
