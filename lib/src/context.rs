use std::sync::Arc;

use crate::error::RenderError;
use crate::node::{Node, NodeId};
use crate::processor::Processors;
use crate::tree::Tree;
use crate::value::Dict;

/// The state a content processor transforms.
///
/// `chain` starts with the node whose content is being rendered, followed by
/// the templates enclosing it.
#[derive(Debug, Clone)]
pub struct Context<'a> {
    pub tree: &'a Tree,
    pub processors: &'a Processors,
    pub content: String,
    pub chain: Vec<NodeId>,
    /// The node the output is written to, if it isn't the chain's head.
    pub dest: Option<NodeId>,
    /// The block `content` came from, if any.
    pub block: Option<Arc<str>>,
    /// Free-form values processors can read and set.
    pub bindings: Dict,
    /// The `(node, block)` pairs being rendered, outermost first.
    pub(crate) stack: Vec<(NodeId, Arc<str>)>,
}

impl<'a> Context<'a> {
    pub fn new(tree: &'a Tree, processors: &'a Processors, chain: Vec<NodeId>) -> Self {
        Context {
            tree,
            processors,
            content: String::new(),
            chain,
            dest: None,
            block: None,
            bindings: Dict::new(),
            stack: vec![],
        }
    }

    pub fn with_content<S: Into<String>>(mut self, content: S) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_dest(mut self, dest: NodeId) -> Self {
        self.dest = Some(dest);
        self
    }

    /// The head of the chain: the node whose content is being rendered.
    pub fn ref_node(&self) -> Option<NodeId> {
        self.chain.first().copied()
    }

    /// The explicit destination, else the head of the chain.
    pub fn dest_node(&self) -> Option<NodeId> {
        self.dest.or_else(|| self.ref_node())
    }

    pub fn node(&self, id: Option<NodeId>) -> Option<&'a Node> {
        self.tree.get(id?)
    }

    /// A context for rendering `content` with `chain`. The tree, registry,
    /// bindings and resolution stack carry over.
    pub fn sub_context<S: Into<String>>(&self, chain: Vec<NodeId>, content: S) -> Context<'a> {
        Context {
            tree: self.tree,
            processors: self.processors,
            content: content.into(),
            chain,
            dest: self.dest,
            block: None,
            bindings: self.bindings.clone(),
            stack: self.stack.clone(),
        }
    }

    /// A render error naming this context's destination and reference nodes.
    pub fn render_error<M: Into<String>>(&self, message: M) -> RenderError {
        let alcn = |id| self.node(id).map(|n| n.alcn_arc());
        RenderError::new(message).nodes(alcn(self.dest_node()), alcn(self.ref_node()))
    }

    /// Whether `block` of `node` is already being rendered.
    pub(crate) fn is_rendering(&self, node: NodeId, block: &str) -> bool {
        self.stack.iter().any(|(n, b)| *n == node && &**b == block)
    }
}
