#![doc = svgbobdoc::transform!(
//! A node tree and block rendering engine for static site generators.
//!
//! # Overview
//!
//! Kestrel turns authored sources into a tree of output artifacts and renders
//! their content. It does not read or write files itself: a driver populates
//! a [`Tree`] and writes what the block renderer returns.
//!
//! ```svgbob
//!        +------+
//!        | Tree |
//!        +--+---+
//!           |
//!    +------+-------------------------------+
//!    |  "/" (directory)                      |
//!    |   |                                   |
//!    |   +-- "/index.html.en" (page)         |
//!    |   |      +-- "/index.html.en#intro"   |
//!    |   +-- "/img/" (directory)             |
//!    |          +-- "/img/logo.png" (asset)  |
//!    +---------------------------------------+
//! ```
//!
//! Every [`Node`] is addressed by its _absolute localized canonical name_
//! (ALCN): the canonical names of its ancestors joined by `/`, with the
//! node's language appended to its own name. Fragments of a page hang
//! off the page itself, so `#intro` nested in `#top` is still
//! `/index.html.en#intro`.
//!
//! ## Rendering
//!
//! A page's source is split into named [blocks](page). Rendering a block
//! takes a _chain_ of nodes, typically the templates enclosing the page
//! followed by the page:
//!
//! 1. The first chain entry that defines the block provides its content.
//! 2. The content runs through the block's pipeline of named
//!    [processors](processor::Processors).
//! 3. The `blocks` processor replaces `<webgen:block name="..."/>`
//!    directives with the blocks they name, resolved against the rest of
//!    the chain. This is how a template includes the page it wraps.
//!
//! Failures carry the nodes involved and the source line they happened on;
//! see [`error::Failure`].
)]

#[macro_use]
pub mod error;
pub mod util;
pub mod value;
pub mod path;
pub mod node;
pub mod tree;
pub mod page;
pub mod context;
pub mod processor;
pub mod block;
pub mod processors;

pub use path::SitePath;
pub use node::{Behavior, Blackboard, Node, NodeId, Observer};
pub use tree::Tree;
pub use context::Context;
pub use processor::{Processor, Processors};
pub use block::{render_block, BlockOptions, NodeSelector, NotFound};

pub use rayon;
