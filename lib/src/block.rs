//! Block rendering: resolving a named block against a chain of nodes and
//! substituting inline block directives.
//!
//! A directive has the form
//!
//! ```text
//! <webgen:block name="content" chain="a.html;b.html" node="first" notfound="raise"/>
//! ```
//!
//! where only `name` is required.

use std::str::FromStr;
use std::sync::Arc;

use memchr::memmem;

use crate::context::Context;
use crate::error::{Error, Failure, Result};
use crate::node::{Behavior, NodeId};
use crate::page;
use crate::util::line_at;

const DIRECTIVE_START: &str = "<webgen:block";
const DIRECTIVE_END: &str = "/>";

/// What to do when no node in the chain defines the requested block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NotFound {
    #[default]
    Raise,
    /// Render the block as empty content.
    Ignore,
}

/// Which chain entry a block is taken from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NodeSelector {
    /// The first chain entry that defines the block. Also written `next`.
    #[default]
    First,
    /// The head of the rendering context's own chain.
    Current,
    /// The chain entry with this ALCN or canonical name.
    Named(Arc<str>),
}

#[derive(Debug, Clone, Default)]
pub struct BlockOptions {
    pub not_found: NotFound,
    pub node: NodeSelector,
    /// Overrides the block's own pipeline.
    pub pipeline: Option<Vec<Arc<str>>>,
}

impl FromStr for NotFound {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "raise" => Ok(NotFound::Raise),
            "ignore" => Ok(NotFound::Ignore),
            _ => err!("invalid not-found policy", "policy" => s, "expected" => "raise, ignore"),
        }
    }
}

impl From<&str> for NodeSelector {
    fn from(value: &str) -> Self {
        match value {
            "first" | "next" => NodeSelector::First,
            "current" => NodeSelector::Current,
            alias => NodeSelector::Named(alias.into()),
        }
    }
}

/// The pipeline block `name` of `node` is rendered with: the explicit
/// pipeline, else the block header's, else the node's
/// `blocks.<name>.pipeline` meta info, else `blocks.default.pipeline`.
fn pipeline_for(
    context: &Context<'_>,
    node: NodeId,
    block: &page::Block,
    options: &BlockOptions,
) -> Vec<Arc<str>> {
    if let Some(pipeline) = options.pipeline.as_ref().or(block.pipeline.as_ref()) {
        return pipeline.clone();
    }

    let meta = context.tree[node].meta();
    [&*block.name, "default"].iter()
        .filter_map(|name| meta.get_path(&format!("blocks.{name}.pipeline")))
        .find_map(|value| page::pipeline_from_value(&value))
        .unwrap_or_default()
}

/// Selects the node that provides block `name`, along with the chain to
/// render it with.
fn select(
    context: &Context<'_>,
    chain: &[NodeId],
    name: &str,
    selector: &NodeSelector,
) -> Result<Option<(NodeId, Vec<NodeId>)>> {
    let tree = context.tree;
    let defines = |id: NodeId| -> Result<bool> {
        match tree[id].behavior() {
            Behavior::Page { .. } => Ok(tree.blocks(id)?.contains(name)),
            _ => Ok(false),
        }
    };

    let (i, chain) = match selector {
        NodeSelector::Current => match context.chain.first() {
            Some(_) => (0, &*context.chain),
            None => return Ok(None),
        },
        NodeSelector::First => {
            let mut found = None;
            for (i, &id) in chain.iter().enumerate() {
                if defines(id)? {
                    found = Some(i);
                    break;
                }
            }

            match found {
                Some(i) => (i, chain),
                None => return Ok(None),
            }
        }
        NodeSelector::Named(alias) => {
            let i = chain.iter().position(|&id| {
                let node = &tree[id];
                node.alcn() == &**alias || node.cn() == &**alias
            });

            match i {
                Some(i) => (i, chain),
                None => return Ok(None),
            }
        }
    };

    match defines(chain[i])? {
        true => Ok(Some((chain[i], chain[i..].to_vec()))),
        false => Ok(None),
    }
}

/// Renders block `name` found in `chain` and returns its content.
///
/// The block's node is picked by `options.node`. Its content is run through
/// the block's pipeline in a sub-context whose chain starts at that node.
/// The output destination is the context's explicit destination, else the
/// head of `chain`.
pub fn render_block(
    context: &Context<'_>,
    chain: &[NodeId],
    name: &str,
    options: &BlockOptions,
) -> Result<String> {
    let Some((node, sub_chain)) = select(context, chain, name, &options.node)? else {
        return match options.not_found {
            NotFound::Ignore => Ok(String::new()),
            NotFound::Raise => {
                let chain: Vec<_> = chain.iter().map(|&id| context.tree[id].alcn()).collect();
                let message = format!("block '{name}' not found in chain [{}]", chain.join(", "));
                Err(context.render_error(message).into())
            }
        };
    };

    if context.is_rendering(node, name) {
        return Err(Failure::CyclicBlockReference {
            alcn: context.tree[node].alcn_arc(),
            block: name.into(),
        }.into());
    }

    let blocks = context.tree.blocks(node)?;
    let Some(block) = blocks.get(name) else {
        return Err(context.render_error(format!("block '{name}' vanished")).into());
    };

    let pipeline = pipeline_for(context, node, block, options);
    tracing::debug!(node = context.tree[node].alcn(), block = name, ?pipeline, "rendering block");

    let mut sub = context.sub_context(sub_chain, &*block.content);
    sub.dest = context.dest.or_else(|| chain.first().copied());
    sub.block = Some(block.name.clone());
    sub.stack.push((node, block.name.clone()));
    context.processors.run(&pipeline[..], &mut sub)?;
    Ok(sub.content)
}

/// One `<webgen:block .../>` occurrence.
#[derive(Debug)]
struct Directive<'a> {
    start: usize,
    end: usize,
    attributes: Vec<(&'a str, &'a str)>,
}

impl<'a> Directive<'a> {
    fn attribute(&self, key: &str) -> Option<&'a str> {
        self.attributes.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }
}

/// Parses `key="value"` and `key='value'` pairs.
fn parse_attributes(input: &str) -> Result<Vec<(&str, &str)>> {
    let mut attributes = vec![];
    let mut rest = input.trim_start();
    while !rest.is_empty() {
        let Some((key, after)) = rest.split_once('=') else {
            return err!("malformed block directive attribute", "attribute" => rest);
        };

        let after = after.trim_start();
        let quote = match after.chars().next() {
            Some(q @ ('"' | '\'')) => q,
            _ => return err!("block directive attribute value must be quoted", "attribute" => key.trim()),
        };

        let Some(len) = after[1..].find(quote) else {
            return err!("unterminated block directive attribute", "attribute" => key.trim());
        };

        attributes.push((key.trim(), &after[1..1 + len]));
        rest = after[len + 2..].trim_start();
    }

    Ok(attributes)
}

/// Finds the next directive in `content` at or after byte `from`.
fn next_directive(content: &str, from: usize) -> Option<Result<Directive<'_>, usize>> {
    let finder = memmem::Finder::new(DIRECTIVE_START);
    let mut pos = from;
    loop {
        let start = pos + finder.find(&content.as_bytes()[pos..])?;
        let inner_start = start + DIRECTIVE_START.len();
        let boundary = content[inner_start..].chars().next();
        if !matches!(boundary, Some(c) if c.is_whitespace() || c == '/') {
            pos = inner_start;
            continue;
        }

        let Some(len) = memmem::find(&content.as_bytes()[inner_start..], DIRECTIVE_END.as_bytes()) else {
            return Some(Err(start));
        };

        let end = inner_start + len + DIRECTIVE_END.len();
        return Some(match parse_attributes(&content[inner_start..inner_start + len]) {
            Ok(attributes) => Ok(Directive { start, end, attributes }),
            Err(_) => Err(start),
        });
    }
}

fn render_directive(context: &Context<'_>, directive: &Directive<'_>) -> Result<String> {
    let Some(name) = directive.attribute("name") else {
        return Err(context.render_error("block directive without a name").into());
    };

    let options = BlockOptions {
        not_found: directive.attribute("notfound").map(str::parse::<NotFound>).transpose()?.unwrap_or_default(),
        node: directive.attribute("node").map(NodeSelector::from).unwrap_or_default(),
        pipeline: None,
    };

    let chain = match directive.attribute("chain") {
        Some(chain) => {
            let from = context.ref_node()
                .ok_or_else(|| context.render_error("block chain needs a reference node"))?;

            let lang = context.node(context.dest_node()).and_then(|n| n.lang());
            let mut nodes = vec![];
            for path in chain.split(';').map(str::trim).filter(|s| !s.is_empty()) {
                match (context.tree.resolve(from, path, lang), options.not_found) {
                    (Some(node), _) => nodes.push(node),
                    (None, NotFound::Ignore) => return Ok(String::new()),
                    (None, NotFound::Raise) => {
                        let message = format!("could not resolve block chain entry '{path}'");
                        return Err(context.render_error(message).into());
                    }
                }
            }

            nodes
        }
        None if context.chain.len() > 1 => context.chain[1..].to_vec(),
        None => context.chain.clone(),
    };

    render_block(context, &chain, name, &options)
}

/// Attributes `error` to `line`: a render error that already has a line
/// keeps it, one without gets `line`, and any other error is wrapped in a
/// render error at `line`.
fn at_line(context: &Context<'_>, mut error: Error, line: usize) -> Error {
    if let Some(render_error) = error.render_error_mut() {
        render_error.line = render_error.line.or(Some(line));
        return error;
    }

    context.render_error("failed to render block directive")
        .line(Some(line))
        .caused_by(error)
        .into()
}

/// Replaces every block directive in the context's content with the block
/// it names, in text order.
pub fn replace_directives(context: &mut Context<'_>) -> Result<()> {
    let content = &context.content;
    let mut output = String::with_capacity(content.len());
    let mut last = 0;
    while let Some(directive) = next_directive(content, last) {
        let directive = match directive {
            Ok(directive) => directive,
            Err(start) => {
                let error = context.render_error("malformed block directive")
                    .line(Some(line_at(content, start)));

                return Err(error.into());
            }
        };

        let rendered = render_directive(context, &directive)
            .map_err(|e| at_line(context, e, line_at(content, directive.start)))?;

        output.push_str(&content[last..directive.start]);
        output.push_str(&rendered);
        last = directive.end;
    }

    if last == 0 {
        return Ok(());
    }

    output.push_str(&content[last..]);
    context.content = output;
    Ok(())
}
