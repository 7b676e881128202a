use minijinja::{AutoEscape, Environment};
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::node::{Behavior, Node, NodeId};
use crate::processor::Processor;
use crate::tree::Tree;
use crate::value::{Dict, InMenu, NoOutput, Title};

/// The context variable the site map is passed to templates in.
const SITEMAP: &str = "__sitemap";
const INDEX: &str = "index.html";

/// Evaluates content as a Jinja template.
///
/// The template sees `node` (the last node of the chain, usually the page
/// being wrapped), `ref` (the head of the chain), `dest`, the name of the
/// `block` being rendered and every context binding. Each node exposes its
/// `alcn`, `cn`, `lcn`, `lang`, `path`, `absolute_path`, `meta` and `url`,
/// the route to it from the destination.
///
/// Output is never escaped. `sitemap()` renders the pages of the tree as
/// nested lists linked from the destination, with only the entries marked
/// `in_menu` (and the directories containing them) unless called as
/// `sitemap(false)`.
#[derive(Debug)]
pub struct Template {
    env: Environment<'static>,
}

#[derive(Serialize)]
struct NodeView<'a> {
    alcn: &'a str,
    cn: &'a str,
    lcn: &'a str,
    lang: Option<&'a str>,
    path: &'a str,
    absolute_path: &'a str,
    url: Option<String>,
    meta: Dict,
}

#[derive(Serialize)]
struct TemplateContext<'a> {
    node: Option<NodeView<'a>>,
    #[serde(rename = "ref")]
    reference: Option<NodeView<'a>>,
    dest: Option<NodeView<'a>>,
    block: Option<&'a str>,
    #[serde(rename = "__sitemap", skip_serializing_if = "Option::is_none")]
    sitemap: Option<Vec<MenuEntry>>,
    #[serde(flatten)]
    bindings: &'a Dict,
}

/// A page or directory in the site map.
#[derive(Debug, Serialize, Deserialize)]
struct MenuEntry {
    title: String,
    url: String,
    in_menu: bool,
    children: Vec<MenuEntry>,
}

impl<'a> NodeView<'a> {
    fn new(context: &Context<'a>, id: NodeId) -> Option<Self> {
        let node = context.node(Some(id))?;
        Some(NodeView {
            alcn: node.alcn(),
            cn: node.cn(),
            lcn: node.lcn(),
            lang: node.lang(),
            path: node.path(),
            absolute_path: node.absolute_path(),
            url: context.dest_node().map(|dest| context.tree.route(dest, id)),
            meta: node.meta().to_dict(),
        })
    }
}

impl<'a> TemplateContext<'a> {
    fn new(context: &'a Context<'a>) -> Self {
        let view = |id: Option<NodeId>| NodeView::new(context, id?);
        TemplateContext {
            node: view(context.chain.last().copied()),
            reference: view(context.ref_node()),
            dest: view(context.dest_node()),
            block: context.block.as_deref(),
            // Built only for templates that can call it.
            sitemap: context.content.contains("sitemap")
                .then(|| Some(MenuEntry::children_of(context.tree, context.tree.root()?, context.dest_node()?, true)))
                .flatten(),
            bindings: &context.bindings,
        }
    }
}

impl MenuEntry {
    /// The pages and directories in `dir`, linked from `dest`. Directories
    /// link to their index page, which is only listed on its own at the top.
    fn children_of(tree: &Tree, dir: NodeId, dest: NodeId, top: bool) -> Vec<MenuEntry> {
        let lang = tree[dest].lang();
        tree[dir].children().iter()
            .map(|&id| &tree[id])
            .filter(|node| node.is_directory() || matches!(node.behavior(), Behavior::Page { .. }))
            .filter(|node| !node.is_fragment() && !matches!(node.meta().get(NoOutput), Some(Ok(true))))
            .filter(|node| lang.is_none() || node.lang().map_or(true, |l| Some(l) == lang))
            .filter(|node| top || node.cn() != INDEX)
            .map(|node| {
                let (target, children) = match node.is_directory() {
                    true => (
                        tree.resolve(node.id(), INDEX, lang).map_or(node, |id| &tree[id]),
                        MenuEntry::children_of(tree, node.id(), dest, false),
                    ),
                    false => (node, vec![]),
                };

                let title = [target, node].iter()
                    .find_map(|n: &&Node| n.meta().get(Title)?.ok())
                    .map_or_else(|| node.cn().to_string(), |title| title.to_string());

                MenuEntry {
                    title,
                    url: tree.route(dest, target.id()),
                    in_menu: [target, node].iter().any(|n| matches!(n.meta().get(InMenu), Some(Ok(true)))),
                    children,
                }
            })
            .collect()
    }
}

impl Template {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_function("sitemap", ext::sitemap);
        env.add_filter("slugify", ext::slugify);
        env.add_filter("deslug", ext::deslug);
        env.add_filter("date", ext::date);
        env.add_filter("split", ext::split);
        Template { env }
    }

    /// The environment templates are evaluated in, to register further
    /// filters, functions and globals.
    pub fn environment_mut(&mut self) -> &mut Environment<'static> {
        &mut self.env
    }
}

impl Default for Template {
    fn default() -> Self {
        Template::new()
    }
}

impl Processor for Template {
    fn process(&self, context: &mut Context<'_>) -> Result<()> {
        let name = context.ref_node()
            .map(|id| context.tree[id].alcn())
            .unwrap_or("<template>");

        let values = minijinja::Value::from_serializable(&TemplateContext::new(context));
        match self.env.render_named_str(name, &context.content, values) {
            Ok(output) => {
                context.content = output;
                Ok(())
            }
            Err(e) => {
                let error = context.render_error(format!("failed to evaluate template: {}", e.kind()))
                    .processor("template")
                    .line(e.line())
                    .caused_by(Error::from(e));

                Err(error.into())
            }
        }
    }
}

mod ext {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
    use minijinja::{value::{intern, Value}, Error, ErrorKind, State};
    use pulldown_cmark_escape::escape_html;
    use serde::Deserialize;

    use super::{MenuEntry, SITEMAP};

    pub fn slugify(value: &str) -> String {
        crate::util::slugify(value)
    }

    pub fn deslug(value: &str) -> String {
        value.replace('-', " ")
    }

    pub fn date(value: Value, fmt: &str) -> Result<Value, Error> {
        if let Ok(ts) = i64::try_from(value.clone()) {
            let datetime = DateTime::from_timestamp(ts, 0)
                .ok_or_else(|| Error::new(
                    ErrorKind::InvalidOperation,
                    "invalid timestamp provided to `date`"
                ))?;

            return Ok(datetime.format(fmt).to_string().into());
        }

        let kind = value.kind();
        let string = value.as_str()
            .ok_or_else(|| Error::new(
                ErrorKind::InvalidOperation,
                format!("`date` must be applied to a string or integer, found {kind}")
            ))?;

        let datetime = string.parse::<NaiveDate>().map(|d| d.format(fmt))
            .or_else(|_| string.parse::<NaiveTime>().map(|t| t.format(fmt)))
            .or_else(|_| string.parse::<NaiveDateTime>().map(|dt| dt.format(fmt)))
            .or_else(|_| string.parse::<DateTime<Utc>>().map(|dt| dt.format(fmt)))
            .map_err(|e| Error::new(
                ErrorKind::InvalidOperation,
                format!("failed to parse {string}: {e}")
            ))?;

        Ok(datetime.to_string().into())
    }

    pub fn split(value: &str, pat: &str, n: Option<usize>) -> Result<Value, Error> {
        match n {
            Some(n) => Ok(value.split(pat).nth(n).map(Value::from).unwrap_or(Value::UNDEFINED)),
            None => Ok(value.split(pat).map(intern).collect()),
        }
    }

    pub fn sitemap(state: &State, honor_in_menu: Option<bool>) -> Result<Value, Error> {
        let entries = state.lookup(SITEMAP)
            .ok_or_else(|| Error::new(
                ErrorKind::InvalidOperation,
                "`sitemap` needs a destination node in a tree"
            ))?;

        let entries = Vec::<MenuEntry>::deserialize(entries)?;
        Ok(Value::from_safe_string(list(&entries, honor_in_menu.unwrap_or(true))))
    }

    fn list(entries: &[MenuEntry], honor_in_menu: bool) -> String {
        let mut items = String::new();
        for entry in entries {
            let children = list(&entry.children, honor_in_menu);
            if honor_in_menu && !entry.in_menu && children.is_empty() {
                continue;
            }

            // Writing to a `String` can't fail.
            items.push_str("<li><a href=\"");
            let _ = escape_html(&mut items, &entry.url);
            items.push_str("\">");
            let _ = escape_html(&mut items, &entry.title);
            items.push_str("</a>");
            items.push_str(&children);
            items.push_str("</li>");
        }

        match items.is_empty() {
            true => items,
            false => format!("<ul>{items}</ul>"),
        }
    }
}
