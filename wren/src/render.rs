use std::path::Path;

use kestrel::rayon::prelude::*;
use kestrel::error::{Chainable, Result};
use kestrel::value::{Sink, Source, Template, Value, NoOutput};
use kestrel::util::is_absolute_url;
use kestrel::{error, page, render_block, Behavior, Blackboard, BlockOptions, Context, NodeId, Tree};

use crate::discover::Wren;
use crate::util::{output_path, ValueExt};

/// What a render pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub pages: usize,
    pub assets: usize,
    /// Nodes whose output was up to date.
    pub skipped: usize,
}

enum Outcome {
    Page,
    Asset,
    Skipped,
    Other,
}

impl Wren {
    /// The templates `id` is rendered into, outermost first.
    ///
    /// A node's template is named by its `template` meta info, resolved
    /// relative to the node; `false` or `null` means it has none. Without
    /// the meta info, the configured default template is looked up from
    /// the node's directory upwards.
    pub fn template_chain(&self, tree: &Tree, id: NodeId) -> Result<Vec<NodeId>> {
        let mut chain = vec![];
        let mut current = id;
        while let Some(template) = self.template_of(tree, current)? {
            if template == id || chain.contains(&template) {
                tracing::warn!(node = %tree[id].alcn(), template = %tree[template].alcn(), "template cycle");
                break;
            }

            chain.push(template);
            current = template;
        }

        chain.reverse();
        Ok(chain)
    }

    fn template_of(&self, tree: &Tree, id: NodeId) -> Result<Option<NodeId>> {
        let node = &tree[id];
        match node.meta().get(Template) {
            Some(Ok(path)) => match tree.resolve(id, &path, node.lang()) {
                Some(template) => Ok(Some(template)),
                None => kestrel::err! {
                    "template not found",
                    "node" => node.alcn(),
                    "template" => path,
                },
            },
            Some(Err(Value::Bool(false) | Value::Null)) => Ok(None),
            Some(Err(v)) => Err(v.type_err(Template, node.alcn())),
            None => {
                let name = &*self.settings.template;
                let template = std::iter::once(id)
                    .chain(tree.ancestors(id))
                    .filter(|&dir| tree[dir].is_directory())
                    .find_map(|dir| tree.resolve(dir, name, node.lang()).filter(|&t| t != id));

                Ok(template)
            }
        }
    }

    /// Writes every node that changed since the last build to the output
    /// directory, in parallel.
    pub fn render(&self, tree: &Tree, blackboard: &Blackboard) -> Result<Stats> {
        std::fs::create_dir_all(&self.output).chain_with(|| error! {
            "failed to create output directory",
            "path" => self.output.display(),
        })?;

        let ids: Vec<NodeId> = tree.iter().map(|node| node.id()).collect();
        let outcomes = ids.par_iter()
            .map(|&id| self.render_node(tree, blackboard, id))
            .collect::<Result<Vec<_>>>()?;

        let mut stats = Stats::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Page => stats.pages += 1,
                Outcome::Asset => stats.assets += 1,
                Outcome::Skipped => stats.skipped += 1,
                Outcome::Other => {}
            }
        }

        Ok(stats)
    }

    fn render_node(&self, tree: &Tree, blackboard: &Blackboard, id: NodeId) -> Result<Outcome> {
        let node = &tree[id];
        if node.is_fragment() || is_absolute_url(node.path()) {
            return Ok(Outcome::Other);
        }

        let output = output_path(&self.output, node);
        if node.is_directory() {
            std::fs::create_dir_all(&output)?;
            return Ok(Outcome::Other);
        }

        if let Behavior::Asset { source } = node.behavior() {
            let Some(source) = source else {
                return Ok(Outcome::Other);
            };

            if !tree.changed(id, blackboard) && output.exists() {
                return Ok(Outcome::Skipped);
            }

            create_parent(&output)?;
            (&**source).read_to(&*output).chain_with(|| error! {
                "failed to copy asset",
                "source path" => source.display(),
                "destination path" => output.display(),
            })?;

            return Ok(Outcome::Asset);
        }

        if matches!(node.meta().get(NoOutput), Some(Ok(true))) {
            return Ok(Outcome::Other);
        }

        let mut chain = self.template_chain(tree, id)?;
        let changed = tree.changed(id, blackboard)
            || chain.iter().any(|&t| tree.changed(t, blackboard));

        if !changed && output.exists() {
            return Ok(Outcome::Skipped);
        }

        chain.push(id);
        let context = Context::new(tree, &self.processors, chain.clone()).with_dest(id);
        let content = render_block(&context, &chain, page::CONTENT, &BlockOptions::default())
            .chain_with(|| error! {
                "failed to render page",
                "page" => node.alcn(),
            })?;

        create_parent(&output)?;
        output.write(content)?;
        tracing::debug!(page = %node.alcn(), path = %output.display(), "wrote page");
        Ok(Outcome::Page)
    }
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    fn site(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (path, contents) in files {
            let path = dir.path().join("src").join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }

        dir
    }

    fn chain_of(wren: &Wren, tree: &Tree, alcn: &str) -> Vec<String> {
        let id = tree.lookup(alcn).unwrap();
        wren.template_chain(tree, id).unwrap()
            .into_iter()
            .map(|t| tree[t].alcn().to_string())
            .collect()
    }

    #[test]
    fn template_lookup() {
        let dir = site(&[
            ("default.template", "{{ 1 }}"),
            ("docs/default.template", "+++\ntemplate = 'wide.template'\n+++\n"),
            ("docs/wide.template", "+++\ntemplate = '../default.template'\n+++\n"),
            ("docs/a.page", ""),
            ("docs/raw.page", "+++\ntemplate = false\n+++\n"),
            ("index.page", ""),
        ]);

        let wren = Wren::new(dir.path().join("src"), dir.path().join("out"), false).unwrap();
        let tree = wren.discover(&wren.blackboard()).unwrap();

        assert_eq!(chain_of(&wren, &tree, "/index.html"), ["/default.template"]);
        assert_eq!(chain_of(&wren, &tree, "/default.template"), Vec::<String>::new());
        assert_eq!(chain_of(&wren, &tree, "/docs/raw.html"), Vec::<String>::new());
        assert_eq!(chain_of(&wren, &tree, "/docs/a.html"), [
            "/default.template",
            "/docs/wide.template",
            "/docs/default.template",
        ]);
    }

    #[test]
    fn missing_template_is_an_error() {
        let dir = site(&[("index.page", "+++\ntemplate = 'nope.template'\n+++\n")]);
        let wren = Wren::new(dir.path().join("src"), dir.path().join("out"), false).unwrap();
        let tree = wren.discover(&wren.blackboard()).unwrap();
        let id = tree.lookup("/index.html").unwrap();
        assert!(wren.template_chain(&tree, id).is_err());
    }

    #[test]
    fn renders_into_templates() {
        let dir = site(&[
            ("default.template", "<title>{{ node.meta.title }}</title>\n<webgen:block name=\"content\"/>"),
            ("index.page", "+++\ntitle = 'Home'\n+++\n# Hi\n"),
            ("style/site.scss", "a { b { color: red; } }"),
            ("logo.txt", "logo"),
        ]);

        let wren = Wren::new(dir.path().join("src"), dir.path().join("out"), false).unwrap();
        let blackboard = wren.blackboard();
        let tree = wren.discover(&blackboard).unwrap();
        let stats = wren.render(&tree, &blackboard).unwrap();
        assert_eq!(stats, Stats { pages: 2, assets: 1, skipped: 0 });

        let out = dir.path().join("out");
        let index = fs::read_to_string(out.join("index.html")).unwrap();
        assert_eq!(index, "<title>Home</title>\n<h1>Hi</h1>\n");
        assert_eq!(fs::read_to_string(out.join("logo.txt")).unwrap(), "logo");
        assert!(fs::read_to_string(out.join("style/site.css")).unwrap().contains("a b"));
        assert!(!out.join("default.template").exists());
    }

    #[test]
    fn render_errors_name_the_page() {
        let dir = site(&[("index.page", "--- name:content pipeline:nope\nx")]);
        let wren = Wren::new(dir.path().join("src"), dir.path().join("out"), false).unwrap();
        let blackboard = wren.blackboard();
        let tree = wren.discover(&blackboard).unwrap();
        let error = wren.render(&tree, &blackboard).unwrap_err();
        assert!(error.to_string().contains("/index.html"), "{error}");
    }
}
