use pulldown_cmark::{html, Options, Parser};

use crate::context::Context;
use crate::error::Result;
use crate::processor::Processor;

/// Renders CommonMark, with tables, footnotes, strikethrough, task lists and
/// heading attributes, as HTML.
#[derive(Debug, Clone)]
pub struct Markdown {
    options: Options,
}

impl Markdown {
    pub fn with_options(options: Options) -> Self {
        Markdown { options }
    }
}

impl Default for Markdown {
    fn default() -> Self {
        Markdown::with_options(Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_HEADING_ATTRIBUTES)
    }
}

impl Processor for Markdown {
    fn process(&self, context: &mut Context<'_>) -> Result<()> {
        let parser = Parser::new_ext(&context.content, self.options);
        let mut output = String::with_capacity(context.content.len() * 3 / 2);
        html::push_html(&mut output, parser);
        context.content = output;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::processor::Processors;
    use crate::tree::Tree;

    fn render(markdown: &str) -> String {
        let tree = Tree::new();
        let processors = Processors::new();
        let mut context = Context::new(&tree, &processors, vec![]).with_content(markdown);
        Markdown::default().process(&mut context).unwrap();
        context.content
    }

    #[test]
    fn renders_html() {
        assert_eq!(render("# Hello {#top}\n\n*hi* ~~no~~"),
            "<h1 id=\"top\">Hello</h1>\n<p><em>hi</em> <del>no</del></p>\n");

        let table = render("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(table.contains("<table>"));
        assert!(table.contains("<td>2</td>"));

        let tasks = render("- [x] done\n");
        assert!(tasks.contains("checkbox"));
    }

    #[test]
    fn leaves_html_alone() {
        assert_eq!(render("<div class=\"x\">kept</div>\n"), "<div class=\"x\">kept</div>\n");
    }
}
