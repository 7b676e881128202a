use crate::context::Context;
use crate::error::Result;
use crate::processor::Processor;
use crate::value::{Grass, Mapper};

/// Compiles SCSS content to CSS.
#[derive(Debug, Default)]
pub struct Sass {
    grass: Grass,
}

impl Sass {
    pub fn new(grass: Grass) -> Self {
        Sass { grass }
    }
}

impl Processor for Sass {
    fn process(&self, context: &mut Context<'_>) -> Result<()> {
        match self.grass.map(context.content.as_str()) {
            Ok(css) => context.content = css,
            Err(e) => {
                let error = context.render_error("failed to compile sass")
                    .processor("sass")
                    .caused_by(e);

                return Err(error.into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Failure;
    use crate::processor::Processors;
    use crate::tree::Tree;

    #[test]
    fn compiles_and_reports() {
        let tree = Tree::new();
        let processors = Processors::new();
        let mut context = Context::new(&tree, &processors, vec![])
            .with_content("$w: 2px;\n.a { .b { width: $w * 2; } }");

        Sass::default().process(&mut context).unwrap();
        assert!(context.content.contains(".a .b"));
        assert!(context.content.contains("width: 4px"));

        let mut context = context.with_content(".a { width: ");
        let error = Sass::default().process(&mut context).unwrap_err();
        assert!(matches!(error.failure(), Some(Failure::Render(e)) if e.processor.as_deref() == Some("sass")));
    }

    #[test]
    fn shared_between_threads() {
        fn shared<T: Send + Sync>(_: &T) {}

        let sass = Sass::new(Grass::new(grass::OutputStyle::Compressed).load_path("styles"));
        shared(&sass);

        let tree = Tree::new();
        let processors = Processors::new();
        let css = std::thread::scope(|s| {
            s.spawn(|| {
                let mut context = Context::new(&tree, &processors, vec![]).with_content(".a { .b { c: d; } }");
                sass.process(&mut context).unwrap();
                context.content
            }).join().unwrap()
        });

        assert_eq!(css.trim_end(), ".a .b{c:d}");
    }
}
