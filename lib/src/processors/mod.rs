//! The stock content processors.

mod blocks;
mod markdown;
mod template;
mod tidy;
#[cfg(feature = "sass")]
mod sass;

pub use blocks::Blocks;
pub use markdown::Markdown;
pub use template::Template;
pub use tidy::Tidy;
#[cfg(feature = "sass")]
pub use sass::Sass;

use crate::processor::Processors;

impl Processors {
    /// A registry with every stock processor under its usual name: `blocks`,
    /// `markdown`, `template`, `tidy` and, with the `sass` feature, `sass`.
    pub fn with_defaults() -> Self {
        let mut processors = Processors::new();
        processors
            .register("blocks", Blocks)
            .register("markdown", Markdown::default())
            .register("template", Template::new())
            .register("tidy", Tidy::default());

        #[cfg(feature = "sass")]
        processors.register("sass", Sass::default());

        processors
    }
}
