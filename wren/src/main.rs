use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use kestrel::error::{Chainable, Result};
use kestrel::value::Sink;

use crate::discover::Wren;

mod config;
mod discover;
mod gallery;
mod render;
mod util;

pub const CONFIG_FILE: &str = "config.toml";
/// Written to the output directory after a successful build. Sources older
/// than it are not rendered again.
pub const STAMP_FILE: &str = ".wren-stamp";

kestrel::define_meta_key! {
    /// The file a node was created from.
    pub SourcePath : "source_path" => Arc<str>,
    /// Drafts are left out of the site.
    pub Draft : "draft" => bool,
}

mod flags {
    use std::path::PathBuf;

    xflags::xflags! {
        /// Renders the site in INPUT to OUTPUT.
        cmd wren {
            /// The site source directory.
            required input: PathBuf
            /// The directory the site is written to.
            required output: PathBuf
            /// Log every node and page.
            optional -v, --verbose
            /// Render everything, even if unchanged since the last build.
            optional -f, --force
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build(flags: &flags::Wren) -> Result<()> {
    let start = Instant::now();
    let wren = Wren::new(&flags.input, &flags.output, flags.force)?;
    let blackboard = wren.blackboard();
    let tree = wren.discover(&blackboard)?;
    tracing::info!(nodes = tree.len(), "discovery time: {}ms", start.elapsed().as_millis());

    let render = Instant::now();
    let stats = wren.render(&tree, &blackboard)?;
    tracing::info!(
        pages = stats.pages,
        assets = stats.assets,
        skipped = stats.skipped,
        "render time: {}ms", render.elapsed().as_millis()
    );

    wren.output.join(STAMP_FILE).write("")
        .chain_with(|| "failed to write build stamp")?;

    tracing::info!("total time: {}ms", start.elapsed().as_millis());
    Ok(())
}

pub fn main() -> ExitCode {
    let flags = flags::Wren::from_env_or_exit();
    init_logging(flags.verbose);

    match build(&flags) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("build failed\n{e}");
            ExitCode::FAILURE
        }
    }
}
