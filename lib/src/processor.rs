use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::context::Context;
use crate::error::{Failure, Result};

/// A named content transform.
pub trait Processor: Send + Sync {
    fn process(&self, context: &mut Context<'_>) -> Result<()>;
}

impl<F> Processor for F
    where F: Fn(&mut Context<'_>) -> Result<()> + Send + Sync
{
    fn process(&self, context: &mut Context<'_>) -> Result<()> {
        self(context)
    }
}

/// The registry of content processors, by name.
#[derive(Default, Clone)]
pub struct Processors {
    map: FxHashMap<Arc<str>, Arc<dyn Processor>>,
}

impl Processors {
    /// An empty registry.
    pub fn new() -> Self {
        Processors::default()
    }

    pub fn register<N, P>(&mut self, name: N, processor: P) -> &mut Self
        where N: Into<Arc<str>>, P: Processor + 'static
    {
        self.map.insert(name.into(), Arc::new(processor));
        self
    }

    /// Registers a closure as the processor `name`.
    pub fn register_fn<N, F>(&mut self, name: N, f: F) -> &mut Self
        where N: Into<Arc<str>>, F: Fn(&mut Context<'_>) -> Result<()> + Send + Sync + 'static
    {
        self.register(name, f)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Processor>> {
        self.map.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// The registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.map.keys().map(|k| &**k).collect();
        names.sort_unstable();
        names
    }

    /// Applies the processor `name` to `context`.
    ///
    /// Fails with [`Failure::ProcessorNotFound`] if there's no such processor.
    /// A failure other than a render error is wrapped in one naming the
    /// processor and the context's nodes.
    pub fn call(&self, name: &str, context: &mut Context<'_>) -> Result<()> {
        let processor = self.get(name)
            .ok_or_else(|| Failure::ProcessorNotFound { name: name.into() })?;

        tracing::trace!(processor = name, "running content processor");
        processor.process(context).map_err(|e| match e.failure() {
            Some(Failure::Render(_)) => e,
            _ => context.render_error(format!("content processor '{name}' failed"))
                .processor(name)
                .caused_by(e)
                .into(),
        })
    }

    /// Applies each processor in `pipeline`, in order.
    pub fn run<S: AsRef<str>>(&self, pipeline: &[S], context: &mut Context<'_>) -> Result<()> {
        pipeline.iter().try_for_each(|name| self.call(name.as_ref(), context))
    }
}

impl fmt::Debug for Processors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}
