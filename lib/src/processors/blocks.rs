use crate::block;
use crate::context::Context;
use crate::error::Result;
use crate::processor::Processor;

/// Replaces `<webgen:block/>` directives with the blocks they name.
#[derive(Debug, Default, Clone, Copy)]
pub struct Blocks;

impl Processor for Blocks {
    fn process(&self, context: &mut Context<'_>) -> Result<()> {
        block::replace_directives(context)
    }
}
