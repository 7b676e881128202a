mod value;
mod metadata;
mod source;
mod sink;
mod mapper;

pub use value::*;
pub use metadata::*;
pub use source::*;
pub use sink::*;
pub use mapper::*;
