mod context;
mod signature;
mod status;
mod task;
mod value;

pub use context::*;
pub use signature::*;
pub use status::*;
pub use task::*;
pub use value::*;
