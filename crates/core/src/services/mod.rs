mod binding;
mod explorer;
mod names;
mod runtime_cache;

pub use binding::*;
pub use explorer::*;
pub use names::*;
pub use runtime_cache::*;
