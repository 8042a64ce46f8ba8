mod pagination;
mod query;
mod runtime;
mod source;

pub use pagination::*;
pub use query::*;
pub use runtime::*;
pub use source::*;
