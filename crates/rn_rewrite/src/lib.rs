mod matching;
mod apply;
mod outcomes;

pub use matching::*;
pub use apply::*;
pub use outcomes::*;

