pub mod intern;
pub mod memo;

pub use intern::{Atom, ImageNames};
pub use memo::{CacheKey, MemoCache, fingerprint};
