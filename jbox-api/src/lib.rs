//! jbox API - the structured value type shared by every jbox tool.

mod value;

pub use value::*;
