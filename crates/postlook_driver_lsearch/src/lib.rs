mod driver;

pub use driver::{LsearchDriver, METADATA};
