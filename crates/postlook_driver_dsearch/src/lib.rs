mod driver;

pub use driver::{DsearchDriver, METADATA};
