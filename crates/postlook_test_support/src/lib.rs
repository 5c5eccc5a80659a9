pub mod stub_driver;

pub use stub_driver::{STUB_FILE_METADATA, STUB_QUERY_METADATA, StubDriver, StubStats};
