//! Cloud integrations: object storage and the extraction function.
//!
//! Both surfaces are traits so the pipeline can run against in-memory
//! fakes in tests. The S3 and HTTP implementations live here; nothing in
//! this crate touches the database.

pub mod error;
pub mod extract;
pub mod store;

pub use error::CloudError;
pub use extract::{ExtractionClient, ExtractionOutcome, ExtractionRequest, HttpExtractionClient};
pub use store::{InMemoryStore, ObjectMeta, ObjectStore, ObjectSummary, S3Store};
