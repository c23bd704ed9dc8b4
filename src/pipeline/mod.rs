pub mod batch;
pub mod builder;
pub mod recorded;
pub mod runtime;
pub mod scratch;
pub mod traits;
