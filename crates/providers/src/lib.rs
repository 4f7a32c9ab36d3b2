pub mod backend;
pub mod sse;
