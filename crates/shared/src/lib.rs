pub mod chat_api;
pub mod credentials;
pub mod storage;
