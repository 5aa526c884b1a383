/// Room addressing: codes, fields and paths.
pub mod paths;
/// Typed room document and value normalization.
pub mod models;
/// Room state storage, change fan-out and disconnect hooks.
pub mod room_store;
/// Storage error types.
pub mod storage;
