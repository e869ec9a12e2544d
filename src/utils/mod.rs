// Shared helpers: text transcoding and byte-level readers
pub mod encoding;
pub mod io;
