#![allow(dead_code)]
pub mod buffer_pool;
pub mod disk;
pub mod frame;
pub mod frame_handle;
pub mod page;
pub mod record_id;
pub mod replacer;
pub mod typedef;
pub(crate) type Result<T> = std::result::Result<T, granite_error::Error>;
