//! FTP protocol replies
//!
//! Reply code constants and control-channel response framing.

pub mod response;

pub use response::Reply;
