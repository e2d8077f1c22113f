//! relay-client: terminal front end for the relay group chat.

pub mod batch;
pub mod command;
pub mod feed;
pub mod uploader;

pub use batch::{BatchError, PreparedBatch, Uploader, prepare};
pub use command::Command;
pub use feed::{Feed, render};
pub use uploader::HttpUploader;
