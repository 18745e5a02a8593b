#![allow(clippy::missing_docs_in_private_items)]

pub mod client;
pub mod decoder;
pub mod job;
pub mod registry;

pub use client::UploadClient;
pub use decoder::NdjsonDecoder;
pub use job::{JobStatus, UploadJob};
pub use registry::JobRegistry;
