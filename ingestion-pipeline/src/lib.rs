#![allow(clippy::missing_docs_in_private_items)]

pub mod chunking;
pub mod event;
pub mod extraction;
pub mod pipeline;

pub use event::StageEvent;
pub use extraction::ocr::OcrEngine;
pub use pipeline::{IngestionPipeline, UploadedFile};
