//! Pipeline stages for the upload → solutions workflow.
//!
//! Each submodule wraps one external capability:
//!
//! ```text
//! upload ──▶ extract ──▶ llm ──▶ postprocess        render
//! (tempfile) (ocr/pdf)  (LLM)   (reply cleanup)    (solutions PDF)
//! ```
//!
//! 1. [`upload`]: sanitise the filename, stage the bytes, classify by extension
//! 2. [`extract`]: tesseract OCR for images, lopdf text layer for PDFs
//! 3. [`llm`]: one extraction call, then one solve call per problem
//! 4. [`postprocess`]: split/clean the model replies
//! 5. [`render`]: build the downloadable PDF from a list of solutions

pub mod extract;
pub mod llm;
pub mod postprocess;
pub mod render;
pub mod upload;
