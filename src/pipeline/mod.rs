//! Pipeline stages for document analysis.
//!
//! Each submodule implements exactly one step, so each is independently
//! testable against fake collaborators.
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ extract ──▶ clean ──▶ llm ──▶ parse
//! (storage)  (lopdf)   (regex)  (model)  (JSON)
//! ```
//!
//! 1. [`fetch`]: list the document's storage prefix and read the object;
//!    retries connection failures
//! 2. [`extract`]: decode the PDF and collect page-marked text; runs in
//!    `spawn_blocking` because decoding is CPU-bound
//! 3. [`clean`]: deterministic whitespace normalisation
//! 4. [`llm`]: drive the model call with truncation and retry/backoff
//! 5. [`parse`]: validate the reply and normalise its tags

pub mod clean;
pub mod extract;
pub mod fetch;
pub mod llm;
pub mod parse;
