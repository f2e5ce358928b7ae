//! Reconstruction pipeline glue.
//!
//! Wires the stages together in fixed order:
//! preprocess -> fuse -> enhance -> post-process -> select step -> mesh -> quality.
//!
//! The numeric work lives in the stage modules (`preprocess`, `fusion`,
//! `features`, `postprocess`, `resolution`, `mesh`, `quality`); this layer
//! only owns call order, validation and logging.

mod result;
mod run;

pub use result::{ProcessingInfo, Reconstruction};

pub(crate) use run::{decode_image, open_image, run};

#[cfg(test)]
mod tests;
