//! Backward slicing over recorded executions.
//!
//! [`ReplayBackend`] implements the slicer's backend interface on top of a
//! JSON [`Recording`](recording::Recording), so slices can be computed
//! offline without a live reverse debugger. The `dslice` binary (feature
//! `dslice-bin`) is a command-line front end for it.

pub mod backend;
pub mod error;
pub mod recording;

pub use backend::ReplayBackend;
pub use error::ReplayError;
