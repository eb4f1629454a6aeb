//! skinscan-vision — Frame exposure checks and the face framing gate.
//!
//! Produces the boolean "subject well-framed" signal that drives capture
//! eligibility in `skinscan-core`.

pub mod frame;
pub mod framing;

pub use frame::{Frame, FrameError};
pub use framing::{FaceBox, FramingPolicy, FramingVerdict};
