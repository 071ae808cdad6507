//! Range math and segment temp files.
//!
//! Splits a resource of `T` bytes into N inclusive ranges covering `[0, T]`
//! and names the per-segment temp files.

mod range;
mod temp;

pub use range::{plan_segments, Segment};
pub use temp::{create_segment_file, temp_prefix};
