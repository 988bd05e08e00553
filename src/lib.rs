//! Unfolds closed polygonal meshes into flat nets of paper that can be
//! printed, cut, folded and glued back into the original shape.
//!
//! The entry point is [`paper::unfold`]: it takes a [`paper::Model`] and an
//! [`paper::UnfoldOptions`] and returns a [`paper::Papercraft`], the islands
//! of faces already packed into pages.

pub mod config;
pub mod paper;
pub mod util_3d;
pub mod waveobj;
