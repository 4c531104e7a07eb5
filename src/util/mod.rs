//! Small utility code without anything video-specific.

pub mod spin_lock;
