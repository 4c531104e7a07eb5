//! Composite video (CVBS) line-timing driver core.
//!
//! This crate generates the timing skeleton of an analog composite video
//! signal from a timer/DMA/serial-shift pipeline: standard-compliant sync
//! pulses (including the half-line equalizing groups interlace needs), one
//! interrupt per horizontal line, and a bounded time budget per line for the
//! application to render into.
//!
//! The moving parts, leaves first:
//!
//! - [`timing`]: immutable per-standard pulse tables and their offline
//!   validation.
//! - [`field`]: the state machine that walks a pulse table line by line and
//!   derives the next line's period and sync width.
//! - [`hw`]: the capability trait the orchestrator drives; implemented
//!   outside this crate against the actual timer/DMA peripherals.
//! - [`rast`]: the client side -- scanline production, double buffering,
//!   vblank synchronization.
//! - [`hstate`]: the per-line orchestrator tying all of the above together
//!   inside the horizontal-rate interrupt.
//! - [`measurement`]: per-line duration diagnostics.
//!
//! Output is monochrome bi-level luma only; there is no color encoding, no
//! audio, and no runtime standard switching.

#![cfg_attr(not(test), no_std)]

pub mod field;
pub mod hstate;
pub mod hw;
pub mod measurement;
pub mod rast;
pub mod timing;
pub mod util;

pub use crate::field::Context;
pub use crate::hstate::LineDriver;
pub use crate::hw::{LineHw, PixelClock, Transfer};
pub use crate::measurement::LineStats;
pub use crate::rast::{DoubleBuffer, FrameCounter, Raster, Scanline};
pub use crate::timing::{Pulse, PulseProperties, Standard, TableError};
