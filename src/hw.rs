//! The capability seam between the orchestrator and the hardware layer.
//!
//! Peripheral bring-up lives outside this crate; the per-line interrupt path
//! only needs the handful of operations in [`LineHw`]. On the CH32V003
//! these map to TIM1 (line period and sync PWM, preloaded registers), the
//! SPI TX DMA channel (pixel scanout) and the TIM1 compare channel that
//! triggers it.

use core::convert::TryFrom;
use core::ptr::NonNull;

/// Byte-rate presets of the pixel transfer engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PixelClock {
    /// 3MHz, for low-resolution modes.
    Mhz3,
    /// 6MHz, the default.
    Mhz6,
    /// 12MHz, for high-resolution text modes.
    Mhz12,
}

impl Default for PixelClock {
    fn default() -> Self {
        PixelClock::Mhz6
    }
}

/// One armed (or about to be armed) scanout transfer.
///
/// This is the retained form of a client [`Scanline`]: the transfer for line
/// N is armed during the interrupt that *begins* line N, using the buffer the
/// client filled during the previous interrupt, so the descriptor has to
/// outlive the borrow the scanline was produced under.
///
/// [`Scanline`]: ../rast/struct.Scanline.html
#[derive(Copy, Clone, Debug)]
pub struct Transfer {
    data: NonNull<u8>,
    len: u16,
    pixel_clock: PixelClock,
}

/// Safety: the transfer engine drains `data` within one horizontal period of
/// being armed, and the double-buffering contract (see `rast::DoubleBuffer`)
/// keeps the client from rewriting a buffer until two lines after it was
/// produced. The pointer is only ever handed to the transfer engine; nothing
/// dereferences it from software.
unsafe impl Send for Transfer {}

impl Transfer {
    pub(crate) fn new(data: &[u8], pixel_clock: PixelClock) -> Self {
        Transfer {
            // An empty scanline is still a valid (zero-length) transfer; the
            // dangling pointer is never read in that case.
            data: NonNull::new(data.as_ptr() as *mut u8)
                .unwrap_or(NonNull::dangling()),
            // The engine's length register is 16 bits; an over-long slice
            // saturates rather than silently truncating its low bits.
            len: u16::try_from(data.len()).unwrap_or(u16::MAX),
            pixel_clock,
        }
    }

    /// Start of the pixel bytes.
    pub fn data(&self) -> *const u8 {
        self.data.as_ptr()
    }

    /// Byte count, including the trailing blanking byte.
    pub fn len(&self) -> u16 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte rate to run the engine at for this line.
    pub fn pixel_clock(&self) -> PixelClock {
        self.pixel_clock
    }
}

/// Operations the orchestrator requires of the hardware layer.
///
/// The three `set_*` register writes must land in preloaded (shadow)
/// registers that take effect atomically at the next period boundary; a write
/// that applied mid-line would glitch the waveform. Implementations must make
/// every operation non-blocking and bounded -- these are called from the
/// line-rate interrupt with the horizontal period as the hard deadline.
pub trait LineHw {
    /// Loads the line-period shadow register, in timer ticks.
    fn set_line_period(&mut self, ticks: u16);

    /// Loads the sync-pulse-width shadow register, in timer ticks.
    fn set_sync_width(&mut self, ticks: u16);

    /// Loads the transfer-trigger offset shadow register: ticks from line
    /// start to the first pixel byte.
    fn set_trigger_start(&mut self, ticks: u16);

    /// Arms the pixel transfer engine with `xfer` and enables its trigger.
    fn arm_transfer(&mut self, xfer: &Transfer);

    /// Disables the transfer trigger; the line will stay at blanking level.
    fn disarm_transfer(&mut self);

    /// Masks the line-rate interrupt source. Teardown calls this before
    /// touching anything else so a fill can't race the shutdown.
    fn disable_line_interrupt(&mut self);

    /// Returns the timer and transfer peripherals to their reset state.
    fn reset(&mut self);

    /// Free-running cycle counter, used only for the duration diagnostics.
    fn cycle_count(&self) -> u32;
}
