//! Raster client support: scanline production and vblank synchronization.
//!
//! The driver does not know how picture content is made. A client implements
//! [`Raster`] and owns its own pixel storage; the orchestrator calls
//! [`Raster::scanline`] once per active line, from interrupt context, and the
//! client hands back a zero-terminated byte slice to scan out.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::field::Context;
use crate::hw::PixelClock;

/// One line of pixel data, as produced by a raster client.
pub struct Scanline<'a> {
    /// Ticks from the start of video (the orchestrator adds the normal sync
    /// width) to the first pixel byte. This is a display calibration value;
    /// around 270 ticks (5.7us at 48MHz) centers a 32-byte line on a typical
    /// PAL/NTSC set.
    pub horizontal_start: u16,
    /// The pixel bytes. The last byte must be zero so the output returns to
    /// blanking level after the picture area; a nonzero tail streaks across
    /// the right border of the screen.
    pub data: &'a [u8],
    /// Byte rate for this line's transfer.
    pub pixel_clock: PixelClock,
}

/// A raster client: the two hooks the orchestrator invokes from interrupt
/// context. Both must return well within one horizontal period -- tens of
/// microseconds -- as there is no recovery from a missed line deadline.
pub trait Raster {
    /// Produce pixel data for the current active line. `ctx.line()` counts
    /// from zero at the top of the picture area.
    ///
    /// The returned buffer is scanned out during the *next* line, possibly
    /// while this hook is already producing the line after it; see
    /// [`DoubleBuffer`].
    fn scanline(&mut self, ctx: &Context) -> Scanline<'_>;

    /// Called exactly once per transition from picture to blanking, at the
    /// top of a new field or frame. Most clients count frames here.
    fn vblank(&mut self, ctx: &Context) {
        let _ = ctx;
    }
}

/// Two alternating line buffers, selected by line parity.
///
/// The transfer engine may still be draining the buffer produced for line N
/// while the client renders line N+1, so a single buffer would tear. With two
/// banks, the buffer written during line N's callback is not selected for
/// writing again until line N+2 -- by which point the fixed period guarantees
/// the engine finished with it. No runtime check enforces this; the guarantee
/// is the alternation itself.
///
/// `N` includes one byte for the trailing blanking zero, which
/// [`produce`](#method.produce) writes itself; the closure only ever sees the
/// `N - 1` payload bytes.
pub struct DoubleBuffer<const N: usize> {
    banks: [[u8; N]; 2],
}

impl<const N: usize> DoubleBuffer<N> {
    pub const fn new() -> Self {
        DoubleBuffer { banks: [[0; N]; 2] }
    }

    /// Fills the bank for `line` and returns it, zero-terminated, ready to
    /// put in a [`Scanline`].
    pub fn produce(&mut self, line: usize, fill: impl FnOnce(&mut [u8])) -> &[u8] {
        let bank = &mut self.banks[line & 1];
        let (payload, tail) = bank.split_at_mut(N - 1);
        fill(payload);
        tail[0] = 0;
        &self.banks[line & 1]
    }
}

impl<const N: usize> Default for DoubleBuffer<N> {
    fn default() -> Self {
        DoubleBuffer::new()
    }
}

/// Completed-frame counter for synchronizing thread-mode rendering with the
/// field rate.
///
/// Bump it from [`Raster::vblank`]; [`wait`](#method.wait) busy-waits in
/// thread mode for the next bump. On bare metal the wait idles the CPU, and
/// the line-rate interrupt itself wakes it.
pub struct FrameCounter(AtomicU32);

impl FrameCounter {
    pub const fn new() -> Self {
        FrameCounter(AtomicU32::new(0))
    }

    /// Records a completed field/frame. Safe to call from interrupt context.
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of fields/frames completed so far.
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    /// Blocks until the counter changes, i.e. until the next vblank.
    pub fn wait(&self) {
        let seen = self.get();
        while self.get() == seen {
            cfg_if::cfg_if! {
                if #[cfg(all(target_arch = "riscv32", target_os = "none"))] {
                    riscv::asm::wfi();
                } else {
                    core::hint::spin_loop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_buffer_alternates_by_parity() {
        let mut buf: DoubleBuffer<4> = DoubleBuffer::new();
        let even = buf.produce(0, |px| px.copy_from_slice(&[1, 2, 3])).as_ptr();
        let odd = buf.produce(1, |px| px.copy_from_slice(&[4, 5, 6])).as_ptr();
        assert_ne!(even, odd);
        // Line 2 reuses line 0's bank, line 3 reuses line 1's.
        assert_eq!(buf.produce(2, |_| ()).as_ptr(), even);
        assert_eq!(buf.produce(3, |_| ()).as_ptr(), odd);
    }

    #[test]
    fn produce_zero_terminates_every_line() {
        let mut buf: DoubleBuffer<4> = DoubleBuffer::new();
        let line = buf.produce(7, |px| {
            assert_eq!(px.len(), 3);
            px.copy_from_slice(&[0xFF, 0xFF, 0xFF]);
        });
        assert_eq!(line, &[0xFF, 0xFF, 0xFF, 0x00]);
    }

    #[test]
    fn frame_counter_counts() {
        let frames = FrameCounter::new();
        assert_eq!(frames.get(), 0);
        frames.increment();
        frames.increment();
        assert_eq!(frames.get(), 2);
    }
}
