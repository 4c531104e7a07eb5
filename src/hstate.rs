//! Per-line orchestration: the body of the horizontal-rate interrupt.
//!
//! The hardware fires one interrupt per horizontal line, at the period
//! programmed during the *previous* line. Each invocation of
//! [`LineDriver::line_isr`] must arm scanout for the line that is beginning,
//! advance the vertical state machine, have the client produce the *next*
//! line's pixels, and reprogram the timing registers -- all well inside the
//! current horizontal period, because the next interrupt arrives exactly one
//! period later and nothing recovers from a miss.

use crate::field::Context;
use crate::hw::{LineHw, Transfer};
use crate::measurement::LineStats;
use crate::rast::Raster;
use crate::timing::Standard;

/// The driver handle: one timing context, one raster client, one hardware
/// layer. The application owns exactly one of these and hands it to its
/// line-rate interrupt; there is no ambient global instance.
///
/// The usual loan pattern is the same one used for any ISR-shared resource:
///
/// ```ignore
/// static DRIVER: SpinLock<Option<LineDriver<Console, Ch32Hw>>> =
///     SpinLock::new(None);
///
/// fn tim1_up_irq() {
///     DRIVER
///         .try_lock()
///         .expect("driver locked at ISR")
///         .as_mut()
///         .expect("ISR fired before driver install")
///         .line_isr();
/// }
/// ```
pub struct LineDriver<C, H> {
    ctx: Context,
    client: C,
    hw: H,
    /// Transfer produced by the previous invocation, armed by this one.
    pending: Option<Transfer>,
    stats: LineStats,
}

impl<C: Raster, H: LineHw> LineDriver<C, H> {
    /// Builds the driver and programs the initial line timing, so the first
    /// hardware period is already correct when the caller enables the
    /// interrupt source (bring-up itself happens outside this crate).
    pub fn new(standard: Standard, client: C, mut hw: H) -> Self {
        let ctx = Context::new(standard);
        hw.set_line_period(ctx.horizontal_period());
        hw.set_sync_width(ctx.sync_width());
        hw.disarm_transfer();
        LineDriver {
            ctx,
            client,
            hw,
            pending: None,
            stats: LineStats::default(),
        }
    }

    /// One horizontal line's worth of work. Call exactly once per line-rate
    /// interrupt.
    pub fn line_isr(&mut self) {
        let t0 = self.hw.cycle_count();

        // Scanout for the line now beginning. The buffer was produced during
        // the previous invocation; on the first active line after startup
        // there is none yet, and the line stays blank.
        //
        // THIS PATH IS LATENCY SENSITIVE: the trigger offset is measured from
        // the interrupt's own line start.
        if self.ctx.is_active_line() {
            match &self.pending {
                Some(xfer) => self.hw.arm_transfer(xfer),
                None => self.hw.disarm_transfer(),
            }
        } else {
            self.hw.disarm_transfer();
        }

        // Advance the vertical state machine to the new line.
        self.ctx.step();

        // Produce the new line's pixels, or report the field boundary. The
        // transfer armed above may still be draining while the client writes;
        // the client's double buffering absorbs the overlap.
        if self.ctx.is_active_line() {
            let sync_normal = self.ctx.properties().sync_normal;
            let scanline = self.client.scanline(&self.ctx);
            debug_assert_eq!(
                scanline.data.last().copied(),
                Some(0),
                "scanline missing trailing blanking byte"
            );
            // 16-bit register arithmetic: an out-of-range calibration value
            // wraps, it does not panic the interrupt.
            self.hw
                .set_trigger_start(scanline.horizontal_start.wrapping_add(sync_normal));
            self.pending = Some(Transfer::new(scanline.data, scanline.pixel_clock));
        } else {
            self.pending = None;
            if self.ctx.line() == 0 {
                // First blank line after a picture area: top of a new field.
                self.client.vblank(&self.ctx);
            }
        }

        // Timing registers for the new line. These are shadow registers and
        // latch at the next period boundary, one full period ahead of the
        // waveform they shape.
        self.hw.set_line_period(self.ctx.horizontal_period());
        self.hw.set_sync_width(self.ctx.sync_width());

        let elapsed = self.hw.cycle_count().wrapping_sub(t0);
        self.stats.record(self.ctx.is_active_line(), elapsed);
    }

    /// Stops video output and returns the client and hardware layer.
    ///
    /// May be called from thread mode; the interrupt source is masked before
    /// anything else is touched, so a line fill cannot race the teardown.
    pub fn shutdown(mut self) -> (C, H) {
        self.hw.disable_line_interrupt();
        self.hw.disarm_transfer();
        self.hw.reset();
        let LineDriver { client, hw, .. } = self;
        (client, hw)
    }

    /// The timing state, e.g. for thread-mode diagnostics.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Duration diagnostics for the two invocation classes.
    pub fn stats(&self) -> LineStats {
        self.stats
    }

    /// Read-only view of the hardware layer, for thread-mode diagnostics.
    /// Mutation stays with the orchestrator; reprogramming timing from
    /// outside the line interrupt would race it.
    pub fn hw(&self) -> &H {
        &self.hw
    }

    /// The raster client, for thread-mode access to whatever state it
    /// shares with rendering (frame counters, VRAM...).
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Mutable access to the raster client, for thread-mode updates. Reach
    /// this through the same lock the ISR takes; the exclusive borrow keeps
    /// `line_isr` out for the duration.
    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::PixelClock;
    use crate::rast::Scanline;

    /// Records every hardware operation in order.
    #[derive(Default)]
    struct LogHw {
        log: Vec<String>,
        cycles: u32,
    }

    impl LineHw for LogHw {
        fn set_line_period(&mut self, ticks: u16) {
            self.log.push(format!("period {}", ticks));
        }
        fn set_sync_width(&mut self, ticks: u16) {
            self.log.push(format!("sync {}", ticks));
        }
        fn set_trigger_start(&mut self, ticks: u16) {
            self.log.push(format!("trigger {}", ticks));
        }
        fn arm_transfer(&mut self, xfer: &Transfer) {
            self.log.push(format!("arm {}", xfer.len()));
        }
        fn disarm_transfer(&mut self) {
            self.log.push("disarm".to_string());
        }
        fn disable_line_interrupt(&mut self) {
            self.log.push("irq off".to_string());
        }
        fn reset(&mut self) {
            self.log.push("reset".to_string());
        }
        fn cycle_count(&self) -> u32 {
            self.cycles
        }
    }

    struct StaticLine;

    impl Raster for StaticLine {
        fn scanline(&mut self, _ctx: &Context) -> Scanline<'_> {
            Scanline {
                horizontal_start: 274,
                data: &[0x55, 0x00],
                pixel_clock: PixelClock::Mhz6,
            }
        }
    }

    #[test]
    fn construction_programs_initial_timing() {
        let driver =
            LineDriver::new(Standard::NtscProgressive, StaticLine, LogHw::default());
        assert_eq!(
            driver.hw.log,
            vec!["period 3050", "sync 226", "disarm"]
        );
    }

    #[test]
    fn arm_runs_one_invocation_behind_production() {
        // NTSC progressive: 48 blank lines, then active. The invocation that
        // steps onto the first active line produces a buffer, but the arm for
        // it can only happen on the *next* invocation.
        let mut driver =
            LineDriver::new(Standard::NtscProgressive, StaticLine, LogHw::default());
        for _ in 0..48 {
            driver.line_isr();
        }
        assert!(driver.ctx.is_active_line());
        driver.hw.log.clear();
        driver.line_isr();
        assert_eq!(driver.hw.log[0], "arm 2");
    }

    #[test]
    fn active_line_without_a_produced_buffer_stays_blank() {
        // A table that opens on an active line: the very first invocation has
        // no previously produced buffer, so the trigger must stay disabled.
        use crate::timing::{Pulse, PulseProperties};
        static ACTIVE_FIRST: PulseProperties = PulseProperties {
            horizontal_period: 3072,
            sync_short: 113,
            sync_normal: 226,
            sync_long: 1310,
            lines: 4,
            pulse_sequence: &[
                Pulse {
                    half_period: false,
                    short_sync: false,
                    long_sync: false,
                    active: true,
                    duration: 3,
                },
                Pulse {
                    half_period: false,
                    short_sync: false,
                    long_sync: false,
                    active: false,
                    duration: 1,
                },
                Pulse {
                    half_period: false,
                    short_sync: false,
                    long_sync: false,
                    active: false,
                    duration: 0,
                },
            ],
        };

        let mut driver = LineDriver {
            ctx: Context::from_properties(&ACTIVE_FIRST),
            client: StaticLine,
            hw: LogHw::default(),
            pending: None,
            stats: LineStats::default(),
        };
        driver.line_isr();
        assert_eq!(driver.hw.log[0], "disarm");
    }

    struct FarRight;

    impl Raster for FarRight {
        fn scanline(&mut self, _ctx: &Context) -> Scanline<'_> {
            Scanline {
                horizontal_start: u16::MAX,
                data: &[0x55, 0x00],
                pixel_clock: PixelClock::Mhz6,
            }
        }
    }

    #[test]
    fn trigger_offset_wraps_instead_of_panicking() {
        // A calibration value at the top of the register range: adding the
        // normal sync width wraps like the 16-bit register it lands in.
        let mut driver =
            LineDriver::new(Standard::NtscProgressive, FarRight, LogHw::default());
        for _ in 0..48 {
            driver.line_isr();
        }
        assert!(driver.hw.log.contains(&"trigger 225".to_string()));
    }

    #[test]
    fn shutdown_masks_the_interrupt_first() {
        let mut driver =
            LineDriver::new(Standard::PalProgressive, StaticLine, LogHw::default());
        driver.line_isr();
        let (_client, hw) = driver.shutdown();
        let tail = &hw.log[hw.log.len() - 3..];
        assert_eq!(tail, &["irq off", "disarm", "reset"]);
    }
}
