//! Per-line duration diagnostics.
//!
//! The orchestrator records how many cycles each interrupt invocation took,
//! split by whether the new line is active (renders a scanline) or blank.
//! These counters exist purely for observation -- spotting a raster client
//! that is creeping up on the horizontal-period deadline -- and play no role
//! in control. Deadline overruns must be prevented by design; by the time a
//! counter shows one, the picture has already torn.

/// Duration gauges for the line interrupt, owned by the driver and read
/// through its handle (no ambient global state). Each field holds the most
/// recent observation, not an accumulation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LineStats {
    /// Cycles spent in the most recent invocation that produced a scanline,
    /// including the raster client's own work.
    pub active_line_cycles: u32,
    /// Cycles spent in the most recent blank-line invocation.
    pub blank_line_cycles: u32,
}

impl LineStats {
    pub(crate) fn record(&mut self, active_line: bool, cycles: u32) {
        if active_line {
            self.active_line_cycles = cycles;
        } else {
            self.blank_line_cycles = cycles;
        }
    }
}
