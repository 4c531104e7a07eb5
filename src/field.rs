//! The field-sequencing state machine.
//!
//! A [`Context`] walks a pulse table one horizontal line at a time. The walk
//! is deterministic and cyclic: when the terminator entry is reached the
//! position wraps to index zero and the next frame (or field pair) begins.
//! Everything the per-line interrupt needs -- the period and sync width to
//! program for the next line, and whether that line carries picture data --
//! is derived from the cached current descriptor, never stored twice.

use crate::timing::{Pulse, PulseProperties, Standard};

/// Per-instance video timing state.
///
/// Constructed once when the standard is selected and then mutated only by
/// [`step`](#method.step), which the orchestrator calls exactly once per
/// horizontal line from interrupt context.
pub struct Context {
    props: &'static PulseProperties,
    /// Position in the pulse sequence.
    pulse_index: usize,
    /// Lines remaining in the current entry's run.
    pulse_counter: u8,
    /// Cached copy of the current entry, selected once per advance.
    current: Pulse,
    /// Lines since the active/blanking boundary last flipped. Clients read
    /// this as "lines since my picture area started", not as an absolute
    /// frame position.
    line: usize,
}

impl Context {
    /// Creates a context positioned at the top of the given standard's pulse
    /// sequence.
    pub fn new(standard: Standard) -> Self {
        Context::from_properties(standard.properties())
    }

    /// Creates a context over a caller-supplied table, e.g. a calibration
    /// variant of one of the shipped standards. The table must satisfy
    /// [`PulseProperties::check`]; walking an invalid table will panic on the
    /// out-of-range sequence index when the missing terminator is reached.
    ///
    /// [`PulseProperties::check`]: ../timing/struct.PulseProperties.html#method.check
    pub fn from_properties(props: &'static PulseProperties) -> Self {
        let first = props.pulse_sequence[0];
        Context {
            props,
            pulse_index: 0,
            pulse_counter: first.duration,
            current: first,
            line: 0,
        }
    }

    /// Advances the context by exactly one horizontal line.
    pub fn step(&mut self) {
        self.line += 1;

        self.pulse_counter -= 1;
        if self.pulse_counter != 0 {
            // Still inside the current entry's run.
            return;
        }

        let was_active = self.current.active;

        self.pulse_index += 1;
        let seq = self.props.pulse_sequence;
        let mut next = seq[self.pulse_index];
        if next.is_terminator() {
            self.pulse_index = 0;
            next = seq[0];
        }

        self.current = next;
        self.pulse_counter = next.duration;

        // An edge between blanking and picture, in either direction, restarts
        // the client-visible line counter.
        if was_active != next.active {
            self.line = 0;
        }
    }

    /// Timer ticks for the current line. Halved while the current entry is a
    /// half-period (equalizing/serration) pulse -- that doubled horizontal
    /// frequency is what the interlace standard demands there.
    pub fn horizontal_period(&self) -> u16 {
        self.props.horizontal_period >> (self.current.half_period as u16)
    }

    /// Sync pulse width for the current line. `short_sync` takes priority
    /// over `long_sync`; with neither set the normal width applies.
    pub fn sync_width(&self) -> u16 {
        if self.current.short_sync {
            return self.props.sync_short;
        }
        if self.current.long_sync {
            return self.props.sync_long;
        }
        self.props.sync_normal
    }

    /// Does the current line carry picture content?
    pub fn is_active_line(&self) -> bool {
        self.current.active
    }

    /// Lines since the last active/blanking edge. Zero on the first line of
    /// a picture area and on the first line of a blanking area.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The timing constants this context was built over.
    pub fn properties(&self) -> &'static PulseProperties {
        self.props
    }

    /// Position in the pulse sequence, exposed for tests and diagnostics.
    pub fn pulse_index(&self) -> usize {
        self.pulse_index
    }
}
