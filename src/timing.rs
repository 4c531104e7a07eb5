//! Definition of sync pulse timing and the per-standard pulse tables.
//!
//! A composite (CVBS) field is described as an ordered run-length sequence of
//! [`Pulse`] descriptors: each entry says what kind of sync pulse the line
//! carries, whether the line carries picture content, and for how many
//! consecutive lines the entry applies. Walking the sequence (and wrapping at
//! the terminator) reproduces the vertical structure of the signal forever.
//!
//! All widths and periods are expressed in ticks of the 48MHz line timer.

use thiserror::Error;

/// One entry in a pulse sequence, covering `duration` consecutive lines.
///
/// This is deliberately a plain value type rather than a packed bitfield;
/// five bytes per entry is affordable even in 2KiB of RAM.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Pulse {
    /// Run the line timer at twice the horizontal frequency. Used for the
    /// equalizing/serration regions of interlaced timing, where the standard
    /// calls for half-line pulses.
    pub half_period: bool,
    /// Use the short (equalizing) sync width.
    pub short_sync: bool,
    /// Use the long (serration/field) sync width. Mutually exclusive with
    /// `short_sync` in any valid table.
    pub long_sync: bool,
    /// The line carries picture content and needs pixel data.
    pub active: bool,
    /// Number of consecutive lines this entry covers. Zero is reserved as the
    /// sequence terminator and never describes a real pulse.
    pub duration: u8,
}

impl Pulse {
    /// Is this the end-of-sequence marker?
    pub fn is_terminator(&self) -> bool {
        self.duration == 0
    }
}

/// Shorthand for writing pulse tables as a compact matrix. Flags are 0/1 so
/// the tables below read like the waveform charts they were derived from.
const fn p(h: u8, s: u8, l: u8, a: u8, n: u8) -> Pulse {
    Pulse {
        half_period: h != 0,
        short_sync: s != 0,
        long_sync: l != 0,
        active: a != 0,
        duration: n,
    }
}

/// Complete timing description for one video standard.
///
/// All fields are public on purpose: display-calibration variants (shifting
/// the picture up or down by trading blank lines for active ones, say) are
/// expressed as user-defined values of this type, vetted offline with
/// [`check`](#method.check), rather than as knobs on the canonical tables.
pub struct PulseProperties {
    /// Timer ticks for one full scanline.
    pub horizontal_period: u16,
    /// Width of a short (equalizing) sync pulse, in ticks.
    pub sync_short: u16,
    /// Width of a normal horizontal sync pulse, in ticks.
    pub sync_normal: u16,
    /// Width of a long (serration) sync pulse, in ticks.
    pub sync_long: u16,
    /// Total line count of the standard, used only by `check`.
    pub lines: u16,
    /// The pulse sequence for one full frame (or field pair), ending in a
    /// `duration == 0` terminator.
    pub pulse_sequence: &'static [Pulse],
}

/// Defect found in a pulse table by offline validation.
///
/// The line-rate interrupt path cannot afford error handling, so malformed
/// tables must be rejected here -- in tests or at configuration time --
/// before a [`Context`](../field/struct.Context.html) ever walks them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum TableError {
    /// The sequence is empty or its final entry has a nonzero duration. The
    /// state machine would run off the end of such a table.
    #[error("pulse sequence does not end in a terminator entry")]
    MissingTerminator,
    /// A `duration == 0` entry appears before the end of the sequence.
    #[error("terminator entry at index {0} is not last in the sequence")]
    EarlyTerminator(usize),
    /// An entry requests both the short and the long sync width.
    #[error("entry {0} sets both short_sync and long_sync")]
    ConflictingSync(usize),
    /// The run lengths don't add up to the standard's declared line count.
    /// Both counts are in half-lines, so a `half_period` entry contributes
    /// its duration once and a full-period entry contributes it twice.
    #[error("sequence covers {actual} half-lines, standard declares {expected}")]
    LineCount { expected: u32, actual: u32 },
}

impl PulseProperties {
    /// Validates the table's structural invariants.
    ///
    /// The shipped tables are checked by this crate's tests; call this
    /// yourself when defining calibration variants.
    pub fn check(&self) -> Result<(), TableError> {
        let (last, body) = self
            .pulse_sequence
            .split_last()
            .ok_or(TableError::MissingTerminator)?;
        if !last.is_terminator() {
            return Err(TableError::MissingTerminator);
        }

        let mut half_lines = 0u32;
        for (i, pulse) in body.iter().enumerate() {
            if pulse.is_terminator() {
                return Err(TableError::EarlyTerminator(i));
            }
            if pulse.short_sync && pulse.long_sync {
                return Err(TableError::ConflictingSync(i));
            }
            half_lines +=
                u32::from(pulse.duration) * if pulse.half_period { 1 } else { 2 };
        }

        let expected = u32::from(self.lines) * 2;
        if half_lines != expected {
            return Err(TableError::LineCount {
                expected,
                actual: half_lines,
            });
        }
        Ok(())
    }
}

/// The closed set of supported video standards, chosen once at driver
/// construction. There is no runtime switching; to change standards, tear the
/// driver down and rebuild it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Standard {
    /// Broadcast-compatible 625-line interlaced PAL, including the half-line
    /// equalizing and serration groups that keep a TV's horizontal oscillator
    /// locked across field interleave.
    PalInterlaced,
    /// 312-line progressive PAL with the picture vertically centered; the
    /// single-field timing home computers of the ZX81 era produced.
    PalProgressive,
    /// 262-line progressive NTSC-style timing modeled on 240p console output,
    /// with a simple three-line vertical sync group.
    NtscProgressive,
}

impl Standard {
    /// The canonical pulse table for this standard.
    pub fn properties(self) -> &'static PulseProperties {
        match self {
            Standard::PalInterlaced => &PAL_INTERLACED,
            Standard::PalProgressive => &PAL_PROGRESSIVE,
            Standard::NtscProgressive => &NTSC_PROGRESSIVE,
        }
    }
}

/// Interlaced broadcast PAL: 50Hz, 64us per line.
///
/// 625 lines as 640 pulse units: 30 half-lines plus 610 full lines. The two
/// active runs are the two fields; the half-period groups around them are the
/// standard's pre/post-equalizing and field-sync sequences.
pub static PAL_INTERLACED: PulseProperties = PulseProperties {
    horizontal_period: 3072, // 48MHz * 64us
    sync_short: 113,         // 48MHz * 2.35us
    sync_normal: 226,        // 48MHz * 4.7us
    sync_long: 1310,         // 48MHz * (64us/2 - 4.7us)
    lines: 625,

    pulse_sequence: &[
        //H  S  L  A    N
        p(1, 0, 1, 0, 5),   // field sync (long, half rate)
        p(1, 1, 0, 0, 5),   // post-equalizing (short, half rate)
        p(0, 0, 0, 0, 46),  // top blank
        p(0, 0, 0, 1, 230), // active, first field
        p(0, 0, 0, 0, 29),  // bottom blank
        p(1, 1, 0, 0, 5),   // pre-equalizing
        p(1, 0, 1, 0, 5),   // field sync
        p(1, 1, 0, 0, 4),   // post-equalizing
        p(0, 1, 0, 0, 1),   // short sync at full period
        p(0, 0, 0, 0, 46),  // top blank
        p(0, 0, 0, 1, 230), // active, second field
        p(0, 0, 0, 0, 28),  // bottom blank
        p(1, 0, 0, 0, 1),   // trailing half-line
        p(1, 1, 0, 0, 5),   // pre-equalizing
        p(0, 0, 0, 0, 0),   // END
    ],
};

/// Progressive 312-line PAL, picture vertically centered.
///
/// Same tick constants as broadcast PAL, but a single field repeated 50 times
/// a second with no interlace tricks.
pub static PAL_PROGRESSIVE: PulseProperties = PulseProperties {
    horizontal_period: 3072,
    sync_short: 113,
    sync_normal: 226,
    sync_long: 1310,
    lines: 312,

    pulse_sequence: &[
        //H  S  L  A    N
        p(1, 0, 1, 0, 5),   // field sync
        p(1, 1, 0, 0, 5),   // post-equalizing
        p(0, 0, 0, 0, 65),  // top blank
        p(0, 0, 0, 1, 192), // active
        p(0, 0, 0, 0, 47),  // bottom blank
        p(1, 1, 0, 0, 6),   // pre-equalizing
        p(0, 0, 0, 0, 0),   // END
    ],
};

/// Progressive 262-line NTSC-style timing, modeled on 240p console output
/// with 192 active lines centered in the 240p picture area.
pub static NTSC_PROGRESSIVE: PulseProperties = PulseProperties {
    horizontal_period: 3050, // 48MHz * 63.55us
    sync_short: 113,         // 48MHz * 4.7us/2
    sync_normal: 226,        // 48MHz * 4.7us
    sync_long: 2846,         // 48MHz * (64us - 4.7us)
    lines: 262,

    pulse_sequence: &[
        //H  S  L  A    N
        p(0, 0, 0, 0, 48),  // pre-render blanking
        p(0, 0, 0, 1, 192), // active
        p(0, 0, 0, 0, 19),  // post-render blanking
        p(0, 0, 1, 0, 3),   // vertical sync
        p(0, 0, 0, 0, 0),   // END
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Standard; 3] = [
        Standard::PalInterlaced,
        Standard::PalProgressive,
        Standard::NtscProgressive,
    ];

    #[test]
    fn shipped_tables_are_valid() {
        for &std in &ALL {
            std.properties()
                .check()
                .unwrap_or_else(|e| panic!("{:?}: {}", std, e));
        }
    }

    #[test]
    fn pal_interlaced_covers_1250_half_lines() {
        // 625 lines, counted in half-lines so the half-period entries weigh
        // half as much as full-period ones.
        let sum: u32 = PAL_INTERLACED
            .pulse_sequence
            .iter()
            .filter(|p| !p.is_terminator())
            .map(|p| u32::from(p.duration) * if p.half_period { 1 } else { 2 })
            .sum();
        assert_eq!(sum, 1250);
    }

    #[test]
    fn terminator_is_unique_and_last() {
        for &std in &ALL {
            let seq = std.properties().pulse_sequence;
            let n = seq.iter().filter(|p| p.is_terminator()).count();
            assert_eq!(n, 1, "{:?}", std);
            assert!(seq.last().unwrap().is_terminator(), "{:?}", std);
        }
    }

    // Borrowed sequences have to be const items: the field wants a 'static
    // slice, which a slice literal in a function body can't provide.

    #[test]
    fn missing_terminator_is_rejected() {
        const UNTERMINATED: &[Pulse] = &[p(0, 0, 0, 0, 1), p(0, 0, 0, 1, 1)];
        let table = PulseProperties {
            lines: 2,
            pulse_sequence: UNTERMINATED,
            ..blank_constants()
        };
        assert_eq!(table.check(), Err(TableError::MissingTerminator));

        let empty = PulseProperties {
            lines: 0,
            pulse_sequence: &[],
            ..blank_constants()
        };
        assert_eq!(empty.check(), Err(TableError::MissingTerminator));
    }

    #[test]
    fn early_terminator_is_rejected() {
        const EARLY_END: &[Pulse] = &[
            p(0, 0, 0, 0, 1),
            p(0, 0, 0, 0, 0),
            p(0, 0, 0, 1, 1),
            p(0, 0, 0, 0, 0),
        ];
        let table = PulseProperties {
            lines: 2,
            pulse_sequence: EARLY_END,
            ..blank_constants()
        };
        assert_eq!(table.check(), Err(TableError::EarlyTerminator(1)));
    }

    #[test]
    fn conflicting_sync_flags_are_rejected() {
        const BOTH_SYNCS: &[Pulse] = &[p(0, 1, 1, 0, 2), p(0, 0, 0, 0, 0)];
        let table = PulseProperties {
            lines: 1,
            pulse_sequence: BOTH_SYNCS,
            ..blank_constants()
        };
        assert_eq!(table.check(), Err(TableError::ConflictingSync(0)));
    }

    #[test]
    fn line_count_mismatch_is_rejected() {
        const NINE_LINES: &[Pulse] = &[p(0, 0, 0, 1, 9), p(0, 0, 0, 0, 0)];
        let table = PulseProperties {
            lines: 10,
            pulse_sequence: NINE_LINES,
            ..blank_constants()
        };
        assert_eq!(
            table.check(),
            Err(TableError::LineCount {
                expected: 20,
                actual: 18,
            })
        );
    }

    fn blank_constants() -> PulseProperties {
        const TERMINATOR_ONLY: &[Pulse] = &[p(0, 0, 0, 0, 0)];
        PulseProperties {
            horizontal_period: 3072,
            sync_short: 113,
            sync_normal: 226,
            sync_long: 1310,
            lines: 0,
            pulse_sequence: TERMINATOR_ONLY,
        }
    }
}
