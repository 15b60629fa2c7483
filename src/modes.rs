//! Mode Catalogue (C1): the static table of SSTV modes and their timing
//! constants, plus the segment layout shared by the encoder and decoder.

use crate::error::SstvError;
use lazy_static::lazy_static;

/// Sample rate used throughout the core. The spec does not resample across
/// rates; every buffer in the system is at this rate.
pub const SAMPLE_RATE: u32 = 44_100;

pub const HEADER_MS: f64 = 910.0;
pub const SYNC_HZ: f64 = 1200.0;
pub const BLACK_HZ: f64 = 1500.0;
pub const WHITE_HZ: f64 = 2300.0;

/// Transmission order of the three scanned channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelOrder {
    Gbr,
    Rgb,
    YCrCb,
}

/// Immutable per-mode timing record (SPEC_FULL.md §3).
///
/// `scan_ms` is per-channel in transmission order. Uniform modes (Martin,
/// Scottie, Native) repeat one value three times; Robot36 and PD120 carry
/// distinct values per channel, which is why this is `[f64; 3]` rather than
/// the single scalar spec.md names for the common case.
#[derive(Debug, Clone)]
pub struct ModeDescriptor {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    pub sync_ms: f64,
    pub scan_ms: [f64; 3],
    pub gap_ms: f64,
    pub channel_order: ChannelOrder,
    pub sync_at_end: bool,
}

/// Round to the nearest sample count, ties to even. Applied only at the
/// moment a duration is turned into an index, never during intermediate
/// arithmetic, so drift across 256 lines stays bounded by half a sample.
fn samples_for_ms(ms: f64, sample_rate: u32) -> usize {
    (ms * sample_rate as f64 / 1000.0).round_ties_even() as usize
}

impl ModeDescriptor {
    pub fn header_samples(&self, sample_rate: u32) -> usize {
        samples_for_ms(HEADER_MS, sample_rate)
    }

    pub fn sync_samples(&self, sample_rate: u32) -> usize {
        samples_for_ms(self.sync_ms, sample_rate)
    }

    pub fn gap_samples(&self, sample_rate: u32) -> usize {
        samples_for_ms(self.gap_ms, sample_rate)
    }

    pub fn scan_samples(&self, channel: usize, sample_rate: u32) -> usize {
        samples_for_ms(self.scan_ms[channel], sample_rate)
    }

    /// sync_samples + 4 * gap_samples + sum of per-channel scan_samples.
    pub fn line_samples(&self, sample_rate: u32) -> usize {
        self.sync_samples(sample_rate)
            + 4 * self.gap_samples(sample_rate)
            + (0..3).map(|c| self.scan_samples(c, sample_rate)).sum::<usize>()
    }

    pub fn audio_len(&self, sample_rate: u32) -> usize {
        self.header_samples(sample_rate) + self.height as usize * self.line_samples(sample_rate)
    }

    /// A Native mode sized to the source image, with scan duration derived
    /// so pixel rate matches MartinM1 (`width * 146.432 / 320` ms).
    pub fn native(width: u32, height: u32) -> Self {
        let scan = width as f64 * (146.432 / 320.0);
        ModeDescriptor {
            name: "Native",
            width,
            height,
            sync_ms: 4.862,
            scan_ms: [scan, scan, scan],
            gap_ms: 0.572,
            channel_order: ChannelOrder::Gbr,
            sync_at_end: false,
        }
    }
}

lazy_static! {
    static ref MODE_TABLE: Vec<ModeDescriptor> = vec![
        ModeDescriptor {
            name: "MartinM1",
            width: 320,
            height: 256,
            sync_ms: 4.862,
            scan_ms: [146.432, 146.432, 146.432],
            gap_ms: 0.572,
            channel_order: ChannelOrder::Gbr,
            sync_at_end: false,
        },
        ModeDescriptor {
            name: "MartinM2",
            width: 320,
            height: 256,
            sync_ms: 4.862,
            scan_ms: [73.216, 73.216, 73.216],
            gap_ms: 0.572,
            channel_order: ChannelOrder::Gbr,
            sync_at_end: false,
        },
        ModeDescriptor {
            name: "ScottieS1",
            width: 320,
            height: 256,
            sync_ms: 9.0,
            scan_ms: [138.240, 138.240, 138.240],
            gap_ms: 1.5,
            channel_order: ChannelOrder::Gbr,
            sync_at_end: true,
        },
        ModeDescriptor {
            name: "ScottieS2",
            width: 320,
            height: 256,
            sync_ms: 9.0,
            scan_ms: [88.064, 88.064, 88.064],
            gap_ms: 1.5,
            channel_order: ChannelOrder::Gbr,
            sync_at_end: true,
        },
        ModeDescriptor {
            name: "Robot36",
            width: 320,
            height: 240,
            sync_ms: 9.0,
            scan_ms: [88.0, 44.0, 44.0],
            gap_ms: 4.5,
            channel_order: ChannelOrder::YCrCb,
            sync_at_end: false,
        },
        ModeDescriptor {
            name: "PD120",
            width: 640,
            height: 496,
            sync_ms: 20.0,
            scan_ms: [121.6, 121.6, 121.6],
            gap_ms: 2.08,
            channel_order: ChannelOrder::YCrCb,
            sync_at_end: false,
        },
    ];
}

/// One segment of a single scanline, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Sync,
    Gap,
    /// Scan of channel index 0..3 in the mode's transmission order.
    Scan(usize),
}

/// The per-line segment order, honoring `sync_at_end`.
///
/// For `sync_at_end` modes (Scottie) the sync pulse is emitted after the
/// last channel's scan+gap rather than before the first channel, per the
/// design-note resolution recorded in DESIGN.md. Segment count and total
/// duration are identical either way: one sync, four gaps, three scans.
pub fn line_layout(mode: &ModeDescriptor) -> Vec<Segment> {
    let mut segs = Vec::with_capacity(8);
    if !mode.sync_at_end {
        segs.push(Segment::Sync);
    }
    segs.push(Segment::Gap);
    for ch in 0..3 {
        segs.push(Segment::Scan(ch));
        segs.push(Segment::Gap);
    }
    if mode.sync_at_end {
        segs.push(Segment::Sync);
    }
    segs
}

/// Look up a mode by name, or build a Native mode sized to `image_dims`.
pub fn resolve(name: &str, image_dims: (u32, u32)) -> Result<ModeDescriptor, SstvError> {
    if name.eq_ignore_ascii_case("native") {
        return Ok(ModeDescriptor::native(image_dims.0, image_dims.1));
    }
    MODE_TABLE
        .iter()
        .find(|m| m.name.eq_ignore_ascii_case(name))
        .cloned()
        .ok_or_else(|| SstvError::UnknownMode {
            name: name.to_string(),
        })
}

/// All modes with fixed timing, plus a zero-sized sentinel for Native
/// (whose real dimensions are only known at encode time).
pub fn known_modes() -> Vec<ModeDescriptor> {
    let mut modes = MODE_TABLE.clone();
    modes.push(ModeDescriptor {
        name: "Native",
        width: 0,
        height: 0,
        sync_ms: 4.862,
        scan_ms: [0.0, 0.0, 0.0],
        gap_ms: 0.572,
        channel_order: ChannelOrder::Gbr,
        sync_at_end: false,
    });
    modes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn martin_m1_line_layout_has_expected_counts() {
        let m = resolve("MartinM1", (320, 256)).unwrap();
        let layout = line_layout(&m);
        assert_eq!(layout.iter().filter(|s| **s == Segment::Sync).count(), 1);
        assert_eq!(layout.iter().filter(|s| **s == Segment::Gap).count(), 4);
        assert_eq!(
            layout
                .iter()
                .filter(|s| matches!(s, Segment::Scan(_)))
                .count(),
            3
        );
    }

    #[test]
    fn scottie_sync_at_end_places_sync_last() {
        let m = resolve("ScottieS1", (320, 256)).unwrap();
        let layout = line_layout(&m);
        assert_eq!(*layout.last().unwrap(), Segment::Sync);
    }

    #[test]
    fn unknown_mode_is_an_error() {
        assert!(matches!(
            resolve("NoSuchMode", (1, 1)),
            Err(SstvError::UnknownMode { .. })
        ));
    }

    #[test]
    fn native_mode_derives_scan_from_width() {
        let m = ModeDescriptor::native(640, 480);
        assert!((m.scan_ms[0] - 640.0 * (146.432 / 320.0)).abs() < 1e-9);
    }

    #[test]
    fn martin_m1_audio_length_matches_spec_scenario() {
        let m = resolve("MartinM1", (320, 256)).unwrap();
        let expected = (0.910 * 44100.0).round_ties_even() as usize
            + 256 * ((4.862 + 4.0 * 0.572 + 3.0 * 146.432) * 44.1).round_ties_even() as usize;
        assert_eq!(m.audio_len(SAMPLE_RATE), expected);
    }
}
