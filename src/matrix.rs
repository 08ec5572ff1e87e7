//! Per-burst complex potential matrices.
//!
//! Every burst reconstructs into an `n_el x n_el` grid of complex electrode
//! potentials. The row is the excitation round, advanced each time channel
//! group 1 comes around; the column block is selected by the frame's channel
//! group. Cells no frame ever wrote keep the NaN sentinel, so "unmeasured"
//! stays distinguishable from a measured zero — the self-injection
//! electrodes typically stay unmeasured.

use num_complex::Complex32;

use crate::error::{EitError, Result};
use crate::frame::{MeasurementFrame, FRAME_CHANNELS};
use crate::setup::MeasurementSetup;

/// Sentinel for matrix cells no frame has written.
pub const UNMEASURED: Complex32 = Complex32::new(f32::NAN, f32::NAN);

/// True when a cell still carries the unmeasured sentinel.
pub fn is_unmeasured(value: Complex32) -> bool {
    value.re.is_nan() && value.im.is_nan()
}

/// Dense `n_el x n_el` complex potential grid for one burst.
#[derive(Debug, Clone, PartialEq)]
pub struct PotentialMatrix {
    n_el: usize,
    data: Vec<Complex32>,
}

impl PotentialMatrix {
    fn new(n_el: usize) -> Self {
        Self {
            n_el,
            data: vec![UNMEASURED; n_el * n_el],
        }
    }

    /// Edge length of the square grid.
    pub fn n_el(&self) -> usize {
        self.n_el
    }

    /// Cell at `(row, col)`, or `None` outside the grid.
    pub fn get(&self, row: usize, col: usize) -> Option<Complex32> {
        if row < self.n_el && col < self.n_el {
            self.data.get(row * self.n_el + col).copied()
        } else {
            None
        }
    }

    /// One excitation round as a slice of `n_el` cells.
    pub fn row(&self, row: usize) -> &[Complex32] {
        let start = row * self.n_el;
        &self.data[start..start + self.n_el]
    }

    fn write_block(&mut self, row: usize, col_start: usize, values: &[Complex32]) {
        let start = row * self.n_el + col_start;
        self.data[start..start + values.len()].copy_from_slice(values);
    }
}

impl std::ops::Index<(usize, usize)> for PotentialMatrix {
    type Output = Complex32;

    fn index(&self, (row, col): (usize, usize)) -> &Self::Output {
        &self.data[row * self.n_el + col]
    }
}

/// Assemble decoded bursts into per-burst potential matrices.
///
/// Each burst is independent: a burst whose frames do not produce exactly
/// `channel_groups` excitation rounds yields an error in its slot while its
/// siblings are still returned.
pub fn assemble(
    setup: &MeasurementSetup,
    bursts: &[Vec<MeasurementFrame>],
) -> Vec<Result<PotentialMatrix>> {
    bursts
        .iter()
        .enumerate()
        .map(|(idx, frames)| assemble_burst(setup, idx, frames))
        .collect()
}

fn assemble_burst(
    setup: &MeasurementSetup,
    burst_idx: usize,
    frames: &[MeasurementFrame],
) -> Result<PotentialMatrix> {
    let n_el = usize::from(setup.n_el);
    let expected_rounds = setup.channel_groups();
    let mut matrix = PotentialMatrix::new(n_el);
    let mut row: Option<usize> = None;
    let mut rounds = 0usize;

    for frame in frames {
        if frame.channel_group == 1 {
            row = Some(row.map_or(0, |r| r + 1));
            rounds += 1;
        }
        // Frames arriving before the first group-1 frame have no row yet.
        let Some(current) = row else { continue };
        if current >= n_el {
            continue;
        }
        let col_start = usize::from(frame.channel_group - 1) * FRAME_CHANNELS;
        matrix.write_block(current, col_start, &frame.channels);
    }

    if rounds != expected_rounds {
        return Err(EitError::IncompleteBurst {
            burst: burst_idx,
            rounds,
            expected: expected_rounds,
        });
    }

    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::BurstDecoder;
    use crate::frame::test_support::raw_frame;

    fn setup(n_el: u16, burst_count: u16) -> MeasurementSetup {
        MeasurementSetup {
            burst_count,
            n_el,
            exc_freq: 10_000.0,
            framerate: 10.0,
            amplitude: 0.001,
            inj_skip: 0,
            gain: 1,
            adc_range: 5,
        }
    }

    fn frame(group: u8, base: f32) -> MeasurementFrame {
        MeasurementFrame::decode(&raw_frame(0xB4, group, 0, base), 8).unwrap()
    }

    #[test]
    fn single_group_stream_fills_row_zero_only() {
        let s = setup(16, 3);
        let stream: Vec<u8> = (0..3)
            .flat_map(|b| raw_frame(0xB4, 1, 0, b as f32))
            .collect();
        let bursts = BurstDecoder::new(&s).decode(&stream).unwrap();
        let matrices = assemble(&s, &bursts);

        assert_eq!(matrices.len(), 3);
        for (b, result) in matrices.iter().enumerate() {
            let m = result.as_ref().unwrap();
            assert_eq!(m.n_el(), 16);
            // Row 0 written, all other rows untouched.
            assert_eq!(m[(0, 0)], Complex32::new(b as f32, -(b as f32)));
            assert_eq!(m[(0, 15)], Complex32::new(b as f32 + 15.0, -(b as f32 + 15.0)));
            for row in 1..16 {
                assert!(m.row(row).iter().copied().all(is_unmeasured));
            }
        }
    }

    #[test]
    fn two_groups_two_rounds() {
        let s = setup(32, 1);
        // Channel-group sequence [1, 2, 1, 2]: two excitation rounds.
        let frames = vec![
            frame(1, 0.0),
            frame(2, 100.0),
            frame(1, 200.0),
            frame(2, 300.0),
        ];
        let matrices = assemble(&s, &[frames]);
        let m = matrices[0].as_ref().unwrap();

        // Round 0: group 1 -> cols 0..16, group 2 -> cols 16..32.
        assert_eq!(m[(0, 0)], Complex32::new(0.0, 0.0));
        assert_eq!(m[(0, 16)], Complex32::new(100.0, -100.0));
        // Round 1.
        assert_eq!(m[(1, 0)], Complex32::new(200.0, -200.0));
        assert_eq!(m[(1, 31)], Complex32::new(315.0, -315.0));
        // No third round.
        assert!(m.row(2).iter().copied().all(is_unmeasured));
    }

    #[test]
    fn wrong_round_count_fails_only_that_burst() {
        let s = setup(32, 2);
        let good = vec![
            frame(1, 0.0),
            frame(2, 1.0),
            frame(1, 2.0),
            frame(2, 3.0),
        ];
        // One round instead of two.
        let short = vec![frame(1, 0.0), frame(2, 1.0)];
        let matrices = assemble(&s, &[good, short]);

        assert!(matrices[0].is_ok());
        assert!(matches!(
            matrices[1],
            Err(EitError::IncompleteBurst {
                burst: 1,
                rounds: 1,
                expected: 2,
            })
        ));
    }

    #[test]
    fn frames_before_first_round_are_ignored() {
        let s = setup(32, 1);
        // Group 2 before any group 1: no row to place it in.
        let frames = vec![frame(2, 9.0), frame(1, 0.0), frame(2, 1.0)];
        let matrices = assemble(&s, &[frames]);
        // Only one round: invariant violated for channel_groups = 2.
        assert!(matrices[0].is_err());
    }

    #[test]
    fn unmeasured_sentinel_differs_from_zero() {
        assert!(is_unmeasured(UNMEASURED));
        assert!(!is_unmeasured(Complex32::new(0.0, 0.0)));
        assert!(!is_unmeasured(Complex32::new(f32::NAN, 0.0)));
    }

    #[test]
    fn get_bounds_checks() {
        let m = PotentialMatrix::new(16);
        assert!(m.get(0, 0).is_some());
        assert!(m.get(16, 0).is_none());
        assert!(m.get(0, 16).is_none());
    }
}
