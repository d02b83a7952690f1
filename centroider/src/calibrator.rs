use crate::frame::{BackgroundView, FrameView};

/// Per-row margin background estimate (spec.md §4.2 step 1, §4.4): the mean,
/// over the `n` leftmost and `n` rightmost columns of a row, of
/// `frame[row, col] - bg[row, col]`. Returns zero for every row when
/// `n == 0`.
///
/// This is a separate pre-pass (rather than folded into the per-subaperture
/// loop) because it needs a full row's worth of reduction per image row,
/// unlike the per-pixel calibration step which touches each pixel exactly
/// once (spec.md §4.4).
pub fn compute_bg_row(frame: &FrameView<'_>, bg: &BackgroundView<'_>, n: u32) -> Vec<f32> {
    let height = frame.height;
    let width = frame.width;
    let mut bg_row = vec![0.0f32; height as usize];
    if n == 0 {
        return bg_row;
    }
    for row in 0..height {
        let mut sum = 0.0f32;
        for offset in 0..n {
            let left_col = offset;
            let right_col = width - offset - 1;
            sum += frame.pixel(row, left_col) - bg.pixel(row, left_col);
            sum += frame.pixel(row, right_col) - bg.pixel(row, right_col);
        }
        bg_row[row as usize] = sum / (2 * n) as f32;
    }
    bg_row
}
