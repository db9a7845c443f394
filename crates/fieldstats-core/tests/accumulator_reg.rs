//! Accumulator regression test
//!
//! Tests combination order independence, covariance symmetry, variance
//! sign and degenerate matrix repair on pixel data from a synthetic image.

use fieldstats_core::{
    PixelReader, StatisticsCode, StatisticsSlot, SymmetricMatrix, correlation_from_covariance,
    reset_for_all_variances_equal, reset_zero_variances,
};
use fieldstats_test::{RegParams, synthetic_image};

fn slot_for_rows(rows: std::ops::Range<u32>) -> (StatisticsSlot, u64) {
    let mut image = synthetic_image(12, 12, 4).unwrap();
    let mut slot = StatisticsSlot::new(4, StatisticsCode::MeanCovariance);
    let mut buf = Vec::new();
    let mut count = 0;
    for row in rows {
        image.read_pixel_row(row, 2..10, &[0, 1, 2, 3], &mut buf).unwrap();
        for pixel in buf.chunks_exact(4) {
            slot.accumulate(pixel).unwrap();
            count += 1;
        }
    }
    (slot, count)
}

// ========================================================================
// Test: combine is order independent
// ========================================================================

#[test]
fn accumulator_reg_combine_commutes() {
    let mut rp = RegParams::new("accumulator_combine");

    let (a, na) = slot_for_rows(0..5);
    let (b, nb) = slot_for_rows(5..12);

    let mut ab = StatisticsSlot::new(4, StatisticsCode::MeanCovariance);
    ab.combine(&a, false).unwrap();
    ab.combine(&b, false).unwrap();

    let mut ba = StatisticsSlot::new(4, StatisticsCode::MeanCovariance);
    ba.combine(&b, false).unwrap();
    ba.combine(&a, false).unwrap();

    rp.compare_matrices(ab.cross_products(), ba.cross_products(), 1e-9);
    for ch in 0..4 {
        rp.compare_values(ab.channels()[ch].sum, ba.channels()[ch].sum, 1e-9);
        rp.compare_values(ab.channels()[ch].minimum, ba.channels()[ch].minimum, 0.0);
        rp.compare_values(ab.channels()[ch].maximum, ba.channels()[ch].maximum, 0.0);
    }

    // Combining matches accumulating everything in one slot
    let (whole, n) = slot_for_rows(0..12);
    rp.compare_values(n as f64, (na + nb) as f64, 0.0);
    rp.compare_matrices(
        &whole.derive_covariance(n),
        &ab.derive_covariance(na + nb),
        1e-9,
    );

    assert!(rp.cleanup(), "accumulator_reg combine tests failed");
}

// ========================================================================
// Test: covariance shape
// ========================================================================

#[test]
fn accumulator_reg_covariance_properties() {
    let mut rp = RegParams::new("accumulator_covariance");

    let (slot, n) = slot_for_rows(0..12);
    let cov = slot.derive_covariance(n);
    let square = cov.as_square();
    rp.compare_values(1.0, if square.is_symmetric(0.0) { 1.0 } else { 0.0 }, 0.0);
    for v in cov.diagonal() {
        rp.compare_values(1.0, if v >= 0.0 { 1.0 } else { 0.0 }, 0.0);
    }

    let (single, _) = slot_for_rows(0..1);
    let zero = single.derive_covariance(1);
    rp.compare_matrices(&SymmetricMatrix::new(4), &zero, 0.0);

    // Variances from the vector path agree with the matrix diagonal
    rp.compare_vectors(&cov.diagonal(), &slot.variances(n), 1e-9);

    // Correlation diagonal is one for channels with spread
    let r = correlation_from_covariance(&cov);
    for i in 0..4 {
        rp.compare_values(1.0, r.get(i, i), 1e-12);
    }

    assert!(rp.cleanup(), "accumulator_reg covariance tests failed");
}

// ========================================================================
// Test: degenerate matrix repair
// ========================================================================

#[test]
fn accumulator_reg_repair() {
    let mut rp = RegParams::new("accumulator_repair");

    // Constant channel 1 gives zero variance
    let mut slot = StatisticsSlot::new(3, StatisticsCode::MeanCovariance);
    for i in 0..10 {
        slot.accumulate(&[i as f64, 5.0, (i * i) as f64]).unwrap();
    }
    let mut cov = slot.derive_covariance(10);
    rp.compare_values(0.0, cov.get(1, 1), 1e-9);

    let changed = reset_zero_variances(&mut cov, 0.1);
    rp.compare_values(1.0, if changed { 1.0 } else { 0.0 }, 0.0);
    rp.compare_values(0.1, cov.get(1, 1), 0.0);

    let once = cov.clone();
    let changed_again = reset_zero_variances(&mut cov, 0.1);
    rp.compare_values(0.0, if changed_again { 1.0 } else { 0.0 }, 0.0);
    rp.compare_matrices(&once, &cov, 0.0);

    // Two identical channels with unit variance
    let mut dup = SymmetricMatrix::from_packed(2, vec![1.0, 1.0, 1.0]).unwrap();
    rp.compare_values(
        1.0,
        if reset_for_all_variances_equal(&mut dup) { 1.0 } else { 0.0 },
        0.0,
    );
    rp.compare_values(0.0, dup.get(0, 1), 0.0);
    rp.compare_values(1.0, dup.get(1, 1), 0.0);

    assert!(rp.cleanup(), "accumulator_reg repair tests failed");
}
