use wide::f32x8;

/// Compute cosine similarity between two equal-length vectors using SIMD
/// operations. Vectors are not assumed to be normalized; the magnitudes are
/// accumulated alongside the dot product.
///
/// A zero-norm input makes the denominator zero and the result NaN. That is
/// intentional: callers rank NaN below every finite similarity instead of
/// clamping it away.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "cosine inputs must share dimensions");

    let mut dot_product = f32x8::splat(0.0);
    let mut mag_a = f32x8::splat(0.0);
    let mut mag_b = f32x8::splat(0.0);

    let len = a.len().min(b.len());
    let simd_len = len - (len % 8);

    for i in (0..simd_len).step_by(8) {
        let va = f32x8::new([
            a[i],
            a[i + 1],
            a[i + 2],
            a[i + 3],
            a[i + 4],
            a[i + 5],
            a[i + 6],
            a[i + 7],
        ]);
        let vb = f32x8::new([
            b[i],
            b[i + 1],
            b[i + 2],
            b[i + 3],
            b[i + 4],
            b[i + 5],
            b[i + 6],
            b[i + 7],
        ]);
        dot_product += va * vb;
        mag_a += va * va;
        mag_b += vb * vb;
    }

    let mut scalar_dot_product = dot_product.reduce_add();
    let mut scalar_mag_a = mag_a.reduce_add();
    let mut scalar_mag_b = mag_b.reduce_add();

    // Remaining elements past the last full lane.
    for i in simd_len..len {
        scalar_dot_product += a[i] * b[i];
        scalar_mag_a += a[i] * a[i];
        scalar_mag_b += b[i] * b[i];
    }

    scalar_dot_product / (scalar_mag_a.sqrt() * scalar_mag_b.sqrt())
}
