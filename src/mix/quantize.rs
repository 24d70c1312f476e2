//! Saturating float→i16 conversion of pre-mixed spans.
//!
//! Semantics are truncation toward zero with clamping to the 16-bit range,
//! expressed as clamp-then-truncate so the scalar and SSE2 paths agree
//! bit-for-bit on every input, NaN included (NaN clamps to -32768, matching
//! what the packed max/min sequence produces).

/// True when the running CPU can take the SSE2 path.
pub(crate) fn detect_simd() -> bool {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        std::arch::is_x86_feature_detected!("sse2")
    }
    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
    {
        false
    }
}

#[inline]
fn quantize_one(x: f32) -> i16 {
    x.max(-32768.0).min(32767.0) as i32 as i16
}

/// Convert `src` into `dst`, saturating to `[-32768, 32767]`.
pub(crate) fn quantize_span(src: &[f32], dst: &mut [i16], use_simd: bool) {
    debug_assert_eq!(src.len(), dst.len());
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    if use_simd {
        // Safety: gated on runtime SSE2 detection at mixer init.
        unsafe { quantize_span_sse2(src, dst) };
        return;
    }
    let _ = use_simd;
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = quantize_one(s);
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "sse2")]
unsafe fn quantize_span_sse2(src: &[f32], dst: &mut [i16]) {
    #[cfg(target_arch = "x86")]
    use std::arch::x86::*;
    #[cfg(target_arch = "x86_64")]
    use std::arch::x86_64::*;

    let lo = _mm_set1_ps(-32768.0);
    let hi = _mm_set1_ps(32767.0);
    let len = src.len();
    let mut i = 0;
    // Eight lanes per iteration: two f32 vectors packed into one i16 vector.
    while i + 8 <= len {
        let a = _mm_loadu_ps(src.as_ptr().add(i));
        let b = _mm_loadu_ps(src.as_ptr().add(i + 4));
        let a = _mm_min_ps(_mm_max_ps(a, lo), hi);
        let b = _mm_min_ps(_mm_max_ps(b, lo), hi);
        let ia = _mm_cvttps_epi32(a);
        let ib = _mm_cvttps_epi32(b);
        let packed = _mm_packs_epi32(ia, ib);
        _mm_storeu_si128(dst.as_mut_ptr().add(i) as *mut __m128i, packed);
        i += 8;
    }
    while i < len {
        *dst.get_unchecked_mut(i) = quantize_one(*src.get_unchecked(i));
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_toward_zero() {
        let src = [0.9, -0.9, 1.5, -1.5, 100.7, -100.7];
        let mut dst = [0i16; 6];
        quantize_span(&src, &mut dst, false);
        assert_eq!(dst, [0, 0, 1, -1, 100, -100]);
    }

    #[test]
    fn saturates_out_of_range() {
        let src = [40_000.0, -40_000.0, 32_767.4, -32_768.9, f32::NAN];
        let mut dst = [0i16; 5];
        quantize_span(&src, &mut dst, false);
        assert_eq!(dst, [32767, -32768, 32767, -32768, -32768]);
    }

    #[test]
    fn simd_matches_scalar() {
        if !detect_simd() {
            return;
        }
        let mut src = Vec::new();
        for i in -200..200 {
            src.push(i as f32 * 173.3);
            src.push(i as f32 * 0.77);
        }
        src.push(f32::NAN);
        src.push(f32::INFINITY);
        src.push(f32::NEG_INFINITY);
        let mut scalar = vec![0i16; src.len()];
        let mut simd = vec![0i16; src.len()];
        quantize_span(&src, &mut scalar, false);
        quantize_span(&src, &mut simd, true);
        assert_eq!(scalar, simd);
    }
}
