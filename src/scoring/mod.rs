//! Pairwise similarity scoring that drives contraction

pub mod communicability;
pub mod eigen;
pub mod embedding;

pub use communicability::{
    pair_score, Backend, Communicability, CommunicabilityScorer, Normalization,
    ScoreNormalization,
};
pub use embedding::SpectralEmbedding;

/// Grid that scores are snapped to before ordering
pub const SCORE_RESOLUTION: f64 = 1e-9;

/// Snap a score to [`SCORE_RESOLUTION`] so values that differ only by
/// floating-point noise compare equal and fall through to the tie-break
pub fn quantize(score: f64) -> f64 {
    (score / SCORE_RESOLUTION).round() * SCORE_RESOLUTION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantize_collapses_noise() {
        let a = 0.3;
        let b = 0.1 + 0.2;
        assert_ne!(a, b);
        assert_eq!(quantize(a), quantize(b));
        assert!(quantize(0.5) > quantize(0.499_999));
    }
}
