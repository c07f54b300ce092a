//! Facial-expression mood estimation.
//!
//! The estimator is advisory evidence only. The shipped implementation is a
//! randomized stub with an injectable seed; a real model plugs in behind the
//! same [`FaceSentimentEstimator`] trait.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use base64::Engine as _;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::config::FaceConfig;
use crate::error::{MoodError, Result};
use crate::mood::{Mood, MoodEstimate};

/// A decoded, validated camera frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceFrame {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
}

impl FaceFrame {
    /// Decode raw base64 or a `data:image/...;base64,` URL into a frame.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::Estimator`] when the payload is not base64 or
    /// not a PNG/JPEG image.
    pub fn from_data_url(data: &str) -> Result<Self> {
        let trimmed = data.trim();
        let encoded = match trimmed.strip_prefix("data:") {
            Some(rest) => {
                let (meta, body) = rest.split_once(',').ok_or_else(|| {
                    MoodError::Estimator("data URL has no payload separator".into())
                })?;
                if !meta.ends_with(";base64") {
                    return Err(MoodError::Estimator(
                        "data URL payload must be base64 encoded".into(),
                    ));
                }
                body
            }
            None => trimmed,
        };

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| MoodError::Estimator(format!("invalid base64 frame: {e}")))?;
        Self::from_bytes(bytes)
    }

    /// Validate already-decoded image bytes.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::Estimator`] if the bytes are not a supported image.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let image = image::load_from_memory(&bytes)
            .map_err(|e| MoodError::Estimator(format!("undecodable frame: {e}")))?;
        Ok(Self {
            width: image.width(),
            height: image.height(),
            bytes,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Maps a camera frame to a mood estimate.
#[async_trait]
pub trait FaceSentimentEstimator: Send + Sync {
    /// # Errors
    ///
    /// Implementations return [`MoodError::Estimator`] when no estimate can
    /// be produced; callers fall back to text-only fusion.
    async fn estimate(&self, frame: &FaceFrame) -> Result<MoodEstimate>;
}

/// Uniformly random mood with confidence drawn from a fixed range.
pub struct RandomFaceEstimator {
    rng: Mutex<StdRng>,
    min_confidence: u8,
    max_confidence: u8,
}

impl RandomFaceEstimator {
    /// Build from config; `config.seed` pins the sequence.
    pub fn new(config: &FaceConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
            min_confidence: config.min_confidence.min(config.max_confidence),
            max_confidence: config.max_confidence,
        }
    }
}

#[async_trait]
impl FaceSentimentEstimator for RandomFaceEstimator {
    async fn estimate(&self, _frame: &FaceFrame) -> Result<MoodEstimate> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| MoodError::Estimator("face estimator rng poisoned".into()))?;
        let mood = *Mood::ALL.choose(&mut *rng).unwrap_or(&Mood::Neutral);
        let confidence = rng.gen_range(self.min_confidence..=self.max_confidence);
        Ok(MoodEstimate::new(mood, confidence))
    }
}

/// Replays a fixed sequence of outcomes, cycling when exhausted.
///
/// `None` entries simulate an estimator failure.
pub struct FixedSequenceFaceEstimator {
    outcomes: Vec<Option<MoodEstimate>>,
    cursor: AtomicUsize,
}

impl FixedSequenceFaceEstimator {
    pub fn new(outcomes: Vec<Option<MoodEstimate>>) -> Self {
        Self {
            outcomes,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Always answer with `estimate`.
    pub fn always(estimate: MoodEstimate) -> Self {
        Self::new(vec![Some(estimate)])
    }
}

#[async_trait]
impl FaceSentimentEstimator for FixedSequenceFaceEstimator {
    async fn estimate(&self, _frame: &FaceFrame) -> Result<MoodEstimate> {
        if self.outcomes.is_empty() {
            return Err(MoodError::Estimator("no scripted face outcomes".into()));
        }
        let index = self.cursor.fetch_add(1, Ordering::SeqCst) % self.outcomes.len();
        self.outcomes[index]
            .ok_or_else(|| MoodError::Estimator("scripted face failure".into()))
    }
}

#[cfg(test)]
pub(crate) mod test_frames {
    use base64::Engine as _;
    use std::io::Cursor;

    /// A 2x2 PNG encoded as a data URL.
    pub fn tiny_png_data_url() -> String {
        let image = image::RgbImage::from_pixel(2, 2, image::Rgb([200, 120, 40]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("encode png");
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        )
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn frame() -> FaceFrame {
        FaceFrame::from_data_url(&test_frames::tiny_png_data_url()).unwrap()
    }

    #[test]
    fn data_url_decodes_png() {
        assert_eq!(frame().dimensions(), (2, 2));
    }

    #[test]
    fn raw_base64_without_prefix_accepted() {
        let url = test_frames::tiny_png_data_url();
        let raw = url.split_once(',').unwrap().1;
        assert!(FaceFrame::from_data_url(raw).is_ok());
    }

    #[test]
    fn invalid_base64_is_estimator_error() {
        let err = FaceFrame::from_data_url("data:image/png;base64,@@@").unwrap_err();
        assert!(matches!(err, MoodError::Estimator(_)));
    }

    #[test]
    fn non_image_bytes_rejected() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"not an image");
        assert!(matches!(
            FaceFrame::from_data_url(&encoded),
            Err(MoodError::Estimator(_))
        ));
    }

    #[test]
    fn non_base64_data_url_rejected() {
        assert!(FaceFrame::from_data_url("data:image/png,rawbytes").is_err());
    }

    #[tokio::test]
    async fn random_estimator_stays_in_range() {
        let estimator = RandomFaceEstimator::new(&FaceConfig {
            seed: Some(42),
            ..Default::default()
        });
        let frame = frame();
        for _ in 0..200 {
            let est = estimator.estimate(&frame).await.unwrap();
            assert!((70..=90).contains(&est.confidence), "{est:?}");
        }
    }

    #[tokio::test]
    async fn seeded_estimators_agree() {
        let config = FaceConfig {
            seed: Some(7),
            ..Default::default()
        };
        let a = RandomFaceEstimator::new(&config);
        let b = RandomFaceEstimator::new(&config);
        let frame = frame();
        for _ in 0..20 {
            assert_eq!(
                a.estimate(&frame).await.unwrap(),
                b.estimate(&frame).await.unwrap()
            );
        }
    }

    #[tokio::test]
    async fn fixed_sequence_cycles_and_fails_on_none() {
        let estimator = FixedSequenceFaceEstimator::new(vec![
            Some(MoodEstimate::new(Mood::Calm, 80)),
            None,
        ]);
        let frame = frame();
        assert_eq!(estimator.estimate(&frame).await.unwrap().mood, Mood::Calm);
        assert!(estimator.estimate(&frame).await.is_err());
        assert_eq!(estimator.estimate(&frame).await.unwrap().mood, Mood::Calm);
    }

    #[tokio::test]
    async fn empty_sequence_errors() {
        let estimator = FixedSequenceFaceEstimator::new(vec![]);
        assert!(estimator.estimate(&frame()).await.is_err());
    }
}
