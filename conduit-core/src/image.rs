//! Image generation types (`spec.md §4.9`).

use crate::error::ConduitError;

/// Image generation configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImageGenerationConfig {
    /// Requested width in pixels.
    pub width: u32,
    /// Requested height in pixels.
    pub height: u32,
    /// Quality preset, provider-specific (e.g. `"standard"`, `"hd"`).
    pub quality: Option<String>,
    /// Style preset, provider-specific.
    pub style: Option<String>,
}

/// Image file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG.
    Png,
    /// JPEG.
    Jpeg,
    /// WebP.
    Webp,
}

/// Metadata accompanying a generated image.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeneratedImageMetadata {
    /// The prompt actually used, if the backend revised it.
    pub revised_prompt: Option<String>,
    /// Creation timestamp, if reported.
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    /// The model that generated the image.
    pub model: Option<String>,
}

/// A generated image.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeneratedImage {
    /// Raw image bytes.
    pub data: Vec<u8>,
    /// The image's encoding.
    pub format: ImageFormat,
    /// Accompanying metadata.
    pub metadata: GeneratedImageMetadata,
}

/// Maps an `(width, height)` request onto the nearest supported size by
/// aspect-ratio bucket, for backends with a fixed size menu.
///
/// Buckets: square (1:1.5 ≤ ratio ≤ 1.5:1), landscape (ratio > 1.5:1),
/// portrait (ratio < 1:1.5), per `spec.md §4.9`.
#[must_use]
pub fn nearest_supported_size(width: u32, height: u32, supported: &[(u32, u32)]) -> (u32, u32) {
    let ratio = f64::from(width) / f64::from(height);
    let bucket = |w: u32, h: u32| -> &'static str {
        let r = f64::from(w) / f64::from(h);
        if r > 1.5 {
            "landscape"
        } else if r < 1.0 / 1.5 {
            "portrait"
        } else {
            "square"
        }
    };
    let distance = |w: u32, h: u32| (f64::from(w) / f64::from(h) - ratio).abs();
    let target_bucket = bucket(width, height);

    supported
        .iter()
        .copied()
        .filter(|&(w, h)| bucket(w, h) == target_bucket)
        .min_by(|&(w1, h1), &(w2, h2)| {
            distance(w1, h1)
                .partial_cmp(&distance(w2, h2))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .or_else(|| {
            supported.iter().copied().min_by(|&(w1, h1), &(w2, h2)| {
                distance(w1, h1)
                    .partial_cmp(&distance(w2, h2))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
        })
        .expect("supported sizes must be non-empty")
}

/// Validates a prompt's length against a per-backend character cap.
///
/// Overlong prompts fail with `ConduitError::InvalidInput`, per `spec.md §4.9`.
pub fn validate_prompt_length(prompt: &str, max_chars: usize) -> Result<(), ConduitError> {
    if prompt.chars().count() > max_chars {
        return Err(ConduitError::InvalidInput(format!(
            "prompt exceeds {max_chars} character limit"
        )));
    }
    Ok(())
}

/// Maps a backend error message to `ContentFiltered` when it mentions a
/// content-policy or safety rejection, per `spec.md §4.9`.
#[must_use]
pub fn classify_image_error(message: &str) -> ConduitError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("content policy") || lower.contains("safety") {
        ConduitError::ContentFiltered(message.to_string())
    } else {
        ConduitError::GenerationFailed(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_supported_size_prefers_matching_bucket() {
        let sizes = [(512, 512), (1024, 768), (768, 1024)];
        assert_eq!(nearest_supported_size(600, 600, &sizes), (512, 512));
        assert_eq!(nearest_supported_size(1600, 900, &sizes), (1024, 768));
        assert_eq!(nearest_supported_size(900, 1600, &sizes), (768, 1024));
    }

    #[test]
    fn validate_prompt_length_rejects_overlong() {
        let prompt = "a".repeat(4001);
        assert!(validate_prompt_length(&prompt, 4000).is_err());
        assert!(validate_prompt_length("short", 4000).is_ok());
    }

    #[test]
    fn classify_image_error_detects_content_policy() {
        assert!(matches!(
            classify_image_error("Rejected due to content policy violation"),
            ConduitError::ContentFiltered(_)
        ));
        assert!(matches!(
            classify_image_error("internal server error"),
            ConduitError::GenerationFailed(_)
        ));
    }
}
