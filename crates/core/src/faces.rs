//! Face-match collaborator contract.
//!
//! Descriptor math lives entirely outside the core; this trait only exposes a
//! match-or-null lookup plus a capture hook for unrecognized faces. Whatever
//! the matcher returns is passed through the pipeline reply opaquely.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A face captured by the client, ordered left-to-right by `x` when several
/// are present in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedFace {
    #[serde(default)]
    pub x: f64,
    pub image_data: String,
}

/// A known person the matcher resolved a face to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedPerson {
    pub name: String,
    pub relation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Contract for the external face matcher.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FaceMatcher: Send + Sync {
    /// Resolves an image to a known person, or `None` for a stranger.
    async fn identify(&self, image_data: &str) -> Option<RecognizedPerson>;

    /// Saves an unrecognized face for caregiver review.
    async fn save_unknown(&self, image_data: &str);
}
