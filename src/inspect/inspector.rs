use crate::assets::probe::SpatialVideoAsset;
use crate::foundation::core::TrackGeometry;
use crate::foundation::error::{FlatviewError, FlatviewResult};

/// Container metadata identifier that marks a capture as spatial (stereoscopic) video.
pub const SPATIAL_FORMAT_IDENTIFIER: &str = "com.apple.quicktime.spatial.format-version";

/// Options for [`inspect`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct InspectOpts {
    /// Metadata identifier whose presence marks the asset as spatial.
    pub spatial_identifier: String,
}

impl Default for InspectOpts {
    fn default() -> Self {
        Self {
            spatial_identifier: SPATIAL_FORMAT_IDENTIFIER.to_string(),
        }
    }
}

/// Result of inspecting a source asset.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Inspection {
    /// Whether the spatial-format identifier is present.
    pub is_spatial: bool,
    /// Geometry of the first video track.
    pub geometry: TrackGeometry,
}

impl Inspection {
    /// Return the geometry, or [`FlatviewError::NotSpatialVideo`] when the tag is absent.
    pub fn require_spatial(self) -> FlatviewResult<TrackGeometry> {
        if !self.is_spatial {
            return Err(FlatviewError::not_spatial(
                "source carries no spatial-format metadata item",
            ));
        }
        Ok(self.geometry)
    }
}

/// Determine whether `asset` is spatial and extract the first video track's geometry.
///
/// Fails with [`FlatviewError::InvalidVideo`] when there is no video track or it has no size.
/// A missing spatial tag is not an error here; see [`Inspection::require_spatial`].
pub fn inspect(asset: &SpatialVideoAsset, opts: &InspectOpts) -> FlatviewResult<Inspection> {
    let is_spatial = asset.metadata_value(&opts.spatial_identifier).is_some();

    let track = asset.first_video_track().ok_or_else(|| {
        FlatviewError::invalid_video(format!(
            "'{}' has no video track",
            asset.source_path.display()
        ))
    })?;
    if track.natural_size.is_empty() {
        return Err(FlatviewError::invalid_video(format!(
            "video track {} has no pixel dimensions",
            track.stream_index
        )));
    }

    let geometry = TrackGeometry {
        orientation: track.orientation,
        natural_size: track.natural_size,
    };
    tracing::debug!(
        is_spatial,
        natural = %geometry.natural_size,
        applied = %geometry.applied_size(),
        rotation = geometry.orientation.rotation_degrees(),
        "inspected source"
    );
    Ok(Inspection {
        is_spatial,
        geometry,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/inspect/inspector.rs"]
mod tests;
