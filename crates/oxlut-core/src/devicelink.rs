//! Device-link profile assembly
//!
//! Wraps a [`Lut3d`] into an RGB → RGB device-link [`IccProfile`]:
//! `desc`, `cprt`, `A2B0` (lut16) and an empty `pseq`.
//!
//! ```ignore
//! let bytes = DeviceLinkBuilder::new()
//!     .with_description("Display A to Rec.709")
//!     .encode(&Lut3d::from_grid(grid))?;
//! ```

use tracing::debug;

use crate::error::Result;
use crate::grid::ColorGrid;
use crate::icc::{
    DateTimeNumber, IccHeader, IccProfile, RenderingIntent, TagData, TagSignature, TextData,
};
use crate::lut3d::Lut3d;

/// Builder for device-link profiles
#[derive(Debug, Clone)]
pub struct DeviceLinkBuilder {
    description: String,
    copyright: String,
    unicode_description: bool,
    intent: RenderingIntent,
    creation_date: Option<DateTimeNumber>,
}

impl Default for DeviceLinkBuilder {
    fn default() -> Self {
        Self {
            description: "oxlut device link".to_string(),
            copyright: "No copyright".to_string(),
            unicode_description: false,
            intent: RenderingIntent::Perceptual,
            creation_date: None,
        }
    }
}

impl DeviceLinkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_copyright(mut self, copyright: impl Into<String>) -> Self {
        self.copyright = copyright.into();
        self
    }

    /// Also store the description as UTF-16 in the desc tag
    pub fn with_unicode_description(mut self, enabled: bool) -> Self {
        self.unicode_description = enabled;
        self
    }

    pub fn with_rendering_intent(mut self, intent: RenderingIntent) -> Self {
        self.intent = intent;
        self
    }

    /// Fixed creation date instead of the current time
    pub fn with_creation_date(mut self, date: DateTimeNumber) -> Self {
        self.creation_date = Some(date);
        self
    }

    /// Assemble the profile
    pub fn build(&self, lut: &Lut3d) -> Result<IccProfile> {
        let lut16 = lut.to_lut16()?;
        debug!(
            grid_points = lut16.grid_points,
            input_entries = lut16.input_entries(),
            output_entries = lut16.output_entries(),
            "building device link"
        );

        let date = self.creation_date.unwrap_or_else(DateTimeNumber::now);
        let mut profile = IccProfile::new(IccHeader::device_link(self.intent, date));

        let description = if self.unicode_description {
            TextData::with_unicode(self.description.clone())
        } else {
            TextData::new(self.description.clone())
        };
        profile.set_tag(TagSignature::DESC, TagData::Description(description));
        profile.set_tag(
            TagSignature::COPYRIGHT,
            TagData::Text(TextData::new(self.copyright.clone())),
        );
        profile.set_tag(TagSignature::A2B0, TagData::Lut16(lut16));
        profile.set_tag(
            TagSignature::PROFILE_SEQUENCE,
            TagData::empty_profile_sequence(),
        );

        Ok(profile)
    }

    /// Assemble a profile for a bare grid with identity curves
    pub fn build_grid(&self, grid: &ColorGrid) -> Result<IccProfile> {
        self.build(&Lut3d::from_grid(grid.clone()))
    }

    /// Assemble and serialize
    pub fn encode(&self, lut: &Lut3d) -> Result<Vec<u8>> {
        Ok(self.build(lut)?.encode()?)
    }
}
