use serde::{Deserialize, Serialize};

use super::failure::ToolFailure;
use super::options::Quality;

pub const MIN_IMAGE_SIZE: u32 = 320;
pub const MAX_IMAGE_SIZE: u32 = 4096;
pub const MAX_PIXEL_COUNT: u64 = 4_194_304;
pub const MAX_ASPECT_RATIO: f64 = 4.0;
pub const MAX_IMAGES: u32 = 5;
pub const MIN_CFG_SCALE: f64 = 1.0;
pub const MAX_CFG_SCALE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
/// Output settings for text to image, sent as `imageGenerationConfig`
pub struct ImageGenerationConfig {
    pub width: u32,
    pub height: u32,
    pub number_of_images: u32,
    pub quality: Quality,
    pub cfg_scale: f64,
    pub seed: i64,
}

impl Default for ImageGenerationConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
            number_of_images: 1,
            quality: Quality::Standard,
            cfg_scale: 3.0,
            seed: 0,
        }
    }
}

impl ImageGenerationConfig {
    pub fn validate_dimensions(&self) -> Result<(), ToolFailure> {
        if self.width > MAX_IMAGE_SIZE || self.height > MAX_IMAGE_SIZE {
            return Err(ToolFailure::validation(format!(
                "Width and height must be at most {} pixels",
                MAX_IMAGE_SIZE
            ))
            .with_steps(["Pick a smaller size"]));
        }
        if self.width < MIN_IMAGE_SIZE || self.height < MIN_IMAGE_SIZE {
            return Err(ToolFailure::validation(format!(
                "Width and height must be at least {} pixels",
                MIN_IMAGE_SIZE
            ))
            .with_steps(["Pick a larger size"]));
        }
        if u64::from(self.width) * u64::from(self.height) > MAX_PIXEL_COUNT {
            return Err(ToolFailure::validation(format!(
                "Total pixel count must not exceed {}",
                MAX_PIXEL_COUNT
            ))
            .with_steps(["Reduce the width or the height"]));
        }
        let (long, short) = if self.width >= self.height {
            (self.width, self.height)
        } else {
            (self.height, self.width)
        };
        if f64::from(long) / f64::from(short) > MAX_ASPECT_RATIO {
            return Err(ToolFailure::validation(format!(
                "Aspect ratio must be at most {}:1",
                MAX_ASPECT_RATIO
            ))
            .with_steps(["Bring the width and height closer together"]));
        }
        Ok(())
    }

    pub fn validate_parameters(&self) -> Result<(), ToolFailure> {
        self.validate_dimensions()?;

        if !(1..=MAX_IMAGES).contains(&self.number_of_images) {
            return Err(ToolFailure::validation(format!(
                "Number of images must be between 1 and {}",
                MAX_IMAGES
            )));
        }
        if !(MIN_CFG_SCALE..=MAX_CFG_SCALE).contains(&self.cfg_scale) {
            return Err(ToolFailure::validation(format!(
                "cfg_scale must be between {:.1} and {:.1}",
                MIN_CFG_SCALE, MAX_CFG_SCALE
            ))
            .with_steps(["Lower values vary more, higher values follow the prompt closely"]));
        }
        if self.seed < 0 {
            return Err(ToolFailure::validation("Seed must be 0 or greater"));
        }
        Ok(())
    }
}
