use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Artistic styles the image model understands
pub const STYLE_OPTIONS: [&str; 8] = [
    "3D animated family film",
    "Design sketch",
    "Flat vector illustration",
    "Graphic novel",
    "Maximalism",
    "Midcentury retro",
    "Photorealism",
    "Soft digital painting",
];

pub fn is_known_style(style: &str) -> bool {
    STYLE_OPTIONS.contains(&style)
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
/// Body region replaced during virtual try-on
pub enum GarmentClass {
    #[default]
    UpperBody,
    LowerBody,
    FullBody,
    Footwear,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
/// How the area to replace is chosen during virtual try-on
pub enum MaskType {
    /// By garment class
    #[default]
    Garment,
    /// By a natural language description
    Prompt,
    /// By a black and white mask image, white marking the area to replace
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Quality {
    #[default]
    Standard,
    Premium,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_option_names() {
        let garments: Vec<String> = GarmentClass::iter().map(|g| g.to_string()).collect();
        assert_eq!(
            garments,
            vec!["UPPER_BODY", "LOWER_BODY", "FULL_BODY", "FOOTWEAR"]
        );
        let masks: Vec<String> = MaskType::iter().map(|m| m.to_string()).collect();
        assert_eq!(masks, vec!["GARMENT", "PROMPT", "IMAGE"]);

        assert_eq!(GarmentClass::from_str("FULL_BODY").unwrap(), GarmentClass::FullBody);
        assert!(MaskType::from_str("garment").is_err());
        assert_eq!(Quality::from_str("premium").unwrap(), Quality::Premium);
    }

    #[test]
    fn test_known_styles() {
        assert!(is_known_style("Photorealism"));
        assert!(!is_known_style("photorealism"));
        assert!(!is_known_style("Cubism"));
    }
}
