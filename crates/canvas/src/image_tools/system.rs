use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;
use tracing::{debug, info};

use super::failure::{FailureKind, ToolFailure};
use super::generation::ImageGenerationConfig;
use super::model::{response_error, response_images, ImageModel, NOVA_CANVAS_MODEL_ID};
use super::options::{is_known_style, GarmentClass, MaskType, Quality, STYLE_OPTIONS};
use super::prompt::{check_length, negation_words, PromptStructure};
use crate::errors::{AgentError, AgentResult};
use crate::images::ImagePayload;
use crate::models::content::ImageFormat;
use crate::models::tool::{Tool, ToolCall};
use crate::systems::System;

type ToolOutcome = Result<Value, ToolFailure>;

#[derive(Debug, Deserialize)]
struct TextToImageArgs {
    prompt: Option<String>,
    structured_prompt: Option<PromptStructure>,
    negative_prompt: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    number_of_images: Option<u32>,
    quality: Option<Quality>,
    cfg_scale: Option<f64>,
    seed: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct VirtualTryOnArgs {
    source_image: String,
    reference_image: String,
    #[serde(default)]
    mask_type: MaskType,
    garment_class: Option<GarmentClass>,
    prompt_text: Option<String>,
    mask_image: Option<String>,
    style: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StyleGenerationArgs {
    source_image: String,
    style: String,
    prompt: Option<String>,
}

/// The image generation tools backed by Nova Canvas
pub struct CanvasSystem {
    tools: Vec<Tool>,
    model: Box<dyn ImageModel>,
    output_dir: Option<PathBuf>,
    saved: AtomicUsize,
}

impl CanvasSystem {
    pub fn new(model: Box<dyn ImageModel>) -> Self {
        let text_to_image = Tool::new(
            "text_to_image",
            "Generate images from a text prompt. Give either `prompt` or a \
             `structured_prompt` with at least a subject. Put things to exclude in \
             `negative_prompt` rather than negating them in the prompt.",
            json!({
                "type": "object",
                "properties": {
                    "prompt": {"type": "string", "description": "What to draw, in English."},
                    "structured_prompt": {
                        "type": "object",
                        "properties": {
                            "subject": {"type": "string"},
                            "environment": {"type": "string"},
                            "action": {"type": "string"},
                            "lighting": {"type": "string"},
                            "camera": {"type": "string"},
                            "style": {"type": "string"}
                        },
                        "required": ["subject"]
                    },
                    "negative_prompt": {"type": "string"},
                    "width": {"type": "integer", "default": 1024},
                    "height": {"type": "integer", "default": 1024},
                    "number_of_images": {"type": "integer", "minimum": 1, "maximum": 5, "default": 1},
                    "quality": {"enum": ["standard", "premium"], "default": "standard"},
                    "cfg_scale": {"type": "number", "minimum": 1.0, "maximum": 10.0, "default": 3.0},
                    "seed": {"type": "integer", "minimum": 0, "default": 0}
                }
            }),
        );

        let virtual_try_on = Tool::new(
            "virtual_try_on",
            "Dress the person or space in `source_image` with the item in \
             `reference_image`. Pass image names such as \"image_1\".",
            json!({
                "type": "object",
                "required": ["source_image", "reference_image"],
                "properties": {
                    "source_image": {"type": "string"},
                    "reference_image": {"type": "string"},
                    "mask_type": {"enum": MaskType::iter().map(|m| m.to_string()).collect::<Vec<_>>(), "default": "GARMENT"},
                    "garment_class": {"enum": GarmentClass::iter().map(|g| g.to_string()).collect::<Vec<_>>(), "default": "UPPER_BODY"},
                    "prompt_text": {"type": "string", "description": "The area to replace, required for mask_type PROMPT."},
                    "mask_image": {"type": "string", "description": "Mask image name, required for mask_type IMAGE."},
                    "style": {"enum": STYLE_OPTIONS}
                }
            }),
        );

        let style_generation = Tool::new(
            "style_generation",
            "Redraw `source_image` in one of the available artistic styles.",
            json!({
                "type": "object",
                "required": ["source_image", "style"],
                "properties": {
                    "source_image": {"type": "string"},
                    "style": {"enum": STYLE_OPTIONS},
                    "prompt": {"type": "string"}
                }
            }),
        );

        let get_styles = Tool::new(
            "get_styles",
            "List the styles, garment classes and mask types the image tools accept.",
            json!({"type": "object", "properties": {}}),
        );

        Self {
            tools: vec![text_to_image, virtual_try_on, style_generation, get_styles],
            model,
            output_dir: None,
            saved: AtomicUsize::new(0),
        }
    }

    /// Save try-on results under `dir` and report the file instead of the image data
    pub fn with_output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    async fn invoke(&self, body: Value) -> ToolOutcome {
        info!(task = %body["taskType"], "invoking image model");
        let response = self
            .model
            .invoke(NOVA_CANVAS_MODEL_ID, &body)
            .await
            .map_err(|e| {
                ToolFailure::new(FailureKind::ModelError, e.to_string()).with_steps([
                    "Check the model region and credentials",
                    "Retry in a moment",
                ])
            })?;
        if let Some(error) = response_error(&response) {
            return Err(ToolFailure::new(FailureKind::ModelError, error));
        }
        Ok(response)
    }

    async fn text_to_image(&self, arguments: Value) -> ToolOutcome {
        let args: TextToImageArgs = arguments_as(arguments)?;

        let prompt = match (&args.structured_prompt, &args.prompt) {
            (Some(structure), _) => structure.generate()?,
            (None, Some(prompt)) => {
                check_length(prompt)?;
                prompt.clone()
            }
            (None, None) => {
                return Err(ToolFailure::validation(
                    "Either 'prompt' or 'structured_prompt' must be provided",
                ))
            }
        };

        let defaults = ImageGenerationConfig::default();
        let config = ImageGenerationConfig {
            width: args.width.unwrap_or(defaults.width),
            height: args.height.unwrap_or(defaults.height),
            number_of_images: args.number_of_images.unwrap_or(defaults.number_of_images),
            quality: args.quality.unwrap_or(defaults.quality),
            cfg_scale: args.cfg_scale.unwrap_or(defaults.cfg_scale),
            seed: args.seed.unwrap_or(defaults.seed),
        };
        config.validate_parameters()?;

        let mut params = json!({ "text": prompt });
        if let Some(negative) = args.negative_prompt.as_deref().filter(|n| !n.is_empty()) {
            params["negativeText"] = json!(negative);
        }
        let response = self
            .invoke(json!({
                "taskType": "TEXT_IMAGE",
                "textToImageParams": params,
                "imageGenerationConfig": config,
            }))
            .await?;

        let images = response_images(&response);
        if images.is_empty() {
            return Err(ToolFailure::new(
                FailureKind::EmptyResponse,
                "No image data was generated",
            ));
        }

        let mut result = json!({
            "success": true,
            "images": images,
            "message": format!("Generated {} image(s)", images.len()),
            "parameters": {
                "prompt": prompt,
                "negative_prompt": args.negative_prompt,
                "width": config.width,
                "height": config.height,
                "number_of_images": config.number_of_images,
                "quality": config.quality,
                "cfg_scale": config.cfg_scale,
                "seed": config.seed,
            },
        });
        let negations = negation_words(&prompt);
        if !negations.is_empty() {
            result["negation_words"] = json!(negations);
        }
        Ok(result)
    }

    async fn virtual_try_on(&self, arguments: Value) -> ToolOutcome {
        let args: VirtualTryOnArgs = arguments_as(arguments)?;

        let mut params = Map::new();
        params.insert("sourceImage".into(), json!(image_data(&args.source_image)?));
        params.insert(
            "referenceImage".into(),
            json!(image_data(&args.reference_image)?),
        );
        params.insert("maskType".into(), json!(args.mask_type));

        match args.mask_type {
            MaskType::Garment => {
                params.insert(
                    "garmentBasedMask".into(),
                    json!({ "garmentClass": args.garment_class.unwrap_or_default() }),
                );
            }
            MaskType::Prompt => {
                let prompt = args
                    .prompt_text
                    .as_deref()
                    .filter(|p| !p.trim().is_empty())
                    .ok_or_else(|| {
                        ToolFailure::validation("prompt_text is required when mask_type is PROMPT")
                            .with_steps(["Describe the area to replace, e.g. \"the shirt\""])
                    })?;
                params.insert("promptBasedMask".into(), json!({ "prompt": prompt }));
            }
            MaskType::Image => {
                let mask = args.mask_image.as_deref().ok_or_else(|| {
                    ToolFailure::validation("mask_image is required when mask_type is IMAGE")
                })?;
                params.insert(
                    "imageBasedMask".into(),
                    json!({ "maskImage": image_data(mask)? }),
                );
            }
        }

        if let Some(style) = &args.style {
            check_style(style)?;
            params.insert("style".into(), json!(style));
        }

        let response = self
            .invoke(json!({
                "taskType": "VIRTUAL_TRY_ON",
                "virtualTryOnParams": params,
            }))
            .await?;
        let image = response_images(&response).into_iter().next().ok_or_else(|| {
            ToolFailure::new(FailureKind::EmptyResponse, "No image data was generated")
        })?;

        match &self.output_dir {
            Some(dir) => {
                let path = self.save(dir, &image)?;
                Ok(json!({
                    "success": true,
                    "image_file": path,
                    "message": "Virtual try-on finished",
                }))
            }
            None => Ok(json!({
                "success": true,
                "image": image,
                "message": "Virtual try-on finished",
            })),
        }
    }

    async fn style_generation(&self, arguments: Value) -> ToolOutcome {
        let args: StyleGenerationArgs = arguments_as(arguments)?;
        check_style(&args.style)?;
        let source = image_data(&args.source_image)?;

        let text = args
            .prompt
            .clone()
            .unwrap_or_else(|| format!("Apply {} style to this image", args.style));
        let response = self
            .invoke(json!({
                "taskType": "IMAGE_GENERATION",
                "imageGenerationParams": {
                    "text": text,
                    "images": [source],
                    "style": args.style,
                },
            }))
            .await?;
        let image = response_images(&response).into_iter().next().ok_or_else(|| {
            ToolFailure::new(FailureKind::EmptyResponse, "No image data was generated")
        })?;

        Ok(json!({
            "success": true,
            "image": image,
            "message": format!("Applied the {} style", args.style),
            "parameters": {
                "style": args.style,
                "prompt": args.prompt,
            },
        }))
    }

    fn get_styles(&self) -> Value {
        json!({
            "success": true,
            "styles": STYLE_OPTIONS,
            "garment_classes": GarmentClass::iter().map(|g| g.to_string()).collect::<Vec<_>>(),
            "mask_types": MaskType::iter().map(|m| m.to_string()).collect::<Vec<_>>(),
            "message": "Available image tool options",
        })
    }

    fn save(&self, dir: &std::path::Path, image: &str) -> Result<PathBuf, ToolFailure> {
        let bytes = STANDARD.decode(image).map_err(|e| {
            ToolFailure::new(
                FailureKind::ModelError,
                format!("invalid image data in response: {}", e),
            )
        })?;
        let index = self.saved.fetch_add(1, Ordering::SeqCst) + 1;
        let path = dir.join(format!("tryon_result_{}.png", index));
        std::fs::create_dir_all(dir)
            .and_then(|_| std::fs::write(&path, bytes))
            .map_err(|e| {
                ToolFailure::new(FailureKind::SaveError, e.to_string())
                    .with_steps(["Check that the output directory is writable"])
            })?;
        debug!(path = %path.display(), "saved try-on result");
        Ok(path)
    }
}

fn arguments_as<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolFailure> {
    serde_json::from_value(arguments)
        .map_err(|e| ToolFailure::validation(format!("Invalid parameters: {}", e)))
}

/// Tool arguments arrive with references already replaced by base64 data
fn image_data(value: &str) -> Result<String, ToolFailure> {
    ImagePayload::from_encoded(value, ImageFormat::Png)
        .map(|payload| payload.data)
        .map_err(|e| {
            ToolFailure::new(FailureKind::ImageExtractionError, e.to_string()).with_steps([
                "Upload the image again",
                "Pass the image by its name, e.g. \"image_1\"",
                "Use a PNG or JPEG image",
            ])
        })
}

fn check_style(style: &str) -> Result<(), ToolFailure> {
    if is_known_style(style) {
        return Ok(());
    }
    Err(ToolFailure::new(
        FailureKind::InvalidStyle,
        format!(
            "Unknown style '{}'. Choose one of: {}",
            style,
            STYLE_OPTIONS.join(", ")
        ),
    )
    .with_steps(["Call get_styles for the available styles"]))
}

#[async_trait]
impl System for CanvasSystem {
    fn name(&self) -> &str {
        "CanvasSystem"
    }

    fn description(&self) -> &str {
        "Image generation and editing with Amazon Nova Canvas"
    }

    fn instructions(&self) -> &str {
        "Use these tools to generate, restyle and dress images. Refer to uploaded \
         images by their names. Call get_styles before choosing a style."
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> AgentResult<String> {
        let outcome = match tool_call.name.as_str() {
            "text_to_image" => self.text_to_image(tool_call.arguments).await,
            "virtual_try_on" => self.virtual_try_on(tool_call.arguments).await,
            "style_generation" => self.style_generation(tool_call.arguments).await,
            "get_styles" => Ok(self.get_styles()),
            _ => return Err(AgentError::ToolNotFound(tool_call.name)),
        };
        Ok(outcome.unwrap_or_else(|failure| failure.to_value()).to_string())
    }
}
