use anyhow::{anyhow, Context, Result};
use console::style;
use serde_json::{json, Value};
use std::io::Read;
use std::path::Path;

use canvas::cache;
use canvas::configuration::Settings;
use canvas::images::{resolve_references, ImagePayload, ImageStore};
use canvas::models::content::ImageFormat;
use canvas::models::message::Conversation;
use canvas::outcome::ResultOutcome;
use canvas::result_parser;

/// Decode a raw tool result and pair it with its user-facing outcome
pub fn parse(file: Option<&Path>) -> Result<String> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            buffer
        }
    };
    // Shells append a line ending that is not part of the tool's output.
    let raw = raw.trim_end_matches(['\r', '\n']);

    let parsed = result_parser::parse(raw);
    let outcome = ResultOutcome::from(&parsed);
    if outcome.is_failure() {
        eprintln!("{}", style("tool reported a failure").red());
    }

    let report = json!({ "parsed": parsed, "outcome": outcome });
    Ok(serde_json::to_string_pretty(&report)?)
}

pub fn annotate(file: &Path, model: Option<&str>, config: Option<&Path>) -> Result<String> {
    let settings = match config {
        Some(path) => Settings::from_file(path),
        None => Settings::new(),
    }
    .context("Failed to load settings")?;

    let capabilities = match model {
        Some(id) => settings.capabilities_for(id)?,
        None => settings.capabilities()?,
    };

    let conversation: Conversation = read_json(file)?;
    let annotated = cache::annotate(&conversation, &capabilities.cache_support);
    tracing::info!(
        messages = annotated.len(),
        "annotated conversation for {}",
        model.unwrap_or(&settings.model_id)
    );

    Ok(serde_json::to_string_pretty(&annotated)?)
}

pub fn resolve(file: &Path, images: &[String]) -> Result<String> {
    let mut store = ImageStore::new();
    for entry in images {
        let (name, path) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected NAME=PATH, got '{}'", entry))?;
        store.put(name, load_image(Path::new(path))?);
    }

    let arguments: Value = read_json(file)?;
    let resolved = resolve_references(&arguments, &store)?;
    Ok(serde_json::to_string_pretty(&resolved)?)
}

fn load_image(path: &Path) -> Result<ImagePayload> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read image {}", path.display()))?;
    let format = ImageFormat::from_extension(path)
        .or_else(|| ImagePayload::sniff(&bytes))
        .ok_or_else(|| anyhow!("Unrecognized image format: {}", path.display()))?;
    Ok(ImagePayload::from_bytes(&bytes, format)?)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}
