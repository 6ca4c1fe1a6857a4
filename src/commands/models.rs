//! Model catalog listing and ahead-of-time download.

use anyhow::anyhow;
use std::io::Write;

use crate::config::SottoConfig;
use crate::engine::{download, EngineModel};

/// Lists all catalog models with their download status.
///
/// # Errors
/// - If the configuration cannot be loaded
pub fn handle_models() -> Result<(), anyhow::Error> {
    let config = SottoConfig::load_or_init()?;
    let models_dir = config.models_dir()?;

    println!();
    println!(" s o t t o ");
    println!();
    println!("Available speech models:");
    println!();

    for model in EngineModel::all() {
        let selected = if model.id() == config.engine.model {
            " [SELECTED]"
        } else {
            ""
        };
        let status = if model.is_downloaded(&models_dir) {
            "downloaded"
        } else {
            "not downloaded"
        };

        println!("  {}{}", model.id(), selected);
        println!("    Name: {}", model.name());
        println!("    Info: {}", model.description());
        println!("    Size: ~{}MB, {}", model.size_mb(), status);
        println!();
    }

    println!("Models directory: {}", models_dir.display());
    println!("Select a model in ~/.config/sotto/sotto.toml ([engine] model = \"...\")");

    Ok(())
}

/// Downloads a model ahead of time with printed progress.
///
/// Without an argument, downloads the model configured in sotto.toml.
///
/// # Errors
/// - If the model id is unknown
/// - If the download fails
pub async fn handle_download(model_arg: Option<String>) -> Result<(), anyhow::Error> {
    let config = SottoConfig::load_or_init()?;
    let model_id = model_arg.unwrap_or_else(|| {
        println!(
            "No model specified, using configured model: {}",
            config.engine.model
        );
        config.engine.model.clone()
    });

    let model = EngineModel::from_id(&model_id).ok_or_else(|| {
        anyhow!(
            "Unknown model '{}'. Available models: {}",
            model_id,
            EngineModel::available_ids().join(", ")
        )
    })?;

    let models_dir = config.models_dir()?;

    if model.is_downloaded(&models_dir) {
        println!("Model '{}' is already downloaded.", model.id());
        return Ok(());
    }

    println!(
        "Downloading {} (~{}MB) to {}",
        model.name(),
        model.size_mb(),
        models_dir.display()
    );

    let mut last_percent = u32::MAX;
    let path = download::ensure_model(&model, &models_dir, |progress| {
        let percent = (progress * 100.0).round() as u32;
        if percent != last_percent {
            last_percent = percent;
            print!("\r  {percent:>3}%");
            let _ = std::io::stdout().flush();
        }
    })
    .await?;

    println!();
    println!("Model ready: {}", path.display());

    Ok(())
}
