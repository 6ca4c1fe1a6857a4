//! Resumable model download.
//!
//! Model files are fetched over HTTP into a `<filename>.partial` sidecar and
//! renamed into place once complete. An existing partial file resumes with a
//! byte-range request; a server that answers a range request with a plain
//! 200 gets a clean restart instead of a corrupted append.

use anyhow::{anyhow, Result};
use futures_util::StreamExt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::catalog::EngineModel;

/// Ensures the model file exists locally, downloading it if necessary.
///
/// `on_progress` receives the completed fraction in [0, 1]; it fires once
/// with 1.0 immediately if the file is already present.
///
/// # Errors
/// - If the models directory cannot be created
/// - If the HTTP request fails or returns an error status
/// - If writing the partial file or the final rename fails
pub async fn ensure_model(
    model: &EngineModel,
    models_dir: &Path,
    mut on_progress: impl FnMut(f32),
) -> Result<PathBuf> {
    let model_path = model.path_in(models_dir);
    let partial_path = models_dir.join(format!("{}.partial", model.filename()));

    if model_path.is_file() {
        tracing::debug!("Model already present: {}", model_path.display());
        // Clean up any partial file left over from an interrupted download
        if partial_path.exists() {
            let _ = fs::remove_file(&partial_path);
        }
        on_progress(1.0);
        return Ok(model_path);
    }

    fs::create_dir_all(models_dir)?;

    // Check if we have a partial download to resume
    let mut resume_from = if partial_path.exists() {
        let size = partial_path.metadata()?.len();
        tracing::info!("Resuming model download from byte {}", size);
        size
    } else {
        tracing::info!("Downloading model {} from {}", model.id(), model.url());
        0
    };

    let client = reqwest::Client::new();
    let mut request = client.get(model.url());

    if resume_from > 0 {
        request = request.header("Range", format!("bytes={}-", resume_from));
    }

    let mut response = request.send().await?;

    // If we tried to resume but the server returned 200 (not 206 Partial
    // Content), it doesn't support range requests. Delete the partial file
    // and restart fresh to avoid appending the full body to a partial one.
    if resume_from > 0 && response.status() == reqwest::StatusCode::OK {
        tracing::warn!(
            "Server doesn't support range requests for model {}, restarting download",
            model.id()
        );
        drop(response);
        let _ = fs::remove_file(&partial_path);
        resume_from = 0;
        response = client.get(model.url()).send().await?;
    }

    if !response.status().is_success()
        && response.status() != reqwest::StatusCode::PARTIAL_CONTENT
    {
        return Err(anyhow!(
            "Failed to download model: HTTP {}",
            response.status()
        ));
    }

    let total_size = if resume_from > 0 {
        resume_from + response.content_length().unwrap_or(0)
    } else {
        response.content_length().unwrap_or(0)
    };

    let mut downloaded = resume_from;
    let mut stream = response.bytes_stream();

    let mut file = if resume_from > 0 {
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&partial_path)?
    } else {
        fs::File::create(&partial_path)?
    };

    on_progress(fraction(downloaded, total_size));

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        on_progress(fraction(downloaded, total_size));
    }

    file.flush()?;
    drop(file);

    fs::rename(&partial_path, &model_path)?;
    on_progress(1.0);

    tracing::info!(
        "Model downloaded: {} ({} bytes)",
        model_path.display(),
        downloaded
    );

    Ok(model_path)
}

/// Completed fraction of a download, clamped to [0, 1].
fn fraction(downloaded: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    (downloaded as f64 / total as f64).clamp(0.0, 1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_handles_unknown_total() {
        assert_eq!(fraction(1000, 0), 0.0);
    }

    #[test]
    fn fraction_clamps_overshoot() {
        // A resumed download whose server omits Content-Length can overshoot
        assert_eq!(fraction(150, 100), 1.0);
    }

    #[test]
    fn fraction_midpoint() {
        assert!((fraction(42, 100) - 0.42).abs() < 1e-6);
    }

    #[tokio::test]
    async fn already_present_model_short_circuits() {
        let dir = std::env::temp_dir().join(format!("sotto-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let model = EngineModel::WhisperTinyEn;
        fs::write(model.path_in(&dir), b"stub").unwrap();

        let mut reports = Vec::new();
        let path = ensure_model(&model, &dir, |p| reports.push(p)).await.unwrap();

        assert_eq!(path, model.path_in(&dir));
        assert_eq!(reports, vec![1.0]);

        fs::remove_dir_all(&dir).unwrap();
    }
}
