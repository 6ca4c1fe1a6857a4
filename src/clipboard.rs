//! Clipboard utilities for sotto.
//!
//! Handles copying transcript text to the system clipboard using pbcopy (macOS),
//! wl-copy (Wayland), or xclip (X11).

use std::io::Write;
use std::process::{Command, Stdio};

/// Copies text to the system clipboard.
///
/// Attempts pbcopy first on macOS, then wl-copy for Wayland environments,
/// then falls back to xclip for X11. A missing clipboard tool is logged as a
/// warning, not an error; the transcript stays on screen either way.
pub fn copy_to_clipboard(text: &str) -> anyhow::Result<()> {
    #[cfg(target_os = "macos")]
    let tools: &[(&str, &[&str])] = &[
        ("pbcopy", &[]),
        ("wl-copy", &["--type", "text/plain", "--trim-newline"]),
        ("xclip", &["-selection", "clipboard", "-in", "-quiet"]),
    ];
    #[cfg(not(target_os = "macos"))]
    let tools: &[(&str, &[&str])] = &[
        ("wl-copy", &["--type", "text/plain", "--trim-newline"]),
        ("xclip", &["-selection", "clipboard", "-in", "-quiet"]),
    ];

    for (tool, args) in tools {
        match pipe_to(tool, args, text) {
            Ok(()) => {
                tracing::debug!("Transcript copied to clipboard via {tool}");
                return Ok(());
            }
            Err(e) => {
                tracing::debug!("{tool} unavailable: {e}");
            }
        }
    }

    tracing::warn!("No clipboard tool available (pbcopy, wl-copy or xclip not found)");
    Ok(())
}

/// Spawns a clipboard tool and writes the text to its stdin.
fn pipe_to(tool: &str, args: &[&str], text: &str) -> anyhow::Result<()> {
    let mut child = Command::new(tool)
        .args(args)
        .stdin(Stdio::piped())
        .spawn()?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow::anyhow!("no stdin handle"))?;
    write!(stdin, "{text}")?;
    drop(stdin);

    // Give the tool a moment to claim the clipboard before it is reaped
    std::thread::sleep(std::time::Duration::from_millis(100));
    Ok(())
}
