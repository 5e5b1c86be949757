//! Hook executor - interprets HookStep variants and performs the file operations.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{HookStep, TargetOverlay};

use super::context::HookContext;

/// Run the configure-hook of `overlay`. Overlays without a hook are a no-op.
pub fn run(ctx: &HookContext, overlay: &TargetOverlay) -> Result<()> {
    if overlay.hook().is_empty() {
        return Ok(());
    }

    println!("Running configure hook for {}...", overlay.name());

    for step in overlay.hook() {
        if ctx.debug() {
            println!("  {:?}", step);
        }
        execute_step(ctx, overlay, step)
            .with_context(|| format!("in configure hook of '{}': {:?}", overlay.name(), step))?;
    }

    Ok(())
}

fn execute_step(ctx: &HookContext, overlay: &TargetOverlay, step: &HookStep) -> Result<()> {
    match step {
        // ─────────────────────────────────────────────────────────────────────
        // Explicit parent call
        // ─────────────────────────────────────────────────────────────────────
        HookStep::Parent => {
            let Some(base) = overlay.base() else {
                bail!("'{}' has no base overlay to run", overlay.name());
            };
            run(ctx, base)?;
        }

        // ─────────────────────────────────────────────────────────────────────
        // Directory operations
        // ─────────────────────────────────────────────────────────────────────
        HookStep::Mkdir { path } => {
            fs::create_dir_all(ctx.path(path))?;
        }

        // ─────────────────────────────────────────────────────────────────────
        // File operations
        // ─────────────────────────────────────────────────────────────────────
        HookStep::Copy { from, to } => {
            copy_file(&ctx.path(from), &ctx.path(to), written_as_dir(to))?;
        }

        HookStep::CopyMatching {
            from,
            extension,
            to,
        } => {
            let src_dir = ctx.path(from);
            let mut sources = Vec::new();
            for entry in
                fs::read_dir(&src_dir).with_context(|| format!("reading {}", src_dir.display()))?
            {
                let path = entry
                    .with_context(|| format!("reading {}", src_dir.display()))?
                    .path();
                if path.is_file()
                    && path.extension().and_then(|e| e.to_str()) == Some(extension.as_str())
                {
                    sources.push(path);
                }
            }
            sources.sort();

            let dst_dir = ctx.path(to);
            for src in &sources {
                copy_file(src, &dst_dir, true)?;
            }
        }
    }

    Ok(())
}

/// Whether a destination was written as a directory (`some/dir/`).
fn written_as_dir(path: &Path) -> bool {
    path.as_os_str().to_string_lossy().ends_with('/')
}

/// Copy `src` to `dst`. When `dst` is (or is written as) a directory the file
/// keeps its name.
fn copy_file(src: &Path, dst: &Path, into_dir: bool) -> Result<PathBuf> {
    if !src.is_file() {
        bail!("file not found: {}", src.display());
    }

    let target = if into_dir || dst.is_dir() {
        fs::create_dir_all(dst)?;
        let name = src
            .file_name()
            .with_context(|| format!("no file name in {}", src.display()))?;
        dst.join(name)
    } else {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        dst.to_path_buf()
    };

    fs::copy(src, &target)
        .with_context(|| format!("copying {} to {}", src.display(), target.display()))?;
    Ok(target)
}
