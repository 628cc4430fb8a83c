//! Transform command handler

use super::utils::{read_document, render_document};
use crate::cli::TransformArgs;
use crate::config::Config;
use crate::error::Result;
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use reshape_core::Transformer;
use std::fs;

/// Handle the transform command
pub fn handle_transform(args: TransformArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let source = read_document(&args.source)?;
    let spec = read_document(&args.spec)?;

    let transformer = Transformer::new(config.transformer.clone());
    let timer = Timer::new("transform");
    let target = transformer.transform(&source, &spec)?;
    tracing::info!(
        source = %args.source.display(),
        spec = %args.spec.display(),
        duration_ms = timer.elapsed().as_millis() as u64,
        "Transform completed"
    );

    let compact = args.compact || config.output.compact;
    match &args.save_to {
        Some(path) => {
            fs::write(path, render_document(&target, path, compact)?)?;
            output.success(&format!("✓ Target saved to {}", path.display()))?;
        }
        None => output.document(&target, compact)?,
    }

    Ok(())
}
