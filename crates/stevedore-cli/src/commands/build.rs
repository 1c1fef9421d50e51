//! Build command - application images from Helm charts

use console::style;
use std::path::Path;
use std::sync::Arc;
use stevedore_builder::{ApplicationBuilder, ApplicationRequest, VendorOptions};

use crate::context::Context;
use crate::display::{StepProgress, field};
use crate::error::Result;
use crate::util::format_size;

pub struct BuildArgs<'a> {
    pub chart: &'a Path,
    pub output: Option<&'a Path>,
    pub overwrite: bool,
    pub from: Option<&'a Path>,
    pub repository: Option<&'a str>,
}

pub fn run(ctx: &Context, args: BuildArgs<'_>) -> Result<()> {
    let repository = args
        .repository
        .map(str::to_string)
        .or_else(|| ctx.config.repository.clone());

    let request = ApplicationRequest {
        chart_path: args.chart.to_path_buf(),
        output_path: args.output.map(Path::to_path_buf),
        overwrite: args.overwrite,
        vendor: VendorOptions {
            repository,
            ..Default::default()
        },
        from: args.from.map(Path::to_path_buf),
    };

    let progress = Arc::new(StepProgress::new());
    // Each build registers the application in its own store
    let builder = ApplicationBuilder::ephemeral()?.with_progress(progress.clone());
    let result = builder.build(&request);
    progress.finish();
    let output = result?;

    let size = std::fs::metadata(&output)?.len();
    println!(
        "{} {}",
        style("Built").green().bold(),
        output.display()
    );
    field("Size", format_size(size));

    Ok(())
}
