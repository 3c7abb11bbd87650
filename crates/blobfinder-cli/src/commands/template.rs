use std::path::PathBuf;

use anyhow::Result;
use blobfinder_core::pattern::{build_template, MatchPattern};
use clap::Args;

use crate::io::save_png_stretched;
use crate::pattern_args::PatternArgs;

#[derive(Args)]
pub struct TemplateArgs {
    #[command(flatten)]
    pub pattern: PatternArgs,

    /// Side length of the rendered template; defaults to the crop window
    #[arg(long)]
    pub size: Option<usize>,

    /// Output PNG path
    #[arg(short, long, default_value = "template.png")]
    pub output: PathBuf,
}

pub fn run(args: &TemplateArgs) -> Result<()> {
    let pattern = args.pattern.to_pattern();
    let size = args.size.unwrap_or(2 * pattern.crop_size());
    let template = build_template(&pattern, (size, size))?;

    println!("Pattern:     {}", pattern);
    println!("Crop size:   {}", pattern.crop_size());
    println!("Template:    {}x{}", size, size);
    println!("Sum:         {:.4}", template.sum());

    save_png_stretched(&template, &args.output)?;
    println!("Saved to {}", args.output.display());
    Ok(())
}
