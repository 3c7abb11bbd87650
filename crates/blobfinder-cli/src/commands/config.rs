use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::job::JobConfig;

#[derive(Args)]
pub struct ConfigArgs {
    /// Write the job file to a path instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Print or save a default job file as TOML.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let toml_str = toml::to_string_pretty(&JobConfig::default())?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &toml_str)
            .with_context(|| format!("Failed to write job file to {}", path.display()))?;
        println!("Default job file saved to {}", path.display());
    } else {
        print!("{}", toml_str);
    }

    Ok(())
}
