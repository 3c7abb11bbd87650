use blobfinder_core::pattern::Pattern;
use clap::{Args, ValueEnum};

#[derive(Clone, Copy, ValueEnum)]
pub enum PatternKind {
    Gaussian,
    Circular,
    RadialGradient,
    BackgroundSubtraction,
}

#[derive(Args)]
pub struct PatternArgs {
    /// Match pattern shape
    #[arg(long, value_enum, default_value = "circular")]
    pub pattern: PatternKind,

    /// Disk radius in pixels
    #[arg(long, default_value = "4.0")]
    pub radius: f64,

    /// Outer radius of the background ring (background-subtraction only)
    #[arg(long)]
    pub radius_outer: Option<f64>,

    /// Gaussian sigma in pixels (gaussian only)
    #[arg(long, default_value = "2.0")]
    pub sigma: f64,

    /// Search radius in pixels; derived from the pattern size if omitted
    #[arg(long)]
    pub search: Option<f64>,
}

impl PatternArgs {
    pub fn to_pattern(&self) -> Pattern {
        let search = self.search;
        match self.pattern {
            PatternKind::Gaussian => Pattern::Gaussian {
                sigma: self.sigma,
                search,
            },
            PatternKind::Circular => Pattern::Circular {
                radius: self.radius,
                search,
            },
            PatternKind::RadialGradient => Pattern::RadialGradient {
                radius: self.radius,
                search,
            },
            PatternKind::BackgroundSubtraction => Pattern::BackgroundSubtraction {
                radius: self.radius,
                radius_outer: self.radius_outer,
                search,
            },
        }
    }
}
