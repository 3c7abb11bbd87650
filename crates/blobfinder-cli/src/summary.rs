use blobfinder_core::pattern::{MatchPattern, Pattern};
use blobfinder_core::pipeline::config::CorrelationConfig;
use blobfinder_core::pipeline::CorrelationResults;
use console::Style;

use crate::job::JobConfig;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    weak: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            weak: Style::new().dim().yellow(),
        }
    }
}

pub fn print_job_summary(job: &JobConfig, n_frames: usize) {
    let s = Styles::new();
    let cfg: &CorrelationConfig = &job.correlation;

    println!();
    println!("  {}", s.title.apply_to("Blobfinder"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(10)));
    println!();

    println!("  {:<14}{}", s.label.apply_to("Frames"), s.value.apply_to(n_frames));
    println!("  {:<14}{}", s.label.apply_to("Peaks"), s.value.apply_to(job.peaks.len()));
    if let Some([dy, dx]) = job.zero_shift {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Zero shift"),
            s.value.apply_to(format!("({dy}, {dx})"))
        );
    }
    println!();

    print_pattern(&s, &job.pattern);

    println!("  {}", s.header.apply_to("Correlation"));
    println!("    {:<12}{}", s.label.apply_to("Strategy"), s.method.apply_to(cfg.strategy));
    println!("    {:<12}{}", s.label.apply_to("Backend"), s.method.apply_to(cfg.backend));
    println!("    {:<12}{}", s.label.apply_to("Refine"), s.value.apply_to(cfg.upsample));
    println!("    {:<12}{}", s.label.apply_to("Pre-scale"), s.value.apply_to(cfg.prescale));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Buffers"),
        s.value.apply_to(format!("{} KiB", cfg.byte_budget / 1024))
    );
    println!();
}

fn print_pattern(s: &Styles, pattern: &Pattern) {
    println!("  {}", s.header.apply_to("Pattern"));
    println!("    {:<12}{}", s.label.apply_to("Shape"), s.method.apply_to(pattern));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Search"),
        s.value.apply_to(format!("{:.1} px", pattern.search()))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Crop size"),
        s.value.apply_to(pattern.crop_size())
    );
    println!();
}

/// Per-peak table for one frame, with weak peaks dimmed.
pub fn print_frame_results(results: &CorrelationResults, frame: usize, weak_elevation: f32) {
    let s = Styles::new();
    println!("  {}", s.header.apply_to(format!("Frame {frame}")));
    println!(
        "    {:>5} {:>12} {:>20} {:>12} {:>10}",
        s.label.apply_to("peak"),
        s.label.apply_to("center"),
        s.label.apply_to("refined"),
        s.label.apply_to("height"),
        s.label.apply_to("elevation"),
    );
    for peak in 0..results.n_peaks() {
        let r = results.get(frame, peak);
        let line = format!(
            "{:>5} {:>12} {:>20} {:>12.3} {:>10.3}",
            peak,
            format!("({}, {})", r.center[0], r.center[1]),
            format!("({:.3}, {:.3})", r.refined[0], r.refined[1]),
            r.height,
            r.elevation
        );
        if r.elevation < weak_elevation {
            println!("    {}", s.weak.apply_to(line));
        } else {
            println!("    {}", s.value.apply_to(line));
        }
    }
    println!();
}
