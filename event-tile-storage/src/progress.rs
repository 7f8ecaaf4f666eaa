/// Shared progress bar styling for long-running volume passes.
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar counting `len` items of `unit`, labelled with `message`.
pub fn progress_bar(len: u64, unit: &str, message: &'static str) -> ProgressBar {
    let template = format!(
        "[{{bar:40.green/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}}",
        unit
    );
    let style = ProgressStyle::default_bar()
        .template(&template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("▉▊▋▌▍▎▏ ");

    let pb = ProgressBar::new(len);
    pb.set_style(style);
    pb.set_message(message);
    pb
}
