//! Progress display for table processing.
//!
//! Uncompressed exports get a byte-position bar; compressed ones only report
//! rows read, since the decoder hides how far into the file we are.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};

pub struct ProgressBar {
    bar: IndicatifBar,
}

impl ProgressBar {
    /// Bar over `total` bytes of input
    pub fn new(total: usize, label: &str) -> Self {
        let bar = IndicatifBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {percent:>3}% ({bytes}/{total_bytes}) {eta}")
        {
            bar.set_style(style.progress_chars("█░"));
        }
        bar.set_message(label.to_string());
        Self { bar }
    }

    /// Spinner counting rows, for inputs of unknown length
    pub fn new_spinner(label: &str) -> Self {
        let bar = IndicatifBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{msg} {spinner} {pos} rows") {
            bar.set_style(style);
        }
        bar.set_message(label.to_string());
        Self { bar }
    }

    /// Draws nothing; messages still reach stderr
    pub fn hidden() -> Self {
        Self {
            bar: IndicatifBar::hidden(),
        }
    }

    pub fn update(&self, current: usize) {
        self.bar.set_position(current as u64);
    }

    pub fn finish_with_message(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Print above the bar, or straight to stderr when hidden
    pub fn println<S: AsRef<str>>(&self, msg: S) {
        if self.bar.is_hidden() {
            eprintln!("{}", msg.as_ref());
        } else {
            self.bar.println(msg.as_ref());
        }
    }
}
