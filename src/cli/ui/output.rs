use console::style;

/// Human-readable command output on stdout
pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    /// Aligned `label: value` line
    pub fn field(&self, label: &str, value: impl std::fmt::Display) {
        println!("  {:<18} {}", style(format!("{}:", label)).dim(), value);
    }

    /// Score colored against the quality threshold
    pub fn score(&self, label: &str, score: f64, threshold: f64) {
        let rendered = format!("{:.1}/100", score);
        let colored = if score >= threshold {
            style(rendered).green()
        } else {
            style(rendered).yellow()
        };
        self.field(label, colored);
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
