//! Shared helper functions for CLI commands.

/// Truncate a string for single-line display. Cuts on character
/// boundaries so multibyte titles never split mid-glyph.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
