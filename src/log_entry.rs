use colored::{Color, Colorize};

/// Colors handed out to services in turn. Slot 0 is reached only after a
/// full cycle, so the first service gets slot 1.
pub const PALETTE: [Color; 8] = [
    Color::BrightWhite,
    Color::BrightBlack,
    Color::BrightRed,
    Color::BrightGreen,
    Color::BrightYellow,
    Color::BrightBlue,
    Color::BrightMagenta,
    Color::BrightCyan,
];

const SEPARATOR: &str = " | ";

/// Color for the service at 1-based position `index` in discovery order
pub fn palette_color(index: usize) -> Color {
    PALETTE[index % PALETTE.len()]
}

/// Width of the label column: the longest service name
pub fn label_width<'a>(services: impl IntoIterator<Item = &'a str>) -> usize {
    services
        .into_iter()
        .map(|service| service.chars().count())
        .max()
        .unwrap_or(0)
}

/// One line of container output, attributed to its service
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub service: String,
    pub color: Color,
    pub text: String,
}

impl LogLine {
    /// Builds a line for `service`, drawn in `color` when color is on
    pub fn new(service: impl Into<String>, color: Color, text: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            color,
            text: text.into(),
        }
    }

    /// Full output line including the trailing newline, e.g. `web_1   | listening`.
    /// With color on, the label and separator are wrapped in the service color.
    pub fn render(&self, width: usize, color: bool) -> String {
        let label = format!("{:<width$}{}", self.service, SEPARATOR, width = width);

        if color {
            format!("{}{}\n", label.color(self.color), self.text)
        } else {
            format!("{}{}\n", label, self.text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_cycles_from_one() {
        assert_eq!(palette_color(1), Color::BrightBlack);
        assert_eq!(palette_color(7), Color::BrightCyan);
        assert_eq!(palette_color(8), Color::BrightWhite);
        assert_eq!(palette_color(3), palette_color(3 + PALETTE.len()));
        assert_ne!(palette_color(3), palette_color(4));
    }

    #[test]
    fn test_label_width_is_longest_name() {
        assert_eq!(label_width(["web_1", "redis_1", "db"]), 7);
        assert_eq!(label_width(Vec::<&str>::new()), 0);
        assert_eq!(label_width(["café"]), 4);
    }

    #[test]
    fn test_render_pads_label() {
        let line = LogLine::new("db", Color::Red, "ready to accept connections");
        assert_eq!(line.render(7, false), "db      | ready to accept connections\n");

        let line = LogLine::new("redis_1", Color::Red, "");
        assert_eq!(line.render(7, false), "redis_1 | \n");
    }

    #[test]
    fn test_render_colors_label_only() {
        colored::control::set_override(true);
        let line = LogLine::new("web", Color::Red, "GET /");
        let rendered = line.render(3, true);

        assert!(rendered.starts_with("\u{1b}["));
        assert!(rendered.contains("web | "));
        assert!(rendered.ends_with("\u{1b}[0mGET /\n"));
    }
}
