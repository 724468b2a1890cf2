//! Printers: colored headers and markdown code blocks (termimad).

use owo_colors::OwoColorize;
use termimad::MadSkin;

pub struct TextPrinter {
    pub color: Option<&'static str>,
}

impl TextPrinter {
    pub fn print(&self, text: &str) {
        println!("{}", self.paint(text));
    }

    pub fn paint(&self, text: &str) -> String {
        match self.color {
            Some("green") => text.green().to_string(),
            Some("cyan") => text.cyan().to_string(),
            Some("magenta") => text.magenta().to_string(),
            Some("yellow") => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

/// Code wrapped in a fence tagged with `language`.
pub fn fenced(code: &str, language: &str) -> String {
    format!("```{}\n{}\n```", language, code)
}

pub struct CodePrinter {
    pub skin: MadSkin,
    pub markdown: bool,
}

impl CodePrinter {
    pub fn new(markdown: bool) -> Self {
        Self { skin: MadSkin::default(), markdown }
    }

    pub fn print(&self, code: &str, language: &str) {
        let text = fenced(code, language);
        if self.markdown {
            self.skin.print_text(&text);
            println!();
        } else {
            println!("{}", text);
        }
    }
}
