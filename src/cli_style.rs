use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use crossterm::style::{Attribute, Stylize};
use unicode_width::UnicodeWidthStr;

pub fn get_styles() -> Styles {
    Styles::styled()
        .usage(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
        )
        .header(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
        )
        .literal(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .invalid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .error(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

pub mod colors {
    use crossterm::style::Color;

    pub const AMBER: Color = Color::Rgb {
        r: 255,
        g: 191,
        b: 0,
    };
    pub const GREEN: Color = Color::Rgb {
        r: 80,
        g: 220,
        b: 120,
    };
    pub const RED: Color = Color::Rgb {
        r: 255,
        g: 85,
        b: 85,
    };
    pub const TEAL: Color = Color::Rgb {
        r: 64,
        g: 200,
        b: 200,
    };
    pub const DIM: Color = Color::Rgb {
        r: 128,
        g: 128,
        b: 128,
    };
    pub const WHITE: Color = Color::Rgb {
        r: 255,
        g: 255,
        b: 255,
    };
}

const CHECK: &str = "✓";
const BULLET: &str = "●";
const BULLET_EMPTY: &str = "○";
const HORIZONTAL: &str = "─";
const VERTICAL: &str = "│";
const TOP_LEFT: &str = "╭";
const TOP_RIGHT: &str = "╮";
const BOTTOM_LEFT: &str = "╰";
const BOTTOM_RIGHT: &str = "╯";
const SECTION_WIDTH: usize = 60;

pub fn print_success(message: &str) {
    println!(
        " {} {}",
        CHECK.with(colors::GREEN).bold(),
        message.with(colors::GREEN)
    );
}

pub fn print_warning(message: &str) {
    eprintln!(" {} {}", "⚠".with(colors::AMBER).bold(), message.with(colors::AMBER));
}

/// The single line every failing command ends with.
pub fn print_error(message: &str) {
    eprintln!("{} {}", "error:".with(colors::RED).bold(), message);
}

pub fn print_section_header(title: &str) {
    let title_width = title.width();
    let left = SECTION_WIDTH.saturating_sub(title_width + 2) / 2;
    let right = SECTION_WIDTH.saturating_sub(title_width + 2 + left);
    println!(
        "{}{} {} {}{}",
        TOP_LEFT.with(colors::TEAL),
        HORIZONTAL.repeat(left).with(colors::TEAL),
        title.with(colors::AMBER).bold(),
        HORIZONTAL.repeat(right).with(colors::TEAL),
        TOP_RIGHT.with(colors::TEAL)
    );
}

pub fn print_section_footer() {
    println!(
        "{}{}{}",
        BOTTOM_LEFT.with(colors::TEAL),
        HORIZONTAL.repeat(SECTION_WIDTH).with(colors::TEAL),
        BOTTOM_RIGHT.with(colors::TEAL)
    );
}

pub fn print_key_value(key: &str, value: &str) {
    println!(
        "  {} {} {}",
        BULLET.with(colors::TEAL),
        format!("{}:", key).with(colors::DIM),
        value.with(colors::WHITE)
    );
}

pub fn print_empty_list(message: &str) {
    println!(
        "  {} {}",
        BULLET_EMPTY.with(colors::DIM),
        message.with(colors::DIM).attribute(Attribute::Italic)
    );
}

/// Plain aligned table, widths measured in terminal columns.
pub struct TableBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    col_widths: Vec<usize>,
}

impl TableBuilder {
    pub fn new(headers: &[&str]) -> Self {
        TableBuilder {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
            col_widths: headers.iter().map(|h| h.width()).collect(),
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = self.col_widths.get_mut(i) {
                *width = (*width).max(cell.width());
            }
        }
        self.rows.push(row);
    }

    fn separator(&self) -> String {
        self.col_widths
            .iter()
            .map(|w| HORIZONTAL.repeat(w + 2))
            .collect::<Vec<_>>()
            .join("┼")
    }

    fn line(&self, cells: &[String]) -> String {
        self.col_widths
            .iter()
            .enumerate()
            .map(|(i, width)| {
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                format!(" {}{} ", cell, " ".repeat(width.saturating_sub(cell.width())))
            })
            .collect::<Vec<_>>()
            .join(VERTICAL)
    }

    pub fn print(&self) {
        println!("{}", self.line(&self.headers).with(colors::AMBER).bold());
        println!("{}", self.separator().with(colors::TEAL));
        for row in &self.rows {
            println!("{}", self.line(row));
        }
    }
}
