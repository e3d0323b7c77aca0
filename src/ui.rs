use console::{style, Term};
use dialoguer::{Confirm, Input, MultiSelect, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::{
    error::InstallerError,
    labels::{Labels, Language},
    prompt::{Answer, ChoiceItem, Prompt, Selection},
};

/// Typed into a text or password field to back out of it.
pub const CANCEL_TOKEN: &str = ":q";

// ── Terminal helpers ──────────────────────────────────────────────────────────

fn term_width() -> usize {
    Term::stdout().size().1.max(60) as usize
}

// ── Banner ────────────────────────────────────────────────────────────────────

pub fn print_banner() {
    let _ = Term::stdout().clear_screen();

    let logo = [
        r"    █████╗ ██████╗  ██████╗██╗  ██╗",
        r"   ██╔══██╗██╔══██╗██╔════╝██║  ██║",
        r"   ███████║██████╔╝██║     ███████║",
        r"   ██╔══██║██╔══██╗██║     ██╔══██║",
        r"   ██║  ██║██║  ██║╚██████╗██║  ██║",
        r"   ╚═╝  ╚═╝╚═╝  ╚═╝ ╚═════╝╚═╝  ╚═╝",
    ];

    println!();
    for line in &logo {
        println!("{}", style(line).cyan().bold());
    }
    println!();
    println!(
        "{}",
        style(format!(
            "   Linux Installer  ·  menu driven  ·  v{}",
            env!("CARGO_PKG_VERSION")
        ))
        .dim()
        .italic()
    );
    println!();
    println!("{}", style("─".repeat(term_width().min(52))).dim());
    println!();
}

// ── Step header ───────────────────────────────────────────────────────────────

/// Prints a visually distinct numbered step header.
pub fn print_step(step: u8, total: u8, title: &str) {
    println!();
    let tag = style(format!(" {}/{} ", step, total)).black().on_cyan().bold();
    let heading = style(format!("  {}", title)).white().bold();
    println!("{}{}", tag, heading);
    println!("{}", style("─".repeat(term_width().min(52))).dim());
}

// ── Feedback messages ─────────────────────────────────────────────────────────

pub fn print_success(msg: &str) {
    println!("  {}  {}", style("✓").green().bold(), style(msg).green());
}

pub fn print_info(msg: &str) {
    println!("  {}  {}", style("→").blue().bold(), msg);
}

pub fn print_warning(msg: &str) {
    println!("  {}  {}", style("⚠").yellow().bold(), style(msg).yellow());
}

/// Written to stderr.
pub fn print_error(msg: &str) {
    eprintln!("  {}  {}", style("✗").red().bold(), style(msg).red());
}

// ── Info box ──────────────────────────────────────────────────────────────────

/// Renders a bordered key→value box in the terminal.
///
/// ```text
/// ┌─ Current configuration ───────────────────────┐
/// │  Disk                  /dev/sda               │
/// │  Partitioning          auto_ext4              │
/// └───────────────────────────────────────────────┘
/// ```
pub fn print_kv_box(title: &str, rows: &[(&str, &str)]) {
    const BOX_INNER: usize = 48;
    const KEY_WIDTH: usize = 22;

    let dashes = "─".repeat(BOX_INNER.saturating_sub(title.chars().count() + 2));
    println!(
        "  ┌─ {} {}┐",
        style(title).white().bold(),
        style(&dashes).dim()
    );

    for (key, val) in rows {
        // Pad by chars: Cyrillic labels are multi-byte.
        let pad = " ".repeat(KEY_WIDTH.saturating_sub(key.chars().count()));
        println!(
            "  │  {}{}{}",
            style(*key).dim(),
            pad,
            style(*val).white().bold()
        );
    }

    println!("  └{}┘", style("─".repeat(BOX_INNER + 2)).dim());
}

// ── Spinner ───────────────────────────────────────────────────────────────────

/// Returns a running braille spinner.
/// Call `pb.finish_and_clear()` (or the `done_spinner` helper) when done.
pub fn spinner(msg: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("  {spinner:.cyan.bold}  {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
    pb.set_style(style);
    pb.set_message(msg.into());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Clears the spinner and prints a success message in its place.
pub fn done_spinner(pb: ProgressBar, msg: &str) {
    pb.finish_and_clear();
    print_success(msg);
}

// ── Terminal prompt ───────────────────────────────────────────────────────────

/// [`Prompt`] on a real terminal: dialoguer widgets for questions and an
/// indicatif bar for the installation gauge.
///
/// Esc backs out of lists and confirmations; text and password fields are
/// left by typing [`CANCEL_TOKEN`].
pub struct DialoguerPrompt {
    labels: Labels,
    gauge: Option<ProgressBar>,
}

impl DialoguerPrompt {
    pub fn new(language: Language) -> Self {
        Self {
            labels: Labels::new(language),
            gauge: None,
        }
    }

    fn label(&self, key: &str) -> String {
        self.labels.render(key).into_owned()
    }

    fn text_answer(value: String) -> Answer<String> {
        if value.trim() == CANCEL_TOKEN {
            Answer::Cancelled
        } else {
            Answer::Given(value.trim().to_string())
        }
    }
}

impl Prompt for DialoguerPrompt {
    fn message(&mut self, key: &str) -> Result<(), InstallerError> {
        let text = self.label(key);
        if key.starts_with("error_") || key == "passwords_dont_match" {
            print_warning(&text);
        } else {
            print_info(&text);
        }
        Ok(())
    }

    fn confirm(&mut self, key: &str) -> Result<bool, InstallerError> {
        let answer = Confirm::new()
            .with_prompt(self.label(key))
            .default(false)
            .interact_opt()?;
        Ok(answer.unwrap_or(false))
    }

    fn text(&mut self, key: &str, initial: &str) -> Selection<String> {
        let value: String = Input::new()
            .with_prompt(format!("{} ({} = back)", self.label(key), CANCEL_TOKEN))
            .with_initial_text(initial)
            .allow_empty(true)
            .interact_text()?;
        Ok(Self::text_answer(value))
    }

    fn secret(&mut self, key: &str) -> Selection<String> {
        let value = Password::new()
            .with_prompt(format!("{} ({} = back)", self.label(key), CANCEL_TOKEN))
            .allow_empty_password(true)
            .interact()?;
        // Passwords are taken as typed, surrounding spaces included.
        Ok(if value == CANCEL_TOKEN {
            Answer::Cancelled
        } else {
            Answer::Given(value)
        })
    }

    fn single_choice(&mut self, key: &str, items: &[ChoiceItem]) -> Selection<String> {
        if items.is_empty() {
            return Ok(Answer::Cancelled);
        }
        let labels: Vec<String> = items.iter().map(|i| self.label(&i.label)).collect();
        let default = items.iter().position(|i| i.on).unwrap_or(0);

        let picked = Select::new()
            .with_prompt(self.label(key))
            .items(&labels)
            .default(default)
            .interact_opt()?;
        Ok(match picked {
            Some(idx) => Answer::Given(items[idx].tag.clone()),
            None => Answer::Cancelled,
        })
    }

    fn multi_choice(&mut self, key: &str, items: &[ChoiceItem]) -> Selection<Vec<String>> {
        let labels: Vec<String> = items.iter().map(|i| self.label(&i.label)).collect();
        let defaults: Vec<bool> = items.iter().map(|i| i.on).collect();

        let picked = MultiSelect::new()
            .with_prompt(self.label(key))
            .items(&labels)
            .defaults(&defaults)
            .interact_opt()?;
        Ok(match picked {
            Some(mut idx) => {
                idx.sort_unstable();
                Answer::Given(idx.into_iter().map(|i| items[i].tag.clone()).collect())
            }
            None => Answer::Cancelled,
        })
    }

    fn menu(&mut self, key: &str, items: &[(String, String)]) -> Selection<String> {
        let labels: Vec<String> = items
            .iter()
            .map(|(tag, label)| format!("{:>3}  {}", tag, self.label(label)))
            .collect();

        let picked = Select::new()
            .with_prompt(self.label(key))
            .items(&labels)
            .default(0)
            .interact_opt()?;
        Ok(match picked {
            Some(idx) => Answer::Given(items[idx].0.clone()),
            None => Answer::Cancelled,
        })
    }

    fn gauge_start(&mut self, key: &str) {
        println!();
        print_info(&self.label(key));
        let pb = ProgressBar::new(100);
        let style = ProgressStyle::with_template("  [{bar:40.cyan/blue}] {pos:>3}%  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        self.gauge = Some(pb);
    }

    fn gauge_update(&mut self, percent: u8, key: &str) {
        let msg = self.label(key);
        if let Some(pb) = &self.gauge {
            pb.set_position(u64::from(percent));
            pb.set_message(msg);
        }
    }

    fn gauge_stop(&mut self) {
        if let Some(pb) = self.gauge.take() {
            pb.finish();
        }
    }

    fn set_language(&mut self, language: Language) {
        self.labels = Labels::new(language);
    }
}
