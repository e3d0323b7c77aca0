//! Installation gauge: pipeline position → label and percentage.

use crate::prompt::Prompt;

/// `(label key, percent)` per pipeline stage, in execution order.
pub const STAGES: [(&str, u8); 15] = [
    ("formatting_disk", 5),
    ("mounting_partitions", 10),
    ("updating_mirrors", 15),
    ("installing_base", 40),
    ("installing_kernel", 50),
    ("generating_fstab", 55),
    ("configuring_locale", 60),
    ("configuring_timezone", 65),
    ("setting_hostname", 70),
    ("installing_bootloader", 75),
    ("installing_gpu_drivers", 85),
    ("installing_desktop", 90),
    ("creating_users", 95),
    ("installing_packages", 98),
    ("enabling_services", 100),
];

/// Label and percentage of the stage at `index`.
pub fn lookup(index: usize) -> Option<(&'static str, u8)> {
    STAGES.get(index).copied()
}

/// Drives the prompt's gauge. Every call before [`start`](Self::start) or
/// after [`stop`](Self::stop) is ignored.
pub struct Progress<'p> {
    prompt: &'p mut dyn Prompt,
    active: bool,
    percent: u8,
}

impl<'p> Progress<'p> {
    pub fn new(prompt: &'p mut dyn Prompt) -> Self {
        Self {
            prompt,
            active: false,
            percent: 0,
        }
    }

    pub fn start(&mut self, title_key: &str) {
        self.percent = 0;
        self.active = true;
        self.prompt.gauge_start(title_key);
    }

    /// Reports the stage at `index`.
    pub fn stage(&mut self, index: usize) {
        if let Some((key, percent)) = lookup(index) {
            self.set_percent(percent, key);
        }
    }

    /// Clamped to 0–100 and never moves backwards.
    pub fn set_percent(&mut self, percent: u8, key: &str) {
        if !self.active {
            return;
        }
        self.percent = percent.min(100).max(self.percent);
        self.prompt.gauge_update(self.percent, key);
    }

    pub fn stop(&mut self) {
        if self.active {
            self.prompt.gauge_stop();
            self.active = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedPrompt;

    #[test]
    fn table_is_non_decreasing_and_ends_at_100() {
        assert!(STAGES.windows(2).all(|w| w[0].1 <= w[1].1));
        assert_eq!(STAGES[STAGES.len() - 1].1, 100);
    }

    #[test]
    fn calls_outside_start_stop_are_ignored() {
        let mut prompt = ScriptedPrompt::new(vec![]);
        {
            let mut progress = Progress::new(&mut prompt);
            progress.stage(0);
            progress.stop();
            progress.start("installation_progress");
            progress.stage(3);
            progress.stop();
            progress.stage(4);
            progress.stop();
        }
        assert_eq!(
            prompt.gauge,
            vec![(0, "installation_progress".to_string()), (40, "installing_base".to_string())]
        );
        assert!(!prompt.gauge_active);
    }

    #[test]
    fn percent_never_goes_backwards() {
        let mut prompt = ScriptedPrompt::new(vec![]);
        {
            let mut progress = Progress::new(&mut prompt);
            progress.start("installation_progress");
            progress.set_percent(60, "a");
            progress.set_percent(20, "b");
            progress.set_percent(250, "c");
        }
        let percents: Vec<u8> = prompt.gauge.iter().map(|(p, _)| *p).collect();
        assert_eq!(percents, vec![0, 60, 60, 100]);
    }
}
