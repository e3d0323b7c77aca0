//! Test doubles for the two external collaborators: the command runner and
//! the operator prompt.

use std::{collections::VecDeque, path::Path};

use crate::{
    cmd::{Cmd, CommandOutput, CommandRunner},
    config::{InstallConfig, Secret},
    error::InstallerError,
    labels::Language,
    prompt::{Answer, ChoiceItem, Prompt, Selection},
    steps::partition::{PartitionScheme, SwapKind},
};

/// UEFI, ext4 on `/dev/sda`, no swap, root password set: enough to install.
pub fn ready_state() -> InstallConfig {
    let mut state = InstallConfig::default();
    state.disk = Some("/dev/sda".to_string());
    state.partition_scheme = Some(PartitionScheme::AutoExt4);
    state.swap = SwapKind::NoSwap;
    state.set_uefi(true);
    state.root_password = Some(Secret::new("rootpw1"));
    state
}

// ── Runner ────────────────────────────────────────────────────────────────────

/// Records every command and file write instead of touching the machine.
///
/// Writes show up in the log as `write <path>` / `append <path>`.
#[derive(Debug, Default)]
pub struct FakeRunner {
    pub log: Vec<String>,
    pub files: Vec<(String, String)>,
    failures: Vec<String>,
    responses: Vec<(String, String)>,
}

impl FakeRunner {
    /// Any command (or write) whose log line contains `needle` exits 1.
    pub fn fail_on(&mut self, needle: &str) {
        self.failures.push(needle.to_string());
    }

    /// Commands containing `needle` print `stdout`.
    pub fn respond(&mut self, needle: &str, stdout: &str) {
        self.responses.push((needle.to_string(), stdout.to_string()));
    }

    /// Index of the first log line containing `needle`.
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.log.iter().position(|l| l.contains(needle))
    }

    pub fn ran(&self, needle: &str) -> bool {
        self.position(needle).is_some()
    }

    pub fn file(&self, path: &str) -> Option<&str> {
        self.files
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, c)| c.as_str())
    }

    fn fails(&self, line: &str) -> bool {
        self.failures.iter().any(|f| line.contains(f.as_str()))
    }
}

impl CommandRunner for FakeRunner {
    fn exec(&mut self, cmd: &Cmd) -> Result<CommandOutput, InstallerError> {
        let line = cmd.to_string();
        self.log.push(line.clone());
        if self.fails(&line) {
            return Ok(CommandOutput {
                status: 1,
                stdout: String::new(),
                stderr: "simulated failure".to_string(),
            });
        }
        let stdout = self
            .responses
            .iter()
            .find(|(needle, _)| line.contains(needle.as_str()))
            .map(|(_, out)| out.clone())
            .unwrap_or_default();
        Ok(CommandOutput {
            status: 0,
            stdout,
            stderr: String::new(),
        })
    }

    fn interactive(&mut self, cmd: &Cmd) -> Result<(), InstallerError> {
        self.run(cmd, true).map(|_| ())
    }

    fn write_file(
        &mut self,
        path: &Path,
        contents: &str,
        append: bool,
    ) -> Result<(), InstallerError> {
        let line = format!("{} {}", if append { "append" } else { "write" }, path.display());
        self.log.push(line.clone());
        if self.fails(&line) {
            return Err(InstallerError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "simulated failure",
            )));
        }
        let path = path.display().to_string();
        if append {
            if let Some((_, existing)) = self.files.iter_mut().rev().find(|(p, _)| *p == path) {
                existing.push_str(contents);
                return Ok(());
            }
        }
        self.files.push((path, contents.to_string()));
        Ok(())
    }
}

// ── Prompt ────────────────────────────────────────────────────────────────────

/// One scripted operator reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Confirm(bool),
    /// Answers `text` and `secret`.
    Text(Answer<String>),
    /// Answers `single_choice` and `menu`.
    Choice(Answer<String>),
    Multi(Answer<Vec<String>>),
}

pub fn yes() -> Reply {
    Reply::Confirm(true)
}

pub fn no() -> Reply {
    Reply::Confirm(false)
}

pub fn text(value: &str) -> Reply {
    Reply::Text(Answer::Given(value.to_string()))
}

pub fn pick(tag: &str) -> Reply {
    Reply::Choice(Answer::Given(tag.to_string()))
}

pub fn check(tags: &[&str]) -> Reply {
    Reply::Multi(Answer::Given(tags.iter().map(|t| t.to_string()).collect()))
}

pub fn cancel_text() -> Reply {
    Reply::Text(Answer::Cancelled)
}

pub fn cancel_choice() -> Reply {
    Reply::Choice(Answer::Cancelled)
}

pub fn cancel_multi() -> Reply {
    Reply::Multi(Answer::Cancelled)
}

/// Replays a fixed sequence of operator replies. Panics when the script
/// runs dry or a reply does not fit the prompt kind.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    script: VecDeque<Reply>,
    pub messages: Vec<String>,
    pub offered: Vec<(String, Vec<ChoiceItem>)>,
    pub gauge: Vec<(u8, String)>,
    pub gauge_active: bool,
    pub language: Option<Language>,
}

impl ScriptedPrompt {
    pub fn new(script: Vec<Reply>) -> Self {
        Self {
            script: script.into(),
            ..Self::default()
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    fn next(&mut self, key: &str) -> Reply {
        self.script
            .pop_front()
            .unwrap_or_else(|| panic!("script exhausted at prompt '{}'", key))
    }

    fn next_text(&mut self, key: &str) -> Selection<String> {
        match self.next(key) {
            Reply::Text(a) => Ok(a),
            other => panic!("prompt '{}' wanted text, script had {:?}", key, other),
        }
    }

    fn next_choice(&mut self, key: &str) -> Selection<String> {
        match self.next(key) {
            Reply::Choice(a) => Ok(a),
            other => panic!("prompt '{}' wanted a choice, script had {:?}", key, other),
        }
    }
}

impl Prompt for ScriptedPrompt {
    fn message(&mut self, key: &str) -> Result<(), InstallerError> {
        self.messages.push(key.to_string());
        Ok(())
    }

    fn confirm(&mut self, key: &str) -> Result<bool, InstallerError> {
        match self.next(key) {
            Reply::Confirm(b) => Ok(b),
            other => panic!("prompt '{}' wanted a confirmation, script had {:?}", key, other),
        }
    }

    fn text(&mut self, key: &str, _initial: &str) -> Selection<String> {
        self.next_text(key)
    }

    fn secret(&mut self, key: &str) -> Selection<String> {
        self.next_text(key)
    }

    fn single_choice(&mut self, key: &str, items: &[ChoiceItem]) -> Selection<String> {
        self.offered.push((key.to_string(), items.to_vec()));
        self.next_choice(key)
    }

    fn multi_choice(&mut self, key: &str, items: &[ChoiceItem]) -> Selection<Vec<String>> {
        self.offered.push((key.to_string(), items.to_vec()));
        match self.next(key) {
            Reply::Multi(a) => Ok(a),
            other => panic!("prompt '{}' wanted a checklist, script had {:?}", key, other),
        }
    }

    fn menu(&mut self, key: &str, _items: &[(String, String)]) -> Selection<String> {
        self.next_choice(key)
    }

    fn gauge_start(&mut self, key: &str) {
        self.gauge_active = true;
        self.gauge.push((0, key.to_string()));
    }

    fn gauge_update(&mut self, percent: u8, key: &str) {
        self.gauge.push((percent, key.to_string()));
    }

    fn gauge_stop(&mut self) {
        self.gauge_active = false;
    }

    fn set_language(&mut self, language: Language) {
        self.language = Some(language);
    }
}
