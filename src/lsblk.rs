use std::collections::HashMap;

use tracing::{debug, warn};

use crate::cmd::{Cmd, CommandRunner};

// ── Data types ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disk {
    pub path: String,  // /dev/sda
    pub size: String,  // 20G
    pub model: String, // SAMSUNG SSD 870
}

impl Disk {
    /// One-line label shown in the selector.
    pub fn display(&self) -> String {
        format!("{:<14}  {:>8}   {}", self.path, self.size, self.model)
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Returns all block devices of type `disk` visible to the system.
/// Falls back to an empty list if `lsblk` is unavailable or fails.
pub fn list_disks(runner: &mut dyn CommandRunner) -> Vec<Disk> {
    let probe = Cmd::new("lsblk")
        .args(["--pairs", "--output", "NAME,SIZE,TYPE,MODEL", "--nodeps"])
        .probe()
        .quiet();

    let output = match runner.run(&probe, true) {
        Ok(o) => o.stdout,
        Err(e) => {
            warn!("disk probe failed: {}", e);
            return vec![];
        }
    };

    let disks = parse_disks(&output);
    debug!(count = disks.len(), "detected disks");
    disks
}

fn parse_disks(output: &str) -> Vec<Disk> {
    output
        .lines()
        .filter_map(|line| {
            let m = parse_pairs(line);
            if m.get("TYPE").map(String::as_str) != Some("disk") {
                return None;
            }
            let name = m.get("NAME").filter(|n| !n.is_empty())?;
            Some(Disk {
                path: format!("/dev/{}", name),
                size: m.get("SIZE").cloned().unwrap_or_default(),
                model: {
                    let s = m.get("MODEL").map(|s| s.trim().to_string()).unwrap_or_default();
                    if s.is_empty() { "—".to_string() } else { s }
                },
            })
        })
        .collect()
}

// ── lsblk --pairs parser ──────────────────────────────────────────────────────
//
// Each line looks like:   NAME="sda" SIZE="500G" TYPE="disk" MODEL="Samsung SSD"

fn parse_pairs(line: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let mut rest = line.trim();

    while !rest.is_empty() {
        let Some(eq) = rest.find('=') else { break };
        let key = rest[..eq].split_whitespace().last().unwrap_or("").to_string();
        rest = &rest[eq + 1..];

        if !rest.starts_with('"') {
            break;
        }
        rest = &rest[1..];

        let Some(close) = rest.find('"') else { break };
        let value = rest[..close].to_string();
        rest = &rest[close + 1..];

        if !key.is_empty() {
            map.insert(key, value);
        }
    }

    map
}
