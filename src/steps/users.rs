use tracing::info;

use crate::{
    cmd::Cmd,
    config::{InstallConfig, Secret, DEFAULT_GROUPS},
    error::{InstallerError, PasswordError},
    prompt::{Answer, ChoiceItem, Prompt, Selection},
    steps::Target,
    validate::{validate_password, validate_username},
};

/// `(group, label)` offered in the group checklist.
const GROUP_CHOICES: &[(&str, &str)] = &[
    ("wheel", "wheel (sudo access)"),
    ("audio", "audio"),
    ("video", "video"),
    ("storage", "storage"),
    ("optical", "optical"),
    ("docker", "docker"),
    ("kvm", "kvm"),
];

/// The regular account collected by menu item 9.
#[derive(Debug, Clone, PartialEq)]
pub struct UserAccount {
    pub username: String,
    pub password: Secret,
    pub groups: Vec<String>,
}

// ── Selection ─────────────────────────────────────────────────────────────────

/// Password + confirmation, re-prompting on weak or mismatched input.
pub fn select_password(
    prompt: &mut dyn Prompt,
    key: &str,
    confirm_key: &str,
) -> Selection<Secret> {
    loop {
        let Answer::Given(password) = prompt.secret(key)? else {
            return Ok(Answer::Cancelled);
        };
        if let Err(e) = validate_password(&password) {
            prompt.message(match e {
                PasswordError::Empty => "error_password_empty",
                PasswordError::TooShort => "error_password_short",
            })?;
            continue;
        }

        let Answer::Given(confirm) = prompt.secret(confirm_key)? else {
            return Ok(Answer::Cancelled);
        };
        if confirm != password {
            prompt.message("passwords_dont_match")?;
            continue;
        }
        return Ok(Answer::Given(Secret::new(password)));
    }
}

pub fn select_root_password(prompt: &mut dyn Prompt) -> Selection<Secret> {
    select_password(prompt, "root_password", "confirm_password")
}

fn select_username(prompt: &mut dyn Prompt, current: &str) -> Selection<String> {
    loop {
        let Answer::Given(input) = prompt.text("username", current)? else {
            return Ok(Answer::Cancelled);
        };
        let username = input.trim();
        if validate_username(username) {
            return Ok(Answer::Given(username.to_string()));
        }
        prompt.message("error_username_invalid")?;
    }
}

/// Checklist over the common groups. Cancelling means the default set.
fn select_groups(prompt: &mut dyn Prompt, current: &[String]) -> Result<Vec<String>, InstallerError> {
    let items: Vec<ChoiceItem> = GROUP_CHOICES
        .iter()
        .map(|(group, label)| ChoiceItem::new(*group, *label, current.iter().any(|g| g == group)))
        .collect();

    Ok(match prompt.multi_choice("user_groups", &items)? {
        Answer::Given(groups) => groups,
        Answer::Cancelled => DEFAULT_GROUPS.iter().map(|g| g.to_string()).collect(),
    })
}

/// Username, password and groups of the regular account.
pub fn select_user(prompt: &mut dyn Prompt, state: &InstallConfig) -> Selection<UserAccount> {
    let Answer::Given(username) =
        select_username(prompt, state.username.as_deref().unwrap_or_default())?
    else {
        return Ok(Answer::Cancelled);
    };
    let Answer::Given(password) = select_password(prompt, "user_password", "confirm_password")?
    else {
        return Ok(Answer::Cancelled);
    };
    let groups = select_groups(prompt, &state.user_groups)?;

    info!(user = %username, groups = ?groups, "user configured");
    Ok(Answer::Given(UserAccount {
        username,
        password,
        groups,
    }))
}

// ── Apply ─────────────────────────────────────────────────────────────────────

/// Pipes `user:password` into `chpasswd`; the command is never logged with its input.
fn chpasswd(target: &mut Target<'_>, user: &str, password: &Secret) -> Result<(), InstallerError> {
    let cmd = target
        .chroot("chpasswd", Vec::<String>::new())
        .stdin(format!("{}:{}\n", user, password.expose()))
        .quiet();
    target.run(cmd)?;
    Ok(())
}

pub fn set_root_password(target: &mut Target<'_>, state: &InstallConfig) -> Result<(), InstallerError> {
    let password = state
        .root_password
        .as_ref()
        .ok_or(InstallerError::Incomplete("root_password"))?;
    chpasswd(target, "root", password)?;
    info!("root password set");
    Ok(())
}

/// Creates the regular account, if one is configured, and opens sudo to `wheel`.
pub fn create_user(target: &mut Target<'_>, state: &InstallConfig) -> Result<(), InstallerError> {
    let Some(ref username) = state.username else {
        info!("no regular user configured");
        return Ok(());
    };
    let password = state
        .user_password
        .as_ref()
        .ok_or(InstallerError::Incomplete("user_password"))?;
    let groups = state.effective_groups();

    // docker/kvm only exist once their packages are in.
    for group in &groups {
        target.best_effort("group", |t| {
            t.run(t.chroot("groupadd", ["-f", group.as_str()])).map(|_| ())
        });
    }
    target.run(target.chroot(
        "useradd",
        ["-m", "-G", groups.join(",").as_str(), "-s", "/bin/bash", username.as_str()],
    ))?;
    chpasswd(target, username, password)?;
    info!(user = %username, "user created");

    if groups.iter().any(|g| g == "wheel") {
        // `base` ships no sudo, so there is no sudoers to edit yet.
        target.best_effort("sudo", |t| {
            t.run(t.pacman_install(&["sudo"]))?;
            let sudoers = t.path("/etc/sudoers").display().to_string();
            t.run(Cmd::new("sed").args([
                "-i",
                "s/^# %wheel ALL=(ALL:ALL) ALL/%wheel ALL=(ALL:ALL) ALL/;s/^# %wheel ALL=(ALL) ALL/%wheel ALL=(ALL) ALL/",
                sudoers.as_str(),
            ]))
            .map(|_| ())
        });
    }
    Ok(())
}
