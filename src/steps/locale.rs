use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use tracing::{debug, info};

use crate::{
    cmd::{Cmd, CommandRunner},
    config::{InstallConfig, DEFAULT_LOCALE},
    error::InstallerError,
    prompt::{Answer, ChoiceItem, Prompt, Selection},
    steps::Target,
};

// ── Tables ────────────────────────────────────────────────────────────────────

pub const KEYBOARD_LAYOUTS: &[(&str, &str)] = &[
    ("ru", "Russian"),
    ("us", "US English"),
    ("gb", "UK English"),
    ("de", "German"),
    ("fr", "French"),
    ("es", "Spanish"),
    ("it", "Italian"),
    ("pt-br", "Brazilian Portuguese"),
    ("ja", "Japanese"),
    ("zh", "Chinese"),
    ("ko", "Korean"),
    ("ar", "Arabic"),
    ("ua", "Ukrainian"),
    ("pl", "Polish"),
    ("cz", "Czech"),
    ("se", "Swedish"),
    ("no", "Norwegian"),
    ("dk", "Danish"),
    ("fi", "Finnish"),
    ("tr", "Turkish"),
    ("gr", "Greek"),
    ("il", "Hebrew"),
];

pub const POPULAR_LOCALES: &[&str] = &[
    "en_US.UTF-8",
    "ru_RU.UTF-8",
    "de_DE.UTF-8",
    "fr_FR.UTF-8",
    "ja_JP.UTF-8",
    "zh_CN.UTF-8",
];

pub const FAVORITE_TIMEZONES: &[&str] =
    &["UTC", "Europe/Moscow", "Europe/London", "America/New_York", "Asia/Tokyo"];

/// Used when `timedatectl` cannot list the zone database.
const FALLBACK_TIMEZONES: &[&str] = &[
    "UTC",
    "Europe/London",
    "Europe/Paris",
    "Europe/Berlin",
    "Europe/Moscow",
    "Europe/Istanbul",
    "Asia/Tokyo",
    "Asia/Shanghai",
    "Asia/Hong_Kong",
    "Asia/Singapore",
    "America/New_York",
    "America/Chicago",
    "America/Denver",
    "America/Los_Angeles",
    "Australia/Sydney",
    "Pacific/Auckland",
];

/// Key combination that cycles keyboard layouts.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumIter, EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum KeyboardSwitch {
    #[default]
    AltShift,
    CtrlShift,
    AltCtrl,
    WinSpace,
    Caps,
    CtrlSpace,
}

impl KeyboardSwitch {
    pub fn tag(self) -> &'static str {
        self.into()
    }

    pub fn label(self) -> &'static str {
        match self {
            KeyboardSwitch::AltShift => "Alt + Shift",
            KeyboardSwitch::CtrlShift => "Ctrl + Shift",
            KeyboardSwitch::AltCtrl => "Alt + Ctrl",
            KeyboardSwitch::WinSpace => "Win + Space",
            KeyboardSwitch::Caps => "CapsLock (toggle)",
            KeyboardSwitch::CtrlSpace => "Ctrl + Space",
        }
    }

    /// XKB option string.
    pub fn xkb_option(self) -> &'static str {
        match self {
            KeyboardSwitch::AltShift => "grp:alt_shift_toggle",
            KeyboardSwitch::CtrlShift => "grp:ctrl_shift_toggle",
            KeyboardSwitch::AltCtrl => "grp:ctrl_alt_toggle",
            KeyboardSwitch::WinSpace => "grp:win_space_toggle",
            KeyboardSwitch::Caps => "grp:caps_toggle",
            KeyboardSwitch::CtrlSpace => "grp:ctrl_space_toggle",
        }
    }

    /// Unrecognised tags fall back to Alt+Shift.
    pub fn from_tag(tag: &str) -> Self {
        tag.parse().unwrap_or_default()
    }
}

/// Console keymap for an X11 layout code. Layouts without a console map get `us`.
fn console_keymap(layout: &str) -> &str {
    match layout {
        "gb" => "uk",
        "pt-br" => "br-abnt2",
        "ja" => "jp106",
        "se" => "sv-latin1",
        "zh" | "ko" | "ar" | "il" => "us",
        other => other,
    }
}

// ── Keyboard ──────────────────────────────────────────────────────────────────

/// Layouts whose code or name contains `query`, case-insensitively.
pub fn filter_layouts(query: &str) -> Vec<(&'static str, &'static str)> {
    let query = query.trim().to_lowercase();
    KEYBOARD_LAYOUTS
        .iter()
        .filter(|(code, name)| {
            query.is_empty() || code.contains(&query) || name.to_lowercase().contains(&query)
        })
        .copied()
        .collect()
}

fn search_layout(prompt: &mut dyn Prompt, preselect: Option<&str>) -> Selection<String> {
    let Answer::Given(query) = prompt.text("search_layout", "")? else {
        return Ok(Answer::Cancelled);
    };

    let matches = filter_layouts(&query);
    if matches.is_empty() {
        prompt.message("error_invalid_input")?;
        return Ok(Answer::Cancelled);
    }

    let items: Vec<ChoiceItem> = matches
        .iter()
        .map(|(code, name)| ChoiceItem::new(*code, *name, Some(*code) == preselect))
        .collect();
    prompt.single_choice("select_layouts", &items)
}

/// Primary layout, any number of extra layouts, then the switch combination
/// when more than one layout is configured.
pub fn select_keyboard(
    prompt: &mut dyn Prompt,
    current: &[String],
    current_switch: KeyboardSwitch,
) -> Selection<(Vec<String>, KeyboardSwitch)> {
    let Answer::Given(primary) = search_layout(prompt, current.first().map(String::as_str))? else {
        return Ok(Answer::Cancelled);
    };
    let mut layouts = vec![primary];

    while prompt.confirm("add_more_layouts")? {
        match search_layout(prompt, None)? {
            Answer::Given(extra) if !layouts.contains(&extra) => layouts.push(extra),
            _ => break,
        }
    }

    let switch = if layouts.len() > 1 {
        let items: Vec<ChoiceItem> = KeyboardSwitch::iter()
            .map(|s| ChoiceItem::new(s.tag(), s.label(), s == current_switch))
            .collect();
        match prompt.single_choice("switch_combination", &items)? {
            Answer::Given(tag) => KeyboardSwitch::from_tag(&tag),
            Answer::Cancelled => KeyboardSwitch::default(),
        }
    } else {
        KeyboardSwitch::default()
    };

    info!(layouts = ?layouts, switch = switch.tag(), "keyboard configured");
    Ok(Answer::Given((layouts, switch)))
}

// ── Timezone / locale ─────────────────────────────────────────────────────────

/// Zone database from `timedatectl`, or a short built-in list.
pub fn timezones(runner: &mut dyn CommandRunner) -> Vec<String> {
    let cmd = Cmd::new("timedatectl").arg("list-timezones").probe().quiet();
    match runner.run(&cmd, false) {
        Ok(out) if out.success() && !out.stdout.trim().is_empty() => {
            let mut zones: Vec<String> = out.stdout.lines().map(str::to_string).collect();
            zones.sort();
            zones
        }
        _ => {
            debug!("timedatectl unavailable, using the built-in timezone list");
            FALLBACK_TIMEZONES.iter().map(|z| z.to_string()).collect()
        }
    }
}

/// Favourites first, then the rest of the zone database.
pub fn select_timezone(
    prompt: &mut dyn Prompt,
    runner: &mut dyn CommandRunner,
    current: &str,
) -> Selection<String> {
    let zones = timezones(runner);
    let favorites = FAVORITE_TIMEZONES
        .iter()
        .filter(|f| zones.iter().any(|z| z == *f))
        .map(|f| f.to_string());
    let rest = zones
        .iter()
        .filter(|z| !FAVORITE_TIMEZONES.contains(&z.as_str()))
        .cloned();

    let items: Vec<ChoiceItem> = favorites
        .chain(rest)
        .map(|z| {
            let on = z == current;
            ChoiceItem::new(z.clone(), z, on)
        })
        .collect();
    prompt.single_choice("select_timezone", &items)
}

/// Popular locales; checking none means en_US.
pub fn select_locales(prompt: &mut dyn Prompt, current: &[String]) -> Selection<Vec<String>> {
    let items: Vec<ChoiceItem> = POPULAR_LOCALES
        .iter()
        .map(|l| ChoiceItem::new(*l, *l, current.iter().any(|c| c == l)))
        .collect();

    Ok(prompt.multi_choice("locale", &items)?.map(|picked| {
        if picked.is_empty() {
            vec![DEFAULT_LOCALE.to_string()]
        } else {
            picked
        }
    }))
}

// ── Apply ─────────────────────────────────────────────────────────────────────

/// Generates the locales, writes `locale.conf`, then the keyboard files.
/// Only the keyboard part may fail without failing the stage.
pub fn apply_locale(target: &mut Target<'_>, state: &InstallConfig) -> Result<(), InstallerError> {
    let locale_gen = target.path("/etc/locale.gen").display().to_string();
    for locale in &state.locale {
        let expr = format!(r"s/^#\({} \)/\1/", locale.replace('.', r"\."));
        target.try_run(Cmd::new("sed").args(["-i", expr.as_str(), locale_gen.as_str()]))?;
    }
    target.run(target.chroot("locale-gen", Vec::<String>::new()))?;
    target.write("/etc/locale.conf", &format!("LANG={}\n", state.primary_locale()))?;
    info!(locales = ?state.locale, "locales generated");

    let layouts = state.keyboard_layouts.clone();
    let switch = state.keyboard_switch;
    target.best_effort("keyboard", |t| apply_keyboard(t, &layouts, switch));
    Ok(())
}

fn apply_keyboard(
    target: &mut Target<'_>,
    layouts: &[String],
    switch: KeyboardSwitch,
) -> Result<(), InstallerError> {
    let Some(primary) = layouts.first() else {
        return Ok(());
    };
    target.write("/etc/vconsole.conf", &format!("KEYMAP={}\n", console_keymap(primary)))?;

    let conf_dir = target.path("/etc/X11/xorg.conf.d").display().to_string();
    target.run(Cmd::new("mkdir").args(["-p", conf_dir.as_str()]))?;

    let mut section = String::from(
        "Section \"InputClass\"\n    Identifier \"system-keyboard\"\n    MatchIsKeyboard \"on\"\n",
    );
    section.push_str(&format!("    Option \"XkbLayout\" \"{}\"\n", layouts.join(",")));
    if layouts.len() > 1 {
        section.push_str(&format!("    Option \"XkbOptions\" \"{}\"\n", switch.xkb_option()));
    }
    section.push_str("EndSection\n");
    target.write("/etc/X11/xorg.conf.d/00-keyboard.conf", &section)?;
    Ok(())
}

pub fn apply_timezone(target: &mut Target<'_>, timezone: &str) -> Result<(), InstallerError> {
    let zone = format!("/usr/share/zoneinfo/{}", timezone);
    let localtime = target.path("/etc/localtime").display().to_string();
    target.run(Cmd::new("ln").args(["-sf", zone.as_str(), localtime.as_str()]))?;
    target.run(target.chroot("hwclock", ["--systohc"]))?;
    info!("timezone set to {}", timezone);
    Ok(())
}
