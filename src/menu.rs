//! Main menu loop: ten numbered configuration items plus install, save,
//! load and exit.

use std::path::PathBuf;

use strum::{EnumIter, IntoEnumIterator};
use tracing::{error, info};

use crate::{
    cmd::CommandRunner,
    config::InstallConfig,
    error::InstallerError,
    labels::{Labels, Language},
    logging,
    pipeline::{self, PipelineError, Report},
    prompt::{Answer, ChoiceItem, Prompt},
    session::ConfigStore,
    steps::{
        bootloader,
        chroot::{self, PostInstall},
        desktop, graphics, locale, network, packages, partition, uefi, users, Target, TARGET_ROOT,
    },
    ui,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum MenuItem {
    Language,
    Disk,
    Partitioning,
    Graphics,
    Desktop,
    Keyboard,
    Profile,
    Network,
    Users,
    Additional,
    Install,
    Save,
    Load,
    Exit,
}

impl MenuItem {
    pub fn tag(self) -> &'static str {
        match self {
            MenuItem::Language => "1",
            MenuItem::Disk => "2",
            MenuItem::Partitioning => "3",
            MenuItem::Graphics => "4",
            MenuItem::Desktop => "5",
            MenuItem::Keyboard => "6",
            MenuItem::Profile => "7",
            MenuItem::Network => "8",
            MenuItem::Users => "9",
            MenuItem::Additional => "10",
            MenuItem::Install => "i",
            MenuItem::Save => "s",
            MenuItem::Load => "l",
            MenuItem::Exit => "e",
        }
    }

    pub fn label_key(self) -> &'static str {
        match self {
            MenuItem::Language => "language",
            MenuItem::Disk => "disk",
            MenuItem::Partitioning => "partitioning",
            MenuItem::Graphics => "graphics",
            MenuItem::Desktop => "desktop_env",
            MenuItem::Keyboard => "keyboard",
            MenuItem::Profile => "installation_profile",
            MenuItem::Network => "network",
            MenuItem::Users => "users",
            MenuItem::Additional => "additional",
            MenuItem::Install => "start_installation",
            MenuItem::Save => "save_config",
            MenuItem::Load => "load_config",
            MenuItem::Exit => "exit",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        MenuItem::iter().find(|i| i.tag().eq_ignore_ascii_case(tag.trim()))
    }
}

/// How the menu loop ended.
#[derive(Debug)]
pub enum Outcome {
    Exited,
    Installed {
        report: Report,
        action: PostInstall,
    },
    Failed(PipelineError),
}

/// Current values for the status box, `(label key, value)`.
pub fn summary(state: &InstallConfig) -> Vec<(&'static str, String)> {
    let or_unset = |v: Option<&str>| v.unwrap_or("-").to_string();
    vec![
        ("disk", or_unset(state.disk.as_deref())),
        ("partitioning", or_unset(state.partition_scheme.map(|s| s.tag()))),
        ("boot_mode", if state.is_uefi() { "UEFI" } else { "BIOS" }.to_string()),
        ("bootloader", state.bootloader().tag().to_string()),
        ("graphics", or_unset(state.gpu_driver.map(|d| d.tag()))),
        ("desktop_env", or_unset(state.desktop_environment.map(|d| d.tag()))),
        ("keyboard", state.keyboard_layouts.join(", ")),
        ("installation_profile", state.installation_profile.tag().to_string()),
        ("kernel", state.kernel.package_name().to_string()),
        ("hostname", state.hostname.clone()),
        ("users", or_unset(state.username.as_deref())),
        ("timezone", state.timezone.clone()),
        ("locale", state.locale.join(", ")),
        ("multilib", if state.multilib { "yes" } else { "no" }.to_string()),
        ("aur_helper", or_unset(state.aur_helper.map(|h| h.tag()))),
    ]
}

/// One installer session: the configuration plus its two collaborators.
pub struct Installer<'a> {
    pub state: InstallConfig,
    runner: &'a mut dyn CommandRunner,
    prompt: &'a mut dyn Prompt,
    store: ConfigStore,
    dry_run: bool,
    log_file: PathBuf,
}

impl<'a> Installer<'a> {
    pub fn new(
        state: InstallConfig,
        runner: &'a mut dyn CommandRunner,
        prompt: &'a mut dyn Prompt,
        store: ConfigStore,
    ) -> Self {
        Self {
            state,
            runner,
            prompt,
            store,
            dry_run: false,
            log_file: PathBuf::from(logging::LOG_FILE),
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = path.into();
        self
    }

    // ── Loop ──────────────────────────────────────────────────────────────────

    pub fn run(&mut self) -> Result<Outcome, InstallerError> {
        let items: Vec<(String, String)> = MenuItem::iter()
            .map(|i| (i.tag().to_string(), i.label_key().to_string()))
            .collect();

        loop {
            self.show_summary("current_config");

            let item = match self.prompt.menu("main_menu", &items)? {
                Answer::Given(tag) => MenuItem::from_tag(&tag),
                Answer::Cancelled => Some(MenuItem::Exit),
            };
            let Some(item) = item else { continue };
            info!(item = ?item, "menu item selected");

            match item {
                MenuItem::Language => self.language()?,
                MenuItem::Disk => self.disk()?,
                MenuItem::Partitioning => self.partitioning()?,
                MenuItem::Graphics => self.graphics()?,
                MenuItem::Desktop => self.desktop()?,
                MenuItem::Keyboard => self.keyboard()?,
                MenuItem::Profile => self.profile()?,
                MenuItem::Network => self.network()?,
                MenuItem::Users => self.users()?,
                MenuItem::Additional => self.additional()?,
                MenuItem::Install => {
                    if let Some(outcome) = self.start_install(true)? {
                        return Ok(outcome);
                    }
                }
                MenuItem::Save => self.save()?,
                MenuItem::Load => self.load()?,
                MenuItem::Exit => {
                    if self.prompt.confirm("confirm_exit")? {
                        info!("operator exited the installer");
                        return Ok(Outcome::Exited);
                    }
                }
            }
        }
    }

    /// Unattended mode: asks only for the mandatory values that are still
    /// missing, then installs without the Final Review.
    pub fn run_unattended(&mut self) -> Result<Outcome, InstallerError> {
        if self.state.disk.is_none() {
            self.disk()?;
        }
        if self.state.partition_scheme.is_none() {
            self.partitioning()?;
        } else {
            self.state.set_uefi(uefi::detect(self.dry_run));
        }
        if self.state.root_password.is_none() {
            if let Answer::Given(pw) = users::select_root_password(self.prompt)? {
                self.state.root_password = Some(pw);
            }
        }
        if self.state.username.is_some() && self.state.user_password.is_none() {
            if let Answer::Given(pw) =
                users::select_password(self.prompt, "user_password", "confirm_password")?
            {
                self.state.user_password = Some(pw);
            }
        }

        if let Some(key) = self.state.missing_for_install().into_iter().next() {
            return Err(InstallerError::Incomplete(key));
        }
        Ok(self.start_install(false)?.unwrap_or(Outcome::Exited))
    }

    // ── Items ─────────────────────────────────────────────────────────────────

    fn language(&mut self) -> Result<(), InstallerError> {
        let items: Vec<ChoiceItem> = Language::iter()
            .map(|l| ChoiceItem::new(l.code(), l.native_name(), l == self.state.language))
            .collect();
        if let Answer::Given(code) = self.prompt.single_choice("select_language", &items)? {
            let language = Language::from_code(&code);
            self.state.language = language;
            self.prompt.set_language(language);
            info!(language = language.code(), "interface language changed");
        }
        Ok(())
    }

    fn disk(&mut self) -> Result<(), InstallerError> {
        let current = self.state.disk.clone();
        if let Answer::Given(disk) =
            partition::select_disk(self.prompt, self.runner, current.as_deref())?
        {
            self.state.disk = Some(disk);
        }
        Ok(())
    }

    /// Scheme, swap and bootloader. Needs a disk first.
    fn partitioning(&mut self) -> Result<(), InstallerError> {
        if self.state.disk.is_none() {
            self.prompt.message("error_disk_not_found")?;
            return Ok(());
        }

        self.state.set_uefi(uefi::detect(self.dry_run));
        let Answer::Given(scheme) = partition::select_scheme(self.prompt, self.state.partition_scheme)?
        else {
            return Ok(());
        };
        self.state.partition_scheme = Some(scheme);

        if let Answer::Given((kind, size)) = partition::select_swap(self.prompt, &self.state)? {
            self.state.swap = kind;
            self.state.swap_size = size;
        }
        let bootloader = bootloader::select(self.prompt, &self.state)?;
        self.state.set_bootloader(bootloader);
        Ok(())
    }

    fn graphics(&mut self) -> Result<(), InstallerError> {
        let detected = graphics::detect(self.runner);
        if let Answer::Given(driver) = graphics::select_driver(self.prompt, detected.driver)? {
            self.state.gpu_driver = Some(driver);
            self.state.gpu_vendor = detected.vendor;
            self.state.gpu_model = detected.model;
        }
        Ok(())
    }

    fn desktop(&mut self) -> Result<(), InstallerError> {
        if let Answer::Given(de) = desktop::select(self.prompt, self.state.desktop_environment)? {
            self.state.desktop_environment = Some(de);
        }
        Ok(())
    }

    fn keyboard(&mut self) -> Result<(), InstallerError> {
        if let Answer::Given((layouts, switch)) = locale::select_keyboard(
            self.prompt,
            &self.state.keyboard_layouts,
            self.state.keyboard_switch,
        )? {
            self.state.keyboard_layouts = layouts;
            self.state.keyboard_switch = switch;
        }
        Ok(())
    }

    /// Profile, kernel, then the additional package catalog.
    fn profile(&mut self) -> Result<(), InstallerError> {
        let Answer::Given(profile) =
            packages::select_profile(self.prompt, self.state.installation_profile)?
        else {
            return Ok(());
        };
        self.state.installation_profile = profile;

        if let Answer::Given(kernel) = packages::select_kernel(self.prompt, self.state.kernel)? {
            self.state.kernel = kernel;
        }
        if let Answer::Given(extra) =
            packages::select_additional(self.prompt, &self.state.additional_packages)?
        {
            self.state.additional_packages = extra;
        }
        Ok(())
    }

    fn network(&mut self) -> Result<(), InstallerError> {
        let Answer::Given(hostname) = network::select_hostname(self.prompt, &self.state.hostname)?
        else {
            return Ok(());
        };
        self.state.hostname = hostname;
        self.state.network_manager = network::select_manager(self.prompt, self.state.network_manager)?;
        Ok(())
    }

    /// Root password and the regular account are independent: cancelling
    /// one keeps the other.
    fn users(&mut self) -> Result<(), InstallerError> {
        if let Answer::Given(pw) = users::select_root_password(self.prompt)? {
            self.state.root_password = Some(pw);
        }
        if let Answer::Given(account) = users::select_user(self.prompt, &self.state)? {
            self.state.username = Some(account.username);
            self.state.user_password = Some(account.password);
            self.state.user_groups = account.groups;
        }
        Ok(())
    }

    /// Timezone, locales, multilib, AUR helper, mirror ranking.
    fn additional(&mut self) -> Result<(), InstallerError> {
        if let Answer::Given(tz) =
            locale::select_timezone(self.prompt, self.runner, &self.state.timezone)?
        {
            self.state.timezone = tz;
        }
        if let Answer::Given(locales) = locale::select_locales(self.prompt, &self.state.locale)? {
            self.state.locale = locales;
        }
        self.state.multilib = self.prompt.confirm("multilib")?;
        if let Answer::Given(helper) = packages::select_aur_helper(self.prompt, self.state.aur_helper)? {
            self.state.aur_helper = helper;
        }
        self.state.use_reflector = self.prompt.confirm("use_reflector")?;
        Ok(())
    }

    // ── Reserved commands ─────────────────────────────────────────────────────

    /// `None` means "back to the menu".
    fn start_install(&mut self, review: bool) -> Result<Option<Outcome>, InstallerError> {
        let missing = self.state.missing_for_install();
        if !missing.is_empty() {
            self.prompt.message("error_missing_settings")?;
            for key in missing {
                self.prompt.message(key)?;
            }
            return Ok(None);
        }

        if review {
            self.show_summary("final_review");
            if !self.prompt.confirm("confirm_install")? {
                info!("installation not confirmed at final review");
                return Ok(None);
            }
        }

        let report = match pipeline::run(&mut self.state, self.runner, self.prompt) {
            Ok(report) => report,
            Err(e) => {
                error!("installation failed: {}", e);
                ui::print_error(&e.to_string());
                if let PipelineError::StageFailed { ref source, .. } = e {
                    if let Some(output) = source.output() {
                        ui::print_error(output);
                    }
                }
                self.prompt.message("installation_failed")?;
                return Ok(Some(Outcome::Failed(e)));
            }
        };

        for (stage, warning) in &report.warnings {
            ui::print_warning(&format!("{}: {}", stage, warning));
        }
        self.prompt.message("installation_complete")?;

        let mut target = Target::new(self.runner, TARGET_ROOT);
        let action = chroot::run(&mut target, self.prompt, &self.log_file)?;
        Ok(Some(Outcome::Installed { report, action }))
    }

    fn save(&mut self) -> Result<(), InstallerError> {
        let key = if self.store.save(&self.state) {
            "config_saved"
        } else {
            "config_save_failed"
        };
        self.prompt.message(key)
    }

    /// Replaces the configuration with the saved one. Passwords are never
    /// saved, so the ones entered in this session are kept.
    fn load(&mut self) -> Result<(), InstallerError> {
        if !self.store.exists() {
            return self.prompt.message("config_not_found");
        }

        let mut loaded = self.store.load();
        let bootloader = loaded.bootloader();
        loaded.set_uefi(uefi::detect(self.dry_run));
        loaded.set_bootloader(bootloader);
        loaded.root_password = self.state.root_password.take();
        if loaded.username == self.state.username {
            loaded.user_password = self.state.user_password.take();
        }

        self.prompt.set_language(loaded.language);
        self.state = loaded;
        self.prompt.message("config_loaded")
    }

    fn show_summary(&self, title_key: &str) {
        let labels = Labels::new(self.state.language);
        let rows = summary(&self.state);
        let rows: Vec<(&str, &str)> = rows.iter().map(|(k, v)| (labels.get(k), v.as_str())).collect();
        ui::print_kv_box(labels.get(title_key), &rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Secret,
        steps::{desktop::DesktopEnvironment, packages::Profile},
        testing::{
            cancel_choice, cancel_multi, cancel_text, check, no, pick, ready_state, text, yes,
            FakeRunner, ScriptedPrompt,
        },
    };

    fn store() -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));
        (dir, store)
    }

    /// Runs the menu with `script` and returns the outcome plus final state.
    fn drive(
        state: InstallConfig,
        runner: &mut FakeRunner,
        script: Vec<crate::testing::Reply>,
    ) -> (Outcome, InstallConfig, ScriptedPrompt) {
        let (_dir, store) = store();
        let mut prompt = ScriptedPrompt::new(script);
        let (outcome, state) = {
            let mut installer = Installer::new(state, runner, &mut prompt, store).dry_run(true);
            let outcome = installer.run().unwrap();
            (outcome, installer.state)
        };
        assert_eq!(prompt.remaining(), 0, "unused replies");
        (outcome, state, prompt)
    }

    #[test]
    fn tags_map_to_items() {
        assert_eq!(MenuItem::from_tag("10"), Some(MenuItem::Additional));
        assert_eq!(MenuItem::from_tag("I"), Some(MenuItem::Install));
        assert_eq!(MenuItem::from_tag("42"), None);
    }

    #[test]
    fn exit_needs_confirmation() {
        let mut runner = FakeRunner::default();
        let (outcome, _, _) = drive(
            InstallConfig::default(),
            &mut runner,
            vec![pick("e"), no(), pick("e"), yes()],
        );
        assert!(matches!(outcome, Outcome::Exited));
    }

    #[test]
    fn cancelled_items_leave_state_untouched() {
        let mut state = InstallConfig::default();
        state.desktop_environment = Some(DesktopEnvironment::Kde);
        state.hostname = "keepme".into();
        let before = state.clone();

        let mut runner = FakeRunner::default();
        let (_, after, _) = drive(
            state,
            &mut runner,
            vec![
                pick("5"),
                cancel_choice(),
                pick("8"),
                cancel_text(),
                pick("7"),
                cancel_choice(),
                pick("6"),
                cancel_text(),
                pick("e"),
                yes(),
            ],
        );
        assert_eq!(after, before);
    }

    #[test]
    fn same_input_twice_gives_same_state() {
        let flow = |times: usize| {
            let mut script = Vec::new();
            for _ in 0..times {
                script.extend([
                    pick("7"),
                    pick("server"),
                    pick("lts"),
                    check(&["firefox"]),
                    check(&[]),
                    check(&[]),
                    check(&["htop"]),
                    check(&[]),
                    cancel_multi(),
                    pick("8"),
                    text("box"),
                    pick("iwd"),
                ]);
            }
            script.extend([pick("e"), yes()]);
            let mut runner = FakeRunner::default();
            drive(InstallConfig::default(), &mut runner, script).1
        };

        let once = flow(1);
        assert_eq!(once.installation_profile, Profile::Server);
        assert_eq!(once.additional_packages, vec!["firefox", "htop"]);
        assert_eq!(once.hostname, "box");
        assert_eq!(flow(2), once);
    }

    #[test]
    fn partitioning_requires_a_disk() {
        let mut runner = FakeRunner::default();
        let (_, state, prompt) = drive(
            InstallConfig::default(),
            &mut runner,
            vec![pick("3"), pick("e"), yes()],
        );
        assert_eq!(state.partition_scheme, None);
        assert_eq!(prompt.messages, vec!["error_disk_not_found"]);
    }

    #[test]
    fn graphics_commits_detection_only_when_chosen() {
        let mut runner = FakeRunner::default();
        runner.respond("lspci", "01:00.0 VGA compatible controller: AMD Navi 21\n");
        let (_, state, _) = drive(
            InstallConfig::default(),
            &mut runner,
            vec![pick("4"), cancel_choice(), pick("e"), yes()],
        );
        assert_eq!(state.gpu_vendor, "Unknown");
        assert_eq!(state.gpu_driver, None);

        let (_, state, _) = drive(
            InstallConfig::default(),
            &mut runner,
            vec![pick("4"), pick("amd"), pick("e"), yes()],
        );
        assert_eq!(state.gpu_vendor, "AMD");
        assert_eq!(state.gpu_driver, Some(graphics::GpuDriver::Amd));
    }

    #[test]
    fn install_with_missing_values_returns_to_menu() {
        let mut runner = FakeRunner::default();
        let (outcome, state, prompt) = drive(
            InstallConfig::default(),
            &mut runner,
            vec![pick("i"), pick("e"), yes()],
        );
        assert!(matches!(outcome, Outcome::Exited));
        assert!(!state.installation_started());
        assert_eq!(
            prompt.messages,
            vec!["error_missing_settings", "disk", "partitioning", "root_password"]
        );
    }

    #[test]
    fn declined_review_does_not_install() {
        let mut runner = FakeRunner::default();
        let (_, state, _) = drive(ready_state(), &mut runner, vec![pick("i"), no(), pick("e"), yes()]);
        assert!(!state.installation_started());
        assert!(runner.log.is_empty());
    }

    #[test]
    fn confirmed_install_runs_pipeline_then_post_install() {
        let mut runner = FakeRunner::default();
        runner.respond("genfstab", "UUID=1 / ext4 rw 0 1\n");
        let (outcome, state, prompt) =
            drive(ready_state(), &mut runner, vec![pick("i"), yes(), pick("stay")]);

        match outcome {
            Outcome::Installed { report, action } => {
                assert_eq!(report.executed.len(), 15);
                assert_eq!(action, PostInstall::Stay);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(state.installation_completed());
        assert_eq!(prompt.messages, vec!["installation_complete"]);
    }

    #[test]
    fn failed_install_ends_the_loop() {
        let mut runner = FakeRunner::default();
        runner.fail_on("pacstrap -K");
        let (outcome, state, _) = drive(ready_state(), &mut runner, vec![pick("i"), yes()]);
        assert!(matches!(outcome, Outcome::Failed(PipelineError::StageFailed { .. })));
        assert!(!state.installation_completed());
    }

    #[test]
    fn save_then_load_restores_and_keeps_passwords() {
        let (_dir, store) = store();
        let mut runner = FakeRunner::default();
        let mut state = InstallConfig::default();
        state.hostname = "saved".into();
        state.root_password = Some(Secret::new("rootpw1"));

        let mut prompt = ScriptedPrompt::new(vec![
            pick("s"),
            pick("8"),
            text("changed"),
            cancel_choice(),
            pick("l"),
            pick("e"),
            yes(),
        ]);
        let state = {
            let mut installer =
                Installer::new(state, &mut runner, &mut prompt, store).dry_run(true);
            installer.run().unwrap();
            installer.state
        };

        assert_eq!(state.hostname, "saved");
        assert_eq!(state.root_password, Some(Secret::new("rootpw1")));
        assert_eq!(prompt.messages, vec!["config_saved", "config_loaded"]);
        assert_eq!(prompt.language, Some(Language::En));
    }

    #[test]
    fn language_switch_reaches_the_prompt() {
        let mut runner = FakeRunner::default();
        let (_, state, prompt) = drive(
            InstallConfig::default(),
            &mut runner,
            vec![pick("1"), pick("ru"), pick("e"), yes()],
        );
        assert_eq!(state.language, Language::Ru);
        assert_eq!(prompt.language, Some(Language::Ru));
    }

    #[test]
    fn unattended_asks_only_for_missing_values() {
        let mut runner = FakeRunner::default();
        runner.respond("genfstab", "UUID=1 / ext4 rw 0 1\n");
        let mut state = ready_state();
        state.root_password = None;

        let (_dir, store) = store();
        let mut prompt =
            ScriptedPrompt::new(vec![text("rootpw1"), text("rootpw1"), pick("reboot")]);
        let outcome = {
            let mut installer =
                Installer::new(state, &mut runner, &mut prompt, store).dry_run(true);
            installer.run_unattended().unwrap()
        };
        assert!(matches!(outcome, Outcome::Installed { action: PostInstall::Reboot, .. }));
        assert!(runner.ran("reboot"));
    }
}
