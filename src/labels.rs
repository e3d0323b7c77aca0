//! Operator-facing text in English and Russian.
//!
//! Code refers to text by label key only. A key missing from a table is
//! shown verbatim, so already-formatted text can go through the same path.

use std::{borrow::Cow, collections::HashMap};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum::EnumIter;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ru,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ru => "ru",
        }
    }

    pub fn native_name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Ru => "Русский",
        }
    }

    /// Unknown codes fall back to English.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "ru" => Language::Ru,
            _ => Language::En,
        }
    }
}

type Table = HashMap<&'static str, &'static str>;

static EN: Lazy<Table> = Lazy::new(|| {
    HashMap::from([
        // Main menu
        ("main_menu", "Main menu"),
        ("language", "Interface language"),
        ("disk", "Disk"),
        ("partitioning", "Partitioning"),
        ("graphics", "Graphics card"),
        ("desktop_env", "Desktop environment"),
        ("keyboard", "Keyboard layouts"),
        ("installation_profile", "Installation profile"),
        ("network", "Network"),
        ("users", "Users"),
        ("additional", "Additional settings"),
        ("start_installation", "Start installation"),
        ("save_config", "Save configuration"),
        ("load_config", "Load configuration"),
        ("exit", "Exit"),
        ("current_config", "Current configuration"),
        ("final_review", "Final installation configuration"),
        ("boot_mode", "Boot mode"),
        ("bootloader", "Bootloader"),
        ("kernel", "Kernel"),
        ("hostname", "Hostname"),
        ("timezone", "Timezone"),
        ("locale", "Locales"),
        ("multilib", "Enable multilib (32-bit libraries)?"),
        ("aur_helper", "AUR helper"),
        ("not_selected", "Not selected"),
        // Disk
        ("select_language", "Select interface language"),
        ("select_disk", "Select installation disk"),
        ("confirm_disk", "ALL DATA ON THIS DISK WILL BE ERASED. Continue?"),
        ("error_disk_not_found", "No disk selected or no disk found!"),
        ("partition_scheme", "Select partitioning scheme"),
        ("auto_ext4", "Automatic (ext4)"),
        ("auto_btrfs", "Automatic (btrfs with subvolumes)"),
        ("manual", "Manual partitioning"),
        ("select_swap", "Select swap type"),
        ("swap_none", "No swap"),
        ("swap_file", "Swap file"),
        ("swap_partition", "Swap partition"),
        ("swap_size", "Swap size (GB):"),
        ("select_bootloader", "Select bootloader"),
        ("bootloader_grub", "GRUB"),
        ("bootloader_systemd_boot", "systemd-boot"),
        // Graphics
        ("select_driver", "Select graphics drivers"),
        ("driver_nvidia_proprietary", "NVIDIA (proprietary drivers)"),
        ("driver_nvidia_opensource", "NVIDIA (Nouveau open-source)"),
        ("driver_amd", "AMD (open-source)"),
        ("driver_intel", "Intel (integrated graphics)"),
        ("driver_hybrid", "Hybrid graphics (Intel + NVIDIA)"),
        ("driver_generic", "Basic drivers"),
        // Desktop
        ("select_desktop", "Select desktop environment"),
        ("de_kde", "KDE Plasma - modern full-featured environment"),
        ("de_gnome", "GNOME - elegant and simple interface"),
        ("de_xfce", "XFCE - lightweight and fast environment"),
        ("de_cinnamon", "Cinnamon - traditional desktop"),
        ("de_mate", "MATE - classic environment"),
        ("de_i3", "i3wm - tiling window manager"),
        ("de_sway", "Sway - Wayland tiling compositor"),
        ("de_none", "Command line only (server installation)"),
        // Keyboard
        ("search_layout", "Find layout (code or name):"),
        ("select_layouts", "Select keyboard layout"),
        ("add_more_layouts", "Add another layout?"),
        ("switch_combination", "Layout switch combination"),
        ("error_invalid_input", "Invalid input!"),
        // Profile and packages
        ("select_profile", "Select installation profile"),
        ("profile_desktop", "Desktop - full installation"),
        ("profile_minimal", "Minimal - minimal system"),
        ("profile_server", "Server - server configuration"),
        ("profile_xorg", "Xorg - basic graphics"),
        ("select_kernel", "Select kernel"),
        ("kernel_stable", "linux (stable)"),
        ("kernel_lts", "linux-lts (long-term support)"),
        ("kernel_zen", "linux-zen (desktop tuned)"),
        ("packages_browsers", "Additional packages: browsers"),
        ("packages_development", "Additional packages: development"),
        ("packages_multimedia", "Additional packages: multimedia"),
        ("packages_utilities", "Additional packages: utilities"),
        ("packages_documents", "Additional packages: documents"),
        ("packages_system", "Additional packages: system"),
        ("enable_aur", "Install an AUR helper?"),
        ("no_aur", "No AUR helper"),
        ("use_reflector", "Rank mirrors with reflector?"),
        // Network
        ("error_empty_hostname", "Hostname cannot be empty!"),
        ("error_invalid_hostname", "Invalid hostname!"),
        ("select_network_manager", "Select network manager"),
        ("networkmanager", "NetworkManager (recommended)"),
        ("systemd_networkd", "systemd-networkd (servers)"),
        ("iwd", "iwd (minimalist)"),
        // Accounts
        ("root_password", "Root password:"),
        ("confirm_password", "Confirm password:"),
        ("user_password", "User password:"),
        ("passwords_dont_match", "Passwords do not match!"),
        ("error_password_empty", "Password cannot be empty!"),
        ("error_password_short", "Password must be at least 6 characters!"),
        ("username", "Username:"),
        ("error_username_invalid", "Invalid username!"),
        ("user_groups", "User groups"),
        ("select_timezone", "Select timezone"),
        // Install
        ("error_missing_settings", "Required settings are missing:"),
        ("confirm_install", "Start the installation now?"),
        ("confirm_exit", "Exit the installer?"),
        ("installation_progress", "Installation progress"),
        ("formatting_disk", "Formatting disk..."),
        ("mounting_partitions", "Mounting partitions..."),
        ("updating_mirrors", "Updating mirror list..."),
        ("installing_base", "Installing base system..."),
        ("installing_kernel", "Installing kernel..."),
        ("generating_fstab", "Generating fstab..."),
        ("configuring_locale", "Configuring locale..."),
        ("configuring_timezone", "Configuring timezone..."),
        ("setting_hostname", "Setting hostname..."),
        ("installing_bootloader", "Installing bootloader..."),
        ("installing_gpu_drivers", "Installing GPU drivers..."),
        ("installing_desktop", "Installing desktop environment..."),
        ("creating_users", "Creating users..."),
        ("installing_packages", "Installing additional packages..."),
        ("enabling_services", "Enabling services..."),
        ("installation_complete", "Installation complete!"),
        ("installation_failed", "Installation failed! See the log for details."),
        // Post-install
        ("post_install", "What next?"),
        ("post_reboot", "Reboot now"),
        ("post_stay", "Stay in the live environment"),
        ("post_chroot", "Open chroot for manual configuration"),
        ("post_logs", "View installation log"),
        // Configuration file
        ("config_saved", "Configuration saved."),
        ("config_save_failed", "Could not save the configuration."),
        ("config_loaded", "Configuration loaded."),
        ("config_not_found", "No saved configuration found."),
    ])
});

static RU: Lazy<Table> = Lazy::new(|| {
    HashMap::from([
        ("main_menu", "Главное меню"),
        ("language", "Язык интерфейса"),
        ("disk", "Диск"),
        ("partitioning", "Схема разметки"),
        ("graphics", "Видеокарта"),
        ("desktop_env", "Окружение рабочего стола"),
        ("keyboard", "Раскладки клавиатуры"),
        ("installation_profile", "Профиль установки"),
        ("network", "Сеть"),
        ("users", "Пользователи"),
        ("additional", "Дополнительно"),
        ("start_installation", "Начать установку"),
        ("save_config", "Сохранить конфигурацию"),
        ("load_config", "Загрузить конфигурацию"),
        ("exit", "Выход"),
        ("current_config", "Текущая конфигурация"),
        ("final_review", "Итоговая конфигурация установки"),
        ("boot_mode", "Режим загрузки"),
        ("bootloader", "Загрузчик"),
        ("kernel", "Ядро"),
        ("hostname", "Имя компьютера"),
        ("timezone", "Часовой пояс"),
        ("locale", "Локали"),
        ("multilib", "Включить multilib (32-битные библиотеки)?"),
        ("aur_helper", "Помощник AUR"),
        ("not_selected", "Не выбрано"),
        ("select_language", "Выберите язык интерфейса"),
        ("select_disk", "Выберите диск для установки"),
        ("confirm_disk", "ВСЕ ДАННЫЕ НА ДИСКЕ БУДУТ УДАЛЕНЫ. Продолжить?"),
        ("error_disk_not_found", "Диск не выбран или не найден!"),
        ("partition_scheme", "Выберите схему разметки"),
        ("auto_ext4", "Автоматическая (ext4)"),
        ("auto_btrfs", "Автоматическая (btrfs с подтомами)"),
        ("manual", "Ручная разметка"),
        ("select_swap", "Выберите тип подкачки"),
        ("swap_none", "Без подкачки"),
        ("swap_file", "Файл подкачки"),
        ("swap_partition", "Раздел подкачки"),
        ("swap_size", "Размер подкачки (ГБ):"),
        ("select_bootloader", "Выберите загрузчик"),
        ("bootloader_grub", "GRUB"),
        ("bootloader_systemd_boot", "systemd-boot"),
        ("select_driver", "Выберите драйверы видеокарты"),
        ("driver_nvidia_proprietary", "NVIDIA (проприетарные драйверы)"),
        ("driver_nvidia_opensource", "NVIDIA (Nouveau open-source)"),
        ("driver_amd", "AMD (open-source)"),
        ("driver_intel", "Intel (встроенная графика)"),
        ("driver_hybrid", "Гибридная графика (Intel + NVIDIA)"),
        ("driver_generic", "Базовые драйверы"),
        ("select_desktop", "Выберите окружение рабочего стола"),
        ("de_kde", "KDE Plasma - современное полнофункциональное окружение"),
        ("de_gnome", "GNOME - элегантный и простой интерфейс"),
        ("de_xfce", "XFCE - легковесное и быстрое окружение"),
        ("de_cinnamon", "Cinnamon - традиционный рабочий стол"),
        ("de_mate", "MATE - классическое окружение"),
        ("de_i3", "i3wm - тайловый менеджер окон"),
        ("de_sway", "Sway - тайловый композитор Wayland"),
        ("de_none", "Только командная строка (серверная установка)"),
        ("search_layout", "Найти раскладку (код или название):"),
        ("select_layouts", "Выберите раскладку клавиатуры"),
        ("add_more_layouts", "Добавить ещё раскладку?"),
        ("switch_combination", "Комбинация переключения раскладок"),
        ("error_invalid_input", "Некорректный ввод!"),
        ("select_profile", "Выберите профиль установки"),
        ("profile_desktop", "Desktop - полная установка"),
        ("profile_minimal", "Minimal - минимальная система"),
        ("profile_server", "Server - серверная конфигурация"),
        ("profile_xorg", "Xorg - базовая графика"),
        ("select_kernel", "Выберите ядро"),
        ("kernel_stable", "linux (стабильное)"),
        ("kernel_lts", "linux-lts (долгосрочная поддержка)"),
        ("kernel_zen", "linux-zen (для рабочего стола)"),
        ("packages_browsers", "Дополнительные пакеты: браузеры"),
        ("packages_development", "Дополнительные пакеты: разработка"),
        ("packages_multimedia", "Дополнительные пакеты: мультимедиа"),
        ("packages_utilities", "Дополнительные пакеты: утилиты"),
        ("packages_documents", "Дополнительные пакеты: документы"),
        ("packages_system", "Дополнительные пакеты: система"),
        ("enable_aur", "Установить помощник AUR?"),
        ("no_aur", "Без помощника AUR"),
        ("use_reflector", "Подобрать зеркала с помощью reflector?"),
        ("error_empty_hostname", "Имя компьютера не может быть пустым!"),
        ("error_invalid_hostname", "Некорректное имя компьютера!"),
        ("select_network_manager", "Выберите сетевой менеджер"),
        ("networkmanager", "NetworkManager (рекомендуется)"),
        ("systemd_networkd", "systemd-networkd (серверы)"),
        ("iwd", "iwd (минимализм)"),
        ("root_password", "Пароль root:"),
        ("confirm_password", "Подтверждение пароля:"),
        ("user_password", "Пароль пользователя:"),
        ("passwords_dont_match", "Пароли не совпадают!"),
        ("error_password_empty", "Пароль не может быть пустым!"),
        ("error_password_short", "Пароль должен содержать не менее 6 символов!"),
        ("username", "Имя пользователя:"),
        ("error_username_invalid", "Некорректное имя пользователя!"),
        ("user_groups", "Группы пользователя"),
        ("select_timezone", "Выберите часовой пояс"),
        ("error_missing_settings", "Не заданы обязательные параметры:"),
        ("confirm_install", "Начать установку?"),
        ("confirm_exit", "Выйти из установщика?"),
        ("installation_progress", "Прогресс установки"),
        ("formatting_disk", "Форматирование диска..."),
        ("mounting_partitions", "Монтирование разделов..."),
        ("updating_mirrors", "Обновление списка зеркал..."),
        ("installing_base", "Установка базовой системы..."),
        ("installing_kernel", "Установка ядра..."),
        ("generating_fstab", "Генерация fstab..."),
        ("configuring_locale", "Настройка локали..."),
        ("configuring_timezone", "Настройка часового пояса..."),
        ("setting_hostname", "Установка имени компьютера..."),
        ("installing_bootloader", "Установка загрузчика..."),
        ("installing_gpu_drivers", "Установка видеодрайверов..."),
        ("installing_desktop", "Установка окружения рабочего стола..."),
        ("creating_users", "Создание пользователей..."),
        ("installing_packages", "Установка дополнительных пакетов..."),
        ("enabling_services", "Включение сервисов..."),
        ("installation_complete", "Установка завершена!"),
        ("installation_failed", "Ошибка при установке! Подробности в журнале."),
        ("post_install", "Что дальше?"),
        ("post_reboot", "Перезагрузить сейчас"),
        ("post_stay", "Остаться в LiveCD"),
        ("post_chroot", "Открыть chroot для ручной настройки"),
        ("post_logs", "Посмотреть журнал установки"),
        ("config_saved", "Конфигурация сохранена."),
        ("config_save_failed", "Не удалось сохранить конфигурацию."),
        ("config_loaded", "Конфигурация загружена."),
        ("config_not_found", "Сохранённая конфигурация не найдена."),
    ])
});

/// Label lookup for one language.
#[derive(Debug, Clone, Copy, Default)]
pub struct Labels {
    language: Language,
}

impl Labels {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    fn table(&self) -> &'static Table {
        match self.language {
            Language::En => &EN,
            Language::Ru => &RU,
        }
    }

    /// Text for `key`; English when this language lacks it, `key` itself
    /// when no table has it.
    pub fn get<'a>(&self, key: &'a str) -> &'a str {
        match self.table().get(key).or_else(|| EN.get(key)) {
            Some(text) => *text,
            None => key,
        }
    }

    /// Like [`get`](Self::get), but also translates a leading key followed by
    /// literal text, e.g. `"de_kde (2GB RAM, 8GB disk)"`.
    pub fn render<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let (head, rest) = match text.split_once(' ') {
            Some((head, rest)) => (head, Some(rest)),
            None => (text, None),
        };
        let translated = self.get(head);
        match rest {
            Some(rest) if translated != head => Cow::Owned(format!("{} {}", translated, rest)),
            None if translated != head => Cow::Borrowed(translated),
            _ => Cow::Borrowed(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_keys() {
        let en = Labels::new(Language::En);
        assert_eq!(en.get("exit"), "Exit");
        assert_eq!(en.get("no such key"), "no such key");
        assert_eq!(Labels::new(Language::Ru).get("exit"), "Выход");
    }

    #[test]
    fn both_tables_have_the_same_keys() {
        let mut en: Vec<_> = EN.keys().collect();
        let mut ru: Vec<_> = RU.keys().collect();
        en.sort();
        ru.sort();
        assert_eq!(en, ru);
    }

    #[test]
    fn every_stage_label_exists() {
        for (key, _) in crate::progress::STAGES {
            assert_ne!(Labels::default().get(key), key);
        }
    }

    #[test]
    fn render_translates_a_leading_key() {
        let en = Labels::new(Language::En);
        assert_eq!(
            en.render("de_sway (1GB RAM, 2GB disk)"),
            "Sway - Wayland tiling compositor (1GB RAM, 2GB disk)"
        );
        assert_eq!(en.render("firefox            Firefox"), "firefox            Firefox");
        assert_eq!(en.render("de_none"), "Command line only (server installation)");
    }

    #[test]
    fn language_codes() {
        assert_eq!(Language::from_code("RU"), Language::Ru);
        assert_eq!(Language::from_code("klingon"), Language::En);
        assert_eq!(serde_json::to_string(&Language::Ru).unwrap(), "\"ru\"");
    }
}
