//! Fixed boot parameters. Nothing here is read at runtime: there is no
//! filesystem to read a config file from, so the boot binary bakes a
//! `LoaderConfig` in at build time.

use log::LevelFilter;

use crate::ata::PRIMARY_CHANNEL_BASE;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoaderConfig {
    /// First IO port of the ATA channel holding the boot disk
    pub ata_base_port: u16,
    /// Logical sector where the kernel ELF image begins. Sector 0 belongs to
    /// the loader itself.
    pub image_start_sector: u32,
    /// Physical address of the page used to stage the ELF headers
    pub scratch_address: u32,
    /// COM port used for log output
    pub serial_port: u16,
    pub log_level: LevelFilter,
}

impl LoaderConfig {
    pub const DEFAULT: LoaderConfig = LoaderConfig {
        ata_base_port: PRIMARY_CHANNEL_BASE,
        image_start_sector: 1,
        scratch_address: 0x10000,
        serial_port: 0x3f8,
        log_level: LevelFilter::Info,
    };

    /// Override the log level from a build-time setting like
    /// `option_env!("ELFBOOT_LOG")`. Unrecognized names leave the level as-is.
    pub fn with_log_level(mut self, setting: Option<&str>) -> Self {
        if let Some(level) = setting.and_then(parse_log_level) {
            self.log_level = level;
        }
        self
    }

    /// Override the sector the kernel image starts at from a build-time
    /// setting like `option_env!("ELFBOOT_IMAGE_SECTOR")`. Accepts decimal or
    /// `0x`-prefixed hex; anything else leaves the sector as-is.
    pub fn with_image_sector(mut self, setting: Option<&str>) -> Self {
        if let Some(sector) = setting.and_then(parse_sector) {
            self.image_start_sector = sector;
        }
        self
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

pub fn parse_log_level(name: &str) -> Option<LevelFilter> {
    name.trim().parse::<LevelFilter>().ok()
}

pub fn parse_sector(value: &str) -> Option<u32> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => value.parse::<u32>().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout() {
        let config = LoaderConfig::default();
        assert_eq!(config.ata_base_port, 0x1f0);
        assert_eq!(config.image_start_sector, 1);
        assert_eq!(config.scratch_address, 0x10000);
        assert_eq!(config.serial_port, 0x3f8);
        assert_eq!(config.log_level, LevelFilter::Info);
    }

    #[test]
    fn log_level_override() {
        let config = LoaderConfig::DEFAULT.with_log_level(Some("trace"));
        assert_eq!(config.log_level, LevelFilter::Trace);
        let config = LoaderConfig::DEFAULT.with_log_level(Some("OFF"));
        assert_eq!(config.log_level, LevelFilter::Off);
        let config = LoaderConfig::DEFAULT.with_log_level(Some("loud"));
        assert_eq!(config.log_level, LevelFilter::Info);
        let config = LoaderConfig::DEFAULT.with_log_level(None);
        assert_eq!(config.log_level, LevelFilter::Info);
    }

    #[test]
    fn image_sector_override() {
        let config = LoaderConfig::DEFAULT.with_image_sector(Some("72"));
        assert_eq!(config.image_start_sector, 72);
        let config = LoaderConfig::DEFAULT.with_image_sector(Some(" 0x48 "));
        assert_eq!(config.image_start_sector, 0x48);
        let config = LoaderConfig::DEFAULT.with_image_sector(Some("0X4a"));
        assert_eq!(config.image_start_sector, 0x4a);
        let config = LoaderConfig::DEFAULT.with_image_sector(Some("sector nine"));
        assert_eq!(config.image_start_sector, 1);
        let config = LoaderConfig::DEFAULT.with_image_sector(Some("0x"));
        assert_eq!(config.image_start_sector, 1);
        let config = LoaderConfig::DEFAULT.with_image_sector(None);
        assert_eq!(config.image_start_sector, 1);
    }

    #[test]
    fn overrides_compose() {
        let config = LoaderConfig::DEFAULT
            .with_log_level(Some("debug"))
            .with_image_sector(Some("64"));
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert_eq!(config.image_start_sector, 64);
        assert_eq!(config.scratch_address, 0x10000);
    }
}
