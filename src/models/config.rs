use crate::exec::KdfParams;
use serde::{Deserialize, Serialize};

/// User configuration from STEGOSIGHT Config.yaml
///
/// Contains user preferences and default paths.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserConfig {
    #[serde(rename = "STEGOSIGHT_Settings")]
    pub settings: UserSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSettings {
    #[serde(rename = "Default Output", default)]
    pub default_output: String,

    #[serde(rename = "Overwrite Existing", default)]
    pub overwrite_existing: bool,

    #[serde(rename = "Encrypt By Default", default = "default_true")]
    pub encrypt_by_default: bool,

    #[serde(rename = "Argon2 Memory", default = "default_argon2_memory")]
    pub argon2_memory: u32,

    #[serde(rename = "Argon2 Time Cost", default = "default_argon2_time_cost")]
    pub argon2_time_cost: u32,

    #[serde(rename = "Argon2 Parallelism", default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,

    #[serde(rename = "Debug Mode", default)]
    pub debug_mode: bool,
}

fn default_true() -> bool {
    true
}

fn default_argon2_memory() -> u32 {
    64
}

fn default_argon2_time_cost() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    2
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            default_output: String::new(),
            overwrite_existing: false,
            encrypt_by_default: true,
            argon2_memory: default_argon2_memory(),
            argon2_time_cost: default_argon2_time_cost(),
            argon2_parallelism: default_argon2_parallelism(),
            debug_mode: false,
        }
    }
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            settings: UserSettings::default(),
        }
    }
}

impl UserSettings {
    /// Key-derivation parameters as embed requests carry them.
    pub fn kdf(&self) -> KdfParams {
        KdfParams {
            memory_mib: self.argon2_memory,
            time_cost: self.argon2_time_cost,
            parallelism: self.argon2_parallelism,
        }
    }
}
