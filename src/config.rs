use {
    crate::utils::oserror::OsError,
    serde::{Deserialize, Serialize},
    std::path::Path,
    thiserror::Error,
};

#[cfg(test)]
mod tests;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read {0}")]
    Read(String, #[source] OsError),
    #[error("Could not parse the configuration")]
    Parse(#[source] serde_json::Error),
    #[error("Could not serialize the configuration")]
    Serialize(#[source] serde_json::Error),
    #[error("`vsyncs-to-apply-rate-change` must be at least 1")]
    ZeroVsyncs,
}

/// Tunables of a single display.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct DisplayConfig {
    pub disable_hdr_handling: bool,
    pub swap_interval_zero: bool,
    pub enable_gpu_tonemapper: bool,
    pub vsyncs_to_apply_rate_change: u32,
    pub max_layer_count: usize,
    pub cwb_wait_ms: u64,
    pub idle_active_ms: i64,
    pub disable_sdr_dimming: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            disable_hdr_handling: false,
            swap_interval_zero: false,
            enable_gpu_tonemapper: false,
            vsyncs_to_apply_rate_change: 1,
            max_layer_count: 32,
            cwb_wait_ms: 1000,
            idle_active_ms: 0,
            disable_sdr_dimming: false,
        }
    }
}

impl DisplayConfig {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(ConfigError::Parse)?;
        if config.vsyncs_to_apply_rate_change == 0 {
            return Err(ConfigError::ZeroVsyncs);
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let s = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => return Err(ConfigError::Read(path.display().to_string(), e.into())),
        };
        Self::parse(&s)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)
    }
}
