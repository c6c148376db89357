use geosearch::SearchConfig;
use once_cell::sync::Lazy;

pub static CONFIG: Lazy<Config> = Lazy::new(|| Config::new().expect("Config could not be loaded."));

#[derive(Debug, Deserialize)]
pub struct General {
    pub log_level: log::Level,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub general: General,
    #[serde(default)]
    pub search: SearchConfig,
}

impl Config {
    pub fn new() -> Result<Self, config::ConfigError> {
        let mut s = config::Config::new();

        // Start off by merging in the "default" configuration file
        s.merge(config::File::with_name("config/default"))?;

        // Add in a local configuration file
        // This file shouldn't be checked in to git
        s.merge(config::File::with_name("config/local").required(false))?;

        s.try_into()
    }
}
