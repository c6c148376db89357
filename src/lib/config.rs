use std::time::Duration;

/// Tunables of a search field and the geocoding client behind it.
///
/// Every field has a default, so a partial configuration section is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// The search endpoint. The query is appended as the `q` parameter.
    pub endpoint: String,
    /// How long the input has to stay unchanged before a lookup is sent.
    pub quiet_interval_ms: u64,
    /// Proposal labels longer than this are cut off.
    pub max_display_length: usize,
    /// Overall timeout of one geocoding request.
    pub timeout_ms: u64,
    /// Maximum number of features the service is asked to return.
    pub limit: Option<u32>,
    pub user_agent: String,
}

impl SearchConfig {
    pub fn quiet_interval(&self) -> Duration {
        Duration::from_millis(self.quiet_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://data.geopf.fr/geocodage/search".to_string(),
            quiet_interval_ms: 500,
            max_display_length: 45,
            timeout_ms: 10_000,
            limit: None,
            user_agent: concat!("geosearch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[test]
fn partial_config_falls_back_to_defaults() {
    let config: SearchConfig = serde_json::from_str(r#"{ "quiet_interval_ms": 1000 }"#).unwrap();
    assert_eq!(config.quiet_interval(), Duration::from_millis(1000));
    assert_eq!(config.max_display_length, 45);
    assert_eq!(config.endpoint, SearchConfig::default().endpoint);
}
