use anyhow::Result;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    /// Capacity of the inbound event channel.
    pub event_buffer: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let log_level = std::env::var("DEVCAP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let event_buffer = std::env::var("DEVCAP_EVENT_BUFFER")
            .unwrap_or_else(|_| "256".to_string())
            .parse()?;

        Ok(Self {
            log_level,
            event_buffer,
        })
    }
}
