use secrecy::SecretString;

use crate::client::consts::{DEFAULT_LIVE_MODEL, DEFAULT_LIVE_URL};

/// Connection settings for the live endpoint. The key travels in the
/// request query string, so it stays wrapped until the handshake is built.
#[derive(Debug, Clone)]
pub struct Config {
    base_url: String,
    model: String,
    api_key: SecretString,
}

impl Config {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            base_url: DEFAULT_LIVE_URL.to_string(),
            model: DEFAULT_LIVE_MODEL.to_string(),
            api_key,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fully qualified model resource name for the setup message.
    pub fn model(&self) -> String {
        if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        }
    }

    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_name_is_qualified_once() {
        let config = Config::new(SecretString::from("k")).with_model("tutor-live");
        assert_eq!(config.model(), "models/tutor-live");

        let config = Config::new(SecretString::from("k")).with_model("models/tutor-live");
        assert_eq!(config.model(), "models/tutor-live");
    }
}
