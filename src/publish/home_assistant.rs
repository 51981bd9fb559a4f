//! Home Assistant `input_select` updates over the REST API

use super::PublishError;
use crate::config::HomeAssistantConfig;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

const SELECT_OPTION_PATH: &str = "/services/input_select/select_option";
const SET_OPTIONS_PATH: &str = "/services/input_select/set_options";
const REQUEST_TIMEOUT_SECS: u64 = 10;

pub struct HomeAssistant {
    client: Client,
    base_url: String,
    token: Option<String>,
    entity_id: String,
}

impl HomeAssistant {
    pub fn new(config: &HomeAssistantConfig) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            entity_id: config.entity_id.clone(),
        })
    }

    /// Select the current location in the entity
    pub async fn select_option(&self, option: &str) -> Result<(), PublishError> {
        let body = json!({
            "entity_id": self.entity_id,
            "option": option,
        });
        self.call(SELECT_OPTION_PATH, &body).await
    }

    /// Replace the entity's option list
    pub async fn set_options(&self, options: &[String]) -> Result<(), PublishError> {
        let body = json!({
            "entity_id": self.entity_id,
            "options": options,
        });
        self.call(SET_OPTIONS_PATH, &body).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn call(&self, path: &str, body: &Value) -> Result<(), PublishError> {
        debug!("POST {} {}", path, body);

        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
