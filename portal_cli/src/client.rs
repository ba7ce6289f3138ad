use color_eyre::eyre::{eyre, Result, WrapErr};
use portal_proto::{encode_update_json, ChangeSet, PortalUpdate};
use reqwest::StatusCode;

/// Result of pushing one update to the server.
#[derive(Debug)]
pub enum PushOutcome {
    /// The update changed state.
    Changed(ChangeSet),
    Unchanged,
    Rejected { status: StatusCode, reason: String },
}

pub struct StatusClient {
    http: reqwest::Client,
    endpoint: String,
}

impl StatusClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    pub async fn get_text(&self, path: &str) -> Result<String> {
        let url = self.url(path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .wrap_err_with(|| format!("requesting {url}"))?;
        let status = response.status();
        let body = response.text().await.wrap_err("reading response body")?;
        if !status.is_success() {
            return Err(eyre!("{url} returned {status}: {body}"));
        }
        Ok(body)
    }

    pub async fn status(&self, legacy: bool) -> Result<String> {
        let path = if legacy {
            "/status/jsonLegacy"
        } else {
            "/status/json"
        };
        self.get_text(path).await
    }

    pub async fn push(&self, update: &PortalUpdate) -> Result<PushOutcome> {
        let url = self.url("/status");
        let body = encode_update_json(update).wrap_err("encoding update")?;
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .wrap_err_with(|| format!("posting update to {url}"))?;
        Ok(match response.status() {
            StatusCode::NO_CONTENT => PushOutcome::Unchanged,
            status if status.is_success() => {
                let changes = response
                    .json::<ChangeSet>()
                    .await
                    .wrap_err("decoding change set")?;
                PushOutcome::Changed(changes)
            }
            status => PushOutcome::Rejected {
                status,
                reason: response.text().await.wrap_err("reading response body")?,
            },
        })
    }
}
