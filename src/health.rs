use anyhow::{bail, Result};
use reqwest::Url;

use crate::api::prompt::StatusResponse;

pub const DEFAULT_HEARTBEAT_URL: &str = "http://localhost:5000/v1/heartbeat";

/// Passes only on a 2xx heartbeat whose body reports `status: "ok"`.
pub fn check(url: Url) -> Result<()> {
    let response = reqwest::blocking::get(url)?;
    if !response.status().is_success() {
        bail!("Heartbeat returned {}", response.status());
    }
    let body: StatusResponse = response.json()?;
    if body.status != "ok" {
        bail!("Service reported status {}", body.status);
    }
    Ok(())
}
