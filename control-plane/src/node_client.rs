use protocol::{
    DeployRequest, DeployResponse, LogsResponse, StatsResponse, SuccessResponse,
    NODE_SECRET_HEADER,
};

use crate::error::ControlPlaneError;

/// Thin HTTP client for one node's [`node_agent`] surface. One instance per
/// node the control plane knows about.
#[derive(Clone)]
pub struct NodeClient {
    http: reqwest::Client,
    base_url: String,
    node_secret: String,
}

impl NodeClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, node_secret: impl Into<String>) -> Self {
        NodeClient {
            http,
            base_url: base_url.into(),
            node_secret: node_secret.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn deploy(&self, req: &DeployRequest) -> Result<DeployResponse, ControlPlaneError> {
        let response = self
            .http
            .post(self.url("/deploy"))
            .header(NODE_SECRET_HEADER, &self.node_secret)
            .json(req)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    pub async fn wake(&self, server_id: i64) -> Result<(), ControlPlaneError> {
        self.http
            .post(self.url(&format!("/servers/{server_id}/wake")))
            .header(NODE_SECRET_HEADER, &self.node_secret)
            .send()
            .await?
            .error_for_status()?
            .json::<SuccessResponse>()
            .await?;
        Ok(())
    }

    pub async fn hibernate(&self, server_id: i64) -> Result<(), ControlPlaneError> {
        self.http
            .post(self.url(&format!("/servers/{server_id}/hibernate")))
            .header(NODE_SECRET_HEADER, &self.node_secret)
            .send()
            .await?
            .error_for_status()?
            .json::<SuccessResponse>()
            .await?;
        Ok(())
    }

    pub async fn delete(&self, server_id: i64, public_port: Option<u16>) -> Result<(), ControlPlaneError> {
        let mut url = self.url(&format!("/servers/{server_id}"));
        if let Some(port) = public_port {
            url = format!("{url}?public_port={port}");
        }
        self.http
            .delete(url)
            .header(NODE_SECRET_HEADER, &self.node_secret)
            .send()
            .await?
            .error_for_status()?
            .json::<SuccessResponse>()
            .await?;
        Ok(())
    }

    pub async fn stats(&self, server_id: i64) -> Result<StatsResponse, ControlPlaneError> {
        let response = self
            .http
            .get(self.url(&format!("/servers/{server_id}/stats")))
            .header(NODE_SECRET_HEADER, &self.node_secret)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    pub async fn logs(&self, server_id: i64, tail: u32) -> Result<LogsResponse, ControlPlaneError> {
        let response = self
            .http
            .get(self.url(&format!("/servers/{server_id}/logs?tail={tail}")))
            .header(NODE_SECRET_HEADER, &self.node_secret)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}
