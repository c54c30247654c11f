use std::time::Duration;

use async_trait::async_trait;
use pailflow_core::config::VmPlacementConfig;
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use crate::backend::{PlacementBackend, PlacementHandle};
use crate::error::{PlacementError, Result};

const WAIT_FOR_STARTED_TIMEOUT: Duration = Duration::from_secs(60);

/// Creates a single-use compute unit with an auto-destroy policy (spec.md
/// §4.1 "VM"), mirroring `FlyMachineSpawner.spawn`'s three-call flow: find a
/// docker image from an existing machine, create a new machine from it, then
/// block until the new machine reaches the started state.
pub struct VmBackend {
    config: VmPlacementConfig,
    client: reqwest::Client,
}

impl VmBackend {
    pub fn new(config: VmPlacementConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/v1/apps/{}{path}",
            self.config.api_host.trim_end_matches('/'),
            self.config.app_name
        )
    }

    async fn find_image(&self) -> Result<String> {
        let res = self
            .client
            .get(self.api_url("/machines"))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(PlacementError::Failed(format!(
                "listing machines returned {}",
                res.status()
            )));
        }
        let machines: Vec<Value> = res.json().await?;
        machines
            .iter()
            .find_map(|m| m.pointer("/config/image")?.as_str().map(String::from))
            .ok_or_else(|| {
                PlacementError::Failed("no existing machine to source a docker image from".into())
            })
    }

    async fn wait_for_started(&self, machine_id: &str) -> Result<()> {
        let url = self.api_url(&format!("/machines/{machine_id}/wait?state=started"));
        let res = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .timeout(WAIT_FOR_STARTED_TIMEOUT)
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(PlacementError::Failed(format!(
                "machine {machine_id} did not reach started state: {}",
                res.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PlacementBackend for VmBackend {
    fn name(&self) -> &'static str {
        "vm"
    }

    #[instrument(skip(self, bot_config), fields(room_url, app = %self.config.app_name))]
    async fn spawn(
        &self,
        room_url: &str,
        token: &str,
        bot_config: &Map<String, Value>,
        workflow_thread_id: Option<&str>,
    ) -> Result<PlacementHandle> {
        let image = self.find_image().await?;
        let bot_config_json = serde_json::to_string(bot_config)?;

        let mut cmd = vec![
            "--room-url".to_string(),
            room_url.to_string(),
            "--token".to_string(),
            token.to_string(),
            "--bot-config".to_string(),
            bot_config_json,
        ];
        if let Some(thread_id) = workflow_thread_id {
            cmd.push("--workflow-thread-id".to_string());
            cmd.push(thread_id.to_string());
        }

        let body = serde_json::json!({
            "config": {
                "image": image,
                "init": { "cmd": cmd },
                "auto_destroy": true,
            }
        });

        let res = self
            .client
            .post(self.api_url("/machines"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(PlacementError::Failed(format!(
                "creating machine returned {}",
                res.status()
            )));
        }
        let created: Value = res.json().await?;
        let machine_id = created
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| PlacementError::Failed("machine create response missing id".into()))?
            .to_string();

        self.wait_for_started(&machine_id).await?;
        info!(machine_id, "vm placement started");
        Ok(PlacementHandle::Vm { machine_id })
    }

    async fn is_running(&self, handle: &PlacementHandle) -> bool {
        let PlacementHandle::Vm { machine_id } = handle else {
            return false;
        };
        let res = self
            .client
            .get(self.api_url(&format!("/machines/{machine_id}")))
            .bearer_auth(&self.config.api_key)
            .send()
            .await;

        match res {
            Ok(res) if res.status().is_success() => match res.json::<Value>().await {
                Ok(body) => matches!(
                    body.get("state").and_then(Value::as_str),
                    Some("started") | Some("starting")
                ),
                Err(err) => {
                    warn!(error = %err, machine_id, "vm status body decode failed");
                    false
                }
            },
            Ok(res) => {
                warn!(status = %res.status(), machine_id, "vm status check returned error");
                false
            }
            Err(err) => {
                warn!(error = %err, machine_id, "vm status check failed");
                false
            }
        }
    }
}
