//! Mesh daemon service control through systemd.
//!
//! Status is read unprivileged with `systemctl is-active`; start, stop and
//! enable go through the elevation wrapper.

use std::time::Duration;

use crate::process::{ProcessError, ProcessRunner};

const SYSTEMCTL: &str = "systemctl";
const COMMAND_TIMEOUT: Duration = Duration::from_secs(60);
const STATUS_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Start,
    Stop,
    /// Enable at boot and start now.
    Enable,
}

impl ServiceAction {
    fn systemctl_args(self) -> &'static [&'static str] {
        match self {
            Self::Start => &["start"],
            Self::Stop => &["stop"],
            Self::Enable => &["enable", "--now"],
        }
    }
}

impl std::fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.systemctl_args().join(" ").as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{action} failed for {service} (exit {code}): {diagnostic}")]
    Failed {
        action: ServiceAction,
        service: String,
        code: i32,
        diagnostic: String,
    },
    #[error(transparent)]
    Process(#[from] ProcessError),
}

pub struct ServiceManager<R> {
    runner: R,
    name: String,
    elevate: String,
}

impl<R: ProcessRunner> ServiceManager<R> {
    pub fn new(runner: R, name: impl Into<String>, elevate: impl Into<String>) -> Self {
        Self {
            runner,
            name: name.into(),
            elevate: elevate.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True only when systemd reports the unit as exactly `active`.
    pub async fn is_running(&self) -> Result<bool, ServiceError> {
        let args = vec!["is-active".to_string(), self.name.clone()];
        let out = self.runner.run(SYSTEMCTL, &args, STATUS_TIMEOUT).await?;
        Ok(out.success() && out.stdout.trim() == "active")
    }

    pub async fn start(&self) -> Result<(), ServiceError> {
        self.control(ServiceAction::Start).await
    }

    pub async fn stop(&self) -> Result<(), ServiceError> {
        self.control(ServiceAction::Stop).await
    }

    pub async fn enable(&self) -> Result<(), ServiceError> {
        self.control(ServiceAction::Enable).await
    }

    pub async fn control(&self, action: ServiceAction) -> Result<(), ServiceError> {
        let mut args = vec![SYSTEMCTL.to_string()];
        args.extend(action.systemctl_args().iter().map(|s| s.to_string()));
        args.push(self.name.clone());

        let out = self.runner.run(&self.elevate, &args, COMMAND_TIMEOUT).await?;
        if out.success() {
            tracing::info!(service = %self.name, %action, "service command succeeded");
            return Ok(());
        }

        let diagnostic = out.diagnostic().to_string();
        tracing::warn!(
            service = %self.name,
            %action,
            code = ?out.code,
            diagnostic = %diagnostic,
            "service command failed"
        );
        Err(ServiceError::Failed {
            action,
            service: self.name.clone(),
            code: out.code.unwrap_or(-1),
            diagnostic,
        })
    }
}
