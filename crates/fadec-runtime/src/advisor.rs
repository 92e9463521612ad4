//! Status advisory
//!
//! An advisor turns a telemetry snapshot into a short free-text status and
//! an observation into a structured alert. Advisors are external and
//! unreliable: callers go through [`summarize_or_fallback`] and
//! [`diagnostic_alert`], which bound the wait and substitute fixed text on
//! any failure. Advisors only ever see copies of simulation state.

use std::fmt::Write as _;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use fadec_core::{Controls, OperatingMode, Telemetry, TickSnapshot, EGT_REDLINE_C};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::AdvisorError;

/// Status text used whenever the advisor cannot answer
pub const STATUS_FALLBACK: &str = "EMS LINK FAILURE: UNABLE TO PROCESS TELEMETRY.";
/// Alert text used whenever the advisor cannot answer
pub const ALERT_FALLBACK: &str = "SYSTEM CHECK COMPLETE";

const LOW_OIL_PRESSURE_PSI: f64 = 10.0;
const LOW_OIL_PRESSURE_MIN_CORE_PCT: f64 = 50.0;
const HIGH_VIBRATION_IPS: f64 = 3.0;

/// What an advisor is asked about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRequest {
    pub telemetry: Telemetry,
    pub mode: OperatingMode,
    pub controls: Controls,
}

impl From<&TickSnapshot> for StatusRequest {
    fn from(snapshot: &TickSnapshot) -> Self {
        Self {
            telemetry: snapshot.telemetry,
            mode: snapshot.mode,
            controls: snapshot.controls,
        }
    }
}

impl StatusRequest {
    /// Prompt text for a language-model advisor
    pub fn prompt(&self) -> String {
        let t = &self.telemetry;
        let c = &self.controls;
        let mut prompt = String::new();
        let _ = writeln!(
            prompt,
            "Role: You are the Engine Management System (EMS) for a high-bypass turbofan jet engine."
        );
        let _ = writeln!(
            prompt,
            "Task: Analyze the current telemetry snapshot and provide a concise status report (max 2 sentences)."
        );
        let _ = writeln!(prompt, "Tone: Technical, precise, aerospace style.");
        let _ = writeln!(prompt);
        let _ = writeln!(prompt, "Current State: {}", self.mode);
        let _ = writeln!(
            prompt,
            "Controls: Master={}, Fuel={}, Ignition={}, Throttle={:.1}%",
            c.master_switch,
            c.fuel_pump,
            c.ignition,
            c.throttle()
        );
        let _ = writeln!(prompt);
        let _ = writeln!(prompt, "Telemetry:");
        let _ = writeln!(prompt, "- N1 (Fan): {:.1}%", t.fan_speed_pct);
        let _ = writeln!(prompt, "- N2 (Core): {:.1}%", t.core_speed_pct);
        let _ = writeln!(prompt, "- EGT: {:.0} C (Redline: {EGT_REDLINE_C:.0} C)", t.egt_c);
        let _ = writeln!(prompt, "- Fuel Flow: {:.0} kg/h", t.fuel_flow_kg_h);
        let _ = writeln!(prompt, "- Oil Pressure: {:.0} psi", t.oil_pressure_psi);
        let _ = writeln!(prompt, "- Vibration: {:.2} ips", t.vibration_ips);
        let _ = writeln!(prompt);
        let _ = write!(
            prompt,
            "Identify any anomalies (High EGT, Low Oil Press, Vibration) or confirm nominal operation."
        );
        prompt
    }
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
}

/// Structured alert as returned by an advisor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPayload {
    pub level: AlertLevel,
    pub message: String,
}

/// Alert ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemAlert {
    pub id: Uuid,
    pub level: AlertLevel,
    pub message: String,
    /// Wall-clock time the alert was raised, ms since the Unix epoch
    pub timestamp_ms: u64,
}

impl SystemAlert {
    fn new(payload: AlertPayload) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self {
            id: Uuid::new_v4(),
            level: payload.level,
            message: payload.message,
            timestamp_ms,
        }
    }
}

/// External status summarizer
#[async_trait]
pub trait StatusAdvisor: Send + Sync {
    /// Free-text status, at most two sentences
    async fn summarize(&self, request: &StatusRequest) -> Result<String, AdvisorError>;

    /// JSON document `{"level": ..., "message": ...}` for an observation
    async fn diagnose(&self, observation: &str) -> Result<String, AdvisorError>;
}

/// Ask for a status, substituting [`STATUS_FALLBACK`] on error, empty text
/// or timeout
pub async fn summarize_or_fallback(
    advisor: &dyn StatusAdvisor,
    request: &StatusRequest,
    timeout: Duration,
) -> String {
    let result = match tokio::time::timeout(timeout, advisor.summarize(request)).await {
        Ok(result) => result,
        Err(_) => Err(AdvisorError::Timeout(timeout)),
    };
    match result.and_then(non_empty) {
        Ok(text) => text,
        Err(err) => {
            warn!(%err, "status advisor failed");
            STATUS_FALLBACK.to_string()
        }
    }
}

/// Ask for an alert, substituting an info-level [`ALERT_FALLBACK`] on any
/// failure
pub async fn diagnostic_alert(
    advisor: &dyn StatusAdvisor,
    observation: &str,
    timeout: Duration,
) -> SystemAlert {
    let result = match tokio::time::timeout(timeout, advisor.diagnose(observation)).await {
        Ok(result) => result,
        Err(_) => Err(AdvisorError::Timeout(timeout)),
    };
    let payload = result
        .and_then(non_empty)
        .and_then(|text| Ok(serde_json::from_str::<AlertPayload>(&text)?));
    match payload {
        Ok(payload) => SystemAlert::new(payload),
        Err(err) => {
            warn!(%err, "diagnostic advisor failed");
            SystemAlert::new(AlertPayload {
                level: AlertLevel::Info,
                message: ALERT_FALLBACK.to_string(),
            })
        }
    }
}

fn non_empty(text: String) -> Result<String, AdvisorError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(AdvisorError::EmptyResponse)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Offline advisor working from fixed limits
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdAdvisor;

impl ThresholdAdvisor {
    /// Anomalies present in a request, most severe first
    pub fn anomalies(request: &StatusRequest) -> Vec<&'static str> {
        let t = &request.telemetry;
        let mut found = Vec::new();
        match request.mode {
            OperatingMode::Seized => found.push("ENGINE SEIZED"),
            OperatingMode::Fire => found.push("ENGINE FIRE"),
            _ => {}
        }
        if t.egt_c > EGT_REDLINE_C {
            found.push("EGT ABOVE REDLINE");
        }
        if t.oil_pressure_psi < LOW_OIL_PRESSURE_PSI
            && t.core_speed_pct > LOW_OIL_PRESSURE_MIN_CORE_PCT
        {
            found.push("LOW OIL PRESSURE");
        }
        if t.vibration_ips > HIGH_VIBRATION_IPS {
            found.push("HIGH VIBRATION");
        }
        found
    }
}

#[async_trait]
impl StatusAdvisor for ThresholdAdvisor {
    async fn summarize(&self, request: &StatusRequest) -> Result<String, AdvisorError> {
        let t = &request.telemetry;
        let first = format!(
            "{} AT N1 {:.1}% N2 {:.1}% EGT {:.0}C.",
            request.mode, t.fan_speed_pct, t.core_speed_pct, t.egt_c
        );
        let anomalies = Self::anomalies(request);
        let second = if anomalies.is_empty() {
            "ALL PARAMETERS NOMINAL.".to_string()
        } else {
            format!("CAUTION: {}.", anomalies.join(", "))
        };
        Ok(format!("{first} {second}"))
    }

    async fn diagnose(&self, observation: &str) -> Result<String, AdvisorError> {
        let lower = observation.to_ascii_lowercase();
        let level = if ["fire", "seiz", "redline"].iter().any(|k| lower.contains(k)) {
            AlertLevel::Critical
        } else if ["low", "high", "vib", "fail"].iter().any(|k| lower.contains(k)) {
            AlertLevel::Warning
        } else {
            AlertLevel::Info
        };
        let payload = AlertPayload {
            level,
            message: observation.trim().to_uppercase(),
        };
        Ok(serde_json::to_string(&payload)?)
    }
}
