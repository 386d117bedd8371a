//! Side-effect dispatch for weather alerts
//!
//! A subset of alert conditions (heatwave, flood forecast) additionally
//! goes out through an external email relay. Dispatch is fire-and-forget:
//! a failed send is logged and swallowed, and must never fail or block the
//! poll cycle that triggered it.

use crate::alerts::{AlertCondition, AlertKind};
use crate::error::DispatchError;
use crate::snapshot::HealthSnapshot;
use log::{debug, error, info};
use reqwest::Client;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Payload accepted by the email relay
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmailMessage {
    pub subject: String,
    pub text: String,
    pub recipient: String,
}

/// Contract for delivering an email message, best-effort
#[cfg_attr(test, mockall::automock)]
pub trait DispatchChannel: Send + Sync {
    /// Deliver one message; any 2xx from the relay counts as success
    fn send(
        &self,
        message: EmailMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), DispatchError>> + Send>>;
}

/// Dispatch channel backed by an HTTP email relay
pub struct EmailChannel {
    client: Client,
    endpoint: String,
}

impl EmailChannel {
    /// Create a new email channel for the given relay endpoint
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Transport` if the HTTP client cannot be built.
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, DispatchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }
}

impl DispatchChannel for EmailChannel {
    fn send(
        &self,
        message: EmailMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), DispatchError>> + Send>> {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        Box::pin(async move {
            let response = client.post(&endpoint).json(&message).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(DispatchError::Status {
                    status: status.as_u16(),
                });
            }
            Ok(())
        })
    }
}

/// Relays heatwave and flood-forecast conditions to the email channel
pub struct Dispatcher {
    channel: Arc<dyn DispatchChannel>,
    recipient: String,
    heatwave_temp_c: f64,
}

impl Dispatcher {
    /// Create a dispatcher over the given channel
    pub fn new(channel: Arc<dyn DispatchChannel>, recipient: String, heatwave_temp_c: f64) -> Self {
        Self {
            channel,
            recipient,
            heatwave_temp_c,
        }
    }

    /// Relay one condition, if its kind has a side channel
    ///
    /// Failures are logged and swallowed; this method never returns an
    /// error to its caller.
    pub async fn dispatch(&self, condition: &AlertCondition, snapshot: &HealthSnapshot) {
        let message = match self.compose(condition, snapshot) {
            Some(message) => message,
            None => {
                debug!("No side channel for condition kind {}", condition.kind);
                return;
            }
        };

        let subject = message.subject.clone();
        match self.channel.send(message).await {
            Ok(()) => info!("Dispatched email: {}", subject),
            Err(e) => error!("Failed to dispatch email '{}': {}", subject, e),
        }
    }

    /// Build the email for a condition, or None for kinds without one
    fn compose(
        &self,
        condition: &AlertCondition,
        snapshot: &HealthSnapshot,
    ) -> Option<EmailMessage> {
        match condition.kind {
            AlertKind::Heatwave => Some(EmailMessage {
                subject: "Heatwave Alert".to_string(),
                text: format!(
                    "An air temperature at or above {:.0}\u{b0}C was recorded. {}",
                    self.heatwave_temp_c, condition.message
                ),
                recipient: self.recipient.clone(),
            }),
            AlertKind::FloodForecast => {
                let text = match &snapshot.flood_forecast {
                    Some(forecast) => format!(
                        "Flood forecast for location ({:.4}, {:.4}): severity {:?}, expected around {}.",
                        forecast.location.latitude,
                        forecast.location.longitude,
                        forecast.severity,
                        forecast.forecast_time.to_rfc3339()
                    ),
                    None => condition.message.clone(),
                };
                Some(EmailMessage {
                    subject: "Flood Forecast Alert".to_string(),
                    text,
                    recipient: self.recipient.clone(),
                })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::tests::nominal_snapshot;
    use crate::snapshot::{FloodForecast, GeoLocation, Severity};
    use chrono::Utc;

    fn heatwave_condition() -> AlertCondition {
        AlertCondition {
            kind: AlertKind::Heatwave,
            identity: "heatwave".to_string(),
            message: "Heatwave conditions: 41.2\u{b0}C recorded at sensor air-07".to_string(),
        }
    }

    fn flood_condition() -> AlertCondition {
        AlertCondition {
            kind: AlertKind::FloodForecast,
            identity: "flood-forecast".to_string(),
            message: "Flood forecast".to_string(),
        }
    }

    #[tokio::test]
    async fn test_heatwave_dispatch_sends_fixed_subject() {
        let mut channel = MockDispatchChannel::new();
        channel
            .expect_send()
            .withf(|message: &EmailMessage| {
                message.subject == "Heatwave Alert"
                    && message.text.contains("40")
                    && message.recipient == "ops@example.org"
            })
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let dispatcher = Dispatcher::new(Arc::new(channel), "ops@example.org".to_string(), 40.0);
        dispatcher
            .dispatch(&heatwave_condition(), &nominal_snapshot())
            .await;
    }

    #[tokio::test]
    async fn test_flood_dispatch_includes_forecast_details() {
        let mut snapshot = nominal_snapshot();
        snapshot.flood_forecast = Some(FloodForecast {
            location: GeoLocation {
                latitude: 19.076,
                longitude: 72.8777,
            },
            severity: Severity::High,
            forecast_time: Utc::now(),
        });

        let mut channel = MockDispatchChannel::new();
        channel
            .expect_send()
            .withf(|message: &EmailMessage| {
                message.subject == "Flood Forecast Alert"
                    && message.text.contains("19.0760")
                    && message.text.contains("High")
            })
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let dispatcher = Dispatcher::new(Arc::new(channel), "ops@example.org".to_string(), 40.0);
        dispatcher.dispatch(&flood_condition(), &snapshot).await;
    }

    #[tokio::test]
    async fn test_other_kinds_are_not_dispatched() {
        let mut channel = MockDispatchChannel::new();
        channel.expect_send().times(0);

        let dispatcher = Dispatcher::new(Arc::new(channel), "ops@example.org".to_string(), 40.0);
        let condition = AlertCondition {
            kind: AlertKind::HighAqi,
            identity: "high-aqi".to_string(),
            message: "AQI is 180".to_string(),
        };
        dispatcher.dispatch(&condition, &nominal_snapshot()).await;
    }

    #[tokio::test]
    async fn test_channel_failure_is_swallowed() {
        let mut channel = MockDispatchChannel::new();
        channel
            .expect_send()
            .times(1)
            .returning(|_| Box::pin(async { Err(DispatchError::Status { status: 500 }) }));

        let dispatcher = Dispatcher::new(Arc::new(channel), "ops@example.org".to_string(), 40.0);
        // Must not panic or propagate
        dispatcher
            .dispatch(&heatwave_condition(), &nominal_snapshot())
            .await;
    }

    #[test]
    fn test_email_message_serialization() {
        let message = EmailMessage {
            subject: "Heatwave Alert".to_string(),
            text: "hot".to_string(),
            recipient: "ops@example.org".to_string(),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["subject"], "Heatwave Alert");
        assert_eq!(json["text"], "hot");
        assert_eq!(json["recipient"], "ops@example.org");
    }
}
