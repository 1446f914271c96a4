//! Newsletter dispatch: a bounded, throttled and cancellable send loop.
//!
//! Delivery is best effort. A failed recipient is recorded and the loop moves
//! on; nothing is retried.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

use crate::{Mailer, OutgoingMail};

/// Throttling and sizing of one campaign run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Pause between two consecutive sends.
    pub delay: Duration,
    /// Recipients past this count are not attempted.
    pub max_recipients: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(600),
            max_recipients: 500,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recipient {
    pub email: String,
    pub name: Option<String>,
}

impl Recipient {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CampaignMessage {
    pub subject: String,
    /// HTML body; `{{name}}` is replaced per recipient.
    pub html: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecipientError {
    pub email: String,
    pub error: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
    pub errors: Vec<RecipientError>,
    /// The run stopped early on a cancellation request.
    pub cancelled: bool,
}

/// Sends `message` to each recipient in order, at most
/// `settings.max_recipients`, pausing `settings.delay` between sends.
///
/// `cancel` is checked before every send and while pausing; once it reads
/// `true` the run stops and the report is marked `cancelled`.
pub async fn send_campaign(
    mailer: &dyn Mailer,
    recipients: &[Recipient],
    message: &CampaignMessage,
    settings: &DispatchSettings,
    cancel: &mut watch::Receiver<bool>,
) -> DispatchReport {
    let mut report = DispatchReport::default();
    let queue = &recipients[..recipients.len().min(settings.max_recipients)];
    if queue.len() < recipients.len() {
        tracing::warn!(
            "campaign capped at {} of {} recipients",
            queue.len(),
            recipients.len()
        );
    }

    for (index, recipient) in queue.iter().enumerate() {
        if index > 0 && !settings.delay.is_zero() && pause(settings.delay, cancel).await {
            report.cancelled = true;
            break;
        }
        if *cancel.borrow() {
            report.cancelled = true;
            break;
        }

        report.attempted += 1;
        let mail = OutgoingMail {
            to: recipient.email.clone(),
            subject: message.subject.clone(),
            html: personalise(&message.html, recipient),
            ..OutgoingMail::default()
        };
        match mailer.send(&mail).await {
            Ok(()) => report.sent += 1,
            Err(err) => {
                tracing::warn!("newsletter send to {} failed: {err}", recipient.email);
                report.failed += 1;
                report.errors.push(RecipientError {
                    email: recipient.email.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    tracing::info!(
        attempted = report.attempted,
        sent = report.sent,
        failed = report.failed,
        cancelled = report.cancelled,
        "campaign dispatch finished"
    );
    report
}

/// Waits `delay`; returns `true` when cancellation was requested meanwhile.
async fn pause(delay: Duration, cancel: &mut watch::Receiver<bool>) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            () = &mut sleep => return *cancel.borrow(),
            changed = cancel.changed() => {
                if changed.is_err() {
                    // Sender gone: nobody can cancel any more.
                    (&mut sleep).await;
                    return *cancel.borrow();
                }
                if *cancel.borrow_and_update() {
                    return true;
                }
            }
        }
    }
}

fn personalise(html: &str, recipient: &Recipient) -> String {
    html.replace("{{name}}", recipient.name.as_deref().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::time::Instant;

    use super::*;
    use crate::MailError;

    #[derive(Default)]
    struct FakeMailer {
        sent: Mutex<Vec<(OutgoingMail, Instant)>>,
        fail_for: Option<&'static str>,
    }

    #[async_trait]
    impl Mailer for FakeMailer {
        async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
            self.sent.lock().unwrap().push((mail.clone(), Instant::now()));
            if self.fail_for == Some(mail.to.as_str()) {
                return Err(MailError::Rejected {
                    status: 422,
                    message: "invalid recipient".to_string(),
                });
            }
            Ok(())
        }
    }

    fn recipients(count: usize) -> Vec<Recipient> {
        (0..count)
            .map(|i| Recipient {
                email: format!("r{i}@example.org"),
                name: (i % 2 == 0).then(|| format!("Leitor {i}")),
            })
            .collect()
    }

    fn message() -> CampaignMessage {
        CampaignMessage {
            subject: "Edição semanal".to_string(),
            html: "<p>Olá, {{name}}!</p>".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sends_in_order_with_delay_between() {
        let mailer = FakeMailer::default();
        let (_tx, mut rx) = watch::channel(false);
        let settings = DispatchSettings {
            delay: Duration::from_millis(600),
            max_recipients: 10,
        };

        let start = Instant::now();
        let report = send_campaign(&mailer, &recipients(3), &message(), &settings, &mut rx).await;

        assert_eq!(report.attempted, 3);
        assert_eq!(report.sent, 3);
        assert!(!report.cancelled);
        // Two pauses for three sends; none after the last one.
        assert_eq!(start.elapsed(), Duration::from_millis(1_200));

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent[0].0.html, "<p>Olá, Leitor 0!</p>");
        assert_eq!(sent[1].0.html, "<p>Olá, !</p>");
        assert_eq!(sent[1].1 - sent[0].1, Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn caps_recipients_and_records_failures() {
        let mailer = FakeMailer {
            fail_for: Some("r1@example.org"),
            ..FakeMailer::default()
        };
        let (_tx, mut rx) = watch::channel(false);
        let settings = DispatchSettings {
            delay: Duration::ZERO,
            max_recipients: 3,
        };

        let report = send_campaign(&mailer, &recipients(5), &message(), &settings, &mut rx).await;

        assert_eq!(report.attempted, 3);
        assert_eq!(report.sent, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors[0].email, "r1@example.org");
        assert!(report.errors[0].error.contains("invalid recipient"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_during_pause() {
        let mailer = FakeMailer::default();
        let (tx, mut rx) = watch::channel(false);
        let settings = DispatchSettings {
            delay: Duration::from_secs(10),
            max_recipients: 10,
        };

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(15)).await;
            let _ = tx.send(true);
        });

        let report = send_campaign(&mailer, &recipients(5), &message(), &settings, &mut rx).await;
        assert!(report.cancelled);
        assert_eq!(report.attempted, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn already_cancelled_sends_nothing() {
        let mailer = FakeMailer::default();
        let (_tx, mut rx) = watch::channel(true);

        let report = send_campaign(
            &mailer,
            &recipients(2),
            &message(),
            &DispatchSettings::default(),
            &mut rx,
        )
        .await;
        assert!(report.cancelled);
        assert_eq!(report.attempted, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_sender_still_sends_everything() {
        let mailer = FakeMailer::default();
        let (tx, mut rx) = watch::channel(false);
        drop(tx);

        let report = send_campaign(
            &mailer,
            &recipients(3),
            &message(),
            &DispatchSettings::default(),
            &mut rx,
        )
        .await;
        assert_eq!(report.sent, 3);
        assert!(!report.cancelled);
    }
}
