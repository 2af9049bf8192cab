use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{info, warn};

use lumora_core::gateway::{PaymentGateway, PaymentPollStatus, PaymentStatusRequest};
use lumora_core::session::{self, keys, SessionStore};

/// Tuning for the bank-transfer status poll.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    /// Hard deadline measured from poll start. Once past, the poll reports
    /// `Expired` regardless of what the backend last said.
    pub expiry_window: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            expiry_window: Duration::from_secs(600),
        }
    }
}

/// Last observed status for a payment code, persisted to the session store
/// so a reload during polling can pick up where it left off.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PollSnapshot {
    pub status: PaymentPollStatus,
    pub observed_at: DateTime<Utc>,
}

impl PollSnapshot {
    pub fn pending() -> Self {
        Self::observed(PaymentPollStatus::Pending)
    }

    pub fn observed(status: PaymentPollStatus) -> Self {
        Self {
            status,
            observed_at: Utc::now(),
        }
    }
}

/// How a poll ended. Every variant means the interval timer has stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The transfer landed. Carries whatever identifiers the backend chose
    /// to report.
    Success {
        order_id: Option<String>,
        transaction_id: Option<String>,
    },
    Expired,
    Failed,
    /// Cancelled through the handle (unmount / navigation).
    Stopped,
}

/// Runs cancellable payment-status polls.
pub struct PaymentPoller {
    payments: Arc<dyn PaymentGateway>,
    session: Arc<dyn SessionStore>,
    config: PollConfig,
}

/// Owner of a running poll. Dropping the handle aborts the task, so the
/// timer can never outlive the view that started it.
pub struct PollHandle {
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<PollOutcome>>,
}

impl PollHandle {
    /// Cancel the poll and wait for the task to wind down.
    pub async fn stop(mut self) -> PollOutcome {
        let _ = self.stop_tx.send(true);
        self.join_inner().await
    }

    /// Wait for the poll to reach a terminal outcome on its own.
    pub async fn join(mut self) -> PollOutcome {
        self.join_inner().await
    }

    async fn join_inner(&mut self) -> PollOutcome {
        match self.task.take() {
            Some(task) => task.await.unwrap_or(PollOutcome::Stopped),
            None => PollOutcome::Stopped,
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

impl PaymentPoller {
    pub fn new(
        payments: Arc<dyn PaymentGateway>,
        session: Arc<dyn SessionStore>,
        config: PollConfig,
    ) -> Self {
        Self {
            payments,
            session,
            config,
        }
    }

    /// Start polling a payment code. The first probe fires immediately,
    /// then every configured interval until the backend reports a terminal
    /// status, the expiry window passes, or the handle stops the task.
    pub fn spawn(&self, payment_code: String, amount: i64) -> PollHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let payments = Arc::clone(&self.payments);
        let session = Arc::clone(&self.session);
        let config = self.config;

        let task = tokio::spawn(async move {
            let request = PaymentStatusRequest {
                payment_code: payment_code.clone(),
                amount,
            };
            let snapshot_key = keys::payment_snapshot(&payment_code);
            let deadline = Instant::now() + config.expiry_window;
            let mut ticker = interval(config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    changed = stop_rx.changed() => {
                        // either an explicit stop or the sender went away
                        if changed.is_err() || *stop_rx.borrow() {
                            info!(%payment_code, "payment poll stopped");
                            return PollOutcome::Stopped;
                        }
                    }
                    _ = ticker.tick() => {
                        if Instant::now() >= deadline {
                            session::set_json(
                                session.as_ref(),
                                &snapshot_key,
                                &PollSnapshot::observed(PaymentPollStatus::Expired),
                            );
                            info!(%payment_code, "payment poll expired");
                            return PollOutcome::Expired;
                        }

                        match payments.payment_status(&request).await {
                            Ok(outcome) => {
                                session::set_json(
                                    session.as_ref(),
                                    &snapshot_key,
                                    &PollSnapshot::observed(outcome.status),
                                );
                                match outcome.status {
                                    PaymentPollStatus::Success => {
                                        info!(%payment_code, "payment confirmed");
                                        return PollOutcome::Success {
                                            order_id: outcome.order_id,
                                            transaction_id: outcome.transaction_id,
                                        };
                                    }
                                    PaymentPollStatus::Expired => {
                                        return PollOutcome::Expired;
                                    }
                                    PaymentPollStatus::Failed => {
                                        return PollOutcome::Failed;
                                    }
                                    PaymentPollStatus::Pending => {}
                                }
                            }
                            // transient errors keep the poll alive until the
                            // deadline decides
                            Err(err) => {
                                warn!(%payment_code, error = %err, "payment status probe failed");
                            }
                        }
                    }
                }
            }
        });

        PollHandle {
            stop_tx,
            task: Some(task),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lumora_core::error::GatewayResult;
    use lumora_core::gateway::{
        BankPaymentSlip, PaymentRequest, PaymentStatusOutcome,
    };
    use lumora_core::session::MemorySessionStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Reports `pending` for the first `pending_polls` probes, then the
    /// given terminal status.
    struct ScriptedPayments {
        pending_polls: usize,
        then: PaymentPollStatus,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PaymentGateway for ScriptedPayments {
        async fn create_payment(
            &self,
            _request: &PaymentRequest,
        ) -> GatewayResult<BankPaymentSlip> {
            unreachable!("poll tests never create payments")
        }

        async fn payment_status(
            &self,
            _request: &PaymentStatusRequest,
        ) -> GatewayResult<PaymentStatusOutcome> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let status = if call < self.pending_polls {
                PaymentPollStatus::Pending
            } else {
                self.then
            };
            Ok(PaymentStatusOutcome {
                status,
                payment_status: None,
                order_id: Some("order-1".to_string()),
                transaction_id: Some("txn-9".to_string()),
            })
        }
    }

    fn poller(
        gateway: ScriptedPayments,
        session: Arc<MemorySessionStore>,
        config: PollConfig,
    ) -> PaymentPoller {
        PaymentPoller::new(Arc::new(gateway), session, config)
    }

    #[tokio::test]
    async fn test_poll_resolves_on_success() {
        let session = Arc::new(MemorySessionStore::new());
        let poller = poller(
            ScriptedPayments {
                pending_polls: 2,
                then: PaymentPollStatus::Success,
                calls: AtomicUsize::new(0),
            },
            session.clone(),
            PollConfig {
                interval: Duration::from_millis(10),
                expiry_window: Duration::from_secs(5),
            },
        );

        let outcome = poller.spawn("pay-1".to_string(), 250_000).join().await;
        assert_eq!(
            outcome,
            PollOutcome::Success {
                order_id: Some("order-1".to_string()),
                transaction_id: Some("txn-9".to_string()),
            }
        );

        let snapshot: PollSnapshot =
            session::get_json(session.as_ref(), &keys::payment_snapshot("pay-1")).unwrap();
        assert_eq!(snapshot.status, PaymentPollStatus::Success);
    }

    #[tokio::test]
    async fn test_poll_expires_at_the_deadline() {
        let session = Arc::new(MemorySessionStore::new());
        let poller = poller(
            ScriptedPayments {
                pending_polls: usize::MAX,
                then: PaymentPollStatus::Success,
                calls: AtomicUsize::new(0),
            },
            session.clone(),
            PollConfig {
                interval: Duration::from_millis(10),
                expiry_window: Duration::from_millis(45),
            },
        );

        let outcome = poller.spawn("pay-2".to_string(), 250_000).join().await;
        assert_eq!(outcome, PollOutcome::Expired);

        let snapshot: PollSnapshot =
            session::get_json(session.as_ref(), &keys::payment_snapshot("pay-2")).unwrap();
        assert_eq!(snapshot.status, PaymentPollStatus::Expired);
    }

    #[tokio::test]
    async fn test_stop_cancels_a_running_poll() {
        let session = Arc::new(MemorySessionStore::new());
        let poller = poller(
            ScriptedPayments {
                pending_polls: usize::MAX,
                then: PaymentPollStatus::Success,
                calls: AtomicUsize::new(0),
            },
            session,
            PollConfig {
                interval: Duration::from_millis(10),
                expiry_window: Duration::from_secs(60),
            },
        );

        let handle = poller.spawn("pay-3".to_string(), 250_000);
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(handle.stop().await, PollOutcome::Stopped);
    }

    #[tokio::test]
    async fn test_backend_failed_status_ends_the_poll() {
        let session = Arc::new(MemorySessionStore::new());
        let poller = poller(
            ScriptedPayments {
                pending_polls: 0,
                then: PaymentPollStatus::Failed,
                calls: AtomicUsize::new(0),
            },
            session,
            PollConfig {
                interval: Duration::from_millis(10),
                expiry_window: Duration::from_secs(5),
            },
        );

        let outcome = poller.spawn("pay-4".to_string(), 250_000).join().await;
        assert_eq!(outcome, PollOutcome::Failed);
    }

    #[tokio::test]
    async fn test_dropping_the_handle_aborts_the_task() {
        let session = Arc::new(MemorySessionStore::new());
        let gateway = Arc::new(ScriptedPayments {
            pending_polls: usize::MAX,
            then: PaymentPollStatus::Success,
            calls: AtomicUsize::new(0),
        });
        let poller = PaymentPoller::new(
            gateway.clone(),
            session,
            PollConfig {
                interval: Duration::from_millis(5),
                expiry_window: Duration::from_secs(60),
            },
        );

        let handle = poller.spawn("pay-5".to_string(), 250_000);
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(handle);
        tokio::time::sleep(Duration::from_millis(20)).await;

        let after_drop = gateway.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(
            gateway.calls.load(Ordering::SeqCst),
            after_drop,
            "no probes may fire after the handle is gone"
        );
    }
}
