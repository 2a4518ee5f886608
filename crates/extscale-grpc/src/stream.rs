//! Push-style activity feed for `StreamIsActive`.
//!
//! Each open stream gets its own task. On every tick the task fetches a
//! reading, interprets it, and sends one `IsActiveResponse` into a
//! bounded channel that tonic drains as the response body. The task
//! stops when the caller hangs up, when the server shuts down, or (under
//! fail-closed) when a fetch fails.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::Status;
use tracing::{debug, error, info};

use extscale_core::{ActivityRule, FailurePolicy};
use extscale_source::DataSource;

use crate::proto::IsActiveResponse;
use crate::status::fetch_status;

/// Messages buffered between the loop and the transport.
const STREAM_BUFFER: usize = 4;

pub type ActivityItem = Result<IsActiveResponse, Status>;

/// One polling loop bound to one caller.
pub struct ActivityStream {
    source: Arc<dyn DataSource>,
    policy: FailurePolicy,
    activity: ActivityRule,
    interval: Duration,
    cancel: CancellationToken,
}

impl ActivityStream {
    pub fn new(
        source: Arc<dyn DataSource>,
        policy: FailurePolicy,
        activity: ActivityRule,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            policy,
            activity,
            interval,
            cancel,
        }
    }

    /// Start the loop and return the receiving half as a stream.
    pub fn spawn(self) -> ReceiverStream<ActivityItem> {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        tokio::spawn(self.run(tx));
        ReceiverStream::new(rx)
    }

    /// Drive the loop until cancellation, hang-up, or a fail-closed fetch
    /// error. Cancellation is observed between ticks and while waiting for
    /// channel capacity; a fetch that has started always completes.
    pub async fn run(self, tx: mpsc::Sender<ActivityItem>) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            source = %self.source.describe(),
            interval_ms = self.interval.as_millis() as u64,
            "activity stream opened"
        );

        let mut sent: u64 = 0;
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!(sent, "activity stream cancelled");
                    break;
                }
                _ = tx.closed() => {
                    debug!(sent, "activity stream caller hung up");
                    break;
                }
                _ = ticker.tick() => {}
            }

            let item = match self.policy.resolve(self.source.fetch().await) {
                Ok(reading) => Ok(IsActiveResponse {
                    result: self.activity.is_active(&reading),
                }),
                Err(e) => {
                    error!(error = %e, kind = e.kind(), sent, "activity stream fetch failed");
                    Err(fetch_status(&e))
                }
            };
            let terminal = item.is_err();

            // A caller that stops reading must not hold the loop past shutdown.
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!(sent, "activity stream cancelled while waiting for capacity");
                    break;
                }
                permit = tx.reserve() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        debug!(sent, "activity stream send failed, caller gone");
                        break;
                    }
                },
            };
            permit.send(item);
            if terminal {
                break;
            }
            sent += 1;
        }
    }
}
