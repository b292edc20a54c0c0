//! The accrual collector.
//!
//! A long-lived background worker that finds submitted orders still in non-terminal states, asks the external accrual
//! service what became of them, and advances each order's state machine. Work is derived from the orders table itself
//! (there is no job queue): each tick claims a batch with skip-locked row locks and fans it out to a small pool of
//! worker tasks over a bounded channel.
//!
//! The accrual service may answer 429 with a `Retry-After` period. That deadline goes into a process-wide gate which
//! every coarse decision point consults: the tick, the producer, each worker, and the top of `handle_order`.
//! Duplicate polls of the same order are harmless, so the gate only ever needs to be advanced, never exact.

use std::{
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::Utc;
use log::*;
use lpg_common::Kopek;
use loyalty_points_engine::{
    db_types::{Order, OrderStatus},
    helpers::retry::Retrier,
    traits::{CollectorApiError, CollectorDatabase},
};
use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::{header, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tokio::{
    sync::{mpsc, Mutex},
    time::MissedTickBehavior,
};
use tokio_util::sync::CancellationToken;

const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_BATCH_SIZE: usize = 10;
const DEFAULT_WORKERS_NUM: usize = 3;
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Failed to request accrual: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Failed to request accrual, http_code={0}")]
    UnexpectedStatus(u16),
    #[error("Database error: {0}")]
    Database(#[from] CollectorApiError),
}

/// Status vocabulary of the accrual service. `REGISTERED` only exists upstream; locally it collapses into
/// PROCESSING. Any other status string fails decoding and aborts the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccrualStatus {
    Registered,
    Processing,
    Processed,
    Invalid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccrualResponse {
    pub order: String,
    pub status: AccrualStatus,
    #[serde(default)]
    pub accrual: Option<Kopek>,
}

#[derive(Debug, Clone)]
pub enum AccrualReply {
    /// 200: the accrual service has an answer for this order.
    Known(AccrualResponse),
    /// 204: the order is not registered upstream yet.
    NotRegistered,
    /// 429: back off globally for the given period.
    RateLimited(Duration),
}

//----------------------------------------------   Client  ----------------------------------------------------
#[derive(Clone)]
pub struct AccrualClient {
    client: reqwest::Client,
    base_url: String,
}

impl AccrualClient {
    pub fn new(base_url: &str) -> Result<Self, CollectorError> {
        let client = reqwest::Client::builder().timeout(CLIENT_TIMEOUT).build()?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
    }

    /// One status query against the accrual service. Transport-level failures (timeouts, refused connections) are
    /// retried; HTTP status handling is left to the caller via [`AccrualReply`].
    pub async fn fetch_accrual(&self, number: &str) -> Result<AccrualReply, CollectorError> {
        let url = format!("{}/api/orders/{}", self.base_url, number);
        let retrier = Retrier::default();
        let response = retrier
            .run(|| self.client.get(&url).send(), |e: &reqwest::Error| e.is_timeout() || e.is_connect())
            .await?;
        match response.status() {
            StatusCode::OK => Ok(AccrualReply::Known(response.json::<AccrualResponse>().await?)),
            StatusCode::NO_CONTENT => Ok(AccrualReply::NotRegistered),
            StatusCode::TOO_MANY_REQUESTS => {
                let header = response.headers().get(header::RETRY_AFTER).and_then(|v| v.to_str().ok());
                Ok(AccrualReply::RateLimited(parse_retry_after(header)))
            },
            code => Err(CollectorError::UnexpectedStatus(code.as_u16())),
        }
    }
}

/// `Retry-After` is whole seconds; a missing or unparseable value falls back to the default.
fn parse_retry_after(value: Option<&str>) -> Duration {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => match v.parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(_) => {
                error!("📡️ Invalid Retry-After value '{v}', using the default");
                DEFAULT_RETRY_AFTER
            },
        },
        None => DEFAULT_RETRY_AFTER,
    }
}

//----------------------------------------------   Collector  ----------------------------------------------------
pub struct Collector<B> {
    poll_interval: Duration,
    pub batch_size: usize,
    pub workers_num: usize,
    client: AccrualClient,
    db: B,
    /// Earliest unix-nanos timestamp at which outbound calls may resume. Only ever advanced (fetch_max).
    next_allowed: Arc<AtomicI64>,
}

impl<B> Collector<B>
where B: CollectorDatabase
{
    pub fn new(accrual_address: &str, poll_interval: Duration, db: B) -> Result<Self, CollectorError> {
        Ok(Self {
            poll_interval,
            batch_size: DEFAULT_BATCH_SIZE,
            workers_num: DEFAULT_WORKERS_NUM,
            client: AccrualClient::new(accrual_address)?,
            db,
            next_allowed: Arc::new(AtomicI64::new(now_nanos())),
        })
    }

    async fn handle_order(&self, order: &Order) -> Result<(), CollectorError> {
        if self.rate_limited() {
            return Ok(());
        }
        info!("📡️ Processing order {}", order.number);
        let reply = self.client.fetch_accrual(&order.number).await?;
        self.apply_reply(order, reply).await
    }

    /// Maps an accrual reply onto the order state machine. PROCESSED stores the awarded points, INVALID is terminal,
    /// and both PROCESSING and the upstream-only REGISTERED keep the order in PROCESSING for the next round.
    async fn apply_reply(&self, order: &Order, reply: AccrualReply) -> Result<(), CollectorError> {
        match reply {
            AccrualReply::Known(response) => match response.status {
                AccrualStatus::Processed => {
                    let accrual = response.accrual.unwrap_or_default();
                    self.db.set_accrual(order.id, accrual).await?;
                    debug!("📡️ Order {} processed with an accrual of {accrual}", order.number);
                },
                AccrualStatus::Invalid => {
                    self.db.set_status(order.id, OrderStatus::Invalid).await?;
                    debug!("📡️ Order {} was rejected by the accrual service", order.number);
                },
                AccrualStatus::Processing | AccrualStatus::Registered => {
                    self.db.set_status(order.id, OrderStatus::Processing).await?;
                },
            },
            AccrualReply::NotRegistered => {
                info!("📡️ Order {} is not registered in the accrual service yet", order.number);
            },
            AccrualReply::RateLimited(period) => {
                self.set_retry_after(period);
                info!("📡️ Too many requests to the accrual service, backing off for {period:?}");
            },
        }
        Ok(())
    }

    fn rate_limited(&self) -> bool {
        now_nanos() < self.next_allowed.load(Ordering::Acquire)
    }

    /// Advances the gate monotonically; a late-arriving smaller deadline never regresses it.
    fn set_retry_after(&self, period: Duration) {
        let period = period.as_nanos().min(i64::MAX as u128) as i64;
        let deadline = now_nanos().saturating_add(period);
        self.next_allowed.fetch_max(deadline, Ordering::AcqRel);
    }

    /// Runs until cancelled. Any error inside a batch is fatal: it propagates to the caller, which decides whether to
    /// restart the component or bring the process down.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), CollectorError> {
        let mut tick = tokio::time::interval(self.poll_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("📡️ Accrual collector started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("📡️ Accrual collector shutting down");
                    return Ok(());
                }
                _ = tick.tick() => {
                    if self.rate_limited() {
                        continue;
                    }
                    debug!("📡️ Fetching accrual data");
                    self.process_batch(&shutdown).await?;
                }
            }
        }
    }

    /// Claims one batch and fans it out: `workers_num` workers drain a bounded channel, the producer stops feeding it
    /// on cancellation or when the rate gate closes, and the first worker error cancels the siblings.
    async fn process_batch(&self, shutdown: &CancellationToken) -> Result<(), CollectorError> {
        let orders = self.db.fetch_orders_batch(self.batch_size as i64).await?;
        debug!("📡️ Fetched {} orders to poll", orders.len());
        if orders.is_empty() {
            return Ok(());
        }

        let (jobs_tx, jobs_rx) = mpsc::channel::<Order>(self.batch_size);
        let jobs_rx = Mutex::new(jobs_rx);
        let batch = shutdown.child_token();

        let producer = async {
            for order in orders {
                if batch.is_cancelled() || self.rate_limited() {
                    break;
                }
                tokio::select! {
                    _ = batch.cancelled() => break,
                    sent = jobs_tx.send(order) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
            // closing the channel lets idle workers drain and exit
            drop(jobs_tx);
        };

        let mut workers: FuturesUnordered<_> =
            (0..self.workers_num).map(|_| self.worker_loop(&jobs_rx, &batch)).collect();
        let mut first_error = None;
        let supervise = async {
            while let Some(result) = workers.next().await {
                if let Err(e) = result {
                    if first_error.is_none() {
                        batch.cancel();
                        first_error = Some(e);
                    }
                }
            }
        };
        futures::join!(producer, supervise);

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn worker_loop(
        &self,
        jobs: &Mutex<mpsc::Receiver<Order>>,
        token: &CancellationToken,
    ) -> Result<(), CollectorError> {
        loop {
            if token.is_cancelled() || self.rate_limited() {
                return Ok(());
            }
            let job = {
                let mut jobs = jobs.lock().await;
                tokio::select! {
                    _ = token.cancelled() => None,
                    job = jobs.recv() => job,
                }
            };
            let Some(order) = job else {
                return Ok(());
            };
            self.handle_order(&order).await?;
        }
    }
}

fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use lpg_common::Kopek;
    use loyalty_points_engine::{
        db_types::{Order, OrderStatus},
        traits::{CollectorApiError, CollectorDatabase},
    };
    use mockall::{mock, predicate::eq};

    use super::{parse_retry_after, AccrualReply, AccrualResponse, AccrualStatus, Collector};

    mock! {
        CollectorDb {}
        impl CollectorDatabase for CollectorDb {
            async fn fetch_orders_batch(&self, batch_size: i64) -> Result<Vec<Order>, CollectorApiError>;
            async fn set_accrual(&self, order_id: i64, sum: Kopek) -> Result<(), CollectorApiError>;
            async fn set_status(&self, order_id: i64, status: OrderStatus) -> Result<(), CollectorApiError>;
        }
    }

    fn claimed_order() -> Order {
        Order {
            id: 7,
            user_id: 1,
            number: "79927398713".to_string(),
            status: OrderStatus::New,
            accrual: Kopek::default(),
            uploaded_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 30, 0).unwrap(),
            last_polled_at: None,
        }
    }

    fn collector(db: MockCollectorDb) -> Collector<MockCollectorDb> {
        Collector::new("http://localhost:9099", Duration::from_secs(1), db).unwrap()
    }

    fn known(status: AccrualStatus, accrual: Option<Kopek>) -> AccrualReply {
        AccrualReply::Known(AccrualResponse { order: "79927398713".to_string(), status, accrual })
    }

    #[tokio::test]
    async fn processed_reply_stores_the_accrual() {
        let mut db = MockCollectorDb::new();
        db.expect_set_accrual().with(eq(7i64), eq(Kopek::from(50000))).once().returning(|_, _| Ok(()));
        let collector = collector(db);
        collector
            .apply_reply(&claimed_order(), known(AccrualStatus::Processed, Some(Kopek::from(50000))))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn processed_reply_without_accrual_stores_zero() {
        let mut db = MockCollectorDb::new();
        db.expect_set_accrual().with(eq(7i64), eq(Kopek::from(0))).once().returning(|_, _| Ok(()));
        let collector = collector(db);
        collector.apply_reply(&claimed_order(), known(AccrualStatus::Processed, None)).await.unwrap();
    }

    #[tokio::test]
    async fn invalid_reply_marks_the_order_invalid() {
        let mut db = MockCollectorDb::new();
        db.expect_set_status().with(eq(7i64), eq(OrderStatus::Invalid)).once().returning(|_, _| Ok(()));
        let collector = collector(db);
        collector.apply_reply(&claimed_order(), known(AccrualStatus::Invalid, None)).await.unwrap();
    }

    #[tokio::test]
    async fn registered_and_processing_replies_keep_the_order_processing() {
        for status in [AccrualStatus::Registered, AccrualStatus::Processing] {
            let mut db = MockCollectorDb::new();
            db.expect_set_status().with(eq(7i64), eq(OrderStatus::Processing)).once().returning(|_, _| Ok(()));
            let collector = collector(db);
            collector.apply_reply(&claimed_order(), known(status, None)).await.unwrap();
        }
    }

    #[tokio::test]
    async fn unregistered_reply_leaves_the_order_unchanged() {
        // no expectations: any storage call would panic the mock
        let collector = collector(MockCollectorDb::new());
        collector.apply_reply(&claimed_order(), AccrualReply::NotRegistered).await.unwrap();
    }

    #[tokio::test]
    async fn rate_limited_reply_closes_the_gate_without_touching_storage() {
        let collector = collector(MockCollectorDb::new());
        assert!(!collector.rate_limited());
        collector
            .apply_reply(&claimed_order(), AccrualReply::RateLimited(Duration::from_secs(60)))
            .await
            .unwrap();
        assert!(collector.rate_limited());
    }

    #[tokio::test]
    async fn closed_gate_skips_the_order_entirely() {
        let collector = collector(MockCollectorDb::new());
        collector.set_retry_after(Duration::from_secs(60));
        // returns without an HTTP call (the client points at a closed port) or storage access
        collector.handle_order(&claimed_order()).await.unwrap();
    }

    #[tokio::test]
    async fn gate_deadline_never_regresses() {
        use std::sync::atomic::Ordering;
        let collector = collector(MockCollectorDb::new());
        collector.set_retry_after(Duration::from_secs(60));
        let deadline = collector.next_allowed.load(Ordering::Acquire);
        collector.set_retry_after(Duration::from_secs(1));
        assert_eq!(collector.next_allowed.load(Ordering::Acquire), deadline);
        collector.set_retry_after(Duration::from_secs(120));
        assert!(collector.next_allowed.load(Ordering::Acquire) > deadline);
    }

    #[test]
    fn retry_after_parsing_defaults_to_a_minute() {
        assert_eq!(parse_retry_after(Some("2")), Duration::from_secs(2));
        assert_eq!(parse_retry_after(Some(" 30 ")), Duration::from_secs(30));
        assert_eq!(parse_retry_after(Some("soon")), Duration::from_secs(60));
        assert_eq!(parse_retry_after(Some("")), Duration::from_secs(60));
        assert_eq!(parse_retry_after(None), Duration::from_secs(60));
    }

    #[test]
    fn accrual_responses_decode_with_optional_accrual() {
        let reply: AccrualResponse =
            serde_json::from_str(r#"{"order":"79927398713","status":"PROCESSED","accrual":729.98}"#).unwrap();
        assert_eq!(reply.status, AccrualStatus::Processed);
        assert_eq!(reply.accrual, Some(Kopek::from(72998)));

        let reply: AccrualResponse =
            serde_json::from_str(r#"{"order":"79927398713","status":"REGISTERED"}"#).unwrap();
        assert_eq!(reply.status, AccrualStatus::Registered);
        assert_eq!(reply.accrual, None);
    }

    #[test]
    fn unknown_accrual_status_fails_decoding() {
        assert!(serde_json::from_str::<AccrualResponse>(r#"{"order":"1","status":"BANANA"}"#).is_err());
    }
}
