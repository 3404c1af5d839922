//! State machine tests against an in-memory transport.
//!
//! Time is paused, so backoff and reconnection intervals elapse instantly
//! while `Instant::now()` still advances by the simulated amount.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mailhook_imap::{Error, RawAddress, RawEnvelope, ServerConfig, ServerStatus};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::callback::DispatchError;
use crate::envelope::EnvelopeSummary;

/// What the next `open` call does.
enum Open {
    /// Fail with a connection error.
    Fail,
    /// A watching session that plays the given polls.
    Watch(Vec<Poll>),
    /// A fetch session returning this envelope.
    Fetch(Option<RawEnvelope>),
    /// A fetch session whose FETCH fails.
    FetchFails,
}

/// What one `wait_for_updates` call does.
enum Poll {
    /// Times out with nothing.
    Quiet,
    /// Returns these updates at once.
    Updates(Vec<ServerStatus>),
    /// Fails; optionally requests a stop first.
    Fail { stop: bool },
    /// Requests a stop and returns nothing.
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Open,
    OpenFailed,
    Enter,
    Wait,
    Fetch(u32),
    Release { idled: bool },
}

#[derive(Default)]
struct Shared {
    script: VecDeque<Open>,
    events: Vec<(Instant, Event)>,
}

#[derive(Clone)]
struct FakeTransport {
    shared: Arc<Mutex<Shared>>,
    cancel: CancellationToken,
}

impl FakeTransport {
    fn new(script: Vec<Open>, cancel: CancellationToken) -> Self {
        let shared = Shared {
            script: script.into(),
            events: Vec::new(),
        };
        Self {
            shared: Arc::new(Mutex::new(shared)),
            cancel,
        }
    }

    fn record(&self, event: Event) {
        let mut shared = self.shared.lock().unwrap();
        shared.events.push((Instant::now(), event));
    }

    fn events(&self) -> Vec<Event> {
        let shared = self.shared.lock().unwrap();
        shared.events.iter().map(|(_, e)| e.clone()).collect()
    }

    fn times_of(&self, wanted: &Event) -> Vec<Instant> {
        let shared = self.shared.lock().unwrap();
        shared
            .events
            .iter()
            .filter(|(_, e)| e == wanted)
            .map(|(at, _)| *at)
            .collect()
    }

    fn count(&self, wanted: &Event) -> usize {
        self.times_of(wanted).len()
    }
}

struct FakeSession {
    transport: FakeTransport,
    polls: VecDeque<Poll>,
    fetch: Option<std::result::Result<Option<RawEnvelope>, ()>>,
    idled: bool,
}

fn connection_error() -> Error {
    Error::Connection {
        address: "imap.test:143".into(),
        source: io::Error::from(io::ErrorKind::ConnectionRefused),
    }
}

impl Transport for FakeTransport {
    type Session = FakeSession;

    fn open(
        &self,
        _account: &AccountConfig,
    ) -> impl Future<Output = mailhook_imap::Result<FakeSession>> + Send {
        let next = self.shared.lock().unwrap().script.pop_front();
        let transport = self.clone();
        async move {
            let session = |polls: Vec<Poll>, fetch| FakeSession {
                transport: transport.clone(),
                polls: polls.into(),
                fetch,
                idled: false,
            };
            match next {
                Some(Open::Watch(polls)) => {
                    transport.record(Event::Open);
                    Ok(session(polls, None))
                }
                Some(Open::Fetch(envelope)) => {
                    transport.record(Event::Open);
                    Ok(session(Vec::new(), Some(Ok(envelope))))
                }
                Some(Open::FetchFails) => {
                    transport.record(Event::Open);
                    Ok(session(Vec::new(), Some(Err(()))))
                }
                Some(Open::Fail) => {
                    transport.record(Event::OpenFailed);
                    Err(connection_error())
                }
                None => {
                    // Script exhausted: stop the watcher.
                    transport.record(Event::OpenFailed);
                    transport.cancel.cancel();
                    Err(connection_error())
                }
            }
        }
    }
}

impl NotifySession for FakeSession {
    fn enter_notify(&mut self) -> impl Future<Output = mailhook_imap::Result<()>> + Send {
        self.transport.record(Event::Enter);
        self.idled = true;
        async { Ok(()) }
    }

    fn wait_for_updates(
        &mut self,
        timeout: Duration,
    ) -> impl Future<Output = mailhook_imap::Result<Vec<ServerStatus>>> + Send {
        self.transport.record(Event::Wait);
        let poll = self.polls.pop_front().unwrap_or(Poll::Stop);
        let cancel = self.transport.cancel.clone();
        async move {
            match poll {
                Poll::Quiet => {
                    tokio::time::sleep(timeout).await;
                    Ok(Vec::new())
                }
                Poll::Updates(updates) => Ok(updates),
                Poll::Fail { stop } => {
                    if stop {
                        cancel.cancel();
                    }
                    Err(Error::InvalidState("connection lost"))
                }
                Poll::Stop => {
                    cancel.cancel();
                    Ok(Vec::new())
                }
            }
        }
    }

    fn fetch_envelope(
        &mut self,
        number: u32,
    ) -> impl Future<Output = mailhook_imap::Result<Option<RawEnvelope>>> + Send {
        self.transport.record(Event::Fetch(number));
        let result = self.fetch.take().unwrap_or(Ok(None));
        async move { result.map_err(|()| Error::InvalidState("fetch failed")) }
    }

    fn release(self) -> impl Future<Output = ()> + Send {
        self.transport.record(Event::Release { idled: self.idled });
        async {}
    }
}

#[derive(Default)]
struct RecordingHandler {
    seen: Mutex<Vec<EnvelopeSummary>>,
    fail: bool,
}

impl MessageHandler for RecordingHandler {
    fn on_new_message(&self, summary: &EnvelopeSummary) -> Result<(), DispatchError> {
        self.seen.lock().unwrap().push(summary.clone());
        if self.fail {
            Err(DispatchError::NoActionConfigured)
        } else {
            Ok(())
        }
    }
}

fn account() -> Arc<AccountConfig> {
    Arc::new(AccountConfig::new("test", ServerConfig::new("imap.test")))
}

fn envelope(subject: &str) -> RawEnvelope {
    RawEnvelope {
        subject: Some(subject.as_bytes().to_vec()),
        from: vec![RawAddress::new(None, Some("alice"), Some("example.com"))],
        ..RawEnvelope::default()
    }
}

fn new_mail(number: u32) -> Poll {
    Poll::Updates(vec![ServerStatus::exists(number), ServerStatus::recent(1)])
}

async fn run(
    script: Vec<Open>,
    settings: WatcherSettings,
    handler: Arc<RecordingHandler>,
) -> (FakeTransport, WatcherReport) {
    let cancel = CancellationToken::new();
    let transport = FakeTransport::new(script, cancel.clone());
    let watcher = AccountWatcher::new(account(), settings, transport.clone(), handler, cancel);
    let report = watcher.run().await;
    (transport, report)
}

#[tokio::test(start_paused = true)]
async fn test_connection_failure_backs_off_and_retries() {
    let settings = WatcherSettings::default();
    let (transport, report) = run(
        vec![Open::Fail, Open::Watch(vec![Poll::Stop])],
        settings,
        Arc::default(),
    )
    .await;

    let failed = transport.times_of(&Event::OpenFailed)[0];
    let opened = transport.times_of(&Event::Open)[0];
    let waited = opened - failed;
    assert!(waited >= settings.error_backoff);
    assert!(waited < settings.error_backoff + Duration::from_secs(1));
    assert_eq!(report.phase, Phase::Stopped);
    assert_eq!(report.total_errors, 1);
    assert_eq!(report.connections, 1);
}

#[tokio::test(start_paused = true)]
async fn test_error_limit_stops_watcher() {
    let script = (0..10).map(|_| Open::Fail).collect();
    let settings = WatcherSettings::default().with_max_errors(3);
    let (transport, report) = run(script, settings, Arc::default()).await;

    assert_eq!(transport.count(&Event::OpenFailed), 3);
    assert_eq!(report.phase, Phase::Stopped);
    assert_eq!(report.consecutive_errors, 3);
    assert_eq!(report.connections, 0);
}

#[tokio::test(start_paused = true)]
async fn test_unlimited_errors_keep_retrying() {
    let mut script: Vec<Open> = (0..8).map(|_| Open::Fail).collect();
    script.push(Open::Watch(vec![Poll::Stop]));
    let (transport, report) = run(script, WatcherSettings::default(), Arc::default()).await;

    assert_eq!(transport.count(&Event::OpenFailed), 8);
    assert_eq!(report.total_errors, 8);
    assert_eq!(report.connections, 1);
    assert_eq!(report.phase, Phase::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_good_cycle_resets_error_counter() {
    let script = vec![
        Open::Fail,
        Open::Watch(vec![Poll::Quiet, Poll::Fail { stop: true }]),
    ];
    let (_, report) = run(script, WatcherSettings::default(), Arc::default()).await;

    assert_eq!(report.total_errors, 2);
    assert_eq!(report.consecutive_errors, 1);
}

#[tokio::test(start_paused = true)]
async fn test_poll_failure_releases_session_and_reconnects() {
    let script = vec![
        Open::Watch(vec![Poll::Fail { stop: false }]),
        Open::Watch(vec![Poll::Stop]),
    ];
    let (transport, report) = run(script, WatcherSettings::default(), Arc::default()).await;

    assert_eq!(
        transport.events(),
        vec![
            Event::Open,
            Event::Enter,
            Event::Wait,
            Event::Release { idled: true },
            Event::Open,
            Event::Enter,
            Event::Wait,
            Event::Release { idled: true },
        ]
    );
    assert_eq!(report.connections, 2);
}

#[tokio::test(start_paused = true)]
async fn test_forced_reconnect_after_interval() {
    let settings = WatcherSettings::default()
        .with_reconnect_after(Duration::from_secs(50))
        .with_poll_timeout(Duration::from_secs(15));
    let quiet = || (0..10).map(|_| Poll::Quiet).collect::<Vec<_>>();
    let script = vec![Open::Watch(quiet()), Open::Watch(vec![Poll::Stop])];
    let (transport, report) = run(script, settings, Arc::default()).await;

    // Polls start at ages 0, 15, 30 and 45; at 60 the session is replaced.
    let opens = transport.times_of(&Event::Open);
    let age = opens[1] - opens[0];
    assert!(age >= Duration::from_secs(60));
    assert!(age < Duration::from_secs(61));
    assert_eq!(transport.count(&Event::Release { idled: true }), 2);
    assert_eq!(report.connections, 2);
    assert_eq!(report.total_errors, 0);
}

#[tokio::test(start_paused = true)]
async fn test_new_message_is_fetched_and_handled() {
    let handler = Arc::new(RecordingHandler::default());
    let script = vec![
        Open::Watch(vec![new_mail(42), Poll::Stop]),
        Open::Fetch(Some(envelope("Hello"))),
    ];
    let (transport, report) = run(script, WatcherSettings::default(), handler.clone()).await;

    let seen = handler.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].subject.as_deref(), Some("Hello"));
    assert_eq!(
        seen[0].author().and_then(crate::envelope::Address::mail).as_deref(),
        Some("alice@example.com")
    );

    assert_eq!(
        transport.events(),
        vec![
            Event::Open,
            Event::Enter,
            Event::Wait,
            Event::Open,
            Event::Fetch(42),
            Event::Release { idled: false },
            Event::Wait,
            Event::Release { idled: true },
        ]
    );
    assert_eq!(report.new_messages, 1);
    assert_eq!(report.connections, 1);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_session_released_when_fetch_fails() {
    let handler = Arc::new(RecordingHandler::default());
    let script = vec![
        Open::Watch(vec![new_mail(7), Poll::Stop]),
        Open::FetchFails,
    ];
    let (transport, report) = run(script, WatcherSettings::default(), handler.clone()).await;

    assert!(handler.seen.lock().unwrap().is_empty());
    assert_eq!(transport.count(&Event::Release { idled: false }), 1);
    assert_eq!(report.total_errors, 0);
    assert_eq!(report.new_messages, 0);
}

#[tokio::test(start_paused = true)]
async fn test_missing_envelope_is_skipped() {
    let handler = Arc::new(RecordingHandler::default());
    let script = vec![
        Open::Watch(vec![new_mail(7), Poll::Stop]),
        Open::Fetch(None),
    ];
    let (_, report) = run(script, WatcherSettings::default(), handler.clone()).await;

    assert!(handler.seen.lock().unwrap().is_empty());
    assert_eq!(report.new_messages, 0);
    assert_eq!(report.total_errors, 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_fetch_connection_does_not_count_as_error() {
    let script = vec![Open::Watch(vec![new_mail(7), Poll::Stop]), Open::Fail];
    let (transport, report) = run(script, WatcherSettings::default(), Arc::default()).await;

    assert_eq!(transport.count(&Event::OpenFailed), 1);
    assert_eq!(report.total_errors, 0);
    assert_eq!(report.phase, Phase::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_handler_failure_does_not_affect_watcher() {
    let handler = Arc::new(RecordingHandler {
        fail: true,
        ..RecordingHandler::default()
    });
    let script = vec![
        Open::Watch(vec![new_mail(1), new_mail(2), Poll::Stop]),
        Open::Fetch(Some(envelope("one"))),
        Open::Fetch(Some(envelope("two"))),
    ];
    let (_, report) = run(script, WatcherSettings::default(), handler.clone()).await;

    assert_eq!(handler.seen.lock().unwrap().len(), 2);
    assert_eq!(report.total_errors, 0);
    assert_eq!(report.new_messages, 2);
}

#[tokio::test(start_paused = true)]
async fn test_unrelated_updates_open_no_fetch_session() {
    let script = vec![Open::Watch(vec![
        Poll::Updates(vec![ServerStatus::exists(5)]),
        Poll::Updates(vec![ServerStatus::exists(0), ServerStatus::recent(0)]),
        Poll::Stop,
    ])];
    let (transport, report) = run(script, WatcherSettings::default(), Arc::default()).await;

    assert_eq!(transport.count(&Event::Open), 1);
    assert_eq!(report.new_messages, 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_backoff() {
    let cancel = CancellationToken::new();
    let transport = FakeTransport::new(vec![Open::Fail], cancel.clone());
    let watcher = AccountWatcher::new(
        account(),
        WatcherSettings::default().with_error_backoff(Duration::from_secs(3600)),
        transport.clone(),
        Arc::new(RecordingHandler::default()),
        cancel.clone(),
    );

    let started = Instant::now();
    let task = tokio::spawn(watcher.run());
    tokio::time::sleep(Duration::from_secs(5)).await;
    cancel.cancel();
    let report = task.await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(3600));
    assert_eq!(report.phase, Phase::Stopped);
    assert_eq!(transport.count(&Event::OpenFailed), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_start() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let transport = FakeTransport::new(vec![Open::Watch(vec![])], cancel.clone());
    let watcher = AccountWatcher::new(
        account(),
        WatcherSettings::default(),
        transport.clone(),
        Arc::new(RecordingHandler::default()),
        cancel,
    );

    let report = watcher.run().await;
    assert!(transport.events().is_empty());
    assert_eq!(report.phase, Phase::Stopped);
}
