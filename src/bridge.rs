//! Poll-cycle orchestration.
//!
//! The alert cycle and the news cycle run as two tokio tasks. Each owns its
//! own state ([`PhaseMachine`], [`NewsDeduplicator`]); the only thing they
//! share is the [`Dispatcher`], which serializes sends. A failure inside a
//! cycle is logged and the cycle carries on after its usual delay.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::alert::{AlertNotice, NoticeKind, PhaseMachine, classify, is_idle_body};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, FetchError};
use crate::fetch::FeedFetcher;
use crate::message::{Labels, Timestamper, format_alert, format_news, format_test};
use crate::news::{NewsDeduplicator, parse_feed};
use crate::observability::metrics::{self, Feed};
use crate::transport::{ChannelId, ChannelResolver, Dispatcher};

/// Resolved endpoints, cadence and channels.
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    /// Alert feed URL.
    pub alerts_url: String,
    /// News feed URL.
    pub news_url: String,
    /// Per-request timeout.
    pub fetch_timeout: Duration,
    /// Delay between alert polls.
    pub alert_interval: Duration,
    /// Delay between news polls.
    pub news_interval: Duration,
    /// Pause after each news item.
    pub news_item_delay: Duration,
    /// Channel for alert and test notifications.
    pub alerts_channel: ChannelId,
    /// Channel for news; `None` disables the news cycle.
    pub news_channel: Option<ChannelId>,
}

impl BridgeSettings {
    /// Resolves channel names from `config` through `resolver`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::ChannelNotFound` if the alerts channel, or
    /// the news channel while news is enabled, is not in the table.
    pub fn resolve(
        config: &BridgeConfig,
        resolver: &dyn ChannelResolver,
    ) -> Result<Self, BridgeError> {
        let alerts_channel = resolver.resolve(&config.transport.alerts_channel)?;
        let news_channel = if config.polling.news_enabled {
            Some(resolver.resolve(&config.transport.news_channel)?)
        } else {
            None
        };
        tracing::debug!(
            alerts = %alerts_channel,
            news = ?news_channel.map(|c| c.0),
            "channels resolved"
        );

        Ok(Self {
            alerts_url: config.feeds.alerts_url.clone(),
            news_url: config.feeds.news_url.clone(),
            fetch_timeout: config.feeds.fetch_timeout,
            alert_interval: config.polling.alert_interval,
            news_interval: config.polling.news_interval,
            news_item_delay: config.polling.news_item_delay,
            alerts_channel,
            news_channel,
        })
    }
}

/// State shared read-only by both cycles.
struct Context {
    fetcher: Arc<dyn FeedFetcher>,
    dispatcher: Arc<Dispatcher>,
    timestamper: Timestamper,
    labels: Labels,
    settings: BridgeSettings,
}

/// The alerts-to-mesh bridge.
pub struct Bridge {
    ctx: Arc<Context>,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("settings", &self.ctx.settings)
            .finish_non_exhaustive()
    }
}

impl Bridge {
    /// Assembles a bridge from its collaborators.
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn FeedFetcher>,
        dispatcher: Arc<Dispatcher>,
        timestamper: Timestamper,
        labels: Labels,
        settings: BridgeSettings,
    ) -> Self {
        Self {
            ctx: Arc::new(Context {
                fetcher,
                dispatcher,
                timestamper,
                labels,
                settings,
            }),
        }
    }

    /// Returns the resolved settings.
    #[must_use]
    pub fn settings(&self) -> &BridgeSettings {
        &self.ctx.settings
    }

    /// Creates a fresh alert cycle starting in the idle phase.
    #[must_use]
    pub fn alert_cycle(&self) -> AlertCycle {
        AlertCycle {
            ctx: Arc::clone(&self.ctx),
            machine: PhaseMachine::new(self.ctx.labels.clone()),
        }
    }

    /// Creates a fresh news cycle with an empty seen-set.
    #[must_use]
    pub fn news_cycle(&self) -> Option<NewsCycle> {
        let channel = self.ctx.settings.news_channel?;
        Some(NewsCycle {
            ctx: Arc::clone(&self.ctx),
            channel,
            dedup: NewsDeduplicator::new(),
        })
    }

    /// Sends one manual test notification on the alerts channel.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the sink fails.
    pub async fn send_test(&self, areas: &str) -> Result<usize, BridgeError> {
        let message = format_test(&self.ctx.labels, areas, &self.ctx.timestamper.now());
        let fragments = self
            .ctx
            .dispatcher
            .send(self.ctx.settings.alerts_channel, &message)
            .await?;
        metrics::record_notification("test");
        Ok(fragments)
    }

    /// Runs both cycles until `cancel` fires.
    ///
    /// In-flight fetches and sends are abandoned on cancellation.
    pub async fn run(&self, cancel: CancellationToken) {
        let settings = &self.ctx.settings;
        tracing::info!(
            alerts_url = %settings.alerts_url,
            interval = %humantime::format_duration(settings.alert_interval),
            "alert cycle starting"
        );

        let alert_task = tokio::spawn(run_cycle(
            self.alert_cycle(),
            settings.alert_interval,
            cancel.clone(),
        ));

        let news_task = self.news_cycle().map(|news| {
            tracing::info!(
                news_url = %settings.news_url,
                interval = %humantime::format_duration(settings.news_interval),
                "news cycle starting"
            );
            tokio::spawn(run_cycle(news, settings.news_interval, cancel.clone()))
        });
        if news_task.is_none() {
            tracing::info!("news cycle disabled");
        }

        if let Err(e) = alert_task.await {
            tracing::error!(error = %e, "alert cycle task failed");
        }
        if let Some(task) = news_task
            && let Err(e) = task.await
        {
            tracing::error!(error = %e, "news cycle task failed");
        }
        tracing::info!("bridge stopped");
    }
}

/// A repeating poll.
#[async_trait::async_trait]
trait PollCycle: Send {
    /// Name used in log fields.
    const NAME: &'static str;

    /// Runs one poll.
    async fn poll(&mut self) -> Result<(), BridgeError>;
}

/// Polls, then sleeps, until cancelled. Errors are logged and swallowed.
async fn run_cycle<C: PollCycle + 'static>(mut cycle: C, interval: Duration, cancel: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = cycle.poll() => {
                if let Err(e) = result {
                    tracing::warn!(cycle = C::NAME, error = %e, "poll failed");
                }
            }
        }
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }
    }
    tracing::debug!(cycle = C::NAME, "cycle stopped");
}

// ============================================================================
// Alert cycle
// ============================================================================

/// One alert poll loop: fetch, classify, decide, dispatch, commit.
pub struct AlertCycle {
    ctx: Arc<Context>,
    machine: PhaseMachine,
}

impl AlertCycle {
    /// Returns the phase machine.
    #[must_use]
    pub const fn machine(&self) -> &PhaseMachine {
        &self.machine
    }

    /// Runs one poll and returns the notice sent, if any.
    ///
    /// The machine's state only changes once the notice has been
    /// dispatched, so a failed send is retried on the next poll.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Fetch` if the feed cannot be retrieved and
    /// `BridgeError::Transport` if the notice cannot be sent.
    pub async fn poll_once(&mut self) -> Result<Option<AlertNotice>, BridgeError> {
        let ctx = &self.ctx;
        let body = fetch(ctx, Feed::Alerts, &ctx.settings.alerts_url).await?;

        if is_idle_body(&body) {
            metrics::record_idle_poll();
            tracing::trace!("alert feed idle");
            return Ok(None);
        }

        let records = classify(&body);
        if records.is_empty() {
            metrics::record_idle_poll();
            return Ok(None);
        }
        tracing::trace!(records = records.len(), first = records[0].category, "alerts classified");

        let Some(notice) = self.machine.evaluate(&records) else {
            return Ok(None);
        };

        let message = format_alert(
            &ctx.labels,
            notice.phase.glyph(),
            &notice.title,
            &notice.locations,
            &ctx.timestamper.now(),
        );
        ctx.dispatcher
            .send(ctx.settings.alerts_channel, &message)
            .await?;

        if let NoticeKind::Transition { from } = notice.kind {
            metrics::record_phase_transition(from, notice.phase);
        }
        metrics::record_notification(notice.kind.as_str());
        self.machine.apply(&notice);
        Ok(Some(notice))
    }
}

#[async_trait::async_trait]
impl PollCycle for AlertCycle {
    const NAME: &'static str = "alerts";

    async fn poll(&mut self) -> Result<(), BridgeError> {
        self.poll_once().await.map(|_| ())
    }
}

// ============================================================================
// News cycle
// ============================================================================

/// One news poll loop: fetch, parse, skip seen links, dispatch the rest.
pub struct NewsCycle {
    ctx: Arc<Context>,
    channel: ChannelId,
    dedup: NewsDeduplicator,
}

impl NewsCycle {
    /// Returns the seen-link set.
    #[must_use]
    pub const fn dedup(&self) -> &NewsDeduplicator {
        &self.dedup
    }

    /// Runs one poll and returns the number of items sent.
    ///
    /// Items go out oldest first with a pause after each. A link is marked
    /// seen only after all of its messages were sent.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Fetch` if the feed cannot be retrieved and
    /// `BridgeError::Transport` if an item cannot be sent. Items sent before
    /// the failure stay marked as seen.
    pub async fn poll_once(&mut self) -> Result<usize, BridgeError> {
        let ctx = &self.ctx;
        let body = fetch(ctx, Feed::News, &ctx.settings.news_url).await?;

        let entries = parse_feed(&body);
        let pending = self.dedup.pending(&entries);
        tracing::debug!(entries = entries.len(), unseen = pending.len(), "news feed parsed");

        let limit = ctx.dispatcher.chunk_limit();
        let mut sent = 0;
        for entry in pending {
            for message in format_news(&entry.title, &entry.link, limit) {
                ctx.dispatcher.send(self.channel, &message).await?;
            }
            self.dedup.mark_seen(&entry.link);
            metrics::record_notification("news");
            sent += 1;
            if !ctx.settings.news_item_delay.is_zero() {
                tokio::time::sleep(ctx.settings.news_item_delay).await;
            }
        }
        Ok(sent)
    }
}

#[async_trait::async_trait]
impl PollCycle for NewsCycle {
    const NAME: &'static str = "news";

    async fn poll(&mut self) -> Result<(), BridgeError> {
        let sent = self.poll_once().await?;
        if sent > 0 {
            tracing::debug!(sent, seen = self.dedup.len(), "news poll complete");
        }
        Ok(())
    }
}

async fn fetch(ctx: &Context, feed: Feed, url: &str) -> Result<String, FetchError> {
    metrics::record_poll(feed);
    ctx.fetcher
        .fetch(url, ctx.settings.fetch_timeout)
        .await
        .inspect_err(|e| {
            metrics::record_fetch_error(feed);
            tracing::debug!(feed = feed.as_str(), error = %e, "fetch failed");
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::Phase;
    use crate::chunk::Chunker;
    use crate::transport::{ChannelTable, RecordingSink};
    use chrono::FixedOffset;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    const ALERTS: &str = "http://feeds.test/alerts";
    const NEWS: &str = "http://feeds.test/news";

    /// Serves queued bodies per URL; the last body repeats once the queue
    /// is down to one.
    #[derive(Default)]
    struct ScriptedFetcher {
        bodies: Mutex<HashMap<String, VecDeque<Result<String, u16>>>>,
    }

    impl ScriptedFetcher {
        fn push(&self, url: &str, body: &str) {
            self.bodies
                .lock()
                .unwrap()
                .entry(url.to_string())
                .or_default()
                .push_back(Ok(body.to_string()));
        }

        fn push_status(&self, url: &str, status: u16) {
            self.bodies
                .lock()
                .unwrap()
                .entry(url.to_string())
                .or_default()
                .push_back(Err(status));
        }
    }

    #[async_trait::async_trait]
    impl FeedFetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str, _timeout: Duration) -> Result<String, FetchError> {
            let mut bodies = self.bodies.lock().unwrap();
            let queue = bodies
                .get_mut(url)
                .ok_or_else(|| FetchError::Network(format!("no route to {url}")))?;
            let next = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            };
            match next {
                Some(Ok(body)) => Ok(body),
                Some(Err(status)) => Err(FetchError::HttpStatus(status)),
                None => Err(FetchError::Network("empty script".to_string())),
            }
        }
    }

    fn settings(news: bool) -> BridgeSettings {
        let mut config = BridgeConfig::default();
        config.feeds.alerts_url = ALERTS.to_string();
        config.feeds.news_url = NEWS.to_string();
        config.polling.news_item_delay = Duration::ZERO;
        config.polling.news_enabled = news;
        let table = ChannelTable::new(config.transport.channels.clone());
        BridgeSettings::resolve(&config, &table).unwrap()
    }

    fn bridge(fetcher: Arc<ScriptedFetcher>, sink: Arc<RecordingSink>) -> Bridge {
        let dispatcher = Dispatcher::new(sink, Chunker::new(180), Duration::ZERO);
        Bridge::new(
            fetcher,
            Arc::new(dispatcher),
            Timestamper::new(FixedOffset::east_opt(3 * 3600).unwrap()),
            Labels::default(),
            settings(true),
        )
    }

    const ALERTS_CH: ChannelId = ChannelId(1);
    const NEWS_CH: ChannelId = ChannelId(2);

    #[test]
    fn test_resolve_missing_channel_is_fatal() {
        let mut config = BridgeConfig::default();
        config.transport.alerts_channel = "Emergency".to_string();
        let table = ChannelTable::new(config.transport.channels.clone());
        let err = BridgeSettings::resolve(&config, &table).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::ExitCode::TRANSPORT_ERROR);
    }

    #[test]
    fn test_resolve_skips_news_channel_when_disabled() {
        let mut config = BridgeConfig::default();
        config.polling.news_enabled = false;
        config.transport.news_channel = "Missing".to_string();
        let table = ChannelTable::new(config.transport.channels.clone());
        let settings = BridgeSettings::resolve(&config, &table).unwrap();
        assert!(settings.news_channel.is_none());
    }

    #[tokio::test]
    async fn test_alert_transition_is_sent() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let sink = Arc::new(RecordingSink::new());
        fetcher.push(ALERTS, r#"{"cat":"1","title":"ירי רקטות","data":["תל אביב"]}"#);
        let mut cycle = bridge(Arc::clone(&fetcher), Arc::clone(&sink)).alert_cycle();

        let notice = cycle.poll_once().await.unwrap().unwrap();
        assert_eq!(notice.phase, Phase::Rocket);
        assert_eq!(cycle.machine().state().current_phase(), Phase::Rocket);

        let sent = sink.fragments(ALERTS_CH);
        assert!(!sent.is_empty());
        assert!(sent[0].starts_with("\u{1f6a8} "));
        assert!(sent.join(" ").contains("תל אביב"));

        // Same category again: no new notification.
        assert!(cycle.poll_once().await.unwrap().is_none());
        assert_eq!(sink.fragments(ALERTS_CH).len(), sent.len());
    }

    #[tokio::test]
    async fn test_idle_body_sends_nothing() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let sink = Arc::new(RecordingSink::new());
        fetcher.push(ALERTS, "\r\n");
        let mut cycle = bridge(fetcher, Arc::clone(&sink)).alert_cycle();

        assert!(cycle.poll_once().await.unwrap().is_none());
        assert!(sink.sent().is_empty());
        assert_eq!(cycle.machine().state().current_phase(), Phase::None);
    }

    #[tokio::test]
    async fn test_failed_send_is_retried_next_poll() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let sink = Arc::new(RecordingSink::new());
        fetcher.push(ALERTS, r#"{"cat":"13","title":"הסתיים"}"#);
        let mut cycle = bridge(fetcher, Arc::clone(&sink)).alert_cycle();

        sink.set_failing(true);
        let err = cycle.poll_once().await.unwrap_err();
        assert!(matches!(err, BridgeError::Transport(_)));
        assert_eq!(cycle.machine().state().current_phase(), Phase::None);

        sink.set_failing(false);
        let notice = cycle.poll_once().await.unwrap().unwrap();
        assert_eq!(notice.phase, Phase::Clear);
        assert!(sink.fragments(ALERTS_CH)[0].starts_with("\u{2705}"));
    }

    #[tokio::test]
    async fn test_fetch_error_leaves_state() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let sink = Arc::new(RecordingSink::new());
        fetcher.push_status(ALERTS, 502);
        let mut cycle = bridge(fetcher, Arc::clone(&sink)).alert_cycle();

        let err = cycle.poll_once().await.unwrap_err();
        assert!(matches!(err, BridgeError::Fetch(FetchError::HttpStatus(502))));
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn test_news_sends_unseen_oldest_first() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let sink = Arc::new(RecordingSink::new());
        fetcher.push(
            NEWS,
            "<rss><channel>\
             <item><title>newest</title><link>https://n.test/3</link></item>\
             <item><title>middle</title><link>https://n.test/2</link></item>\
             <item><title>oldest</title><link>https://n.test/1</link></item>\
             </channel></rss>",
        );
        let mut cycle = bridge(fetcher, Arc::clone(&sink)).news_cycle().unwrap();

        assert_eq!(cycle.poll_once().await.unwrap(), 3);
        let sent = sink.fragments(NEWS_CH);
        assert_eq!(sent[0], "\u{1f4f0} oldest | https://n.test/1");
        assert_eq!(sent[2], "\u{1f4f0} newest | https://n.test/3");
        assert_eq!(cycle.dedup().len(), 3);

        // Same feed again: everything already seen.
        assert_eq!(cycle.poll_once().await.unwrap(), 0);
        assert_eq!(sink.fragments(NEWS_CH).len(), 3);
    }

    #[tokio::test]
    async fn test_news_one_new_among_seen() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let sink = Arc::new(RecordingSink::new());
        let old = "<item><title>a</title><link>https://n.test/a</link></item>";
        fetcher.push(NEWS, &format!("<rss>{old}</rss>"));
        fetcher.push(
            NEWS,
            &format!("<rss><item><title>b</title><link>https://n.test/b</link></item>{old}</rss>"),
        );
        let mut cycle = bridge(fetcher, Arc::clone(&sink)).news_cycle().unwrap();

        assert_eq!(cycle.poll_once().await.unwrap(), 1);
        assert_eq!(cycle.poll_once().await.unwrap(), 1);
        assert_eq!(sink.fragments(NEWS_CH).last().unwrap(), "\u{1f4f0} b | https://n.test/b");
    }

    #[tokio::test]
    async fn test_send_test_message() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let sink = Arc::new(RecordingSink::new());
        let bridge = bridge(fetcher, Arc::clone(&sink));

        bridge.send_test("חיפה").await.unwrap();
        let text = sink.fragments(ALERTS_CH).join(" ");
        assert!(text.starts_with("איזור: חיפה | סוג ההתרעה: בדיקה ידנית"));
    }

    #[test]
    fn test_news_cycle_absent_when_disabled() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let dispatcher = Dispatcher::new(Arc::new(RecordingSink::new()), Chunker::default(), Duration::ZERO);
        let bridge = Bridge::new(
            fetcher,
            Arc::new(dispatcher),
            Timestamper::new(FixedOffset::east_opt(0).unwrap()),
            Labels::default(),
            settings(false),
        );
        assert!(bridge.news_cycle().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_survives_errors_and_stops_on_cancel() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let sink = Arc::new(RecordingSink::new());
        fetcher.push_status(ALERTS, 500);
        fetcher.push(ALERTS, r#"{"cat":1,"data":["אשדוד"]}"#);
        fetcher.push_status(NEWS, 503);
        let bridge = Arc::new(bridge(fetcher, Arc::clone(&sink)));

        let cancel = CancellationToken::new();
        let handle = {
            let bridge = Arc::clone(&bridge);
            let cancel = cancel.clone();
            tokio::spawn(async move { bridge.run(cancel).await })
        };

        tokio::time::sleep(Duration::from_secs(5)).await;
        cancel.cancel();
        handle.await.unwrap();

        // The first alert poll failed; a later one got through exactly once.
        let sent = sink.fragments(ALERTS_CH);
        assert!(!sent.is_empty());
        assert!(sent[0].starts_with("\u{1f6a8}"));
        assert!(sink.fragments(NEWS_CH).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_abandons_message_mid_send() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let sink = Arc::new(RecordingSink::new());
        fetcher.push(ALERTS, r#"{"cat":"1","title":"ירי רקטות וטילים","data":["שדרות"]}"#);
        let dispatcher = Dispatcher::new(
            Arc::clone(&sink) as Arc<dyn crate::transport::TransportSink>,
            Chunker::new(1),
            Duration::from_secs(10),
        );
        let bridge = Arc::new(Bridge::new(
            fetcher,
            Arc::new(dispatcher),
            Timestamper::new(FixedOffset::east_opt(3 * 3600).unwrap()),
            Labels::default(),
            settings(false),
        ));

        let cancel = CancellationToken::new();
        let handle = {
            let bridge = Arc::clone(&bridge);
            let cancel = cancel.clone();
            tokio::spawn(async move { bridge.run(cancel).await })
        };

        tokio::time::sleep(Duration::from_secs(15)).await;
        cancel.cancel();
        let stopped_at = tokio::time::Instant::now();
        handle.await.unwrap();
        assert!(
            stopped_at.elapsed() < Duration::from_secs(1),
            "run waited for the in-flight message"
        );

        // One word per fragment, ten seconds apart: only the first two made it.
        let sent = sink.fragments(ALERTS_CH);
        assert!(!sent.is_empty());
        assert!(sent.len() < 5, "message was finished after cancel: {sent:?}");
        assert_eq!(sent[0], "\u{1f6a8}");
    }
}
