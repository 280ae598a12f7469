use std::{collections::VecDeque, sync::Arc};

use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub(crate) const LOG_RING_CAPACITY: usize = 500;

const DEFAULT_FILTER: &str = "verdict_server=info,verdict_core=info,verdict_agent=info,tower_http=debug";

pub(crate) type LogRing = Arc<std::sync::Mutex<VecDeque<String>>>;

/// Mirrors every event as a JSON line to live subscribers and a bounded
/// history ring, for the `/api/logs` stream.
pub(crate) struct BroadcastLayer {
    pub tx: broadcast::Sender<String>,
    pub ring: LogRing,
}

struct MessageVisitor<'a> {
    message: &'a mut String,
}

impl tracing::field::Visit for MessageVisitor<'_> {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            *self.message = value.to_string();
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message.clear();
            use std::fmt::Write;
            let _ = write!(self.message, "{value:?}");
            // Strip surrounding quotes added by Debug on &str
            if self.message.len() > 1 && self.message.starts_with('"') && self.message.ends_with('"')
            {
                *self.message = self.message[1..self.message.len() - 1].to_string();
            }
        }
    }
}

fn category(target: &str) -> &'static str {
    if target.starts_with("verdict_core::rooms") || target.starts_with("verdict_server::ws") {
        "rooms"
    } else if target.starts_with("verdict_core") {
        "classification"
    } else if target.starts_with("verdict_agent") {
        "llm"
    } else if target.starts_with("tower_http") {
        "http"
    } else {
        "system"
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for BroadcastLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let level = match *event.metadata().level() {
            tracing::Level::ERROR => "err",
            tracing::Level::WARN => "warn",
            tracing::Level::INFO => "info",
            tracing::Level::DEBUG => "debug",
            tracing::Level::TRACE => return,
        };

        let mut message = String::new();
        event.record(&mut MessageVisitor {
            message: &mut message,
        });

        let json = serde_json::json!({
            "ts": chrono::Utc::now().timestamp(),
            "level": level,
            "message": message,
            "category": category(event.metadata().target()),
        })
        .to_string();

        let _ = self.tx.send(json.clone());
        if let Ok(mut ring) = self.ring.lock() {
            ring.push_back(json);
            if ring.len() > LOG_RING_CAPACITY {
                ring.pop_front();
            }
        }
    }
}

/// Install the global subscriber: human-readable output filtered by
/// `RUST_LOG` plus the broadcast layer. Returns the layer's channel and ring.
pub(crate) fn init() -> (broadcast::Sender<String>, LogRing) {
    let (tx, _) = broadcast::channel(1024);
    let ring: LogRing = Arc::new(std::sync::Mutex::new(VecDeque::new()));

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer())
        .with(BroadcastLayer {
            tx: tx.clone(),
            ring: Arc::clone(&ring),
        })
        .init();

    (tx, ring)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(f: impl FnOnce()) -> (Vec<String>, broadcast::Receiver<String>) {
        let (tx, rx) = broadcast::channel(16);
        let ring: LogRing = Arc::new(std::sync::Mutex::new(VecDeque::new()));
        let subscriber = tracing_subscriber::registry().with(BroadcastLayer {
            tx,
            ring: Arc::clone(&ring),
        });
        tracing::subscriber::with_default(subscriber, f);
        let lines = ring.lock().unwrap().iter().cloned().collect();
        (lines, rx)
    }

    #[test]
    fn events_become_json_lines() {
        let (lines, mut rx) = capture(|| {
            tracing::warn!(records = 3, "vocabulary width differs from model");
            tracing::trace!("dropped");
        });
        assert_eq!(lines.len(), 1);
        let v: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(v["level"], "warn");
        assert_eq!(v["message"], "vocabulary width differs from model");
        assert_eq!(v["category"], "system");
        assert!(v["ts"].as_i64().unwrap() > 0);
        assert_eq!(rx.try_recv().unwrap(), lines[0]);
    }

    #[test]
    fn ring_is_bounded() {
        let (lines, _rx) = capture(|| {
            for i in 0..LOG_RING_CAPACITY + 10 {
                tracing::info!("line {i}");
            }
        });
        assert_eq!(lines.len(), LOG_RING_CAPACITY);
        assert!(lines[0].contains("line 10"));
    }

    #[test]
    fn targets_map_to_categories() {
        assert_eq!(category("verdict_core::pipeline"), "classification");
        assert_eq!(category("verdict_core::rooms"), "rooms");
        assert_eq!(category("verdict_agent::perplexity"), "llm");
        assert_eq!(category("tower_http::trace::on_response"), "http");
    }
}
