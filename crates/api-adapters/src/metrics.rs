//! Prometheus counters for the write paths.

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

use domains::SwipeDirection;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct VoteLabels {
    pub direction: String,
}

pub struct Metrics {
    registry: Registry,
    votes: Family<VoteLabels, Counter>,
    messages: Counter,
    uploads: Counter,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let votes = Family::<VoteLabels, Counter>::default();
        let messages = Counter::default();
        let uploads = Counter::default();

        registry.register("stylepitch_votes", "Votes recorded", votes.clone());
        registry.register("stylepitch_messages", "Chat messages sent", messages.clone());
        registry.register("stylepitch_uploads", "Designs uploaded", uploads.clone());

        Self {
            registry,
            votes,
            messages,
            uploads,
        }
    }

    pub fn vote(&self, direction: SwipeDirection) {
        self.votes
            .get_or_create(&VoteLabels {
                direction: direction.as_str().to_string(),
            })
            .inc();
    }

    pub fn message(&self) {
        self.messages.inc();
    }

    pub fn upload(&self) {
        self.uploads.inc();
    }

    /// OpenMetrics text exposition of every counter.
    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut body = String::new();
        encode(&mut body, &self.registry)?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_render_with_labels() {
        let metrics = Metrics::new();
        metrics.vote(SwipeDirection::Like);
        metrics.vote(SwipeDirection::Like);
        metrics.vote(SwipeDirection::Dislike);
        metrics.upload();

        let text = metrics.render().unwrap();
        assert!(text.contains(r#"stylepitch_votes_total{direction="like"} 2"#));
        assert!(text.contains(r#"stylepitch_votes_total{direction="dislike"} 1"#));
        assert!(text.contains("stylepitch_uploads_total 1"));
        assert!(text.contains("stylepitch_messages_total 0"));
    }
}
