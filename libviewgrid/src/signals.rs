//! Explicit observer hub for page-level notifications.
//!
//! Inbound: as-of date changes, which invalidate cached matrix pages of every open view.
//! Outbound: selection changes and row activations for the surrounding shell.
use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;
use viewgrid_types::{RowUid, ViewId};

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowAction {
    DoubleClick,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ViewEvent {
    SelectionChanged {
        view_id: ViewId,
        selected_uids: Vec<RowUid>,
    },
    RowActivated {
        view_id: ViewId,
        uid: RowUid,
        action: RowAction,
    },
}

/// The server-held as-of date moved. `None` means "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsOfDateChanged {
    pub as_of: Option<NaiveDate>,
}

/// Cloneable handle; all clones share the same channels.
#[derive(Debug, Clone)]
pub struct SignalHub {
    events: broadcast::Sender<ViewEvent>,
    as_of_date: broadcast::Sender<AsOfDateChanged>,
}

impl Default for SignalHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SignalHub {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        let (as_of_date, _) = broadcast::channel(capacity.max(1));
        Self { events, as_of_date }
    }

    /// Publishes a view event. Returns the number of subscribers that will see it.
    pub fn publish(&self, event: ViewEvent) -> usize {
        match self.events.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                debug!(?event, "no subscribers for view event");
                0
            }
        }
    }

    pub fn announce_as_of_date(&self, as_of: Option<NaiveDate>) -> usize {
        self.as_of_date
            .send(AsOfDateChanged { as_of })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn subscribe_as_of_date(&self) -> broadcast::Receiver<AsOfDateChanged> {
        self.as_of_date.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_action_serializes_as_discriminator() {
        let event = ViewEvent::RowActivated {
            view_id: "orders".into(),
            uid: "7".into(),
            action: RowAction::DoubleClick,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "row_activated");
        assert_eq!(json["action"], "double_click");
        assert_eq!(json["uid"], "7");
    }

    #[test]
    fn publish_without_subscribers_is_harmless() {
        let hub = SignalHub::default();
        assert_eq!(
            hub.publish(ViewEvent::SelectionChanged {
                view_id: "v".into(),
                selected_uids: vec![],
            }),
            0
        );
        assert_eq!(hub.announce_as_of_date(None), 0);
    }

    #[test]
    fn clones_share_channels() {
        let hub = SignalHub::default();
        let mut events = hub.subscribe_events();
        let mut as_of = hub.subscribe_as_of_date();
        let other = hub.clone();

        let event = ViewEvent::SelectionChanged {
            view_id: "v".into(),
            selected_uids: vec!["a".into(), "b".into()],
        };
        assert_eq!(other.publish(event.clone()), 1);
        assert_eq!(events.try_recv().unwrap(), event);

        let date = NaiveDate::from_ymd_opt(2024, 1, 15);
        other.announce_as_of_date(date);
        assert_eq!(as_of.try_recv().unwrap(), AsOfDateChanged { as_of: date });
    }
}
