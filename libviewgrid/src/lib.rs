pub mod backend;
pub mod cache;
pub mod config;
pub mod date;
pub mod draft;
pub mod format;
pub mod logs;
pub mod message;
pub mod page;
pub mod projector;
pub mod query_key;
pub mod render;
pub mod schema;
pub mod selection;
pub mod signals;

pub use backend::{BackendError, FixtureBackend, ViewBackend};
pub use config::GridConfig;
pub use draft::{AutosaveController, DraftState, SaveStatus};
pub use format::ValueFormatter;
pub use message::ViewMessage;
pub use page::{GridCell, GridRow, GridTotals, GridView, ViewPage, ViewStatus};
pub use selection::{ClickModifiers, Selection};
pub use signals::{RowAction, SignalHub, ViewEvent};
