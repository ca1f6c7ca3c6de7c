pub mod follow_toggle;
pub mod search_filter;
mod sync_layer;

pub mod clear_notifications;
pub mod open_follow_popup;
pub mod open_profile;
pub mod search_users;
pub mod toggle_follow;

pub use follow_toggle::{FollowToggleCoordinator, ToggleEvent, ToggleOutcome, TogglePhase};
pub use search_filter::{filter, SearchFilterView};
pub use sync_layer::{SyncLayer, SYNC};
