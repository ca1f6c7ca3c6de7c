pub mod notifications;
pub mod paginated_list;
pub mod relationship_summary;

pub use notifications::{NotificationAggregator, NotificationsView};
pub use paginated_list::{
  arena::{ListArena, SurfaceId},
  state::{ListSnapshot, LoadMode},
  LoadOutcome, PaginatedListLoader,
};
pub use relationship_summary::{RelationshipSummaryCache, SummaryView};
