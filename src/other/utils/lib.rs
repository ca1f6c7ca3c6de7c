mod canonicalize_unexistent;
use canonicalize_unexistent::canonicalize_unexistent;

mod init_logging;
pub use init_logging::*;

mod handle_api_failure;
pub use handle_api_failure::*;

pub mod request_id;
pub use request_id::{RequestId, RequestIds};

pub mod subscribers;
pub use subscribers::{Callback, SubscriptionId, Subscribers};
