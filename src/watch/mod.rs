pub mod channel;
pub mod hub;
pub mod service;

pub use channel::{ChangeChannel, ChangeFrame, ChangeStream, SubscriptionStatus};
pub use hub::{WatchHub, WatchLease};
pub use service::{
    ChangeEvents, ChangeNotification, WatchHandle, WatchService, WatchStartError, WatchState,
};
