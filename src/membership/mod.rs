use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::MembershipError;
use crate::types::{Change, EndpointSnapshot};

pub mod kubernetes;
pub use kubernetes::KubeMembership;

/// Notifications from one watch subscription, in arrival order. The stream
/// ending means the subscription is over.
pub type Notifications = BoxStream<'static, Result<Change, MembershipError>>;

/// Read-only view of endpoint membership in a single namespace.
#[async_trait]
pub trait MembershipSource: Send + Sync {
    /// Fetch every endpoint resource currently in the namespace.
    async fn list(&self) -> Result<EndpointSnapshot, MembershipError>;

    /// Open a long-lived subscription to membership changes.
    async fn watch(&self) -> Result<Notifications, MembershipError>;
}
