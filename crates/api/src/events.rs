//! Row-change feed. Mutations publish an event after every committed write;
//! subscribers use events purely as re-fetch triggers, so the payload carries
//! ids only, never row data.

use async_graphql::{Enum, SimpleObject, ID};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Bounded fan-out: a subscriber that lags past this many undelivered events
/// starts missing events instead of back-pressuring writers.
pub const CHANGE_FEED_CAPACITY: usize = 256;

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum ChangeTable {
    #[graphql(name = "EMPLOYEE")]
    Employee,
    #[graphql(name = "ATTENDANCE_RECORD")]
    AttendanceRecord,
    #[graphql(name = "LEAVE_REQUEST")]
    LeaveRequest,
    #[graphql(name = "PAYROLL_RECORD")]
    PayrollRecord,
    #[graphql(name = "PERFORMANCE_REVIEW")]
    PerformanceReview,
    #[graphql(name = "USER_ROLE")]
    UserRole,
    #[graphql(name = "JOB_POSTING")]
    JobPosting,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum ChangeOp {
    #[graphql(name = "INSERT")]
    Insert,
    #[graphql(name = "UPDATE")]
    Update,
    #[graphql(name = "DELETE")]
    Delete,
}

#[derive(Clone, Debug, PartialEq, SimpleObject)]
pub struct ChangeEvent {
    pub table: ChangeTable,
    pub op: ChangeOp,
    pub row_id: ID,
    pub user_id: Option<ID>,
}

#[derive(Clone, Debug)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(CHANGE_FEED_CAPACITY)
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Send errors mean "no subscribers" and are ignored.
    pub fn publish(&self, table: ChangeTable, op: ChangeOp, row_id: Uuid, user_id: Option<Uuid>) {
        let event = ChangeEvent {
            table,
            op,
            row_id: ID(row_id.to_string()),
            user_id: user_id.map(|id| ID(id.to_string())),
        };
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}
