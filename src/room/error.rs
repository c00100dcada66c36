use thiserror::Error;

use crate::state::{RoomId, SubscriberId};

pub type RoomResult<T> = Result<T, RoomError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    #[error("room {0} does not exist")]
    RoomNotFound(RoomId),

    #[error("subscriber {0} does not exist")]
    UnknownSubscriber(SubscriberId),

    #[error("queue is empty")]
    EmptyQueue,

    #[error("no current track")]
    NoCurrentItem,

    #[error("index {index} out of range (queue length {len})")]
    IndexOutOfRange { index: usize, len: usize },
}
