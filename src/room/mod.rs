//! Watch rooms: per-room playback state machine plus the registry that owns them
//!
//! ```text
//!                   RoomRegistry (registry lock)
//!              ┌──────────────────────────────────┐
//!              │ rooms: HashMap<RoomId,           │
//!              │   Arc<RwLock<Room>> (room lock)  │
//!              │ >                                │
//!              └───────────────┬──────────────────┘
//!                              │ play / seek / enqueue ...
//!                              ▼
//!                     Room::commit() ── broadcast
//!                 ┌────────────┼────────────┐
//!                 ▼            ▼            ▼
//!            mpsc(10)      mpsc(10)     mpsc(10)   try_send, evict on full
//!                 │            │            │
//!              ws task      ws task      ws task
//! ```
//!
//! Snapshots travel as `Arc<RoomSnapshot>`, so fan-out clones a pointer per
//! subscriber rather than the queue.

pub mod config;
pub mod entry;
pub mod error;
pub mod registry;

pub use config::{IdleBasis, RegistryConfig};
pub use entry::Subscription;
pub use error::RoomError;
pub use registry::RoomRegistry;
