pub mod entry;
pub mod events;
pub mod ids;
pub mod message;
pub mod outcome;
pub mod priority;

pub use entry::{DeliveryConfirmation, ErrorRecord, MessageStatus, QueueEntry};
pub use events::QueueEvent;
pub use ids::{AgentId, QueueId};
pub use message::{Attachment, MessageContent, MessageDraft, MessageType};
pub use outcome::{Delivery, ErrorKind, HandlerError};
pub use priority::MessagePriority;
