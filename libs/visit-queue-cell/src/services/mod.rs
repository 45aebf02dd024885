pub mod queue;
pub mod sequencer;

pub use queue::VisitQueueService;
pub use sequencer::{active_order, QueueSequencer};
