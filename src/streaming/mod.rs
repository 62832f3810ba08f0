//! Streaming engine: sample queue, wire records, and the per-session
//! sender/receiver workers

pub mod queue;
pub mod receiver;
pub mod sender;
pub mod wire;

pub use queue::SampleQueue;
pub use receiver::CommandReceiver;
pub use sender::DataSender;
pub use wire::{Command, DongleInfo};
