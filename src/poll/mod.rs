//! 轮询层：频道水位与单 worker 轮询循环

mod poller;
mod watermark;

pub use poller::{PollLoop, PollSettings, RoundReport};
pub use watermark::WatermarkTracker;
