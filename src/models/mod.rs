// Data models for poses, signatures and diagnostic reports

pub mod pose;
pub mod report;
pub mod signature;

pub use pose::*;
pub use report::*;
pub use signature::*;
