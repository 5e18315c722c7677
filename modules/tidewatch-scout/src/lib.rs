pub mod flatten;
pub mod heartbeat;
pub mod keywords;
pub mod scheduler;
pub mod search;
pub mod sink;
