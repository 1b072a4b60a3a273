pub mod queue;
pub mod response;
