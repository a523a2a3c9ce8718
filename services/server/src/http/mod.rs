pub mod relay;
pub mod reserved;
pub mod response;
