pub mod app;
pub mod logging;
pub mod replay;
pub mod session;
