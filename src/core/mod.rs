pub mod address;
pub mod logging;
pub mod mirror;
pub mod remote;
pub mod resolver;
pub mod session;
pub mod storage;
pub mod trip;
