//! 命令定义和实现

pub mod config;
pub mod decode;
pub mod diagnostics;
pub mod stream;
pub mod zero;

pub use config::ConfigCommand;
pub use decode::DecodeCommand;
pub use diagnostics::DiagnosticsCommand;
pub use stream::StreamCommand;
pub use zero::ZeroCommand;
