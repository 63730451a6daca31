//! Adapters: concrete implementations of the domain ports.

pub mod anthropic;
pub mod html_report;
pub mod mock;
pub mod shell;

pub use anthropic::AnthropicClient;
pub use html_report::HtmlReportSink;
pub use mock::{MockExecutor, MockModelClient, MockModelResponse, MockReportSink, MockRun};
pub use shell::ShellExecutor;
