mod app;
mod client;
mod connection;
mod context;
mod dispatcher;
mod event;
mod function;

pub use app::App;
pub use client::Client;
pub use connection::{Connection, Invocation, Outcome};
pub use context::Context;
pub use dispatcher::{connect, Dispatcher};
pub use event::Event;
pub use function::{FunctionDescriptor, Handler, Trigger};
