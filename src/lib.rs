//! Bounded worker-pool dispatcher for the xiaoi.com ask API.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use xiaoi::{Dispatcher, Parameters};
//!
//! # async fn demo() -> Result<(), xiaoi::DispatchError> {
//! let dispatcher = Dispatcher::open(
//!     Parameters::new("app-key", "app-secret"),
//!     Arc::new(|msg: xiaoi::Message| println!("{} -> {}", msg.id, msg.answer)),
//! )?;
//! dispatcher.post("user-1", "hello")?;
//! dispatcher.close(Duration::from_secs(5)).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod consts;
pub mod dispatcher;
pub mod error;
pub mod form;
pub mod message;
pub mod queue;
pub mod shutdown;
pub mod signer;
pub mod transport;
pub mod worker;

pub use config::Parameters;
pub use dispatcher::{Dispatcher, Shutdown};
pub use error::{DeliveryError, DispatchError};
pub use form::BodyEncoding;
pub use message::{Callback, Message};
