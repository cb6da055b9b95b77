//! Duepi EVO pellet-stove protocol client
//!
//! The stove (or its cloud relay) speaks a small ASCII protocol over TCP: a
//! `master:{device}#` handshake, then fixed five-character commands framed as
//! `ESC 'R' code checksum '&'`, each answered by exactly ten ASCII bytes.
//!
//! ```no_run
//! use duepi_evo::{ConnectionParams, DuepiClient, StoveClient};
//!
//! # async fn run() -> duepi_evo::Result<()> {
//! let client = DuepiClient::new(ConnectionParams::for_device("ABC123"));
//! let snapshot = client.get_stove_data().await?;
//! println!("{} at {:.1} °C", snapshot.status_text, snapshot.room_temp_c);
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod command;
pub mod connection;
pub mod constants;
pub mod error;
pub mod simulator;
pub mod snapshot;
pub mod status;

pub use client::{DuepiClient, Response, StoveClient};
pub use command::CommandCode;
pub use connection::ConnectionParams;
pub use constants::{alarm_text, power_label};
pub use error::{DuepiError, Result};
pub use snapshot::{RawRegisters, StoveSnapshot};
pub use status::{StatusWord, StoveState};
