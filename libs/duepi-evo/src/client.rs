//! Protocol client
//!
//! All traffic to one stove goes through a single socket guarded by one
//! lock, so polls and user commands form a single ordered stream. Each
//! exchange runs on its own task: a caller that gives up waiting never cuts
//! a request off halfway, and the lock is released only once the I/O has
//! completed or timed out.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::codec::{encode_frame, parse_status, parse_value};
use crate::command::CommandCode;
use crate::connection::{ConnectionParams, DuepiConnection};
use crate::constants::RESPONSE_LEN;
use crate::error::{DuepiError, Result};
use crate::snapshot::{RawRegisters, StoveSnapshot};

/// Raw response bytes
pub type Response = [u8; RESPONSE_LEN];

/// Operations the poll loop and command surfaces need from a stove
#[async_trait]
pub trait StoveClient: Send + Sync {
    /// Open the link ahead of the first request
    async fn connect(&self) -> Result<()>;

    /// Full poll: eight sequential reads, all or nothing
    async fn get_stove_data(&self) -> Result<StoveSnapshot>;

    async fn power_on(&self) -> Result<()>;

    async fn power_off(&self) -> Result<()>;

    /// Level is clamped to 0..=6 (6 = auto)
    async fn set_power_level(&self, level: i32) -> Result<()>;

    /// Rounded and clamped to 10..=35 °C
    async fn set_target_temperature(&self, temp: f64) -> Result<()>;

    async fn reset_error(&self) -> Result<()>;

    /// Connect, read the status, always disconnect
    async fn test_connection(&self) -> bool;

    async fn disconnect(&self);
}

struct ClientInner {
    params: ConnectionParams,
    link: Mutex<Option<DuepiConnection>>,
    connected: AtomicBool,
}

impl ClientInner {
    async fn open_link(&self, link: &mut Option<DuepiConnection>) -> Result<()> {
        self.close_link(link).await;
        let conn = DuepiConnection::open(&self.params).await?;
        *link = Some(conn);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close_link(&self, link: &mut Option<DuepiConnection>) {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(conn) = link.take() {
            conn.close().await;
            debug!("Stove link closed: {}", self.params.address());
        }
    }

    async fn exchange(link: &mut Option<DuepiConnection>, frame: &[u8]) -> io::Result<Response> {
        match link.as_mut() {
            Some(conn) => conn.exchange(frame).await,
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "not connected")),
        }
    }

    /// Lock, auto-connect, exchange with one reconnect-retry, then hold the
    /// lock for the inter-command delay
    async fn send_serialized(&self, code: CommandCode) -> Result<Response> {
        let mut link = self.link.lock().await;

        if link.is_none() {
            self.open_link(&mut link).await?;
        }

        let frame = encode_frame(&code);
        let response = match Self::exchange(&mut link, &frame).await {
            Ok(response) => response,
            Err(cause) => {
                warn!("Command {} failed: {}, reconnecting", code, cause);
                self.close_link(&mut link).await;

                if let Err(e) = self.open_link(&mut link).await {
                    error!("Reconnect for {} failed: {}", code, e);
                    return Err(DuepiError::command(code.as_str(), e));
                }

                match Self::exchange(&mut link, &frame).await {
                    Ok(response) => response,
                    Err(e) => {
                        error!("Command {} failed after reconnect: {}", code, e);
                        self.close_link(&mut link).await;
                        return Err(DuepiError::command(code.as_str(), e));
                    },
                }
            },
        };

        sleep(self.params.command_delay).await;
        Ok(response)
    }
}

/// Duepi EVO client; clones share the same socket and lock
#[derive(Clone)]
pub struct DuepiClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for DuepiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuepiClient")
            .field("address", &self.inner.params.address())
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl DuepiClient {
    pub fn new(params: ConnectionParams) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                params,
                link: Mutex::new(None),
                connected: AtomicBool::new(false),
            }),
        }
    }

    pub fn params(&self) -> &ConnectionParams {
        &self.inner.params
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Send one command and return its raw response
    pub async fn send_command(&self, code: CommandCode) -> Result<Response> {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move { inner.send_serialized(code).await });

        match task.await {
            Ok(result) => result,
            Err(e) => Err(DuepiError::command(
                code.as_str(),
                format!("exchange task aborted: {e}"),
            )),
        }
    }

    /// Read a 4-hex register value
    pub async fn read_register(&self, code: CommandCode) -> Result<i32> {
        let response = self.send_command(code).await?;
        Ok(parse_value(&response))
    }

    /// Read the 32-bit status word
    pub async fn read_status(&self) -> Result<u32> {
        let response = self.send_command(CommandCode::GET_STATUS).await?;
        Ok(parse_status(&response))
    }
}

#[async_trait]
impl StoveClient for DuepiClient {
    async fn connect(&self) -> Result<()> {
        let mut link = self.inner.link.lock().await;
        self.inner.open_link(&mut link).await
    }

    async fn get_stove_data(&self) -> Result<StoveSnapshot> {
        let raw = RawRegisters {
            status: self.read_status().await?,
            room_temp: self.read_register(CommandCode::GET_ROOM_TEMP).await?,
            fumes_temp: self.read_register(CommandCode::GET_FUMES_TEMP).await?,
            power_level: self.read_register(CommandCode::GET_POWER_LEVEL).await?,
            pellet_speed: self.read_register(CommandCode::GET_PELLET_SPEED).await?,
            exhaust_fan: self.read_register(CommandCode::GET_EXHAUST_FAN).await?,
            error_code: self.read_register(CommandCode::GET_ERROR).await?,
            setpoint: self.read_register(CommandCode::GET_SETPOINT).await?,
        };

        let snapshot = StoveSnapshot::from_registers(raw);
        debug!(
            "Poll: {} room={:.1} target={} power={} alarm={}",
            snapshot.status_text,
            snapshot.room_temp_c,
            snapshot.target_temp_c,
            snapshot.power_level,
            snapshot.alarm_code
        );
        Ok(snapshot)
    }

    async fn power_on(&self) -> Result<()> {
        info!("Power on");
        self.send_command(CommandCode::POWER_ON).await.map(|_| ())
    }

    async fn power_off(&self) -> Result<()> {
        info!("Power off");
        self.send_command(CommandCode::POWER_OFF).await.map(|_| ())
    }

    async fn set_power_level(&self, level: i32) -> Result<()> {
        let code = CommandCode::set_power_level(level);
        info!("Set power level {} ({})", level, code);
        self.send_command(code).await.map(|_| ())
    }

    async fn set_target_temperature(&self, temp: f64) -> Result<()> {
        let code = CommandCode::set_target_temperature(temp);
        info!("Set target temperature {} ({})", temp, code);
        self.send_command(code).await.map(|_| ())
    }

    async fn reset_error(&self) -> Result<()> {
        info!("Reset error");
        self.send_command(CommandCode::RESET_ERROR).await.map(|_| ())
    }

    async fn test_connection(&self) -> bool {
        let result = match StoveClient::connect(self).await {
            Ok(()) => self.read_status().await.map(|_| ()),
            Err(e) => Err(e),
        };
        StoveClient::disconnect(self).await;

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Connection test failed: {}", e);
                false
            },
        }
    }

    async fn disconnect(&self) {
        let mut link = self.inner.link.lock().await;
        if link.is_some() {
            info!("Stove disconnected: {}", self.inner.params.address());
        }
        self.inner.close_link(&mut link).await;
    }
}
