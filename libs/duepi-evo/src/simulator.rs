//! In-process stove simulator
//!
//! A loopback TCP server that speaks the Duepi EVO protocol: it expects the
//! `master:{code}#` handshake, validates every frame checksum, answers reads
//! from a register table and applies writes to it. Faults can be injected on
//! specific frame ordinals to exercise the client's reconnect path.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::codec::{decode_frame, encode_status_response, encode_value_response, FRAME_LEN};
use crate::command::CommandCode;
use crate::constants::status_flags::{IGNITION, OFF};
use crate::constants::{MAX_TEMP, MIN_TEMP, RESPONSE_LEN};

const MAX_HANDSHAKE_LEN: usize = 64;

/// Register table served by the simulator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoveRegisters {
    pub status: u32,
    /// Tenths of a degree
    pub room_temp: u16,
    pub fumes_temp: u16,
    pub power_level: u16,
    pub pellet_speed: u16,
    /// RPM / 10
    pub exhaust_fan: u16,
    pub error_code: u16,
    pub setpoint: u16,
    pub firmware_version: u16,
    pub board_temp: u16,
    pub ambient_fan: u16,
    pub hopper_level: u16,
}

impl Default for StoveRegisters {
    fn default() -> Self {
        Self {
            status: OFF,
            room_temp: 205,
            fumes_temp: 35,
            power_level: 3,
            pellet_speed: 0,
            exhaust_fan: 0,
            error_code: 0,
            setpoint: 21,
            firmware_version: 0x0123,
            board_temp: 31,
            ambient_fan: 0,
            hopper_level: 80,
        }
    }
}

/// What the simulator does with a frame it was told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Close the socket without answering
    Drop,
    /// Keep the socket open and never answer
    Silent,
    /// Answer with ten bytes that are not hex
    Garbage,
}

#[derive(Debug, Default)]
struct SimState {
    registers: StoveRegisters,
    frames: Vec<CommandCode>,
    handshakes: Vec<String>,
    connections: usize,
    malformed: usize,
    faults: HashMap<usize, Fault>,
    offline: bool,
}

enum Reply {
    Send([u8; RESPONSE_LEN]),
    Fault(Fault),
    Close,
}

/// Simulator builder
#[derive(Debug, Default)]
pub struct StoveSimulator {
    registers: StoveRegisters,
}

impl StoveSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registers(mut self, registers: StoveRegisters) -> Self {
        self.registers = registers;
        self
    }

    /// Listen on an ephemeral loopback port
    pub async fn start(self) -> io::Result<SimulatorHandle> {
        self.start_on("127.0.0.1:0").await
    }

    pub async fn start_on(self, addr: &str) -> io::Result<SimulatorHandle> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Stove simulator listening on {}", local_addr);

        let state = Arc::new(Mutex::new(SimState {
            registers: self.registers,
            ..Default::default()
        }));

        let accept_state = Arc::clone(&state);
        let accept_task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        debug!("Simulator connection from {}", peer);
                        let conn_state = Arc::clone(&accept_state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, conn_state).await {
                                debug!("Simulator connection ended: {}", e);
                            }
                        });
                    },
                    Err(e) => {
                        error!("Simulator accept error: {}", e);
                        break;
                    },
                }
            }
        });

        Ok(SimulatorHandle {
            addr: local_addr,
            state,
            accept_task: Arc::new(StdMutex::new(Some(accept_task))),
        })
    }
}

/// Control and inspection handle for a running simulator
#[derive(Debug, Clone)]
pub struct SimulatorHandle {
    addr: SocketAddr,
    state: Arc<Mutex<SimState>>,
    accept_task: Arc<StdMutex<Option<JoinHandle<()>>>>,
}

impl SimulatorHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub async fn registers(&self) -> StoveRegisters {
        self.state.lock().await.registers.clone()
    }

    pub async fn update_registers(&self, update: impl FnOnce(&mut StoveRegisters)) {
        update(&mut self.state.lock().await.registers);
    }

    /// Valid frames received so far, across all connections
    pub async fn received(&self) -> Vec<CommandCode> {
        self.state.lock().await.frames.clone()
    }

    pub async fn handshakes(&self) -> Vec<String> {
        self.state.lock().await.handshakes.clone()
    }

    /// Accepted connections that completed a handshake
    pub async fn connections(&self) -> usize {
        self.state.lock().await.connections
    }

    /// Frames rejected for bad framing or checksum
    pub async fn malformed_frames(&self) -> usize {
        self.state.lock().await.malformed
    }

    /// Fail the frame with the given 1-based ordinal
    pub async fn inject_fault(&self, ordinal: usize, fault: Fault) {
        self.state.lock().await.faults.insert(ordinal, fault);
    }

    /// Fail the next `count` frames
    pub async fn fail_next(&self, count: usize, fault: Fault) {
        let mut state = self.state.lock().await;
        let next = state.frames.len() + 1;
        for ordinal in next..next + count {
            state.faults.insert(ordinal, fault);
        }
    }

    /// Stop accepting and drop every open connection at its next frame
    pub async fn stop(&self) {
        let task = match self.accept_task.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(task) = task {
            task.abort();
            // The listener is closed once the aborted task has been dropped
            let _ = task.await;
        }
        self.state.lock().await.offline = true;
        info!("Stove simulator stopped: {}", self.addr);
    }
}

async fn read_handshake(stream: &mut TcpStream) -> io::Result<String> {
    let mut handshake = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        stream.read_exact(&mut byte).await?;
        handshake.push(byte[0]);
        if byte[0] == b'#' {
            break;
        }
        if handshake.len() >= MAX_HANDSHAKE_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "handshake too long",
            ));
        }
    }
    Ok(String::from_utf8_lossy(&handshake).into_owned())
}

async fn handle_connection(mut stream: TcpStream, state: Arc<Mutex<SimState>>) -> io::Result<()> {
    let handshake = read_handshake(&mut stream).await?;
    if !handshake.starts_with("master:") {
        warn!("Simulator rejected handshake: {}", handshake);
        return Ok(());
    }
    {
        let mut state = state.lock().await;
        state.handshakes.push(handshake);
        state.connections += 1;
    }

    let mut frame = [0u8; FRAME_LEN];
    loop {
        match stream.read_exact(&mut frame).await {
            Ok(_) => {},
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e),
        }

        let reply = {
            let mut state = state.lock().await;
            state.process(&frame)
        };

        match reply {
            Reply::Send(response) => stream.write_all(&response).await?,
            Reply::Close | Reply::Fault(Fault::Drop) => return Ok(()),
            Reply::Fault(Fault::Garbage) => stream.write_all(b"RZZZZZZZZ&").await?,
            Reply::Fault(Fault::Silent) => {
                // Drain until the client gives up
                let mut sink = [0u8; 64];
                while stream.read(&mut sink).await? > 0 {}
                return Ok(());
            },
        }
    }
}

impl SimState {
    fn process(&mut self, frame: &[u8]) -> Reply {
        if self.offline {
            return Reply::Close;
        }

        let Some(code) = decode_frame(frame) else {
            warn!("Simulator rejected frame: {:?}", String::from_utf8_lossy(frame));
            self.malformed += 1;
            return Reply::Close;
        };

        self.frames.push(code);
        if let Some(fault) = self.faults.remove(&self.frames.len()) {
            debug!("Simulator fault {:?} on {}", fault, code);
            return Reply::Fault(fault);
        }

        Reply::Send(self.apply(code))
    }

    fn apply(&mut self, code: CommandCode) -> [u8; RESPONSE_LEN] {
        let regs = &mut self.registers;
        let value = match code {
            CommandCode::GET_STATUS => return encode_status_response(regs.status),
            CommandCode::GET_ROOM_TEMP => regs.room_temp,
            CommandCode::GET_FUMES_TEMP => regs.fumes_temp,
            CommandCode::GET_POWER_LEVEL => regs.power_level,
            CommandCode::GET_PELLET_SPEED => regs.pellet_speed,
            CommandCode::GET_EXHAUST_FAN => regs.exhaust_fan,
            CommandCode::GET_ERROR => regs.error_code,
            CommandCode::GET_SETPOINT => regs.setpoint,
            CommandCode::GET_FIRMWARE_VERSION => regs.firmware_version,
            CommandCode::GET_BOARD_TEMP => regs.board_temp,
            CommandCode::GET_AMBIENT_FAN => regs.ambient_fan,
            CommandCode::GET_HOPPER_LEVEL => regs.hopper_level,
            CommandCode::POWER_ON => {
                regs.status = IGNITION;
                0
            },
            CommandCode::POWER_OFF => {
                regs.status = OFF;
                0
            },
            CommandCode::RESET_ERROR => {
                regs.error_code = 0;
                0
            },
            other => {
                apply_parameter_write(regs, other.as_bytes());
                0
            },
        };
        encode_value_response(value)
    }
}

/// `F00{n}0` sets the power level, `F2{hh}0` the setpoint
fn apply_parameter_write(regs: &mut StoveRegisters, code: &[u8; 5]) {
    match code {
        [b'F', b'0', b'0', level @ b'0'..=b'6', b'0'] => {
            regs.power_level = u16::from(level - b'0');
        },
        [b'F', b'2', hi, lo, b'0'] => {
            let hex = [*hi, *lo];
            let parsed = std::str::from_utf8(&hex)
                .ok()
                .and_then(|s| u16::from_str_radix(s, 16).ok());
            if let Some(temp) = parsed {
                regs.setpoint = temp.clamp(MIN_TEMP as u16, MAX_TEMP as u16);
            }
        },
        _ => debug!("Simulator ignored {:?}", String::from_utf8_lossy(code)),
    }
}
