//! Common test utilities and helpers

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use duepi_evo::constants::status_flags::WORKING;
use duepi_evo::{DuepiError, RawRegisters, StoveClient, StoveSnapshot};
use stovesrv::{create_router, AppState, StoveCoordinator};

pub const DEVICE_CODE: &str = "TEST01";

/// In-memory stove: records every call, fails on demand
#[derive(Default)]
pub struct MockStove {
    registers: Mutex<RawRegisters>,
    poll_delay: Mutex<Duration>,
    fail_polls: AtomicBool,
    fail_commands: AtomicBool,
    fail_connect: AtomicBool,
    polls: AtomicUsize,
    disconnects: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl MockStove {
    pub fn working() -> Arc<Self> {
        let mock = Self::default();
        *mock.registers.lock().unwrap() = RawRegisters {
            status: WORKING,
            room_temp: 214,
            fumes_temp: 138,
            power_level: 4,
            pellet_speed: 31,
            exhaust_fan: 152,
            error_code: 0,
            setpoint: 22,
        };
        Arc::new(mock)
    }

    pub fn update_registers(&self, update: impl FnOnce(&mut RawRegisters)) {
        update(&mut self.registers.lock().unwrap());
    }

    pub fn set_poll_delay(&self, delay: Duration) {
        *self.poll_delay.lock().unwrap() = delay;
    }

    pub fn fail_polls(&self, fail: bool) {
        self.fail_polls.store(fail, Ordering::SeqCst);
    }

    pub fn fail_commands(&self, fail: bool) {
        self.fail_commands.store(fail, Ordering::SeqCst);
    }

    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn command(&self, call: String, code: &str) -> duepi_evo::Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.fail_commands.load(Ordering::SeqCst) {
            return Err(DuepiError::command(code, "connection reset by peer"));
        }
        Ok(())
    }
}

#[async_trait]
impl StoveClient for MockStove {
    async fn connect(&self) -> duepi_evo::Result<()> {
        self.calls.lock().unwrap().push("connect".to_string());
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(DuepiError::connection("stove.test", 3000, "connection refused"));
        }
        Ok(())
    }

    async fn get_stove_data(&self) -> duepi_evo::Result<StoveSnapshot> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.poll_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_polls.load(Ordering::SeqCst) {
            return Err(DuepiError::command("D4000", "timed out"));
        }
        let raw = *self.registers.lock().unwrap();
        Ok(StoveSnapshot::from_registers(raw))
    }

    async fn power_on(&self) -> duepi_evo::Result<()> {
        self.command("power_on".to_string(), "F0010")
    }

    async fn power_off(&self) -> duepi_evo::Result<()> {
        self.command("power_off".to_string(), "F0000")
    }

    async fn set_power_level(&self, level: i32) -> duepi_evo::Result<()> {
        self.command(format!("set_power_level({})", level), "F0030")
    }

    async fn set_target_temperature(&self, temp: f64) -> duepi_evo::Result<()> {
        self.command(format!("set_target_temperature({})", temp), "F2150")
    }

    async fn reset_error(&self) -> duepi_evo::Result<()> {
        self.command("reset_error".to_string(), "D6000")
    }

    async fn test_connection(&self) -> bool {
        !self.fail_connect.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn coordinator(mock: &Arc<MockStove>) -> Arc<StoveCoordinator> {
    let client: Arc<dyn StoveClient> = Arc::clone(mock) as Arc<dyn StoveClient>;
    Arc::new(StoveCoordinator::new(client, Duration::from_secs(12)))
}

/// Router over a coordinator that has not polled yet
pub fn create_test_router(mock: &Arc<MockStove>) -> (axum::Router, Arc<StoveCoordinator>) {
    let coordinator = coordinator(mock);
    let router = create_router(AppState::new(Arc::clone(&coordinator), DEVICE_CODE));
    (router, coordinator)
}
