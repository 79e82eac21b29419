// In-memory control backend for application-layer tests
use crate::application::control_backend::{BackendError, ControlBackend};
use crate::domain::tank::{fixtures, ConfigPatch, EventLog, Severity, TankConfig, TankState};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub struct FakeBackend {
    offline: AtomicBool,
    config_fetch_fails: AtomicBool,
    reject_with: Mutex<Option<u16>>,
    state: Mutex<TankState>,
    config: Mutex<TankConfig>,
    events: Mutex<Vec<EventLog>>,
    state_delay: Mutex<Option<Duration>>,
    config_delay: Mutex<Option<Duration>>,
    patches: Mutex<Vec<ConfigPatch>>,
    events_limits: Mutex<Vec<u32>>,
    state_calls: AtomicUsize,
    config_calls: AtomicUsize,
    events_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::with_config(fixtures::config(1))
    }

    pub fn with_config(config: TankConfig) -> Self {
        Self {
            offline: AtomicBool::new(false),
            config_fetch_fails: AtomicBool::new(false),
            reject_with: Mutex::new(None),
            state: Mutex::new(fixtures::state(0, 80.0)),
            config: Mutex::new(config),
            events: Mutex::new(vec![
                fixtures::event(2, Severity::Warning),
                fixtures::event(1, Severity::Info),
            ]),
            state_delay: Mutex::new(None),
            config_delay: Mutex::new(None),
            patches: Mutex::new(Vec::new()),
            events_limits: Mutex::new(Vec::new()),
            state_calls: AtomicUsize::new(0),
            config_calls: AtomicUsize::new(0),
            events_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Fail config reads only; patches still go through.
    pub fn fail_config_fetch(&self, fail: bool) {
        self.config_fetch_fails.store(fail, Ordering::SeqCst);
    }

    pub fn reject_patches_with(&self, status: Option<u16>) {
        *self.reject_with.lock().unwrap() = status;
    }

    pub fn set_state_delay(&self, delay: Duration) {
        *self.state_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_config_delay(&self, delay: Duration) {
        *self.config_delay.lock().unwrap() = Some(delay);
    }

    pub fn current_config(&self) -> TankConfig {
        self.config.lock().unwrap().clone()
    }

    pub fn patches(&self) -> Vec<ConfigPatch> {
        self.patches.lock().unwrap().clone()
    }

    pub fn events_limits(&self) -> Vec<u32> {
        self.events_limits.lock().unwrap().clone()
    }

    pub fn state_calls(&self) -> usize {
        self.state_calls.load(Ordering::SeqCst)
    }

    pub fn config_calls(&self) -> usize {
        self.config_calls.load(Ordering::SeqCst)
    }

    pub fn events_calls(&self) -> usize {
        self.events_calls.load(Ordering::SeqCst)
    }

    pub fn outbound_requests(&self) -> usize {
        self.state_calls() + self.config_calls() + self.events_calls() + self.patches().len()
    }

    fn check_online(&self) -> Result<(), BackendError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackendError::Unreachable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ControlBackend for FakeBackend {
    async fn fetch_state(&self) -> Result<TankState, BackendError> {
        self.state_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.state_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_online()?;
        let mut state = self.state.lock().unwrap();
        state.ts += chrono::Duration::seconds(1);
        Ok(state.clone())
    }

    async fn fetch_config(&self) -> Result<TankConfig, BackendError> {
        self.config_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.config_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_online()?;
        if self.config_fetch_fails.load(Ordering::SeqCst) {
            return Err(BackendError::Unreachable("config read timed out".to_string()));
        }
        Ok(self.config.lock().unwrap().clone())
    }

    async fn fetch_events(&self, limit: u32) -> Result<Vec<EventLog>, BackendError> {
        self.events_calls.fetch_add(1, Ordering::SeqCst);
        self.events_limits.lock().unwrap().push(limit);
        self.check_online()?;
        Ok(self.events.lock().unwrap().clone())
    }

    async fn patch_config(&self, patch: &ConfigPatch) -> Result<TankConfig, BackendError> {
        self.patches.lock().unwrap().push(patch.clone());
        self.check_online()?;
        if let Some(status) = *self.reject_with.lock().unwrap() {
            return Err(BackendError::Rejected {
                status,
                body: r#"{"temp_set_c":["out of range"]}"#.to_string(),
            });
        }

        let mut config = self.config.lock().unwrap();
        if let Some(v) = patch.capacity_l {
            config.capacity_l = v;
        }
        if let Some(v) = patch.temp_set_c {
            config.temp_set_c = v;
        }
        if let Some(v) = patch.control_mode {
            config.control_mode = v;
        }
        if let Some(v) = patch.manual_valve_open {
            config.manual_valve_open = v;
        }
        if let Some(v) = patch.manual_drain_valve_open {
            config.manual_drain_valve_open = v;
        }
        if let Some(v) = patch.manual_heater_on {
            config.manual_heater_on = v;
        }
        if let Some(v) = patch.manual_heater_150_on {
            config.manual_heater_150_on = v;
        }
        if let Some(v) = patch.manual_heater_500_on {
            config.manual_heater_500_on = v;
        }
        config.updated_at += chrono::Duration::seconds(1);
        Ok(config.clone())
    }
}
