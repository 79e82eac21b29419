// Tank domain model - entities published by the control backend
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capacities the backend accepts, in litres.
pub const CAPACITY_OPTIONS_L: [u32; 5] = [90, 150, 200, 500, 1000];

/// Capacity used when a value cannot be mapped to an option.
pub const DEFAULT_CAPACITY_L: u32 = CAPACITY_OPTIONS_L[0];

/// Telemetry snapshot. Replaced wholesale on every accepted poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TankState {
    pub id: i64,
    #[serde(default)]
    pub config: Option<i64>,
    pub level_l: f64,
    pub temp_c: f64,
    pub valve_open: bool,
    pub drain_valve_open: bool,
    pub heater_on: bool,
    pub safe_mode: bool,
    pub ts: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ControlMode {
    Auto,
    Manual,
}

impl ControlMode {
    pub fn label(self) -> &'static str {
        match self {
            ControlMode::Auto => "Automatic",
            ControlMode::Manual => "Manual",
        }
    }
}

/// Control profile held by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TankConfig {
    pub id: i64,
    pub capacity_l: u32,
    pub min_level_l: u32,
    pub max_level_l: u32,
    pub temp_set_c: f64,
    pub temp_min_c: f64,
    pub temp_max_c: f64,
    pub hysteresis_c: f64,
    pub control_mode: ControlMode,
    pub manual_valve_open: bool,
    pub manual_drain_valve_open: bool,
    pub manual_heater_on: bool,
    pub manual_heater_150_on: bool,
    pub manual_heater_500_on: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TankConfig {
    pub fn is_manual(&self) -> bool {
        self.control_mode == ControlMode::Manual
    }

    pub fn setpoint_in_bounds(&self, value: f64) -> bool {
        value.is_finite() && self.temp_min_c <= value && value <= self.temp_max_c
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Audit record. Immutable once observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    pub id: i64,
    pub code: String,
    pub message: String,
    pub severity: Severity,
    pub ts: DateTime<Utc>,
}

/// Operator-driven actuator overrides, named by their wire field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManualOverride {
    #[serde(rename = "manual_valve_open")]
    FillValve,
    #[serde(rename = "manual_drain_valve_open")]
    DrainValve,
    #[serde(rename = "manual_heater_on")]
    Heater,
    #[serde(rename = "manual_heater_150_on")]
    Heater150,
    #[serde(rename = "manual_heater_500_on")]
    Heater500,
}

impl ManualOverride {
    pub const ALL: [ManualOverride; 5] = [
        ManualOverride::FillValve,
        ManualOverride::DrainValve,
        ManualOverride::Heater,
        ManualOverride::Heater150,
        ManualOverride::Heater500,
    ];

    pub fn field(self) -> &'static str {
        match self {
            ManualOverride::FillValve => "manual_valve_open",
            ManualOverride::DrainValve => "manual_drain_valve_open",
            ManualOverride::Heater => "manual_heater_on",
            ManualOverride::Heater150 => "manual_heater_150_on",
            ManualOverride::Heater500 => "manual_heater_500_on",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ManualOverride::FillValve => "Fill valve open",
            ManualOverride::DrainValve => "Drain valve open",
            ManualOverride::Heater => "Heater 50 W",
            ManualOverride::Heater150 => "Heater 150 W",
            ManualOverride::Heater500 => "Heater 500 W",
        }
    }

    pub fn index(self) -> usize {
        match self {
            ManualOverride::FillValve => 0,
            ManualOverride::DrainValve => 1,
            ManualOverride::Heater => 2,
            ManualOverride::Heater150 => 3,
            ManualOverride::Heater500 => 4,
        }
    }

    /// Value currently held in the given config.
    pub fn current(self, config: &TankConfig) -> bool {
        match self {
            ManualOverride::FillValve => config.manual_valve_open,
            ManualOverride::DrainValve => config.manual_drain_valve_open,
            ManualOverride::Heater => config.manual_heater_on,
            ManualOverride::Heater150 => config.manual_heater_150_on,
            ManualOverride::Heater500 => config.manual_heater_500_on,
        }
    }

    pub fn patch(self, value: bool) -> ConfigPatch {
        let mut patch = ConfigPatch::default();
        match self {
            ManualOverride::FillValve => patch.manual_valve_open = Some(value),
            ManualOverride::DrainValve => patch.manual_drain_valve_open = Some(value),
            ManualOverride::Heater => patch.manual_heater_on = Some(value),
            ManualOverride::Heater150 => patch.manual_heater_150_on = Some(value),
            ManualOverride::Heater500 => patch.manual_heater_500_on = Some(value),
        }
        patch
    }
}

/// Sparse update for `PATCH /config/`. Absent fields are not serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_l: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_set_c: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_mode: Option<ControlMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_valve_open: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_drain_valve_open: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_heater_on: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_heater_150_on: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_heater_500_on: Option<bool>,
}

impl ConfigPatch {
    pub fn mode(mode: ControlMode) -> Self {
        Self {
            control_mode: Some(mode),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// True when any manual override field is present.
    pub fn touches_overrides(&self) -> bool {
        self.manual_valve_open.is_some()
            || self.manual_drain_valve_open.is_some()
            || self.manual_heater_on.is_some()
            || self.manual_heater_150_on.is_some()
            || self.manual_heater_500_on.is_some()
    }
}

/// Partial update as requested by an operator. Capacity may be any number
/// and is mapped onto an option before it becomes a [`ConfigPatch`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigUpdate {
    #[serde(default)]
    pub capacity_l: Option<f64>,
    #[serde(default)]
    pub temp_set_c: Option<f64>,
    #[serde(default)]
    pub control_mode: Option<ControlMode>,
    #[serde(default)]
    pub manual_valve_open: Option<bool>,
    #[serde(default)]
    pub manual_drain_valve_open: Option<bool>,
    #[serde(default)]
    pub manual_heater_on: Option<bool>,
    #[serde(default)]
    pub manual_heater_150_on: Option<bool>,
    #[serde(default)]
    pub manual_heater_500_on: Option<bool>,
}

impl ConfigUpdate {
    /// Outbound patch with `capacity_l` replaced by an accepted option.
    pub fn with_capacity(self, capacity_l: Option<u32>) -> ConfigPatch {
        ConfigPatch {
            capacity_l,
            temp_set_c: self.temp_set_c,
            control_mode: self.control_mode,
            manual_valve_open: self.manual_valve_open,
            manual_drain_valve_open: self.manual_drain_valve_open,
            manual_heater_on: self.manual_heater_on,
            manual_heater_150_on: self.manual_heater_150_on,
            manual_heater_500_on: self.manual_heater_500_on,
        }
    }
}

impl From<ConfigPatch> for ConfigUpdate {
    fn from(patch: ConfigPatch) -> Self {
        Self {
            capacity_l: patch.capacity_l.map(f64::from),
            temp_set_c: patch.temp_set_c,
            control_mode: patch.control_mode,
            manual_valve_open: patch.manual_valve_open,
            manual_drain_valve_open: patch.manual_drain_valve_open,
            manual_heater_on: patch.manual_heater_on,
            manual_heater_150_on: patch.manual_heater_150_on,
            manual_heater_500_on: patch.manual_heater_500_on,
        }
    }
}

/// Map an arbitrary capacity to the closest accepted option.
/// Ties go to the smaller option; non-finite input yields the default.
pub fn nearest_capacity(value: f64) -> u32 {
    if !value.is_finite() {
        return DEFAULT_CAPACITY_L;
    }
    let mut best = DEFAULT_CAPACITY_L;
    let mut best_distance = f64::INFINITY;
    for option in CAPACITY_OPTIONS_L {
        let distance = (f64::from(option) - value).abs();
        if distance < best_distance {
            best = option;
            best_distance = distance;
        }
    }
    best
}

pub fn is_capacity_option(value: u32) -> bool {
    CAPACITY_OPTIONS_L.contains(&value)
}
