// Derived display model - presentation-ready values computed from telemetry
use super::tank::{ControlMode, EventLog, ManualOverride, Severity, TankConfig, TankState};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Capacity assumed when no config is held.
pub const FALLBACK_CAPACITY_L: f64 = 100.0;

/// Level assumed when no state is held.
pub const FALLBACK_LEVEL_L: f64 = 0.0;

pub const MISSING_VALUE: &str = "--";

/// Fill percentage in `[0, 100]`. Total for every input: non-finite ratios
/// count as empty, capacity below one litre is treated as one.
pub fn level_percent(level_l: f64, capacity_l: f64) -> u8 {
    let capacity = if capacity_l.is_nan() { 1.0 } else { capacity_l.max(1.0) };
    let ratio = level_l / capacity;
    if ratio.is_nan() {
        return 0;
    }
    (ratio.clamp(0.0, 1.0) * 100.0).round() as u8
}

pub fn format_litres(value: f64, decimals: usize) -> String {
    format!("{:.*} L", decimals, value)
}

pub fn format_celsius(value: f64) -> String {
    format!("{:.1} °C", value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Actuator {
    Fill,
    Drain,
    Heater,
    Safe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeTier {
    Inactive,
    Active,
    Danger,
}

/// Safe mode is the only actuator whose active state escalates to danger.
pub fn badge_tier(actuator: Actuator, active: bool) -> BadgeTier {
    match (actuator, active) {
        (_, false) => BadgeTier::Inactive,
        (Actuator::Safe, true) => BadgeTier::Danger,
        (_, true) => BadgeTier::Active,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Badge {
    pub actuator: Actuator,
    pub active: bool,
    pub tier: BadgeTier,
    pub label: &'static str,
}

impl Badge {
    fn new(actuator: Actuator, active: bool) -> Self {
        let label = match (actuator, active) {
            (Actuator::Fill, true) => "Fill valve open",
            (Actuator::Fill, false) => "Fill valve closed",
            (Actuator::Drain, true) => "Drain valve open",
            (Actuator::Drain, false) => "Drain valve closed",
            (Actuator::Heater, true) => "Heater on",
            (Actuator::Heater, false) => "Heater off",
            (Actuator::Safe, true) => "Safe mode active",
            (Actuator::Safe, false) => "Safe mode inactive",
        };
        Self {
            actuator,
            active,
            tier: badge_tier(actuator, active),
            label,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityTone {
    Info,
    Warning,
    Error,
}

impl From<Severity> for SeverityTone {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Info => SeverityTone::Info,
            Severity::Warning => SeverityTone::Warning,
            Severity::Error => SeverityTone::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelIndicator {
    pub percent: u8,
    pub capacity_label: String,
    pub level_label: String,
    pub floor_label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeView {
    pub mode: ControlMode,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToggleView {
    pub field: ManualOverride,
    pub label: &'static str,
    pub on: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManualPanel {
    pub enabled: bool,
    pub valves: Vec<ToggleView>,
    pub heaters: Vec<ToggleView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigHints {
    pub min_level: String,
    pub max_level: String,
    pub hysteresis: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRow {
    pub id: i64,
    pub time: String,
    pub code: String,
    pub message: String,
    pub tone: SeverityTone,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionView {
    pub degraded: bool,
    pub loading: bool,
    pub message: Option<&'static str>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl ConnectionView {
    pub fn new(degraded: bool, loading: bool, last_updated: Option<DateTime<Utc>>) -> Self {
        let message = if degraded {
            Some("No connection with the backend. Retrying...")
        } else if loading {
            Some("Connecting to the backend...")
        } else {
            None
        };
        Self {
            degraded,
            loading,
            message,
            last_updated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub level: LevelIndicator,
    /// Only shown once both state and config are known.
    pub level_percent: Option<u8>,
    pub temperature: String,
    pub target: String,
    pub control_mode: Option<ModeView>,
    pub badges: Vec<Badge>,
    pub manual: Option<ManualPanel>,
    pub hints: Option<ConfigHints>,
    pub events: Vec<EventRow>,
    pub no_recent_events: bool,
    pub connection: ConnectionView,
}

impl Dashboard {
    pub fn build(
        state: Option<&TankState>,
        config: Option<&TankConfig>,
        events: &[EventLog],
        connection: ConnectionView,
    ) -> Self {
        let level_l = state.map_or(FALLBACK_LEVEL_L, |s| s.level_l);
        let capacity_l = config.map_or(FALLBACK_CAPACITY_L, |c| f64::from(c.capacity_l));
        let percent = level_percent(level_l, capacity_l);

        let temperature = state.map_or_else(|| MISSING_VALUE.to_string(), |s| format_celsius(s.temp_c));
        let target = config.map_or_else(
            || MISSING_VALUE.to_string(),
            |c| format!("{:.1} °C (±{:.1})", c.temp_set_c, c.hysteresis_c),
        );

        let badges = vec![
            Badge::new(Actuator::Fill, state.is_some_and(|s| s.valve_open)),
            Badge::new(Actuator::Drain, state.is_some_and(|s| s.drain_valve_open)),
            Badge::new(Actuator::Heater, state.is_some_and(|s| s.heater_on)),
            Badge::new(Actuator::Safe, state.is_some_and(|s| s.safe_mode)),
        ];

        let events = events
            .iter()
            .map(|e| EventRow {
                id: e.id,
                time: e.ts.format("%H:%M:%S").to_string(),
                code: e.code.clone(),
                message: e.message.clone(),
                tone: e.severity.into(),
            })
            .collect::<Vec<_>>();

        Self {
            level: LevelIndicator {
                percent,
                capacity_label: format_litres(capacity_l, 0),
                level_label: format_litres(level_l, 1),
                floor_label: "0 L",
            },
            level_percent: (state.is_some() && config.is_some()).then_some(percent),
            temperature,
            target,
            control_mode: config.map(|c| ModeView {
                mode: c.control_mode,
                label: c.control_mode.label(),
            }),
            badges,
            manual: config.map(manual_panel),
            hints: config.map(|c| ConfigHints {
                min_level: format!("{} L", c.min_level_l),
                max_level: format!("{} L", c.max_level_l),
                hysteresis: format_celsius(c.hysteresis_c),
            }),
            no_recent_events: events.is_empty(),
            events,
            connection,
        }
    }
}

fn manual_panel(config: &TankConfig) -> ManualPanel {
    let view = |field: ManualOverride| ToggleView {
        field,
        label: field.label(),
        on: field.current(config),
    };
    ManualPanel {
        enabled: config.is_manual(),
        valves: ManualOverride::ALL[..2].iter().copied().map(view).collect(),
        heaters: ManualOverride::ALL[2..].iter().copied().map(view).collect(),
    }
}
