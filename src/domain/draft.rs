// Pending edit of the setpoint/capacity form, kept apart from the confirmed config
use super::tank::{is_capacity_option, nearest_capacity, ConfigPatch, TankConfig, DEFAULT_CAPACITY_L};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigDraft {
    pub temp_set_c: f64,
    pub capacity_l: f64,
    /// `updated_at` of the config this draft was seeded from.
    pub based_on: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DraftEdit {
    #[serde(default)]
    pub temp_set_c: Option<f64>,
    #[serde(default)]
    pub capacity_l: Option<f64>,
}

impl ConfigDraft {
    pub fn seed(config: &TankConfig) -> Self {
        let capacity = if is_capacity_option(config.capacity_l) {
            config.capacity_l
        } else {
            DEFAULT_CAPACITY_L
        };
        Self {
            temp_set_c: config.temp_set_c,
            capacity_l: f64::from(capacity),
            based_on: config.updated_at,
        }
    }

    pub fn apply(&mut self, edit: &DraftEdit) {
        if let Some(temp) = edit.temp_set_c {
            self.temp_set_c = temp;
        }
        if let Some(capacity) = edit.capacity_l {
            self.capacity_l = capacity;
        }
    }

    /// Both fields, with the setpoint rounded to one decimal.
    pub fn to_patch(&self) -> ConfigPatch {
        ConfigPatch {
            capacity_l: Some(nearest_capacity(self.capacity_l.round())),
            temp_set_c: Some((self.temp_set_c * 10.0).round() / 10.0),
            ..ConfigPatch::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tank::fixtures;

    #[test]
    fn test_seed_falls_back_to_default_capacity() {
        let mut config = fixtures::config(1);
        config.capacity_l = 100;
        let draft = ConfigDraft::seed(&config);
        assert_eq!(draft.capacity_l, 90.0);
        assert_eq!(draft.temp_set_c, 35.0);
        assert_eq!(draft.based_on, config.updated_at);
    }

    #[test]
    fn test_edit_and_patch() {
        let mut draft = ConfigDraft::seed(&fixtures::config(1));
        draft.apply(&DraftEdit {
            temp_set_c: Some(41.26),
            capacity_l: None,
        });
        draft.apply(&DraftEdit {
            temp_set_c: None,
            capacity_l: Some(480.0),
        });

        let patch = draft.to_patch();
        assert_eq!(patch.temp_set_c, Some(41.3));
        assert_eq!(patch.capacity_l, Some(500));
        assert!(patch.control_mode.is_none());
        assert!(!patch.touches_overrides());
    }
}
