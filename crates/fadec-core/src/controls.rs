//! Cockpit control inputs
//!
//! Controls are written only by external actors (through patches) and read
//! by the tick as one consistent snapshot.

use serde::{Deserialize, Deserializer, Serialize};

/// Throttle lever range, percent
pub const THROTTLE_MIN: f64 = 0.0;
pub const THROTTLE_MAX: f64 = 100.0;

/// Complete control panel state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Controls {
    pub master_switch: bool,
    /// Engine fuel pump (single-pump fuel system)
    pub fuel_pump: bool,
    pub ignition: bool,
    pub starter: bool,
    /// Lever position, always within [0, 100]
    #[serde(deserialize_with = "deserialize_throttle")]
    pub(crate) throttle: f64,
    /// Master bleed valve
    pub bleed_air: bool,
    pub pack_l: bool,
    pub pack_r: bool,
    /// Tank boost pumps (tank fuel system)
    pub tank_pump_l: bool,
    pub tank_pump_r: bool,
    pub crossfeed: bool,
    pub dump_l: bool,
    pub dump_r: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            master_switch: false,
            fuel_pump: false,
            ignition: false,
            starter: false,
            throttle: THROTTLE_MIN,
            bleed_air: true,
            pack_l: false,
            pack_r: false,
            tank_pump_l: false,
            tank_pump_r: false,
            crossfeed: false,
            dump_l: false,
            dump_r: false,
        }
    }
}

impl Controls {
    pub fn throttle(&self) -> f64 {
        self.throttle
    }

    /// Move the lever. Non-finite input leaves it where it is.
    pub fn set_throttle(&mut self, throttle: f64) {
        self.throttle = clamp_throttle(throttle, self.throttle);
    }

    /// Merge a partial update
    pub fn apply(&mut self, patch: &ControlsPatch) {
        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = patch.$field {
                    self.$field = value;
                })*
            };
        }
        merge!(
            master_switch,
            fuel_pump,
            ignition,
            starter,
            bleed_air,
            pack_l,
            pack_r,
            tank_pump_l,
            tank_pump_r,
            crossfeed,
            dump_l,
            dump_r,
        );
        if let Some(throttle) = patch.throttle {
            self.set_throttle(throttle);
        }
    }

    /// Controls with the panel fully configured for a start: master, fuel,
    /// ignition and starter on, throttle idle.
    pub fn start_configuration() -> Self {
        Self {
            master_switch: true,
            fuel_pump: true,
            ignition: true,
            starter: true,
            tank_pump_l: true,
            tank_pump_r: true,
            ..Self::default()
        }
    }
}

fn clamp_throttle(requested: f64, current: f64) -> f64 {
    if requested.is_finite() {
        requested.clamp(THROTTLE_MIN, THROTTLE_MAX)
    } else {
        current
    }
}

fn deserialize_throttle<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    Ok(clamp_throttle(raw, THROTTLE_MIN))
}

/// Partial control update; `None` fields are left untouched
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_switch: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_pump: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignition: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starter: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throttle: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bleed_air: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pack_l: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pack_r: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tank_pump_l: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tank_pump_r: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crossfeed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dump_l: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dump_r: Option<bool>,
}

impl ControlsPatch {
    pub fn throttle(throttle: f64) -> Self {
        Self {
            throttle: Some(throttle),
            ..Self::default()
        }
    }

    pub fn starter(on: bool) -> Self {
        Self {
            starter: Some(on),
            ..Self::default()
        }
    }

    pub fn master_switch(on: bool) -> Self {
        Self {
            master_switch: Some(on),
            ..Self::default()
        }
    }
}

impl From<Controls> for ControlsPatch {
    fn from(c: Controls) -> Self {
        Self {
            master_switch: Some(c.master_switch),
            fuel_pump: Some(c.fuel_pump),
            ignition: Some(c.ignition),
            starter: Some(c.starter),
            throttle: Some(c.throttle),
            bleed_air: Some(c.bleed_air),
            pack_l: Some(c.pack_l),
            pack_r: Some(c.pack_r),
            tank_pump_l: Some(c.tank_pump_l),
            tank_pump_r: Some(c.tank_pump_r),
            crossfeed: Some(c.crossfeed),
            dump_l: Some(c.dump_l),
            dump_r: Some(c.dump_r),
        }
    }
}
