//! Persisted Unit Entity
//!
//! A unit is stored as a small map of integer ordinals:
//! `{"type": <unit type>, "currentAction": <action>}`.
//! Decoding rejects unknown ordinals and missing keys instead of defaulting.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Map key of the unit type ordinal.
pub const TYPE_KEY: &str = "type";

/// Map key of the current action ordinal.
pub const CURRENT_ACTION_KEY: &str = "currentAction";

/// Kind of unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum UnitType {
    /// Foot soldiers
    Infantry = 0,
    /// Armored vehicle
    Tank = 1,
    /// Long-range support
    Artillery = 2,
}

impl UnitType {
    /// All unit types in ordinal order.
    pub const ALL: [UnitType; 3] = [UnitType::Infantry, UnitType::Tank, UnitType::Artillery];

    /// Get from ordinal.
    pub fn from_ordinal(ordinal: i64) -> Option<Self> {
        match ordinal {
            0 => Some(UnitType::Infantry),
            1 => Some(UnitType::Tank),
            2 => Some(UnitType::Artillery),
            _ => None,
        }
    }
}

/// What a unit has done this turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
#[derive(Default)]
pub enum UnitAction {
    /// Waiting for orders
    #[default]
    ReadyForOrders = 0,
    /// Has moved
    Moved = 1,
    /// Has attacked
    Attacked = 2,
    /// Done for this turn
    Finished = 3,
}

impl UnitAction {
    /// All actions in ordinal order.
    pub const ALL: [UnitAction; 4] = [
        UnitAction::ReadyForOrders,
        UnitAction::Moved,
        UnitAction::Attacked,
        UnitAction::Finished,
    ];

    /// Get from ordinal.
    pub fn from_ordinal(ordinal: i64) -> Option<Self> {
        match ordinal {
            0 => Some(UnitAction::ReadyForOrders),
            1 => Some(UnitAction::Moved),
            2 => Some(UnitAction::Attacked),
            3 => Some(UnitAction::Finished),
            _ => None,
        }
    }
}

/// Errors decoding a persisted unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    /// A required key is absent.
    #[error("missing unit field: {0}")]
    MissingField(&'static str),

    /// Unit type ordinal outside the enumeration.
    #[error("invalid unit type ordinal: {0}")]
    InvalidUnitType(i64),

    /// Action ordinal outside the enumeration.
    #[error("invalid unit action ordinal: {0}")]
    InvalidAction(i64),

    /// Payload is not a map of integers.
    #[error("malformed unit payload: {0}")]
    Malformed(String),
}

/// A unit on the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Unit {
    /// Unit kind
    pub unit_type: UnitType,
    /// Current action state
    pub current_action: UnitAction,
}

impl Unit {
    /// Create a unit ready for orders.
    pub fn new(unit_type: UnitType) -> Self {
        Self {
            unit_type,
            current_action: UnitAction::ReadyForOrders,
        }
    }

    /// A unit that has acted this turn cannot take new orders.
    #[inline]
    pub fn is_disabled(&self) -> bool {
        self.current_action != UnitAction::ReadyForOrders
    }

    /// Encode as an ordinal map.
    pub fn to_dict(&self) -> BTreeMap<String, i64> {
        let mut dict = BTreeMap::new();
        dict.insert(TYPE_KEY.to_string(), self.unit_type as i64);
        dict.insert(CURRENT_ACTION_KEY.to_string(), self.current_action as i64);
        dict
    }

    /// Decode from an ordinal map.
    pub fn from_dict(dict: &BTreeMap<String, i64>) -> Result<Self, UnitError> {
        let type_ordinal = *dict.get(TYPE_KEY).ok_or(UnitError::MissingField(TYPE_KEY))?;
        let action_ordinal = *dict
            .get(CURRENT_ACTION_KEY)
            .ok_or(UnitError::MissingField(CURRENT_ACTION_KEY))?;

        let unit_type = UnitType::from_ordinal(type_ordinal)
            .ok_or(UnitError::InvalidUnitType(type_ordinal))?;
        let current_action = UnitAction::from_ordinal(action_ordinal)
            .ok_or(UnitError::InvalidAction(action_ordinal))?;

        Ok(Self {
            unit_type,
            current_action,
        })
    }

    /// Encode as JSON.
    pub fn to_json(&self) -> String {
        // A map of strings to integers always serializes.
        serde_json::to_string(&self.to_dict()).unwrap_or_default()
    }

    /// Decode from JSON.
    pub fn from_json(json: &str) -> Result<Self, UnitError> {
        let dict: BTreeMap<String, i64> =
            serde_json::from_str(json).map_err(|e| UnitError::Malformed(e.to_string()))?;
        Self::from_dict(&dict)
    }
}

// =============================================================================
// TESTS
// =============================================================================
