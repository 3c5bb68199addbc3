//! Property references and the sampled schema catalog
//!
//! The schema service supplies the known property keys for a project along
//! with their operand type and origin. Schemas are sampled and may lag the
//! events actually flowing in, so unknown keys are tolerated everywhere:
//! resolution returns `None` and the caller degrades rather than failing.

use serde::{Deserialize, Serialize};

/// Where a property lives, deciding which table must be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropOrigin {
    /// Property of the event record itself
    Event,
    /// Property of the acting user's profile (requires the people join)
    User,
}

/// Operand type of a property value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperandType {
    /// UTF-8 string
    String,
    /// Numeric
    Number,
    /// Date/time
    Date,
    /// Boolean
    Boolean,
    /// Array of values
    Array,
    /// Anything else
    Other,
}

/// A reference to a property by name and origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRef {
    /// Property key
    pub name: String,
    /// Event-scoped or user-scoped
    pub origin: PropOrigin,
}

impl PropertyRef {
    /// Create an event-scoped property reference
    pub fn event(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: PropOrigin::Event,
        }
    }

    /// Create a user-scoped property reference
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: PropOrigin::User,
        }
    }
}

/// One property as reported by the schema service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySchema {
    /// Property key
    pub key: String,
    /// Operand type
    #[serde(rename = "type")]
    pub operand_type: OperandType,
    /// Event-scoped or user-scoped
    #[serde(rename = "propOrigin")]
    pub origin: PropOrigin,
}

/// The set of known properties for one project
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    properties: Vec<PropertySchema>,
}

impl SchemaCatalog {
    /// Build a catalog from the schema service's property list
    pub fn new(properties: Vec<PropertySchema>) -> Self {
        Self { properties }
    }

    /// Resolve a property reference against the catalog
    ///
    /// Returns `None` for unknown keys; callers degrade the clause to
    /// match-nothing instead of erroring.
    pub fn resolve(&self, property: &PropertyRef) -> Option<&PropertySchema> {
        self.properties
            .iter()
            .find(|p| p.key == property.name && p.origin == property.origin)
    }

    /// Check whether a property reference is known
    pub fn contains(&self, property: &PropertyRef) -> bool {
        self.resolve(property).is_some()
    }
}
