//! Identifier types for devices, counter groups, events and metrics
//!
//! All identifiers are opaque handles handed out by a counter backend. They are
//! only meaningful on the device (or context) that produced them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw hardware event identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub u32);

/// Derived metric identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MetricId(pub u32);

/// Counter group handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub u32);

/// Event domain identifier (the hardware unit a counter group samples)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DomainId(pub u32);

/// Device handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub u32);

/// Context handle created on a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(pub u32);

macro_rules! display_as_hex {
    ($($ty:ident => $prefix:literal),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, concat!($prefix, "#{:#x}"), self.0)
                }
            }
        )*
    };
}

display_as_hex! {
    EventId => "event",
    MetricId => "metric",
    GroupId => "group",
    DomainId => "domain",
    DeviceId => "device",
    ContextId => "context",
}

/// A requested raw event: the name asked for and its resolved identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSpec {
    pub name: String,
    pub id: EventId,
}

/// A requested metric: the name asked for and its resolved identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub name: String,
    pub id: MetricId,
}
