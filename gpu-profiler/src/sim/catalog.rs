//! Counter catalog of the simulated device

use passcount_shared::{DomainId, EventId, MetricId, MetricValue, MetricValueKind};

/// A hardware unit replicated across the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimDomain {
    pub id: DomainId,
    pub name: String,
    /// Instances present on the device
    pub total_instances: u32,
    /// Instances a counter group can sample
    pub sampled_instances: u32,
}

/// A raw event and what one kernel adds to it on each sampled instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimEvent {
    pub id: EventId,
    pub name: String,
    pub domain: DomainId,
    pub per_kernel: Vec<u64>,
}

/// Metric formula over raw event names
#[derive(Debug, Clone, PartialEq)]
pub enum Formula {
    /// Sum of events, `Uint64`
    Sum(Vec<String>),
    /// `sum(numerator) / sum(denominator)`, `Double`
    Ratio {
        numerator: Vec<String>,
        denominator: Vec<String>,
    },
    /// `100 * sum(part) / sum(whole)`, `Percent`
    Percent { part: Vec<String>, whole: Vec<String> },
    /// `minuend - subtrahend`, `Int64`
    Difference { minuend: String, subtrahend: String },
    /// `sum(events) * bytes_per_count`, `Throughput`
    Throughput {
        events: Vec<String>,
        bytes_per_count: u64,
    },
    /// `10 * busy / total` capped at 10, `UtilizationLevel`
    Utilization { busy: String, total: String },
}

impl Formula {
    pub fn kind(&self) -> MetricValueKind {
        match self {
            Self::Sum(_) => MetricValueKind::Uint64,
            Self::Ratio { .. } => MetricValueKind::Double,
            Self::Percent { .. } => MetricValueKind::Percent,
            Self::Difference { .. } => MetricValueKind::Int64,
            Self::Throughput { .. } => MetricValueKind::Throughput,
            Self::Utilization { .. } => MetricValueKind::UtilizationLevel,
        }
    }

    /// Raw events the formula reads.
    pub fn event_names(&self) -> Vec<&str> {
        let names: Vec<&String> = match self {
            Self::Sum(events) | Self::Throughput { events, .. } => events.iter().collect(),
            Self::Ratio {
                numerator,
                denominator,
            } => numerator.iter().chain(denominator).collect(),
            Self::Percent { part, whole } => part.iter().chain(whole).collect(),
            Self::Difference {
                minuend,
                subtrahend,
            } => vec![minuend, subtrahend],
            Self::Utilization { busy, total } => vec![busy, total],
        };
        names.into_iter().map(String::as_str).collect()
    }

    /// Evaluate with `value` resolving event names, `None` if one is missing.
    pub fn evaluate(&self, value: impl Fn(&str) -> Option<u64>) -> Option<MetricValue> {
        let sum = |names: &[String]| -> Option<u64> {
            names
                .iter()
                .try_fold(0u64, |acc, name| Some(acc.saturating_add(value(name.as_str())?)))
        };
        let ratio = |num: u64, den: u64| {
            if den == 0 {
                0.0
            } else {
                num as f64 / den as f64
            }
        };

        let result = match self {
            Self::Sum(events) => MetricValue::Uint64(sum(events)?),
            Self::Ratio {
                numerator,
                denominator,
            } => MetricValue::Double(ratio(sum(numerator)?, sum(denominator)?)),
            Self::Percent { part, whole } => {
                MetricValue::Percent(100.0 * ratio(sum(part)?, sum(whole)?))
            }
            Self::Difference {
                minuend,
                subtrahend,
            } => {
                let a = i128::from(value(minuend.as_str())?);
                let b = i128::from(value(subtrahend.as_str())?);
                let diff = (a - b).clamp(i128::from(i64::MIN), i128::from(i64::MAX));
                MetricValue::Int64(diff as i64)
            }
            Self::Throughput {
                events,
                bytes_per_count,
            } => MetricValue::Throughput(sum(events)?.saturating_mul(*bytes_per_count)),
            Self::Utilization { busy, total } => {
                let level = (10.0 * ratio(value(busy.as_str())?, value(total.as_str())?)).min(10.0);
                MetricValue::UtilizationLevel(level as u32)
            }
        };
        Some(result)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimMetric {
    pub id: MetricId,
    pub name: String,
    pub formula: Formula,
}

/// Events, domains and metrics exposed by a simulated device
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    pub domains: Vec<SimDomain>,
    pub events: Vec<SimEvent>,
    pub metrics: Vec<SimMetric>,
    /// Capacity of one counter group
    pub events_per_group: usize,
}

impl Catalog {
    pub fn new(events_per_group: usize) -> Self {
        Self {
            domains: Vec::new(),
            events: Vec::new(),
            metrics: Vec::new(),
            events_per_group: events_per_group.max(1),
        }
    }

    /// Add a domain. `sampled_instances` is clamped to `total_instances`.
    pub fn domain(mut self, name: &str, total_instances: u32, sampled_instances: u32) -> Self {
        let id = DomainId(self.domains.len() as u32);
        self.domains.push(SimDomain {
            id,
            name: name.to_string(),
            total_instances,
            sampled_instances: sampled_instances.min(total_instances),
        });
        self
    }

    /// Add an event to a previously added domain.
    ///
    /// `per_kernel` is resized to the domain's sampled instance count, padding
    /// with the last value. Events naming an unknown domain are ignored.
    pub fn event(mut self, name: &str, domain: &str, per_kernel: &[u64]) -> Self {
        let Some(domain) = self.domain_named(domain).cloned() else {
            return self;
        };

        let mut per_kernel = per_kernel.to_vec();
        let last = per_kernel.last().copied().unwrap_or(0);
        per_kernel.resize(domain.sampled_instances as usize, last);

        let id = EventId(0x100 + self.events.len() as u32);
        self.events.push(SimEvent {
            id,
            name: name.to_string(),
            domain: domain.id,
            per_kernel,
        });
        self
    }

    pub fn metric(mut self, name: &str, formula: Formula) -> Self {
        let id = MetricId(0x200 + self.metrics.len() as u32);
        self.metrics.push(SimMetric {
            id,
            name: name.to_string(),
            formula,
        });
        self
    }

    pub fn domain_named(&self, name: &str) -> Option<&SimDomain> {
        self.domains.iter().find(|d| d.name == name)
    }

    pub fn domain_by_id(&self, id: DomainId) -> Option<&SimDomain> {
        self.domains.iter().find(|d| d.id == id)
    }

    pub fn event_named(&self, name: &str) -> Option<&SimEvent> {
        self.events.iter().find(|e| e.name == name)
    }

    pub fn event_by_id(&self, id: EventId) -> Option<&SimEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn metric_named(&self, name: &str) -> Option<&SimMetric> {
        self.metrics.iter().find(|m| m.name == name)
    }

    pub fn metric_by_id(&self, id: MetricId) -> Option<&SimMetric> {
        self.metrics.iter().find(|m| m.id == id)
    }

    /// A small device with streaming multiprocessor, L2 and framebuffer
    /// counters. Two events fit in a counter group.
    pub fn reference() -> Self {
        fn names(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        }

        Self::new(2)
            .domain("sm", 4, 2)
            .domain("l2", 4, 4)
            .domain("fb", 1, 1)
            .event("inst_executed", "sm", &[1000, 1200])
            .event("inst_issued", "sm", &[1100, 1300])
            .event("active_cycles", "sm", &[5000, 5200])
            .event("elapsed_cycles_sm", "sm", &[8000, 8000])
            .event("warps_launched", "sm", &[64, 64])
            .event("l2_read_hit", "l2", &[300, 340, 310, 330])
            .event("l2_read_miss", "l2", &[20, 40, 30, 10])
            .event("fb_read_sectors", "fb", &[900])
            .event("fb_write_sectors", "fb", &[450])
            .metric(
                "ipc",
                Formula::Ratio {
                    numerator: names(&["inst_executed"]),
                    denominator: names(&["active_cycles"]),
                },
            )
            .metric(
                "inst_replay",
                Formula::Difference {
                    minuend: "inst_issued".to_string(),
                    subtrahend: "inst_executed".to_string(),
                },
            )
            .metric(
                "sm_efficiency",
                Formula::Percent {
                    part: names(&["active_cycles"]),
                    whole: names(&["elapsed_cycles_sm"]),
                },
            )
            .metric(
                "l2_hit_rate",
                Formula::Percent {
                    part: names(&["l2_read_hit"]),
                    whole: names(&["l2_read_hit", "l2_read_miss"]),
                },
            )
            .metric(
                "dram_read_throughput",
                Formula::Throughput {
                    events: names(&["fb_read_sectors"]),
                    bytes_per_count: 32,
                },
            )
            .metric(
                "dram_write_transactions",
                Formula::Sum(names(&["fb_write_sectors"])),
            )
            .metric(
                "sm_utilization",
                Formula::Utilization {
                    busy: "active_cycles".to_string(),
                    total: "elapsed_cycles_sm".to_string(),
                },
            )
    }
}
