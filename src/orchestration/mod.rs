//! Effectful coordination around the pure pricing engine.
//!
//! This module provides:
//! - `PricingService`: settings/snapshot loading for the calculators
//! - `PriceApplier`: the gated Apply step
//! - `AutoPilot` and `Poller`: the scheduled jobs
//! - `JobLock` and `JobRunner`: exclusive job execution and triggers
//! - `BatchRunner` and `ManualPricing`: operator batches

pub mod apply;
pub mod autopilot;
pub mod batch;
pub mod job_lock;
pub mod jobs;
pub mod manual;
pub mod poller;
pub mod pricing;

pub use apply::{AppliedChange, ApplyError, GateFailure, PriceApplier};
pub use autopilot::{AutoPilot, AutoPilotSummary, ProductOutcome, SkipReason};
pub use batch::{BatchProgress, BatchReport, BatchRunner, ItemPanicked};
pub use job_lock::{JobLock, JobOutcome, AUTOPILOT_JOB, POLLING_JOB};
pub use jobs::{JobRunner, ScheduledJob, Trigger};
pub use manual::{BatchResponse, ManualError, ManualPricing, RepriceOutcome};
pub use poller::{PollSummary, Poller};
pub use pricing::{PricingError, PricingService, ProductSuggestion};
