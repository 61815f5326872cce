mod key;
mod metrics;
mod query;
mod registry;
mod tags;

pub use key::KeyId;
pub use metrics::{HistogramSummary, MetricHandle, MetricKind, MetricSeriesSummary, MetricValue};
pub use query::Query;
pub use registry::{MetricId, Registry};
pub use tags::TagSet;
