// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Metric regions: nested, named timing scopes.

use std::fmt::Debug;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A sink for nested timing regions.
///
/// Regions are strictly nested: every [`begin_region`](Self::begin_region) is
/// matched by an [`end_region`](Self::end_region) closing the most recently
/// opened region. Use `region` on a `&dyn MetricContext` to get a guard
/// that closes the region on drop.
pub trait MetricContext: Debug + Send + Sync {
    /// Opens a region.
    fn begin_region(&self, name: &'static str);

    /// Closes the most recently opened region.
    fn end_region(&self);
}

impl dyn MetricContext + '_ {
    /// Opens a region that is closed when the returned guard is dropped.
    pub fn region(&self, name: &'static str) -> MetricRegion<'_> {
        self.begin_region(name);
        MetricRegion { context: self }
    }
}

/// Closes its region on drop.
#[must_use = "the region ends as soon as the guard is dropped"]
pub struct MetricRegion<'a> {
    context: &'a dyn MetricContext,
}

impl Drop for MetricRegion<'_> {
    fn drop(&mut self) {
        self.context.end_region();
    }
}

/// A metric context that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricContext for NoopMetrics {
    #[inline]
    fn begin_region(&self, _name: &'static str) {}

    #[inline]
    fn end_region(&self) {}
}

/// A completed region recorded by [`RecordingMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionSample {
    /// The region name.
    pub name: &'static str,
    /// Nesting depth; top-level regions have depth 0.
    pub depth: usize,
    /// Wall-clock time spent inside the region.
    pub duration: Duration,
}

#[derive(Debug, Default)]
struct RecordingState {
    open: Vec<(&'static str, Instant)>,
    samples: Vec<RegionSample>,
}

/// A metric context that keeps every completed region in memory.
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    state: Mutex<RecordingState>,
}

impl RecordingMetrics {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the completed regions in completion order.
    pub fn samples(&self) -> Vec<RegionSample> {
        self.lock().samples.clone()
    }

    /// Returns and clears the completed regions.
    pub fn drain(&self) -> Vec<RegionSample> {
        std::mem::take(&mut self.lock().samples)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MetricContext for RecordingMetrics {
    fn begin_region(&self, name: &'static str) {
        self.lock().open.push((name, Instant::now()));
    }

    fn end_region(&self) {
        let mut state = self.lock();
        match state.open.pop() {
            Some((name, started)) => {
                let depth = state.open.len();
                state.samples.push(RegionSample {
                    name,
                    depth,
                    duration: started.elapsed(),
                });
            }
            None => log::warn!("Metric region closed without a matching open."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_nest_and_close_on_drop() {
        let metrics = RecordingMetrics::new();
        let context: &dyn MetricContext = &metrics;
        {
            let _frame = context.region("frame");
            {
                let _stage = context.region("geometry");
            }
        }
        let samples = metrics.samples();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].name, "geometry");
        assert_eq!(samples[0].depth, 1);
        assert_eq!(samples[1].name, "frame");
        assert_eq!(samples[1].depth, 0);
    }

    #[test]
    fn noop_metrics_accept_regions() {
        let context: &dyn MetricContext = &NoopMetrics;
        let _region = context.region("anything");
    }
}
