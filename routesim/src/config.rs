// RouteSim: Discrete-event routing protocol simulator written in Rust
// Copyright (C) 2024 The RouteSim Authors
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Parameters of a single simulation run.

use serde::{Deserialize, Serialize};

use crate::{
    packet::DEFAULT_TTL,
    topology::Topology,
    types::{ConfigError, SimTime},
};

/// Parameters of a simulation run. Every field has a default, such that a scenario file only needs
/// to specify the parameters that differ.
///
/// ```
/// use routesim::config::SimConfig;
///
/// let config: SimConfig = serde_json::from_str(r#"{"heartbeat": 5}"#).unwrap();
/// assert_eq!(config.heartbeat, 5.0);
/// assert_eq!(config.quiescence_window, 50.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Interval between two periodic timers of a node.
    pub heartbeat: SimTime,
    /// The network is considered quiescent once no forwarding table changed for this long.
    pub quiescence_window: SimTime,
    /// Initial TTL of data packets.
    pub ttl: u8,
    /// Probability that a packet on a live link is lost.
    pub loss: f64,
    /// Seed of the random number generator used for packet loss.
    pub seed: u64,
    /// Maximum number of packets a node may send in a single invocation.
    pub max_outbound_per_call: usize,
    /// Maximum number of events processed before the run is aborted.
    pub max_events: usize,
    /// Maximum simulated time before the run is aborted.
    pub max_time: SimTime,
    /// Whether to send data packets between all pairs of nodes once the simulation has finished.
    pub probes: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            heartbeat: 10.0,
            quiescence_window: 50.0,
            ttl: DEFAULT_TTL,
            loss: 0.0,
            seed: 0,
            max_outbound_per_call: 10_000,
            max_events: 1_000_000,
            max_time: 100_000.0,
            probes: true,
        }
    }
}

impl SimConfig {
    /// Check that all parameters are in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.heartbeat.is_finite() && self.heartbeat > 0.0) {
            return Err(ConfigError::InvalidParameter(
                "heartbeat",
                self.heartbeat.to_string(),
            ));
        }
        if !(self.quiescence_window.is_finite() && self.quiescence_window > 0.0) {
            return Err(ConfigError::InvalidParameter(
                "quiescence_window",
                self.quiescence_window.to_string(),
            ));
        }
        if self.ttl == 0 {
            return Err(ConfigError::InvalidParameter("ttl", self.ttl.to_string()));
        }
        if !(0.0..1.0).contains(&self.loss) {
            return Err(ConfigError::InvalidParameter("loss", self.loss.to_string()));
        }
        if self.max_outbound_per_call == 0 {
            return Err(ConfigError::InvalidParameter(
                "max_outbound_per_call",
                self.max_outbound_per_call.to_string(),
            ));
        }
        if self.max_time.is_nan() || self.max_time <= 0.0 {
            return Err(ConfigError::InvalidParameter(
                "max_time",
                self.max_time.to_string(),
            ));
        }
        Ok(())
    }

    /// Check all parameters, and that the quiescence window is long enough for `topo`. A table
    /// change may only be advertised at the next timer, and the advertisement then travels over
    /// the slowest link. The window must be longer than both together, otherwise the network is
    /// declared quiescent while routing updates are still in flight.
    pub fn validate_for(&self, topo: &Topology) -> Result<(), ConfigError> {
        self.validate()?;
        let max_delay = topo
            .links()
            .iter()
            .map(|(_, l)| l.delay)
            .fold(0.0, SimTime::max);
        let bound = max_delay + self.heartbeat;
        if self.quiescence_window <= bound {
            return Err(ConfigError::InvalidParameter(
                "quiescence_window",
                format!(
                    "{} must be larger than the largest link delay plus the heartbeat ({})",
                    self.quiescence_window, bound
                ),
            ));
        }
        Ok(())
    }
}
