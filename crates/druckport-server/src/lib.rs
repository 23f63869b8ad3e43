// SPDX-License-Identifier: MIT
// Druckport Server — the axum HTTP surface over the spool pipeline, plus
// Prometheus metrics recording and shared request state.

pub mod metrics;
pub mod routes;
pub mod state;

pub use state::AppState;
