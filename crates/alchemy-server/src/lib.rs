//! HTTP API (Transport B) and RPC tool interface (Transport A) over the
//! prompt alchemy engine in [`alchemy_core`].
//!
//! Neither transport holds engine logic itself; [`gateway::ops`] is the one
//! place both go through, so a client driving the HTTP API and a client
//! driving the tool interface see identical behavior.

pub mod gateway;
