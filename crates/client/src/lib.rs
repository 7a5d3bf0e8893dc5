//! Client side of revcache.
//!
//! This crate provides the HTTP fetch pipeline with bounded retry and the
//! resource cache controller that sits between callers and the network.

pub mod controller;
pub mod fetch;

pub use controller::{
    ActivationReport, ControlMessage, ControllerConfig, ControllerEvent, ControllerStatus, EventOutcome,
    LifecycleState, PrecacheReport, ResourceController, ResponseSource, Served, dispatch,
};

pub use fetch::{Fetch, FetchConfig, HttpFetcher, Request, RetryPolicy};
