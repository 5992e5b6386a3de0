pub mod allowance;
pub mod auth;
pub mod config;
pub mod contracts;
pub mod controller;
pub mod eligibility;
pub mod error;
pub mod flows;
pub mod gateway;
pub mod grant;
pub mod json_rpc;
pub mod policy;
pub mod session;
