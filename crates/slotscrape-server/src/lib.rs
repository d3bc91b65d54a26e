//! HTTP ingress: chat webhooks, the job API, health and OpenAPI.

pub mod auth;
pub mod dto;
pub mod error;
pub mod intake;
pub mod limiter;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod webhooks;
