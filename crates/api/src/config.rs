use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::booking::BookingRules;
use crate::stores::RateLimitPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Redis URL for the shared rate-limit store. Falls back to an in-process
    /// store when unset (single instance deployments).
    #[serde(default)]
    pub redis_url: Option<String>,
    /// SMTP URL for development email (e.g., smtp://localhost:1025)
    #[serde(default)]
    pub smtp_url: Option<String>,
    /// Resend API key for production email
    #[serde(default)]
    pub resend_api_key: Option<String>,
    /// Sender address for outgoing booking emails.
    #[serde(default = "default_mail_from")]
    pub mail_from: String,
    /// Receives a copy of every new booking.
    pub admin_email: String,
    /// Bearer token accepted on /api/admin routes.
    pub admin_api_key: String,
    /// Set to "production" for JSON logging, anything else for human-readable.
    #[serde(default)]
    pub env: String,
    /// Sentry DSN for error tracking
    #[serde(default)]
    pub sentry_dsn: Option<String>,
    /// Comma separated list of allowed CORS origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Take the client IP from the first X-Forwarded-For entry.
    #[serde(default = "default_true")]
    pub trust_forwarded_for: bool,
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
    #[serde(default = "default_rate_limit_max_requests")]
    pub rate_limit_max_requests: u64,
    #[serde(default = "default_min_rental_days")]
    pub min_rental_days: i64,
    #[serde(default = "default_max_rental_days")]
    pub max_rental_days: i64,
    /// Latest start date, in days from today.
    #[serde(default = "default_max_advance_days")]
    pub max_advance_days: i64,
}

impl Config {
    pub fn is_production(&self) -> bool {
        self.env == "production"
    }

    pub fn booking_rules(&self) -> BookingRules {
        BookingRules {
            min_rental_days: self.min_rental_days,
            max_rental_days: self.max_rental_days,
            max_advance_days: self.max_advance_days,
        }
    }

    pub fn rate_limit_policy(&self) -> Result<RateLimitPolicy> {
        anyhow::ensure!(
            self.rate_limit_window_secs > 0,
            "SOFCAR_RATE_LIMIT_WINDOW_SECS must be greater than zero"
        );

        Ok(RateLimitPolicy {
            max_requests: self.rate_limit_max_requests,
            window: Duration::from_secs(self.rate_limit_window_secs),
        })
    }
}

fn default_mail_from() -> String {
    "SofCar <noreply@sof-car.eu>".to_string()
}

fn default_true() -> bool {
    true
}

fn default_rate_limit_window_secs() -> u64 {
    60 * 60
}

fn default_rate_limit_max_requests() -> u64 {
    100
}

fn default_min_rental_days() -> i64 {
    5
}

fn default_max_rental_days() -> i64 {
    30
}

fn default_max_advance_days() -> i64 {
    90
}
