//! Application state management
//!
//! Author: hephaex@gmail.com

use crate::auth::{AuthService, PasswordError, PasswordHasherService};
use medibridge_core::{AppConfig, Reconciler, Stores};
use std::time::{Duration, Instant};

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Storage ports
    pub stores: Stores,
    /// Signup, signin, and session resolution
    pub auth: AuthService,
    /// Partial-update reconciler, built from `config.reconcile`
    pub reconciler: Reconciler,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: AppConfig, stores: Stores) -> Result<Self, PasswordError> {
        let hasher = PasswordHasherService::new(&config.hashing)?;
        let auth = AuthService::new(
            stores.users.clone(),
            stores.sessions.clone(),
            hasher,
            config.session.clone(),
            config.server.store_timeout(),
        );
        Ok(Self {
            reconciler: Reconciler::new(config.reconcile.invalid_fields),
            config,
            stores,
            auth,
            start_time: Instant::now(),
        })
    }

    /// Deadline applied to every storage call
    pub fn store_timeout(&self) -> Duration {
        self.config.server.store_timeout()
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
