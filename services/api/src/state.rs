//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared,
//! clonable resources: the database, the two oracles, the auth verifier,
//! and the live session registry.

use crate::auth::AuthVerifier;
use crate::config::Config;
use crate::ws::registry::SessionRegistry;
use intervu_core::oracle::{EvaluationOracle, QuestionOracle};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers. All fields are public to be accessible from other modules.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<crate::db::Db>,
    pub question_oracle: Arc<dyn QuestionOracle>,
    pub evaluation_oracle: Arc<dyn EvaluationOracle>,
    pub auth: Arc<dyn AuthVerifier>,
    pub registry: Arc<SessionRegistry>,
    pub config: Arc<Config>,
}
