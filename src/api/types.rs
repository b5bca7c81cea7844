//! Shared types for the API layer.

use std::sync::Arc;

use crate::authorization::Principal;
use crate::chatbot::ChatbotClient;
use crate::core_state::CoreState;
use crate::models::User;

/// Shared context for all routes and middleware: the core state plus
/// the chat-completions backend (swapped for a mock in tests).
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub chatbot: Arc<dyn ChatbotClient>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>, chatbot: Arc<dyn ChatbotClient>) -> Self {
        Self { core, chatbot }
    }
}

/// Authenticated user snapshot, injected into request extensions by the
/// auth middleware after token validation.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
}

impl AuthContext {
    /// The caller reduced to what the policy module needs.
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.user.id,
            role: self.user.role,
        }
    }
}
