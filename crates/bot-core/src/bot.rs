use std::sync::Arc;

use crate::action::classify::MessageClassifier;
use crate::config::BotConfig;
use crate::movement::detour::{DetourSearch, StraightLineDetour};
use crate::session::Session;
use crate::world::WorldSnapshot;

/// Porcelain handle for one session.
///
/// Stateless across calls apart from the injected session and immutable tuning; cloning is
/// cheap. Methods are spread over the `wait`, `movement`, `action` and `transaction` modules.
#[derive(Clone)]
pub struct Bot {
    pub(crate) session: Session,
    pub(crate) config: Arc<BotConfig>,
    pub(crate) classifier: Arc<MessageClassifier>,
    pub(crate) detour: Arc<dyn DetourSearch>,
}

impl Bot {
    pub fn new(session: Session, config: BotConfig) -> Self {
        let classifier = MessageClassifier::new(config.classifier.rules.clone());
        let detour = StraightLineDetour::from_config(&config.movement);
        Self {
            session,
            config: Arc::new(config),
            classifier: Arc::new(classifier),
            detour: Arc::new(detour),
        }
    }

    /// Replaces the long-range detour heuristic.
    pub fn with_detour(mut self, detour: Arc<dyn DetourSearch>) -> Self {
        self.detour = detour;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn snapshot(&self) -> Option<Arc<WorldSnapshot>> {
        self.session.snapshot()
    }
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
