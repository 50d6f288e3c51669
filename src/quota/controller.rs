//! Quota-gated prompt actions and the current prompt state.

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::QuotaConfig;
use crate::prompt::{
    FragmentKind, GenerationResult, PromptFragments, PromptGenerator, PromptParser, PromptSource,
};

use super::store::QuotaStore;

/// Whether generation actions are currently allowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaState {
    /// Under the daily limit.
    Unblocked,
    /// Limit reached; a bonus or a new day unblocks.
    Blocked,
}

/// Quota figures returned with every action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct QuotaSnapshot {
    /// Actions used today.
    pub count: u32,
    /// Daily limit.
    pub limit: u32,
    /// Actions left today.
    pub remaining: u32,
    /// Derived state.
    pub state: QuotaState,
}

/// Result of a quota-gated action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// The action ran and was counted.
    Generated {
        /// Full sentence, when all fragments are set.
        prompt: Option<String>,
        /// Current fragments.
        fragments: PromptFragments,
        /// Origin of a full sentence; absent for fragment changes.
        #[serde(skip_serializing_if = "Option::is_none")]
        source: Option<PromptSource>,
        /// Quota after the action.
        quota: QuotaSnapshot,
    },
    /// The limit was reached; nothing ran and nothing was counted.
    Blocked {
        /// Current quota.
        quota: QuotaSnapshot,
    },
}

impl ActionOutcome {
    /// Quota attached to either outcome.
    #[must_use]
    pub const fn quota(&self) -> &QuotaSnapshot {
        match self {
            Self::Generated { quota, .. } | Self::Blocked { quota } => quota,
        }
    }

    /// True for [`ActionOutcome::Blocked`].
    #[must_use]
    pub const fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}

#[derive(Default)]
struct PromptSession {
    fragments: PromptFragments,
    image_url: Option<String>,
}

/// Runs check, generate and commit for every action.
///
/// One action runs at a time per controller. The prompt state is only locked
/// while it is read or merged, never across a remote call. Dropping an action
/// before it commits leaves the quota untouched.
pub struct QuotaController {
    config: QuotaConfig,
    quota: QuotaStore,
    generator: PromptGenerator,
    parser: PromptParser,
    action_lock: Mutex<()>,
    session: Mutex<PromptSession>,
}

impl QuotaController {
    /// Assemble a controller.
    ///
    /// # Errors
    /// Returns an error if the sentence parser cannot be compiled.
    pub fn new(
        config: QuotaConfig,
        quota: QuotaStore,
        generator: PromptGenerator,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            config,
            quota,
            generator,
            parser: PromptParser::new()?,
            action_lock: Mutex::new(()),
            session: Mutex::new(PromptSession::default()),
        })
    }

    /// Quota as persisted right now.
    pub async fn snapshot(&self) -> QuotaSnapshot {
        let count = self.quota.get().await.count;
        self.snapshot_for(count)
    }

    fn snapshot_for(&self, count: u32) -> QuotaSnapshot {
        let limit = self.config.daily_limit;
        let state = if self.config.enabled && count >= limit {
            QuotaState::Blocked
        } else {
            QuotaState::Unblocked
        };
        QuotaSnapshot {
            count,
            limit,
            remaining: limit.saturating_sub(count),
            state,
        }
    }

    async fn check(&self) -> Result<(), QuotaSnapshot> {
        if !self.config.enabled {
            return Ok(());
        }
        let snapshot = self.snapshot().await;
        match snapshot.state {
            QuotaState::Blocked => Err(snapshot),
            QuotaState::Unblocked => Ok(()),
        }
    }

    async fn commit(&self) -> QuotaSnapshot {
        if self.config.enabled {
            let count = self.quota.increment().await;
            self.snapshot_for(count)
        } else {
            self.snapshot().await
        }
    }

    /// Generate a new full prompt and split it into fragments.
    pub async fn generate_prompt(&self) -> ActionOutcome {
        self.run_action(None).await
    }

    /// Regenerate a single fragment, keeping the other two.
    pub async fn change_fragment(&self, kind: FragmentKind) -> ActionOutcome {
        self.run_action(Some(kind)).await
    }

    async fn run_action(&self, target: Option<FragmentKind>) -> ActionOutcome {
        let request_id = Uuid::new_v4();
        let _action = self.action_lock.lock().await;

        if let Err(quota) = self.check().await {
            info!(%request_id, count = quota.count, "Daily prompt limit reached");
            return ActionOutcome::Blocked { quota };
        }

        if target.is_none() {
            *self.session.lock().await = PromptSession::default();
        }

        let result = self.generator.generate(target).await;

        let (prompt, source, fragments) = {
            let mut session = self.session.lock().await;
            session.image_url = None;
            match result {
                GenerationResult::Sentence(generated) => {
                    session.fragments = self.parser.parse(&generated.sentence);
                    if session.fragments.is_empty() {
                        debug!(%request_id, sentence = %generated.sentence, "Generated prompt did not split into fragments");
                    }
                    (
                        Some(generated.sentence),
                        Some(generated.source),
                        session.fragments.clone(),
                    )
                }
                GenerationResult::Fragment { kind, text } => {
                    debug!(%request_id, fragment = %kind, text = %text, "Fragment regenerated");
                    session.fragments.set(kind, text);
                    let prompt = session
                        .fragments
                        .is_complete()
                        .then(|| session.fragments.compose());
                    (prompt, None, session.fragments.clone())
                }
            }
        };

        let quota = self.commit().await;
        info!(%request_id, source = ?source, count = quota.count, "Prompt action counted");

        ActionOutcome::Generated {
            prompt,
            fragments,
            source,
            quota,
        }
    }

    /// Regenerate the character.
    pub async fn change_character(&self) -> ActionOutcome {
        self.change_fragment(FragmentKind::Character).await
    }

    /// Regenerate the action.
    pub async fn change_action(&self) -> ActionOutcome {
        self.change_fragment(FragmentKind::Action).await
    }

    /// Regenerate the location.
    pub async fn change_location(&self) -> ActionOutcome {
        self.change_fragment(FragmentKind::Location).await
    }

    /// Render an image for an explicit prompt or, without one, for the
    /// current complete prompt. Not counted against the quota.
    pub async fn generate_image(&self, prompt: Option<&str>) -> Option<String> {
        let rendered_for = self.session.lock().await.fragments.clone();

        let prompt = match prompt.map(str::trim).filter(|p| !p.is_empty()) {
            Some(explicit) => explicit.to_string(),
            None if rendered_for.is_complete() => rendered_for.compose(),
            None => {
                debug!("No complete prompt to render");
                return None;
            }
        };

        let url = self.generator.generate_image(&prompt).await;

        let mut session = self.session.lock().await;
        if session.fragments == rendered_for {
            session.image_url.clone_from(&url);
        } else {
            debug!("Prompt changed while rendering, image not kept");
        }
        url
    }

    /// Simulate a rewarded ad, then give back the bonus amount.
    pub async fn watch_rewarded_ad(&self) -> QuotaSnapshot {
        tokio::time::sleep(self.config.ad_delay()).await;
        let count = self.quota.add_bonus(self.config.bonus_amount).await;
        self.snapshot_for(count)
    }

    /// Current fragments.
    pub async fn fragments(&self) -> PromptFragments {
        self.session.lock().await.fragments.clone()
    }

    /// Current full sentence, when all fragments are set.
    pub async fn current_prompt(&self) -> Option<String> {
        let session = self.session.lock().await;
        session
            .fragments
            .is_complete()
            .then(|| session.fragments.compose())
    }

    /// Last image rendered for the current prompt.
    pub async fn current_image(&self) -> Option<String> {
        self.session.lock().await.image_url.clone()
    }

    /// Forget the current prompt and image.
    pub async fn clear_prompt(&self) {
        *self.session.lock().await = PromptSession::default();
    }
}
