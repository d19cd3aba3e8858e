//! Per-run resolution of prompts and generative service bindings.

use std::sync::Arc;

use crate::ai::{GenerativeService, PromptProvider, ServiceBinding, ServiceFactory};
use crate::config::{ServiceSettings, Settings};
use crate::db::run_repo::{RunRow, ServiceOverride};
use crate::model::Stage;
use crate::secrets::{resolve_api_key, SecretError};

/// Prompt and service a stage runs with.
pub struct StageBinding {
    pub prompt: String,
    pub service: Arc<dyn GenerativeService>,
}

/// Everything a run needs from the outside world, resolved once when the
/// run starts and owned by that run alone.
pub struct RunServices {
    polish: StageBinding,
    emotion: StageBinding,
    enhance: StageBinding,
    pub compression: Arc<dyn GenerativeService>,
    pub prompts: Arc<dyn PromptProvider>,
}

impl RunServices {
    /// Run overrides win field by field over the global defaults. The
    /// compression service always uses the global defaults.
    pub fn resolve(
        run: &RunRow,
        settings: &Settings,
        prompts: Arc<dyn PromptProvider>,
        factory: &dyn ServiceFactory,
    ) -> Result<Self, SecretError> {
        let stage_binding = |stage: Stage,
                             run_override: &ServiceOverride,
                             defaults: &ServiceSettings|
         -> Result<StageBinding, SecretError> {
            Ok(StageBinding {
                prompt: prompts.stage_prompt(stage),
                service: factory.build(binding(Some(run_override), defaults)?),
            })
        };

        let o = &run.overrides;
        Ok(Self {
            polish: stage_binding(Stage::Polish, &o.polish, &settings.polish)?,
            emotion: stage_binding(
                Stage::EmotionPolish,
                &o.emotion,
                settings.emotion_service(),
            )?,
            enhance: stage_binding(Stage::Enhance, &o.enhance, &settings.enhance)?,
            compression: factory.build(binding(None, &settings.compression)?),
            prompts: Arc::clone(&prompts),
        })
    }

    pub fn stage(&self, stage: Stage) -> &StageBinding {
        match stage {
            Stage::Polish => &self.polish,
            Stage::EmotionPolish => &self.emotion,
            Stage::Enhance => &self.enhance,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn binding(
    run_override: Option<&ServiceOverride>,
    defaults: &ServiceSettings,
) -> Result<ServiceBinding, SecretError> {
    let model = run_override
        .and_then(|o| non_empty(&o.model))
        .unwrap_or(&defaults.model)
        .to_string();
    let base_url = run_override
        .and_then(|o| non_empty(&o.base_url))
        .or_else(|| non_empty(&defaults.base_url))
        .map(str::to_string);

    let api_key = match resolve_api_key(run_override.and_then(|o| non_empty(&o.api_key)), None)? {
        Some(key) => Some(key),
        None => resolve_api_key(defaults.api_key.as_deref(), defaults.api_key_env.as_deref())?,
    };

    Ok(ServiceBinding {
        model,
        base_url,
        api_key,
    })
}
