//! Built-in attribute plan modifiers
//!
//! Plan modifiers run after the framework has applied defaults and marked
//! computed attributes unknown. They can:
//! - Modify the planned value
//! - Mark an attribute as requiring replacement

use crate::schema::{PlanModifier, PlanModifierRequest, PlanModifierResponse};
use crate::types::Dynamic;

/// Marks an attribute as requiring replacement when it changes
pub struct RequiresReplace;

impl RequiresReplace {
    pub fn create() -> Box<dyn PlanModifier> {
        Box::new(Self)
    }
}

impl PlanModifier for RequiresReplace {
    fn description(&self) -> String {
        "changing this value forces a new resource".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let state = &request.state_value.value;
        let plan = &request.plan_value.value;

        // Nothing to replace on create or destroy; an unknown plan counts as a change
        let requires_replace = !state.is_null() && !plan.is_null() && state != plan;

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics: vec![],
        }
    }
}

/// Uses the current state value when the planned value is unknown
///
/// Keeps server-assigned values such as ids and slugs stable across updates
/// instead of showing them as "(known after apply)".
pub struct UseStateForUnknown;

impl UseStateForUnknown {
    pub fn create() -> Box<dyn PlanModifier> {
        Box::new(Self)
    }
}

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "once set, the value of this attribute in state will not change".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let keep_state = request.plan_value.is_unknown()
            && !matches!(request.state_value.value, Dynamic::Null)
            && request.config_value.is_null();

        let plan_value = if keep_state {
            request.state_value
        } else {
            request.plan_value
        };

        PlanModifierResponse {
            plan_value,
            requires_replace: false,
            diagnostics: vec![],
        }
    }
}
