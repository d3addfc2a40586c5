use serde::{Deserialize, Serialize};
use std::fmt;
use crate::value::Record;

/// Outcome of a key-set or value check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    #[serde(rename = "match")]
    pub matched: bool,
    pub diff: Option<Record>,
}

impl CheckResult {
    pub fn matched() -> Self {
        Self { matched: true, diff: None }
    }

    pub fn drifted(diff: Record) -> Self {
        Self { matched: false, diff: Some(diff) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IacAction {
    Create,
    Alter,
    NoAction,
    Drop,
}

impl IacAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            IacAction::Create => "create",
            IacAction::Alter => "alter",
            IacAction::NoAction => "no-action",
            IacAction::Drop => "drop",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            IacAction::Create => "+",
            IacAction::Alter => "~",
            IacAction::NoAction => "=",
            IacAction::Drop => "-",
        }
    }

    pub fn is_change(&self) -> bool {
        !matches!(self, IacAction::NoAction)
    }
}

impl fmt::Display for IacAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision handed to the rendering/execution collaborator.
///
/// `definition` holds the full normalized definition for `create`, the
/// normalized observed state for `drop`, the narrowed diff for `alter`, and
/// nothing for `no-action`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub iac_action: IacAction,
    pub definition: Option<Record>,
}

impl Resolution {
    pub fn create(definition: Record) -> Self {
        Self { iac_action: IacAction::Create, definition: Some(definition) }
    }

    pub fn alter(diff: Record) -> Self {
        Self { iac_action: IacAction::Alter, definition: Some(diff) }
    }

    pub fn no_action() -> Self {
        Self { iac_action: IacAction::NoAction, definition: None }
    }

    pub fn drop(state: Record) -> Self {
        Self { iac_action: IacAction::Drop, definition: Some(state) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_action_wire_names() {
        assert_eq!(serde_json::to_string(&IacAction::NoAction).unwrap(), "\"no-action\"");
        assert_eq!(serde_json::to_string(&IacAction::Create).unwrap(), "\"create\"");
        assert_eq!(IacAction::Drop.to_string(), "drop");
    }

    #[test]
    fn test_resolution_serializes_for_downstream() {
        let diff = Record::from([("schema".to_string(), Value::from("NEW_SCHEMA"))]);
        let json = serde_json::to_value(Resolution::alter(diff)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"iac_action": "alter", "definition": {"schema": "NEW_SCHEMA"}})
        );

        let json = serde_json::to_value(Resolution::no_action()).unwrap();
        assert_eq!(json, serde_json::json!({"iac_action": "no-action", "definition": null}));
    }

    #[test]
    fn test_check_result_field_name() {
        let json = serde_json::to_value(CheckResult::matched()).unwrap();
        assert_eq!(json, serde_json::json!({"match": true, "diff": null}));
    }
}
