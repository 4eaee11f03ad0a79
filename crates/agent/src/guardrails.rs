use std::collections::BTreeMap;

use orderbot_core::backend::BackendError;
use serde_json::{Map, Value};

use crate::tools::{ParameterType, ToolContract, ORDER_ID_PARAMETER};

/// Parameters that passed contract validation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolArguments {
    values: BTreeMap<&'static str, String>,
    ignored: Vec<String>,
}

impl ToolArguments {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn order_id(&self) -> Option<&str> {
        self.get(ORDER_ID_PARAMETER)
    }

    /// Keys the model supplied that the contract does not declare.
    pub fn ignored(&self) -> &[String] {
        &self.ignored
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GuardrailPolicy {
    pub reject_unknown_parameters: bool,
}

impl GuardrailPolicy {
    pub fn strict() -> Self {
        Self { reject_unknown_parameters: true }
    }

    /// Checks model-supplied parameters against the tool contract before anything runs.
    pub fn evaluate(
        &self,
        contract: &ToolContract,
        parameters: &Map<String, Value>,
    ) -> Result<ToolArguments, BackendError> {
        let mut arguments = ToolArguments::default();

        for spec in contract.parameters {
            let value = parameters.get(spec.name).filter(|value| !value.is_null());
            let Some(value) = value else {
                return Err(BackendError::MissingParameter {
                    operation: contract.name().to_string(),
                    parameter: spec.name.to_string(),
                });
            };

            let typed = match spec.kind {
                ParameterType::String => value.as_str(),
            };
            let Some(text) = typed else {
                return Err(BackendError::InvalidParameter {
                    operation: contract.name().to_string(),
                    parameter: spec.name.to_string(),
                    expected: spec.kind.as_str(),
                });
            };

            let text = text.trim();
            if text.is_empty() {
                return Err(BackendError::MissingParameter {
                    operation: contract.name().to_string(),
                    parameter: spec.name.to_string(),
                });
            }
            arguments.values.insert(spec.name, text.to_string());
        }

        let mut unknown =
            parameters.keys().filter(|key| !contract.accepts(key)).cloned().collect::<Vec<_>>();
        unknown.sort();

        if self.reject_unknown_parameters {
            if let Some(parameter) = unknown.into_iter().next() {
                return Err(BackendError::UnexpectedParameter {
                    operation: contract.name().to_string(),
                    parameter,
                });
            }
        } else {
            arguments.ignored = unknown;
        }

        Ok(arguments)
    }
}
