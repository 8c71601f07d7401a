//! Runtime type contracts.
//!
//! Declared argument and output types are only enforced when an execution
//! opts in through `ExecuteOptions::runtime_type_checks`.

use defs_core::error::ContractError;
use defs_core::types::{Arguments, TypeTag, Value};

/// Check supplied arguments against a declared signature.
///
/// The supplied keys are the keys of `supplied` when it is an object; any
/// other value supplies no keys. An absent declaration declares no keys.
///
/// # Returns
///
/// * `Ok(())` - If the arguments match.
/// * `Err(ContractError::ArityMismatch)` - If the key counts differ.
/// * `Err(ContractError::UnexpectedArgument)` - If a supplied key is not declared.
/// * `Err(ContractError::TypeMismatch)` - If a value has the wrong type.
pub fn check_arguments(
    declared: Option<&Arguments>,
    supplied: &Value,
) -> Result<(), ContractError> {
    let expected = declared.map_or(0, |declared| declared.len());
    let Some(supplied) = supplied.as_object() else {
        return match expected {
            0 => Ok(()),
            _ => Err(ContractError::ArityMismatch {
                expected,
                actual: 0,
            }),
        };
    };

    if supplied.len() != expected {
        return Err(ContractError::ArityMismatch {
            expected,
            actual: supplied.len(),
        });
    }

    for (key, value) in supplied {
        let Some(tag) = declared.and_then(|declared| declared.get(key)) else {
            return Err(ContractError::UnexpectedArgument(key.clone()));
        };
        if value.type_tag() != *tag {
            return Err(ContractError::TypeMismatch {
                key: Some(key.clone()),
                expected: *tag,
                actual: value.type_tag(),
            });
        }
    }

    Ok(())
}

/// Check a returned value against the declared output type.
pub fn check_output(declared: TypeTag, value: &Value) -> Result<(), ContractError> {
    let actual = value.type_tag();
    if actual == declared {
        Ok(())
    } else {
        Err(ContractError::TypeMismatch {
            key: None,
            expected: declared,
            actual,
        })
    }
}
