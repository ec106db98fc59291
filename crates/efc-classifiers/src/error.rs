use thiserror::Error;

/// Errors raised while fitting or applying an energy-based classifier.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EfcError {
    /// Bad shapes, unsupported targets, invalid parameters or out-of-domain values.
    #[error("validation error: {0}")]
    Validation(String),

    /// The correlation matrix of a class could not be inverted reliably.
    #[error("numerical error{}: {detail}", class_suffix(.class))]
    Numerical {
        class: Option<String>,
        detail: String,
    },

    #[error("classifier is not fitted yet; call `fit` before `predict`")]
    NotFitted,
}

impl EfcError {
    pub fn validation(msg: impl Into<String>) -> Self {
        EfcError::Validation(msg.into())
    }

    pub fn numerical(detail: impl Into<String>) -> Self {
        EfcError::Numerical {
            class: None,
            detail: detail.into(),
        }
    }

    /// Attach the label of the class whose model failed. Other variants pass through.
    pub fn for_class(self, label: impl ToString) -> Self {
        match self {
            EfcError::Numerical { detail, .. } => EfcError::Numerical {
                class: Some(label.to_string()),
                detail,
            },
            other => other,
        }
    }
}

fn class_suffix(class: &Option<String>) -> String {
    class
        .as_ref()
        .map(|c| format!(" for class {}", c))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, EfcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numerical_message_names_class() {
        let err = EfcError::numerical("zero pivot").for_class("dos");
        assert_eq!(err.to_string(), "numerical error for class dos: zero pivot");
    }

    #[test]
    fn for_class_leaves_validation_untouched() {
        let err = EfcError::validation("bad shape").for_class(3);
        assert_eq!(err, EfcError::Validation("bad shape".to_string()));
    }
}
