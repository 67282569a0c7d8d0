//! Network hyperparameters.

use crate::{Error, Result, Scalar};

/// Shape and step size of a [`crate::Network`].
///
/// With the `serde` feature this can be loaded from JSON (or any serde format).
/// It describes a network, never its trained weights.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct NetworkConfig {
    /// Columns of every input matrix.
    pub input_width: usize,
    /// Rows (samples) of every input matrix.
    pub batch_width: usize,
    /// Default rate for optimizers created by [`crate::NetworkBuilder`].
    pub learning_rate: Scalar,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            input_width: 1,
            batch_width: 1,
            learning_rate: 1e-2,
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.input_width == 0 {
            return Err(Error::InvalidConfig("input_width must be > 0".to_owned()));
        }
        if self.batch_width == 0 {
            return Err(Error::InvalidConfig("batch_width must be > 0".to_owned()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "learning rate must be finite and > 0, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(NetworkConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_widths_and_bad_rates() {
        let base = NetworkConfig::default();
        for cfg in [
            NetworkConfig {
                input_width: 0,
                ..base
            },
            NetworkConfig {
                batch_width: 0,
                ..base
            },
            NetworkConfig {
                learning_rate: -0.1,
                ..base
            },
            NetworkConfig {
                learning_rate: f64::INFINITY,
                ..base
            },
        ] {
            assert!(cfg.validate().is_err(), "{cfg:?}");
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_fills_missing_fields_from_default() {
        let cfg: NetworkConfig = serde_json::from_str(r#"{"input_width": 784}"#).unwrap();
        assert_eq!(cfg.input_width, 784);
        assert_eq!(cfg.batch_width, 1);
        assert!(serde_json::from_str::<NetworkConfig>(r#"{"alpha": 1.0}"#).is_err());
    }
}
