use std::fmt;

/// Optional per-carrier promotion text ("free shipping above ...").
pub trait PromotionRules: Send + Sync + fmt::Debug {
    fn message_for(&self, carrier_code: &str, quantity: f64, destination: &str) -> Option<String>;
}

/// Fixed message per carrier, shown once the quantity reaches a threshold.
#[derive(Debug, Clone, Default)]
pub struct ThresholdPromotions {
    rules: Vec<(String, f64, String)>,
}

impl ThresholdPromotions {
    pub fn with_rule(
        mut self,
        carrier_code: impl Into<String>,
        min_quantity: f64,
        message: impl Into<String>,
    ) -> Self {
        self.rules
            .push((carrier_code.into(), min_quantity, message.into()));
        self
    }
}

impl PromotionRules for ThresholdPromotions {
    fn message_for(&self, carrier_code: &str, quantity: f64, _destination: &str) -> Option<String> {
        self.rules
            .iter()
            .find(|(code, min_quantity, _)| code == carrier_code && quantity >= *min_quantity)
            .map(|(_, _, message)| message.clone())
    }
}
