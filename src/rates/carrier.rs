use crate::config::{CarrierSettings, FreightSettings};
use crate::pricing::{PricingInput, PricingStrategy};

/// A configured carrier with its pricing strategy built.
#[derive(Debug)]
pub struct Carrier {
    settings: CarrierSettings,
    strategy: Box<dyn PricingStrategy>,
}

impl Carrier {
    pub fn from_settings(settings: CarrierSettings) -> Self {
        let strategy = settings.pricing.build();
        Self { settings, strategy }
    }

    pub fn code(&self) -> &str {
        &self.settings.code
    }

    pub fn settings(&self) -> &CarrierSettings {
        &self.settings
    }

    pub fn is_active(&self) -> bool {
        self.settings.active
    }

    pub fn uses_distance(&self) -> bool {
        self.strategy.uses_distance()
    }

    /// Configured limit, else the strategy's own, else none.
    pub fn max_quantity(&self) -> Option<f64> {
        if self.settings.max_qty > 0.0 {
            Some(self.settings.max_qty)
        } else {
            self.strategy.default_max_quantity()
        }
    }

    pub fn accepts_quantity(&self, quantity: f64) -> bool {
        quantity > 0.0 && self.max_quantity().map_or(true, |max| quantity <= max)
    }

    /// Where this carrier's trips start.
    pub fn origin<'a>(&'a self, default_origin: &'a str) -> &'a str {
        match self.settings.specific_origin.as_deref() {
            Some(origin) if !origin.trim().is_empty() => origin,
            _ => default_origin,
        }
    }

    pub fn waypoints(&self) -> &[String] {
        &self.settings.waypoints
    }

    /// Broker settings when the broker is enabled for this carrier.
    pub fn broker(&self) -> Option<&FreightSettings> {
        self.settings.freight.as_ref().filter(|f| f.enabled)
    }

    /// Table price; `0.0` means the carrier does not apply.
    pub fn calculate_price(&self, distance_km: f64, quantity: f64) -> f64 {
        if !self.is_active() || !self.accepts_quantity(quantity) {
            return 0.0;
        }
        let price = self.strategy.price(PricingInput {
            distance_km,
            quantity,
        });
        if price.is_finite() && price > 0.0 {
            price
        } else {
            0.0
        }
    }
}
