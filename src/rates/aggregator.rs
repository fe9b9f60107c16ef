use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::carrier::Carrier;
use super::filter::filter_exclusive;
use super::promotion::{PromotionRules, ThresholdPromotions};
use super::tax::{breakdown_from_table, display_price, format_price};
use crate::api::broker::BrokerClient;
use crate::api::http_client::HttpClient;
use crate::config::constant::MIN_DESTINATION_LEN;
use crate::config::{ExclusivePair, FreightSettings, Settings, TaxSettings};
use crate::distance::{create_provider, DistanceProvider, DistanceResolver};
use crate::domain::{Address, PriceBreakdown, ShippingRate};
use crate::error::{ConfigError, Endpoint, FreightError};
use crate::freight::request::locate;
use crate::freight::{BrokerThrottle, FreightContext, FreightQuoteResolver};

/// The addresses and quantity of one quote request.
#[derive(Debug, Clone, Copy)]
struct Shipment<'a> {
    origin: &'a str,
    destination: &'a str,
    quantity: f64,
    /// Whether the destination is long enough to route.
    routable: bool,
    default_distance: f64,
}

/// Prices every configured carrier for a shipment.
#[derive(Debug)]
pub struct RateAggregator {
    carriers: Vec<Carrier>,
    provider: Arc<dyn DistanceProvider>,
    freight: Option<FreightQuoteResolver>,
    promotions: Option<Arc<dyn PromotionRules>>,
    tax: TaxSettings,
    store_currency: String,
    exclusive_pair: ExclusivePair,
}

impl RateAggregator {
    pub fn new(settings: &Settings, provider: Arc<dyn DistanceProvider>) -> Self {
        let carriers = settings
            .carriers
            .iter()
            .cloned()
            .map(Carrier::from_settings)
            .collect();

        Self {
            carriers,
            provider,
            freight: None,
            promotions: None,
            tax: settings.tax.clone(),
            store_currency: settings.general.store_currency.clone(),
            exclusive_pair: settings.exclusive_pair.clone(),
        }
    }

    /// Wire provider, broker and promotions from configuration.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let timeout = Duration::from_secs(settings.general.http_timeout_secs);
        let provider = create_provider(&settings.distance, timeout)?;
        let mut aggregator = Self::new(settings, provider);

        if aggregator.carriers.iter().any(|c| c.broker().is_some()) {
            let http = HttpClient::new(timeout).map_err(|e| ConfigError::HttpClient(e.to_string()))?;
            let client = BrokerClient::new(
                http,
                settings.broker.prediction_url.clone(),
                settings.broker.access_token.clone(),
                settings.broker.api_key.clone(),
            );
            let resolver = FreightQuoteResolver::new(
                client,
                settings.broker.clone(),
                settings.general.store_currency.clone(),
                Arc::new(settings.currency.clone()),
                Arc::new(settings.unit_weights.clone()),
            )
            .with_throttle(BrokerThrottle::shared_with(Duration::from_millis(
                settings.broker.min_interval_ms,
            )));
            aggregator = aggregator.with_freight(resolver);
        }

        if !settings.promotions.is_empty() {
            let rules = settings
                .promotions
                .iter()
                .fold(ThresholdPromotions::default(), |rules, p| {
                    rules.with_rule(p.carrier.clone(), p.min_quantity, p.message.clone())
                });
            aggregator = aggregator.with_promotions(Arc::new(rules));
        }

        Ok(aggregator)
    }

    pub fn with_freight(mut self, resolver: FreightQuoteResolver) -> Self {
        self.freight = Some(resolver);
        self
    }

    pub fn with_promotions(mut self, rules: Arc<dyn PromotionRules>) -> Self {
        self.promotions = Some(rules);
        self
    }

    pub fn carriers(&self) -> &[Carrier] {
        &self.carriers
    }

    /// Rates for every applicable carrier, with the exclusive pair filtered.
    ///
    /// No quantity yields no rates. A destination too short to route only
    /// rules out the carriers that need a distance.
    #[instrument(skip(self), fields(provider = self.provider.name()))]
    pub async fn compute_shipping_costs(
        &self,
        origin: &str,
        destination: &str,
        quantity: f64,
    ) -> Vec<ShippingRate> {
        if !(quantity > 0.0) {
            debug!("Nothing to ship");
            return Vec::new();
        }
        let routable = destination.trim().chars().count() >= MIN_DESTINATION_LEN;
        if !routable {
            debug!("Destination too short to route");
        }

        let mut resolver = DistanceResolver::new(self.provider.clone());
        let default_distance = if routable
            && self.carriers.iter().any(|c| c.is_active() && needs_distance(c))
        {
            resolver.get_distance(origin, destination).await
        } else {
            0.0
        };

        let shipment = Shipment {
            origin,
            destination,
            quantity,
            routable,
            default_distance,
        };

        let mut rates = Vec::new();
        for carrier in &self.carriers {
            if let Some(rate) = self.rate_for(carrier, shipment, &mut resolver).await {
                rates.push(rate);
            }
        }

        let rates = filter_exclusive(rates, &self.exclusive_pair);
        info!("{} shipping rates for {} m2", rates.len(), quantity);
        rates
    }

    async fn carrier_distance(
        &self,
        carrier: &Carrier,
        shipment: Shipment<'_>,
        resolver: &mut DistanceResolver,
    ) -> f64 {
        let origin = carrier.origin(shipment.origin);

        if !carrier.waypoints().is_empty() {
            let mut points = Vec::with_capacity(carrier.waypoints().len() + 2);
            points.push(origin.to_string());
            points.extend(carrier.waypoints().iter().cloned());
            points.push(shipment.destination.to_string());
            return resolver.get_distance_for_waypoints(&points).await;
        }

        if origin != shipment.origin {
            return resolver.get_distance(origin, shipment.destination).await;
        }
        shipment.default_distance
    }

    #[instrument(level = "debug", skip_all, fields(carrier = carrier.code()))]
    async fn rate_for(
        &self,
        carrier: &Carrier,
        shipment: Shipment<'_>,
        resolver: &mut DistanceResolver,
    ) -> Option<ShippingRate> {
        if !carrier.is_active() {
            return None;
        }
        if !carrier.accepts_quantity(shipment.quantity) {
            debug!("Quantity outside carrier limits");
            return None;
        }

        let distance = if needs_distance(carrier) {
            if !shipment.routable {
                debug!("Destination too short, skipping carrier");
                return None;
            }
            let km = self.carrier_distance(carrier, shipment, resolver).await;
            if km <= 0.0 {
                warn!("Could not calculate distance, skipping carrier");
                return None;
            }
            Some(km)
        } else {
            None
        };

        let broker_price = match (carrier.broker(), self.freight.as_ref(), distance) {
            (Some(freight), Some(freight_resolver), Some(distance_km)) => {
                self.broker_price(freight_resolver, carrier, freight, shipment, distance_km, resolver)
                    .await
            }
            _ => None,
        };

        let breakdown = match broker_price {
            Some(breakdown) => breakdown,
            None => {
                let price = carrier.calculate_price(distance.unwrap_or(0.0), shipment.quantity);
                if price <= 0.0 {
                    debug!("Carrier has no price for this shipment");
                    return None;
                }
                breakdown_from_table(
                    price,
                    self.tax.shipping_tax_rate,
                    self.tax.shipping_includes_tax,
                )
            }
        };

        let settings = carrier.settings();
        let promotion = self
            .promotions
            .as_ref()
            .and_then(|rules| rules.message_for(carrier.code(), shipment.quantity, shipment.destination));

        debug!(
            source = breakdown.source.as_str(),
            "Priced at {:.2}",
            breakdown.gross_price
        );

        Some(ShippingRate {
            carrier_code: settings.code.clone(),
            carrier_title: settings.title.clone(),
            method_title: settings.name.clone(),
            description: settings.description.clone(),
            price: display_price(&breakdown, self.tax.shipping_includes_tax),
            distance_km: distance,
            formatted_price_net: format_price(breakdown.net_price, &self.store_currency),
            formatted_price_gross: format_price(breakdown.gross_price, &self.store_currency),
            breakdown,
            promotion,
        })
    }

    async fn broker_price(
        &self,
        freight_resolver: &FreightQuoteResolver,
        carrier: &Carrier,
        freight: &FreightSettings,
        shipment: Shipment<'_>,
        distance_km: f64,
        resolver: &mut DistanceResolver,
    ) -> Option<PriceBreakdown> {
        let origin_text = carrier.origin(shipment.origin);
        let (origin, destination) =
            match locate_spots(origin_text, shipment.destination, freight.geocode_spots, resolver)
                .await
            {
                Ok(spots) => spots,
                Err(e) => {
                    warn!("{}, using table price", e);
                    return None;
                }
            };

        freight_resolver
            .quote(FreightContext {
                carrier_code: carrier.code(),
                freight,
                origin: &origin,
                destination: &destination,
                distance_km,
                quantity: shipment.quantity,
                tax_rate: self.tax.shipping_tax_rate,
            })
            .await
    }
}

/// Loading and unloading addresses for the broker, with coordinates when
/// `geocode` is set.
async fn locate_spots(
    origin_text: &str,
    destination_text: &str,
    geocode: bool,
    resolver: &mut DistanceResolver,
) -> Result<(Address, Address), FreightError> {
    let origin = locate(origin_text);
    let destination = locate(destination_text);
    if !geocode {
        return Ok((origin, destination));
    }

    let from = resolver
        .coordinates(origin_text)
        .await
        .ok_or_else(|| FreightError::Geocoding {
            endpoint: Endpoint::Origin,
            address: origin_text.to_string(),
        })?;
    let to = resolver
        .coordinates(destination_text)
        .await
        .ok_or_else(|| FreightError::Geocoding {
            endpoint: Endpoint::Destination,
            address: destination_text.to_string(),
        })?;

    Ok((origin.with_coordinates(from), destination.with_coordinates(to)))
}

fn needs_distance(carrier: &Carrier) -> bool {
    carrier.uses_distance() || carrier.broker().is_some()
}
