use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use shipping_quote::api::{BrokerClient, HttpClient};
use shipping_quote::config::{BrokerSettings, FreightSettings, Settings};
use shipping_quote::domain::{Address, PriceSource};
use shipping_quote::freight::{BrokerThrottle, FreightContext, FreightQuoteResolver, StaticRates};
use shipping_quote::rates::RateAggregator;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http() -> HttpClient {
    HttpClient::new(Duration::from_secs(5)).unwrap()
}

fn freight_settings() -> FreightSettings {
    FreightSettings {
        enabled: true,
        vehicle_rules: Vec::new(),
        vehicle_size: Some("ftl".into()),
        vehicle_body: Some("curtainsider".into()),
        load_type: "2_europalette".into(),
        freight_type: "ftl".into(),
        load_name: "Ceramic tiles".into(),
        price_factor: 1.0,
        reference_sku: None,
        geocode_spots: false,
    }
}

fn resolver(server: &MockServer, token: Option<&str>) -> FreightQuoteResolver {
    let client = BrokerClient::new(
        http(),
        Some(format!("{}/prediction", server.uri())),
        token.map(str::to_string),
        Some("broker-api-key".into()),
    );
    let settings = BrokerSettings {
        company_id: 7,
        user_id: 11,
        ..Default::default()
    };
    FreightQuoteResolver::new(
        client,
        settings,
        "PLN",
        Arc::new(StaticRates::default().with_rate("EUR", "PLN", 4.0)),
        Arc::new(HashMap::<String, f64>::new()),
    )
    .with_throttle(Arc::new(BrokerThrottle::new(Duration::ZERO)))
}

#[tokio::test]
async fn prediction_is_converted_and_tax_rounded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/prediction"))
        .and(header("authorization", "Bearer secret-token"))
        .and(header("api-key", "broker-api-key"))
        .and(body_partial_json(json!({
            "company_id": 7,
            "user_id": 11,
            "currency": "EUR",
            "distance": 250000.0,
            "vehicle_requirements": {
                "vehicle_size_id": "ftl",
                "required_truck_bodies": ["curtainsider"],
                "transport_type": "ftl",
                "capacity": 3
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "prediction": [100.0, 90.0],
            "currency": "EUR"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let freight = freight_settings();
    let origin = Address::new("ul. Magazynowa 5, 62-080 Tarnowo Podgorne, PL");
    let destination = Address::new("ul. Polna 1, 00-950 Warszawa, PL");
    let breakdown = resolver(&server, Some("secret-token"))
        .try_quote(FreightContext {
            carrier_code: "direct_no_lift",
            freight: &freight,
            origin: &origin,
            destination: &destination,
            distance_km: 250.0,
            quantity: 120.0,
            tax_rate: 23.0,
        })
        .await
        .unwrap();

    assert_eq!(breakdown.source, PriceSource::Broker);
    assert_eq!(breakdown.gross_price, 492.0);
    assert!((breakdown.net_price - 400.0).abs() < 1e-6);
}

#[tokio::test]
async fn spots_carry_parsed_city_and_postal_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/prediction"))
        .and(body_partial_json(json!({
            "spots": [
                {
                    "type": "loading",
                    "place": {
                        "address": { "locality": "Tarnowo Podgorne", "postal_code": "62-080" },
                        "country": "PL"
                    }
                },
                {
                    "type": "unloading",
                    "place": {
                        "address": { "locality": "Warszawa", "postal_code": "00-950" },
                        "country": "PL"
                    }
                }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "prediction": [50.0],
            "currency": "EUR"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let freight = freight_settings();
    let origin = Address::new("ul. Magazynowa 5, 62-080 Tarnowo Podgorne, PL");
    let destination = Address::new("ul. Polna 1, 00-950 Warszawa, PL");
    let quoted = resolver(&server, Some("secret-token"))
        .quote(FreightContext {
            carrier_code: "direct_no_lift",
            freight: &freight,
            origin: &origin,
            destination: &destination,
            distance_km: 300.0,
            quantity: 40.0,
            tax_rate: 0.0,
        })
        .await;

    assert_eq!(quoted.map(|b| b.gross_price), Some(200.0));
}

#[tokio::test]
async fn broker_error_status_yields_no_quote() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/prediction"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let freight = freight_settings();
    let origin = Address::new("Poznan, PL");
    let destination = Address::new("Warszawa, PL");
    let quoted = resolver(&server, Some("secret-token"))
        .quote(FreightContext {
            carrier_code: "direct_no_lift",
            freight: &freight,
            origin: &origin,
            destination: &destination,
            distance_km: 310.0,
            quantity: 120.0,
            tax_rate: 23.0,
        })
        .await;

    assert!(quoted.is_none());
}

#[tokio::test]
async fn missing_token_skips_the_broker() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let freight = freight_settings();
    let origin = Address::new("Poznan, PL");
    let destination = Address::new("Warszawa, PL");
    let quoted = resolver(&server, None)
        .quote(FreightContext {
            carrier_code: "direct_no_lift",
            freight: &freight,
            origin: &origin,
            destination: &destination,
            distance_km: 310.0,
            quantity: 120.0,
            tax_rate: 23.0,
        })
        .await;

    assert!(quoted.is_none());
}

fn end_to_end_settings(server: &MockServer, min_interval_ms: u64) -> Settings {
    let raw = format!(
        r#"
        [general]
        warehouse_origin = "ul. Magazynowa 5, 62-080 Tarnowo Podgorne, PL"
        store_currency = "PLN"

        [distance]
        provider = "here"
        here_api_key = "here-key"
        here_geocode_url = "{uri}/v1/geocode"
        here_routes_url = "{uri}/v8/routes"

        [tax]
        shipping_tax_rate = 23

        [broker]
        company_id = 7
        user_id = 11
        prediction_url = "{uri}/prediction"
        access_token = "secret-token"
        min_interval_ms = {min_interval_ms}

        [[currency.rates]]
        from = "EUR"
        to = "PLN"
        rate = 4.0

        [[carriers]]
        code = "courier"
        title = "Courier"
        name = "Parcel"

        [carriers.pricing]
        kind = "flat_table"
        delivers = [[{{ m2 = 200, price = 900 }}]]

        [[carriers]]
        code = "direct_no_lift"
        title = "Direct truck"
        name = "No lift"

        [carriers.pricing]
        kind = "distance_tier"

        [carriers.pricing.table]
        tiers = [{{ min_distance = 0, price = 450, type = "fixed" }}]

        [carriers.freight]
        enabled = true
        vehicle_size = "ftl"
        vehicle_body = "curtainsider"
        "#,
        uri = server.uri(),
        min_interval_ms = min_interval_ms
    );
    Settings::from_toml_str(&raw).unwrap()
}

async fn mount_routing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/geocode"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "position": { "lat": 52.2, "lng": 19.0 } }]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v8/routes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "routes": [{ "sections": [{ "summary": { "length": 250000, "duration": 12000 } }] }]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn aggregator_prefers_broker_price_for_freight_carriers() {
    let server = MockServer::start().await;
    mount_routing(&server).await;
    Mock::given(method("POST"))
        .and(path("/prediction"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "prediction": [100.0],
            "currency": "EUR"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let settings = end_to_end_settings(&server, 0);
    let aggregator = RateAggregator::from_settings(&settings).unwrap();
    let rates = aggregator
        .compute_shipping_costs(
            &settings.general.warehouse_origin,
            "ul. Polna 1, 00-950 Warszawa, PL",
            120.0,
        )
        .await;

    let direct = rates.iter().find(|r| r.carrier_code == "direct_no_lift").unwrap();
    assert_eq!(direct.breakdown.source, PriceSource::Broker);
    assert_eq!(direct.breakdown.gross_price, 492.0);
    assert_eq!(direct.distance_km, Some(250.0));
    assert_eq!(direct.formatted_price_gross, "492.00 PLN");

    let courier = rates.iter().find(|r| r.carrier_code == "courier").unwrap();
    assert_eq!(courier.breakdown.source, PriceSource::Table);
    assert_eq!(courier.distance_km, None);
}

#[tokio::test]
async fn aggregator_falls_back_to_table_when_broker_fails() {
    let server = MockServer::start().await;
    mount_routing(&server).await;
    Mock::given(method("POST"))
        .and(path("/prediction"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let settings = end_to_end_settings(&server, 0);
    let aggregator = RateAggregator::from_settings(&settings).unwrap();
    let rates = aggregator
        .compute_shipping_costs(
            &settings.general.warehouse_origin,
            "ul. Polna 1, 00-950 Warszawa, PL",
            120.0,
        )
        .await;

    let direct = rates.iter().find(|r| r.carrier_code == "direct_no_lift").unwrap();
    assert_eq!(direct.breakdown.source, PriceSource::Table);
    assert_eq!(direct.breakdown.net_price, 450.0);
    assert_eq!(direct.price, 450.0);
}

#[tokio::test]
async fn aggregators_with_same_interval_share_the_broker_gate() {
    let server = MockServer::start().await;
    mount_routing(&server).await;
    Mock::given(method("POST"))
        .and(path("/prediction"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "prediction": [100.0],
            "currency": "EUR"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let settings = end_to_end_settings(&server, 700);
    let first = RateAggregator::from_settings(&settings).unwrap();
    let second = RateAggregator::from_settings(&settings).unwrap();
    let destination = "ul. Polna 1, 00-950 Warszawa, PL";

    let start = Instant::now();
    let a = first
        .compute_shipping_costs(&settings.general.warehouse_origin, destination, 120.0)
        .await;
    let b = second
        .compute_shipping_costs(&settings.general.warehouse_origin, destination, 120.0)
        .await;

    assert!(start.elapsed() >= Duration::from_millis(700));
    for rates in [a, b] {
        let direct = rates.iter().find(|r| r.carrier_code == "direct_no_lift").unwrap();
        assert_eq!(direct.breakdown.source, PriceSource::Broker);
    }
}
