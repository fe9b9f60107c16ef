use crate::domain::{PriceBreakdown, PriceSource};
use crate::utils::ceil_money;

/// Broker prices: round the gross up to a whole unit, then derive the net
/// back from it so that `net * (1 + t) == gross` holds.
pub fn apply_tax_rounding(net: f64, tax_rate: f64) -> PriceBreakdown {
    let multiplier = 1.0 + tax_rate / 100.0;
    let gross = ceil_money(net * multiplier);
    PriceBreakdown {
        net_price: gross / multiplier,
        gross_price: gross,
        tax_rate,
        source: PriceSource::Broker,
    }
}

/// Table prices: the configured amount is gross when the store enters
/// shipping prices with tax included, net otherwise.
pub fn breakdown_from_table(price: f64, tax_rate: f64, shipping_includes_tax: bool) -> PriceBreakdown {
    let multiplier = 1.0 + tax_rate / 100.0;
    let (net_price, gross_price) = if shipping_includes_tax {
        (price / multiplier, price)
    } else {
        (price, price * multiplier)
    };
    PriceBreakdown {
        net_price,
        gross_price,
        tax_rate,
        source: PriceSource::Table,
    }
}

/// The amount shown as the rate price.
pub fn display_price(breakdown: &PriceBreakdown, shipping_includes_tax: bool) -> f64 {
    if shipping_includes_tax {
        breakdown.gross_price
    } else {
        breakdown.net_price
    }
}

pub fn format_price(amount: f64, currency: &str) -> String {
    format!("{:.2} {}", amount, currency)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gross_is_rounded_up_and_net_derived() {
        let breakdown = apply_tax_rounding(100.0, 23.0);
        assert_eq!(breakdown.gross_price, 123.0);
        assert_eq!(breakdown.net_price, 123.0 / 1.23);
        assert_eq!(breakdown.source, PriceSource::Broker);

        let breakdown = apply_tax_rounding(100.5, 23.0);
        assert_eq!(breakdown.gross_price, 124.0);
    }

    #[test]
    fn rounding_is_idempotent() {
        for net in [10.0, 99.99, 100.0, 287.43, 1234.5] {
            let first = apply_tax_rounding(net, 23.0);
            let second = apply_tax_rounding(first.net_price, 23.0);
            assert_eq!(second.gross_price, first.gross_price, "net {}", net);
            assert_eq!(second.net_price, first.gross_price / 1.23);
        }
    }

    #[test]
    fn table_price_follows_tax_setting() {
        let incl = breakdown_from_table(123.0, 23.0, true);
        assert_eq!(incl.gross_price, 123.0);
        assert_eq!(incl.net_price, 123.0 / 1.23);
        assert_eq!(display_price(&incl, true), 123.0);

        let excl = breakdown_from_table(100.0, 23.0, false);
        assert_eq!(excl.net_price, 100.0);
        assert_eq!(excl.gross_price, 100.0 * 1.23);
        assert_eq!(display_price(&excl, false), 100.0);
    }

    #[test]
    fn zero_tax_keeps_price() {
        let breakdown = breakdown_from_table(50.0, 0.0, false);
        assert_eq!(breakdown.net_price, breakdown.gross_price);
    }

    #[test]
    fn formats_two_decimals() {
        assert_eq!(format_price(123.0, "PLN"), "123.00 PLN");
        assert_eq!(format_price(99.999, "EUR"), "100.00 EUR");
    }
}
