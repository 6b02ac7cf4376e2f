use crate::domain::order::Order;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

/// One CSV row of an order export.
#[derive(Debug, Serialize)]
struct OrderRecord {
    order_id: String,
    intent_id: String,
    buyer_id: String,
    items: String,
    amount: Decimal,
    currency: String,
    payment_status: String,
    gateway_payment_id: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    created_at: String,
}

impl From<&Order> for OrderRecord {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.order_id.to_string(),
            intent_id: order.intent_id.to_string(),
            buyer_id: order.buyer_id.to_string(),
            items: order.items.join(";"),
            amount: order.amount_minor_units.to_major(),
            currency: order.currency.to_string(),
            payment_status: order.payment_status.to_string(),
            gateway_payment_id: order.gateway_payment_id.to_string(),
            latitude: order.location.map(|l| l.latitude),
            longitude: order.location.map(|l| l.longitude),
            created_at: order.created_at.to_rfc3339(),
        }
    }
}

/// Writes orders to a CSV sink, amounts in major currency units.
pub struct OrderWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OrderWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes all orders, header first, and flushes the sink.
    ///
    /// An empty export still carries the header row.
    pub fn write_orders<'a>(&mut self, orders: impl IntoIterator<Item = &'a Order>) -> Result<()> {
        let mut written = 0;
        for order in orders {
            self.writer.serialize(OrderRecord::from(order))?;
            written += 1;
        }
        if written == 0 {
            self.writer.write_record(HEADER)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

const HEADER: [&str; 11] = [
    "order_id",
    "intent_id",
    "buyer_id",
    "items",
    "amount",
    "currency",
    "payment_status",
    "gateway_payment_id",
    "latitude",
    "longitude",
    "created_at",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::intent::{BuyerId, IntentId, PurchaseIntent};
    use crate::domain::money::{Amount, Currency};
    use crate::domain::order::Location;
    use crate::domain::session::GatewayPaymentId;
    use chrono::Utc;

    fn order(amount: i64) -> Order {
        let intent = PurchaseIntent::new(
            IntentId::generate(),
            BuyerId::new("buyer-1").unwrap(),
            "Chicken Product".to_string(),
            Amount::new(amount).unwrap(),
            Currency::inr(),
            Utc::now(),
        );
        Order::completed(&intent, GatewayPaymentId::new("pay_1"), Utc::now())
    }

    fn export(orders: &[Order]) -> String {
        let mut out = Vec::new();
        OrderWriter::new(&mut out).write_orders(orders).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_empty_export_has_header() {
        let csv = export(&[]);
        assert_eq!(csv.trim_end(), HEADER.join(","));
    }

    #[test]
    fn test_amount_in_major_units() {
        let mut located = order(49900);
        located.set_location(Location::new(12.5, 77.25).unwrap(), Utc::now());
        let csv = export(&[located.clone(), order(5)]);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER.join(","));
        let first: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(first[0], located.order_id.as_str());
        assert_eq!(first[3], "Chicken Product");
        assert_eq!(first[4], "499.00");
        assert_eq!(first[5], "INR");
        assert_eq!(first[6], "Completed");
        assert_eq!(first[8], "12.5");
        assert_eq!(first[9], "77.25");

        let second: Vec<&str> = lines[2].split(',').collect();
        assert_eq!(second[4], "0.05");
        assert_eq!(second[8], "");
    }
}
