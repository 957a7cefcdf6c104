//! Order Catalog
//!
//! Static order records keyed by order id, customer name, email, and
//! status. An exact order-id query short-circuits with a single result;
//! zero matches fall back to the full catalog plus a status summary.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Prefix every order id carries; queries starting with it (and long
/// enough to be meaningful) are treated as id lookups.
const ORDER_ID_PREFIX: &str = "ord-";
const ORDER_ID_MIN_LEN: usize = 8;

/// A line item within an order
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: u32,
    pub name: String,
    pub quantity: u32,
    /// Unit price in USD
    pub price: u32,
}

/// A customer order
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub order_date: String,
    pub status: String,
    /// Total in USD
    pub total_amount: u32,
    pub payment_method: String,
    pub shipping_address: String,
    pub items: Vec<OrderItem>,
}

/// Search response returned to the agent
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderSearchResponse {
    pub message: String,
    pub orders: Vec<Order>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact_match: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_summary: Option<BTreeMap<String, usize>>,
}

struct OrderSeed {
    id: &'static str,
    name: &'static str,
    email: &'static str,
    phone: &'static str,
    date: &'static str,
    status: &'static str,
    total: u32,
    payment: &'static str,
    address: &'static str,
    items: &'static [(u32, &'static str, u32, u32)],
}

const SEEDS: [OrderSeed; 10] = [
    OrderSeed {
        id: "ORD-2024-001",
        name: "Alice Nguyen",
        email: "alice.nguyen@email.com",
        phone: "555-0101",
        date: "2024-01-15",
        status: "Delivered",
        total: 1750,
        payment: "Bank transfer",
        address: "123 Maple St, Springfield",
        items: &[(1, "Dell XPS 13 Laptop", 1, 1500), (6, "AirPods Pro 2", 1, 250)],
    },
    OrderSeed {
        id: "ORD-2024-002",
        name: "Brian Tran",
        email: "brian.tran@email.com",
        phone: "555-0102",
        date: "2024-01-16",
        status: "Processing",
        total: 1290,
        payment: "Cash on delivery",
        address: "456 Oak Ave, Springfield",
        items: &[(2, "iPhone 15 Pro", 1, 1200), (3, "Keychron K2 Mechanical Keyboard", 1, 90)],
    },
    OrderSeed {
        id: "ORD-2024-003",
        name: "Carol Le",
        email: "carol.le@email.com",
        phone: "555-0103",
        date: "2024-01-17",
        status: "Shipping",
        total: 1730,
        payment: "Credit card",
        address: "789 Pine Rd, Shelbyville",
        items: &[(7, "ThinkPad X1 Carbon", 1, 1600), (8, "Logitech G Pro X Headset", 1, 130)],
    },
    OrderSeed {
        id: "ORD-2024-004",
        name: "David Pham",
        email: "david.pham@email.com",
        phone: "555-0104",
        date: "2024-01-18",
        status: "Pending confirmation",
        total: 1500,
        payment: "Bank transfer",
        address: "321 Birch Ln, Capital City",
        items: &[(9, "Herman Miller Aeron Chair", 1, 1500)],
    },
    OrderSeed {
        id: "ORD-2024-005",
        name: "Emma Hoang",
        email: "emma.hoang@email.com",
        phone: "555-0105",
        date: "2024-01-19",
        status: "Cancelled",
        total: 3900,
        payment: "Bank transfer",
        address: "654 Cedar Ct, Ogdenville",
        items: &[(10, "Canon EOS R5 Camera", 1, 3900)],
    },
    OrderSeed {
        id: "ORD-2024-006",
        name: "Frank Vu",
        email: "frank.vu@email.com",
        phone: "555-0106",
        date: "2024-01-20",
        status: "Delivered",
        total: 650,
        payment: "Cash on delivery",
        address: "987 Elm St, North Haverbrook",
        items: &[(5, "Sony WH-1000XM5 Headphones", 1, 400), (6, "AirPods Pro 2", 1, 250)],
    },
    OrderSeed {
        id: "ORD-2024-007",
        name: "Grace Dang",
        email: "grace.dang@email.com",
        phone: "555-0107",
        date: "2024-01-21",
        status: "Processing",
        total: 340,
        payment: "Credit card",
        address: "147 Walnut Dr, Brockway",
        items: &[(4, "Sihoo Ergonomic Chair", 1, 250), (3, "Keychron K2 Mechanical Keyboard", 1, 90)],
    },
    OrderSeed {
        id: "ORD-2024-008",
        name: "Henry Bui",
        email: "henry.bui@email.com",
        phone: "555-0108",
        date: "2024-01-22",
        status: "Delivered",
        total: 3100,
        payment: "Bank transfer",
        address: "258 Chestnut Blvd, Springfield",
        items: &[(7, "ThinkPad X1 Carbon", 1, 1600), (9, "Herman Miller Aeron Chair", 1, 1500)],
    },
    OrderSeed {
        id: "ORD-2024-009",
        name: "Iris Ngo",
        email: "iris.ngo@email.com",
        phone: "555-0109",
        date: "2024-01-23",
        status: "Shipping",
        total: 530,
        payment: "Cash on delivery",
        address: "369 Poplar Way, Shelbyville",
        items: &[(8, "Logitech G Pro X Headset", 1, 130), (5, "Sony WH-1000XM5 Headphones", 1, 400)],
    },
    OrderSeed {
        id: "ORD-2024-010",
        name: "Kevin Ly",
        email: "kevin.ly@email.com",
        phone: "555-0110",
        date: "2024-01-24",
        status: "Pending confirmation",
        total: 1450,
        payment: "Bank transfer",
        address: "741 Ash Pl, Capital City",
        items: &[(2, "iPhone 15 Pro", 1, 1200), (6, "AirPods Pro 2", 1, 250)],
    },
];

static CATALOG: LazyLock<Vec<Order>> = LazyLock::new(|| {
    SEEDS
        .iter()
        .map(|seed| Order {
            order_id: seed.id.into(),
            customer_name: seed.name.into(),
            customer_email: seed.email.into(),
            customer_phone: seed.phone.into(),
            order_date: seed.date.into(),
            status: seed.status.into(),
            total_amount: seed.total,
            payment_method: seed.payment.into(),
            shipping_address: seed.address.into(),
            items: seed
                .items
                .iter()
                .map(|&(product_id, name, quantity, price)| OrderItem {
                    product_id,
                    name: name.into(),
                    quantity,
                    price,
                })
                .collect(),
        })
        .collect()
});

/// All orders
pub fn all() -> &'static [Order] {
    &CATALOG
}

/// Search orders by id, customer name, email, or status.
///
/// Queries shaped like an order id are matched exactly first; an exact hit
/// short-circuits with a single result. Zero matches fall back to the full
/// catalog with a per-status summary so the model can still help the user
/// narrow down.
pub fn search(query: &str) -> OrderSearchResponse {
    let needle = query.to_lowercase();
    let looks_like_order_id =
        needle.starts_with(ORDER_ID_PREFIX) && needle.len() >= ORDER_ID_MIN_LEN;

    let mut matched: Vec<Order> = Vec::new();

    for order in CATALOG.iter() {
        let id_lower = order.order_id.to_lowercase();

        if looks_like_order_id {
            if needle == id_lower {
                return OrderSearchResponse {
                    message: format!("Found exact order: {}", order.order_id),
                    orders: vec![order.clone()],
                    total: 1,
                    search_query: Some(query.to_string()),
                    exact_match: Some(true),
                    status_summary: None,
                };
            }
            if id_lower.contains(&needle) {
                matched.push(order.clone());
            }
        } else if id_lower.contains(&needle)
            || order.customer_name.to_lowercase().contains(&needle)
            || order.customer_email.to_lowercase().contains(&needle)
            || order.status.to_lowercase().contains(&needle)
        {
            matched.push(order.clone());
        }
    }

    if matched.is_empty() {
        let mut summary = BTreeMap::new();
        for order in CATALOG.iter() {
            *summary.entry(order.status.clone()).or_insert(0) += 1;
        }
        return OrderSearchResponse {
            message: format!(
                "No orders matched '{}'. Showing all orders instead:",
                query
            ),
            orders: CATALOG.clone(),
            total: CATALOG.len(),
            search_query: None,
            exact_match: None,
            status_summary: Some(summary),
        };
    }

    OrderSearchResponse {
        message: format!("Found {} order(s) matching '{}':", matched.len(), query),
        total: matched.len(),
        orders: matched,
        search_query: Some(query.to_string()),
        exact_match: None,
        status_summary: None,
    }
}

/// Locate an order id mentioned anywhere in free text and return the
/// matching order. Used by the invoice-image path.
pub fn find_in_text(text: &str) -> Option<&'static Order> {
    let lower = text.to_lowercase();
    let start = lower.find(ORDER_ID_PREFIX)?;
    let candidate: String = lower[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();

    CATALOG
        .iter()
        .find(|o| o.order_id.to_lowercase() == candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_order_id_short_circuits() {
        let response = search("ORD-2024-001");
        assert_eq!(response.total, 1);
        assert_eq!(response.exact_match, Some(true));
        assert_eq!(response.orders[0].order_id, "ORD-2024-001");
        assert_eq!(response.orders[0].customer_name, "Alice Nguyen");
    }

    #[test]
    fn test_partial_order_id_matches_many() {
        let response = search("ord-2024");
        assert_eq!(response.total, all().len());
        assert_eq!(response.exact_match, None);
    }

    #[test]
    fn test_status_substring() {
        let response = search("delivered");
        assert_eq!(response.total, 3);
        assert!(response.orders.iter().all(|o| o.status == "Delivered"));
    }

    #[test]
    fn test_email_substring() {
        let response = search("carol.le@");
        assert_eq!(response.total, 1);
        assert_eq!(response.orders[0].order_id, "ORD-2024-003");
    }

    #[test]
    fn test_zero_match_falls_back_to_all_orders() {
        let response = search("nobody-here");
        assert_eq!(response.total, all().len());
        assert!(response.message.contains("No orders matched"));

        let summary = response.status_summary.unwrap();
        assert_eq!(summary.values().sum::<usize>(), all().len());
        assert_eq!(summary["Delivered"], 3);
    }

    #[test]
    fn test_find_in_text() {
        let order = find_in_text("please make an invoice for ORD-2024-003, thanks").unwrap();
        assert_eq!(order.order_id, "ORD-2024-003");

        assert!(find_in_text("no id in here").is_none());
        assert!(find_in_text("ord-2024-999").is_none());
    }

    #[test]
    fn test_search_is_idempotent() {
        let a = serde_json::to_value(search("processing")).unwrap();
        let b = serde_json::to_value(search("processing")).unwrap();
        assert_eq!(a, b);
    }
}
