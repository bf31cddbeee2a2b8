#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use rfm_core::{
    transaction::{ReturnTransaction, SalesTransaction},
    types::CustomerId,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ── Four-customer sample (25 line items, one per invoice) ───────────────────

/// Customers 17850 / 13047 / 12583 / 15311 hold 10 / 8 / 4 / 3 invoices on
/// 25 consecutive days from 2010-12-01.
pub fn sample_sales() -> Vec<SalesTransaction> {
    let start = NaiveDate::from_ymd_opt(2010, 12, 1).unwrap();
    let customers: Vec<i64> = std::iter::repeat(17850)
        .take(10)
        .chain(std::iter::repeat(13047).take(8))
        .chain(std::iter::repeat(12583).take(4))
        .chain(std::iter::repeat(15311).take(3))
        .collect();
    let revenue = [100.0, 150.0, 200.0, 50.0, 75.0];
    let quantity = [10, 15, 20, 5, 7];
    let country = |i: usize| match i {
        0..=14 => "UK",
        15..=21 => "France",
        _ => "Germany",
    };

    (0..25)
        .map(|i| {
            let qty = quantity[i % 5];
            SalesTransaction {
                invoice_no:    format!("53636{i}"),
                stock_code:    format!("STOCK{}", i % 10),
                description:   None,
                quantity:      qty,
                invoice_date:  start + Duration::days(i as i64),
                unit_price:    revenue[i % 5] / qty as f64,
                customer_id:   CustomerId(customers[i]),
                country:       country(i).to_string(),
                total_revenue: revenue[i % 5],
            }
        })
        .collect()
}

// ── Ten-customer population ──────────────────────────────────────────────────
//
// Latest invoice is 2011-03-31, so the snapshot is 2011-04-01.
//
//   customer  last(days before)  invoices  monetary  segment
//   1          0                  6         1000      Champion
//   2          1                  5          900      Champion
//   3         80                  3          700      At-Risk
//   4         85                  2          800      At-Risk
//   5         10                  1           50      New Customer
//   6         20                  2          100      Standard
//   7         30                  2          150      Standard
//   8         40                  1          200      Standard
//   9         50                  3          300      Standard
//   10        60                  4          400      Standard

pub fn latest_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2011, 3, 31).unwrap()
}

pub fn days_before(n: i64) -> NaiveDate {
    latest_date() - Duration::days(n)
}

fn line(
    invoice: &str,
    customer: i64,
    days: i64,
    code: &str,
    desc: Option<&str>,
    qty: i64,
    price: f64,
) -> SalesTransaction {
    SalesTransaction::new(
        invoice,
        code,
        desc.map(str::to_string),
        qty,
        days_before(days),
        price,
        CustomerId(customer),
        if customer % 2 == 0 { "France" } else { "United Kingdom" },
    )
}

pub fn retail_population() -> Vec<SalesTransaction> {
    let champ_a = Some("CHAMPAGNE FLUTE SET");
    let champ_b = Some("BIRTHDAY CARD");
    let shared = Some("WHITE HANGING HEART T-LIGHT HOLDER");
    let risk_a = Some("REGENCY CAKESTAND 3 TIER");
    let risk_b = Some("JUMBO BAG RED RETROSPOT");
    let std_a = Some("PACK OF 72 RETROSPOT CAKE CASES");
    let std_b = Some("ASSORTED COLOUR BIRD ORNAMENT");

    vec![
        // Customer 1: 6 invoices, 7 line items, 1000.00
        line("1001", 1, 0, "CHAMP-A", champ_a, 10, 20.0),
        line("1001", 1, 0, "SHARED", shared, 5, 10.0),
        line("1002", 1, 5, "CHAMP-A", champ_a, 10, 15.0),
        line("1003", 1, 10, "CHAMP-B", champ_b, 20, 5.0),
        line("1004", 1, 15, "SHARED", shared, 10, 10.0),
        line("1005", 1, 20, "CHAMP-A", champ_a, 10, 20.0),
        line("1006", 1, 25, "CHAMP-B", champ_b, 40, 5.0),
        // Customer 2: 5 invoices, 900.00
        line("2001", 2, 1, "CHAMP-A", champ_a, 10, 30.0),
        line("2002", 2, 8, "SHARED", shared, 20, 10.0),
        line("2003", 2, 16, "CHAMP-B", champ_b, 20, 5.0),
        line("2004", 2, 24, "CHAMP-A", champ_a, 5, 20.0),
        line("2005", 2, 32, "SHARED", shared, 20, 10.0),
        // Customer 3: 3 invoices, 700.00
        line("3001", 3, 80, "RISK-A", risk_a, 10, 25.0),
        line("3001", 3, 80, "SHARED", shared, 5, 10.0),
        line("3002", 3, 90, "RISK-B", risk_b, 20, 10.0),
        line("3003", 3, 100, "RISK-A", risk_a, 8, 25.0),
        // Customer 4: 2 invoices, 800.00
        line("4001", 4, 85, "RISK-B", risk_b, 30, 10.0),
        line("4001", 4, 85, "RISK-C", None, 10, 20.0),
        line("4002", 4, 95, "RISK-A", risk_a, 12, 25.0),
        // Customer 5: 1 invoice, 50.00
        line("5001", 5, 10, "SHARED", shared, 5, 10.0),
        // Customer 6: 2 invoices, 100.00
        line("6001", 6, 20, "STD-A", std_a, 5, 10.0),
        line("6002", 6, 40, "STD-A", std_a, 5, 10.0),
        // Customer 7: 2 invoices, 150.00
        line("7001", 7, 30, "STD-A", std_a, 5, 15.0),
        line("7002", 7, 45, "STD-B", std_b, 5, 15.0),
        // Customer 8: 1 invoice, 200.00
        line("8001", 8, 40, "STD-B", std_b, 10, 20.0),
        // Customer 9: 3 invoices, 300.00
        line("9001", 9, 50, "STD-A", std_a, 10, 10.0),
        line("9002", 9, 55, "STD-A", std_a, 10, 10.0),
        line("9003", 9, 60, "STD-B", std_b, 10, 10.0),
        // Customer 10: 4 invoices, 400.00
        line("10001", 10, 60, "STD-A", std_a, 10, 10.0),
        line("10002", 10, 65, "STD-A", std_a, 10, 10.0),
        line("10003", 10, 70, "STD-A", std_a, 10, 10.0),
        line("10004", 10, 75, "STD-A", std_a, 10, 10.0),
    ]
}

fn returned(invoice: &str, customer: Option<i64>, days: i64, code: &str, qty: i64, price: f64) -> ReturnTransaction {
    ReturnTransaction {
        invoice_no:   invoice.to_string(),
        stock_code:   code.to_string(),
        description:  None,
        quantity:     qty,
        invoice_date: days_before(days),
        unit_price:   price,
        customer_id:  customer.map(CustomerId),
        country:      "United Kingdom".to_string(),
    }
}

/// Returns against the ten-customer population.
///
///   customer 3: 2 return invoices, 6 items
///   customer 4: 1 return invoice,  5 items
///   customer 1: 1 return invoice,  2 items
///   plus one anonymous return and one from a customer with no sales
pub fn retail_returns() -> Vec<ReturnTransaction> {
    vec![
        returned("C3001", Some(3), 78, "RISK-A", -4, 25.0),
        returned("C3002", Some(3), 75, "RISK-B", -1, 10.0),
        returned("C3002", Some(3), 75, "SHARED", -1, 10.0),
        returned("C4001", Some(4), 80, "RISK-C", -5, 20.0),
        returned("C1001", Some(1), 2, "CHAMP-A", -2, 20.0),
        returned("C9999", None, 3, "STD-A", -3, 10.0),
        returned("C9998", Some(99), 3, "STD-A", -7, 10.0),
    ]
}
