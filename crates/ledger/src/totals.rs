use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::currency::Currency;
use crate::line_item::LineItem;

/// Per-currency aggregation of ledger rows.
///
/// A currency key is present only if something referenced it; currencies with
/// zero activity are absent, not zero. Amounts in different currencies are
/// never combined.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyTotals(BTreeMap<Currency, Decimal>);

impl CurrencyTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum line item contributions grouped by currency.
    pub fn from_line_items<'a, I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a LineItem>,
    {
        let mut totals = Self::new();
        for item in items {
            totals.add(item.currency.clone(), item.contribution());
        }
        totals
    }

    /// Add to a currency bucket, creating the key if absent.
    pub fn add(&mut self, currency: Currency, amount: Decimal) {
        *self.0.entry(currency).or_insert(Decimal::ZERO) += amount;
    }

    /// Subtract from an existing currency bucket.
    ///
    /// Returns `false` (and changes nothing) if the currency has no key:
    /// payments can only reduce currencies an invoice actually carries.
    pub fn subtract_existing(&mut self, currency: &Currency, amount: Decimal) -> bool {
        match self.0.get_mut(currency) {
            Some(bucket) => {
                *bucket -= amount;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, currency: &Currency) -> Option<Decimal> {
        self.0.get(currency).copied()
    }

    pub fn contains(&self, currency: &Currency) -> bool {
        self.0.contains_key(currency)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Currency, &Decimal)> {
        self.0.iter()
    }

    pub fn currencies(&self) -> impl Iterator<Item = &Currency> {
        self.0.keys()
    }

    /// Whether every present currency bucket is exactly zero.
    ///
    /// An empty map is vacuously settled; callers that need "has activity"
    /// must check `is_empty()` separately.
    pub fn all_zero(&self) -> bool {
        self.0.values().all(|v| v.is_zero())
    }
}

impl<'a> IntoIterator for &'a CurrencyTotals {
    type Item = (&'a Currency, &'a Decimal);
    type IntoIter = std::collections::btree_map::Iter<'a, Currency, Decimal>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_item::LineOwner;
    use blockbill_core::AggregateId;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn usd() -> Currency {
        Currency::new("usd").unwrap()
    }

    fn eur() -> Currency {
        Currency::new("eur").unwrap()
    }

    fn line(amount: i64, currency: Currency, quantity: Decimal) -> LineItem {
        LineItem::new(
            LineOwner::order(AggregateId::new()),
            amount,
            currency,
            quantity,
            None,
            None,
        )
        .unwrap()
    }

    #[test]
    fn groups_contributions_by_currency() {
        let items = vec![
            line(3000, usd(), dec!(3)),
            line(500, usd(), dec!(2)),
            line(100, eur(), dec!(1)),
        ];
        let totals = CurrencyTotals::from_line_items(&items);

        assert_eq!(totals.get(&usd()), Some(dec!(10000)));
        assert_eq!(totals.get(&eur()), Some(dec!(100)));
        assert_eq!(totals.len(), 2);
    }

    #[test]
    fn absent_currency_has_no_key() {
        let totals = CurrencyTotals::from_line_items(&[line(100, usd(), dec!(1))]);
        assert!(!totals.contains(&eur()));
        assert_eq!(totals.get(&eur()), None);
    }

    #[test]
    fn subtract_existing_refuses_absent_keys() {
        let mut totals = CurrencyTotals::from_line_items(&[line(100, usd(), dec!(1))]);

        assert!(totals.subtract_existing(&usd(), dec!(40)));
        assert_eq!(totals.get(&usd()), Some(dec!(60)));

        assert!(!totals.subtract_existing(&eur(), dec!(40)));
        assert!(!totals.contains(&eur()));
    }

    #[test]
    fn all_zero_reflects_settlement() {
        let mut totals = CurrencyTotals::from_line_items(&[
            line(100, usd(), dec!(1)),
            line(50, eur(), dec!(2)),
        ]);
        assert!(!totals.all_zero());

        totals.subtract_existing(&usd(), dec!(100));
        assert!(!totals.all_zero());

        totals.subtract_existing(&eur(), dec!(100));
        assert!(totals.all_zero());
    }

    proptest! {
        /// Property: per-currency totals equal the sum of contributions of the
        /// line items in that currency, independent of item order.
        #[test]
        fn totals_are_order_independent(
            amounts in prop::collection::vec((1i64..1_000_000i64, 1u32..100u32), 1..12)
        ) {
            let items: Vec<LineItem> = amounts
                .iter()
                .map(|(amount, qty)| line(*amount, usd(), Decimal::from(*qty)))
                .collect();

            let forward = CurrencyTotals::from_line_items(&items);
            let reversed = CurrencyTotals::from_line_items(items.iter().rev());

            prop_assert_eq!(&forward, &reversed);

            let expected: Decimal = items.iter().map(LineItem::contribution).sum();
            prop_assert_eq!(forward.get(&usd()), Some(expected));
        }
    }
}
