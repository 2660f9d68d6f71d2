//! Cheapest-offer aggregation across suppliers.
//!
//! [`reduce`] folds an ordered sequence of offers into a [`WinningOfferMap`]
//! holding exactly one offer per UPC: the cheapest one seen. On equal prices
//! the offer seen first is kept, so the result depends on input order only
//! for ties. The map iterates in first-seen key order.

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::offers::RawOffer;

/// The cheapest offer for every UPC in a sync run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WinningOfferMap {
    offers: IndexMap<String, RawOffer>,
}

impl WinningOfferMap {
    #[must_use]
    pub fn len(&self) -> usize {
        self.offers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    #[must_use]
    pub fn get(&self, upc: &str) -> Option<&RawOffer> {
        self.offers.get(upc)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawOffer)> {
        self.offers.iter().map(|(upc, offer)| (upc.as_str(), offer))
    }

    /// Consumes the map, yielding winning offers in first-seen key order.
    pub fn into_offers(self) -> impl Iterator<Item = RawOffer> {
        self.offers.into_values()
    }

    /// Keeps `offer` if its UPC is new or it is strictly cheaper than the
    /// current winner.
    fn consider(&mut self, offer: RawOffer) {
        match self.offers.entry(offer.upc.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(offer);
            }
            Entry::Occupied(mut slot) => {
                if offer.price < slot.get().price {
                    slot.insert(offer);
                }
            }
        }
    }
}

/// Reduces offers from every supplier to the cheapest offer per UPC.
///
/// Pure: no I/O, no shared state. Offers must be supplied in supplier
/// enumeration order, then response order, for tie-breaking to be stable.
pub fn reduce<I>(offers: I) -> WinningOfferMap
where
    I: IntoIterator<Item = RawOffer>,
{
    offers
        .into_iter()
        .fold(WinningOfferMap::default(), |mut winners, offer| {
            winners.consider(offer);
            winners
        })
}
