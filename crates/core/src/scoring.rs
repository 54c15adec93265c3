//! Offer scoring shared by the catalog merge and quotation selection.
//!
//! Each metric is min-max normalised across the competing group onto 0..=100
//! (a flat metric scores 100 for everyone), then combined with the weights of
//! a [`ScoringProfile`]. The winner is the highest total; ties go to the offer
//! seen first.

use std::collections::HashMap;
use std::hash::Hash;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::quote::Quote;

/// Anything that competes on price, stock and delivery time.
pub trait Scorable {
    fn price(&self) -> Decimal;
    fn stock(&self) -> u32;
    fn delivery_days(&self) -> u32;
}

impl Scorable for Quote {
    /// Quotes compete on the distributor's price, not the marked-up one.
    fn price(&self) -> Decimal {
        self.quoted_unit_price
    }

    fn stock(&self) -> u32 {
        self.available_stock
    }

    fn delivery_days(&self) -> u32 {
        self.estimated_delivery_days
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub price: Decimal,
    pub stock: Decimal,
    pub delivery: Decimal,
}

impl ScoringWeights {
    pub fn sum(&self) -> Decimal {
        self.price + self.stock + self.delivery
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum StockScoring {
    MinMax,
    /// `min(stock, reference) / reference * 100`, zero stock scores zero.
    LinearCap { reference: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringProfile {
    pub weights: ScoringWeights,
    pub stock: StockScoring,
}

impl ScoringProfile {
    /// Per-order selection: price 60%, stock 40% (min-max), no delivery term.
    pub fn quotation() -> Self {
        Self {
            weights: ScoringWeights {
                price: Decimal::new(60, 2),
                stock: Decimal::new(40, 2),
                delivery: Decimal::ZERO,
            },
            stock: StockScoring::MinMax,
        }
    }

    /// Catalog merge: price 40%, stock 30% (linear to 50 units), delivery 30%.
    pub fn catalog() -> Self {
        Self {
            weights: ScoringWeights {
                price: Decimal::new(40, 2),
                stock: Decimal::new(30, 2),
                delivery: Decimal::new(30, 2),
            },
            stock: StockScoring::LinearCap { reference: 50 },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub price: Decimal,
    pub stock: Decimal,
    pub delivery: Decimal,
    pub total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoredOffer<'a, T> {
    pub offer: &'a T,
    pub index: usize,
    pub score: ScoreBreakdown,
}

#[derive(Clone, Debug)]
pub struct ScoringEngine {
    profile: ScoringProfile,
}

impl ScoringEngine {
    pub fn new(profile: ScoringProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &ScoringProfile {
        &self.profile
    }

    /// Scores every offer against the rest of the group, preserving input order.
    pub fn score_all<'a, T: Scorable>(&self, offers: &'a [T]) -> Vec<ScoredOffer<'a, T>> {
        if offers.is_empty() {
            return Vec::new();
        }

        let prices = Range::of(offers.iter().map(|offer| offer.price()));
        let stocks = Range::of(offers.iter().map(|offer| Decimal::from(offer.stock())));
        let days = Range::of(offers.iter().map(|offer| Decimal::from(offer.delivery_days())));
        let weights = self.profile.weights;

        offers
            .iter()
            .enumerate()
            .map(|(index, offer)| {
                let price = prices.lower_is_better(offer.price());
                let stock = match self.profile.stock {
                    StockScoring::MinMax => stocks.higher_is_better(Decimal::from(offer.stock())),
                    StockScoring::LinearCap { reference } => linear_cap(offer.stock(), reference),
                };
                let delivery = days.lower_is_better(Decimal::from(offer.delivery_days()));
                let total =
                    price * weights.price + stock * weights.stock + delivery * weights.delivery;

                ScoredOffer {
                    offer,
                    index,
                    score: ScoreBreakdown {
                        price: round_score(price),
                        stock: round_score(stock),
                        delivery: round_score(delivery),
                        total: round_score(total),
                    },
                }
            })
            .collect()
    }

    /// Highest total wins; on equal totals the earlier offer keeps the lead.
    pub fn select_best<'a, T: Scorable>(&self, offers: &'a [T]) -> Option<ScoredOffer<'a, T>> {
        let mut best: Option<ScoredOffer<'a, T>> = None;
        for candidate in self.score_all(offers) {
            let replace = match &best {
                Some(current) => candidate.score.total > current.score.total,
                None => true,
            };
            if replace {
                best = Some(candidate);
            }
        }
        best
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(ScoringProfile::quotation())
    }
}

/// Reorders ranked winners so no single distributor crowds the head of the
/// list. With more than three items and at least two distributors, each
/// distributor keeps at most `ceil(total / distributors)` slots in score
/// order; the overflow follows, again by descending score.
pub fn balance_by_distributor<T, K, FK, FS>(items: Vec<T>, key: FK, score: FS) -> Vec<T>
where
    K: Eq + Hash,
    FK: Fn(&T) -> K,
    FS: Fn(&T) -> Decimal,
{
    let mut ranked = items;
    ranked.sort_by(|left, right| score(right).cmp(&score(left)));

    let distributor_count = {
        let mut seen = HashMap::new();
        for item in &ranked {
            seen.entry(key(item)).or_insert(());
        }
        seen.len()
    };
    if ranked.len() <= 3 || distributor_count < 2 {
        return ranked;
    }

    let quota = ranked.len().div_ceil(distributor_count);
    let mut taken: HashMap<K, usize> = HashMap::new();
    let mut head = Vec::with_capacity(ranked.len());
    let mut overflow = Vec::new();

    for item in ranked {
        let count = taken.entry(key(&item)).or_insert(0);
        if *count < quota {
            *count += 1;
            head.push(item);
        } else {
            overflow.push(item);
        }
    }

    head.extend(overflow);
    head
}

struct Range {
    min: Decimal,
    max: Decimal,
}

impl Range {
    fn of(values: impl Iterator<Item = Decimal>) -> Self {
        let mut min: Option<Decimal> = None;
        let mut max: Option<Decimal> = None;
        for value in values {
            min = Some(min.map_or(value, |current| current.min(value)));
            max = Some(max.map_or(value, |current| current.max(value)));
        }
        Self { min: min.unwrap_or_default(), max: max.unwrap_or_default() }
    }

    fn lower_is_better(&self, value: Decimal) -> Decimal {
        if self.max == self.min {
            return Decimal::ONE_HUNDRED;
        }
        (self.max - value) / (self.max - self.min) * Decimal::ONE_HUNDRED
    }

    fn higher_is_better(&self, value: Decimal) -> Decimal {
        if self.max == self.min {
            return Decimal::ONE_HUNDRED;
        }
        (value - self.min) / (self.max - self.min) * Decimal::ONE_HUNDRED
    }
}

fn linear_cap(stock: u32, reference: u32) -> Decimal {
    if stock == 0 || reference == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(stock.min(reference)) / Decimal::from(reference) * Decimal::ONE_HUNDRED
}

fn round_score(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
