// src/encode/arith/model.rs

//! Adaptive order-K Markov frequency model over the byte alphabet.

use super::ArithmeticError;
use std::collections::HashMap;

/// Number of distinct symbols (bytes).
pub const ALPHABET_SIZE: usize = 256;

/// Largest supported context length; keys pack into a `u32`.
pub const MAX_ORDER: usize = 4;

/// Tuning of the count tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelParams {
    /// Initial count of every symbol in a fresh context. Must be positive.
    pub prior: u32,
    /// Amount added to a symbol's count each time it is coded.
    pub increment: u32,
    /// Ceiling on a context's total count. Reaching it halves the table.
    pub max_total: u32,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            prior: 1,
            increment: 32,
            max_total: 1 << 24,
        }
    }
}

impl ModelParams {
    pub fn validate(&self) -> Result<(), ArithmeticError> {
        if self.prior == 0 || self.increment == 0 {
            return Err(ArithmeticError::InvalidParams(
                "prior and increment must be positive".to_string(),
            ));
        }
        if self.max_total > super::MAX_TOTAL_FREQUENCY {
            return Err(ArithmeticError::FrequencyOverflow {
                total: self.max_total as u64,
                limit: super::MAX_TOTAL_FREQUENCY as u64,
            });
        }
        let floor = (ALPHABET_SIZE as u64) * self.prior as u64 + self.increment as u64;
        if floor > self.max_total as u64 {
            return Err(ArithmeticError::FrequencyOverflow {
                total: floor,
                limit: self.max_total as u64,
            });
        }
        Ok(())
    }
}

/// The last `order` coded symbols, most recent in the low byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ContextKey(u32);

impl ContextKey {
    /// Builds the key for the context that follows `history`. Missing
    /// leading symbols count as zero.
    pub fn from_history(history: &[u8], order: usize) -> Self {
        let start = history.len().saturating_sub(order);
        history[start..]
            .iter()
            .fold(ContextKey::default(), |key, &s| key.shifted(s, order))
    }

    #[inline]
    pub fn shifted(self, symbol: u8, order: usize) -> Self {
        match order {
            0 => self,
            k if k < MAX_ORDER => {
                ContextKey(((self.0 << 8) | symbol as u32) & ((1u32 << (8 * k)) - 1))
            }
            _ => ContextKey((self.0 << 8) | symbol as u32),
        }
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

/// Count table of one context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: [u32; ALPHABET_SIZE],
    total: u32,
}

impl FrequencyTable {
    pub fn uniform(prior: u32) -> Self {
        Self {
            counts: [prior; ALPHABET_SIZE],
            total: prior * ALPHABET_SIZE as u32,
        }
    }

    #[inline]
    pub fn frequency(&self, symbol: u8) -> u32 {
        self.counts[symbol as usize]
    }

    #[inline]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Cumulative range `[low, high)` of `symbol`.
    pub fn range(&self, symbol: u8) -> (u32, u32) {
        let low: u32 = self.counts[..symbol as usize].iter().sum();
        (low, low + self.counts[symbol as usize])
    }

    /// Symbol whose cumulative range contains `target`.
    pub fn find(&self, target: u32) -> Option<(u8, u32, u32)> {
        let mut low = 0u32;
        for (symbol, &count) in self.counts.iter().enumerate() {
            let high = low + count;
            if target < high {
                return Some((symbol as u8, low, high));
            }
            low = high;
        }
        None
    }

    fn increment(&mut self, symbol: u8, by: u32, max_total: u32) {
        while self.total + by > max_total {
            self.halve();
        }
        self.counts[symbol as usize] += by;
        self.total += by;
    }

    // Rounds up so that no count drops to zero.
    fn halve(&mut self) {
        let mut total = 0;
        for c in self.counts.iter_mut() {
            *c = (*c + 1) / 2;
            total += *c;
        }
        self.total = total;
    }
}

/// Read-only view of the distribution predicted for one context.
#[derive(Debug, Clone, Copy)]
pub struct Distribution<'a> {
    table: &'a FrequencyTable,
}

impl<'a> Distribution<'a> {
    pub fn probability(&self, symbol: u8) -> f64 {
        self.table.frequency(symbol) as f64 / self.table.total() as f64
    }

    pub fn probabilities(&self) -> Vec<f64> {
        (0..=255u8).map(|s| self.probability(s)).collect()
    }

    pub fn frequency(&self, symbol: u8) -> u32 {
        self.table.frequency(symbol)
    }

    pub fn total(&self) -> u32 {
        self.table.total()
    }

    pub fn range(&self, symbol: u8) -> (u32, u32) {
        self.table.range(symbol)
    }

    pub fn find(&self, target: u32) -> Option<(u8, u32, u32)> {
        self.table.find(target)
    }

    /// Most probable symbol; ties go to the lowest byte value.
    pub fn most_probable(&self) -> u8 {
        (0..=255u8)
            .max_by_key(|&s| (self.table.frequency(s), std::cmp::Reverse(s)))
            .unwrap_or(0)
    }
}

/// Order-K context model. One instance serves one stream and is discarded
/// afterwards; encoder and decoder each build their own and must feed it the
/// same symbols in the same order.
#[derive(Debug, Clone)]
pub struct ContextModel {
    order: usize,
    params: ModelParams,
    prior: FrequencyTable,
    tables: HashMap<ContextKey, Box<FrequencyTable>>,
    history: ContextKey,
}

impl ContextModel {
    pub fn new(order: usize, params: ModelParams) -> Result<Self, ArithmeticError> {
        if order > MAX_ORDER {
            return Err(ArithmeticError::InvalidOrder(order));
        }
        params.validate()?;
        Ok(Self {
            order,
            params,
            prior: FrequencyTable::uniform(params.prior),
            tables: HashMap::new(),
            history: ContextKey::default(),
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    /// Context formed by the symbols observed so far.
    pub fn context(&self) -> ContextKey {
        self.history
    }

    /// Distribution for `context`. Unseen contexts get the smoothed prior.
    pub fn predict(&self, context: ContextKey) -> Distribution<'_> {
        let table = self
            .tables
            .get(&context)
            .map(|t| t.as_ref())
            .unwrap_or(&self.prior);
        Distribution { table }
    }

    /// Counts one occurrence of `symbol` under `context`.
    pub fn update(&mut self, context: ContextKey, symbol: u8) {
        let ModelParams {
            increment,
            max_total,
            ..
        } = self.params;
        let prior = &self.prior;
        self.tables
            .entry(context)
            .or_insert_with(|| Box::new(prior.clone()))
            .increment(symbol, increment, max_total);
    }

    /// Updates the current context with `symbol` and moves the history on.
    pub fn observe(&mut self, symbol: u8) {
        let context = self.history;
        self.update(context, symbol);
        self.history = context.shifted(symbol, self.order);
    }

    /// Number of contexts that have received at least one update.
    pub fn contexts_seen(&self) -> usize {
        self.tables.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(order: usize) -> ContextModel {
        ContextModel::new(order, ModelParams::default()).unwrap()
    }

    fn assert_normalized(dist: &Distribution<'_>) {
        let probs = dist.probabilities();
        assert_eq!(probs.len(), ALPHABET_SIZE);
        assert!(probs.iter().all(|&p| p > 0.0));
        let sum: f64 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9, "sum = {}", sum);
    }

    #[test]
    fn test_unseen_context_is_uniform() {
        let m = model(3);
        let dist = m.predict(ContextKey::from_history(b"xyz", 3));
        for s in 0..=255u8 {
            assert!((dist.probability(s) - 1.0 / 256.0).abs() < 1e-12);
        }
        assert_normalized(&dist);
    }

    #[test]
    fn test_repeated_symbol_dominates() {
        let mut m = model(3);
        for _ in 0..1000 {
            m.observe(0x41);
        }
        let dist = m.predict(ContextKey::from_history(b"AAA", 3));
        assert!(dist.probability(0x41) > 0.99, "p = {}", dist.probability(0x41));
        assert_eq!(dist.most_probable(), 0x41);
        assert_normalized(&dist);
    }

    #[test]
    fn test_probabilities_stay_positive_after_updates() {
        let mut m = model(1);
        for i in 0..5000u32 {
            m.observe((i % 3) as u8);
        }
        for prev in 0..3u8 {
            assert_normalized(&m.predict(ContextKey::from_history(&[prev], 1)));
        }
    }

    #[test]
    fn test_context_key_shifting() {
        let k = ContextKey::from_history(&[1, 2, 3, 4, 5], 3);
        assert_eq!(k.value(), 0x030405);
        assert_eq!(k.shifted(6, 3).value(), 0x040506);
        assert_eq!(ContextKey::from_history(&[9], 3).value(), 0x000009);
        assert_eq!(ContextKey::from_history(&[1, 2, 3, 4, 5], 4).value(), 0x02030405);
        assert_eq!(ContextKey::from_history(&[1, 2], 0).value(), 0);
    }

    #[test]
    fn test_observe_tracks_history() {
        let mut m = model(2);
        m.observe(7);
        m.observe(8);
        assert_eq!(m.context(), ContextKey::from_history(&[7, 8], 2));
        assert_eq!(m.contexts_seen(), 2);
        let after_7 = m.predict(ContextKey::from_history(&[7], 2));
        assert_eq!(after_7.frequency(8), 1 + 32);
    }

    #[test]
    fn test_halving_keeps_counts_positive() {
        let params = ModelParams {
            prior: 1,
            increment: 100,
            max_total: 1024,
        };
        let mut m = ContextModel::new(0, params).unwrap();
        for _ in 0..200 {
            m.observe(3);
        }
        let dist = m.predict(ContextKey::default());
        assert!(dist.total() <= 1024);
        assert!((0..=255u8).all(|s| dist.frequency(s) >= 1));
        assert_normalized(&dist);
    }

    #[test]
    fn test_find_matches_range() {
        let mut m = model(0);
        m.observe(10);
        m.observe(200);
        let dist = m.predict(ContextKey::default());
        for s in [0u8, 10, 11, 200, 255] {
            let (low, high) = dist.range(s);
            assert_eq!(dist.find(low), Some((s, low, high)));
            assert_eq!(dist.find(high - 1), Some((s, low, high)));
        }
        assert_eq!(dist.find(dist.total()), None);
    }

    #[test]
    fn test_rejects_bad_configuration() {
        assert!(matches!(
            ContextModel::new(5, ModelParams::default()),
            Err(ArithmeticError::InvalidOrder(5))
        ));
        let zero_prior = ModelParams {
            prior: 0,
            ..ModelParams::default()
        };
        assert!(ContextModel::new(3, zero_prior).is_err());
        let too_small = ModelParams {
            max_total: 256,
            ..ModelParams::default()
        };
        assert!(ContextModel::new(3, too_small).is_err());
    }
}
