//! Bounded memo of traced curves.
//!
//! Interactive hosts re-plot the same field over the same view many
//! times (redraws, toggling visibility). [`CurveCache`] keeps the most
//! recent results keyed by field identity, box and configuration, and
//! evicts the oldest insertion once full.

use std::collections::{HashMap, VecDeque};
use std::hash::BuildHasherDefault;

use siphasher::sip::SipHasher13;

use crate::config::IsolineConfig;
use crate::field::ScalarField;
use crate::types::{Bounds, IsolineError, Polyline};

/// Identity of one engine invocation.
///
/// `field_id` names the field (for an expression-driven host, the
/// expression text). Floating-point parameters are compared by bit
/// pattern with `-0.0` folded into `0.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    field_id: String,
    min: Vec<u64>,
    max: Vec<u64>,
    min_depth: u32,
    max_cells: usize,
    tolerance: Option<Vec<u64>>,
}

impl CacheKey {
    /// Key for plotting the field named `field_id` over `bounds` with
    /// `config`.
    #[must_use]
    pub fn new(field_id: impl Into<String>, bounds: &Bounds, config: &IsolineConfig) -> Self {
        Self {
            field_id: field_id.into(),
            min: bits(bounds.min().coords()),
            max: bits(bounds.max().coords()),
            min_depth: config.min_depth,
            max_cells: config.max_cells,
            tolerance: config.tolerance.as_deref().map(bits),
        }
    }

    /// The field name this key was built from.
    #[must_use]
    pub fn field_id(&self) -> &str {
        &self.field_id
    }
}

fn bits(values: &[f64]) -> Vec<u64> {
    values
        .iter()
        .map(|&v| if v == 0.0 { 0 } else { v.to_bits() })
        .collect()
}

/// FIFO-bounded map from [`CacheKey`] to traced curves.
#[derive(Debug, Clone)]
pub struct CurveCache {
    capacity: usize,
    entries: HashMap<CacheKey, Vec<Polyline>, BuildHasherDefault<SipHasher13>>,
    order: VecDeque<CacheKey>,
}

impl CurveCache {
    /// Entries kept by [`CurveCache::new`].
    pub const DEFAULT_CAPACITY: usize = 50;

    /// Empty cache holding up to [`DEFAULT_CAPACITY`](Self::DEFAULT_CAPACITY)
    /// entries.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Empty cache holding up to `capacity` entries (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity_and_hasher(capacity, BuildHasherDefault::default()),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Maximum number of entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached curves for `key`.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<&[Polyline]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Store `curves` under `key` and return them.
    ///
    /// A new key evicts the oldest entries to make room. Replacing an
    /// existing key keeps its place in the eviction order.
    pub fn insert(&mut self, key: CacheKey, curves: Vec<Polyline>) -> &[Polyline] {
        if !self.entries.contains_key(&key) {
            while self.order.len() >= self.capacity {
                let Some(oldest) = self.order.pop_front() else {
                    break;
                };
                log::trace!("evicting cached curves for {:?}", oldest.field_id);
                self.entries.remove(&oldest);
            }
            self.order.push_back(key.clone());
        }
        let slot = self.entries.entry(key).or_default();
        *slot = curves;
        slot
    }

    /// Cached curves for `key`, computing and storing them on a miss.
    ///
    /// # Errors
    ///
    /// Propagates the error from `compute`; nothing is stored then.
    pub fn get_or_try_insert_with<E, F>(
        &mut self,
        key: CacheKey,
        compute: F,
    ) -> Result<&[Polyline], E>
    where
        F: FnOnce() -> Result<Vec<Polyline>, E>,
    {
        if self.entries.contains_key(&key) {
            return Ok(self.entries.get(&key).map_or(&[][..], Vec::as_slice));
        }
        let curves = compute()?;
        Ok(self.insert(key, curves))
    }

    /// [`plot_isoline`](crate::plot_isoline) through the cache.
    ///
    /// # Errors
    ///
    /// Same as [`plot_isoline`](crate::plot_isoline).
    pub fn plot<F: ScalarField + ?Sized>(
        &mut self,
        field_id: &str,
        field: &F,
        bounds: &Bounds,
        config: &IsolineConfig,
    ) -> Result<&[Polyline], IsolineError> {
        let key = CacheKey::new(field_id, bounds, config);
        self.get_or_try_insert_with(key, || crate::plot_isoline(field, bounds, config))
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

impl Default for CurveCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::types::Point;

    fn unit_box() -> Bounds {
        Bounds::xy(-2.0, -2.0, 2.0, 2.0).unwrap()
    }

    fn key(name: &str) -> CacheKey {
        CacheKey::new(name, &unit_box(), &IsolineConfig::default())
    }

    fn curve(x: f64) -> Vec<Polyline> {
        vec![Polyline::new(vec![Point::xy(x, 0.0), Point::xy(x, 1.0)])]
    }

    #[test]
    fn keys_distinguish_parameters() {
        let bounds = unit_box();
        let base = CacheKey::new("x^2+y^2-1", &bounds, &IsolineConfig::default());
        let deeper = CacheKey::new(
            "x^2+y^2-1",
            &bounds,
            &IsolineConfig {
                min_depth: 6,
                ..IsolineConfig::default()
            },
        );
        let moved = CacheKey::new(
            "x^2+y^2-1",
            &Bounds::xy(-2.0, -2.0, 2.0, 3.0).unwrap(),
            &IsolineConfig::default(),
        );
        assert_ne!(base, deeper);
        assert_ne!(base, moved);
        assert_eq!(base, CacheKey::new("x^2+y^2-1", &bounds, &IsolineConfig::default()));
        assert_eq!(base.field_id(), "x^2+y^2-1");
    }

    #[test]
    fn negative_zero_matches_zero() {
        let a = Bounds::xy(0.0, 0.0, 1.0, 1.0).unwrap();
        let b = Bounds::xy(-0.0, 0.0, 1.0, 1.0).unwrap();
        let config = IsolineConfig::default();
        assert_eq!(CacheKey::new("f", &a, &config), CacheKey::new("f", &b, &config));
    }

    #[test]
    fn oldest_entry_is_evicted() {
        let mut cache = CurveCache::with_capacity(2);
        cache.insert(key("a"), curve(1.0));
        cache.insert(key("b"), curve(2.0));
        cache.insert(key("c"), curve(3.0));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key("a")).is_none());
        assert!(cache.get(&key("b")).is_some());
        assert!(cache.get(&key("c")).is_some());
    }

    #[test]
    fn replacing_keeps_eviction_order() {
        let mut cache = CurveCache::with_capacity(2);
        cache.insert(key("a"), curve(1.0));
        cache.insert(key("b"), curve(2.0));
        cache.insert(key("a"), curve(5.0));
        assert_eq!(cache.get(&key("a")).unwrap(), curve(5.0).as_slice());
        cache.insert(key("c"), curve(3.0));
        assert!(cache.get(&key("a")).is_none());
        assert!(cache.get(&key("b")).is_some());
    }

    #[test]
    fn default_capacity_is_fifty() {
        let mut cache = CurveCache::default();
        assert_eq!(cache.capacity(), CurveCache::DEFAULT_CAPACITY);
        for i in 0..60 {
            cache.insert(key(&i.to_string()), Vec::new());
        }
        assert_eq!(cache.len(), 50);
        assert!(cache.get(&key("9")).is_none());
        assert!(cache.get(&key("10")).is_some());
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut cache = CurveCache::with_capacity(0);
        assert_eq!(cache.capacity(), 1);
        cache.insert(key("a"), curve(1.0));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn compute_runs_once_per_key() {
        let mut cache = CurveCache::new();
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            Ok::<_, IsolineError>(curve(1.0))
        };
        cache.get_or_try_insert_with(key("a"), compute).unwrap();
        cache.get_or_try_insert_with(key("a"), compute).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn failed_compute_stores_nothing() {
        let mut cache = CurveCache::new();
        let result = cache.get_or_try_insert_with(key("a"), || {
            Err(IsolineError::InvalidConfig("boom".to_string()))
        });
        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn plot_caches_engine_output() {
        let circle = |p: &[f64]| p[0] * p[0] + p[1] * p[1] - 1.0;
        let config = IsolineConfig {
            min_depth: 3,
            ..IsolineConfig::default()
        };
        let mut cache = CurveCache::new();
        let first = cache
            .plot("circle", &circle, &unit_box(), &config)
            .unwrap()
            .to_vec();
        assert!(!first.is_empty());
        let key = CacheKey::new("circle", &unit_box(), &config);
        assert_eq!(cache.get(&key).unwrap(), first.as_slice());

        cache.clear();
        assert!(cache.is_empty());
    }
}
