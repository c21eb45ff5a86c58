//! `AggregationPredicate`: the symbolic AND/OR/EQ/BETWEEN algebra (§4.2),
//! its canonical simplifier, the fully-specified-dimension extractor, and
//! the recursive evaluator.

use crate::value::{Fields, Value};
use std::collections::{BTreeMap, BTreeSet};

/// A symbolic predicate over dimension values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregationPredicate {
    AlwaysTrue,
    AlwaysFalse,
    Eq(String, Value),
    NotEq(String, Value),
    /// Inclusive range `lo <= v <= hi`.
    Between(String, Value, Value),
    In(String, BTreeSet<Value>),
    Not(Box<AggregationPredicate>),
    And(Vec<AggregationPredicate>),
    Or(Vec<AggregationPredicate>),
}

impl AggregationPredicate {
    pub fn and(terms: impl IntoIterator<Item = Self>) -> Self {
        Self::And(terms.into_iter().collect())
    }

    pub fn or(terms: impl IntoIterator<Item = Self>) -> Self {
        Self::Or(terms.into_iter().collect())
    }

    /// The set of dimensions mentioned anywhere in this predicate.
    pub fn dimensions_of(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_dimensions(&mut out);
        out
    }

    fn collect_dimensions(&self, out: &mut BTreeSet<String>) {
        match self {
            Self::AlwaysTrue | Self::AlwaysFalse => {}
            Self::Eq(d, _) | Self::NotEq(d, _) | Self::Between(d, _, _) | Self::In(d, _) => {
                out.insert(d.clone());
            }
            Self::Not(p) => p.collect_dimensions(out),
            Self::And(ps) | Self::Or(ps) => {
                for p in ps {
                    p.collect_dimensions(out);
                }
            }
        }
    }

    /// Recursively evaluate this predicate against `record`. Call on an
    /// already-simplified predicate if you want `simplify`'s
    /// short-circuits; unsimplified predicates evaluate just as soundly,
    /// only less efficiently.
    pub fn matches(&self, record: &impl Fields) -> bool {
        match self {
            Self::AlwaysTrue => true,
            Self::AlwaysFalse => false,
            Self::Eq(d, v) => record.field(d) == Some(v),
            Self::NotEq(d, v) => record.field(d) != Some(v),
            Self::Between(d, lo, hi) => match record.field(d) {
                Some(v) => v >= lo && v <= hi,
                None => false,
            },
            Self::In(d, set) => match record.field(d) {
                Some(v) => set.contains(v),
                None => false,
            },
            Self::Not(p) => !p.matches(record),
            Self::And(ps) => ps.iter().all(|p| p.matches(record)),
            Self::Or(ps) => ps.iter().any(|p| p.matches(record)),
        }
    }

    /// Canonicalise this predicate per the rules in §4.2. Idempotent:
    /// `simplify(simplify(p)) == simplify(p)`.
    pub fn simplify(&self) -> Self {
        match self {
            Self::AlwaysTrue | Self::AlwaysFalse => self.clone(),
            Self::Eq(d, v) => Self::Eq(d.clone(), v.clone()),
            Self::NotEq(d, v) => Self::NotEq(d.clone(), v.clone()),
            Self::Between(d, lo, hi) => {
                if hi < lo {
                    Self::AlwaysFalse
                } else {
                    Self::Between(d.clone(), lo.clone(), hi.clone())
                }
            }
            Self::In(d, set) => {
                if set.is_empty() {
                    Self::AlwaysFalse
                } else if set.len() == 1 {
                    Self::Eq(d.clone(), set.iter().next().unwrap().clone())
                } else {
                    Self::In(d.clone(), set.clone())
                }
            }
            Self::Not(p) => match p.simplify() {
                Self::AlwaysTrue => Self::AlwaysFalse,
                Self::AlwaysFalse => Self::AlwaysTrue,
                Self::Not(inner) => *inner,
                other => Self::Not(Box::new(other)),
            },
            Self::And(terms) => simplify_and(terms),
            Self::Or(terms) => simplify_or(terms),
        }
    }

    /// For every dimension `simplify(self)` pins to exactly one value via a
    /// top-level conjunction of `Eq`s, the value it is pinned to.
    pub fn fully_specified(&self) -> BTreeMap<String, Value> {
        let mut out = BTreeMap::new();
        match self.simplify() {
            Self::Eq(d, v) => {
                out.insert(d, v);
            }
            Self::And(terms) => {
                for term in terms {
                    if let Self::Eq(d, v) = term {
                        out.insert(d, v);
                    }
                }
            }
            _ => {}
        }
        out
    }
}

fn flatten_and(terms: &[AggregationPredicate]) -> Vec<AggregationPredicate> {
    let mut flat = Vec::with_capacity(terms.len());
    for term in terms {
        match term.simplify() {
            AggregationPredicate::And(inner) => flat.extend(inner),
            AggregationPredicate::AlwaysTrue => {}
            other => flat.push(other),
        }
    }
    flat
}

fn simplify_and(terms: &[AggregationPredicate]) -> AggregationPredicate {
    use AggregationPredicate::*;

    let flat = flatten_and(terms);
    if flat.iter().any(|t| matches!(t, AlwaysFalse)) {
        return AlwaysFalse;
    }

    // Merge per-dimension Eq/Between refinements; everything else passes
    // through untouched, in sorted order for a deterministic (idempotent)
    // canonical form.
    let mut eq: BTreeMap<String, Value> = BTreeMap::new();
    let mut between: BTreeMap<String, (Value, Value)> = BTreeMap::new();
    let mut other: Vec<AggregationPredicate> = Vec::new();

    for term in flat {
        match term {
            Eq(d, v) => {
                if let Some(existing) = eq.get(&d) {
                    if existing != &v {
                        return AlwaysFalse;
                    }
                } else {
                    eq.insert(d, v);
                }
            }
            Between(d, lo, hi) => {
                if let Some((elo, ehi)) = between.get(&d) {
                    let new_lo = if &lo > elo { lo } else { elo.clone() };
                    let new_hi = if &hi < ehi { hi } else { ehi.clone() };
                    between.insert(d, (new_lo, new_hi));
                } else {
                    between.insert(d, (lo, hi));
                }
            }
            other_term => other.push(other_term),
        }
    }

    // Reconcile Eq against Between on the same dimension: Eq wins if in
    // range, else the conjunction is unsatisfiable.
    for (d, v) in eq.iter() {
        if let Some((lo, hi)) = between.remove(d) {
            if v < &lo || v > &hi {
                return AlwaysFalse;
            }
        }
    }
    for (_, (lo, hi)) in between.iter() {
        if hi < lo {
            return AlwaysFalse;
        }
    }

    let mut out: Vec<AggregationPredicate> = eq.into_iter().map(|(d, v)| Eq(d, v)).collect();
    out.extend(between.into_iter().map(|(d, (lo, hi))| Between(d, lo, hi)));
    out.extend(other);

    match out.len() {
        0 => AlwaysTrue,
        1 => out.into_iter().next().unwrap(),
        _ => And(out),
    }
}

fn simplify_or(terms: &[AggregationPredicate]) -> AggregationPredicate {
    use AggregationPredicate::*;

    let mut flat = Vec::with_capacity(terms.len());
    for term in terms {
        match term.simplify() {
            Or(inner) => flat.extend(inner),
            AlwaysFalse => {}
            other => flat.push(other),
        }
    }
    if flat.iter().any(|t| matches!(t, AlwaysTrue)) {
        return AlwaysTrue;
    }

    match flat.len() {
        0 => AlwaysFalse,
        1 => flat.into_iter().next().unwrap(),
        _ => Or(flat),
    }
}
