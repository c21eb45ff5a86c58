//! The `Aggregator` capability set (§3): `zero`, `init_from_value`,
//! `reduce`, `finalize`. Every reserved aggregator treats `Accumulator::Empty`
//! as the identity element, which is what makes the aggregator law
//! `reduce(zero, x) == init_from_value(x)` hold uniformly (§8).

use crate::error::{self, Error, Result};
use cube_time::Time;
use predicate::Value;
use std::fmt;

/// Opaque accumulator state. `Empty` is `zero()` for every reserved
/// aggregator; aggregators that need more than a bare `Value` (`Last`,
/// the HLL family) carry their own variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Empty,
    Value(Value),
    Last { at: Time, value: Value },
    Hll(Vec<u8>),
}

/// A commutative, associative reduction over measure values.
///
/// `at` is threaded through `init_from_value` even for aggregators that
/// ignore it (Sum/Min/Max/Hll) so `Last` can be ordered without a separate
/// trait shape — every record arrives with an ingest timestamp regardless
/// of which aggregator consumes it.
pub trait Aggregator: fmt::Debug + Send + Sync {
    fn zero(&self) -> Accumulator {
        Accumulator::Empty
    }

    fn init_from_value(&self, at: Time, v: &Value) -> Accumulator;

    fn reduce(&self, dst: &Accumulator, src: &Accumulator) -> Accumulator;

    /// Combine a raw value straight into an existing accumulator. Default
    /// impl goes through `init_from_value` + `reduce`.
    fn reduce_value(&self, dst: &Accumulator, at: Time, v: &Value) -> Accumulator {
        self.reduce(dst, &self.init_from_value(at, v))
    }

    fn finalize(&self, acc: &Accumulator) -> Result<Value>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SumI64;

impl Aggregator for SumI64 {
    fn init_from_value(&self, _at: Time, v: &Value) -> Accumulator {
        Accumulator::Value(v.clone())
    }

    fn reduce(&self, dst: &Accumulator, src: &Accumulator) -> Accumulator {
        match (dst, src) {
            (Accumulator::Empty, other) | (other, Accumulator::Empty) => other.clone(),
            (Accumulator::Value(Value::I64(a)), Accumulator::Value(Value::I64(b))) => {
                Accumulator::Value(Value::i64(a.wrapping_add(*b)))
            }
            _ => dst.clone(),
        }
    }

    fn finalize(&self, acc: &Accumulator) -> Result<Value> {
        match acc {
            Accumulator::Value(v) => Ok(v.clone()),
            Accumulator::Empty => error::EmptyAccumulatorSnafu.fail(),
            _ => error::EmptyAccumulatorSnafu.fail(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SumF64;

impl Aggregator for SumF64 {
    fn init_from_value(&self, _at: Time, v: &Value) -> Accumulator {
        Accumulator::Value(v.clone())
    }

    fn reduce(&self, dst: &Accumulator, src: &Accumulator) -> Accumulator {
        match (dst, src) {
            (Accumulator::Empty, other) | (other, Accumulator::Empty) => other.clone(),
            (Accumulator::Value(Value::F64(a)), Accumulator::Value(Value::F64(b))) => {
                Accumulator::Value(Value::f64(a.into_inner() + b.into_inner()))
            }
            _ => dst.clone(),
        }
    }

    fn finalize(&self, acc: &Accumulator) -> Result<Value> {
        match acc {
            Accumulator::Value(v) => Ok(v.clone()),
            _ => error::EmptyAccumulatorSnafu.fail(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Min;

impl Aggregator for Min {
    fn init_from_value(&self, _at: Time, v: &Value) -> Accumulator {
        Accumulator::Value(v.clone())
    }

    fn reduce(&self, dst: &Accumulator, src: &Accumulator) -> Accumulator {
        match (dst, src) {
            (Accumulator::Empty, other) | (other, Accumulator::Empty) => other.clone(),
            (Accumulator::Value(a), Accumulator::Value(b)) => {
                Accumulator::Value(if a <= b { a.clone() } else { b.clone() })
            }
            _ => dst.clone(),
        }
    }

    fn finalize(&self, acc: &Accumulator) -> Result<Value> {
        match acc {
            Accumulator::Value(v) => Ok(v.clone()),
            _ => error::EmptyAccumulatorSnafu.fail(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Max;

impl Aggregator for Max {
    fn init_from_value(&self, _at: Time, v: &Value) -> Accumulator {
        Accumulator::Value(v.clone())
    }

    fn reduce(&self, dst: &Accumulator, src: &Accumulator) -> Accumulator {
        match (dst, src) {
            (Accumulator::Empty, other) | (other, Accumulator::Empty) => other.clone(),
            (Accumulator::Value(a), Accumulator::Value(b)) => {
                Accumulator::Value(if a >= b { a.clone() } else { b.clone() })
            }
            _ => dst.clone(),
        }
    }

    fn finalize(&self, acc: &Accumulator) -> Result<Value> {
        match acc {
            Accumulator::Value(v) => Ok(v.clone()),
            _ => error::EmptyAccumulatorSnafu.fail(),
        }
    }
}

/// LAST-by-time: keeps the value with the greatest ordering time seen so
/// far. On a tie, keeps `src` — the later argument in reduction order —
/// so that within one streaming pass later-arriving records win.
#[derive(Debug, Clone, Copy, Default)]
pub struct Last;

impl Aggregator for Last {
    fn init_from_value(&self, at: Time, v: &Value) -> Accumulator {
        Accumulator::Last {
            at,
            value: v.clone(),
        }
    }

    fn reduce(&self, dst: &Accumulator, src: &Accumulator) -> Accumulator {
        match (dst, src) {
            (Accumulator::Empty, other) | (other, Accumulator::Empty) => other.clone(),
            (Accumulator::Last { at: at_d, .. }, Accumulator::Last { at: at_s, .. }) => {
                if at_s >= at_d {
                    src.clone()
                } else {
                    dst.clone()
                }
            }
            _ => dst.clone(),
        }
    }

    fn finalize(&self, acc: &Accumulator) -> Result<Value> {
        match acc {
            Accumulator::Last { value, .. } => Ok(value.clone()),
            _ => error::EmptyAccumulatorSnafu.fail(),
        }
    }
}

const HLL_REGISTERS: usize = 16;
const HLLPP_REGISTERS: usize = 64;

fn hash64(v: &Value) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    v.hash(&mut hasher);
    hasher.finish()
}

fn hll_insert(registers: &mut [u8], v: &Value) {
    let h = hash64(v);
    let num_regs = registers.len() as u64;
    let idx = (h % num_regs) as usize;
    let rank = (h / num_regs).trailing_zeros() as u8 + 1;
    if rank > registers[idx] {
        registers[idx] = rank;
    }
}

fn hll_union(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b.iter()).map(|(x, y)| *x.max(y)).collect()
}

/// Raw cardinality estimate: harmonic mean of `2^-register` scaled by
/// `alpha * m^2`, the textbook HLL formula. Not bias-corrected; this is
/// a sketch aggregator satisfying the commutative/associative contract,
/// not a production cardinality estimator.
fn hll_estimate(registers: &[u8]) -> i64 {
    let m = registers.len() as f64;
    let alpha = 0.7213 / (1.0 + 1.079 / m);
    let sum: f64 = registers.iter().map(|&r| 2f64.powi(-(r as i32))).sum();
    (alpha * m * m / sum).round() as i64
}

/// Fixed-register HLL sketch aggregator (§3). Approximates distinct-value
/// counting with a bounded accumulator size.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hll;

impl Aggregator for Hll {
    fn init_from_value(&self, _at: Time, v: &Value) -> Accumulator {
        let mut registers = vec![0u8; HLL_REGISTERS];
        hll_insert(&mut registers, v);
        Accumulator::Hll(registers)
    }

    fn reduce(&self, dst: &Accumulator, src: &Accumulator) -> Accumulator {
        match (dst, src) {
            (Accumulator::Empty, other) | (other, Accumulator::Empty) => other.clone(),
            (Accumulator::Hll(a), Accumulator::Hll(b)) => Accumulator::Hll(hll_union(a, b)),
            _ => dst.clone(),
        }
    }

    fn finalize(&self, acc: &Accumulator) -> Result<Value> {
        match acc {
            Accumulator::Hll(registers) => Ok(Value::i64(hll_estimate(registers))),
            _ => error::EmptyAccumulatorSnafu.fail(),
        }
    }
}

/// Same sketch mechanism as [`Hll`] with a wider register file, standing
/// in for the source's HYPERLOG++ variant (§3). A true HLL++ bias
/// correction / sparse representation is out of scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct HyperLogPlusPlus;

impl Aggregator for HyperLogPlusPlus {
    fn init_from_value(&self, _at: Time, v: &Value) -> Accumulator {
        let mut registers = vec![0u8; HLLPP_REGISTERS];
        hll_insert(&mut registers, v);
        Accumulator::Hll(registers)
    }

    fn reduce(&self, dst: &Accumulator, src: &Accumulator) -> Accumulator {
        Hll.reduce(dst, src)
    }

    fn finalize(&self, acc: &Accumulator) -> Result<Value> {
        Hll.finalize(acc)
    }
}
