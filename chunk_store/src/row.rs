//! A physical record: the primary-key tuple plus the measure tuple, in the
//! order a chunk stores them (§4.4: "dimension order then measure order").

use predicate::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub key: Vec<Value>,
    pub measures: Vec<Value>,
}

impl Row {
    pub fn new(key: Vec<Value>, measures: Vec<Value>) -> Self {
        Self { key, measures }
    }
}
