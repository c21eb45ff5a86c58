//! Mapper/Filter (§4.7): a pure element-wise transform over one upstream
//! node, with the option to drop an element (`None`). Used for computed
//! measures, the `having` filter, and attribute resolution downstream of a
//! merge reducer.

use crate::error::Error;
use crate::node::{Node, Produced};
use data_types::Record;

pub struct Mapper<F> {
    upstream: Box<dyn Node>,
    transform: F,
}

impl<F> Mapper<F>
where
    F: FnMut(Record) -> Option<Record>,
{
    pub fn new(upstream: Box<dyn Node>, transform: F) -> Self {
        Self { upstream, transform }
    }
}

impl<F> std::fmt::Debug for Mapper<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapper").field("upstream", &self.upstream).finish()
    }
}

impl<F> Node for Mapper<F>
where
    F: FnMut(Record) -> Option<Record>,
{
    fn produce(&mut self) -> Result<Produced, Error> {
        loop {
            match self.upstream.produce()? {
                Produced::Item(item) => {
                    if let Some(mapped) = (self.transform)(item) {
                        return Ok(Produced::Item(mapped));
                    }
                    // Dropped: keep pulling rather than returning a hole.
                }
                other => return Ok(other),
            }
        }
    }

    fn suspend(&mut self) {
        self.upstream.suspend();
    }

    fn resume(&mut self) {
        self.upstream.resume();
    }

    fn close_with_error(&mut self, err: Error) {
        self.upstream.close_with_error(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::VecSource;
    use predicate::Value;

    fn rec(n: i64) -> Record {
        Record::new().with_field("n", Value::i64(n))
    }

    #[test]
    fn filters_drop_elements_transparently() {
        let src = VecSource::new(vec![rec(1), rec(2), rec(3)]);
        let mut mapper = Mapper::new(Box::new(src), |r| {
            match r.get("n") {
                Some(Value::I64(n)) if n % 2 == 0 => Some(r),
                _ => None,
            }
        });
        assert_eq!(mapper.produce().unwrap(), Produced::Item(rec(2)));
        assert_eq!(mapper.produce().unwrap(), Produced::EndOfStream);
    }

    #[test]
    fn maps_transform_every_surviving_element() {
        let src = VecSource::new(vec![rec(1), rec(2)]);
        let mut mapper = Mapper::new(Box::new(src), |r| {
            let n = match r.get("n") {
                Some(Value::I64(n)) => *n,
                _ => unreachable!(),
            };
            Some(Record::new().with_field("n", Value::i64(n * 10)))
        });
        assert_eq!(mapper.produce().unwrap(), Produced::Item(rec(10)));
        assert_eq!(mapper.produce().unwrap(), Produced::Item(rec(20)));
        assert_eq!(mapper.produce().unwrap(), Produced::EndOfStream);
    }
}
