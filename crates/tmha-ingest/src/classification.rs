//! Positional pairing of class codes with goods/services texts
//!
//! A `case-file` lists its international classes and its goods/services
//! statements separately, with nothing linking an entry in one list to an
//! entry in the other except declaration order. Entry `i` of the result
//! pairs classification `i` with goods text `i`.
//!
//! - Result length always equals the number of classification elements.
//! - Classifications past the end of the goods list get no text.
//! - Goods texts past the end of the classification list are unused.
//! - A missing or unparsable code is kept as `None`, never a sentinel.

use tmha_common::Classification;

use crate::cursor::XmlElement;

pub const INTERNATIONAL_CODE: &str = "international-code";

/// Pair `classifications` with `goods` by index
pub fn assemble<'a, I>(classifications: I, goods: &[Option<String>]) -> Vec<Classification>
where
    I: IntoIterator<Item = &'a XmlElement>,
{
    classifications
        .into_iter()
        .enumerate()
        .map(|(index, element)| {
            let code = element.child_text(INTERNATIONAL_CODE).and_then(parse_code);
            let text = goods.get(index).cloned().flatten();
            Classification::new(code, text)
        })
        .collect()
}

/// Parse a class code such as "009"; `None` when not an integer
pub fn parse_code(raw: &str) -> Option<i32> {
    raw.trim().parse().ok()
}
