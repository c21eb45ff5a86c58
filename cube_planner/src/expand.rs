//! Attribute expansion (§4.6): every requested attribute is either a
//! schema dimension, a dimension reached by walking `childParent` up from
//! one already requested, or an attribute an [`AttributeResolver`] can
//! produce from some dimension key. Expansion turns the requested
//! attribute list into the dimension set an aggregation must cover.

use crate::error::{self, Result};
use crate::resolver::AttributeResolver;
use data_types::Schema;
use std::collections::BTreeSet;

pub fn expand_attributes(
    schema: &Schema,
    resolver: Option<&dyn AttributeResolver>,
    attributes: &[String],
) -> Result<BTreeSet<String>> {
    let query_dims: Vec<String> = attributes.iter().filter(|a| schema.is_dimension(a)).cloned().collect();
    let mut required = BTreeSet::new();

    for attribute in attributes {
        if schema.is_dimension(attribute) {
            let chain = schema.drill_down_chain(attribute, &query_dims);
            required.extend(chain);
            continue;
        }
        let resolved_by = resolver.filter(|r| r.attribute_types().contains_key(attribute));
        match resolved_by {
            Some(r) => required.extend(r.key_dimensions().iter().cloned()),
            None => {
                return error::UnknownAttributeSnafu { attribute: attribute.clone() }.fail();
            }
        }
    }
    Ok(required)
}
