use snafu::Snafu;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("unknown attribute {attribute}"))]
    UnknownAttribute { attribute: String },

    #[snafu(display("unknown measure {measure}"))]
    UnknownMeasure { measure: String },

    #[snafu(display("unknown dimension {dimension}"))]
    UnknownDimension { dimension: String },

    #[snafu(display("none of the requested measures {measures:?} are compatible with dimensions {dims:?}"))]
    IncompatibleMeasures { dims: Vec<String>, measures: Vec<String> },

    #[snafu(display("no aggregation covers dimensions {dims:?}"))]
    NoCoveringAggregation { dims: Vec<String> },

    #[snafu(display("aggregation query failed: {source}"))]
    Aggregation { source: aggregation::Error },

    #[snafu(display("attribute resolution failed: {message}"))]
    Resolver { message: String },

    #[snafu(display("reducer pipeline error: {source}"))]
    Reducer { source: reducer::Error },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
