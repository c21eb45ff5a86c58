use snafu::Snafu;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("aggregation engine error: {source}"))]
    Aggregation { source: aggregation::Error },

    #[snafu(display("query planning failed: {source}"))]
    Plan { source: cube_planner::Error },

    #[snafu(display("ingest routing failed: {source}"))]
    Reducer { source: reducer::Error },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
