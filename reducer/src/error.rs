use snafu::Snafu;

#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
pub enum Error {
    /// Delivered to every node still attached to a cancelled query; never
    /// produced internally by a node itself.
    #[snafu(display("stream cancelled"))]
    Cancelled,

    #[snafu(display("upstream closed with error: {message}"))]
    Upstream { message: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
