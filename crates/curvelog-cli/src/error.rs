use curvelog_core::StoreError;
use curvelog_core::index::ParseIndexError;
use snafu::Snafu;

pub type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CliError {
    #[snafu(display("Input file not found or not readable: {path}"))]
    ReadInput {
        path: String,
        source: std::io::Error,
    },

    #[snafu(display("Input file {path} is not a valid log header: {source}"))]
    ParseInput {
        path: String,
        source: serde_json::Error,
    },

    #[snafu(display("Invalid index bound '{text}': {source}"))]
    InvalidBound {
        text: String,
        source: ParseIndexError,
    },

    #[snafu(display(
        "Invalid --curve '{text}'. \
         Use MNEMONIC or MNEMONIC=START:END (either bound may be blank)."
    ))]
    InvalidCurveSelector { text: String },

    #[snafu(display("{action} failed for {uri}: {source}"))]
    Store {
        action: &'static str,
        uri: String,
        #[snafu(source(from(StoreError, Box::new)))]
        source: Box<StoreError>,
    },

    #[snafu(display("Failed to render output: {source}"))]
    Render { source: serde_json::Error },
}
