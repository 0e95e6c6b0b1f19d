pub mod error_stage {
    pub const PROCESSING: &str = "processing";
    pub const SENDING: &str = "sending";
}

pub mod error_type {
    /// The value of a sample does not match its declared metric type.
    pub const CONVERSION_FAILED: &str = "conversion_failed";
    /// A peer's encoded state could not be decoded.
    pub const PARSER_FAILED: &str = "parser_failed";
    /// The downstream reporter refused a flush.
    pub const REQUEST_FAILED: &str = "request_failed";
}
