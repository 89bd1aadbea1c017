// Shared constants for delimiters and format negotiation defaults

/// Separates the asset path from the step segment inside the pathname.
pub const DEFAULT_PATH_DELIMITER: &str = ":";

/// Separates individual steps inside the step segment.
pub const DEFAULT_STEP_DELIMITER: &str = ";";

/// Separates a step's short name from its parameter blob.
pub const DEFAULT_STEP_VALUE_DELIMITER: &str = "=";

/// Separates parameters inside a step's parameter blob.
pub const DEFAULT_PARAM_DELIMITER: &str = ",";

/// Separates a parameter's short name from its value.
pub const DEFAULT_PARAM_VALUE_DELIMITER: &str = "_";

/// Separates the signed payload from the trailing signature.
pub const DEFAULT_SIGNATURE_DELIMITER: &str = "~";

/// Fallback output format when the pipeline carries a lossless step.
pub const LOSSLESS_FALLBACK_FORMAT: &str = "png";

/// Fallback output format for everything else.
pub const LOSSY_FALLBACK_FORMAT: &str = "jpeg";

/// Canonical name of the synthetic identity marker appended for explicit
/// original-asset requests.
pub const ORIGINAL_MARKER_STEP: &str = "original";
