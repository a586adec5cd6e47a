//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! | Code | Meaning                                          |
//! |------|--------------------------------------------------|
//! | 0    | Success                                          |
//! | 1    | Unmatched RK rows remain (only with `--strict`)  |
//! | 2    | CLI usage error (bad args, unknown sheet)        |
//! | 3    | Invalid or unreadable config                     |
//! | 4    | Input table lacks required columns               |
//! | 5    | Input file cannot be read or parsed              |
//! | 6    | Output file cannot be written                    |

use vouch_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// `--strict` run left RK rows unmatched.
/// Like `diff(1)`, exit 1 means "not everything lined up."
pub const EXIT_UNMATCHED: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Config could not be read, parsed or validated.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// RK or SP2D table is missing a required column.
pub const EXIT_MISSING_COLUMNS: u8 = 4;

/// Input file missing, unreadable, or not valid CSV / workbook data.
pub const EXIT_INPUT: u8 = 5;

/// Result workbook or CSV files could not be written.
pub const EXIT_OUTPUT: u8 = 6;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::MissingColumns { .. } => EXIT_MISSING_COLUMNS,
        ReconError::Csv(_) | ReconError::Io(_) => EXIT_INPUT,
    }
}
