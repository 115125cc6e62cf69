//! Console report printed after a run.

use std::fmt::Write as _;

use crate::run::RunOutcome;

/// Render the human-readable summary of `outcome`.
///
/// ```text
/// Validation completed. Output directory: validation_output/20250304-050607
/// Overall: PASS
/// - STSIdentity: PASS
/// ```
pub fn render(outcome: &RunOutcome) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Validation completed. Output directory: {}",
        outcome.run_dir.display()
    );
    let _ = writeln!(out, "Overall: {}", outcome.summary.overall());
    for verdict in outcome.summary.checks() {
        let _ = writeln!(out, "- {}: {}", verdict.name, verdict.status);
    }
    out
}
