mod bootstrap;
mod render;

use std::io::Write;

use anyhow::{Context, Result};
use survey_core::settings::Settings;
use survey_data::analysis::ReportAssembler;

fn main() -> Result<()> {
    let settings = Settings::load()?;

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Survey Dash v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Input: {}, Reference year: {}, Top N: {}",
        settings.input.display(),
        settings.reference_year,
        settings.top_n
    );

    let assembler = ReportAssembler::new(settings.analysis_config());
    let report = assembler
        .assemble(&settings.input)
        .with_context(|| format!("could not analyse {}", settings.input.display()))?;

    let skipped = report.skipped().count();
    if skipped > 0 {
        tracing::warn!("{} of {} analyses skipped", skipped, report.analyses.len());
    }

    let output = if settings.wants_json() {
        render::render_json(&report)?
    } else {
        render::render_text(&report)
    };

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", output.trim_end())?;
    stdout.flush()?;

    tracing::info!("Report written");
    Ok(())
}
