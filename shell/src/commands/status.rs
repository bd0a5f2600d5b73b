use viewport::{EvolutionReport, FailureRecord};

use crate::state::Status;

pub fn describe(status: &Status, last_report: Option<&EvolutionReport>) -> String {
    let params = &status.parameters;
    let mut text = format!(
        "phase {} | grid {} | {} painted | pop {} lifespan {} genes {} | {} failures | up {}s",
        status.phase,
        status.dimensions,
        status.highlighted,
        params.population_size,
        params.lifespan,
        params.num_genes,
        status.failures,
        status.uptime_secs,
    );
    if status.evolving {
        text.push_str(" | evolution running");
    }
    if let Some(report) = last_report {
        text.push_str(&format!(
            " | last run: {}/{} painted{}",
            report.painted,
            report.dispatched,
            if report.cancelled { " (cancelled)" } else { "" }
        ));
    }
    text
}

pub fn describe_failures(records: &[FailureRecord]) -> String {
    if records.is_empty() {
        return "no failed requests\n".to_string();
    }
    records
        .iter()
        .map(|record| {
            format!(
                "{} [{}] {}\n",
                record.at.format("%H:%M:%S%.3f"),
                record.context,
                record.error
            )
        })
        .collect()
}
