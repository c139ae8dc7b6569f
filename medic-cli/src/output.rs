//! Output formatting for heal reports

use clap::ValueEnum;
use colored::Colorize;
use medic_core::HealReport;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "NODE")]
    node: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "DETAIL")]
    detail: String,
}

fn rows(report: &HealReport) -> Vec<ReportRow> {
    let rebooted = report.rebooted.iter().map(|node| ReportRow {
        node: node.clone(),
        status: "rebooted".to_string(),
        detail: String::new(),
    });
    let failed = report.failed.iter().map(|failure| ReportRow {
        node: failure.node.clone(),
        status: "failed".to_string(),
        detail: failure.error.clone(),
    });
    rebooted.chain(failed).collect()
}

pub fn print_report(report: &HealReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Table => print_table(report),
    }
    Ok(())
}

fn print_table(report: &HealReport) {
    if report.total() == 0 {
        println!("{}", "No NotReady nodes".green());
        return;
    }

    println!("{}", Table::new(rows(report)));

    let summary = format!(
        "{} rebooted, {} failed",
        report.rebooted.len(),
        report.failed.len()
    );
    if report.is_clean() {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.yellow());
    }
}
