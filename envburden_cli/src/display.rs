use comfy_table::{presets::NOTHING, *};
use envburden::merge::MergeReport;
use envburden::summary::IndicatorSummary;
use itertools::Itertools;
use polars::prelude::{AnyValue, DataFrame};

fn new_table<S: ToString>(header: &[S]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            header
                .iter()
                .map(|name| Cell::new(name.to_string()).add_attribute(Attribute::Bold))
                .collect_vec(),
        )
        .set_style(comfy_table::TableComponent::BottomBorder, '─')
        .set_style(comfy_table::TableComponent::MiddleHeaderIntersections, '─')
        .set_style(comfy_table::TableComponent::HeaderLines, '─')
        .set_style(comfy_table::TableComponent::BottomBorderIntersections, '─')
        .set_style(comfy_table::TableComponent::TopBorder, '─')
        .set_style(comfy_table::TableComponent::TopBorderIntersections, '─');
    table
}

fn format_value(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::Float64(v) => format!("{v:.2}"),
        other => other.to_string(),
    }
}

fn format_stat(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_default()
}

/// Prints every row of `df` under `title`
pub fn display_frame(title: &str, df: &DataFrame) -> anyhow::Result<()> {
    let header = df.get_column_names();
    let mut table = new_table(header.as_slice());
    for idx in 0..df.height() {
        if let Some(row) = df.get(idx) {
            table.add_row(row.iter().map(format_value).collect_vec());
        }
    }
    println!("\n{title}\n{table}");
    Ok(())
}

pub fn display_merge_report(report: &MergeReport) -> anyhow::Result<()> {
    let mut table = new_table(&["Table", "Rows"]);
    table.add_row(vec!["health".to_string(), report.health_rows.to_string()]);
    table.add_row(vec![
        "environment".to_string(),
        report.environment_rows.to_string(),
    ]);
    table.add_row(vec!["burden".to_string(), report.burden_rows.to_string()]);
    table.add_row(vec!["merged".to_string(), report.merged_rows.to_string()]);
    println!("\n{table}");

    if !report.unresolved.is_empty() {
        let mut table = new_table(&["Source", "Rows without ISO3", "Countries"]);
        for unresolved in &report.unresolved {
            table.add_row(vec![
                unresolved.source.to_string(),
                unresolved.rows.to_string(),
                unresolved.countries.iter().join(", "),
            ]);
        }
        println!("\nRows dropped for lack of an ISO3 code\n{table}");
    }
    Ok(())
}

pub fn display_summary(summary: &[IndicatorSummary]) -> anyhow::Result<()> {
    let mut table = new_table(&[
        "Indicator",
        "Count",
        "Mean",
        "Median",
        "Std",
        "Min",
        "Max",
        "Unit",
    ]);
    for stats in summary {
        table.add_row(vec![
            stats.indicator.clone(),
            stats.count.to_string(),
            format_stat(stats.mean),
            format_stat(stats.median),
            format_stat(stats.std),
            format_stat(stats.min),
            format_stat(stats.max),
            stats.unit.to_string(),
        ]);
    }
    println!("\n{table}");
    Ok(())
}
