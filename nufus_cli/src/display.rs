use comfy_table::{presets::NOTHING, *};
use itertools::izip;

use nufus::aggregate::{AggregatedTotal, YearTotal};
use nufus::filter::MatchSummary;
use nufus::range::{format_thousands, RangePresets};
use nufus::record::Populated;

fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_style(comfy_table::TableComponent::BottomBorder, '─')
        .set_style(comfy_table::TableComponent::MiddleHeaderIntersections, '─')
        .set_style(comfy_table::TableComponent::HeaderLines, '─')
        .set_style(comfy_table::TableComponent::BottomBorderIntersections, '─')
        .set_style(comfy_table::TableComponent::TopBorder, '─')
        .set_style(comfy_table::TableComponent::TopBorderIntersections, '─');
    table
}

fn bold(text: &str) -> Cell {
    Cell::new(text).add_attribute(Attribute::Bold)
}

fn right(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

pub fn display_years(series: &[YearTotal]) -> anyhow::Result<()> {
    let mut table = base_table();
    table.set_header(vec![bold("Year"), bold("Province population")]);
    for total in series {
        table.add_row(vec![
            Cell::new(total.year),
            right(format_thousands(total.population)),
        ]);
    }
    println!("\n{}", table);
    Ok(())
}

pub fn display_totals(totals: &[AggregatedTotal], with_neighborhood: bool) -> anyhow::Result<()> {
    let mut table = base_table();
    let mut header = vec![bold("İLÇE")];
    if with_neighborhood {
        header.push(bold("MAHALLE"));
    }
    header.push(bold("NÜFUS"));
    table.set_header(header);
    for total in totals {
        let district = if total.key.is_grand_total() {
            bold(total.district())
        } else {
            Cell::new(total.district())
        };
        let mut row = vec![district];
        if with_neighborhood {
            row.push(Cell::new(total.neighborhood().unwrap_or_default()));
        }
        row.push(right(format_thousands(total.population)));
        table.add_row(row);
    }
    println!("\n{}", table);
    Ok(())
}

pub fn display_presets(presets: &RangePresets) -> anyhow::Result<()> {
    let mut table = base_table();
    table.set_header(vec![bold("Preset"), bold("Low"), bold("High")]);
    for (label, low, high) in izip!(
        presets.presets().iter().map(|p| p.label.as_str()),
        presets.presets().iter().map(|p| p.range.low()),
        presets.presets().iter().map(|p| p.range.high()),
    ) {
        table.add_row(vec![Cell::new(label), right(low.to_string()), right(high.to_string())]);
    }
    println!("\n{}", table);
    Ok(())
}

pub fn display_summary(summary: &MatchSummary) {
    eprintln!("{summary}");
}
