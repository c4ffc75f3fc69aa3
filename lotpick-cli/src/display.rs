use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use crate::import::ImportResult;
use lotpick_core::generator::GenerationResult;
use lotpick_core::thresholds::{HeatCell, Thresholds};
use lotpick_core::GenerationConfig;
use lotpick_db::models::{Block, Draw, DrawRecord};

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn join_block(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| format!("{:02}", n))
        .collect::<Vec<_>>()
        .join(" - ")
}

pub fn display_draws(records: &[DrawRecord]) {
    if records.is_empty() {
        println!("No draws to display.");
        return;
    }

    let mut table = new_table(vec!["Date", "Main", "Lucky"]);
    for record in records {
        table.add_row(vec![
            record.date.clone().unwrap_or_else(|| "—".to_string()),
            join_block(&record.draw.main),
            join_block(&record.draw.lucky),
        ]);
    }
    println!("{table}");
}

pub fn display_import_summary(result: &ImportResult) {
    println!("Import complete:");
    println!("  Records read       : {}", result.total_records);
    println!("  Inserted           : {}", result.inserted);
    println!("  Duplicates skipped : {}", result.skipped);
    if result.errors > 0 {
        println!("  Errors             : {}", result.errors);
    }
}

pub fn display_thresholds(t: &Thresholds) {
    println!("\nThresholds over {} draws\n", t.total_draws);

    println!("── Odd / even (main numbers) ──");
    let mut table = new_table(vec!["Split", "Draws", "%"]);
    for row in &t.odd_even {
        let in_range = t.odd_range.contains(row.odd_count as u32);
        let color = if in_range { Color::Green } else { Color::DarkGrey };
        table.add_row(vec![
            Cell::new(&row.label).fg(color),
            Cell::new(row.count),
            Cell::new(format!("{:.2}", row.pct)),
        ]);
    }
    println!("{table}");

    let mut table = new_table(vec!["Threshold", "Value"]);
    table.add_row(vec!["Odd count range".to_string(), t.odd_range.to_string()]);
    table.add_row(vec!["Sum range".to_string(), t.sum_range.to_string()]);
    table.add_row(vec!["Main gap max".to_string(), t.main_gap_threshold.to_string()]);
    table.add_row(vec!["Lucky gap max".to_string(), t.lucky_gap_threshold.to_string()]);
    table.add_row(vec!["Top number per position".to_string(), t.top_numbers().join(", ")]);
    println!("\n{table}");

    println!("\n── Max multiples per draw ──");
    let mut table = new_table(vec!["Base", "Allowed"]);
    for (base, allowed) in &t.multiples_allowed {
        table.add_row(vec![base.to_string(), allowed.to_string()]);
    }
    println!("{table}");

    println!("\n── Gap histograms ──");
    let mut table = new_table(vec!["Pair", "Gap: draws"]);
    for block in [Block::Main, Block::Lucky] {
        let mut pair = 0;
        while let Some(histogram) = t.gap_histogram(block, pair) {
            let cells = histogram
                .iter()
                .map(|(gap, count)| format!("{}:{}", gap, count))
                .collect::<Vec<_>>()
                .join(" ");
            table.add_row(vec![format!("{} {}-{}", block.label(), pair + 1, pair + 2), cells]);
            pair += 1;
        }
    }
    println!("{table}");

    println!("\n── Pattern score ceilings ──");
    let mut table = new_table(vec!["Pattern", "Max score %"]);
    for ceiling in &t.max_pattern_probabilities {
        table.add_row(vec![ceiling.key.clone(), format!("{:.2}", ceiling.probability)]);
    }
    println!("{table}");
}

pub fn display_heatmap(cells: &[HeatCell], min: u8, max: u8) {
    let positions = cells.iter().map(|c| c.pos).max().map_or(0, |p| p + 1);
    let mut header = vec!["#".to_string()];
    header.extend((1..=positions).map(|p| format!("P{}", p)));

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);

    let peak = cells.iter().map(|c| c.pct).fold(0.0, f64::max);
    for num in min..=max {
        let mut row = vec![Cell::new(format!("{:02}", num))];
        for pos in 0..positions {
            let cell = cells.iter().find(|c| c.pos == pos && c.num == num);
            row.push(match cell {
                Some(c) if c.count > 0 => {
                    let color = if c.pct >= peak * 0.66 {
                        Color::Red
                    } else if c.pct >= peak * 0.33 {
                        Color::Yellow
                    } else {
                        Color::White
                    };
                    Cell::new(format!("{:.1}", c.pct)).fg(color)
                }
                _ => Cell::new("·"),
            });
        }
        table.add_row(row);
    }
    println!("{table}");
}

pub fn display_generation(result: &GenerationResult, config: &GenerationConfig) {
    println!();
    match &result.best_combination {
        Some(best) => {
            let status = if result.accepted {
                format!("reached min score {:.2}%", config.min_score)
            } else {
                "best found, below min score".to_string()
            };
            let mut table = new_table(vec!["Main", "Lucky", "Score %", "Status"]);
            table.add_row(vec![
                Cell::new(join_block(&best.main)),
                Cell::new(join_block(&best.lucky)),
                Cell::new(format!("{:.2}", result.best_score)),
                Cell::new(status).fg(if result.accepted { Color::Green } else { Color::Yellow }),
            ]);
            println!("{table}");

            if let Some(probabilities) = &result.best_positional_probabilities {
                let mut table = new_table(vec!["Position", "Value", "Historical %"]);
                for (pos, (value, pct)) in best.slots().iter().zip(probabilities).enumerate() {
                    table.add_row(vec![
                        format!("P{}", pos + 1),
                        format!("{:02}", value),
                        format!("{:.2}", pct),
                    ]);
                }
                println!("{table}");
            }
        }
        None => println!("No combination passed every filter within the iteration budget."),
    }

    println!("\nIterations: {}", result.iterations);
    let mut table = new_table(vec!["Rejected by", "Count"]);
    for (reason, count) in result.rejections.entries() {
        table.add_row(vec![reason.to_string(), count.to_string()]);
    }
    table.add_row(vec!["total".to_string(), result.rejections.total().to_string()]);
    println!("{table}");
}

pub fn display_batch(results: &[(usize, GenerationResult)]) {
    let mut table = new_table(vec!["Run", "Main", "Lucky", "Score %", "Iterations"]);
    for (run, result) in results {
        let (main, lucky) = result
            .best_combination
            .map(|d| (join_block(&d.main), join_block(&d.lucky)))
            .unwrap_or_else(|| ("—".to_string(), "—".to_string()));
        table.add_row(vec![
            (run + 1).to_string(),
            main,
            lucky,
            format!("{:.2}", result.best_score),
            result.iterations.to_string(),
        ]);
    }
    println!("{table}");
}

pub fn display_check(draw: &Draw, found: Option<&str>) {
    match found {
        Some(date) if !date.is_empty() => println!("{} was drawn on {}.", draw, date),
        Some(_) => println!("{} is in the history (undated).", draw),
        None => println!("{} has never been drawn.", draw),
    }
}
